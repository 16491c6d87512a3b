use chrono::{Duration, TimeZone, Utc};
use flightrec_receiver::converter::convert;
use flightrec_receiver::parser::{open, Event, Frame, MemorySource};
use flightrec_receiver::pdata::unix_nanos;
use flightrec_receiver::utils::error::{ConvertError, DecodeError};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const TRACE: &str = r#"
{"time":1000,"kind":"sync","clock_snapshot":{"trace":1000,"wall":"2024-05-01T12:00:00Z"}}
{"time":1100,"kind":"range_begin","name":"handle-request"}
{"time":1150,"kind":"state_transition","goroutine":42,"stack":[{"pc":4096,"func":"net/http.(*conn).serve","file":"server.go","line":2000},{"pc":8192,"func":"runtime.goexit","file":"asm_amd64.s","line":1700}]}
{"time":1200,"kind":"label","label":"worker"}
{"time":1250,"kind":"go_create"}
{"time":1300,"kind":"range_end","name":"handle-request"}
{"time":1400,"kind":"metric","name":"/memory/classes/heap/objects:bytes","value":65536}
"#;

#[test]
fn test_json_lines_trace_end_to_end() {
    let source = open(TRACE.as_bytes()).unwrap();
    let out = convert(source, &CancellationToken::new()).unwrap();

    let wall = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let profile = out.profiles.profiles().next().unwrap();
    assert_eq!(profile.time_unix_nano, unix_nanos(wall) + 100);
    assert_eq!(profile.duration_nano, 200);

    let dict = &out.profiles.dictionary;
    let stack = &dict.stack_table[profile.samples[0].stack_index as usize];
    let names: Vec<&str> = stack
        .location_indices
        .iter()
        .map(|&loc| {
            let line = &dict.location_table[loc as usize].lines[0];
            dict.string(dict.function_table[line.function_index as usize].name_strindex)
        })
        .collect();
    assert_eq!(names, vec!["net/http.(*conn).serve", "runtime.goexit"]);

    let heap = out.metrics.find("runtime.go.mem.heap_objects").unwrap();
    assert_eq!(heap.unit, "bytes");
    assert_eq!(heap.gauge.data_points[0].value, 65536.0);
    assert_eq!(heap.gauge.data_points[0].time_unix_nano, unix_nanos(wall) + 400);

    // unknown event kinds are skipped, not fatal
    assert_eq!(out.stats.events, 7);
}

#[test]
fn test_wall_time_follows_latest_snapshot() {
    let first = Utc.timestamp_opt(1_000, 0).unwrap();
    let second = first + Duration::seconds(3600);

    let out = convert(
        MemorySource::new(vec![
            Event::sync(0, first),
            Event::metric(10, "/gc/heap/goal:bytes", 1),
            Event::sync(500, second),
            Event::metric(600, "/gc/heap/goal:bytes", 2),
        ]),
        &CancellationToken::new(),
    )
    .unwrap();

    let points = &out.metrics.find("runtime.go.gc.heap_goal").unwrap().gauge.data_points;
    assert_eq!(points[0].time_unix_nano, unix_nanos(first) + 10);
    assert_eq!(points[1].time_unix_nano, unix_nanos(second) + 100);
}

#[test]
fn test_every_table_has_zero_sentinel() {
    let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let out = convert(
        MemorySource::new(vec![
            Event::sync(0, t0),
            Event::range_begin(1, "r"),
            Event::state_transition(2, 1, vec![Frame::new(1, "f", "f.go", 1)]),
            Event::range_end(3, "r"),
        ]),
        &CancellationToken::new(),
    )
    .unwrap();

    let dict = &out.profiles.dictionary;
    assert_eq!(dict.string_table[0], "");
    assert_eq!(dict.mapping_table.len(), 1);
    assert_eq!(dict.link_table.len(), 1);
    assert!(dict.function_table[0] == Default::default());
    assert!(dict.location_table[0] == Default::default());
    assert!(dict.attribute_table[0] == Default::default());
    assert!(dict.stack_table[0].location_indices.is_empty());
}

#[test]
fn test_malformed_line_reports_line_number() {
    let data = "{\"time\":0,\"kind\":\"sync\"}\n{\"time\":\n";
    let source = open(data.as_bytes()).unwrap();

    match convert(source, &CancellationToken::new()) {
        Err(ConvertError::Decode(DecodeError::Malformed { line, .. })) => assert_eq!(line, 2),
        other => panic!("expected malformed line error, got {:?}", other),
    }
}

#[test]
fn test_binary_input_is_rejected() {
    let err = open(&b"go 1.23 trace\x00\x00"[..]).unwrap_err();
    assert!(matches!(err, DecodeError::NotAnEventStream(_)));
}

#[test]
fn test_empty_trace_converts_to_empty_documents() {
    let out = convert(open(&b""[..]).unwrap(), &CancellationToken::new()).unwrap();
    assert_eq!(out.profiles.profile_count(), 0);
    assert_eq!(out.metrics.metric_count(), 0);
    assert_eq!(out.stats.events, 0);
}
