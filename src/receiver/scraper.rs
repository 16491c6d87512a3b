//! One scrape cycle: glob, convert every match, merge.

use crate::converter::{convert, Conversion};
use crate::parser::{self, EventSource, JsonLinesSource};
use crate::pdata::{Metrics, Profiles};
use crate::utils::config::ReceiverConfig;
use crate::utils::error::{ConvertError, ScrapeError, ScrapeErrors};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Merged result of one scrape cycle
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub profiles: Profiles,
    pub metrics: Metrics,

    /// Every per-file failure of the cycle
    pub errors: ScrapeErrors,

    pub files_matched: usize,
    pub files_converted: usize,

    /// The cycle stopped early; `profiles` and `metrics` hold what was done
    pub cancelled: bool,
}

/// Scrape the files selected by `config.include`
///
/// **Public** - one synchronous scrape cycle, without delivery
///
/// Files are converted one at a time in lexical path order. A file that
/// cannot be opened or decoded is recorded in `errors` and skipped; the
/// remaining files are still converted.
pub fn scrape(config: &ReceiverConfig, cancel: &CancellationToken) -> ScrapeOutcome {
    scrape_pattern(&config.include, cancel)
}

pub fn scrape_pattern(pattern: &str, cancel: &CancellationToken) -> ScrapeOutcome {
    scrape_with(pattern, cancel, open_file)
}

fn scrape_with<S, F>(pattern: &str, cancel: &CancellationToken, mut open: F) -> ScrapeOutcome
where
    S: EventSource,
    F: FnMut(&Path) -> Result<S, ScrapeError>,
{
    let mut outcome = ScrapeOutcome::default();

    let paths = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            outcome.errors.push(e.into());
            return outcome;
        }
    };

    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => outcome.errors.push(e.into()),
        }
    }
    matches.sort();
    outcome.files_matched = matches.len();
    debug!("Pattern {:?} matched {} paths", pattern, matches.len());

    for path in matches {
        if cancel.is_cancelled() {
            debug!("Scrape cancelled before {}", path.display());
            outcome.cancelled = true;
            break;
        }
        if path.is_dir() {
            debug!("Skipping directory {}", path.display());
            continue;
        }

        match open(&path).and_then(|source| convert_source(&path, source, cancel)) {
            Ok(conversion) => {
                outcome.profiles.merge_from(conversion.profiles);
                outcome.metrics.merge_from(conversion.metrics);
                outcome.files_converted += 1;
                if conversion.stats.cancelled {
                    outcome.cancelled = true;
                }
            }
            Err(e) => outcome.errors.push(e),
        }
    }

    outcome
}

/// Open and convert a single trace file
///
/// # Errors
/// * `ScrapeError::Open` - The file cannot be opened
/// * `ScrapeError::Convert` - The file is not a valid event stream
pub fn convert_file(path: &Path, cancel: &CancellationToken) -> Result<Conversion, ScrapeError> {
    convert_source(path, open_file(path)?, cancel)
}

fn open_file(path: &Path) -> Result<JsonLinesSource<BufReader<File>>, ScrapeError> {
    let file = File::open(path).map_err(|source| ScrapeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parser::open(file).map_err(|e| ScrapeError::Convert {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn convert_source<S: EventSource>(
    path: &Path,
    source: S,
    cancel: &CancellationToken,
) -> Result<Conversion, ScrapeError> {
    let conversion = convert(source, cancel).map_err(|source: ConvertError| {
        ScrapeError::Convert {
            path: path.to_path_buf(),
            source,
        }
    })?;

    debug!("Converted {}: {}", path.display(), conversion.stats.summary());
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Event, Frame, MemorySource};
    use crate::utils::error::DecodeError;
    use chrono::{TimeZone, Utc};
    use std::fs;

    const TRACE: &str = r#"{"time":0,"kind":"sync","clock_snapshot":{"trace":0,"wall":"2024-01-01T00:00:00Z"}}
{"time":10,"kind":"range_begin","name":"r"}
{"time":20,"kind":"state_transition","goroutine":1,"stack":[{"pc":1,"func":"main.main","file":"main.go","line":3}]}
{"time":30,"kind":"range_end","name":"r"}
{"time":40,"kind":"metric","name":"/gc/heap/goal:bytes","value":1024}
"#;

    #[test]
    fn test_no_matches_is_empty_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.trace", dir.path().display());

        let outcome = scrape_pattern(&pattern, &CancellationToken::new());
        assert!(outcome.errors.is_empty());
        assert!(outcome.profiles.is_empty());
        assert!(outcome.metrics.is_empty());
        assert_eq!(outcome.files_matched, 0);
    }

    #[test]
    fn test_invalid_pattern_is_recorded() {
        let outcome = scrape_pattern("[unterminated", &CancellationToken::new());
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors.0[0], ScrapeError::Pattern(_)));
    }

    #[test]
    fn test_decode_failure_does_not_stop_cycle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.trace"), TRACE).unwrap();
        fs::write(dir.path().join("b.trace"), "not a trace").unwrap();
        fs::write(dir.path().join("c.trace"), TRACE).unwrap();
        let pattern = format!("{}/*.trace", dir.path().display());

        let outcome = scrape_pattern(&pattern, &CancellationToken::new());
        assert_eq!(outcome.files_converted, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors.to_string().contains("b.trace"));
        assert_eq!(outcome.profiles.profile_count(), 2);
        assert_eq!(outcome.metrics.data_point_count(), 2);
    }

    #[test]
    fn test_cancelled_before_first_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.trace"), TRACE).unwrap();
        let pattern = format!("{}/*.trace", dir.path().display());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = scrape_pattern(&pattern, &cancel);
        assert!(outcome.cancelled);
        assert_eq!(outcome.files_converted, 0);
        assert!(outcome.errors.is_empty());
    }

    /// Cancels the token once `budget` events have been handed out
    struct CancelAfter {
        inner: MemorySource,
        budget: usize,
        cancel: CancellationToken,
    }

    impl EventSource for CancelAfter {
        fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
            self.budget = self.budget.saturating_sub(1);
            if self.budget == 0 {
                self.cancel.cancel();
            }
            self.inner.next_event()
        }
    }

    fn events_for(func: &str, gc_goal: u64) -> Vec<Event> {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        vec![
            Event::sync(0, t0),
            Event::range_begin(10, "r"),
            Event::state_transition(20, 1, vec![Frame::new(0x10, func, "main.go", 3)]),
            Event::range_end(30, "r"),
            Event::metric(40, "/gc/heap/goal:bytes", gc_goal),
        ]
    }

    #[test]
    fn test_cancelled_mid_file_keeps_finished_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.trace", "b.trace", "c.trace"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.trace", dir.path().display());

        let cancel = CancellationToken::new();
        let mut opened = Vec::new();
        let outcome = scrape_with(&pattern, &cancel, |path| {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            opened.push(name.clone());
            let (inner, budget) = match name.as_str() {
                "a.trace" => (MemorySource::new(events_for("main.a", 1)), usize::MAX),
                // stops inside the range, after the sync and begin events
                _ => (MemorySource::new(events_for("main.b", 2)), 2),
            };
            Ok(CancelAfter {
                inner,
                budget,
                cancel: cancel.clone(),
            })
        });

        assert!(outcome.cancelled);
        assert!(outcome.errors.is_empty());
        assert_eq!(opened, vec!["a.trace", "b.trace"]);
        assert_eq!(outcome.files_matched, 3);
        assert_eq!(outcome.files_converted, 2);

        // a.trace is complete; b.trace contributes its partial, sample-free state
        assert_eq!(outcome.profiles.profile_count(), 1);
        assert_eq!(outcome.profiles.sample_count(), 1);
        let points: Vec<f64> = outcome
            .metrics
            .metrics()
            .flat_map(|m| m.gauge.data_points.iter().map(|p| p.value))
            .collect();
        assert_eq!(points, vec![1.0]);
    }
}
