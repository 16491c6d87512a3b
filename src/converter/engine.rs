//! Single-pass trace conversion.
//!
//! The converter walks the event stream once, keeping the latest clock
//! snapshot and the currently open range. Every range gets its own scope with
//! one wall-time profile; stacks captured inside the range become samples of
//! that profile. Runtime metric events become gauge data points.

use super::metric_names::{metric_unit, normalize_metric_name};
use crate::dictionary::Dictionary;
use crate::parser::{ClockSnapshot, Event, EventKind, EventSource};
use crate::pdata::{
    unix_nanos, Metric, Metrics, Profile, Profiles, ResourceMetrics, ResourceProfiles, Sample,
    ScopeMetrics, ScopeProfiles, ValueType,
};
use crate::utils::config::{GOROUTINE_ATTRIBUTE_KEY, SAMPLE_TYPE, SAMPLE_UNIT, SCHEMA_URL};
use crate::utils::error::ConvertError;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

/// Result of converting one trace
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub profiles: Profiles,
    pub metrics: Metrics,
    pub stats: ConversionStats,
}

/// Counters collected while converting one trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub events: u64,
    pub samples: u64,
    pub metric_points: u64,
    pub profiles_finalized: u64,
    pub profiles_discarded: u64,
    pub profiles_left_open: u64,
    /// Events that needed wall-clock time before any clock snapshot
    pub dropped_before_sync: u64,
    pub skipped: u64,
    pub cancelled: bool,
}

impl ConversionStats {
    /// Human-readable summary for logging
    pub fn summary(&self) -> String {
        format!(
            "events: {} | samples: {} | metric points: {} | profiles: {} finalized, {} discarded, {} open | dropped before sync: {}",
            self.events,
            self.samples,
            self.metric_points,
            self.profiles_finalized,
            self.profiles_discarded,
            self.profiles_left_open,
            self.dropped_before_sync
        )
    }
}

/// Convert a whole event stream into profiles and metrics
///
/// **Public** - main entry point for conversion
///
/// Cancellation is checked before every event read; a cancelled conversion
/// returns what was accumulated so far.
///
/// # Errors
/// * `ConvertError::Decode` - The stream is malformed; nothing is returned
pub fn convert<S: EventSource>(
    source: S,
    cancel: &CancellationToken,
) -> Result<Conversion, ConvertError> {
    let mut converter = Converter::new();
    converter.run(source, cancel)?;
    Ok(converter.finish())
}

/// What the generic stack handling should do after bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Done,
    SampleStack,
}

#[derive(Debug, Clone)]
struct OpenRange {
    name: String,
    start: DateTime<Utc>,
    // index into `scopes`
    scope: usize,
    added_frames: bool,
}

/// Conversion state for one trace
#[derive(Debug, Default)]
pub struct Converter {
    dict: Dictionary,
    clock: Option<ClockSnapshot>,
    range: Option<OpenRange>,
    scopes: Vec<ScopeProfiles>,
    metrics: Vec<Metric>,
    metric_index: FxHashMap<String, usize>,
    stats: ConversionStats,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull events until the stream ends or `cancel` fires
    pub fn run<S: EventSource>(
        &mut self,
        mut source: S,
        cancel: &CancellationToken,
    ) -> Result<(), ConvertError> {
        loop {
            if cancel.is_cancelled() {
                debug!("Conversion cancelled after {} events", self.stats.events);
                self.stats.cancelled = true;
                return Ok(());
            }
            match source.next_event()? {
                Some(event) => self.handle(&event),
                None => return Ok(()),
            }
        }
    }

    /// Apply one event
    pub fn handle(&mut self, event: &Event) {
        self.stats.events += 1;
        if self.bookkeeping(event) == Next::SampleStack {
            self.sample_stack(event);
        }
    }

    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    fn bookkeeping(&mut self, event: &Event) -> Next {
        match &event.kind {
            EventKind::Sync { clock_snapshot } => {
                if let Some(snap) = clock_snapshot {
                    self.clock = Some(*snap);
                }
                Next::Done
            }
            EventKind::Metric { name, value } => {
                self.record_metric(event, name, *value);
                Next::Done
            }
            // not representable in the output yet
            EventKind::Label { .. } | EventKind::Experimental { .. } => Next::Done,
            EventKind::RangeBegin { name } => {
                if self.begin_range(event, name) {
                    Next::SampleStack
                } else {
                    Next::Done
                }
            }
            EventKind::RangeEnd { name } => {
                self.end_range(event, name);
                Next::Done
            }
            EventKind::StateTransition => Next::SampleStack,
            EventKind::Other { .. } | EventKind::Unknown => {
                debug!("Skipping event kind {}", event.kind.name());
                self.stats.skipped += 1;
                Next::Done
            }
        }
    }

    /// Wall-clock time of the event, or `None` (logged) before any snapshot
    fn wall_time(&mut self, event: &Event) -> Option<DateTime<Utc>> {
        match &self.clock {
            Some(snap) => Some(snap.wall_time(event.time)),
            None => {
                error!(
                    "received {} event before clock synchronization",
                    event.kind.name()
                );
                self.stats.dropped_before_sync += 1;
                None
            }
        }
    }

    fn record_metric(&mut self, event: &Event, raw_name: &str, value: u64) {
        let Some(wall) = self.wall_time(event) else {
            return;
        };

        let name = normalize_metric_name(raw_name);
        let idx = match self.metric_index.get(&name) {
            Some(&idx) => idx,
            None => {
                self.metrics
                    .push(Metric::gauge(name.clone(), metric_unit(raw_name)));
                let idx = self.metrics.len() - 1;
                self.metric_index.insert(name, idx);
                idx
            }
        };

        self.metrics[idx].push(unix_nanos(wall), value as f64);
        self.stats.metric_points += 1;
    }

    fn begin_range(&mut self, event: &Event, name: &str) -> bool {
        let Some(start) = self.wall_time(event) else {
            return false;
        };

        if self.range.is_some() {
            self.abandon_open_range();
        }

        let sample_type = ValueType {
            type_strindex: self.dict.intern_string(SAMPLE_TYPE),
            unit_strindex: self.dict.intern_string(SAMPLE_UNIT),
        };
        self.scopes.push(ScopeProfiles {
            schema_url: SCHEMA_URL.to_string(),
            profiles: vec![Profile {
                sample_type,
                ..Default::default()
            }],
        });
        self.range = Some(OpenRange {
            name: name.to_string(),
            start,
            scope: self.scopes.len() - 1,
            added_frames: false,
        });
        true
    }

    fn end_range(&mut self, event: &Event, name: &str) {
        let Some((scope, added_frames)) = self.range.as_ref().map(|r| {
            if r.name != name {
                debug!("RangeEnd {:?} closes range {:?}", name, r.name);
            }
            (r.scope, r.added_frames)
        }) else {
            error!("received RangeEnd {:?} before RangeBegin", name);
            self.stats.skipped += 1;
            return;
        };

        if !added_frames {
            // do not emit empty profiles
            self.range = None;
            self.discard_scope(scope);
            return;
        }

        // still open here, so a later end can close it
        let Some(end) = self.wall_time(event) else {
            return;
        };

        // the closing stack is the last sample of the range
        self.sample_stack(event);

        let Some(range) = self.range.take() else {
            return;
        };
        let duration = (end - range.start).num_nanoseconds().unwrap_or(0).max(0);
        if let Some(profile) = self.profile_mut(range.scope) {
            profile.time_unix_nano = unix_nanos(range.start);
            profile.duration_nano = duration as u64;
        }
        self.stats.profiles_finalized += 1;
    }

    /// Leave the open range as it is if it has samples, drop it otherwise
    fn abandon_open_range(&mut self) {
        let Some(range) = self.range.take() else {
            return;
        };
        if range.added_frames {
            warn!(
                "range {:?} was never closed, leaving its profile unfinalized",
                range.name
            );
            self.stats.profiles_left_open += 1;
        } else {
            self.discard_scope(range.scope);
        }
    }

    fn discard_scope(&mut self, scope: usize) {
        // the open range always owns the most recent scope
        if scope + 1 == self.scopes.len() {
            self.scopes.pop();
            self.stats.profiles_discarded += 1;
        }
    }

    fn profile_mut(&mut self, scope: usize) -> Option<&mut Profile> {
        self.scopes.get_mut(scope).and_then(|s| s.profiles.first_mut())
    }

    fn sample_stack(&mut self, event: &Event) {
        if event.stack.is_empty() {
            return;
        }
        let Some(scope) = self.range.as_ref().map(|r| r.scope) else {
            debug!(
                "Ignoring {} stack outside of any range",
                event.kind.name()
            );
            self.stats.skipped += 1;
            return;
        };
        let Some(wall) = self.wall_time(event) else {
            return;
        };

        // goroutine ids have no semantic convention, so they go in as a plain attribute
        let goid = self.dict.intern_attribute(
            GOROUTINE_ATTRIBUTE_KEY,
            &event.goroutine.to_string(),
            "",
        );
        let locations: Vec<i32> = event
            .stack
            .iter()
            .map(|frame| self.dict.intern_frame(frame))
            .collect();
        let stack_index = self.dict.intern_stack(&locations);

        let Some(profile) = self.profile_mut(scope) else {
            return;
        };
        profile.samples.push(Sample {
            stack_index,
            attribute_indices: vec![goid],
            timestamps_unix_nano: vec![unix_nanos(wall)],
        });
        if let Some(range) = self.range.as_mut() {
            range.added_frames = true;
        }
        self.stats.samples += 1;
    }

    /// Close out the conversion and render the documents.
    ///
    /// A range still open at this point keeps its samples but is not
    /// finalized; an open range without samples is dropped.
    pub fn finish(mut self) -> Conversion {
        self.abandon_open_range();

        let profiles = Profiles {
            resource_profiles: vec![ResourceProfiles {
                schema_url: SCHEMA_URL.to_string(),
                scope_profiles: self.scopes,
            }],
            dictionary: self.dict.materialize(),
        };

        let metrics = Metrics {
            resource_metrics: vec![ResourceMetrics {
                schema_url: SCHEMA_URL.to_string(),
                scope_metrics: vec![ScopeMetrics {
                    schema_url: SCHEMA_URL.to_string(),
                    metrics: self.metrics,
                }],
            }],
        };

        debug!("Conversion finished: {}", self.stats.summary());

        Conversion {
            profiles,
            metrics,
            stats: self.stats,
        }
    }
}
