//! Decoded trace events.
//!
//! An event is what the flight recorder decoder hands us: a kind with its
//! payload, a monotonic trace timestamp, the stack captured with it (possibly
//! empty) and the goroutine that was running.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic trace clock value, in nanoseconds
pub type TraceTime = i64;

/// Correlates the trace clock with wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    /// Trace clock at the time of the snapshot
    pub trace: TraceTime,

    /// Wall clock at the time of the snapshot
    pub wall: DateTime<Utc>,
}

impl ClockSnapshot {
    pub fn new(trace: TraceTime, wall: DateTime<Utc>) -> Self {
        Self { trace, wall }
    }

    /// Translate a trace timestamp into wall-clock time
    pub fn wall_time(&self, time: TraceTime) -> DateTime<Utc> {
        self.wall + Duration::nanoseconds(time - self.trace)
    }
}

/// One frame of a captured stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Program counter
    #[serde(default)]
    pub pc: u64,

    /// Fully qualified function name
    #[serde(default)]
    pub func: String,

    /// Source file
    #[serde(default)]
    pub file: String,

    /// Source line
    #[serde(default)]
    pub line: u64,
}

impl Frame {
    pub fn new(pc: u64, func: impl Into<String>, file: impl Into<String>, line: u64) -> Self {
        Self {
            pc,
            func: func.into(),
            file: file.into(),
            line,
        }
    }
}

/// Kind of a trace event together with its kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Generation boundary, optionally carrying a clock snapshot
    Sync {
        #[serde(default)]
        clock_snapshot: Option<ClockSnapshot>,
    },

    /// Runtime metric observation, e.g. `/sched/gomaxprocs:threads`
    Metric { name: String, value: u64 },

    /// Goroutine label
    Label { label: String },

    /// Experimental event batch
    Experimental { name: String },

    /// Start of a user region
    RangeBegin { name: String },

    /// End of a user region
    RangeEnd { name: String },

    /// Goroutine or proc state change; its stack is sampled
    StateTransition,

    /// Any other event the decoder recognized but we have no use for
    Other { name: String },

    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "Sync",
            Self::Metric { .. } => "Metric",
            Self::Label { .. } => "Label",
            Self::Experimental { .. } => "Experimental",
            Self::RangeBegin { .. } => "RangeBegin",
            Self::RangeEnd { .. } => "RangeEnd",
            Self::StateTransition => "StateTransition",
            Self::Other { .. } => "Other",
            Self::Unknown => "Unknown",
        }
    }
}

/// A single decoded trace event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Trace clock timestamp
    pub time: TraceTime,

    #[serde(flatten)]
    pub kind: EventKind,

    /// Stack captured with the event, innermost frame first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<Frame>,

    /// Goroutine the event was emitted on
    #[serde(default)]
    pub goroutine: u64,
}

impl Event {
    pub fn new(time: TraceTime, kind: EventKind) -> Self {
        Self {
            time,
            kind,
            stack: Vec::new(),
            goroutine: 0,
        }
    }

    pub fn sync(time: TraceTime, wall: DateTime<Utc>) -> Self {
        Self::new(
            time,
            EventKind::Sync {
                clock_snapshot: Some(ClockSnapshot::new(time, wall)),
            },
        )
    }

    pub fn metric(time: TraceTime, name: impl Into<String>, value: u64) -> Self {
        Self::new(
            time,
            EventKind::Metric {
                name: name.into(),
                value,
            },
        )
    }

    pub fn range_begin(time: TraceTime, name: impl Into<String>) -> Self {
        Self::new(time, EventKind::RangeBegin { name: name.into() })
    }

    pub fn range_end(time: TraceTime, name: impl Into<String>) -> Self {
        Self::new(time, EventKind::RangeEnd { name: name.into() })
    }

    pub fn state_transition(time: TraceTime, goroutine: u64, stack: Vec<Frame>) -> Self {
        Self {
            time,
            kind: EventKind::StateTransition,
            stack,
            goroutine,
        }
    }

    pub fn with_stack(mut self, stack: Vec<Frame>) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_goroutine(mut self, goroutine: u64) -> Self {
        self.goroutine = goroutine;
        self
    }
}
