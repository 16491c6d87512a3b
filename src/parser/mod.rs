//! Trace event stream contract.
//!
//! This module handles:
//! - The decoded event model (kinds, stacks, clock snapshots)
//! - Opening a trace file as a pull-based event source
//! - An in-memory source for embedding and tests

pub mod event;
pub mod source;

// Re-export main types
pub use event::{ClockSnapshot, Event, EventKind, Frame, TraceTime};
pub use source::{open, EventSource, JsonLinesSource, MemorySource};
