//! Trace to telemetry conversion.
//!
//! This module handles:
//! - Walking a decoded event stream once
//! - Turning user ranges into wall-time profiles with sampled stacks
//! - Turning runtime metric events into gauges

pub mod engine;
pub mod metric_names;

// Re-export main types
pub use engine::{convert, Conversion, ConversionStats, Converter};
pub use metric_names::{metric_unit, normalize_metric_name};
