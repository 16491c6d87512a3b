//! Output writers for converted telemetry.
//!
//! This module handles writing documents to disk as JSON, pretty or compact.

pub mod json;

// Re-export main functions
pub use json::{document_to_string, read_metrics, read_profiles, write_metrics, write_profiles};
