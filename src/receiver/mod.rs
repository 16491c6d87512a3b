//! Batch scrape orchestration.
//!
//! This module handles:
//! - Resolving the include pattern and converting every matched trace file
//! - Merging per-file results into one batch per cycle
//! - Running cycles on a schedule and delivering batches to sinks
//! - Sharing one receiver between a profiles and a metrics pipeline

pub mod factory;
#[allow(clippy::module_inception)]
pub mod receiver;
pub mod scraper;
pub mod sink;

// Re-export main types
pub use factory::ReceiverFactory;
pub use receiver::{CycleReport, FlightRecorderReceiver};
pub use scraper::{convert_file, scrape, scrape_pattern, ScrapeOutcome};
pub use sink::{JsonDirSink, MetricsSink, ProfilesSink};
