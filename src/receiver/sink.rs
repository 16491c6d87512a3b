//! Downstream consumers of scraped batches.

use crate::output::{write_metrics, write_profiles};
use crate::pdata::{Metrics, Profiles};
use crate::utils::error::DeliveryError;
use chrono::Utc;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives the merged profiles batch of every scrape cycle
pub trait ProfilesSink: Send + Sync {
    fn consume_profiles(&self, profiles: &Profiles) -> Result<(), DeliveryError>;
}

/// Receives the merged metrics batch of every scrape cycle
pub trait MetricsSink: Send + Sync {
    fn consume_metrics(&self, metrics: &Metrics) -> Result<(), DeliveryError>;
}

/// Writes each batch as a JSON file into a directory.
///
/// Files are named `profiles-<timestamp>-<seq>.json` and
/// `metrics-<timestamp>-<seq>.json`.
#[derive(Debug)]
pub struct JsonDirSink {
    dir: PathBuf,
    pretty: bool,
    seq: AtomicU64,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
            seq: AtomicU64::new(0),
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self, kind: &str) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.dir.join(format!("{}-{}-{:04}.json", kind, stamp, seq))
    }
}

impl ProfilesSink for JsonDirSink {
    fn consume_profiles(&self, profiles: &Profiles) -> Result<(), DeliveryError> {
        let path = self.next_path("profiles");
        debug!("Delivering profiles batch to {}", path.display());
        write_profiles(profiles, &path, self.pretty)?;
        Ok(())
    }
}

impl MetricsSink for JsonDirSink {
    fn consume_metrics(&self, metrics: &Metrics) -> Result<(), DeliveryError> {
        let path = self.next_path("metrics");
        debug!("Delivering metrics batch to {}", path.display());
        write_metrics(metrics, &path, self.pretty)?;
        Ok(())
    }
}
