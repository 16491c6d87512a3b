//! Scheduled flight recorder receiver.
//!
//! After the initial delay the receiver scrapes once, then again on every
//! collection interval, until it is shut down. Each cycle runs on the blocking
//! pool since conversion is synchronous file I/O.

use super::scraper::scrape;
use super::sink::{MetricsSink, ProfilesSink};
use crate::utils::config::ReceiverConfig;
use crate::utils::error::{ReceiverError, ScrapeError, ScrapeErrors};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Summary of one scrape-and-deliver cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    pub files_matched: usize,
    pub files_converted: usize,
    pub profiles: usize,
    pub samples: usize,
    pub data_points: usize,
    pub profiles_delivered: bool,
    pub metrics_delivered: bool,
    pub cancelled: bool,
    pub errors: ScrapeErrors,
}

impl CycleReport {
    pub fn summary(&self) -> String {
        format!(
            "{}/{} files converted, {} profiles ({} samples), {} metric points, {} errors",
            self.files_converted,
            self.files_matched,
            self.profiles,
            self.samples,
            self.data_points,
            self.errors.len()
        )
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls trace files and feeds the configured sinks
pub struct FlightRecorderReceiver {
    config: ReceiverConfig,
    profiles_sink: RwLock<Option<Arc<dyn ProfilesSink>>>,
    metrics_sink: RwLock<Option<Arc<dyn MetricsSink>>>,
    running: Mutex<Option<Running>>,
    cycles: AtomicU64,
}

impl std::fmt::Debug for FlightRecorderReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightRecorderReceiver")
            .field("config", &self.config)
            .field("cycles", &self.cycles_completed())
            .field("running", &self.is_running())
            .finish()
    }
}

impl FlightRecorderReceiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            profiles_sink: RwLock::new(None),
            metrics_sink: RwLock::new(None),
            running: Mutex::new(None),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn set_profiles_sink(&self, sink: Arc<dyn ProfilesSink>) {
        *self
            .profiles_sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn set_metrics_sink(&self, sink: Arc<dyn MetricsSink>) {
        *self
            .metrics_sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    /// Number of scrape cycles finished since creation
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// Starting an already running receiver is a no-op, so two pipelines
    /// sharing one receiver can both start it.
    ///
    /// # Errors
    /// * `ReceiverError::NoRuntime` - Called outside of a tokio runtime
    pub fn start(self: &Arc<Self>) -> Result<(), ReceiverError> {
        let mut running = self.lock_running();
        if running.is_some() {
            debug!("Receiver already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()?;
        let cancel = CancellationToken::new();
        let this = Arc::clone(self);
        let token = cancel.clone();
        let handle = runtime.spawn(async move { this.run(token).await });

        info!(
            "Receiver started (include: {}, initial delay: {:?}, interval: {:?})",
            self.config.include, self.config.initial_delay, self.config.collection_interval
        );
        *running = Some(Running { cancel, handle });
        Ok(())
    }

    /// Stop the polling task and wait for it to exit.
    ///
    /// A cycle in progress sees the cancellation at its next event read or
    /// file boundary. Shutting down a receiver that is not running is a no-op.
    ///
    /// # Errors
    /// * `ReceiverError::ShutdownTimeout` - The task did not exit in time
    /// * `ReceiverError::TaskFailed` - The task panicked
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), ReceiverError> {
        let running = self.lock_running().take();
        let Some(Running { cancel, handle }) = running else {
            return Ok(());
        };

        cancel.cancel();
        match time::timeout(timeout, handle).await {
            Ok(joined) => {
                joined?;
                info!("Receiver stopped");
                Ok(())
            }
            Err(_) => Err(ReceiverError::ShutdownTimeout(timeout)),
        }
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = time::sleep(self.config.initial_delay) => {}
        }

        // interval_at panics on a zero period
        let period = self.config.collection_interval.max(Duration::from_millis(1));
        let Some(first_tick) = Instant::now().checked_add(period) else {
            warn!(
                "collection interval {:?} is out of range, scraping once",
                period
            );
            self.run_cycle(&cancel).await;
            cancel.cancelled().await;
            return;
        };
        let mut ticker = time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.run_cycle(&cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }
        debug!("Receiver loop exited");
    }

    async fn run_cycle(self: &Arc<Self>, cancel: &CancellationToken) {
        let this = Arc::clone(self);
        let token = cancel.clone();
        match tokio::task::spawn_blocking(move || this.scrape_and_emit(&token)).await {
            Ok(report) if report.errors.is_empty() => {
                info!("Scrape cycle finished: {}", report.summary());
            }
            Ok(report) => {
                info!("Scrape cycle finished: {}", report.summary());
                error!("failed to scrape flight recorder files: {}", report.errors);
            }
            Err(e) => error!("scrape cycle failed: {}", e),
        }
    }

    /// Run one full cycle synchronously: scrape, merge, deliver.
    ///
    /// **Public** - used by the scheduler and for one-shot runs
    ///
    /// Batches without any resource are not delivered. Delivery failures are
    /// added to the report's errors and do not affect the other sink.
    pub fn scrape_and_emit(&self, cancel: &CancellationToken) -> CycleReport {
        let outcome = scrape(&self.config, cancel);

        let mut report = CycleReport {
            files_matched: outcome.files_matched,
            files_converted: outcome.files_converted,
            profiles: outcome.profiles.profile_count(),
            samples: outcome.profiles.sample_count(),
            data_points: outcome.metrics.data_point_count(),
            cancelled: outcome.cancelled,
            errors: outcome.errors,
            ..Default::default()
        };

        let profiles_sink = self
            .profiles_sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = profiles_sink {
            if !outcome.profiles.is_empty() {
                match sink.consume_profiles(&outcome.profiles) {
                    Ok(()) => report.profiles_delivered = true,
                    Err(e) => report.errors.push(ScrapeError::ProfilesDelivery(e)),
                }
            }
        }

        let metrics_sink = self
            .metrics_sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = metrics_sink {
            if !outcome.metrics.is_empty() {
                match sink.consume_metrics(&outcome.metrics) {
                    Ok(()) => report.metrics_delivered = true,
                    Err(e) => report.errors.push(ScrapeError::MetricsDelivery(e)),
                }
            }
        }

        self.cycles.fetch_add(1, Ordering::AcqRel);
        report
    }
}
