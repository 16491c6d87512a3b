//! Shared receiver construction.
//!
//! A profiles pipeline and a metrics pipeline built from the same
//! configuration get the same receiver, so the trace files are scraped once
//! per cycle and each batch goes to both sinks.

use super::receiver::FlightRecorderReceiver;
use super::sink::{MetricsSink, ProfilesSink};
use crate::utils::config::ReceiverConfig;
use crate::utils::error::ConfigError;
use std::sync::{Arc, OnceLock};

#[derive(Debug)]
pub struct ReceiverFactory {
    config: ReceiverConfig,
    shared: OnceLock<Arc<FlightRecorderReceiver>>,
}

impl ReceiverFactory {
    /// # Errors
    /// * `ConfigError::Invalid` - The configuration fails validation
    pub fn new(config: ReceiverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            shared: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// The receiver for this configuration, created on first use
    pub fn receiver(&self) -> Arc<FlightRecorderReceiver> {
        Arc::clone(
            self.shared
                .get_or_init(|| Arc::new(FlightRecorderReceiver::new(self.config.clone()))),
        )
    }

    /// Attach a profiles sink to the shared receiver
    pub fn create_profiles_receiver(
        &self,
        sink: Arc<dyn ProfilesSink>,
    ) -> Arc<FlightRecorderReceiver> {
        let receiver = self.receiver();
        receiver.set_profiles_sink(sink);
        receiver
    }

    /// Attach a metrics sink to the shared receiver
    pub fn create_metrics_receiver(&self, sink: Arc<dyn MetricsSink>) -> Arc<FlightRecorderReceiver> {
        let receiver = self.receiver();
        receiver.set_metrics_sink(sink);
        receiver
    }
}
