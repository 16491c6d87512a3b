//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an event source while decoding a trace stream
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read trace stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed event on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("truncated trace stream: {0}")]
    Truncated(String),

    #[error("not an event stream: {0}")]
    NotAnEventStream(String),
}

/// Errors that abort the conversion of a single trace file
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("trace decoding failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors raised while handing a batch to a downstream sink
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("sink rejected batch: {0}")]
    Rejected(String),

    #[error("failed to write batch: {0}")]
    Output(#[from] OutputError),
}

/// A single failure recorded during one scrape cycle
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("invalid include pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to resolve glob match: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to convert {}: {source}", path.display())]
    Convert {
        path: PathBuf,
        #[source]
        source: ConvertError,
    },

    #[error("profiles delivery failed: {0}")]
    ProfilesDelivery(#[source] DeliveryError),

    #[error("metrics delivery failed: {0}")]
    MetricsDelivery(#[source] DeliveryError),
}

/// All failures of one scrape cycle, joined into a single error
#[derive(Debug, Default)]
pub struct ScrapeErrors(pub Vec<ScrapeError>);

impl ScrapeErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, err: ScrapeError) {
        self.0.push(err);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScrapeError> {
        self.0.iter()
    }

    /// `Err(self)` when anything failed, `Ok(())` otherwise
    pub fn into_result(self) -> Result<(), ScrapeErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ScrapeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScrapeErrors {}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading receiver configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the receiver lifecycle
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("receiver did not stop within {0:?}")]
    ShutdownTimeout(std::time::Duration),

    #[error("scrape task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("receiver must be started from within a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
