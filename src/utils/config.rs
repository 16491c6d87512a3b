//! Configuration and constants for the receiver.

use super::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Semantic conventions schema stamped on every resource and scope
pub const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.38.0";

/// Sample type reported for every range profile
pub const SAMPLE_TYPE: &str = "wall";
pub const SAMPLE_UNIT: &str = "nanoseconds";

/// Attribute key for the execution-context id; there is no semantic
/// convention for it yet.
pub const GOROUTINE_ATTRIBUTE_KEY: &str = "GoID";

// Known runtime metric paths and the dotted names they are reported under.
// Anything else falls back to stripping the unit and replacing '/' with '.'.
pub const METRIC_NAME_TABLE: &[(&str, &str)] = &[
    ("sched/gomaxprocs:threads", "process.runtime.go.maxprocs"),
    ("memory/classes/heap/objects:bytes", "runtime.go.mem.heap_objects"),
    ("gc/heap/goal:bytes", "runtime.go.gc.heap_goal"),
];

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(10);

/// Settings the receiver is driven by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Glob pattern selecting the trace files to scrape
    #[serde(default)]
    pub include: String,

    /// Delay before the first scrape
    #[serde(default = "default_initial_delay", with = "duration_str")]
    pub initial_delay: Duration,

    /// Time between two scrapes
    #[serde(default = "default_collection_interval", with = "duration_str")]
    pub collection_interval: Duration,
}

fn default_initial_delay() -> Duration {
    DEFAULT_INITIAL_DELAY
}

fn default_collection_interval() -> Duration {
    DEFAULT_COLLECTION_INTERVAL
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            include: String::new(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            collection_interval: DEFAULT_COLLECTION_INTERVAL,
        }
    }
}

impl ReceiverConfig {
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = interval;
        self
    }

    /// Check that the configuration can drive a receiver
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "include pattern cannot be empty".to_string(),
            ));
        }
        if self.collection_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "collection_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load receiver configuration from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::Invalid` - If the settings fail validation
///
/// # Example
/// ```ignore
/// let config = load_config("flightrec.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ReceiverConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: ReceiverConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Parse a duration written as `250ns`, `40us`, `500ms`, `10s`, `2m`, `1h`
/// or bare seconds
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::Invalid(format!("invalid duration: {:?}", value));

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u128 = digits.parse().map_err(|_| invalid())?;

    let nanos_per_unit: u128 = match unit {
        "ns" => 1,
        "us" => 1_000,
        "ms" => 1_000_000,
        "" | "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3600 * NANOS_PER_SEC,
        _ => return Err(invalid()),
    };
    let total = amount.checked_mul(nanos_per_unit).ok_or_else(invalid)?;
    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

mod duration_str {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    // coarsest unit that keeps the value exact
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let nanos = d.subsec_nanos();
        let text = if nanos == 0 {
            format!("{}s", d.as_secs())
        } else if nanos % 1_000_000 == 0 {
            format!("{}ms", d.as_millis())
        } else if nanos % 1_000 == 0 {
            format!("{}us", d.as_micros())
        } else {
            format!("{}ns", d.as_nanos())
        };
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}
