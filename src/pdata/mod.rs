//! Telemetry documents produced by the converter.
//!
//! Profiles and metrics follow the resource -> scope -> item nesting of the
//! OpenTelemetry data model and serialize to JSON via serde.

pub mod metrics;
pub mod profiles;

pub use metrics::{Gauge, Metric, Metrics, NumberDataPoint, ResourceMetrics, ScopeMetrics};
pub use profiles::{
    Function, KeyValueAndUnit, Line, Link, Location, Mapping, Profile, Profiles,
    ProfilesDictionary, ResourceProfiles, Sample, ScopeProfiles, Stack, ValueType,
};

use chrono::{DateTime, Utc};

/// Nanoseconds since the Unix epoch, zero for times before it or out of range
pub fn unix_nanos(time: DateTime<Utc>) -> u64 {
    time.timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}
