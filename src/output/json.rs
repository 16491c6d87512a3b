//! JSON document writer.
//!
//! Writes profiles and metrics documents to JSON files with proper formatting.

use crate::pdata::{Metrics, Profiles};
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a profiles document to a JSON file
///
/// **Public** - main entry point for profiles output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_profiles(
    profiles: &Profiles,
    output_path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!(
        "Writing {} profiles to: {}",
        profiles.profile_count(),
        output_path.display()
    );
    write_document(profiles, output_path, pretty)
}

/// Write a metrics document to a JSON file
///
/// **Public** - main entry point for metrics output
pub fn write_metrics(
    metrics: &Metrics,
    output_path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!(
        "Writing {} metrics to: {}",
        metrics.metric_count(),
        output_path.display()
    );
    write_document(metrics, output_path, pretty)
}

/// Serialize any document to a string (for stdout or in-memory use)
pub fn document_to_string<T: Serialize>(document: &T, pretty: bool) -> Result<String, OutputError> {
    let out = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    Ok(out)
}

fn write_document<T: Serialize>(
    document: &T,
    output_path: &Path,
    pretty: bool,
) -> Result<(), OutputError> {
    validate_output_path(output_path)?;

    // Create parent directories if needed
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, document)
    } else {
        serde_json::to_writer(&mut writer, document)
    };
    written.map_err(OutputError::SerializationFailed)?;
    // dropping the writer would discard a failed final flush
    writer.flush().map_err(OutputError::WriteFailed)?;

    debug!(
        "Document written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a profiles document from a JSON file
///
/// **Public** - used by `inspect` and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_profiles(input_path: impl AsRef<Path>) -> Result<Profiles, OutputError> {
    let profiles: Profiles = read_document(input_path.as_ref())?;
    debug!(
        "Profiles loaded: {} profiles, {} samples",
        profiles.profile_count(),
        profiles.sample_count()
    );
    Ok(profiles)
}

/// Read a metrics document from a JSON file
pub fn read_metrics(input_path: impl AsRef<Path>) -> Result<Metrics, OutputError> {
    let metrics: Metrics = read_document(input_path.as_ref())?;
    debug!(
        "Metrics loaded: {} metrics, {} data points",
        metrics.metric_count(),
        metrics.data_point_count()
    );
    Ok(metrics)
}

fn read_document<T: DeserializeOwned>(input_path: &Path) -> Result<T, OutputError> {
    debug!("Reading document from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let document = serde_json::from_reader(BufReader::new(file))
        .map_err(OutputError::SerializationFailed)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdata::{Metric, ResourceMetrics, ScopeMetrics};
    use tempfile::NamedTempFile;

    fn create_test_metrics() -> Metrics {
        let mut metric = Metric::gauge("process.runtime.go.maxprocs", "threads");
        metric.push(1_700_000_000_000_000_000, 4.0);
        Metrics {
            resource_metrics: vec![ResourceMetrics {
                schema_url: "https://opentelemetry.io/schemas/1.38.0".to_string(),
                scope_metrics: vec![ScopeMetrics {
                    schema_url: "https://opentelemetry.io/schemas/1.38.0".to_string(),
                    metrics: vec![metric],
                }],
            }],
        }
    }

    #[test]
    fn test_write_and_read_metrics() {
        let metrics = create_test_metrics();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        write_metrics(&metrics, path, true).unwrap();
        let loaded = read_metrics(path).unwrap();

        assert_eq!(loaded, metrics);
    }

    #[test]
    fn test_document_to_string_compact() {
        let out = document_to_string(&create_test_metrics(), false).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("\"name\":\"process.runtime.go.maxprocs\""));
    }

    #[test]
    fn test_validate_output_path_empty() {
        let result = validate_output_path(Path::new(""));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = validate_output_path(temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/profiles.json");

        write_profiles(&Profiles::new(), &nested_path, false).unwrap();

        assert!(nested_path.exists());
        assert_eq!(read_profiles(&nested_path).unwrap(), Profiles::new());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_to_full_device_fails() {
        let result = write_metrics(&Metrics::new(), "/dev/full", false);
        assert!(matches!(result, Err(OutputError::WriteFailed(_))));
    }
}
