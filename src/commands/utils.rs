use crate::output::{read_metrics, read_profiles};
use crate::utils::config::SCHEMA_URL;
use anyhow::{Context, Result};
use std::path::Path;

/// Print counts for a profiles or metrics JSON document
pub fn inspect_file(file_path: &Path) -> Result<()> {
    println!("Inspecting: {}", file_path.display());

    if let Ok(profiles) = read_profiles(file_path) {
        let dict = &profiles.dictionary;
        let finalized = profiles.profiles().filter(|p| p.is_finalized()).count();

        println!("✓ Valid profiles JSON");
        println!("  Resources: {}", profiles.resource_profiles.len());
        println!(
            "  Profiles:  {} ({} finalized)",
            profiles.profile_count(),
            finalized
        );
        println!("  Samples:   {}", profiles.sample_count());
        println!("  Strings:   {}", dict.string_table.len());
        println!("  Functions: {}", dict.function_table.len());
        println!("  Locations: {}", dict.location_table.len());
        println!("  Stacks:    {}", dict.stack_table.len());
        return Ok(());
    }

    let metrics = read_metrics(file_path)
        .with_context(|| format!("{} is neither a profiles nor a metrics document", file_path.display()))?;

    println!("✓ Valid metrics JSON");
    println!("  Resources:   {}", metrics.resource_metrics.len());
    println!("  Metrics:     {}", metrics.metric_count());
    println!("  Data points: {}", metrics.data_point_count());
    for metric in metrics.metrics() {
        println!(
            "    {} [{}]: {} points",
            metric.name,
            metric.unit,
            metric.gauge.data_points.len()
        );
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("flightrec v{}", env!("CARGO_PKG_VERSION"));
    println!("Schema: {}", SCHEMA_URL);
    println!();
    println!("Converts runtime flight recorder traces into profiles and gauge metrics.");
}
