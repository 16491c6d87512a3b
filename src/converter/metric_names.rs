//! Runtime metric name normalization.
//!
//! Flight recorder metrics are named by path and unit, e.g.
//! `/sched/gomaxprocs:threads`. There are no semantic conventions for most of
//! them yet, so known paths map through [`METRIC_NAME_TABLE`] and everything
//! else becomes a dotted name without the unit.

use crate::utils::config::METRIC_NAME_TABLE;

/// Dotted metric name for a runtime metric path
pub fn normalize_metric_name(raw: &str) -> String {
    let name = raw.strip_prefix('/').unwrap_or(raw);

    if let Some((_, mapped)) = METRIC_NAME_TABLE.iter().find(|(path, _)| *path == name) {
        return (*mapped).to_string();
    }

    let base = match name.rfind(':') {
        Some(idx) => &name[..idx],
        None => name,
    };
    base.replace('/', ".")
}

/// Unit suffix of a runtime metric path, empty if there is none
pub fn metric_unit(raw: &str) -> &str {
    match raw.rfind(':') {
        Some(idx) => &raw[idx + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(
            normalize_metric_name("sched/gomaxprocs:threads"),
            "process.runtime.go.maxprocs"
        );
        assert_eq!(
            normalize_metric_name("/memory/classes/heap/objects:bytes"),
            "runtime.go.mem.heap_objects"
        );
        assert_eq!(
            normalize_metric_name("/gc/heap/goal:bytes"),
            "runtime.go.gc.heap_goal"
        );
    }

    #[test]
    fn test_fallback_strips_unit_and_slashes() {
        assert_eq!(
            normalize_metric_name("/sched/goroutines:goroutines"),
            "sched.goroutines"
        );
        assert_eq!(normalize_metric_name("gc/cycles/total"), "gc.cycles.total");
    }

    #[test]
    fn test_metric_unit() {
        assert_eq!(metric_unit("/sched/gomaxprocs:threads"), "threads");
        assert_eq!(metric_unit("/gc/heap/goal:bytes"), "bytes");
        assert_eq!(metric_unit("/gc/cycles/total"), "");
    }
}
