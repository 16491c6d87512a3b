//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod convert;
pub mod run;
pub mod utils;

// Re-export main command functions
pub use convert::{execute_convert, validate_args, ConvertArgs};
pub use run::{execute_run, resolve_config, RunArgs};
pub use utils::{display_version, inspect_file};
