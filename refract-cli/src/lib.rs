// refract-cli/src/lib.rs
//
// Library portion of the Refract CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, GlobalArgs};
pub use commands::{CommandContext, dispatch};
pub use config::build_engine_config;
pub use output::CommandReport;
