// skywatch-cli/src/lib.rs
//
// Library portion of the Skywatch CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{AnnotateArgs, Cli, Commands, ImageArgs, ProbeArgs, ProcessingArgs};
pub use commands::annotate::run_annotate;
pub use commands::image::run_image;
pub use commands::probe::run_probe;
pub use error::{CliErrorContext, CliResult};
