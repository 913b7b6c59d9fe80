// ============================================================================
// skywatch-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reuses skywatch-core's error type. Failures from std and serde are
// wrapped with a short description of the step that failed, and rejected
// inputs get consistent messages naming the accepted file types.
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - CliErrorContext: Prefixes a failing step onto any core-convertible error
// - unsupported_input / not_a_file: Input validation errors
//
// AI-ASSISTANT-INFO: CLI error handling utilities

use skywatch_core::{CoreError, CoreResult};

use std::fmt;
use std::path::Path;

/// Result type for CLI operations.
pub type CliResult<T> = CoreResult<T>;

/// Names the CLI step that produced an error.
pub trait CliErrorContext<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Lazily evaluated variant of `cli_context`.
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.cli_with_context(|| context)
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let cause: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {cause}", f()))
        })
    }
}

/// Error for an input whose extension this subcommand does not accept.
pub fn unsupported_input(path: &Path, kind: &str, extensions: &[&str]) -> CoreError {
    let accepted: Vec<String> = extensions.iter().map(|ext| format!(".{ext}")).collect();
    CoreError::OperationFailed(format!(
        "Input file '{}' is not a supported {kind} ({})",
        path.display(),
        accepted.join(", ")
    ))
}

/// Error for an input path that exists but names a directory or device.
pub fn not_a_file(path: &Path) -> CoreError {
    CoreError::OperationFailed(format!("Input path '{}' is not a file", path.display()))
}

/// Builds an `OperationFailed` error from a format string.
#[macro_export]
macro_rules! cli_error {
    ($($arg:tt)*) => {
        ::skywatch_core::CoreError::OperationFailed(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn result_context_prefixes_message() {
        let result: Result<(), io::Error> = Err(io::Error::other("disk full"));
        let err = result.cli_context("Writing output").unwrap_err();
        assert_eq!(err.to_string(), "Operation failed: Writing output: I/O error: disk full");
    }

    #[test]
    fn lazy_context_is_only_built_on_error() {
        let ok: Result<u32, io::Error> = Ok(3);
        let value = ok
            .cli_with_context(|| -> String { panic!("context built for Ok") })
            .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn unsupported_input_lists_extensions() {
        let err = unsupported_input(Path::new("clip.mkv"), "video", &["mp4", "avi", "mov"]);
        assert_eq!(
            err.to_string(),
            "Operation failed: Input file 'clip.mkv' is not a supported video (.mp4, .avi, .mov)"
        );
    }

    #[test]
    fn not_a_file_names_path() {
        let err = not_a_file(Path::new("/tmp"));
        assert!(matches!(err, CoreError::OperationFailed(msg) if msg == "Input path '/tmp' is not a file"));
    }
}
