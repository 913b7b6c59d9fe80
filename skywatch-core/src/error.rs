// ============================================================================
// skywatch-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for skywatch-core
//
// This module defines the error types used throughout the skywatch-core
// library. Pipeline failures (source, encoder, decode, inference, write) get
// dedicated variants so callers can tell a broken input apart from a missing
// codec or a failing detector.
//
// KEY COMPONENTS:
// - CoreError: Enum of all possible errors in the library
// - CoreResult: Type alias for Result with CoreError
// - Helper functions for creating command-related errors

// ---- External crate imports ----
use thiserror::Error;

// ---- Standard library imports ----
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors that can occur while probing, decoding, annotating or encoding.
#[derive(Error, Debug)]
pub enum CoreError {
    // ---- I/O and Serialization Errors ----
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    // ---- Configuration Errors ----
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ---- External Command Errors ----
    #[error("Required external command '{0}' not found")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Failed to wait for command '{0}': {1}")]
    CommandWait(String, io::Error),

    #[error("Command '{cmd}' failed with status {status}: {stderr}")]
    CommandFailed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },

    // ---- Pipeline Errors ----
    /// The input video could not be opened or probed. Raised before any
    /// writer is opened.
    #[error("Could not open video source '{}': {reason}", path.display())]
    SourceOpen { path: PathBuf, reason: String },

    /// A single codec could not be used by the writer backend.
    #[error("Encoder '{fourcc}' unavailable: {reason}")]
    EncoderUnavailable { fourcc: String, reason: String },

    /// Both the primary and the fallback codec failed to initialise.
    #[error("Could not initialise video writer with '{primary}' or '{fallback}': {reason}")]
    EncoderInit {
        primary: String,
        fallback: String,
        reason: String,
    },

    /// A frame failed to decode mid-stream. The pipeline driver treats this
    /// as end of stream.
    #[error("Frame decode failed: {0}")]
    FrameDecode(String),

    #[error("Inference failed on frame {frame_index}: {reason}")]
    Inference { frame_index: u64, reason: String },

    #[error("Failed to write frame: {0}")]
    FrameWrite(String),

    // ---- Generic Errors ----
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for skywatch-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

// ============================================================================
// ERROR HELPER FUNCTIONS
// ============================================================================

/// Creates a `CommandStart` error for a process that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, error: io::Error) -> CoreError {
    let cmd = cmd.into();
    if error.kind() == io::ErrorKind::NotFound {
        CoreError::DependencyNotFound(cmd)
    } else {
        CoreError::CommandStart(cmd, error)
    }
}

/// Creates a `CommandWait` error.
pub fn command_wait_error(cmd: impl Into<String>, error: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), error)
}

/// Creates a `CommandFailed` error from an exit status and captured stderr.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.into(),
        status,
        stderr: stderr.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_maps_to_dependency_not_found() {
        let err = command_start_error("ffmpeg", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CoreError::DependencyNotFound(ref name) if name == "ffmpeg"));

        let err = command_start_error("ffmpeg", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, CoreError::CommandStart(..)));
    }

    #[test]
    fn encoder_init_message_names_both_codecs() {
        let err = CoreError::EncoderInit {
            primary: "avc1".into(),
            fallback: "mp4v".into(),
            reason: "no encoders".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("avc1"));
        assert!(msg.contains("mp4v"));
    }
}
