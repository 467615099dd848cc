//! Error handling for Resonar
//!
//! Every failure is raised synchronously by the call that broke the contract
//! and leaves the prior state untouched.

use std::fmt;

use thiserror::Error;

/// Result type alias for Resonar operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Broad classification of an [`AudioError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An attribute value outside its declared bounds or type
    Validation,
    /// A request incompatible with the current object state
    Operation,
    /// Device selection or context creation failed
    Device,
    /// A file or container problem (wrong, unsupported or broken audio)
    Media,
    /// Underlying I/O failure
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Operation => write!(f, "operation"),
            ErrorKind::Device => write!(f, "device"),
            ErrorKind::Media => write!(f, "media"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

/// Main error type for Resonar operations
#[derive(Error, Debug)]
pub enum AudioError {
    // Validation Errors
    #[error("Invalid parameter value: {attribute} = {value} (expected {expected})")]
    InvalidParameter {
        attribute: &'static str,
        value: String,
        expected: String,
    },

    // Operation Errors
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    #[error("Cannot attach a buffer to a streaming source")]
    BufferOnStreamingSource,

    #[error("Cannot attach a stream to a static source")]
    StreamOnStaticSource,

    #[error(
        "Cannot attach a stream with a different audio format than that of the currently attached stream"
    )]
    StreamFormatMismatch,

    #[error("Cannot use the uninitialized stream")]
    UninitializedStream,

    #[error("Invalid operation: audio context has been cleaned up")]
    ContextReleased,

    // Device Errors
    #[error("Cannot open the specified device: {name}")]
    DeviceNotFound { name: String },

    #[error("Audio device error: {reason}")]
    Device { reason: String },

    // Media Errors
    #[error("Wrong format: expected {expected} but the file contains {detected}")]
    WrongFormat { expected: String, detected: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Backend Errors
    #[error("Backend rejected {operation}: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AudioError {
    /// Shorthand for an out-of-bounds attribute value
    pub fn invalid_parameter(
        attribute: &'static str,
        value: impl fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        AudioError::InvalidParameter {
            attribute,
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Shorthand for a state-incompatible request
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        AudioError::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AudioError::InvalidParameter { .. } => "INVALID_PARAMETER",
            AudioError::InvalidOperation { .. } => "INVALID_OPERATION",
            AudioError::BufferOnStreamingSource => "BUFFER_ON_STREAMING_SOURCE",
            AudioError::StreamOnStaticSource => "STREAM_ON_STATIC_SOURCE",
            AudioError::StreamFormatMismatch => "STREAM_FORMAT_MISMATCH",
            AudioError::UninitializedStream => "UNINITIALIZED_STREAM",
            AudioError::ContextReleased => "CONTEXT_RELEASED",
            AudioError::DeviceNotFound { .. } => "DEVICE_NOT_FOUND",
            AudioError::Device { .. } => "DEVICE_ERROR",
            AudioError::WrongFormat { .. } => "WRONG_FORMAT",
            AudioError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AudioError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AudioError::InvalidAudio { .. } => "INVALID_AUDIO",
            AudioError::Backend { .. } => "BACKEND_ERROR",
            AudioError::Io(_) => "IO_ERROR",
            AudioError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::InvalidParameter { .. } | AudioError::Serialization(_) => {
                ErrorKind::Validation
            }
            AudioError::InvalidOperation { .. }
            | AudioError::BufferOnStreamingSource
            | AudioError::StreamOnStaticSource
            | AudioError::StreamFormatMismatch
            | AudioError::UninitializedStream
            | AudioError::ContextReleased
            | AudioError::Backend { .. } => ErrorKind::Operation,
            AudioError::DeviceNotFound { .. } | AudioError::Device { .. } => ErrorKind::Device,
            AudioError::WrongFormat { .. }
            | AudioError::UnsupportedFormat { .. }
            | AudioError::FileNotFound { .. }
            | AudioError::InvalidAudio { .. } => ErrorKind::Media,
            AudioError::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if this is an attribute validation failure
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if this is a state-incompatible operation
    pub fn is_operation(&self) -> bool {
        self.kind() == ErrorKind::Operation
    }

    /// Check if this error originated from device selection
    pub fn is_device(&self) -> bool {
        self.kind() == ErrorKind::Device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AudioError::FileNotFound {
            path: "test.wav".to_string(),
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert_eq!(err.kind(), ErrorKind::Media);
    }

    #[test]
    fn test_messages_match_contract() {
        let err = AudioError::invalid_parameter("gain", -1.0, "[0, +inf)");
        assert!(err.to_string().starts_with("Invalid parameter value"));
        assert!(err.is_validation());

        let err = AudioError::invalid_operation("buffer is in use");
        assert!(err.to_string().starts_with("Invalid operation"));
        assert!(err.is_operation());

        assert!(AudioError::UninitializedStream
            .to_string()
            .contains("uninitialized stream"));
        assert!(AudioError::BufferOnStreamingSource
            .to_string()
            .contains("buffer to a streaming source"));
    }

    #[test]
    fn test_device_errors_are_classified() {
        let err = AudioError::DeviceNotFound {
            name: "foo42".to_string(),
        };
        assert!(err.is_device());
        assert!(!err.is_operation());
    }
}
