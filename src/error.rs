//! # Error Types
//!
//! This module defines error types used throughout the labelprint library.
//!
//! Encoding never produces partial output: an operation either returns a
//! complete command buffer or one of these errors before anything is emitted.

use thiserror::Error;

/// Main error type for labelprint operations
#[derive(Debug, Error)]
pub enum LabelprintError {
    /// Caller supplied something unusable (zero dimensions, non-PDF source,
    /// unknown command set)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A page violated the encoder contract (width not byte-aligned,
    /// wrong buffer length, non-binary pixels)
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// External PDF renderer failed
    #[error("Render error: {0}")]
    Render(String),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(String),

    /// Transport-level errors (connection, write, HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for labelprint operations
pub type Result<T> = std::result::Result<T, LabelprintError>;

impl LabelprintError {
    /// True for errors caused by the caller's input rather than the
    /// environment (used by the HTTP service to pick a status code).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LabelprintError::InvalidInput(_) | LabelprintError::Precondition(_)
        )
    }
}
