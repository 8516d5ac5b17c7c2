//! Error types for brain operations.

use thiserror::Error;

/// Errors that can occur during brain processing.
#[derive(Debug, Error)]
pub enum BrainError {
    /// The brain is temporarily unavailable.
    #[error("brain unavailable: {0}")]
    Unavailable(String),

    /// The message could not be processed.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// The brain was configured incorrectly.
    #[error("configuration error: {0}")]
    Configuration(String),
}
