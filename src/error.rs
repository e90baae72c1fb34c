//! Error types for the storefront core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Storage Error Enum ==
/// Failures of the key-value store and the expiring cache built on it.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying store write failed
    #[error("Storage write failed: {0}")]
    Write(String),

    /// Underlying store clear failed
    #[error("Storage clear failed: {0}")]
    Clear(String),

    /// Underlying store read failed. The cache turns this into a miss.
    #[error("Storage read failed: {0}")]
    Read(String),

    /// Value could not be serialized before writing
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Write would exceed the configured store quota
    #[error("Storage quota exceeded: {used} of {limit} bytes")]
    Quota { used: usize, limit: usize },
}

// == Review Error Enum ==
/// Failures surfaced by the review collaborator and the list controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReviewError {
    /// Backend answered with `success: false`
    #[error("{message}")]
    Api { message: String },

    /// Network or transport failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Backend answered with a body that does not match the envelope
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Review data rejected before it was sent
    #[error("Invalid review: {0}")]
    InvalidReview(String),

    /// Mutation attempted before a review list was loaded
    #[error("Reviews are not loaded yet")]
    NotReady,

    /// Operation needs a product but none is selected
    #[error("No product selected")]
    MissingProduct,
}

impl ReviewError {
    /// Builds an `Api` error from an optional backend message.
    pub fn api(message: Option<String>, fallback: &str) -> Self {
        ReviewError::Api {
            message: message.unwrap_or_else(|| fallback.to_string()),
        }
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReviewError::InvalidResponse(err.to_string())
        } else {
            ReviewError::Request(err.to_string())
        }
    }
}

// == App Error Enum ==
/// Failures while building the application context.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

// == Result Type Aliases ==
/// Convenience Result type for storage and cache operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Convenience Result type for review operations.
pub type ReviewResult<T> = std::result::Result<T, ReviewError>;
