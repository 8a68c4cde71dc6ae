//! Unified error type for Domicilio operations
//!
//! One enum covers the whole crate family. Variants map to the recovery
//! behavior the caller should apply: `Invalid` and `NotFound` recover
//! locally, `Network` and `Timeout` are retryable by a later user edit,
//! `Catalog` marks reference-data anomalies that degrade but do not abort,
//! and `Internal` is a bug.

use serde::{Deserialize, Serialize};

/// Unified error type for all Domicilio operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DomicilioError {
    /// Invalid input or an operation applied in the wrong state
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found in the catalog
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Network or transport error talking to the catalog
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// A catalog lookup exceeded its time budget
    #[error("Timeout: {message}")]
    Timeout {
        /// Error message describing the timed-out operation
        message: String,
    },

    /// Catalog reference data violates an expected shape
    #[error("Catalog anomaly: {message}")]
    Catalog {
        /// Error message describing the anomaly
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl DomicilioError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a catalog anomaly error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a later, user-triggered retry of the same operation can
    /// plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}
