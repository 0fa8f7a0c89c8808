// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parlor commenting service.

use thiserror::Error;

/// The primary error type used across all Parlor adapter traits and core operations.
///
/// Variants map one-to-one onto the error kinds surfaced at the REST boundary:
/// validation (400), authentication/authorization (401/403), not-found (404),
/// conflict (409), rate limiting (429), and everything transient or internal (500).
#[derive(Debug, Error)]
pub enum ParlorError {
    /// Request failed validation (empty text, oversized comment, missing user).
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state (duplicate id, repeated vote,
    /// edit outside the window, same-IP vote throttle).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller exceeded the per-IP rate limit.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Storage backend errors (database open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound HTTP errors (title fetch, RPC admin store, webhook destination).
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParlorError {
    /// Wrap an arbitrary error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ParlorError::Storage {
            source: Box::new(source),
        }
    }

    /// True when retrying the same request cannot succeed without a client-side change.
    pub fn is_permanent(&self) -> bool {
        !matches!(
            self,
            ParlorError::RateLimited | ParlorError::Storage { .. } | ParlorError::Http { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = ParlorError::Conflict("id already exists".into());
        assert_eq!(err.to_string(), "conflict: id already exists");

        let err = ParlorError::storage(std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn permanence_classification() {
        assert!(ParlorError::Validation("empty text".into()).is_permanent());
        assert!(ParlorError::NotFound("comment".into()).is_permanent());
        assert!(!ParlorError::RateLimited.is_permanent());
        assert!(!ParlorError::storage(std::io::Error::other("io")).is_permanent());
    }
}
