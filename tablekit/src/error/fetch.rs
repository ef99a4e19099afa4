//! Fetch error types

use thiserror::Error;

/// Error produced by a data source's fetch path.
///
/// Fetch errors are the only failure class that propagates into visible
/// table state (the `error` field); everything internal to the engine
/// degrades locally instead. The type is `Clone` because it is stored in
/// state snapshots.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The underlying request failed (network, backend, decode).
    #[error("request failed: {0}")]
    Request(String),

    /// The data source was asked to fetch while not ready.
    #[error("data source is not ready")]
    NotReady,

    /// The response could not be interpreted as a page of rows.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Creates a request failure from any displayable cause.
    pub fn request(cause: impl std::fmt::Display) -> Self {
        Self::Request(cause.to_string())
    }
}
