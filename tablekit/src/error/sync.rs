//! URL sync error types

use thiserror::Error;

/// Error produced while reconciling query state with the address bar.
///
/// Sync failures are logged and swallowed at the call site; the in-memory
/// query stays authoritative even when the URL could not be updated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Writing the new parameter set to the URL failed.
    #[error("url write failed: {0}")]
    Write(String),

    /// The current URL's query string could not be parsed.
    #[error("malformed query params: {0}")]
    Malformed(String),
}
