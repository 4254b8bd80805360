// Error types shared by the session, catalog and download code.
// Callers branch on the variant (app missing vs. version missing vs. bad
// download), so each failure kind keeps its own variant.

use thiserror::Error;

use crate::download::ChecksumKind;

/// Everything that can go wrong while talking to Splunkbase.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("App '{name}' not found on Splunkbase")]
    AppNotFound { name: String },

    #[error("No compatible version of '{name}' found on Splunkbase")]
    NoReleaseFound { name: String },

    #[error("'{name}' found on Splunkbase, but version '{version}' is unavailable")]
    VersionNotFound { name: String, version: String },

    #[error("DownloadFailed{0}")]
    DownloadFailed(#[from] DownloadFailure),

    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid metadata document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Why an artifact download was rejected.
///
/// The display forms are appended to `DownloadFailed`, giving messages such
/// as `DownloadFailed(Status=404): not here`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DownloadFailure {
    #[error("(Status={status}): {body}")]
    Status { status: u16, body: String },

    #[error(": {kind} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        kind: ChecksumKind,
        expected: String,
        actual: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
