//! Error taxonomy for the journal core.
//!
//! Every failure is surfaced to the caller unrecovered. The binary wraps these in
//! `anyhow` for reporting; library code matches on the variants (for example the CLI
//! re-runs the initializer on [`Error::Config`]).

use thiserror::Error;

/// Errors produced by the journal core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed token or entry envelope.
    #[error("format error: {0}")]
    Format(String),

    /// Ciphertext failed its integrity check (wrong password or corrupted data).
    #[error("authentication failed: wrong password or corrupted entry")]
    Authentication,

    /// Git initialization, pull, push or merge failure.
    #[error("sync error: {0}")]
    Sync(String),

    /// Unreadable or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Password could not be obtained or stored.
    #[error("credential error: {0}")]
    Credential(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Sync(err.message().to_string())
    }
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn sync(msg: impl Into<String>) -> Self {
        Error::Sync(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
