//! Errors surfaced by handlers, storage backends and the live view

use ocistat_schema::{Digest, ParseError};
use thiserror::Error;

/// Every failure a hook can return.
///
/// Reporter, resolution and storage failures share this one type so that a
/// hook propagates whatever it received with `?`, unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// Tracking was requested on an output that is not an interactive terminal.
    #[error("output is not a terminal; live progress needs a TTY")]
    NotTerminal,

    /// The storage backend has no content for this digest.
    #[error("{0}: not found")]
    NotFound(Digest),

    /// Reading or writing content failed.
    #[error("failed to transfer {digest}: {source}")]
    Transfer {
        /// Digest being transferred.
        digest: Digest,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest or index could not be parsed.
    #[error("failed to parse {digest}: {source}")]
    Parse {
        /// Digest of the unparseable content.
        digest: Digest,
        /// Underlying parse error.
        #[source]
        source: ParseError,
    },

    /// Writing a status line failed.
    #[error("failed to report status: {0}")]
    Report(#[source] std::io::Error),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap an I/O failure on `digest`.
    pub fn transfer(digest: &Digest, source: std::io::Error) -> Self {
        Self::Transfer {
            digest: digest.clone(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
