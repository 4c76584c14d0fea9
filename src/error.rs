//! Error taxonomy shared by the whole crate
//!
//! Every failure is reported synchronously to the caller of the operation
//! that detected it; the core never retries on its own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad static configuration, fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad, expired, or malformed token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Valid token, insufficient claim.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resume cursor points at an evicted update; the caller must resubscribe
    /// without a cursor and accept the gap.
    #[error("stale cursor: updates after {cursor} are no longer retained")]
    StaleCursor { cursor: String },

    /// Caller-supplied name or id does not exist.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Forbidden(_))
    }

    pub fn is_stale_cursor(&self) -> bool {
        matches!(self, Error::StaleCursor { .. })
    }
}
