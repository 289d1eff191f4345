//! Error types for message composition.

use thiserror::Error;

/// Errors raised while composing or serializing a message.
#[derive(Debug, Error)]
pub enum Error {
    /// A call received an argument that violates its contract: wrong part
    /// kind, malformed address, missing filename or data.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The message is not complete enough to be serialized.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// MIME collaborator failure.
    #[error(transparent)]
    Mime(#[from] rfcmail_mime::Error),
}

impl Error {
    /// Returns true for [`Error::InvalidArgument`].
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns true for [`Error::InvalidState`].
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
