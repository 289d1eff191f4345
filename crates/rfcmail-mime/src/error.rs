//! Errors raised by the MIME primitives.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while parsing, encoding or assembling MIME values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header is missing or cannot carry the requested change.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Malformed `type/subtype` or parameter list.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Malformed quoted-printable or encoded-word input.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid e-mail address.
    #[error("Invalid e-mail address: {0}")]
    InvalidAddress(String),

    /// Children attached to a leaf node.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}
