//! # rfcmail-mime
//!
//! MIME primitives for generating RFC 5322 e-mail messages.
//!
//! ## Features
//!
//! - **Part trees**: Leaf and multipart [`Node`]s serialized with generated boundaries
//! - **Headers**: Ordered, case-insensitive [`Headers`] with line folding
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 encoded-words
//! - **Content types**: [`ContentType`] and [`ContentDisposition`] values
//! - **Addresses**: Address parsing and [`format_address`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use rfcmail_mime::{ContentType, Headers, Node, RenderConfig};
//! use rfcmail_mime::encoding::encode_quoted_printable;
//!
//! let mut headers = Headers::new();
//! headers.add("Content-Type", ContentType::new("text", "plain").to_string());
//! headers.add("Content-Transfer-Encoding", "quoted-printable");
//! headers.add("Subject", "Hello");
//!
//! let node = Node::leaf(headers, encode_quoted_printable("Hello, World!"));
//! println!("{}", node.render(&RenderConfig::default()));
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```ignore
//! use rfcmail_mime::encoding::{encode_base64, decode_base64, encode_rfc2047};
//!
//! let encoded = encode_base64(b"Hello, World!");
//! let decoded = decode_base64(&encoded)?;
//!
//! // RFC 2047 header encoding
//! let subject = encode_rfc2047("Héllo", "utf-8");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod config;
mod content_type;
mod disposition;
mod error;
mod header;
mod node;

pub mod encoding;

pub use address::{Address, format_address};
pub use config::{LineEnding, RenderConfig};
pub use content_type::ContentType;
pub use disposition::{ContentDisposition, DispositionType};
pub use error::{Error, Result};
pub use header::{Headers, format_rfc5322_date};
pub use node::{Body, Node, TransferEncoding};
