//! # rfcmail
//!
//! Programmatic composition of RFC 5322 / MIME e-mail messages.
//!
//! ## Features
//!
//! - **Typed parts**: [`Part`]s for bodies, attachments, inline content and
//!   multipart containers, encoded when they are created
//! - **Composer**: [`Message`] arranges bodies into `multipart/alternative`,
//!   related content into `multipart/related` and attachments into
//!   `multipart/mixed`
//! - **Validated addresses**: every sender and recipient is checked on entry
//! - **Header encoding**: non-ASCII subjects and header values become
//!   RFC 2047 encoded-words
//!
//! ## Quick Start
//!
//! ```ignore
//! use rfcmail::{Message, Part};
//!
//! let mut message = Message::new();
//! message.set_sender("Alice <alice@example.com>")?;
//! message.add_to("bob@example.com")?;
//! message.set_subject("Lunch");
//!
//! // Least preferred representation first
//! message.add_body(Part::body("text/plain", "See you at noon")?)?;
//! message.add_body(Part::body("text/html", "<p>See you at <b>noon</b></p>")?)?;
//! message.add_attachment(Part::binary_attachment("application/pdf", pdf_bytes, "menu.pdf")?)?;
//!
//! let wire = message.as_string()?;
//! ```
//!
//! ### Inline images
//!
//! ```ignore
//! let logo = Part::binary_inline("image/png", png_bytes, "logo.png")?;
//! let html = format!("<img src=\"cid:{}\">", logo.content_id().unwrap_or_default());
//!
//! message.add_body(Part::body("text/html", html)?)?;
//! message.add_body_related_attachment(logo)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod message;
mod part;
mod set;

pub use error::{Error, Result};
pub use message::Message;
pub use part::{Data, Part, PartKind};
pub use set::OrderedSet;

pub use rfcmail_mime::{Address, LineEnding, RenderConfig, format_address};
