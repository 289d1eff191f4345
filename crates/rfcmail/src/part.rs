//! MIME parts: message bodies, attachments, inline content and containers.

use crate::error::{Error, Result};
use rfcmail_mime::{
    ContentDisposition, ContentType, DispositionType, Headers, Node, TransferEncoding,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Process-wide source for `Content-ID` tokens.
static NEXT_CONTENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_content_id() -> String {
    format!("cid{}@mail", NEXT_CONTENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// What a [`Part`] represents inside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    /// One representation of the message body.
    MessageBody,
    /// Textual attachment.
    Attachment,
    /// Binary attachment.
    BinaryAttachment,
    /// Textual inline part.
    Inline,
    /// Binary inline part, e.g. an image referenced by `cid:`.
    BinaryInline,
    /// Container for child parts.
    Multipart,
}

impl PartKind {
    /// Checks if parts of this kind may be added as (related) attachments.
    #[must_use]
    pub const fn is_attachment_like(self) -> bool {
        matches!(
            self,
            Self::Attachment | Self::BinaryAttachment | Self::Inline | Self::BinaryInline
        )
    }

    /// Checks if parts of this kind carry raw bytes instead of text.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::BinaryAttachment | Self::BinaryInline)
    }

    const fn disposition(self) -> Option<DispositionType> {
        match self {
            Self::Attachment | Self::BinaryAttachment => Some(DispositionType::Attachment),
            Self::Inline | Self::BinaryInline => Some(DispositionType::Inline),
            Self::MessageBody | Self::Multipart => None,
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MessageBody => "message body",
            Self::Attachment => "attachment",
            Self::BinaryAttachment => "binary attachment",
            Self::Inline => "inline",
            Self::BinaryInline => "binary inline",
            Self::Multipart => "multipart",
        };
        f.write_str(name)
    }
}

/// Raw content handed to [`Part::new`].
///
/// Text kinds take [`Data::Text`], binary kinds take [`Data::Binary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// UTF-8 text, sent quoted-printable.
    Text(String),
    /// Octets, sent base64.
    Binary(Vec<u8>),
}

impl Data {
    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Encoded(String),
    Children(Vec<Part>),
}

/// One node of the MIME tree.
///
/// Leaf parts are encoded when they are created; a multipart part only holds
/// children. Two parts are equal if kind, headers (including the generated
/// `Content-ID`) and content are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    kind: PartKind,
    content_id: Option<String>,
    headers: Headers,
    content: Content,
}

impl Part {
    /// Creates a part.
    ///
    /// Text kinds are encoded quoted-printable with `charset="UTF-8"`,
    /// binary kinds base64. Attachment and inline kinds need a filename and
    /// receive a fresh `Content-ID`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the MIME type is malformed, a
    /// leaf part gets no data or the wrong kind of data, a multipart part
    /// gets data or a non-multipart type, or an attachment-like part has no
    /// filename.
    pub fn new(
        kind: PartKind,
        mime_type: &str,
        data: Option<Data>,
        filename: Option<&str>,
    ) -> Result<Self> {
        let content_type = ContentType::parse(mime_type)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;

        if content_type.is_multipart() != (kind == PartKind::Multipart) {
            return Err(Error::InvalidArgument(format!(
                "MIME type {mime_type} cannot be used for {kind} parts"
            )));
        }

        let mut headers = Headers::new();

        let content = if kind == PartKind::Multipart {
            if data.is_some() {
                return Err(Error::InvalidArgument(
                    "Multipart parts carry children, not data".to_string(),
                ));
            }
            headers.add("Content-Type", content_type.to_string());
            Content::Children(Vec::new())
        } else {
            let data = data
                .filter(|d| !d.is_empty())
                .ok_or_else(|| Error::InvalidArgument(format!("No data given for {kind} part")))?;

            let (content_type, encoding, encoded) = match (kind.is_binary(), data) {
                (true, Data::Binary(bytes)) => {
                    let encoding = TransferEncoding::Base64;
                    (content_type, encoding, encoding.encode(&bytes)?)
                }
                (false, Data::Text(text)) => {
                    let encoding = TransferEncoding::QuotedPrintable;
                    (
                        content_type.with_parameter("charset", "UTF-8"),
                        encoding,
                        encoding.encode(text.as_bytes())?,
                    )
                }
                (true, Data::Text(_)) => {
                    return Err(Error::InvalidArgument(format!(
                        "{kind} parts require binary data"
                    )));
                }
                (false, Data::Binary(_)) => {
                    return Err(Error::InvalidArgument(format!(
                        "{kind} parts require text data"
                    )));
                }
            };

            headers.add("Content-Type", content_type.to_string());
            headers.add("Content-Transfer-Encoding", encoding.to_string());
            Content::Encoded(encoded)
        };

        let content_id = match kind.disposition() {
            Some(disposition) => {
                let filename = filename
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!("A filename is required for {kind} parts"))
                    })?;

                let content_id = next_content_id();
                headers.add("Content-ID", format!("<{content_id}>"));
                headers.add(
                    "Content-Disposition",
                    ContentDisposition {
                        disposition,
                        filename: Some(filename.to_string()),
                    }
                    .to_string(),
                );
                Some(content_id)
            }
            None => None,
        };

        trace!(%kind, mime_type, content_id = ?content_id, "Created MIME part");

        Ok(Self {
            kind,
            content_id,
            headers,
            content,
        })
    }

    /// Creates a message body part.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn body(mime_type: &str, text: impl Into<String>) -> Result<Self> {
        Self::new(PartKind::MessageBody, mime_type, Some(Data::Text(text.into())), None)
    }

    /// Creates an empty multipart container.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn multipart(mime_type: &str) -> Result<Self> {
        Self::new(PartKind::Multipart, mime_type, None, None)
    }

    /// Creates a textual attachment.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn attachment(mime_type: &str, text: impl Into<String>, filename: &str) -> Result<Self> {
        Self::new(
            PartKind::Attachment,
            mime_type,
            Some(Data::Text(text.into())),
            Some(filename),
        )
    }

    /// Creates a binary attachment.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn binary_attachment(
        mime_type: &str,
        bytes: impl Into<Vec<u8>>,
        filename: &str,
    ) -> Result<Self> {
        Self::new(
            PartKind::BinaryAttachment,
            mime_type,
            Some(Data::Binary(bytes.into())),
            Some(filename),
        )
    }

    /// Creates a textual inline part.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn inline(mime_type: &str, text: impl Into<String>, filename: &str) -> Result<Self> {
        Self::new(
            PartKind::Inline,
            mime_type,
            Some(Data::Text(text.into())),
            Some(filename),
        )
    }

    /// Creates a binary inline part.
    ///
    /// # Errors
    ///
    /// See [`Part::new`].
    pub fn binary_inline(
        mime_type: &str,
        bytes: impl Into<Vec<u8>>,
        filename: &str,
    ) -> Result<Self> {
        Self::new(
            PartKind::BinaryInline,
            mime_type,
            Some(Data::Binary(bytes.into())),
            Some(filename),
        )
    }

    /// Returns the part kind.
    #[must_use]
    pub const fn kind(&self) -> PartKind {
        self.kind
    }

    /// Returns the `Content-ID` token (without angle brackets).
    ///
    /// Only attachment and inline parts have one; reference it from HTML as
    /// `cid:<token>`.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Returns the `type/subtype` of the part.
    #[must_use]
    pub fn mime_type(&self) -> Option<String> {
        self.headers
            .get("Content-Type")
            .and_then(|ct| ContentType::parse(ct).ok())
            .map(|ct| ct.essence())
    }

    /// Gets the headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    pub(crate) const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Appends an extra header, e.g. `Content-Location` or `Content-Description`.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.add(name, value);
    }

    /// Returns the transfer-encoded payload of a leaf part.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match &self.content {
            Content::Encoded(encoded) => Some(encoded),
            Content::Children(_) => None,
        }
    }

    /// Returns the children of a multipart part (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.content {
            Content::Children(children) => children,
            Content::Encoded(_) => &[],
        }
    }

    /// Checks if this is a multipart container.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.kind == PartKind::Multipart
    }

    /// Appends a child, preserving insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if this part is not a multipart part.
    pub fn attach(&mut self, child: Self) -> Result<()> {
        match &mut self.content {
            Content::Children(children) => {
                children.push(child);
                Ok(())
            }
            Content::Encoded(_) => Err(Error::InvalidArgument(format!(
                "Cannot attach a child to a {} part",
                self.kind
            ))),
        }
    }

    /// Converts the part tree into a serializable MIME node tree.
    #[must_use]
    pub fn to_node(&self) -> Node {
        match &self.content {
            Content::Encoded(encoded) => Node::leaf(self.headers.clone(), encoded.clone()),
            Content::Children(children) => Node::multipart(
                self.headers.clone(),
                children.iter().map(Self::to_node).collect(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_attachment() {
        let part = Part::attachment("text/plain", "Hello world", "hello_world.txt").unwrap();
        assert_eq!(part.kind(), PartKind::Attachment);
        assert_eq!(part.payload(), Some("Hello world"));

        let err = Part::new(PartKind::Attachment, "text/plain", Some("Hello world".into()), None)
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let part = Part::attachment(
            "text/plain",
            "Hallo Welt, schön das du dich drehst.",
            "hallo_welt_öäü.txt",
        )
        .unwrap();
        assert_eq!(
            part.payload(),
            Some("Hallo Welt, sch=C3=B6n das du dich drehst.")
        );
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("attachment; filename*=utf-8''hallo_welt_%C3%B6%C3%A4%C3%BC.txt")
        );
    }

    #[test]
    fn test_ascii_inline() {
        let part = Part::inline("text/plain", "Hello world", "hello_world.txt").unwrap();
        assert_eq!(part.kind(), PartKind::Inline);

        let content_id = part.content_id().unwrap();
        assert!(content_id.starts_with("cid"));
        assert!(content_id.ends_with("@mail"));
        assert_eq!(
            part.headers().get("Content-ID"),
            Some(format!("<{content_id}>").as_str())
        );
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("inline; filename=\"hello_world.txt\"")
        );

        let err = Part::new(PartKind::Inline, "text/plain", Some("Hello world".into()), Some("  "))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_message_body_headers() {
        let part = Part::body("text/plain", "Hello world").unwrap();
        let headers: Vec<(&str, &str)> = part.headers().iter().collect();

        assert_eq!(
            headers,
            vec![
                ("Content-Type", "text/plain; charset=\"UTF-8\""),
                ("Content-Transfer-Encoding", "quoted-printable"),
            ]
        );
        assert!(part.content_id().is_none());
        assert_eq!(part.mime_type().as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_binary_attachment() {
        let part =
            Part::binary_attachment("image/png", vec![0x89, b'P', b'N', b'G'], "a.png").unwrap();

        assert_eq!(part.headers().get("Content-Type"), Some("image/png"));
        assert_eq!(part.headers().get("Content-Transfer-Encoding"), Some("base64"));
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("attachment; filename=\"a.png\"")
        );
        assert_eq!(part.payload(), Some("iVBORw=="));
        assert!(part.content_id().is_some());
    }

    #[test]
    fn test_binary_inline() {
        let part = Part::binary_inline("image/gif", &b"GIF89a"[..], "logo.gif").unwrap();
        assert_eq!(part.kind(), PartKind::BinaryInline);
        assert_eq!(
            part.headers().get("Content-Disposition"),
            Some("inline; filename=\"logo.gif\"")
        );
    }

    #[test]
    fn test_data_type_mismatch() {
        let err = Part::new(
            PartKind::BinaryAttachment,
            "image/png",
            Some("text".into()),
            Some("a.png"),
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = Part::new(PartKind::MessageBody, "text/plain", Some(vec![1u8, 2].into()), None)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_missing_or_empty_data() {
        assert!(Part::new(PartKind::MessageBody, "text/plain", None, None)
            .unwrap_err()
            .is_invalid_argument());
        assert!(Part::body("text/plain", "").unwrap_err().is_invalid_argument());
        assert!(Part::binary_inline("image/png", Vec::new(), "a.png")
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_invalid_mime_type() {
        assert!(Part::body("plain", "x").unwrap_err().is_invalid_argument());
        assert!(Part::body("multipart/mixed", "x").unwrap_err().is_invalid_argument());
        assert!(Part::multipart("text/plain").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_multipart() {
        let mut part = Part::multipart("multipart/alternative").unwrap();
        assert!(part.is_multipart());
        assert!(part.content_id().is_none());
        assert!(part.payload().is_none());

        part.attach(Part::body("text/plain", "plain").unwrap()).unwrap();
        part.attach(Part::body("text/html", "<p>html</p>").unwrap()).unwrap();

        let types: Vec<String> = part.children().iter().filter_map(Part::mime_type).collect();
        assert_eq!(types, vec!["text/plain", "text/html"]);

        let err =
            Part::new(PartKind::Multipart, "multipart/mixed", Some("x".into()), None).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_attach_to_leaf_fails() {
        let mut part = Part::body("text/plain", "x").unwrap();
        let err = part.attach(Part::body("text/plain", "y").unwrap()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_content_ids_are_unique() {
        let a = Part::attachment("text/plain", "same", "same.txt").unwrap();
        let b = Part::attachment("text/plain", "same", "same.txt").unwrap();

        assert_ne!(a.content_id(), b.content_id());
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_content_ids_are_unique_across_threads() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            let name = format!("t{t}-{i}.txt");
                            Part::attachment("text/plain", "payload", &name)
                                .unwrap()
                                .content_id()
                                .unwrap()
                                .to_string()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let unique: std::collections::HashSet<&String> = ids.iter().collect();

        assert_eq!(ids.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_control_characters_in_mime_type() {
        let err = Part::body("text/plain; a=\"x\r\nBcc: v@e.org\"", "x").unwrap_err();
        assert!(err.is_invalid_argument());

        let err = Part::attachment("text/plain; name=\"a\nb\"", "x", "x.txt").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_to_node() {
        let mut part = Part::multipart("multipart/related").unwrap();
        part.attach(Part::body("text/html", "<img src=\"cid:x\">").unwrap()).unwrap();
        part.add_header("Content-Description", "related content");

        let node = part.to_node();
        assert!(node.is_multipart());
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.headers().get("Content-Description"), Some("related content"));
    }
}
