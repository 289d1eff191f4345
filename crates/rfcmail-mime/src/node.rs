//! MIME part tree and its wire-format serialization.

use crate::config::{LineEnding, RenderConfig};
use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;
use uuid::Uuid;

/// Content transfer encodings used for leaf bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEncoding {
    /// Base64, for binary content.
    Base64,
    /// Quoted-Printable, for UTF-8 text.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Encodes raw content for use as a part body.
    ///
    /// # Errors
    ///
    /// Returns an error if quoted-printable is given non-UTF-8 data.
    pub fn encode(self, data: &[u8]) -> Result<String> {
        match self {
            Self::Base64 => Ok(encode_base64_wrapped(data)),
            Self::QuotedPrintable => {
                let text = String::from_utf8(data.to_vec())?;
                Ok(encode_quoted_printable(&text))
            }
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Content of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Already transfer-encoded leaf content (CRLF line breaks).
    Encoded(String),
    /// Ordered child parts of a multipart container.
    Multipart(Vec<Node>),
}

/// One node of a MIME tree: headers plus either a leaf body or children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    headers: Headers,
    body: Body,
}

/// Creates a fresh multipart boundary.
///
/// The `=_` prefix cannot occur in quoted-printable or base64 output.
fn make_boundary() -> String {
    format!("=_{}", Uuid::new_v4().simple())
}

impl Node {
    /// Creates a leaf node from headers and an encoded body.
    #[must_use]
    pub const fn leaf(headers: Headers, encoded: String) -> Self {
        Self {
            headers,
            body: Body::Encoded(encoded),
        }
    }

    /// Creates a multipart node from headers and children.
    #[must_use]
    pub const fn multipart(headers: Headers, children: Vec<Self>) -> Self {
        Self {
            headers,
            body: Body::Multipart(children),
        }
    }

    /// Gets the headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets a mutable reference to the headers.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Gets the body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Gets the children of a multipart node (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.body {
            Body::Multipart(children) => children,
            Body::Encoded(_) => &[],
        }
    }

    /// Checks if this is a multipart node.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Appends a child to a multipart node.
    ///
    /// # Errors
    ///
    /// Returns an error if this node is a leaf.
    pub fn attach(&mut self, child: Self) -> Result<()> {
        match &mut self.body {
            Body::Multipart(children) => {
                children.push(child);
                Ok(())
            }
            Body::Encoded(_) => Err(Error::InvalidMultipart(
                "Cannot attach a child to a leaf part".to_string(),
            )),
        }
    }

    /// Gets the boundary from the `Content-Type` header, if one was set.
    #[must_use]
    pub fn boundary(&self) -> Option<String> {
        self.headers
            .get("Content-Type")
            .and_then(|ct| ContentType::parse(ct).ok())
            .and_then(|ct| ct.boundary().map(str::to_string))
    }

    /// Serializes the tree as an RFC 5322 message.
    ///
    /// Multipart nodes without an explicit boundary get a freshly generated
    /// one, so two renders of the same tree differ only in boundaries.
    #[must_use]
    pub fn render(&self, config: &RenderConfig) -> String {
        let mut out = String::new();
        self.write_part(&mut out, config, true);

        match config.line_ending {
            LineEnding::CrLf => out,
            LineEnding::Lf => out.replace("\r\n", "\n"),
        }
    }

    fn write_part(&self, out: &mut String, config: &RenderConfig, is_root: bool) {
        let mut headers = self.headers.clone();

        if is_root && config.mime_version && !headers.contains("MIME-Version") {
            headers.prepend("MIME-Version", "1.0");
        }

        let boundary = match &self.body {
            Body::Multipart(_) => {
                let boundary = self.boundary().unwrap_or_else(make_boundary);
                if headers.set_param("Content-Type", "boundary", &boundary).is_err() {
                    headers.set(
                        "Content-Type",
                        ContentType::multipart("mixed")
                            .with_parameter("boundary", boundary.as_str())
                            .to_string(),
                    );
                }
                Some(boundary)
            }
            Body::Encoded(_) => None,
        };

        headers.write_to(out, config);
        out.push_str("\r\n");

        match (&self.body, boundary) {
            (Body::Encoded(encoded), _) => {
                out.push_str(encoded);
                out.push_str("\r\n");
            }
            (Body::Multipart(children), Some(boundary)) => {
                for child in children {
                    out.push_str("--");
                    out.push_str(&boundary);
                    out.push_str("\r\n");
                    child.write_part(out, config, false);
                }
                out.push_str("--");
                out.push_str(&boundary);
                out.push_str("--\r\n");
            }
            (Body::Multipart(_), None) => {}
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&RenderConfig::default()))
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

    fn text_leaf(text: &str) -> Node {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain; charset=\"UTF-8\"");
        headers.add("Content-Transfer-Encoding", "quoted-printable");
        Node::leaf(headers, encode_quoted_printable(text))
    }

    fn multipart_headers(sub_type: &str, boundary: &str) -> Headers {
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            ContentType::multipart(sub_type)
                .with_parameter("boundary", boundary)
                .to_string(),
        );
        headers
    }

    #[test]
    fn test_transfer_encoding_display() {
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
    }

    #[test]
    fn test_transfer_encoding_encode() {
        assert_eq!(
            TransferEncoding::QuotedPrintable.encode("schön".as_bytes()).unwrap(),
            "sch=C3=B6n"
        );
        assert_eq!(
            TransferEncoding::Base64.encode(b"Hello, World!").unwrap(),
            "SGVsbG8sIFdvcmxkIQ=="
        );
        assert!(TransferEncoding::QuotedPrintable.encode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_leaf_render() {
        let node = text_leaf("Hello world");

        assert_eq!(
            node.to_string(),
            concat!(
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain; charset=\"UTF-8\"\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "Hello world\r\n"
            )
        );
    }

    #[test]
    fn test_multipart_render_with_boundary() {
        let node = Node::multipart(
            multipart_headers("alternative", "b1"),
            vec![text_leaf("one"), text_leaf("two")],
        );

        let config = RenderConfig::new().with_mime_version(false);
        assert_eq!(
            node.render(&config),
            concat!(
                "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
                "\r\n",
                "--b1\r\n",
                "Content-Type: text/plain; charset=\"UTF-8\"\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "one\r\n",
                "--b1\r\n",
                "Content-Type: text/plain; charset=\"UTF-8\"\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "two\r\n",
                "--b1--\r\n"
            )
        );
    }

    #[test]
    fn test_nested_multipart_render() {
        let related =
            Node::multipart(multipart_headers("related", "inner"), vec![text_leaf("body")]);
        let mut mixed = Node::multipart(multipart_headers("mixed", "outer"), vec![]);
        mixed.attach(related).unwrap();
        mixed.attach(text_leaf("attachment")).unwrap();

        let rendered = mixed.to_string();
        let inner_start = rendered.find("--inner\r\n").unwrap();
        let inner_end = rendered.find("--inner--\r\n").unwrap();
        let attachment = rendered.find("attachment\r\n").unwrap();

        assert!(rendered.starts_with("MIME-Version: 1.0\r\n"));
        assert!(inner_start < inner_end);
        assert!(inner_end < attachment);
        assert!(rendered.ends_with("--outer--\r\n"));
        // Only the root carries MIME-Version
        assert_eq!(rendered.matches("MIME-Version").count(), 1);
    }

    #[test]
    fn test_generated_boundary() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "multipart/mixed");
        let node = Node::multipart(headers, vec![text_leaf("x")]);
        assert!(node.boundary().is_none());

        let rendered = node.to_string();
        let start = rendered.find("boundary=\"").unwrap() + "boundary=\"".len();
        let boundary = &rendered[start..start + rendered[start..].find('"').unwrap()];

        assert!(boundary.starts_with("=_"));
        assert!(rendered.contains(&format!("\r\n--{boundary}\r\n")));
        assert!(rendered.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_attach_to_leaf_fails() {
        let mut leaf = text_leaf("x");
        assert!(leaf.attach(text_leaf("y")).is_err());
        assert!(leaf.children().is_empty());
        assert!(!leaf.is_multipart());
    }

    #[test]
    fn test_render_lf() {
        let node = text_leaf("a\nb");
        let rendered = node.render(&RenderConfig::new().with_line_ending(LineEnding::Lf));

        assert!(!rendered.contains('\r'));
        assert!(rendered.ends_with("\n\na\nb\n"));
    }
}
