//! Message composition.
//!
//! A [`Message`] collects bodies, related content, attachments, addresses
//! and headers, and assembles them into a MIME tree on demand:
//!
//! ```text
//! multipart/mixed            (only with attachments)
//! ├── multipart/related      (only with related attachments)
//! │   ├── multipart/alternative  (only with more than one body)
//! │   │   ├── text/plain
//! │   │   └── text/html
//! │   └── image/png (inline)
//! └── application/pdf (attachment)
//! ```

use crate::error::{Error, Result};
use crate::part::{Part, PartKind};
use crate::set::OrderedSet;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rfcmail_mime::encoding::encode_rfc2047;
use rfcmail_mime::{Address, Headers, RenderConfig, format_rfc5322_date};
use tracing::debug;

/// Bytes that force the subject into an RFC 2047 encoded-word.
const SUBJECT_SPECIALS: &[u8] = b"\"(),.:;<>@[\\]";

/// An e-mail message under composition.
///
/// Bodies are kept in ascending order of preference: add the plain text
/// representation first and the richest one (e.g. HTML) last.
#[derive(Debug, Clone, Default)]
pub struct Message {
    bodies: OrderedSet<Part>,
    related_attachments: OrderedSet<Part>,
    attachments: OrderedSet<Part>,
    to: OrderedSet<String>,
    cc: OrderedSet<String>,
    bcc: OrderedSet<String>,
    sender: Option<String>,
    reply_to: Option<String>,
    subject: String,
    /// Uppercased name -> (name as given, value).
    headers: IndexMap<String, (String, String)>,
    date: Option<DateTime<Utc>>,
    config: RenderConfig,
    message: Option<Part>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the render configuration used by [`Message::as_string`].
    #[must_use]
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the render configuration.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Gets the render configuration.
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Checks an address and returns it in normalized form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no `local@domain` part can be
    /// extracted.
    pub fn validate_address(address: &str) -> Result<String> {
        Address::parse(address)
            .map(|parsed| parsed.to_string())
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    /// Formats a display name and an e-mail address as one mailbox string.
    #[must_use]
    pub fn format_address(name: &str, email: &str) -> String {
        rfcmail_mime::format_address(name, email)
    }

    /// Sets the `From` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is malformed.
    pub fn set_sender(&mut self, address: &str) -> Result<()> {
        self.sender = Some(Self::validate_address(address)?);
        Ok(())
    }

    /// Gets the `From` address.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Checks if a sender is set.
    #[must_use]
    pub const fn is_sender_set(&self) -> bool {
        self.sender.is_some()
    }

    /// Sets the `Reply-To` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is malformed.
    pub fn set_reply_to(&mut self, address: &str) -> Result<()> {
        self.reply_to = Some(Self::validate_address(address)?);
        Ok(())
    }

    /// Gets the `Reply-To` address.
    #[must_use]
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    /// Checks if a reply-to address is set.
    #[must_use]
    pub const fn is_reply_to_set(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Adds a `To` recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is malformed.
    pub fn add_to(&mut self, address: &str) -> Result<()> {
        self.to.insert(Self::validate_address(address)?);
        Ok(())
    }

    /// Replaces all `To` recipients.
    ///
    /// Nothing changes if any address is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an address is malformed.
    pub fn set_to<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.to = validate_all(addresses)?;
        Ok(())
    }

    /// Gets the `To` recipients.
    #[must_use]
    pub fn to(&self) -> &[String] {
        self.to.as_slice()
    }

    /// Adds a `Cc` recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is malformed.
    pub fn add_cc(&mut self, address: &str) -> Result<()> {
        self.cc.insert(Self::validate_address(address)?);
        Ok(())
    }

    /// Replaces all `Cc` recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an address is malformed.
    pub fn set_cc<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cc = validate_all(addresses)?;
        Ok(())
    }

    /// Gets the `Cc` recipients.
    #[must_use]
    pub fn cc(&self) -> &[String] {
        self.cc.as_slice()
    }

    /// Adds a blind recipient. Blind recipients never appear in the headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is malformed.
    pub fn add_bcc(&mut self, address: &str) -> Result<()> {
        self.bcc.insert(Self::validate_address(address)?);
        Ok(())
    }

    /// Replaces all blind recipients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an address is malformed.
    pub fn set_bcc<I, S>(&mut self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bcc = validate_all(addresses)?;
        Ok(())
    }

    /// Gets the blind recipients.
    #[must_use]
    pub fn bcc(&self) -> &[String] {
        self.bcc.as_slice()
    }

    /// Checks if any `To`, `Cc` or blind recipient is set.
    #[must_use]
    pub fn is_recipient_set(&self) -> bool {
        !(self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty())
    }

    /// Returns all recipients (to, cc, bcc).
    #[must_use]
    pub fn all_recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .collect()
    }

    /// Sets the subject, trimmed of surrounding whitespace.
    pub fn set_subject(&mut self, subject: impl AsRef<str>) {
        self.subject = subject.as_ref().trim().to_string();
    }

    /// Gets the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Checks if a non-empty subject is set.
    #[must_use]
    pub fn is_subject_set(&self) -> bool {
        !self.subject.is_empty()
    }

    /// Pins the `Date` header. The current time is used otherwise.
    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = Some(date);
    }

    /// Gets the pinned date.
    #[must_use]
    pub const fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// Sets an extra header.
    ///
    /// Names are matched case-insensitively. The first value written for a
    /// name sticks: later writes are ignored until the header is removed by
    /// passing `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is not a valid header
    /// field name or the value contains a line break.
    pub fn set_header(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
            return Err(Error::InvalidArgument(format!("Invalid header name: {name:?}")));
        }

        let key = name.to_uppercase();

        let Some(value) = value else {
            self.headers.shift_remove(&key);
            return Ok(());
        };

        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument(format!(
                "Header {name} must not contain line breaks"
            )));
        }

        if self.headers.contains_key(&key) {
            debug!(header = name, "Header already set, ignoring new value");
        } else {
            self.headers.insert(key, (name.to_string(), value.to_string()));
        }
        Ok(())
    }

    /// Gets an extra header set with [`Message::set_header`].
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_uppercase())
            .map(|(_, value)| value.as_str())
    }

    /// Adds a body representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the part is a message body.
    pub fn add_body(&mut self, part: Part) -> Result<()> {
        if part.kind() != PartKind::MessageBody {
            return Err(Error::InvalidArgument(format!(
                "Expected a message body part, got {}",
                part.kind()
            )));
        }
        self.bodies.insert(part);
        Ok(())
    }

    /// Gets the bodies in ascending order of preference.
    #[must_use]
    pub fn bodies(&self) -> &[Part] {
        self.bodies.as_slice()
    }

    /// Adds a top-level attachment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the part is an attachment
    /// or inline part.
    pub fn add_attachment(&mut self, part: Part) -> Result<()> {
        check_attachment_like(&part)?;
        self.attachments.insert(part);
        Ok(())
    }

    /// Gets the top-level attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Part] {
        self.attachments.as_slice()
    }

    /// Adds content related to the body, such as an image referenced from
    /// HTML by `cid:`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the part is an attachment
    /// or inline part.
    pub fn add_body_related_attachment(&mut self, part: Part) -> Result<()> {
        check_attachment_like(&part)?;
        self.related_attachments.insert(part);
        Ok(())
    }

    /// Gets the body-related attachments.
    #[must_use]
    pub fn related_attachments(&self) -> &[Part] {
        self.related_attachments.as_slice()
    }

    /// Builds the body subtree: alternatives first, then related content.
    fn body_tree(&self) -> Result<Part> {
        let mut root = match self.bodies.as_slice() {
            [] => {
                return Err(Error::InvalidState("No body set for message".to_string()));
            }
            [body] => body.clone(),
            bodies => {
                let mut alternative = Part::multipart("multipart/alternative")?;
                for body in bodies {
                    alternative.attach(body.clone())?;
                }
                alternative
            }
        };

        if !self.related_attachments.is_empty() {
            let mut related = Part::multipart("multipart/related")?;
            related.attach(root)?;
            for part in &self.related_attachments {
                related.attach(part.clone())?;
            }
            root = related;
        }

        Ok(root)
    }

    /// Assembles the MIME tree from the current state and keeps it as the
    /// rendered tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the subject is empty or no body
    /// was added.
    pub fn populate(&mut self) -> Result<&Part> {
        if self.subject.is_empty() {
            return Err(Error::InvalidState("No subject set for message".to_string()));
        }

        let body = self.body_tree()?;

        let mut root = if self.attachments.is_empty() {
            body
        } else {
            let mut mixed = Part::multipart("multipart/mixed")?;
            mixed.attach(body)?;
            for attachment in &self.attachments {
                mixed.attach(attachment.clone())?;
            }
            mixed
        };

        self.apply_headers(root.headers_mut());

        debug!(
            bodies = self.bodies.len(),
            related = self.related_attachments.len(),
            attachments = self.attachments.len(),
            mime_type = %root.mime_type().unwrap_or_default(),
            "Assembled message tree"
        );

        Ok(&*self.message.insert(root))
    }

    /// Returns the tree assembled by the last [`Message::populate`] or
    /// [`Message::as_string`] call.
    #[must_use]
    pub const fn rendered(&self) -> Option<&Part> {
        self.message.as_ref()
    }

    /// Serializes the message.
    ///
    /// The tree is rebuilt on every call, so changes made after a previous
    /// call are always picked up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the subject is empty or no body
    /// was added.
    pub fn as_string(&mut self) -> Result<String> {
        let config = self.config;
        let root = self.populate()?;
        Ok(root.to_node().render(&config))
    }

    fn apply_headers(&self, headers: &mut Headers) {
        if let Some(sender) = &self.sender {
            headers.set("From", sender.as_str());
        }

        let to = if self.to.is_empty() {
            "undisclosed-recipients".to_string()
        } else {
            join(&self.to)
        };
        headers.set("To", to);

        if !self.cc.is_empty() {
            headers.set("Cc", join(&self.cc));
        }

        if let Some(reply_to) = &self.reply_to {
            headers.set("Reply-To", reply_to.as_str());
        }

        if !headers.contains("Date") && !self.headers.contains_key("DATE") {
            headers.set("Date", format_rfc5322_date(self.date.unwrap_or_else(Utc::now)));
        }

        let subject = if needs_encoding(&self.subject) {
            encode_rfc2047(&self.subject, "utf-8")
        } else {
            self.subject.clone()
        };
        headers.set("Subject", subject);

        for (name, value) in self.headers.values() {
            headers.set(name.as_str(), Headers::encode_value(value));
        }
    }
}

fn validate_all<I, S>(addresses: I) -> Result<OrderedSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    addresses
        .into_iter()
        .map(|address| Message::validate_address(address.as_ref()))
        .collect()
}

fn check_attachment_like(part: &Part) -> Result<()> {
    if part.kind().is_attachment_like() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "Expected an attachment or inline part, got {}",
            part.kind()
        )))
    }
}

fn join(addresses: &OrderedSet<String>) -> String {
    addresses
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks if a subject must be sent as an encoded-word.
fn needs_encoding(subject: &str) -> bool {
    subject
        .bytes()
        .any(|b| b < 0x20 || b >= 0x7f || SUBJECT_SPECIALS.contains(&b))
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
    use chrono::TimeZone;

    fn simple_message() -> Message {
        let mut message = Message::new();
        message.set_subject("Test message");
        message
            .add_body(Part::body("text/plain", "Hello world").unwrap())
            .unwrap();
        message
    }

    #[test]
    fn test_needs_encoding() {
        assert!(!needs_encoding("Test message"));
        assert!(!needs_encoding("Re- what's up? 100% #1!"));
        assert!(needs_encoding("Hello, World"));
        assert!(needs_encoding("Version 1.0"));
        assert!(needs_encoding("a@b"));
        assert!(needs_encoding("tab\there"));
        assert!(needs_encoding("öäü"));
        assert!(needs_encoding("\x7f"));
    }

    #[test]
    fn test_subject_is_trimmed() {
        let mut message = Message::new();
        assert!(!message.is_subject_set());

        message.set_subject("  Hello \r\n");
        assert_eq!(message.subject(), "Hello");
        assert!(message.is_subject_set());

        message.set_subject("   ");
        assert!(!message.is_subject_set());
    }

    #[test]
    fn test_sender_and_reply_to() {
        let mut message = Message::new();
        assert!(!message.is_sender_set());
        assert!(!message.is_reply_to_set());

        message.set_sender("Alice <alice@example.com>").unwrap();
        message.set_reply_to("bob@example.com").unwrap();

        assert_eq!(message.sender(), Some("Alice <alice@example.com>"));
        assert_eq!(message.reply_to(), Some("bob@example.com"));
        assert!(message.is_sender_set());
        assert!(message.is_reply_to_set());

        assert!(message.set_sender("nobody").unwrap_err().is_invalid_argument());
        // A failed setter keeps the previous value
        assert_eq!(message.sender(), Some("Alice <alice@example.com>"));
    }

    #[test]
    fn test_recipients() {
        let mut message = Message::new();
        assert!(!message.is_recipient_set());

        message.add_to("a@example.com").unwrap();
        message.add_to("a@example.com").unwrap();
        message.add_cc("Carol <c@example.com>").unwrap();
        message.add_bcc("hidden@example.com").unwrap();

        assert_eq!(message.to(), ["a@example.com"]);
        assert!(message.is_recipient_set());
        assert_eq!(
            message.all_recipients(),
            vec!["a@example.com", "Carol <c@example.com>", "hidden@example.com"]
        );
    }

    #[test]
    fn test_set_to_replaces() {
        let mut message = Message::new();
        message.add_to("old@example.com").unwrap();

        message.set_to(["x@example.com", "y@example.com"]).unwrap();
        assert_eq!(message.to(), ["x@example.com", "y@example.com"]);

        let err = message.set_to(["z@example.com", "not-an-address"]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(message.to(), ["x@example.com", "y@example.com"]);

        message.set_cc(Vec::<String>::new()).unwrap();
        message.set_bcc(vec!["b@example.com".to_string()]).unwrap();
        assert!(message.cc().is_empty());
        assert_eq!(message.bcc(), ["b@example.com"]);
    }

    #[test]
    fn test_address_with_line_break_is_rejected() {
        let mut message = Message::new();

        let err = message.add_to("Evil\r\nBcc: v@e.org <a@b.com>").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(message.to().is_empty());

        let err = message.set_sender("X\nInjected-Header: yes <s@b.com>").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(!message.is_sender_set());

        assert!(message.add_cc("\"A\rB\" <a@b.com>").unwrap_err().is_invalid_argument());
        let err = message.set_reply_to("=?utf-8?q?A=0AB?= <a@b.com>").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_validate_and_format_address() {
        assert_eq!(
            Message::validate_address("  Name <a@b.com> ").unwrap(),
            "Name <a@b.com>"
        );
        assert!(Message::validate_address("").unwrap_err().is_invalid_argument());
        assert_eq!(Message::format_address("Name", "a@b.com"), "Name <a@b.com>");
        assert_eq!(Message::format_address("", "a@b.com"), "a@b.com");
    }

    #[test]
    fn test_header_first_write_wins() {
        let mut message = Message::new();

        message.set_header("X-Test", Some("a")).unwrap();
        message.set_header("x-test", Some("b")).unwrap();
        assert_eq!(message.header("X-TEST"), Some("a"));

        message.set_header("X-Test", None).unwrap();
        assert_eq!(message.header("X-Test"), None);

        message.set_header("X-Test", Some("b")).unwrap();
        assert_eq!(message.header("X-Test"), Some("b"));
    }

    #[test]
    fn test_invalid_header() {
        let mut message = Message::new();
        assert!(message.set_header("", Some("x")).unwrap_err().is_invalid_argument());
        assert!(message.set_header("Bad Name", Some("x")).unwrap_err().is_invalid_argument());
        assert!(message.set_header("X:Y", Some("x")).unwrap_err().is_invalid_argument());
        assert!(message
            .set_header("X-Test", Some("a\r\nBcc: evil@example.com"))
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_add_body_rejects_other_kinds() {
        let mut message = Message::new();
        let attachment = Part::attachment("text/plain", "x", "x.txt").unwrap();

        assert!(message.add_body(attachment.clone()).unwrap_err().is_invalid_argument());
        assert!(message.bodies().is_empty());

        let body = Part::body("text/plain", "x").unwrap();
        assert!(message.add_attachment(body.clone()).unwrap_err().is_invalid_argument());
        assert!(message
            .add_body_related_attachment(body)
            .unwrap_err()
            .is_invalid_argument());

        let multipart = Part::multipart("multipart/mixed").unwrap();
        assert!(message.add_attachment(multipart).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_parts_are_deduplicated() {
        let mut message = Message::new();
        let body = Part::body("text/plain", "x").unwrap();
        let inline = Part::binary_inline("image/png", vec![1, 2, 3], "a.png").unwrap();

        message.add_body(body.clone()).unwrap();
        message.add_body(body).unwrap();
        message.add_body_related_attachment(inline.clone()).unwrap();
        message.add_body_related_attachment(inline).unwrap();

        assert_eq!(message.bodies().len(), 1);
        assert_eq!(message.related_attachments().len(), 1);
    }

    #[test]
    fn test_populate_requires_subject_then_body() {
        let mut message = Message::new();
        assert!(message.populate().unwrap_err().is_invalid_state());

        message.set_subject("Subject");
        assert!(message.populate().unwrap_err().is_invalid_state());
        assert!(message.rendered().is_none());

        message.add_body(Part::body("text/plain", "x").unwrap()).unwrap();
        assert!(message.populate().is_ok());
        assert!(message.rendered().is_some());
    }

    #[test]
    fn test_single_body_root() {
        let mut message = simple_message();
        let root = message.populate().unwrap();

        assert_eq!(root.kind(), PartKind::MessageBody);
        assert_eq!(root.headers().get("To"), Some("undisclosed-recipients"));
        assert_eq!(root.headers().get("Subject"), Some("Test message"));
        assert!(root.headers().get("From").is_none());
        assert!(root.headers().get("Cc").is_none());
        assert!(root.headers().get("Date").is_some());
    }

    #[test]
    fn test_header_order() {
        let mut message = simple_message();
        message.set_sender("from@example.com").unwrap();
        message.add_to("to@example.com").unwrap();
        message.add_to("to2@example.com").unwrap();
        message.add_cc("cc@example.com").unwrap();
        message.add_bcc("bcc@example.com").unwrap();
        message.set_reply_to("reply@example.com").unwrap();
        message.set_header("X-Mailer", Some("rfcmail")).unwrap();
        message.set_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());

        let root = message.populate().unwrap();
        let names: Vec<&str> = root.headers().iter().map(|(name, _)| name).collect();

        assert_eq!(
            names,
            vec![
                "Content-Type",
                "Content-Transfer-Encoding",
                "From",
                "To",
                "Cc",
                "Reply-To",
                "Date",
                "Subject",
                "X-Mailer",
            ]
        );
        assert_eq!(root.headers().get("To"), Some("to@example.com, to2@example.com"));
        assert_eq!(root.headers().get("Date"), Some("Tue, 02 Jan 2024 03:04:05 GMT"));
        assert!(!root.headers().contains("Bcc"));
    }

    #[test]
    fn test_date_header_override() {
        let mut message = simple_message();
        message.set_header("Date", Some("Mon, 01 Jan 2024 00:00:00 +0100")).unwrap();

        let root = message.populate().unwrap();
        assert_eq!(
            root.headers().get_all("Date"),
            vec!["Mon, 01 Jan 2024 00:00:00 +0100"]
        );
    }

    #[test]
    fn test_non_ascii_header_value_is_encoded() {
        let mut message = simple_message();
        message.set_header("X-Greeting", Some("Grüße")).unwrap();

        let root = message.populate().unwrap();
        assert!(root.headers().get("X-Greeting").unwrap().starts_with("=?utf-8?q?"));
    }

    #[test]
    fn test_tree_shapes() {
        let mut message = simple_message();
        message
            .add_body(Part::body("text/html", "<p>Hello world</p>").unwrap())
            .unwrap();
        assert_eq!(
            message.populate().unwrap().mime_type().as_deref(),
            Some("multipart/alternative")
        );

        let inline = Part::binary_inline("image/png", vec![1], "a.png").unwrap();
        message.add_body_related_attachment(inline).unwrap();
        assert_eq!(
            message.populate().unwrap().mime_type().as_deref(),
            Some("multipart/related")
        );

        message
            .add_attachment(Part::attachment("text/plain", "x", "x.txt").unwrap())
            .unwrap();
        let root = message.populate().unwrap();
        assert_eq!(root.mime_type().as_deref(), Some("multipart/mixed"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(
            root.children()[0].mime_type().as_deref(),
            Some("multipart/related")
        );
        assert_eq!(
            root.children()[0].children()[0].mime_type().as_deref(),
            Some("multipart/alternative")
        );
    }

    #[test]
    fn test_populate_does_not_touch_stored_parts() {
        let mut message = simple_message();
        message.set_sender("from@example.com").unwrap();
        message.populate().unwrap();

        assert!(!message.bodies()[0].headers().contains("From"));
        assert!(!message.bodies()[0].headers().contains("Subject"));
    }

    #[test]
    fn test_as_string_rebuilds() {
        let mut message = simple_message();
        message.set_date(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());

        let first = message.as_string().unwrap();
        assert!(first.contains("To: undisclosed-recipients\r\n"));
        assert!(first.contains("Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n"));

        message.add_to("late@example.com").unwrap();
        let second = message.as_string().unwrap();
        assert!(second.contains("To: late@example.com\r\n"));
        assert!(!second.contains("undisclosed-recipients"));
    }

    #[test]
    fn test_config() {
        let config = RenderConfig::new().with_mime_version(false);
        let mut message = simple_message().with_config(config);
        assert!(!message.config().mime_version);

        let rendered = message.as_string().unwrap();
        assert!(!rendered.contains("MIME-Version"));

        message.set_config(RenderConfig::default());
        assert!(message.as_string().unwrap().starts_with("MIME-Version: 1.0\r\n"));
    }
}
