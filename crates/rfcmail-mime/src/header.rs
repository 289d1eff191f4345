//! MIME header handling.

use crate::config::RenderConfig;
use crate::content_type::ContentType;
use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Ordered collection of e-mail headers.
///
/// Lookup is case-insensitive. Entries keep their insertion order and the
/// spelling of the name they were added with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping existing values of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Inserts a header value before all other headers.
    pub fn prepend(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(0, (name.into(), value.into()));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The first existing entry is updated in place, so the header keeps its
    /// position; otherwise the header is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(index) => {
                self.headers[index].1 = value;
                let mut seen = 0usize;
                self.headers.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.headers.push((name, value)),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.headers[i].1.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Sets a parameter of a structured header such as `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing or cannot be parsed.
    pub fn set_param(&mut self, name: &str, key: &str, value: &str) -> Result<()> {
        let current = self
            .get(name)
            .ok_or_else(|| Error::InvalidHeader(format!("Missing header: {name}")))?;

        let content_type = ContentType::parse(current)?.with_parameter(key, value);
        self.set(name.to_string(), content_type.to_string());
        Ok(())
    }

    /// Encodes a header value using RFC 2047 if it contains non-ASCII text.
    #[must_use]
    pub fn encode_value(value: &str) -> String {
        if value.is_ascii() {
            value.to_string()
        } else {
            encode_rfc2047(value, "utf-8")
        }
    }

    /// Writes all headers, folding long lines at whitespace.
    ///
    /// Lines are always terminated by CRLF here; [`crate::Node::render`]
    /// applies the configured line ending to the whole output.
    pub fn write_to(&self, out: &mut String, config: &RenderConfig) {
        for (name, value) in &self.headers {
            write_folded(out, name, value, config.max_line_length);
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Splits a header line into fold candidates; every chunk after the first
/// starts with the whitespace it may be folded at.
fn fold_chunks(line: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut previous_whitespace = false;

    for (i, ch) in line.char_indices() {
        let whitespace = ch == ' ' || ch == '\t';
        if whitespace && !previous_whitespace && i > start {
            chunks.push(&line[start..i]);
            start = i;
        }
        previous_whitespace = whitespace;
    }
    chunks.push(&line[start..]);

    chunks
}

fn write_folded(out: &mut String, name: &str, value: &str, max_line_length: usize) {
    let line = format!("{name}: {value}");

    if line.len() <= max_line_length {
        out.push_str(&line);
        out.push_str("\r\n");
        return;
    }

    let mut line_length = 0;
    // Chunk 0 is "Name:"; the first value word only moves if it then fits
    for (i, chunk) in fold_chunks(&line).into_iter().enumerate() {
        let may_fold = i > 1 || (i == 1 && chunk.len() <= max_line_length);
        if may_fold && line_length + chunk.len() > max_line_length {
            out.push_str("\r\n");
            line_length = 0;
        }
        out.push_str(chunk);
        line_length += chunk.len();
    }
    out.push_str("\r\n");
}

/// Formats a timestamp as an RFC 5322 date in GMT.
///
/// Example: `Thu, 01 Jan 1970 00:00:00 GMT`.
#[must_use]
pub fn format_rfc5322_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out, &RenderConfig::default());
        f.write_str(&out)
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
    use chrono::TimeZone;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_headers_set() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("to", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("TO", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);

        // Position and spelling of the first entry are kept
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["To", "Subject"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.get("Subject").is_some());

        headers.remove("subject");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_prepend() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        headers.prepend("MIME-Version", "1.0");

        assert_eq!(
            headers.to_string(),
            "MIME-Version: 1.0\r\nContent-Type: text/plain\r\n"
        );
    }

    #[test]
    fn test_set_param() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        headers.set_param("content-type", "charset", "UTF-8").unwrap();

        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=\"UTF-8\"")
        );
        assert!(headers.set_param("X-Missing", "a", "b").is_err());
    }

    #[test]
    fn test_headers_display_keeps_order() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com");
        headers.add("From", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\r\nFrom: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_fold_long_line() {
        let mut headers = Headers::new();
        let value = "word ".repeat(30);
        headers.add("X-Long", value.trim_end());

        let rendered = headers.to_string();
        let lines: Vec<&str> = rendered.trim_end().split("\r\n").collect();

        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("X-Long: word"));
        for line in &lines {
            assert!(line.len() <= 78, "line too long: {line}");
        }
        for line in &lines[1..] {
            assert!(line.starts_with(' '));
        }
        // Unfolding restores the value
        assert_eq!(rendered.replace("\r\n ", " "), format!("X-Long: {}\r\n", value.trim_end()));
    }

    #[test]
    fn test_headers_fold_unbreakable() {
        let mut headers = Headers::new();
        let value = "x".repeat(100);
        headers.add("X-Token", value.as_str());

        assert_eq!(headers.to_string(), format!("X-Token: {value}\r\n"));
    }

    #[test]
    fn test_headers_fold_long_first_word() {
        let mut headers = Headers::new();
        let word = format!("=?utf-8?q?{}?=", "=C3=B6".repeat(10) + &"a".repeat(3));
        assert_eq!(word.len(), 75);
        headers.add("Subject", word.as_str());

        assert_eq!(headers.to_string(), format!("Subject:\r\n {word}\r\n"));
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(Headers::encode_value("Hello"), "Hello");
        assert_eq!(Headers::encode_value("Héllo"), "=?utf-8?q?H=C3=A9llo?=");
    }

    #[test]
    fn test_format_rfc5322_date() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(format_rfc5322_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");

        let date = Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap();
        assert_eq!(format_rfc5322_date(date), "Tue, 15 Nov 1994 08:12:31 GMT");
    }
}
