//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in insertion order (e.g., charset=UTF-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a multipart content type of the given subtype without a boundary.
    ///
    /// The boundary is generated when the part is rendered.
    #[must_use]
    pub fn multipart(sub_type: impl Into<String>) -> Self {
        Self::new("multipart", sub_type)
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Sets a parameter, replacing an existing one with the same name.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self
            .parameters
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(existing) => existing.1 = value,
            None => self.parameters.push((key, value)),
        }
    }

    /// Returns a parameter value by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing or malformed, or
    /// a parameter has an invalid name or a value with control characters.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        // Parse type/subtype
        let type_str = parts.next().unwrap_or_default().trim();

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();

        if !is_token(&main_type) || !is_token(&sub_type) {
            return Err(Error::InvalidContentType(format!(
                "Malformed type/subtype: {s}"
            )));
        }

        let mut content_type = Self::new(main_type, sub_type);

        // Parse parameters
        for param in parts {
            let param = param.trim();
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();

                if !is_token(&key) || value.contains(char::is_control) {
                    return Err(Error::InvalidContentType(format!(
                        "Malformed parameter {key:?} in {s:?}"
                    )));
                }
                content_type.set_parameter(key, value);
            }
        }

        Ok(content_type)
    }
}

/// Checks for a non-empty RFC 2045 token.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b)
        })
}

/// Writes a parameter value as an RFC 2045 quoted-string.
pub(crate) fn write_quoted(f: &mut impl fmt::Write, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(ch)?;
    }
    f.write_char('"')
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            write!(f, "; {key}=")?;
            write_quoted(f, value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_multipart() {
        let ct = ContentType::multipart("mixed").with_parameter("boundary", "boundary123");
        assert_eq!(ct.main_type, "multipart");
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("boundary123"));
        assert!(ct.is_multipart());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_rejects_control_characters() {
        assert!(ContentType::parse("text/plain; a=\"x\r\nBcc: v@e.org\"").is_err());
        assert!(ContentType::parse("text/plain; charset=utf-8\n").is_ok());
        assert!(ContentType::parse("text/plain; char\tset=utf-8").is_err());
        assert!(ContentType::parse("text/plain; a b=c").is_err());
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("text/pl ain").is_err());
        assert!(ContentType::parse("").is_err());
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::new("text", "plain").with_parameter("charset", "UTF-8");
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.to_string(), "text/plain; charset=\"UTF-8\"");

        let ct = ContentType::parse("application/xhtml+xml").unwrap();
        assert_eq!(ct.to_string(), "application/xhtml+xml");
    }

    #[test]
    fn test_parameter_replacement_keeps_order() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed")
            .with_parameter("Charset", "UTF-8");

        assert_eq!(ct.charset(), Some("UTF-8"));
        assert_eq!(
            ct.to_string(),
            "text/plain; charset=\"UTF-8\"; format=\"flowed\""
        );
    }
}
