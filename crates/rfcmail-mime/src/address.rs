//! E-mail address parsing and formatting.

use crate::encoding::{decode_rfc2047, encode_rfc2047};
use crate::error::{Error, Result};
use std::fmt;

/// Characters that force a display name to be quoted.
const SPECIALS: &[char] = &['(', ')', '<', '>', '@', ',', ':', ';', '.', '"', '[', ']', '\\'];

/// Mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Display name (optional).
    pub name: Option<String>,
    /// Bare `local@domain` address.
    pub email: String,
}

impl Address {
    /// Creates an address after validating `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the display name
    /// contains control characters.
    pub fn new(name: Option<String>, email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate(&email)?;

        if let Some(name) = &name
            && name.chars().any(char::is_control)
        {
            return Err(Error::InvalidAddress(format!(
                "Display name contains control characters: {name:?}"
            )));
        }

        Ok(Self {
            name: name.filter(|n| !n.trim().is_empty()),
            email,
        })
    }

    /// Parses a free-form address.
    ///
    /// Accepts `local@domain`, `<local@domain>`, `Name <local@domain>` and
    /// `"Quoted, Name" <local@domain>`. Encoded-word display names are
    /// decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid `local@domain` part can be extracted.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let Some(start) = input.rfind('<') else {
            return Self::new(None, input);
        };

        let end = input[start..]
            .find('>')
            .map(|offset| start + offset)
            .ok_or_else(|| Error::InvalidAddress(format!("Unterminated angle address: {input}")))?;

        if !input[end + 1..].trim().is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Unexpected text after address: {input}"
            )));
        }

        let name = unquote(input[..start].trim());
        let name = if name.contains("=?") {
            decode_rfc2047(&name)
                .map_err(|e| Error::InvalidAddress(format!("Invalid display name: {e}")))?
        } else {
            name
        };

        Self::new(Some(name), input[start + 1..end].trim())
    }
}

/// Validates a bare e-mail address (basic validation).
fn validate(addr: &str) -> Result<()> {
    if addr.is_empty() {
        return Err(Error::InvalidAddress("Address cannot be empty".into()));
    }

    if addr.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>' | ',' | ';')) {
        return Err(Error::InvalidAddress(format!(
            "Address contains invalid characters: {addr}"
        )));
    }

    let parts: Vec<&str> = addr.split('@').collect();
    if parts.len() != 2 {
        return Err(Error::InvalidAddress(format!(
            "Address must have exactly one @: {addr}"
        )));
    }

    if parts[0].is_empty() || parts[1].is_empty() {
        return Err(Error::InvalidAddress(
            "Local and domain parts cannot be empty".into(),
        ));
    }

    Ok(())
}

/// Strips surrounding double quotes and resolves backslash escapes.
fn unquote(name: &str) -> String {
    let Some(inner) = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
    else {
        return name.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// Formats a display name and an e-mail address as one RFC 5322 mailbox.
///
/// Non-ASCII names and names with control characters are RFC 2047
/// encoded, names containing specials are quoted.
#[must_use]
pub fn format_address(name: &str, email: &str) -> String {
    let name = name.trim();

    if name.is_empty() {
        return email.to_string();
    }

    if !name.is_ascii() || name.contains(char::is_control) {
        return format!("{} <{email}>", encode_rfc2047(name, "utf-8"));
    }

    if name.contains(SPECIALS) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{escaped}\" <{email}>");
    }

    format!("{name} <{email}>")
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_address(self.name.as_deref().unwrap_or_default(), &self.email))
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
    fn test_valid_address() {
        let addr = Address::parse("user@example.com").unwrap();
        assert_eq!(addr.email, "user@example.com");
        assert!(addr.name.is_none());
    }

    #[test]
    fn test_display_name_address() {
        let addr = Address::parse("Name <a@b.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("Name"));
        assert_eq!(addr.email, "a@b.com");
        assert_eq!(addr.to_string(), "Name <a@b.com>");
    }

    #[test]
    fn test_angle_only_address() {
        let addr = Address::parse("<a@b.com>").unwrap();
        assert!(addr.name.is_none());
        assert_eq!(addr.to_string(), "a@b.com");
    }

    #[test]
    fn test_quoted_display_name() {
        let addr = Address::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("Doe, John"));
        assert_eq!(addr.to_string(), "\"Doe, John\" <john@example.com>");
    }

    #[test]
    fn test_encoded_display_name() {
        let addr = Address::parse("=?utf-8?q?J=C3=BCrgen?= <j@example.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("Jürgen"));
        assert_eq!(addr.to_string(), "=?utf-8?q?J=C3=BCrgen?= <j@example.com>");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::parse("not-an-address").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("Name <>").is_err());
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::parse("@example.com").is_err());
        assert!(Address::parse("user@").is_err());
        assert!(Address::parse("a@b@c").is_err());
    }

    #[test]
    fn test_invalid_address_structure() {
        assert!(Address::parse("Name <a@b.com").is_err());
        assert!(Address::parse("Name <a@b.com> trailing").is_err());
        assert!(Address::parse("user name@example.com").is_err());
    }

    #[test]
    fn test_control_characters_in_display_name() {
        assert!(Address::parse("Evil\r\nBcc: v@e.org <a@b.com>").is_err());
        assert!(Address::parse("\"X\nInjected: yes\" <s@b.com>").is_err());
        assert!(Address::parse("=?utf-8?q?X=0D=0AInjected?= <s@b.com>").is_err());
        assert!(Address::new(Some("Tab\there".to_string()), "a@b.com").is_err());
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address("", "a@b.com"), "a@b.com");
        assert_eq!(format_address("Alice", "a@b.com"), "Alice <a@b.com>");
        assert_eq!(format_address("A. Smith", "a@b.com"), "\"A. Smith\" <a@b.com>");
        assert_eq!(
            format_address("Say \"hi\"", "a@b.com"),
            "\"Say \\\"hi\\\"\" <a@b.com>"
        );
        assert_eq!(
            format_address("Каи", "kayo@example.com"),
            "=?utf-8?q?=D0=9A=D0=B0=D0=B8?= <kayo@example.com>"
        );
        assert_eq!(
            format_address("Evil\r\nBcc: v@e.org", "a@b.com"),
            "=?utf-8?q?Evil=0D=0ABcc=3A_v=40e=2Eorg?= <a@b.com>"
        );
    }

    #[test]
    fn test_format_roundtrip() {
        for (name, email) in [
            ("Alice", "a@b.com"),
            ("Doe, John", "j@d.org"),
            ("Jürgen", "j@x.de"),
            ("", "x@y.z"),
        ] {
            let formatted = format_address(name, email);
            let parsed = Address::parse(&formatted).unwrap();
            assert_eq!(parsed.email, email);
            assert_eq!(parsed.name.as_deref().unwrap_or_default(), name);
            assert_eq!(parsed.to_string(), formatted);
        }
    }
}
