//! `Content-Disposition` header values (RFC 2183).

use crate::content_type::write_quoted;
use std::fmt::{self, Write as _};

/// Presentation style of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispositionType {
    /// Displayed automatically together with the message.
    Inline,
    /// Kept separate, shown only on user request.
    Attachment,
}

impl DispositionType {
    /// Returns the header token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for DispositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `Content-Disposition` value with an optional filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub disposition: DispositionType,
    /// Suggested filename.
    pub filename: Option<String>,
}

impl ContentDisposition {
    /// Creates an `attachment` disposition.
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self {
            disposition: DispositionType::Attachment,
            filename: Some(filename.into()),
        }
    }

    /// Creates an `inline` disposition.
    #[must_use]
    pub fn inline(filename: impl Into<String>) -> Self {
        Self {
            disposition: DispositionType::Inline,
            filename: Some(filename.into()),
        }
    }
}

/// RFC 2231 `attr-char`.
const fn is_attr_char(byte: u8) -> bool {
    matches!(
        byte,
        b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
    )
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.disposition.as_str())?;

        let Some(filename) = &self.filename else {
            return Ok(());
        };

        if filename.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            f.write_str("; filename=")?;
            write_quoted(f, filename)
        } else {
            // RFC 2231 extended parameter
            f.write_str("; filename*=utf-8''")?;
            for byte in filename.bytes() {
                if is_attr_char(byte) {
                    f.write_char(char::from(byte))?;
                } else {
                    write!(f, "%{byte:02X}")?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_ascii() {
        let disposition = ContentDisposition::attachment("test.txt");
        assert_eq!(disposition.to_string(), "attachment; filename=\"test.txt\"");
    }

    #[test]
    fn test_inline_escapes_quotes() {
        let disposition = ContentDisposition::inline("say \"hi\".txt");
        assert_eq!(
            disposition.to_string(),
            "inline; filename=\"say \\\"hi\\\".txt\""
        );
    }

    #[test]
    fn test_non_ascii_filename() {
        let disposition = ContentDisposition::attachment("hallo_welt_ö.txt");
        assert_eq!(
            disposition.to_string(),
            "attachment; filename*=utf-8''hallo_welt_%C3%B6.txt"
        );
    }

    #[test]
    fn test_without_filename() {
        let disposition = ContentDisposition {
            disposition: DispositionType::Inline,
            filename: None,
        };
        assert_eq!(disposition.to_string(), "inline");
    }
}
