//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for encoded bodies (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of a single RFC 2047 encoded-word.
const MAX_ENCODED_WORD_LENGTH: usize = 75;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped into CRLF-separated lines of 76 characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % MAX_LINE_LENGTH == 0 {
            result.push_str("\r\n");
        }
        result.push(ch);
    }

    result
}

/// Decodes Base64 data.
///
/// Whitespace (including line breaks of a wrapped body) is ignored.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (`\n` or `\r\n`) become hard CRLF line breaks.
/// Encoded lines never exceed 76 characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);

        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], result: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            // Printable ASCII except '='
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Whitespace must not end a line
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Keep room for the soft line break marker
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
    }
}

fn decode_quoted_printable_bytes(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break
        match bytes.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        let decoded = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(decoded);
        i += 3;
    }

    Ok(result)
}

/// Encodes a header value as RFC 2047 "Q" encoded-words.
///
/// Format: `=?charset?q?encoded-text?=`
///
/// Long values are split into several encoded-words of at most 75
/// characters, separated by a single space. Words are only split between
/// characters, never inside a multi-byte sequence.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    let prefix = format!("=?{charset}?q?");
    let budget = MAX_ENCODED_WORD_LENGTH.saturating_sub(prefix.len() + 2).max(12);

    let mut words = Vec::new();
    let mut current = String::new();
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        let mut encoded = String::new();
        for &byte in ch.encode_utf8(&mut buf).as_bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                    encoded.push(char::from(byte));
                }
                _ => {
                    let _ = write!(encoded, "={byte:02X}");
                }
            }
        }

        if !current.is_empty() && current.len() + encoded.len() > budget {
            words.push(format!("{prefix}{current}?="));
            current.clear();
        }
        current.push_str(&encoded);
    }

    if !current.is_empty() || words.is_empty() {
        words.push(format!("{prefix}{current}?="));
    }

    words.join(" ")
}

/// Decodes a single encoded-word into raw bytes, or `None` if `token` is not one.
fn decode_encoded_word(token: &str) -> Option<Result<Vec<u8>>> {
    let inner = token.strip_prefix("=?")?.strip_suffix("?=")?;
    let parts: Vec<&str> = inner.splitn(3, '?').collect();
    let [_charset, encoding, encoded_text] = parts.as_slice() else {
        return None;
    };

    Some(match encoding.to_uppercase().as_str() {
        "B" => decode_base64(encoded_text),
        // Quoted-Printable with underscore for space
        "Q" => decode_quoted_printable_bytes(&encoded_text.replace('_', " ")),
        _ => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {encoding}"
        ))),
    })
}

/// Decodes an RFC 2047 encoded header value.
///
/// Whitespace between two adjacent encoded-words is dropped, plain words are
/// kept as they are.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed or does not decode to UTF-8.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = Vec::with_capacity(text.len());
    let mut previous_encoded = false;

    for (i, token) in text.split_whitespace().enumerate() {
        match decode_encoded_word(token) {
            Some(decoded) => {
                if i > 0 && !previous_encoded {
                    result.push(b' ');
                }
                result.extend(decoded?);
                previous_encoded = true;
            }
            None => {
                if i > 0 {
                    result.push(b' ');
                }
                result.extend_from_slice(token.as_bytes());
                previous_encoded = false;
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn decode_qp(text: &str) -> Result<String> {
        String::from_utf8(decode_quoted_printable_bytes(text)?).map_err(Into::into)
    }
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped() {
        let data = [0u8; 120];
        let encoded = encode_base64_wrapped(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 76);
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Hallo Welt, schön das du dich drehst.";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hallo Welt, sch=C3=B6n das du dich drehst.");
    }

    #[test]
    fn test_quoted_printable_equals_and_trailing_space() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("end "), "end=20");
        assert_eq!(encode_quoted_printable("tab\t\nnext"), "tab=09\r\nnext");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        let encoded = encode_quoted_printable("line one\r\nline two\nline three");
        assert_eq!(encoded, "line one\r\nline two\r\nline three");
    }

    #[test]
    fn test_quoted_printable_soft_wrap() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);

        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {line}");
        }
        assert_eq!(decode_qp(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let encoded = "Hello, World!";
        let decoded = decode_qp(encoded).unwrap();
        assert_eq!(decoded, "Hello, World!");

        let encoded = "H=C3=A9llo";
        let decoded = decode_qp(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = "Hello=\r\nWorld";
        let decoded = decode_qp(encoded).unwrap();
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_qp("broken=4").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        let encoded = encode_rfc2047("We like German Umlauts to test UTF-8 öäü", "utf-8");
        assert_eq!(
            encoded,
            "=?utf-8?q?We_like_German_Umlauts_to_test_UTF-8_=C3=B6=C3=A4=C3=BC?="
        );
    }

    #[test]
    fn test_rfc2047_encode_splits_long_values() {
        let text = "ö".repeat(40);
        let encoded = encode_rfc2047(&text, "utf-8");
        let words: Vec<&str> = encoded.split(' ').collect();

        assert!(words.len() > 1);
        for word in &words {
            assert!(word.len() <= 75);
            assert!(word.starts_with("=?utf-8?q?"));
            assert!(word.ends_with("?="));
        }
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_decode() {
        let encoded = "Hello";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Hello");

        let encoded = "=?utf-8?B?SMOpbGxv?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        let encoded = "=?utf-8?Q?H=C3=A9llo?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_mixed_words() {
        let decoded = decode_rfc2047("Re: =?utf-8?q?sch=C3=B6n?= =?utf-8?q?_Tag?=").unwrap();
        assert_eq!(decoded, "Re: schön Tag");
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_roundtrip(text in "[^\r]{0,300}") {
            let encoded = encode_quoted_printable(&text);
            prop_assert!(encoded.is_ascii());
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
            }
            let decoded = decode_qp(&encoded).unwrap();
            prop_assert_eq!(decoded, text.replace('\n', "\r\n"));
        }

        #[test]
        fn prop_rfc2047_roundtrip(text in "\\PC{1,120}") {
            let encoded = encode_rfc2047(&text, "utf-8");
            prop_assert!(encoded.is_ascii());
            prop_assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
        }
    }
}
