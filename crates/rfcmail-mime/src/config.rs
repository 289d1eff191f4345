//! Serialization settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line terminator used when rendering a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineEnding {
    /// `\r\n`, as required on the wire (RFC 5322).
    #[default]
    CrLf,
    /// `\n`, for local storage or piping into `sendmail`-like tools.
    Lf,
}

impl LineEnding {
    /// Returns the terminator string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CrLf => "\r\n",
            Self::Lf => "\n",
        }
    }
}

/// Options controlling how a part tree is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    /// Line terminator.
    pub line_ending: LineEnding,
    /// Header lines longer than this are folded at whitespace.
    pub max_line_length: usize,
    /// Emit `MIME-Version: 1.0` on the root part.
    pub mime_version: bool,
}

impl RenderConfig {
    /// Default maximum header line length (RFC 5322 section 2.1.1).
    pub const DEFAULT_MAX_LINE_LENGTH: usize = 78;

    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line_ending: LineEnding::CrLf,
            max_line_length: Self::DEFAULT_MAX_LINE_LENGTH,
            mime_version: true,
        }
    }

    /// Sets the line terminator.
    #[must_use]
    pub const fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Sets the header folding width.
    #[must_use]
    pub const fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Enables or disables the `MIME-Version` header.
    #[must_use]
    pub const fn with_mime_version(mut self, mime_version: bool) -> Self {
        self.mime_version = mime_version;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert_eq!(config.max_line_length, 78);
        assert!(config.mime_version);
    }

    #[test]
    fn test_builder() {
        let config = RenderConfig::new()
            .with_line_ending(LineEnding::Lf)
            .with_max_line_length(100)
            .with_mime_version(false);

        assert_eq!(config.line_ending.as_str(), "\n");
        assert_eq!(config.max_line_length, 100);
        assert!(!config.mime_version);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: RenderConfig = serde_json::from_str(r#"{"line_ending":"Lf"}"#).unwrap();
        assert_eq!(config.line_ending, LineEnding::Lf);
        assert_eq!(config.max_line_length, 78);
        assert!(config.mime_version);
    }
}
