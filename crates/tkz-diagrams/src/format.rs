//! Closed option vocabularies: output format, embed mode, error policy.

/// Output format of a rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramFormat {
    /// Scalable vector graphics (default).
    #[default]
    Svg,
    /// PDF straight from the typesetter, for LaTeX targets.
    Pdf,
}

impl DiagramFormat {
    /// Accepted spellings.
    pub const ALLOWED: &'static [&'static str] = &["svg", "pdf"];

    /// Parse format from an option value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Return format as string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// File extension of artifacts in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// MIME type used in data URIs.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether `bytes` look like a file of this format.
    #[must_use]
    pub fn has_signature(self, bytes: &[u8]) -> bool {
        match self {
            Self::Pdf => bytes.starts_with(b"%PDF-"),
            Self::Svg => String::from_utf8_lossy(bytes).contains("<svg"),
        }
    }
}

/// How a rendered artifact is attached to the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedMode {
    /// Base64 data URI in an image reference (default).
    #[default]
    Inline,
    /// File written to the output folder and referenced by path.
    Link,
    /// SVG markup spliced into the document as a raw HTML block.
    Raw,
}

impl EmbedMode {
    /// Accepted spellings.
    pub const ALLOWED: &'static [&'static str] = &["inline", "link", "raw"];

    /// Parse embed mode from an option value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Some(Self::Inline),
            "link" => Some(Self::Link),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Return mode as string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Link => "link",
            Self::Raw => "raw",
        }
    }
}

/// What happens to a block that fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Leave the original code block in the output.
    #[default]
    Keep,
    /// Remove the block from the output.
    Drop,
}

impl ErrorPolicy {
    /// Accepted spellings.
    pub const ALLOWED: &'static [&'static str] = &["keep", "drop"];

    /// Parse policy from an option value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}
