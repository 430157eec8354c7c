//! Output format negotiation.

use std::fmt;

/// Writers whose output is HTML.
const HTML_WRITERS: &[&str] = &[
    "html",
    "html4",
    "html5",
    "epub",
    "epub2",
    "epub3",
    "revealjs",
    "s5",
    "slidy",
    "slideous",
    "dzslides",
    "chunkedhtml",
];

/// Writers that go through LaTeX (or ConTeXt), where SVG cannot be included.
const LATEX_WRITERS: &[&str] = &["latex", "beamer", "context", "pdf"];

/// Target writer pandoc passes to a filter as its first argument.
///
/// Extension suffixes (`html+smart-raw_html`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFormat {
    name: String,
}

impl TargetFormat {
    /// Parse a writer name such as `html5` or `latex+raw_tex`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let base = name
            .split(['+', '-'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self { name: base }
    }

    /// Writer name without extensions.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the writer produces HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        HTML_WRITERS.contains(&self.name.as_str())
    }

    /// Whether the writer is LaTeX-based.
    #[must_use]
    pub fn is_latex(&self) -> bool {
        LATEX_WRITERS.contains(&self.name.as_str())
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self::parse("html")
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_writers() {
        for name in ["html", "html5", "epub3", "revealjs", "HTML5"] {
            let format = TargetFormat::parse(name);
            assert!(format.is_html(), "{name}");
            assert!(!format.is_latex(), "{name}");
        }
    }

    #[test]
    fn test_latex_writers() {
        for name in ["latex", "beamer", "context", "pdf"] {
            let format = TargetFormat::parse(name);
            assert!(format.is_latex(), "{name}");
            assert!(!format.is_html(), "{name}");
        }
    }

    #[test]
    fn test_extensions_are_stripped() {
        assert_eq!(TargetFormat::parse("html5+smart-raw_html").name(), "html5");
        assert_eq!(TargetFormat::parse("latex-smart").name(), "latex");
    }

    #[test]
    fn test_other_writers_are_neither() {
        let docx = TargetFormat::parse("docx");
        assert!(!docx.is_html());
        assert!(!docx.is_latex());
        assert_eq!(docx.to_string(), "docx");
    }

    #[test]
    fn test_default_is_html() {
        assert!(TargetFormat::default().is_html());
    }
}
