//! Per-block error taxonomy.

use std::fmt;

/// Stage of the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Writing the wrapper document.
    Build,
    /// Running the LaTeX typesetter.
    Typeset,
    /// Running the PDF to SVG converter.
    Convert,
    /// Reading and checking the final artifact.
    Read,
}

impl Stage {
    /// Stage name as used in diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Typeset => "typeset",
            Self::Convert => "convert",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to turn one diagram block into an image.
///
/// None of these abort the document: the processor reports them and applies
/// the configured [`ErrorPolicy`](crate::ErrorPolicy).
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// Enumerated option outside its allowed set.
    #[error("invalid value '{value}' for '{key}' (allowed: {})", .allowed.join(", "))]
    Configuration {
        key: String,
        value: String,
        allowed: &'static [&'static str],
    },
    /// Option that cannot be used as given.
    #[error("invalid option '{key}': {message}")]
    InvalidOption { key: String, message: String },
    /// Required external program not found.
    #[error("required tool '{tool}' not found on PATH")]
    ToolUnavailable { tool: String },
    /// Pipeline stage failed.
    #[error("{stage} stage failed{}", .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    Render {
        stage: Stage,
        exit_code: Option<i32>,
        /// Captured tool log.
        log: String,
        /// Diagram source that was being rendered.
        diagram: String,
    },
    /// Filesystem failure outside the external tools.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DiagramError {
    /// Create an [`DiagramError::Io`] with context.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a [`DiagramError::InvalidOption`].
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised before any external tool ran.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::InvalidOption { .. })
    }

    /// Failed stage, for render errors.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Render { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
