//! Document-level diagram defaults.
//!
//! Documents configure the filter through a map under the `tikz` metadata key:
//!
//! ```yaml
//! tikz:
//!   format: svg
//!   embed_mode: link
//!   folder: figures
//!   cache: true
//! ```
//!
//! Values arrive as plain JSON after pandoc metadata has been flattened, so
//! numbers and booleans may show up as strings. The types here accept both
//! spellings and leave validation of enumerated values to the option resolver,
//! which reports them per block.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::ConfigError;

/// Metadata key holding the document defaults.
pub const METADATA_KEY: &str = "tikz";

/// Document-wide defaults, applied before any per-block override.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DocumentDefaults {
    /// Output format (`svg` or `pdf`).
    pub format: Option<Scalar>,
    /// Output folder for linked images.
    pub folder: Option<Scalar>,
    /// Base name for generated files; a block counter is appended.
    pub filename: Option<Scalar>,
    /// Default caption.
    pub caption: Option<Scalar>,
    /// Presentational width.
    pub width: Option<Scalar>,
    /// Presentational height.
    pub height: Option<Scalar>,
    /// Embedding mode (`inline`, `link` or `raw`).
    #[serde(alias = "embed_mode", alias = "embedMode")]
    pub embed_mode: Option<Scalar>,
    /// Picture scale factor.
    pub scale: Option<Scalar>,
    /// TikZ libraries loaded with `\usetikzlibrary`.
    pub libraries: Option<StringList>,
    /// Extra LaTeX packages.
    #[serde(alias = "additionalPackages", alias = "additional_packages")]
    pub additional_packages: Option<StringList>,
    /// Raw preamble lines.
    #[serde(alias = "header_includes")]
    pub header_includes: Option<StringList>,
    /// Enable the render cache (`true`, `false` or a directory).
    pub cache: Option<Toggle>,
    /// Explicit cache directory.
    #[serde(alias = "cache_dir")]
    pub cache_dir: Option<Scalar>,
    /// Keep intermediate `.tex` files (`true`, `false` or a directory).
    #[serde(alias = "save_tex")]
    pub save_tex: Option<Toggle>,
    /// Directory for kept intermediate files.
    #[serde(alias = "save_tex_dir")]
    pub save_tex_dir: Option<Scalar>,
    /// Log generated wrapper documents and tool output.
    pub debug: Option<Toggle>,
    /// What to do with blocks that fail to render (`keep` or `drop`).
    #[serde(alias = "on_error")]
    pub on_error: Option<Scalar>,
    /// Keys not recognized above.
    #[serde(skip)]
    unknown: Vec<String>,
}

/// Every key (and alias) [`DocumentDefaults`] understands.
const KNOWN_KEYS: &[&str] = &[
    "format",
    "folder",
    "filename",
    "caption",
    "width",
    "height",
    "embed-mode",
    "embed_mode",
    "embedMode",
    "scale",
    "libraries",
    "additional-packages",
    "additionalPackages",
    "additional_packages",
    "header-includes",
    "header_includes",
    "cache",
    "cache-dir",
    "cache_dir",
    "save-tex",
    "save_tex",
    "save-tex-dir",
    "save_tex_dir",
    "debug",
    "on-error",
    "on_error",
];

impl DocumentDefaults {
    /// Deserialize defaults from the plain-JSON value stored under [`METADATA_KEY`].
    ///
    /// A missing or `null` value yields the built-in defaults.
    pub fn from_metadata(value: Option<&Value>) -> Result<Self, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => {
                let mut defaults = Self::deserialize(value).map_err(ConfigError::Metadata)?;
                if let Value::Object(map) = value {
                    defaults.unknown = map
                        .keys()
                        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
                        .cloned()
                        .collect();
                }
                Ok(defaults)
            }
        }
    }

    /// Names of keys that were not recognized.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.unknown.iter().map(String::as_str)
    }

    /// Whether debug output was requested.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug.as_ref().is_some_and(Toggle::is_enabled)
    }
}

/// A scalar metadata value normalized to a string.
///
/// Accepts JSON strings, numbers and booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar(pub String);

impl Scalar {
    /// Borrow the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarRepr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(match ScalarRepr::deserialize(deserializer)? {
            ScalarRepr::Str(s) => s,
            ScalarRepr::Int(i) => i.to_string(),
            ScalarRepr::Float(f) => f.to_string(),
            ScalarRepr::Bool(b) => b.to_string(),
        }))
    }
}

/// One string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    /// Flatten into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(items) => items.clone(),
        }
    }
}

/// A boolean switch that may also carry a directory.
///
/// `true`/`false` toggle the feature; any other string enables it and names
/// the directory to use. The strings `"true"`, `"yes"`, `"on"` and
/// `"false"`, `"no"`, `"off"` are read as booleans.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Toggle {
    Flag(bool),
    Path(String),
}

impl Toggle {
    /// Whether the feature is switched on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Path(s) => !matches!(s.as_str(), "false" | "no" | "off" | ""),
        }
    }

    /// Directory carried by the toggle, if it names one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Flag(_) => None,
            Self::Path(s) => match s.as_str() {
                "true" | "yes" | "on" | "false" | "no" | "off" | "" => None,
                dir => Some(dir),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_missing_metadata_gives_defaults() {
        assert_eq!(
            DocumentDefaults::from_metadata(None).unwrap(),
            DocumentDefaults::default()
        );
        assert_eq!(
            DocumentDefaults::from_metadata(Some(&Value::Null)).unwrap(),
            DocumentDefaults::default()
        );
    }

    #[test]
    fn test_parse_recognized_keys() {
        let meta = json!({
            "format": "pdf",
            "folder": "figures",
            "filename": "fig",
            "caption": "A caption",
            "width": "50%",
            "height": 120,
            "embed_mode": "link",
            "cache": true,
            "cache-dir": "/tmp/tkz",
            "save-tex": "tex-out",
            "debug": "yes",
            "on-error": "drop",
        });

        let defaults = DocumentDefaults::from_metadata(Some(&meta)).unwrap();

        assert_eq!(defaults.format, Some(Scalar::from("pdf")));
        assert_eq!(defaults.folder, Some(Scalar::from("figures")));
        assert_eq!(defaults.filename, Some(Scalar::from("fig")));
        assert_eq!(defaults.caption, Some(Scalar::from("A caption")));
        assert_eq!(defaults.width, Some(Scalar::from("50%")));
        assert_eq!(defaults.height, Some(Scalar::from("120")));
        assert_eq!(defaults.embed_mode, Some(Scalar::from("link")));
        assert_eq!(defaults.cache, Some(Toggle::Flag(true)));
        assert_eq!(defaults.cache_dir, Some(Scalar::from("/tmp/tkz")));
        assert_eq!(defaults.save_tex.as_ref().and_then(Toggle::path), Some("tex-out"));
        assert!(defaults.debug_enabled());
        assert_eq!(defaults.on_error, Some(Scalar::from("drop")));
        assert_eq!(defaults.unknown_keys().count(), 0);
    }

    #[test]
    fn test_embed_mode_aliases() {
        for key in ["embed_mode", "embed-mode", "embedMode"] {
            let meta = json!({ key: "raw" });
            let defaults = DocumentDefaults::from_metadata(Some(&meta)).unwrap();
            assert_eq!(defaults.embed_mode, Some(Scalar::from("raw")), "key {key}");
        }
    }

    #[test]
    fn test_package_lists() {
        let meta = json!({
            "libraries": "arrows.meta, positioning",
            "additionalPackages": ["pgfplots", "amsmath"],
            "header-includes": "\\usepackage{xcolor}",
        });

        let defaults = DocumentDefaults::from_metadata(Some(&meta)).unwrap();

        assert_eq!(
            defaults.libraries,
            Some(StringList::One("arrows.meta, positioning".to_owned()))
        );
        assert_eq!(
            defaults.additional_packages.unwrap().to_vec(),
            vec!["pgfplots".to_owned(), "amsmath".to_owned()]
        );
        assert_eq!(
            defaults.header_includes.unwrap().to_vec(),
            vec!["\\usepackage{xcolor}".to_owned()]
        );
    }

    #[test]
    fn test_unknown_keys_collected() {
        let meta = json!({ "format": "svg", "colour": "red" });
        let defaults = DocumentDefaults::from_metadata(Some(&meta)).unwrap();

        assert_eq!(defaults.unknown_keys().collect::<Vec<_>>(), vec!["colour"]);
    }

    #[test]
    fn test_non_map_metadata_is_error() {
        let meta = json!("tikz: svg");
        let err = DocumentDefaults::from_metadata(Some(&meta)).unwrap_err();

        assert!(matches!(err, ConfigError::Metadata(_)));
    }

    #[test]
    fn test_toggle_semantics() {
        assert!(Toggle::Flag(true).is_enabled());
        assert!(!Toggle::Flag(false).is_enabled());
        assert!(Toggle::Path("true".to_owned()).is_enabled());
        assert!(!Toggle::Path("no".to_owned()).is_enabled());
        assert!(Toggle::Path("/var/cache/tkz".to_owned()).is_enabled());

        assert_eq!(Toggle::Flag(true).path(), None);
        assert_eq!(Toggle::Path("yes".to_owned()).path(), None);
        assert_eq!(
            Toggle::Path("/var/cache/tkz".to_owned()).path(),
            Some("/var/cache/tkz")
        );
    }
}
