//! Option layering and resolution.
//!
//! Every block is configured by up to four layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. document defaults (the `tikz` metadata map)
//! 3. directive comments inside the diagram source (`%| key: value`)
//! 4. block attributes (`{.tikz format=pdf}`)
//!
//! Layers 2–4 are [`PartialOptions`] values merged with
//! [`PartialOptions::overlay`]; [`resolve`] then validates the result and
//! applies the target-dependent coercions to produce [`EffectiveOptions`].
//!
//! # Key routing
//!
//! Keys outside the fixed vocabulary are routed by prefix:
//!
//! | Prefix             | Destination                        |
//! |--------------------|------------------------------------|
//! | `fig-`             | figure attributes                  |
//! | `image-`, `img-`   | image attributes                   |
//! | `opt-`             | `tikzpicture` options              |
//! | anything else      | image attributes                   |

use std::sync::LazyLock;

use regex::Regex;
use tkz_pandoc::TargetFormat;

use crate::block::DiagramBlock;
use crate::consts::{DEFAULT_FOLDER, PICTURE_BEGIN};
use crate::directive;
use crate::error::DiagramError;
use crate::format::{DiagramFormat, EmbedMode};
use crate::settings::DocumentSettings;

/// Characters allowed in library and package names.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.,/-]+$").unwrap());

/// Keys only meaningful in document metadata.
const DOCUMENT_ONLY_KEYS: &[&str] = &[
    "cache",
    "cache-dir",
    "save-tex",
    "save-tex-dir",
    "debug",
    "on-error",
];

/// One raw option value from a directive comment or block attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawValue {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

/// One option layer. `None` and empty lists mean "not set in this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialOptions {
    pub format: Option<String>,
    pub embed_mode: Option<String>,
    pub folder: Option<String>,
    pub filename: Option<String>,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub scale: Option<String>,
    pub libraries: Option<Vec<String>>,
    pub additional_packages: Option<Vec<String>>,
    pub header_includes: Option<Vec<String>>,
    pub figure_attrs: Vec<(String, String)>,
    pub image_attrs: Vec<(String, String)>,
    pub picture_options: Vec<(String, String)>,
}

/// Map accepted spellings to the canonical key.
fn canonical_key(key: &str) -> &str {
    match key {
        "embed_mode" | "embedMode" => "embed-mode",
        "additionalPackages" | "additional_packages" => "additional-packages",
        "header_includes" => "header-includes",
        "fig_attr" | "figAttr" => "fig-attr",
        "cache_dir" => "cache-dir",
        "save_tex" => "save-tex",
        "save_tex_dir" => "save-tex-dir",
        "on_error" => "on-error",
        other => other,
    }
}

/// Split comma-separated entries and drop blanks.
pub(crate) fn split_names<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .flat_map(|item| {
            item.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Insert or replace `key` in an ordered pair list.
fn upsert(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => pairs.push((key, value)),
    }
}

/// `lower` with every pair of `upper` upserted.
fn merge_pairs(mut lower: Vec<(String, String)>, upper: Vec<(String, String)>) -> Vec<(String, String)> {
    for (key, value) in upper {
        upsert(&mut lower, key, value);
    }
    lower
}

impl PartialOptions {
    /// Merge `upper` on top of `self`: every value set in `upper` wins.
    #[must_use]
    pub fn overlay(self, upper: Self) -> Self {
        Self {
            format: upper.format.or(self.format),
            embed_mode: upper.embed_mode.or(self.embed_mode),
            folder: upper.folder.or(self.folder),
            filename: upper.filename.or(self.filename),
            caption: upper.caption.or(self.caption),
            alt: upper.alt.or(self.alt),
            width: upper.width.or(self.width),
            height: upper.height.or(self.height),
            scale: upper.scale.or(self.scale),
            libraries: upper.libraries.or(self.libraries),
            additional_packages: upper.additional_packages.or(self.additional_packages),
            header_includes: upper.header_includes.or(self.header_includes),
            figure_attrs: merge_pairs(self.figure_attrs, upper.figure_attrs),
            image_attrs: merge_pairs(self.image_attrs, upper.image_attrs),
            picture_options: merge_pairs(self.picture_options, upper.picture_options),
        }
    }

    /// Layer built from block attributes.
    pub(crate) fn from_attributes(
        attributes: &[(String, String)],
        warnings: &mut Vec<String>,
    ) -> Result<Self, DiagramError> {
        let mut layer = Self::default();
        for (key, value) in attributes {
            layer.set(key, RawValue::Scalar(value.clone()), warnings)?;
        }
        Ok(layer)
    }

    /// Apply one `key: value` pair to this layer.
    pub(crate) fn set(
        &mut self,
        key: &str,
        value: RawValue,
        warnings: &mut Vec<String>,
    ) -> Result<(), DiagramError> {
        let key = canonical_key(key);
        match key {
            "format" => self.format = Some(scalar(key, value)?),
            "embed-mode" => self.embed_mode = Some(scalar(key, value)?),
            "folder" => self.folder = Some(scalar(key, value)?),
            "filename" => self.filename = Some(scalar(key, value)?),
            "caption" => self.caption = Some(scalar(key, value)?),
            "alt" => self.alt = Some(scalar(key, value)?),
            "width" => self.width = Some(scalar(key, value)?),
            "height" => self.height = Some(scalar(key, value)?),
            "scale" => self.scale = Some(scalar(key, value)?),
            "libraries" => self.libraries = Some(split_names(list(key, value)?)),
            "additional-packages" => {
                self.additional_packages = Some(split_names(list(key, value)?));
            }
            "header-includes" => self.header_includes = Some(list(key, value)?),
            "fig-attr" => match value {
                RawValue::Map(pairs) => {
                    for (name, value) in pairs {
                        upsert(&mut self.figure_attrs, name, value);
                    }
                }
                _ => return Err(DiagramError::invalid(key, "expected a mapping")),
            },
            _ if DOCUMENT_ONLY_KEYS.contains(&key) => {
                warnings.push(format!(
                    "option '{key}' is only read from document metadata, ignored"
                ));
            }
            _ => {
                let value = scalar(key, value)?;
                if let Some(name) = key.strip_prefix("fig-") {
                    upsert(&mut self.figure_attrs, name.to_owned(), value);
                } else if let Some(name) = key.strip_prefix("opt-") {
                    upsert(&mut self.picture_options, name.to_owned(), value);
                } else if let Some(name) = key
                    .strip_prefix("image-")
                    .or_else(|| key.strip_prefix("img-"))
                {
                    upsert(&mut self.image_attrs, name.to_owned(), value);
                } else {
                    upsert(&mut self.image_attrs, key.to_owned(), value);
                }
            }
        }
        Ok(())
    }
}

fn scalar(key: &str, value: RawValue) -> Result<String, DiagramError> {
    match value {
        RawValue::Scalar(s) => Ok(s),
        RawValue::List(_) | RawValue::Map(_) => {
            Err(DiagramError::invalid(key, "expected a single value"))
        }
    }
}

fn list(key: &str, value: RawValue) -> Result<Vec<String>, DiagramError> {
    match value {
        RawValue::Scalar(s) => Ok(vec![s]),
        RawValue::List(items) => Ok(items),
        RawValue::Map(_) => Err(DiagramError::invalid(key, "expected a value or a list")),
    }
}

/// Fully resolved configuration of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    pub format: DiagramFormat,
    pub embed_mode: EmbedMode,
    /// Output folder for linked images.
    pub folder: String,
    /// Artifact base name, unique within the document.
    pub filename: String,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub scale: Option<String>,
    pub libraries: Vec<String>,
    pub additional_packages: Vec<String>,
    pub header_includes: Vec<String>,
    pub figure_attrs: Vec<(String, String)>,
    pub image_attrs: Vec<(String, String)>,
    pub picture_options: Vec<(String, String)>,
}

/// Outcome of [`resolve`].
#[derive(Debug)]
pub struct Resolution {
    pub options: EffectiveOptions,
    /// Diagram source with directive comments removed.
    pub body: String,
    /// Non-fatal findings, reported by the caller.
    pub warnings: Vec<String>,
}

/// Resolve the effective options of the `index`-th diagram block (1-based).
///
/// # Errors
///
/// Returns a configuration error for unknown enumerated values, malformed
/// directives, unusable file names or invalid package names. No external
/// program runs before resolution succeeds.
pub fn resolve(
    block: &DiagramBlock<'_>,
    document: &DocumentSettings,
    target: &TargetFormat,
    index: usize,
) -> Result<Resolution, DiagramError> {
    let mut warnings = Vec::new();
    let directives = directive::parse(block.source, &mut warnings)?;
    let attributes = PartialOptions::from_attributes(block.attributes, &mut warnings)?;
    let merged = document
        .options
        .clone()
        .overlay(directives.options)
        .overlay(attributes);

    let format = resolve_format(merged.format.as_deref(), target)?;
    let embed_mode = resolve_embed_mode(merged.embed_mode.as_deref(), format, target)?;

    let filename = match merged.filename {
        Some(name) => name.trim().to_owned(),
        None => format!("{}-{index}", document.filename_prefix),
    };
    validate_filename(&filename)?;

    let libraries = merged.libraries.unwrap_or_default();
    let additional_packages = merged.additional_packages.unwrap_or_default();
    validate_names("libraries", &libraries)?;
    validate_names("additional-packages", &additional_packages)?;

    if let Some(scale) = &merged.scale {
        let positive = scale
            .trim()
            .parse::<f64>()
            .is_ok_and(|s| s.is_finite() && s > 0.0);
        if !positive {
            return Err(DiagramError::invalid(
                "scale",
                format!("'{scale}' is not a positive number"),
            ));
        }
    }

    if !merged.picture_options.is_empty() && directives.body.contains(PICTURE_BEGIN) {
        warnings.push(
            "opt-* picture options are ignored because the diagram opens its own tikzpicture"
                .to_owned(),
        );
    }

    Ok(Resolution {
        options: EffectiveOptions {
            format,
            embed_mode,
            folder: merged.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned()),
            filename,
            caption: merged.caption.filter(|c| !c.trim().is_empty()),
            alt: merged.alt,
            width: merged.width,
            height: merged.height,
            scale: merged.scale.map(|s| s.trim().to_owned()),
            libraries,
            additional_packages,
            header_includes: merged.header_includes.unwrap_or_default(),
            figure_attrs: merged.figure_attrs,
            image_attrs: merged.image_attrs,
            picture_options: merged.picture_options,
        },
        body: directives.body,
        warnings,
    })
}

/// Parse the requested format, then force PDF for LaTeX-based targets.
pub(crate) fn resolve_format(
    requested: Option<&str>,
    target: &TargetFormat,
) -> Result<DiagramFormat, DiagramError> {
    let format = match requested {
        Some(value) => DiagramFormat::parse(value).ok_or_else(|| DiagramError::Configuration {
            key: "format".to_owned(),
            value: value.to_owned(),
            allowed: DiagramFormat::ALLOWED,
        })?,
        None => DiagramFormat::default(),
    };
    if target.is_latex() && format != DiagramFormat::Pdf {
        tracing::debug!(writer = %target, "using pdf output for LaTeX-based target");
        return Ok(DiagramFormat::Pdf);
    }
    Ok(format)
}

/// Parse the requested embed mode, then force `link` for PDF or non-HTML targets.
///
/// Must run after [`resolve_format`]: the coercion depends on the final format.
pub(crate) fn resolve_embed_mode(
    requested: Option<&str>,
    format: DiagramFormat,
    target: &TargetFormat,
) -> Result<EmbedMode, DiagramError> {
    let mode = match requested {
        Some(value) => EmbedMode::parse(value).ok_or_else(|| DiagramError::Configuration {
            key: "embed-mode".to_owned(),
            value: value.to_owned(),
            allowed: EmbedMode::ALLOWED,
        })?,
        None => EmbedMode::default(),
    };
    if mode != EmbedMode::Link && (format == DiagramFormat::Pdf || !target.is_html()) {
        tracing::debug!(writer = %target, format = format.as_str(), requested = mode.as_str(), "using link embedding");
        return Ok(EmbedMode::Link);
    }
    Ok(mode)
}

fn validate_filename(filename: &str) -> Result<(), DiagramError> {
    let message = if filename.is_empty() {
        "must not be empty"
    } else if filename.contains(['/', '\\', '\0']) {
        "must not contain path separators"
    } else if filename.starts_with('.') {
        "must not start with '.'"
    } else {
        return Ok(());
    };
    Err(DiagramError::invalid("filename", format!("'{filename}' {message}")))
}

fn validate_names(key: &str, names: &[String]) -> Result<(), DiagramError> {
    match names.iter().find(|name| !NAME_PATTERN.is_match(name)) {
        Some(name) => Err(DiagramError::invalid(
            key,
            format!("'{name}' is not a valid name"),
        )),
        None => Ok(()),
    }
}
