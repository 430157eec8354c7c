//! Embedding strategies: link, inline data URI, raw markup.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::{NoExpand, Regex};

use crate::error::DiagramError;
use crate::format::{DiagramFormat, EmbedMode};
use crate::options::EffectiveOptions;
use crate::pipeline::Artifact;

/// XML declaration, doctype and leading comments before the root element.
static PROLOG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:<\?xml[^>]*\?>\s*|<!DOCTYPE[^>]*>\s*|<!--(?s:.*?)-->\s*)*").unwrap()
});

/// Opening tag of the root `<svg>` element.
static SVG_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg\b[^>]*?(/?)>").unwrap());

/// What the output node refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Relative path of a file written to the output folder.
    Link(String),
    /// `data:` URI carrying the artifact.
    DataUri(String),
    /// SVG markup for a raw HTML block.
    Raw(String),
}

/// Turn an artifact into the payload its embed mode calls for.
///
/// Link mode writes `<folder>/<filename>.<ext>`, with `folder` resolved
/// against `base_dir`; the payload keeps the folder as written so the
/// document references a relative path.
///
/// # Errors
///
/// Returns [`DiagramError::Io`] if the output folder or file cannot be
/// written, and [`DiagramError::InvalidOption`] for raw PDF.
pub fn embed(
    artifact: &Artifact,
    options: &EffectiveOptions,
    base_dir: &Path,
) -> Result<Payload, DiagramError> {
    match options.embed_mode {
        EmbedMode::Link => {
            let file_name = format!("{}.{}", options.filename, artifact.format.extension());
            let dir = base_dir.join(&options.folder);
            fs::create_dir_all(&dir).map_err(|e| {
                DiagramError::io(format!("failed to create output folder {}", dir.display()), e)
            })?;
            let path = dir.join(&file_name);
            fs::write(&path, &artifact.bytes)
                .map_err(|e| DiagramError::io(format!("failed to write {}", path.display()), e))?;
            tracing::debug!(path = %path.display(), "wrote diagram");
            Ok(Payload::Link(link_target(&options.folder, &file_name)))
        }
        EmbedMode::Inline => Ok(Payload::DataUri(format!(
            "data:{};base64,{}",
            artifact.format.mime_type(),
            STANDARD.encode(&artifact.bytes)
        ))),
        EmbedMode::Raw => match artifact.format {
            DiagramFormat::Svg => Ok(Payload::Raw(clean_svg(&String::from_utf8_lossy(
                &artifact.bytes,
            )))),
            DiagramFormat::Pdf => Err(DiagramError::invalid(
                "embed-mode",
                "raw embedding requires svg output",
            )),
        },
    }
}

/// `folder/file` with forward slashes, as written in the document.
fn link_target(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches(['/', '\\']);
    if folder.is_empty() {
        file_name.to_owned()
    } else {
        format!("{folder}/{file_name}")
    }
}

/// Strip the XML prolog and blank lines so the markup can sit in HTML.
///
/// Blank lines would end a raw HTML block when the output is Markdown.
fn clean_svg(svg: &str) -> String {
    PROLOG_PATTERN
        .replace(svg, "")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Set `name="value"` on the root `<svg>` element, replacing an existing value.
#[must_use]
pub fn set_svg_attribute(svg: &str, name: &str, value: &str) -> String {
    let Some(tag) = SVG_TAG_PATTERN.find(svg) else {
        return svg.to_owned();
    };
    let escaped = escape_attribute(value);
    let tag_text = tag.as_str();

    let existing = Regex::new(&format!(r#"\s{}\s*=\s*("[^"]*"|'[^']*')"#, regex::escape(name)));
    let new_tag = match existing {
        Ok(pattern) if pattern.is_match(tag_text) => pattern
            .replace(tag_text, NoExpand(&format!(r#" {name}="{escaped}""#)))
            .into_owned(),
        _ => {
            let close = if tag_text.ends_with("/>") { 2 } else { 1 };
            let (head, tail) = tag_text.split_at(tag_text.len() - close);
            format!(r#"{} {name}="{escaped}"{tail}"#, head.trim_end())
        }
    };

    let mut out = String::with_capacity(svg.len() + name.len() + value.len() + 4);
    out.push_str(&svg[..tag.start()]);
    out.push_str(&new_tag);
    out.push_str(&svg[tag.end()..]);
    out
}

pub(crate) fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
