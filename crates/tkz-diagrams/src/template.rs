//! Standalone wrapper document.
//!
//! The diagram body is spliced in raw: TikZ owns its own escaping. Only the
//! package and library slots are generated from option values, and those
//! names are validated during option resolution.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::consts::PICTURE_BEGIN;
use crate::options::EffectiveOptions;

const TEMPLATE: &str = r"\documentclass[tikz,border=2pt]{standalone}
\usepackage{tikz}
{{packages}}{{libraries}}{{header}}{{style}}\begin{document}
{{body}}
\end{document}
";

static SLOT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Build the wrapper document for `body`.
///
/// Slots are filled in a single pass over the template, so slot contents are
/// never rescanned for further slots.
#[must_use]
pub fn render_wrapper(options: &EffectiveOptions, body: &str) -> String {
    let packages: String = options
        .additional_packages
        .iter()
        .map(|name| format!("\\usepackage{{{name}}}\n"))
        .collect();
    let libraries = if options.libraries.is_empty() {
        String::new()
    } else {
        format!("\\usetikzlibrary{{{}}}\n", options.libraries.join(","))
    };
    let header: String = options
        .header_includes
        .iter()
        .map(|line| format!("{line}\n"))
        .collect();
    let style = options
        .scale
        .as_ref()
        .map(|scale| {
            format!("\\tikzset{{every picture/.append style={{scale={scale}, transform shape}}}}\n")
        })
        .unwrap_or_default();
    let body = picture_body(body, &options.picture_options);

    SLOT_PATTERN
        .replace_all(TEMPLATE, |caps: &Captures<'_>| match &caps[1] {
            "packages" => packages.clone(),
            "libraries" => libraries.clone(),
            "header" => header.clone(),
            "style" => style.clone(),
            "body" => body.clone(),
            _ => String::new(),
        })
        .into_owned()
}

/// Wrap `body` in a `tikzpicture` unless it already contains one.
fn picture_body(body: &str, picture_options: &[(String, String)]) -> String {
    let body = body.trim_end();
    if body.contains(PICTURE_BEGIN) {
        return body.to_owned();
    }
    let options = if picture_options.is_empty() {
        String::new()
    } else {
        let list: Vec<String> = picture_options
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key}={value}")
                }
            })
            .collect();
        format!("[{}]", list.join(", "))
    };
    format!("{PICTURE_BEGIN}{options}\n{body}\n\\end{{tikzpicture}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{DiagramFormat, EmbedMode};
    use pretty_assertions::assert_eq;

    fn options() -> EffectiveOptions {
        EffectiveOptions {
            format: DiagramFormat::Svg,
            embed_mode: EmbedMode::Inline,
            folder: "images".to_owned(),
            filename: "tikz-image-1".to_owned(),
            caption: None,
            alt: None,
            width: None,
            height: None,
            scale: None,
            libraries: Vec::new(),
            additional_packages: Vec::new(),
            header_includes: Vec::new(),
            figure_attrs: Vec::new(),
            image_attrs: Vec::new(),
            picture_options: Vec::new(),
        }
    }

    #[test]
    fn test_minimal_wrapper() {
        let doc = render_wrapper(&options(), "\\node (A) at (0,0) {A};\n");

        assert_eq!(
            doc,
            "\\documentclass[tikz,border=2pt]{standalone}\n\
             \\usepackage{tikz}\n\
             \\begin{document}\n\
             \\begin{tikzpicture}\n\
             \\node (A) at (0,0) {A};\n\
             \\end{tikzpicture}\n\
             \\end{document}\n"
        );
    }

    #[test]
    fn test_all_slots() {
        let opts = EffectiveOptions {
            libraries: vec!["arrows.meta".to_owned(), "calc".to_owned()],
            additional_packages: vec!["pgfplots".to_owned()],
            header_includes: vec!["\\pgfplotsset{compat=1.18}".to_owned()],
            scale: Some("2".to_owned()),
            picture_options: vec![
                ("thick".to_owned(), String::new()),
                ("node distance".to_owned(), "2cm".to_owned()),
            ],
            ..options()
        };

        let doc = render_wrapper(&opts, "\\draw (0,0) -- (1,1);");

        assert!(doc.contains("\\usepackage{pgfplots}\n"));
        assert!(doc.contains("\\usetikzlibrary{arrows.meta,calc}\n"));
        assert!(doc.contains("\\pgfplotsset{compat=1.18}\n"));
        assert!(doc.contains("scale=2, transform shape"));
        assert!(doc.contains("\\begin{tikzpicture}[thick, node distance=2cm]\n"));
    }

    #[test]
    fn test_existing_picture_is_not_wrapped() {
        let body = "\\begin{tikzpicture}\n\\draw (0,0) -- (1,1);\n\\end{tikzpicture}";
        let opts = EffectiveOptions {
            picture_options: vec![("thick".to_owned(), String::new())],
            ..options()
        };

        let doc = render_wrapper(&opts, body);

        assert_eq!(doc.matches("\\begin{tikzpicture}").count(), 1);
        assert!(!doc.contains("[thick]"));
    }

    #[test]
    fn test_slot_markers_in_body_are_not_expanded() {
        let doc = render_wrapper(&options(), "\\node {{{packages}}};");

        assert!(doc.contains("\\node {{{packages}}};"));
    }
}
