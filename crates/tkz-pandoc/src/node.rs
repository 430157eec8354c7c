//! Builders for the replacement elements the filter emits.
//!
//! Every function returns a ready-to-splice JSON element.

use serde_json::{Value, json};

use crate::ast::Attr;

/// Split plain text into `Str`/`Space` inlines.
#[must_use]
pub fn text_inlines(text: &str) -> Vec<Value> {
    let mut inlines = Vec::new();
    for word in text.split_whitespace() {
        if !inlines.is_empty() {
            inlines.push(json!({"t": "Space"}));
        }
        inlines.push(json!({"t": "Str", "c": word}));
    }
    inlines
}

/// `Image` inline: `alt` inlines, target `url` and `title`.
#[must_use]
pub fn image(attr: &Attr, alt: Vec<Value>, url: &str, title: &str) -> Value {
    json!({"t": "Image", "c": [attr.to_value(), alt, [url, title]]})
}

/// `Para` block.
#[must_use]
pub fn para(inlines: Vec<Value>) -> Value {
    json!({"t": "Para", "c": inlines})
}

/// `Plain` block.
#[must_use]
pub fn plain(inlines: Vec<Value>) -> Value {
    json!({"t": "Plain", "c": inlines})
}

/// `RawBlock` in the given output format.
#[must_use]
pub fn raw_block(format: &str, text: &str) -> Value {
    json!({"t": "RawBlock", "c": [format, text]})
}

/// `Figure` block (pandoc API 1.23 and later) with a long caption.
#[must_use]
pub fn figure(attr: &Attr, caption: Vec<Value>, body: Vec<Value>) -> Value {
    json!({"t": "Figure", "c": [attr.to_value(), [null, [plain(caption)]], body]})
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_inlines() {
        assert_eq!(
            text_inlines("  Flow  chart "),
            vec![
                json!({"t": "Str", "c": "Flow"}),
                json!({"t": "Space"}),
                json!({"t": "Str", "c": "chart"}),
            ]
        );
        assert!(text_inlines("").is_empty());
    }

    #[test]
    fn test_image_shape() {
        let mut attr = Attr::default();
        attr.set("width", "5cm");

        let node = image(&attr, text_inlines("alt"), "images/a.svg", "");

        assert_eq!(
            node,
            json!({"t": "Image", "c": [
                ["", [], [["width", "5cm"]]],
                [{"t": "Str", "c": "alt"}],
                ["images/a.svg", ""],
            ]})
        );
    }

    #[test]
    fn test_figure_shape() {
        let attr = Attr {
            identifier: "fig-a".to_owned(),
            ..Attr::default()
        };
        let body = vec![plain(vec![json!({"t": "Str", "c": "x"})])];

        let node = figure(&attr, text_inlines("Cap"), body.clone());

        assert_eq!(
            node,
            json!({"t": "Figure", "c": [
                ["fig-a", [], []],
                [null, [{"t": "Plain", "c": [{"t": "Str", "c": "Cap"}]}]],
                body,
            ]})
        );
    }

    #[test]
    fn test_raw_block_shape() {
        assert_eq!(
            raw_block("html", "<svg/>"),
            json!({"t": "RawBlock", "c": ["html", "<svg/>"]})
        );
    }
}
