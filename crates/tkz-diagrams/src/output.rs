//! Replacement node construction.
//!
//! | Caption | Payload        | Pandoc ≥ 3 (`Figure`)            | Older pandoc                       |
//! |---------|----------------|----------------------------------|------------------------------------|
//! | no      | link / inline  | `Para [Image]`                   | `Para [Image]`                     |
//! | no      | raw            | `RawBlock html`                  | `RawBlock html`                    |
//! | yes     | link / inline  | `Figure [Plain [Image]]`         | `Para [Image]` titled `fig:`       |
//! | yes     | raw            | `Figure [RawBlock html]`         | `RawBlock html` `<figure>`         |
//!
//! With a caption, the block identifier, extra classes and `fig-*` attributes
//! go on the figure; without one they go on the image.

use serde_json::Value;
use tkz_pandoc::{Attr, node};

use crate::block::DiagramBlock;
use crate::embed::{Payload, escape_attribute, set_svg_attribute};
use crate::options::EffectiveOptions;

/// Title marking an implicit figure in pre-`Figure` pandoc.
const IMPLICIT_FIGURE_TITLE: &str = "fig:";

/// Build the block that replaces `block`.
#[must_use]
pub fn build_node(
    payload: &Payload,
    options: &EffectiveOptions,
    block: &DiagramBlock<'_>,
    figures: bool,
) -> Value {
    let caption = options.caption.as_deref();

    let mut outer = Attr {
        identifier: block.identifier.to_owned(),
        classes: block.extra_classes().map(str::to_owned).collect(),
        attributes: Vec::new(),
    };
    let mut image = Attr::default();
    if caption.is_some() {
        apply_pairs(&mut outer, &options.figure_attrs);
    } else {
        image = std::mem::take(&mut outer);
    }
    apply_pairs(&mut image, &options.image_attrs);
    if let Some(width) = &options.width {
        image.set("width", width.as_str());
    }
    if let Some(height) = &options.height {
        image.set("height", height.as_str());
    }

    let alt = node::text_inlines(options.alt.as_deref().or(caption).unwrap_or_default());

    match (payload, caption) {
        (Payload::Link(url) | Payload::DataUri(url), None) => {
            node::para(vec![node::image(&image, alt, url, "")])
        }
        (Payload::Link(url) | Payload::DataUri(url), Some(caption)) => {
            if figures {
                node::figure(
                    &outer,
                    node::text_inlines(caption),
                    vec![node::plain(vec![node::image(&image, alt, url, "")])],
                )
            } else {
                merge_into(&mut image, outer);
                node::para(vec![node::image(
                    &image,
                    node::text_inlines(caption),
                    url,
                    IMPLICIT_FIGURE_TITLE,
                )])
            }
        }
        (Payload::Raw(svg), None) => node::raw_block("html", &svg_with_attrs(svg, &image)),
        (Payload::Raw(svg), Some(caption)) => {
            let svg = svg_with_attrs(svg, &image);
            if figures {
                node::figure(
                    &outer,
                    node::text_inlines(caption),
                    vec![node::raw_block("html", &svg)],
                )
            } else {
                node::raw_block("html", &html_figure(&outer, &svg, caption))
            }
        }
    }
}

/// Route `id` and `class` keys to their dedicated slots.
fn apply_pairs(attr: &mut Attr, pairs: &[(String, String)]) {
    for (key, value) in pairs {
        match key.as_str() {
            "id" => attr.identifier.clone_from(value),
            "class" => attr
                .classes
                .extend(value.split_whitespace().map(str::to_owned)),
            _ => attr.set(key.as_str(), value.as_str()),
        }
    }
}

/// Fold figure-level attributes into the image (implicit figures have no
/// separate figure element).
fn merge_into(image: &mut Attr, figure: Attr) {
    if !figure.identifier.is_empty() {
        image.identifier = figure.identifier;
    }
    image.classes.extend(figure.classes);
    for (key, value) in figure.attributes {
        if image.get(&key).is_none() {
            image.attributes.push((key, value));
        }
    }
}

fn svg_with_attrs(svg: &str, attr: &Attr) -> String {
    let mut svg = svg.to_owned();
    if !attr.identifier.is_empty() {
        svg = set_svg_attribute(&svg, "id", &attr.identifier);
    }
    if !attr.classes.is_empty() {
        svg = set_svg_attribute(&svg, "class", &attr.classes.join(" "));
    }
    for (key, value) in &attr.attributes {
        svg = set_svg_attribute(&svg, key, value);
    }
    svg
}

fn html_figure(attr: &Attr, svg: &str, caption: &str) -> String {
    let mut open = String::from("<figure");
    if !attr.identifier.is_empty() {
        open.push_str(&format!(r#" id="{}""#, escape_attribute(&attr.identifier)));
    }
    if !attr.classes.is_empty() {
        open.push_str(&format!(r#" class="{}""#, escape_attribute(&attr.classes.join(" "))));
    }
    for (key, value) in &attr.attributes {
        open.push_str(&format!(r#" {key}="{}""#, escape_attribute(value)));
    }
    format!(
        "{open}>\n{svg}\n<figcaption>{}</figcaption>\n</figure>",
        escape_attribute(caption)
    )
}
