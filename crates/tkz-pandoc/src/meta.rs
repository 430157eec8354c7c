//! Metadata flattening.
//!
//! Pandoc wraps every metadata value in a tagged node (`MetaMap`,
//! `MetaInlines`, ...). Configuration readers want plain JSON, so maps and
//! lists are unwrapped recursively and inline/block content is stringified.

use serde_json::{Map, Value};

/// Convert a pandoc `MetaValue` into plain JSON.
///
/// `MetaBool` becomes a boolean, `MetaString`, `MetaInlines` and `MetaBlocks`
/// become strings, `MetaMap` and `MetaList` recurse. Values that are already
/// plain JSON pass through unchanged.
#[must_use]
pub fn meta_to_plain(value: &Value) -> Value {
    let Some((tag, content)) = tagged(value) else {
        return value.clone();
    };
    match (tag, content) {
        ("MetaMap", Some(Value::Object(map))) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), meta_to_plain(v)))
                .collect::<Map<_, _>>(),
        ),
        ("MetaList", Some(Value::Array(items))) => {
            Value::Array(items.iter().map(meta_to_plain).collect())
        }
        ("MetaBool", Some(Value::Bool(b))) => Value::Bool(*b),
        ("MetaString", Some(Value::String(s))) => Value::String(s.clone()),
        ("MetaInlines", Some(Value::Array(inlines))) => Value::String(stringify_inlines(inlines)),
        ("MetaBlocks", Some(Value::Array(blocks))) => Value::String(
            blocks
                .iter()
                .map(stringify_block)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => Value::Null,
    }
}

fn tagged(value: &Value) -> Option<(&str, Option<&Value>)> {
    let object = value.as_object()?;
    let tag = object.get("t")?.as_str()?;
    Some((tag, object.get("c")))
}

/// Plain text of an inline list, in the manner of pandoc's `stringify`.
pub(crate) fn stringify_inlines(inlines: &[Value]) -> String {
    let mut out = String::new();
    for inline in inlines {
        push_inline(&mut out, inline);
    }
    out
}

fn push_inline(out: &mut String, inline: &Value) {
    let Some((tag, content)) = tagged(inline) else {
        return;
    };
    match tag {
        "Str" => {
            if let Some(text) = content.and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        "Space" | "SoftBreak" => out.push(' '),
        "LineBreak" => out.push('\n'),
        // [attr or format, text]
        "Code" | "Math" | "RawInline" => {
            if let Some(text) = content.and_then(|c| c.get(1)).and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        "Emph" | "Strong" | "Underline" | "Strikeout" | "Superscript" | "Subscript"
        | "SmallCaps" => {
            if let Some(Value::Array(children)) = content {
                out.push_str(&stringify_inlines(children));
            }
        }
        "Quoted" => {
            let quote = match content.and_then(|c| c.get(0)).and_then(|q| q.get("t")) {
                Some(Value::String(kind)) if kind == "SingleQuote" => '\'',
                _ => '"',
            };
            if let Some(Value::Array(children)) = content.and_then(|c| c.get(1)) {
                out.push(quote);
                out.push_str(&stringify_inlines(children));
                out.push(quote);
            }
        }
        // [attr, inlines] / [citations, inlines] / [attr, inlines, target]
        "Span" | "Cite" | "Link" | "Image" => {
            if let Some(Value::Array(children)) = content.and_then(|c| c.get(1)) {
                out.push_str(&stringify_inlines(children));
            }
        }
        _ => {}
    }
}

fn stringify_block(block: &Value) -> String {
    match tagged(block) {
        Some(("Plain" | "Para", Some(Value::Array(inlines)))) => stringify_inlines(inlines),
        Some(("CodeBlock" | "RawBlock", Some(content))) => content
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        Some(("LineBlock", Some(Value::Array(lines)))) => lines
            .iter()
            .filter_map(Value::as_array)
            .map(|line| stringify_inlines(line))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
