//! Typed views of the AST elements the filter inspects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Element attributes: identifier, classes and key/value pairs.
///
/// Serialized in pandoc's positional form `[id, [classes], [[k, v], ...]]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    /// Element identifier (empty when absent).
    pub identifier: String,
    /// Class list.
    pub classes: Vec<String>,
    /// Key/value pairs in document order.
    pub attributes: Vec<(String, String)>,
}

#[derive(Serialize, Deserialize)]
struct AttrRepr(String, Vec<String>, Vec<(String, String)>);

impl From<AttrRepr> for Attr {
    fn from(AttrRepr(identifier, classes, attributes): AttrRepr) -> Self {
        Self {
            identifier,
            classes,
            attributes,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        Self(attr.identifier, attr.classes, attr.attributes)
    }
}

impl Attr {
    /// Whether `class` is in the class list.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Value of the first attribute named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Positional JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::String(self.identifier.clone()),
            self.classes.iter().cloned().map(Value::String).collect(),
            self.attributes
                .iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())]))
                .collect(),
        ])
    }
}

/// A `CodeBlock` element: attributes plus verbatim text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeBlock {
    /// Attributes declared on the fence.
    pub attr: Attr,
    /// Block contents.
    pub text: String,
}

impl CodeBlock {
    /// Element tag in the JSON AST.
    pub const TAG: &'static str = "CodeBlock";

    /// Parse a `CodeBlock` element.
    ///
    /// Returns `None` for any other element or a malformed payload.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.get("t")?.as_str()? != Self::TAG {
            return None;
        }
        let (attr, text) = <(Attr, String)>::deserialize(object.get("c")?).ok()?;
        Some(Self { attr, text })
    }

    /// Serialize back into a JSON element.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "t": Self::TAG,
            "c": [self.attr.to_value(), self.text],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_code_block() {
        let value = json!({
            "t": "CodeBlock",
            "c": [["fig-a", ["tikz", "wide"], [["format", "pdf"]]], "\\draw (0,0) -- (1,1);"]
        });

        let block = CodeBlock::from_value(&value).unwrap();

        assert_eq!(block.attr.identifier, "fig-a");
        assert_eq!(block.attr.classes, vec!["tikz".to_owned(), "wide".to_owned()]);
        assert_eq!(block.attr.get("format"), Some("pdf"));
        assert_eq!(block.text, "\\draw (0,0) -- (1,1);");
        assert_eq!(block.to_value(), value);
    }

    #[test]
    fn test_parse_rejects_other_elements() {
        assert!(CodeBlock::from_value(&json!({"t": "Para", "c": []})).is_none());
        assert!(CodeBlock::from_value(&json!({"t": "CodeBlock", "c": "oops"})).is_none());
        assert!(CodeBlock::from_value(&json!("CodeBlock")).is_none());
    }

    #[test]
    fn test_attr_serde_roundtrip_is_positional() {
        let attr = Attr {
            identifier: "x".to_owned(),
            classes: vec!["a".to_owned()],
            attributes: vec![("k".to_owned(), "v".to_owned())],
        };

        let value = serde_json::to_value(&attr).unwrap();

        assert_eq!(value, json!(["x", ["a"], [["k", "v"]]]));
        assert_eq!(value, attr.to_value());
    }

    #[test]
    fn test_attr_set_replaces_in_place() {
        let mut attr = Attr::default();
        attr.set("width", "10cm");
        attr.set("height", "5cm");
        attr.set("width", "12cm");

        assert_eq!(
            attr.attributes,
            vec![
                ("width".to_owned(), "12cm".to_owned()),
                ("height".to_owned(), "5cm".to_owned()),
            ]
        );
    }
}
