//! Directive comments embedded in diagram source.
//!
//! Lines starting with `%|` carry options without touching the host
//! document's block syntax. Their remainders form a small YAML document:
//!
//! ```text
//! %| caption: Data flow
//! %| format: svg
//! %| libraries: [arrows.meta, positioning]
//! %| fig-attr:
//! %|   id: fig-flow
//! %|   align: center
//! \node (A) at (0,0) {A};
//! ```
//!
//! Values are scalars, lists of scalars, or (for `fig-attr`) one level of
//! `key: scalar` mapping. Anything nested deeper is rejected.

use serde_yaml::Value;

use crate::consts::DIRECTIVE_PREFIX;
use crate::error::DiagramError;
use crate::options::{PartialOptions, RawValue};

/// Options found in directive comments, plus the remaining source.
#[derive(Debug, Default)]
pub(crate) struct Directives {
    pub options: PartialOptions,
    pub body: String,
}

/// Key used in errors about the directive block as a whole.
const DIRECTIVE_KEY: &str = "%|";

/// Split `source` into directive options and diagram body.
pub(crate) fn parse(source: &str, warnings: &mut Vec<String>) -> Result<Directives, DiagramError> {
    let mut yaml = Vec::new();
    let mut body = Vec::new();
    for line in source.lines() {
        match line.trim_start().strip_prefix(DIRECTIVE_PREFIX) {
            Some(rest) => yaml.push(rest.strip_prefix(' ').unwrap_or(rest)),
            None => body.push(line),
        }
    }

    if yaml.is_empty() {
        return Ok(Directives {
            options: PartialOptions::default(),
            body: source.to_owned(),
        });
    }

    let document: Value = serde_yaml::from_str(&yaml.join("\n"))
        .map_err(|e| DiagramError::invalid(DIRECTIVE_KEY, format!("malformed directives: {e}")))?;

    let mut options = PartialOptions::default();
    match document {
        Value::Null => {}
        Value::Mapping(map) => {
            for (key, value) in map {
                let key = scalar_string(&key).ok_or_else(|| {
                    DiagramError::invalid(DIRECTIVE_KEY, "directive keys must be scalars")
                })?;
                if let Some(value) = raw_value(&key, &value)? {
                    options.set(&key, value, warnings)?;
                }
            }
        }
        _ => {
            return Err(DiagramError::invalid(
                DIRECTIVE_KEY,
                "directives must be `key: value` lines",
            ));
        }
    }

    Ok(Directives {
        options,
        body: body.join("\n"),
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert a YAML value into an option value, one level deep at most.
///
/// `null` values yield `None` and leave the option unset.
fn raw_value(key: &str, value: &Value) -> Result<Option<RawValue>, DiagramError> {
    let too_deep = || DiagramError::invalid(key, "nested too deeply");
    match value {
        Value::Null => Ok(None),
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_string(item).ok_or_else(too_deep))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Some(RawValue::List(items))),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| match (scalar_string(k), scalar_string(v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(too_deep()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|pairs| Some(RawValue::Map(pairs))),
        Value::Tagged(tagged) => raw_value(key, &tagged.value),
        scalar => Ok(scalar_string(scalar).map(RawValue::Scalar)),
    }
}
