//! Whole-document access.

use std::io::{Read, Write};

use serde_json::{Map, Value};

use crate::PandocError;
use crate::meta::meta_to_plain;
use crate::walk::{CodeBlockFilter, walk};

/// First pandoc API version with a `Figure` block element.
const FIGURE_API: (u64, u64) = (1, 23);

/// A pandoc document in JSON form.
///
/// Only `pandoc-api-version`, `meta` and `blocks` are interpreted; the rest of
/// the object is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
}

impl Document {
    /// Parse a document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PandocError::Json`] for malformed JSON and
    /// [`PandocError::InvalidDocument`] when the value is not a document.
    pub fn from_json(json: &str) -> Result<Self, PandocError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Read a document from a JSON stream (typically stdin).
    ///
    /// # Errors
    ///
    /// See [`Document::from_json`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PandocError> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// Wrap an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`PandocError::InvalidDocument`] unless `value` is an object
    /// with a `blocks` array.
    pub fn from_value(value: Value) -> Result<Self, PandocError> {
        let Value::Object(root) = value else {
            return Err(PandocError::InvalidDocument("expected a JSON object"));
        };
        if !root.get("blocks").is_some_and(Value::is_array) {
            return Err(PandocError::InvalidDocument("missing `blocks` array"));
        }
        Ok(Self { root })
    }

    /// Write the document as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PandocError::Json`] if writing fails.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), PandocError> {
        serde_json::to_writer(writer, &self.root)?;
        Ok(())
    }

    /// Consume the document, returning its JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// `pandoc-api-version` as a list of components (empty when absent).
    #[must_use]
    pub fn api_version(&self) -> Vec<u64> {
        self.root
            .get("pandoc-api-version")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    }

    /// Whether the document's API knows the `Figure` block.
    ///
    /// Documents without a version are assumed to come from a current pandoc.
    #[must_use]
    pub fn supports_figures(&self) -> bool {
        match self.api_version().as_slice() {
            [] => true,
            [major] => *major > FIGURE_API.0,
            [major, minor, ..] => (*major, *minor) >= FIGURE_API,
        }
    }

    /// Metadata value under `key`, flattened to plain JSON.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<Value> {
        self.root
            .get("meta")
            .and_then(|meta| meta.get(key))
            .map(meta_to_plain)
    }

    /// Number of top-level blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.root
            .get("blocks")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Top-level blocks.
    #[must_use]
    pub fn blocks(&self) -> &[Value] {
        self.root
            .get("blocks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Apply `filter` to every code block, in document order.
    ///
    /// Returns the number of blocks replaced or removed.
    pub fn filter_code_blocks<F: CodeBlockFilter + ?Sized>(&mut self, filter: &mut F) -> usize {
        self.root
            .get_mut("blocks")
            .map_or(0, |blocks| walk(blocks, filter))
    }
}
