//! Pandoc JSON AST access for tkz.
//!
//! Pandoc filters receive the document as JSON on stdin and return it on
//! stdout. This crate provides the small slice of the AST the diagram filter
//! needs:
//!
//! - [`Document`]: the whole document, with flattened metadata access
//! - [`CodeBlockFilter`]: a callback invoked for every code block, answering
//!   with a [`FilterAction`]
//! - [`Attr`] and the node builders in [`node`] for constructing replacements
//! - [`TargetFormat`]: the writer name pandoc passes to the filter
//!
//! Everything outside code blocks passes through as untouched JSON values, so
//! documents produced by newer pandoc versions round-trip unchanged.
//!
//! # Example
//!
//! ```
//! use tkz_pandoc::{CodeBlock, CodeBlockFilter, Document, FilterAction};
//!
//! struct DropShell;
//!
//! impl CodeBlockFilter for DropShell {
//!     fn filter(&mut self, block: &CodeBlock) -> FilterAction {
//!         if block.attr.has_class("sh") {
//!             FilterAction::Remove
//!         } else {
//!             FilterAction::Keep
//!         }
//!     }
//! }
//!
//! let json = r#"{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[
//!     {"t":"CodeBlock","c":[["",["sh"],[]],"rm -rf /"]}]}"#;
//! let mut doc = Document::from_json(json).unwrap();
//! doc.filter_code_blocks(&mut DropShell);
//! assert_eq!(doc.block_count(), 0);
//! ```

mod ast;
mod document;
mod format;
mod meta;
pub mod node;
mod walk;

pub use ast::{Attr, CodeBlock};
pub use document::Document;
pub use format::TargetFormat;
pub use meta::meta_to_plain;
pub use walk::{CodeBlockFilter, FilterAction};

/// Error reading or writing a pandoc document.
#[derive(Debug, thiserror::Error)]
pub enum PandocError {
    /// Malformed JSON or I/O failure on the JSON stream.
    #[error("pandoc JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Valid JSON that is not a pandoc document.
    #[error("not a pandoc document: {0}")]
    InvalidDocument(&'static str),
}
