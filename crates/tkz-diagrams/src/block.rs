//! Diagram blocks recognized in the document.

use tkz_pandoc::CodeBlock;

use crate::consts::MARKER_CLASS;

/// A code block marked as TikZ source.
///
/// Borrows from the visited [`CodeBlock`]; never outlives the visit.
#[derive(Debug, Clone, Copy)]
pub struct DiagramBlock<'a> {
    /// Diagram source, including directive comments.
    pub source: &'a str,
    /// Block identifier (empty when absent).
    pub identifier: &'a str,
    /// Class list, marker included.
    pub classes: &'a [String],
    /// Host-syntax attributes in declaration order.
    pub attributes: &'a [(String, String)],
}

impl<'a> DiagramBlock<'a> {
    /// View `block` as a diagram block.
    ///
    /// Returns `None` unless the block carries the `tikz` class and has
    /// non-blank text.
    #[must_use]
    pub fn from_code_block(block: &'a CodeBlock) -> Option<Self> {
        if !block.attr.has_class(MARKER_CLASS) || block.text.trim().is_empty() {
            return None;
        }
        Some(Self {
            source: &block.text,
            identifier: &block.attr.identifier,
            classes: &block.attr.classes,
            attributes: &block.attr.attributes,
        })
    }

    /// Classes other than the marker, carried over to the output node.
    pub fn extra_classes(&self) -> impl Iterator<Item = &'a str> {
        self.classes
            .iter()
            .map(String::as_str)
            .filter(|class| *class != MARKER_CLASS)
    }
}
