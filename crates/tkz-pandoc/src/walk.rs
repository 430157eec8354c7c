//! Code block rewriting.

use serde_json::Value;

use crate::ast::CodeBlock;

/// What to do with a visited code block.
///
/// `Keep` and `Remove` are distinct on purpose: a filter that declines a block
/// must leave it untouched, not erase it.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterAction {
    /// Leave the original block in place.
    Keep,
    /// Substitute the given block element.
    Replace(Value),
    /// Delete the block from the document.
    Remove,
}

/// Callback invoked for every code block of a document, in document order.
pub trait CodeBlockFilter {
    /// Decide what happens to `block`.
    fn filter(&mut self, block: &CodeBlock) -> FilterAction;
}

impl<F: FnMut(&CodeBlock) -> FilterAction> CodeBlockFilter for F {
    fn filter(&mut self, block: &CodeBlock) -> FilterAction {
        self(block)
    }
}

/// Walk `value` depth-first, applying `filter` to every code block.
///
/// Replacement blocks are not walked again. Returns the number of blocks that
/// were replaced or removed.
pub(crate) fn walk<F: CodeBlockFilter + ?Sized>(value: &mut Value, filter: &mut F) -> usize {
    match value {
        Value::Array(items) => {
            let mut changed = 0;
            let mut result = Vec::with_capacity(items.len());
            for mut item in items.drain(..) {
                let Some(block) = CodeBlock::from_value(&item) else {
                    changed += walk(&mut item, filter);
                    result.push(item);
                    continue;
                };
                match filter.filter(&block) {
                    FilterAction::Keep => result.push(item),
                    FilterAction::Replace(replacement) => {
                        changed += 1;
                        result.push(replacement);
                    }
                    FilterAction::Remove => changed += 1,
                }
            }
            *items = result;
            changed
        }
        Value::Object(map) => map.values_mut().map(|v| walk(v, filter)).sum(),
        _ => 0,
    }
}
