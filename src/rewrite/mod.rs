//! Tree-to-tree rewriters.
//!
//! A rewriter inspects a tree and describes its changes as text edits; the
//! rewritten tree is a fresh parse of the edited text with the same origin and
//! parse options. The input tree is never touched, and a rewriter with nothing
//! to change hands back the input tree itself.

pub mod console;
pub mod terminators;

pub use console::ConsoleRewriter;
pub use terminators::MissingTerminatorRewriter;

use crate::error::Result;
use crate::syntax::{SyntaxTree, TextEdit};

pub trait SyntaxRewriter {
    /// Edits that turn `tree` into the rewritten tree.
    fn edits(&self, tree: &SyntaxTree) -> Result<Vec<TextEdit>>;

    fn rewrite(&self, tree: &SyntaxTree) -> Result<SyntaxTree> {
        let edits = self.edits(tree)?;
        tree.with_edits(edits)
    }
}
