//! Tolerant-parse repair: insert the `;` the parser recorded as missing.

use super::SyntaxRewriter;
use crate::error::Result;
use crate::syntax::walk::{walk_unit, Visitor};
use crate::syntax::{SyntaxTree, Terminator, TerminatorKind, TextEdit};

/// Inserts every missing `;`. Other syntax errors, including missing `)` and
/// `}`, are left for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingTerminatorRewriter;

struct MissingSemicolons(Vec<TextEdit>);

impl Visitor for MissingSemicolons {
    fn visit_terminator(&mut self, terminator: &Terminator) {
        if terminator.missing && terminator.kind == TerminatorKind::Semicolon {
            self.0.push(TextEdit::insert(terminator.span.start, TerminatorKind::Semicolon.text()));
        }
    }
}

impl SyntaxRewriter for MissingTerminatorRewriter {
    fn edits(&self, tree: &SyntaxTree) -> Result<Vec<TextEdit>> {
        let mut found = MissingSemicolons(Vec::new());
        walk_unit(&mut found, tree.root());
        Ok(found.0)
    }
}
