//! Lexer, tolerant parser and immutable syntax trees for the host grammar.

#[allow(
    clippy::wildcard_imports,
    clippy::module_name_repetitions,
)]
pub mod ast;
#[allow(clippy::module_name_repetitions)]
pub mod diagnostic;
#[allow(
    clippy::indexing_slicing,
    clippy::single_match_else,
    clippy::module_name_repetitions,
)]
pub mod lexer;
#[allow(
    clippy::indexing_slicing,
    clippy::wildcard_imports,
    clippy::single_match_else,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
)]
pub mod parser;
pub mod tree;
#[allow(clippy::wildcard_imports)]
pub mod walk;

pub use ast::{Span, Terminator, TerminatorKind};
pub use diagnostic::{Diagnostic, DiagnosticKind, LocatedDiagnostic, Severity};
pub use tree::{ParseOptions, SourceKind, SyntaxTree, TextEdit};
