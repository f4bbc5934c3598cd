//! Dynamic script compilation.
//!
//! A [`Post`] carries a script body and optional supporting classes. The
//! [`ScriptCompiler`] wraps the body in an `Eval` method, parses every
//! fragment, repairs missing terminators, compiles once to resolve
//! `Console.Write`/`WriteLine` calls, redirects them to an in-memory buffer
//! and hands back the rewritten [`Compilation`].

pub mod compilation;
pub mod error;
pub mod host;
pub mod paths;
pub mod post;
pub mod provider;
pub mod rewrite;
pub mod settings;
pub mod synth;
pub mod syntax;

pub use compilation::{Compilation, CompilationOptions, MetadataReference, OutputKind, SemanticModel};
pub use error::{Error, Result};
pub use post::Post;
pub use provider::{CompilationProvider, ScriptCompiler};
pub use settings::CompilerSettings;
pub use syntax::{LocatedDiagnostic, SyntaxTree};
