//! Console-redirect rewriting: calls that bind to `System.Console.Write` or
//! `WriteLine` are sent to the script's output buffer instead.

use super::SyntaxRewriter;
use crate::compilation::{SemanticModel, Symbol};
use crate::error::{Error, Result};
use crate::syntax::ast::{Expr, ExprKind};
use crate::syntax::walk::{walk_expr, walk_unit, Visitor};
use crate::syntax::{SyntaxTree, TextEdit};

const CONSOLE_TYPE: &str = "System.Console";
const OUTPUT_METHODS: &[&str] = &["Write", "WriteLine"];

/// Replaces the receiver of each console output call with `field`. The
/// arguments and the shape of the call are kept.
pub struct ConsoleRewriter<'m> {
    model: &'m SemanticModel,
    field: String,
}

impl<'m> ConsoleRewriter<'m> {
    pub fn new(model: &'m SemanticModel, field: impl Into<String>) -> Self {
        Self {
            model,
            field: field.into(),
        }
    }

    fn is_console_output(&self, call: &Expr) -> bool {
        match self.model.symbol_info(call) {
            Some(Symbol::Method(method)) => {
                method.is_host()
                    && method.is_static
                    && method.containing_type == CONSOLE_TYPE
                    && OUTPUT_METHODS.contains(&method.name.as_str())
            }
            _ => false,
        }
    }
}

struct Redirect<'r, 'm> {
    rewriter: &'r ConsoleRewriter<'m>,
    edits: Vec<TextEdit>,
}

impl Visitor for Redirect<'_, '_> {
    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Invocation { target, .. } = &expr.kind {
            if let ExprKind::MemberAccess { target: receiver, .. } = &target.kind {
                if self.rewriter.is_console_output(expr) {
                    self.edits.push(TextEdit::replace(receiver.span, self.rewriter.field.clone()));
                }
            }
        }
        walk_expr(self, expr);
    }
}

impl SyntaxRewriter for ConsoleRewriter<'_> {
    fn edits(&self, tree: &SyntaxTree) -> Result<Vec<TextEdit>> {
        if !self.model.tree().ptr_eq(tree) {
            return Err(Error::invalid_argument(
                "tree",
                format!("semantic model was built for '{}', not this tree", self.model.tree().origin()),
            ));
        }
        let mut redirect = Redirect {
            rewriter: self,
            edits: Vec::new(),
        };
        walk_unit(&mut redirect, tree.root());
        Ok(redirect.edits)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::compilation::{Compilation, CompilationOptions, MetadataReference, OutputKind};
    use crate::host::{FixedModules, ModuleLister};
    use crate::syntax::{ParseOptions, SourceKind};

    const BUFFER: &str = "public static readonly StringWriter __Console = new StringWriter();";

    fn compilation(editor: &str) -> (Compilation, SyntaxTree) {
        let buffer = SyntaxTree::parse(BUFFER, "", ParseOptions::new(SourceKind::Script)).unwrap();
        let tree = SyntaxTree::parse(editor, "Editor", ParseOptions::new(SourceKind::Script)).unwrap();
        let references: Vec<_> = FixedModules::core()
            .loaded_modules()
            .into_iter()
            .filter_map(MetadataReference::from_module)
            .collect();
        let options = CompilationOptions::new(OutputKind::DynamicallyLinkedLibrary)
            .with_usings(vec!["System".into(), "System.IO".into()]);
        let c = Compilation::create("Test", options, vec![tree.clone(), buffer], references).unwrap();
        (c, tree)
    }

    fn redirect(editor: &str) -> (Compilation, SyntaxTree, SyntaxTree) {
        let (c, tree) = compilation(editor);
        let model = c.semantic_model(&tree).unwrap();
        let rewritten = ConsoleRewriter::new(&model, "__Console").rewrite(&tree).unwrap();
        (c, tree, rewritten)
    }

    #[test]
    fn redirects_console_calls() {
        let (_, _, out) = redirect("static void F() { Console.WriteLine(\"hi\"); Console.Write(1); }");
        assert_eq!(
            out.text(),
            "static void F() { __Console.WriteLine(\"hi\"); __Console.Write(1); }"
        );
    }

    #[test]
    fn redirects_qualified_calls() {
        let (_, _, out) = redirect("static void F() { System.Console.WriteLine(\"{0}\", 2); }");
        assert_eq!(out.text(), "static void F() { __Console.WriteLine(\"{0}\", 2); }");
    }

    #[test]
    fn redirects_nested_calls() {
        let (_, _, out) = redirect("static void F() { Console.WriteLine(G()); } static string G() { Console.Write(0); return \"\"; }");
        assert!(out.text().contains("__Console.WriteLine"));
        assert!(out.text().contains("__Console.Write(0)"));
    }

    #[test]
    fn leaves_other_console_members() {
        let src = "static string F() { return Console.ReadLine(); }";
        let (_, tree, out) = redirect(src);
        assert!(out.ptr_eq(&tree));
    }

    #[test]
    fn leaves_user_defined_console() {
        let src = "class Console { public static void WriteLine(string s) { } }\nstatic void F() { Console.WriteLine(\"x\"); }";
        let (_, tree, out) = redirect(src);
        assert!(out.ptr_eq(&tree));
    }

    #[test]
    fn leaves_same_named_user_methods() {
        let src = "static void WriteLine(string s) { }\nstatic void F() { WriteLine(\"x\"); }";
        let (_, tree, out) = redirect(src);
        assert!(out.ptr_eq(&tree));
    }

    #[test]
    fn rewritten_tree_binds_to_buffer() {
        let (c, tree, out) = redirect("static void F() { Console.WriteLine(\"hi\"); }");
        let replaced = c.replace_syntax_tree(&tree, out).unwrap();
        assert!(replaced.diagnostics().is_empty(), "{:?}", replaced.diagnostics());
    }

    #[test]
    fn model_for_other_tree_rejected() {
        let (c, tree) = compilation("static void F() { }");
        let model = c.semantic_model(&tree).unwrap();
        let other = SyntaxTree::parse("static void F() { }", "Editor", ParseOptions::new(SourceKind::Script)).unwrap();
        let err = ConsoleRewriter::new(&model, "__Console").rewrite(&other).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
