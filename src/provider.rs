//! The compile pipeline: synthesize, parse, repair, compile, redirect
//! console output, recompile.

use crate::compilation::{Compilation, CompilationOptions, MetadataReference, OutputKind};
use crate::error::{Error, Result};
use crate::host::{ModuleLister, ProcessModules};
use crate::post::Post;
use crate::rewrite::{ConsoleRewriter, MissingTerminatorRewriter, SyntaxRewriter};
use crate::settings::CompilerSettings;
use crate::synth::synthesize;
use crate::syntax::{ParseOptions, SourceKind, SyntaxTree};

/// Namespaces imported into every compilation unless settings say otherwise.
pub const DEFAULT_NAMESPACES: &[&str] = &[
    "System",
    "System.IO",
    "System.Net",
    "System.Linq",
    "System.Text",
    "System.Text.RegularExpressions",
    "System.Collections.Generic",
];

/// Output buffer console calls are redirected to.
pub const CONSOLE_FIELD: &str = "__Console";

pub const PROMPT_ORIGIN: &str = "Prompt";
pub const EDITOR_ORIGIN: &str = "Editor";

/// Runs the script and keeps its result.
pub const ENTRY_POINT: &str = "public class EntryPoint
{
    public static object Result { get; set; }

    public static void Main()
    {
        Result = Script.Eval();
    }
}
";

/// The output buffer declaration for `field`.
pub fn console_declaration(field: &str) -> String {
    format!("public static readonly StringWriter {field} = new StringWriter();")
}

pub trait CompilationProvider {
    /// Compile a post into a compilation whose console output goes to the
    /// buffer. Fails only when `post` is missing or a fragment cannot be
    /// parsed at all; script mistakes are diagnostics on the result.
    fn compile(&self, post: Option<&Post>) -> Result<Compilation>;

    /// A console application from `trees` against the current references.
    fn assemble(&self, name: &str, trees: Vec<SyntaxTree>) -> Result<Compilation>;
}

/// The standard [`CompilationProvider`], referencing whatever modules `L`
/// reports at the time of each request.
#[derive(Debug, Clone, Default)]
pub struct ScriptCompiler<L: ModuleLister = ProcessModules> {
    modules: L,
    settings: CompilerSettings,
}

impl ScriptCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: ModuleLister> ScriptCompiler<L> {
    pub fn with_modules(modules: L) -> Self {
        Self {
            modules,
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Referenceable modules loaded right now. Collected fresh on every call.
    pub fn references(&self) -> Vec<MetadataReference> {
        self.modules
            .loaded_modules()
            .into_iter()
            .filter_map(MetadataReference::from_module)
            .collect()
    }

    fn parse(&self, text: &str, origin: &str, kind: SourceKind) -> Result<SyntaxTree> {
        let options = ParseOptions::new(kind).with_max_depth(self.settings.max_nesting_depth);
        let tree = SyntaxTree::parse(text, origin, options)?;
        tracing::debug!(origin, kind = ?kind, diagnostics = tree.diagnostics().len(), "parsed fragment");
        Ok(tree)
    }

    /// Parse a user fragment and insert missing `;` if enabled.
    fn parse_user(&self, text: &str, origin: &str, kind: SourceKind) -> Result<SyntaxTree> {
        let tree = self.parse(text, origin, kind)?;
        if !self.settings.repair_missing_terminators {
            return Ok(tree);
        }
        let repaired = MissingTerminatorRewriter.rewrite(&tree)?;
        if !repaired.ptr_eq(&tree) {
            tracing::debug!(origin, "inserted missing terminators");
        }
        Ok(repaired)
    }

    fn redirect_console(&self, compilation: &Compilation, tree: &SyntaxTree) -> Result<SyntaxTree> {
        let model = compilation.semantic_model(tree)?;
        let rewritten = ConsoleRewriter::new(&model, self.settings.console_field.as_str()).rewrite(tree)?;
        if !rewritten.ptr_eq(tree) {
            tracing::debug!(origin = tree.origin(), "redirected console output");
        }
        Ok(rewritten)
    }
}

impl<L: ModuleLister> CompilationProvider for ScriptCompiler<L> {
    fn compile(&self, post: Option<&Post>) -> Result<Compilation> {
        let post = post.ok_or_else(|| Error::invalid_argument("post", "no post to compile"))?;

        let entry = self.parse(ENTRY_POINT, "", SourceKind::Regular)?;
        let prompt = self.parse_user(&synthesize(&post.content), PROMPT_ORIGIN, SourceKind::Interactive)?;
        let editor = self.parse_user(post.classes_text(), EDITOR_ORIGIN, SourceKind::Script)?;
        let console = self.parse(&console_declaration(&self.settings.console_field), "", SourceKind::Script)?;

        let first = self.assemble(
            post.compilation_name(),
            vec![entry, prompt.clone(), editor.clone(), console],
        )?;

        let new_prompt = self.redirect_console(&first, &prompt)?;
        let new_editor = self.redirect_console(&first, &editor)?;

        let compilation = first
            .replace_syntax_tree(&prompt, new_prompt)?
            .replace_syntax_tree(&editor, new_editor)?;
        tracing::info!(name = compilation.name(), "compiled post");
        Ok(compilation)
    }

    fn assemble(&self, name: &str, trees: Vec<SyntaxTree>) -> Result<Compilation> {
        let options = CompilationOptions::new(OutputKind::ConsoleApplication)
            .with_usings(self.settings.default_namespaces.clone());
        let references = self.references();
        tracing::debug!(name, trees = trees.len(), references = references.len(), "assembling compilation");
        Compilation::create(name, options, trees, references)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::compilation::Symbol;
    use crate::host::{corlib, FixedModules, HostModule, HostType};
    use crate::syntax::ast::{ExprKind, Member, MethodBody, StmtKind};
    use crate::syntax::DiagnosticKind;

    static NO_TYPES: &[HostType] = &[];

    fn compiler() -> ScriptCompiler<FixedModules> {
        ScriptCompiler::with_modules(FixedModules::core())
    }

    fn prompt_of(c: &Compilation) -> &SyntaxTree {
        &c.syntax_trees()[1]
    }

    fn editor_of(c: &Compilation) -> &SyntaxTree {
        &c.syntax_trees()[2]
    }

    #[test]
    fn four_trees_in_order() {
        let c = compiler().compile(Some(&Post::new("return 1;").with_title("t"))).unwrap();
        let origins: Vec<_> = c.syntax_trees().iter().map(SyntaxTree::origin).collect();
        assert_eq!(origins, vec!["", "Prompt", "Editor", ""]);
        assert_eq!(c.syntax_trees()[0].kind(), SourceKind::Regular);
        assert_eq!(c.syntax_trees()[1].kind(), SourceKind::Interactive);
        assert_eq!(c.syntax_trees()[2].kind(), SourceKind::Script);
        assert_eq!(c.syntax_trees()[3].kind(), SourceKind::Script);
        assert_eq!(c.options().output_kind, OutputKind::ConsoleApplication);
        assert_eq!(c.options().usings.len(), DEFAULT_NAMESPACES.len());
    }

    #[test]
    fn name_from_title_or_untitled() {
        let named = compiler().compile(Some(&Post::new("return 1;").with_title("t1"))).unwrap();
        assert_eq!(named.name(), "t1");
        let untitled = compiler().compile(Some(&Post::new("return 1;"))).unwrap();
        assert_eq!(untitled.name(), "Untitled");
        let blank = compiler().compile(Some(&Post::new("return 1;").with_title(""))).unwrap();
        assert_eq!(blank.name(), "Untitled");
    }

    #[test]
    fn missing_post_is_invalid_argument() {
        assert!(compiler().compile(None).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn empty_name_is_invalid_argument() {
        assert!(compiler().assemble("", Vec::new()).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn scenario_return_expression() {
        let c = compiler().compile(Some(&Post::new("return 1+1;").with_title("t1"))).unwrap();
        assert!(!c.has_errors(), "{:?}", c.diagnostics());

        let root = prompt_of(&c).root();
        let Some(Member::Method(eval)) = root.members.first() else {
            panic!("expected Eval, got {:?}", root.members);
        };
        assert_eq!(eval.name.name, "Eval");
        let MethodBody::Block(body) = &eval.body else {
            panic!("expected a block body");
        };
        let StmtKind::Return { value: Some(value), .. } = &body.stmts[0].kind else {
            panic!("expected a return");
        };
        assert!(matches!(value.kind, ExprKind::Binary { .. }));
        assert_eq!(prompt_of(&c).slice(value.span), "1+1");
    }

    #[test]
    fn scenario_console_call_is_repaired_and_redirected() {
        let c = compiler()
            .compile(Some(&Post::new("Console.WriteLine(\"hi\")").with_title("t2")))
            .unwrap();
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
        assert!(prompt_of(&c).text().contains("__Console.WriteLine(\"hi\");"));
        assert!(!prompt_of(&c).text().contains(" Console."));
    }

    #[test]
    fn scenario_helper_class() {
        let post = Post::new("return Helper.Two();").with_classes("class Helper { public static int Two() => 2; }");
        let c = compiler().compile(Some(&post)).unwrap();
        let binding: Vec<_> = c
            .diagnostics()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::Binding)
            .collect();
        assert!(binding.is_empty(), "{binding:?}");
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
    }

    #[test]
    fn editor_console_calls_redirected() {
        let post = Post::new("Helper.Say(); return null;")
            .with_classes("class Helper { public static void Say() { Console.Write(\"x\"); } }");
        let c = compiler().compile(Some(&post)).unwrap();
        assert!(editor_of(&c).text().contains("__Console.Write(\"x\")"));
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
    }

    #[test]
    fn user_write_line_left_alone() {
        let post = Post::new("Printer.WriteLine(\"x\"); return null;")
            .with_classes("class Printer { public static void WriteLine(string s) { } }");
        let c = compiler().compile(Some(&post)).unwrap();
        assert!(prompt_of(&c).text().contains("Printer.WriteLine(\"x\");"));
    }

    #[test]
    fn rewritten_prompt_binds_to_buffer() {
        let c = compiler()
            .compile(Some(&Post::new("Console.WriteLine(\"hi\");\nreturn 1;")))
            .unwrap();
        let model = c.semantic_model(prompt_of(&c)).unwrap();
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
        let root = prompt_of(&c).root();
        let Some(Member::Method(eval)) = root.members.first() else {
            panic!("expected Eval");
        };
        let MethodBody::Block(body) = &eval.body else {
            panic!("expected a block body");
        };
        let StmtKind::Expr { expr, .. } = &body.stmts[0].kind else {
            panic!("expected a call");
        };
        let Some(Symbol::Method(method)) = model.symbol_info(expr) else {
            panic!("expected a method symbol");
        };
        assert_eq!(method.containing_type, "System.IO.TextWriter");
        assert!(!method.is_static);
    }

    #[test]
    fn user_errors_are_diagnostics_with_user_lines() {
        let c = compiler().compile(Some(&Post::new("int a = 1;\nreturn missing;"))).unwrap();
        let diags = c.diagnostics();
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].origin, "Prompt");
        assert_eq!(diags[0].line, 2);
    }

    #[test]
    fn out_of_range_line_directive_is_diagnostic() {
        let post = Post::new("#line 18446744073709551615\nint a = 1;\nreturn missing;");
        let diags = compiler().compile(Some(&post)).unwrap().diagnostics();
        assert!(
            diags.iter().any(|d| d.message == "Invalid line number specified for #line directive"),
            "{diags:?}"
        );
        let unresolved = diags.iter().find(|d| d.kind == DiagnosticKind::Binding).unwrap();
        assert_eq!(unresolved.line, 3);
    }

    #[test]
    fn too_deep_nesting_is_parse_error() {
        let settings = CompilerSettings {
            max_nesting_depth: 16,
            ..CompilerSettings::default()
        };
        let content = format!("return {}1{};", "(".repeat(64), ")".repeat(64));
        let err = compiler()
            .with_settings(settings)
            .compile(Some(&Post::new(content)))
            .unwrap_err();
        assert!(matches!(err, Error::Parse { ref origin, .. } if origin == "Prompt"));
    }

    #[test]
    fn long_operator_chain_is_parse_error() {
        let content = format!("return 1{};", "+1".repeat(50_000));
        let err = compiler().compile(Some(&Post::new(content))).unwrap_err();
        assert!(matches!(err, Error::Parse { ref origin, .. } if origin == "Prompt"));
    }

    #[test]
    fn repair_can_be_disabled() {
        let settings = CompilerSettings {
            repair_missing_terminators: false,
            ..CompilerSettings::default()
        };
        let c = compiler()
            .with_settings(settings)
            .compile(Some(&Post::new("return 1")))
            .unwrap();
        assert!(c.has_errors());
        assert!(c.diagnostics().iter().any(|d| d.message == "';' expected"));
    }

    #[test]
    fn custom_console_field() {
        let settings = CompilerSettings {
            console_field: "__Out".into(),
            ..CompilerSettings::default()
        };
        let c = compiler()
            .with_settings(settings)
            .compile(Some(&Post::new("Console.Write(1); return null;")))
            .unwrap();
        assert!(prompt_of(&c).text().contains("__Out.Write(1);"));
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
    }

    #[test]
    fn references_exclude_dynamic_and_locationless() {
        let modules = FixedModules::new(vec![
            corlib::module(),
            HostModule::new("InMemory", NO_TYPES),
            HostModule::new("Generated", NO_TYPES).with_location("/tmp/gen.dll").into_dynamic(),
            HostModule::new("Empty", NO_TYPES).with_location(""),
            HostModule::new("OnDisk", NO_TYPES).with_location("/lib/on_disk.dll"),
        ]);
        let compiler = ScriptCompiler::with_modules(modules);
        let names: Vec<_> = compiler.references().iter().map(|r| r.module().name.clone()).collect();
        assert_eq!(names, vec![corlib::MODULE_NAME.to_string(), "OnDisk".to_string()]);

        let c = compiler.compile(Some(&Post::new("return 1;"))).unwrap();
        assert_eq!(c.references().len(), 2);
    }

    #[test]
    fn references_follow_registry_changes() {
        crate::host::register_module(HostModule::new("Test.ProviderLate", NO_TYPES).with_location("/lib/late.dll"));
        let names: Vec<_> = ScriptCompiler::new()
            .references()
            .iter()
            .map(|r| r.module().name.clone())
            .collect();
        assert!(names.contains(&"Test.ProviderLate".to_string()));
    }

    #[test]
    fn concurrent_compiles() {
        let compiler = compiler();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let compiler = &compiler;
                    scope.spawn(move || {
                        let post = Post::new(format!("Console.WriteLine({i})")).with_title(format!("p{i}"));
                        compiler.compile(Some(&post)).unwrap()
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                let c = handle.join().unwrap();
                assert_eq!(c.name(), format!("p{i}"));
                assert!(!c.has_errors(), "{:?}", c.diagnostics());
            }
        });
    }

    #[test]
    fn compiler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScriptCompiler>();
        assert_send_sync::<ScriptCompiler<FixedModules>>();
    }
}
