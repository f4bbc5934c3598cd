//! Compilations: immutable sets of syntax trees with options and references.
//!
//! A [`Compilation`] never changes once built. Replacing a tree returns a new
//! compilation that shares every other tree with the old one. Declarations,
//! bindings and diagnostics are derived on demand from the current trees.

#[allow(
    clippy::single_match_else,
    clippy::too_many_arguments,
)]
pub mod binder;
#[allow(clippy::module_name_repetitions)]
pub mod symbols;
pub mod types;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use binder::SemanticModel;
pub use symbols::{MemberSymbol, Symbol, SymbolOrigin, SCRIPT_CLASS};
pub use types::TypeRef;

use crate::error::{Error, Result};
use crate::host::{HostModule, MemberKind};
use crate::syntax::{DiagnosticKind, LocatedDiagnostic, Severity, SyntaxTree};
use symbols::{Declarations, HostIndex};

/// What the compiled unit is built as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Needs exactly one static `Main`.
    ConsoleApplication,
    DynamicallyLinkedLibrary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    pub output_kind: OutputKind,
    /// Namespaces imported into every tree.
    pub usings: Vec<String>,
}

impl CompilationOptions {
    pub fn new(output_kind: OutputKind) -> Self {
        Self {
            output_kind,
            usings: Vec::new(),
        }
    }

    pub fn with_usings(mut self, usings: Vec<String>) -> Self {
        self.usings = usings;
        self
    }
}

/// A host module the compiled unit links against, by file location.
#[derive(Debug, Clone)]
pub struct MetadataReference {
    module: HostModule,
    display: String,
}

impl MetadataReference {
    /// Wrap `module`, or `None` when it is dynamic or has no on-disk location.
    pub fn from_module(module: HostModule) -> Option<Self> {
        if !module.is_referenceable() {
            return None;
        }
        let display = module.location.as_ref()?.display().to_string();
        Some(Self { module, display })
    }

    pub fn module(&self) -> &HostModule {
        &self.module
    }

    /// The file path, as shown to users.
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn location(&self) -> &Path {
        self.module.location.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for MetadataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.module.name, self.display)
    }
}

#[derive(Debug, Clone)]
pub struct Compilation {
    name: String,
    options: CompilationOptions,
    trees: Vec<SyntaxTree>,
    references: Vec<MetadataReference>,
}

/// Declarations shared by every tree's binding pass.
struct Analysis {
    hosts: HostIndex,
    decls: Declarations,
}

impl Compilation {
    pub fn create(
        name: &str,
        options: CompilationOptions,
        trees: Vec<SyntaxTree>,
        references: Vec<MetadataReference>,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("name", "compilation name must not be empty"));
        }
        for (i, tree) in trees.iter().enumerate() {
            if trees.iter().skip(i + 1).any(|other| other.ptr_eq(tree)) {
                return Err(Error::invalid_argument(
                    "trees",
                    format!("tree '{}' was added more than once", tree.origin()),
                ));
            }
        }
        Ok(Self {
            name: name.to_string(),
            options,
            trees,
            references,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    /// Trees in the order they were added; a replacement keeps its slot.
    pub fn syntax_trees(&self) -> &[SyntaxTree] {
        &self.trees
    }

    pub fn references(&self) -> &[MetadataReference] {
        &self.references
    }

    pub fn contains(&self, tree: &SyntaxTree) -> bool {
        self.trees.iter().any(|t| t.ptr_eq(tree))
    }

    /// A new compilation with `old` swapped for `new`. `self` is unchanged.
    pub fn replace_syntax_tree(&self, old: &SyntaxTree, new: SyntaxTree) -> Result<Compilation> {
        let Some(slot) = self.trees.iter().position(|t| t.ptr_eq(old)) else {
            return Err(Error::invalid_argument(
                "old",
                format!("tree '{}' is not part of compilation '{}'", old.origin(), self.name),
            ));
        };
        if !old.ptr_eq(&new) && self.contains(&new) {
            return Err(Error::invalid_argument(
                "new",
                format!("tree '{}' is already part of compilation '{}'", new.origin(), self.name),
            ));
        }
        let mut next = self.clone();
        if let Some(entry) = next.trees.get_mut(slot) {
            *entry = new;
        }
        Ok(next)
    }

    /// Bindings for `tree`, which must currently be part of this compilation.
    pub fn semantic_model(&self, tree: &SyntaxTree) -> Result<SemanticModel> {
        if !self.contains(tree) {
            return Err(Error::invalid_argument(
                "tree",
                format!("tree '{}' is not part of compilation '{}'", tree.origin(), self.name),
            ));
        }
        let analysis = self.analyze();
        Ok(binder::bind_tree(tree, &analysis.decls, &analysis.hosts, &self.options.usings))
    }

    /// Every parse, declaration and binding problem, tree by tree, followed
    /// by compilation-wide problems.
    pub fn diagnostics(&self) -> Vec<LocatedDiagnostic> {
        let analysis = self.analyze();
        let mut out = Vec::new();
        for (index, tree) in self.trees.iter().enumerate() {
            out.extend(tree.diagnostics().iter().map(|d| tree.locate(d)));
            out.extend(
                analysis
                    .decls
                    .diagnostics
                    .iter()
                    .filter(|(owner, _)| *owner == index)
                    .map(|(_, d)| tree.locate(d)),
            );
            let model = binder::bind_tree(tree, &analysis.decls, &analysis.hosts, &self.options.usings);
            out.extend(model.diagnostics().iter().map(|d| tree.locate(d)));
        }
        if let Some(message) = self.entry_point_problem(&analysis.decls) {
            out.push(LocatedDiagnostic {
                origin: self.name.clone(),
                line: 0,
                column: 0,
                severity: Severity::Error,
                kind: DiagnosticKind::Declaration,
                message,
            });
        }
        out
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(LocatedDiagnostic::is_error)
    }

    fn analyze(&self) -> Analysis {
        let hosts = HostIndex::new(&self.references);
        let mut decls = Declarations::collect(&self.trees, &hosts, &self.options.usings);
        binder::infer_script_fields(&self.trees, &mut decls, &hosts, &self.options.usings);
        Analysis { hosts, decls }
    }

    fn entry_point_problem(&self, decls: &Declarations) -> Option<String> {
        if self.options.output_kind != OutputKind::ConsoleApplication {
            return None;
        }
        let mains = decls
            .types
            .values()
            .flat_map(|t| t.members.iter())
            .filter(|m| m.kind == MemberKind::Method && m.is_static && m.name == "Main")
            .count();
        match mains {
            1 => None,
            0 => Some("Program does not contain a static 'Main' method suitable for an entry point".to_string()),
            _ => Some("Program has more than one entry point defined".to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::host::{corlib, FixedModules, HostType, ModuleLister};
    use crate::syntax::{ParseOptions, SourceKind};

    static NO_TYPES: &[HostType] = &[];

    fn core_references() -> Vec<MetadataReference> {
        FixedModules::core()
            .loaded_modules()
            .into_iter()
            .filter_map(MetadataReference::from_module)
            .collect()
    }

    fn tree(src: &str, origin: &str, kind: SourceKind) -> SyntaxTree {
        SyntaxTree::parse(src, origin, ParseOptions::new(kind)).unwrap()
    }

    fn app(trees: Vec<SyntaxTree>) -> Compilation {
        let options = CompilationOptions::new(OutputKind::ConsoleApplication).with_usings(vec!["System".into()]);
        Compilation::create("Test", options, trees, core_references()).unwrap()
    }

    #[test]
    fn empty_name_rejected() {
        let options = CompilationOptions::new(OutputKind::ConsoleApplication);
        let err = Compilation::create("", options.clone(), Vec::new(), Vec::new()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(Compilation::create("  ", options, Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn same_tree_twice_rejected() {
        let t = tree("class A { }", "A", SourceKind::Regular);
        let options = CompilationOptions::new(OutputKind::DynamicallyLinkedLibrary);
        let err = Compilation::create("X", options, vec![t.clone(), t], Vec::new()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn references_skip_dynamic_and_locationless_modules() {
        assert!(MetadataReference::from_module(HostModule::new("NoPath", NO_TYPES)).is_none());
        let dynamic = HostModule::new("Dyn", NO_TYPES).with_location("/x.dll").into_dynamic();
        assert!(MetadataReference::from_module(dynamic).is_none());
        let core = MetadataReference::from_module(corlib::module()).unwrap();
        assert_eq!(core.module().name, corlib::MODULE_NAME);
        assert!(!core.display().is_empty());
    }

    #[test]
    fn replace_builds_new_compilation() {
        let a = tree("class Program { static void Main() { } }", "Entry", SourceKind::Regular);
        let b = tree("static int x = 1;", "Editor", SourceKind::Script);
        let first = app(vec![a.clone(), b.clone()]);

        let b2 = b.with_edits(vec![crate::syntax::TextEdit::insert(0, "// edited\n")]).unwrap();
        let second = first.replace_syntax_tree(&b, b2.clone()).unwrap();

        assert!(first.contains(&b));
        assert!(!first.contains(&b2));
        assert!(second.contains(&b2));
        assert!(!second.contains(&b));
        assert!(second.syntax_trees()[0].ptr_eq(&a));
        assert!(second.syntax_trees()[1].ptr_eq(&b2));
        assert_eq!(second.name(), "Test");
    }

    #[test]
    fn foreign_tree_rejected() {
        let a = tree("class Program { static void Main() { } }", "Entry", SourceKind::Regular);
        let stranger = tree("class Program { static void Main() { } }", "Entry", SourceKind::Regular);
        let c = app(vec![a]);
        assert!(c.semantic_model(&stranger).unwrap_err().is_invalid_argument());
        assert!(c
            .replace_syntax_tree(&stranger, stranger.clone())
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn model_is_stale_after_replacement() {
        let a = tree("class Program { static void Main() { } }", "Entry", SourceKind::Regular);
        let b = tree("static int x = 1;", "Editor", SourceKind::Script);
        let first = app(vec![a, b.clone()]);
        let b2 = tree("static int y = 2;", "Editor", SourceKind::Script);
        let second = first.replace_syntax_tree(&b, b2).unwrap();
        assert!(first.semantic_model(&b).is_ok());
        assert!(second.semantic_model(&b).is_err());
    }

    #[test]
    fn console_application_needs_one_main() {
        let none = app(vec![tree("class A { }", "A", SourceKind::Regular)]);
        let diags = none.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 0);
        assert!(diags[0].message.contains("does not contain a static 'Main'"));

        let two = app(vec![
            tree("class A { static void Main() { } }", "A", SourceKind::Regular),
            tree("class B { static void Main() { } }", "B", SourceKind::Regular),
        ]);
        assert!(two.diagnostics()[0].message.contains("more than one entry point"));

        let one = app(vec![tree("class A { static void Main() { } }", "A", SourceKind::Regular)]);
        assert!(!one.has_errors(), "{:?}", one.diagnostics());
    }

    #[test]
    fn diagnostics_follow_line_directives() {
        let entry = tree("class P { static void Main() { } }", "Entry", SourceKind::Regular);
        let prompt = tree(
            "public static object Eval() {\n#line 1\nint a = 1;\nreturn b;\n}",
            "Prompt",
            SourceKind::Interactive,
        );
        let diags = app(vec![entry, prompt]).diagnostics();
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].origin, "Prompt");
        assert_eq!(diags[0].line, 2);
        assert_eq!(diags[0].kind, DiagnosticKind::Binding);
        assert_eq!(diags[0].to_string(), "Prompt(2,8): error: The name 'b' does not exist in the current context");
    }

    #[test]
    fn declarations_span_trees() {
        let entry = tree("class P { static void Main() { Helper.Go(); } }", "Entry", SourceKind::Regular);
        let editor = tree("class Helper { public static void Go() { } }", "Editor", SourceKind::Script);
        let c = app(vec![entry, editor]);
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
    }
}
