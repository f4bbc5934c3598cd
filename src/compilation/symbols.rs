//! Declaration table: every class declared across a compilation's trees,
//! plus the host types its references export.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use super::types::TypeRef;
use super::MetadataReference;
use crate::host::{HostType, MemberKind};
use crate::syntax::ast::{ClassDecl, Member, Modifier, Param, Span, TypeSyntax, TypeSyntaxKind};
use crate::syntax::{Diagnostic, SyntaxTree};

/// Implicit class holding the top-level members of script trees.
pub const SCRIPT_CLASS: &str = "Script";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolOrigin {
    Host { module: String },
    Source { tree: usize, span: Span },
}

/// What a name, member access or invocation refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "symbol", rename_all = "snake_case")]
pub enum Symbol {
    Local { name: String, ty: TypeRef },
    Parameter { name: String, ty: TypeRef },
    Field(MemberSymbol),
    Property(MemberSymbol),
    Method(MemberSymbol),
    Type { ty: TypeRef },
    Namespace { name: String },
}

/// A member of a host or source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSymbol {
    /// Host full name (`System.Console`) or source class name (`Helper`).
    pub containing_type: String,
    pub name: String,
    pub is_static: bool,
    pub params: Vec<TypeRef>,
    /// Return type of a method; value type of a field or property.
    pub ty: TypeRef,
    /// Cannot be assigned outside a constructor.
    pub readonly: bool,
    pub origin: SymbolOrigin,
}

impl MemberSymbol {
    pub fn is_host(&self) -> bool {
        matches!(self.origin, SymbolOrigin::Host { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredMember {
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    pub params: Vec<TypeRef>,
    pub ty: TypeRef,
    /// `readonly`/`const` field or getter-only property.
    pub readonly: bool,
    pub tree: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredType {
    pub name: String,
    /// The implicit `Script` class rather than a `class` declaration.
    pub implicit: bool,
    pub members: Vec<DeclaredMember>,
    pub tree: usize,
    pub span: Span,
}

impl DeclaredType {
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DeclaredMember> + 'a {
        self.members
            .iter()
            .filter(move |m| m.name == name && m.kind != MemberKind::Constructor)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &DeclaredMember> {
        self.members.iter().filter(|m| m.kind == MemberKind::Constructor)
    }

    pub fn symbol_for(&self, member: &DeclaredMember) -> MemberSymbol {
        MemberSymbol {
            containing_type: self.name.clone(),
            name: member.name.clone(),
            is_static: member.is_static,
            params: member.params.clone(),
            ty: member.ty.clone(),
            readonly: member.readonly,
            origin: SymbolOrigin::Source {
                tree: member.tree,
                span: member.span,
            },
        }
    }
}

// ── Host types ───────────────────────────────────────────────────

/// Host types visible through a compilation's references. When two modules
/// export the same full name, the first reference wins.
#[derive(Debug, Default)]
pub struct HostIndex {
    types: IndexMap<&'static str, (&'static HostType, String)>,
    namespaces: HashSet<String>,
}

impl HostIndex {
    pub fn new(references: &[MetadataReference]) -> Self {
        let mut index = HostIndex::default();
        for reference in references {
            for ty in reference.module().types {
                index
                    .types
                    .entry(ty.full_name)
                    .or_insert_with(|| (ty, reference.module().name.clone()));
                let mut namespace = ty.namespace();
                while !namespace.is_empty() {
                    index.namespaces.insert(namespace.to_string());
                    namespace = namespace.rsplit_once('.').map_or("", |(parent, _)| parent);
                }
            }
        }
        index
    }

    pub fn get(&self, full_name: &str) -> Option<&'static HostType> {
        self.types.get(full_name).map(|(ty, _)| *ty)
    }

    pub fn module_of(&self, full_name: &str) -> Option<&str> {
        self.types.get(full_name).map(|(_, module)| module.as_str())
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    /// Whether `from` is `to` or derives from it.
    pub fn derives_from(&self, from: &str, to: &str) -> bool {
        let mut current = Some(from);
        let mut steps = 0;
        while let Some(name) = current {
            if name == to {
                return true;
            }
            // a malformed module could declare a base cycle
            steps += 1;
            if steps > 64 {
                return false;
            }
            current = self.get(name).and_then(|t| t.base);
        }
        false
    }
}

// ── Type resolution ─────────────────────────────────────────────

/// Resolve written type syntax against declared classes, then host types by
/// full name or through `usings`. `var` resolves to `None`.
pub fn resolve_type(
    ty: &TypeSyntax,
    declared: &IndexMap<String, DeclaredType>,
    hosts: &HostIndex,
    usings: &[String],
) -> Result<Option<TypeRef>, Diagnostic> {
    Ok(Some(match &ty.kind {
        TypeSyntaxKind::Var => return Ok(None),
        TypeSyntaxKind::Predefined(p) => TypeRef::from_predefined(*p),
        TypeSyntaxKind::Array(inner) => match resolve_type(inner, declared, hosts, usings)? {
            Some(inner) => TypeRef::Array(Box::new(inner)),
            None => return Err(Diagnostic::binding("Arrays of 'var' are not allowed", ty.span)),
        },
        TypeSyntaxKind::Named(parts) => {
            let dotted = parts.join(".");
            resolve_named(&dotted, parts.len() == 1, declared, hosts, usings)
                .ok_or_else(|| Diagnostic::binding(missing_type_message(&dotted), ty.span))?
        }
    }))
}

pub fn missing_type_message(name: &str) -> String {
    format!(
        "The type or namespace name '{name}' could not be found (are you missing a using directive or an assembly reference?)"
    )
}

/// Look a type name up the way a simple or qualified name in source does.
pub fn resolve_named(
    name: &str,
    simple: bool,
    declared: &IndexMap<String, DeclaredType>,
    hosts: &HostIndex,
    usings: &[String],
) -> Option<TypeRef> {
    if simple && declared.contains_key(name) {
        return Some(TypeRef::User(name.to_string()));
    }
    if let Some(host) = hosts.get(name) {
        return Some(TypeRef::from_host_name(host.full_name));
    }
    if simple {
        for namespace in usings {
            if let Some(host) = hosts.get(&format!("{namespace}.{name}")) {
                return Some(TypeRef::from_host_name(host.full_name));
            }
        }
    }
    None
}

// ── Declaration collection ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct Declarations {
    pub types: IndexMap<String, DeclaredType>,
    /// Problems found while collecting, by tree index.
    pub diagnostics: Vec<(usize, Diagnostic)>,
}

impl Declarations {
    pub fn collect(trees: &[SyntaxTree], hosts: &HostIndex, usings: &[String]) -> Self {
        let mut decls = Declarations::default();

        // Pass 1: type names, so member signatures can refer to any class.
        for (index, tree) in trees.iter().enumerate() {
            let root = tree.root();
            if tree.is_script() {
                decls.declare_script(index, root.span);
            }
            for member in &root.members {
                if let Member::Class(class) = member {
                    decls.declare_class(index, class);
                }
            }
        }

        // Pass 2: members.
        for (index, tree) in trees.iter().enumerate() {
            let tree_usings = tree_usings(tree, usings);
            let root = tree.root();
            for member in &root.members {
                match member {
                    Member::Class(class) => decls.collect_class(index, class, hosts, &tree_usings),
                    other if tree.is_script() => {
                        decls.collect_member(index, SCRIPT_CLASS, other, hosts, &tree_usings);
                    }
                    _ => {}
                }
            }
        }

        decls
    }

    pub fn get(&self, name: &str) -> Option<&DeclaredType> {
        self.types.get(name)
    }

    fn declare_script(&mut self, tree: usize, span: Span) {
        match self.types.get_mut(SCRIPT_CLASS) {
            Some(existing) if !existing.implicit => {
                self.diagnostics.push((
                    existing.tree,
                    Diagnostic::declaration(
                        format!("The type name '{SCRIPT_CLASS}' is reserved for script members"),
                        existing.span,
                    ),
                ));
                existing.implicit = true;
            }
            Some(_) => {}
            None => {
                self.types.insert(
                    SCRIPT_CLASS.to_string(),
                    DeclaredType {
                        name: SCRIPT_CLASS.to_string(),
                        implicit: true,
                        members: Vec::new(),
                        tree,
                        span: Span::at(span.start),
                    },
                );
            }
        }
    }

    fn declare_class(&mut self, tree: usize, class: &ClassDecl) {
        let name = &class.name.name;
        if let Some(existing) = self.types.get(name) {
            let message = if existing.implicit {
                format!("The type name '{SCRIPT_CLASS}' is reserved for script members")
            } else {
                format!("The namespace already contains a definition for '{name}'")
            };
            self.diagnostics
                .push((tree, Diagnostic::declaration(message, class.name.span)));
        } else {
            self.types.insert(
                name.clone(),
                DeclaredType {
                    name: name.clone(),
                    implicit: false,
                    members: Vec::new(),
                    tree,
                    span: class.name.span,
                },
            );
        }
        for member in &class.members {
            if let Member::Class(nested) = member {
                self.declare_class(tree, nested);
            }
        }
    }

    fn collect_class(&mut self, tree: usize, class: &ClassDecl, hosts: &HostIndex, usings: &[String]) {
        // Duplicates were reported in pass 1; their members are not merged.
        let owns_entry = self
            .types
            .get(&class.name.name)
            .is_some_and(|t| !t.implicit && t.tree == tree && t.span == class.name.span);
        for member in &class.members {
            match member {
                Member::Class(nested) => self.collect_class(tree, nested, hosts, usings),
                other if owns_entry => self.collect_member(tree, &class.name.name, other, hosts, usings),
                _ => {}
            }
        }
    }

    fn collect_member(&mut self, tree: usize, owner: &str, member: &Member, hosts: &HostIndex, usings: &[String]) {
        let in_script = owner == SCRIPT_CLASS;
        let mut problems = Vec::new();
        let resolve = |ty: &TypeSyntax, problems: &mut Vec<Diagnostic>| -> TypeRef {
            match resolve_type(ty, &self.types, hosts, usings) {
                Ok(Some(resolved)) => resolved,
                Ok(None) => TypeRef::Error,
                Err(d) => {
                    problems.push(d);
                    TypeRef::Error
                }
            }
        };
        let resolve_params = |params: &[Param], problems: &mut Vec<Diagnostic>| -> Vec<TypeRef> {
            params.iter().map(|p| resolve(&p.ty, problems)).collect()
        };

        let declared = match member {
            Member::Class(_) => return,
            Member::Field(field) => {
                if field.ty.kind == TypeSyntaxKind::Var && (!in_script || field.init.is_none()) {
                    problems.push(Diagnostic::declaration(
                        "The contextual keyword 'var' may only appear within a local variable declaration or in script code",
                        field.ty.span,
                    ));
                }
                DeclaredMember {
                    name: field.name.name.clone(),
                    kind: MemberKind::Field,
                    is_static: field.modifiers.is_static(),
                    params: Vec::new(),
                    ty: resolve(&field.ty, &mut problems),
                    readonly: field.modifiers.has(Modifier::Readonly) || field.modifiers.has(Modifier::Const),
                    tree,
                    span: field.name.span,
                }
            }
            Member::Property(prop) => DeclaredMember {
                name: prop.name.name.clone(),
                kind: MemberKind::Property,
                is_static: prop.modifiers.is_static(),
                params: Vec::new(),
                ty: resolve(&prop.ty, &mut problems),
                readonly: !prop.has_setter,
                tree,
                span: prop.name.span,
            },
            Member::Method(method) => {
                if method.return_type.kind == TypeSyntaxKind::Var {
                    problems.push(Diagnostic::declaration(
                        "The contextual keyword 'var' may only appear within a local variable declaration or in script code",
                        method.return_type.span,
                    ));
                }
                let params = resolve_params(&method.params, &mut problems);
                DeclaredMember {
                    name: method.name.name.clone(),
                    kind: MemberKind::Method,
                    is_static: method.modifiers.is_static(),
                    params,
                    ty: resolve(&method.return_type, &mut problems),
                    readonly: true,
                    tree,
                    span: method.name.span,
                }
            }
            Member::Constructor(ctor) => DeclaredMember {
                name: ctor.name.name.clone(),
                kind: MemberKind::Constructor,
                is_static: false,
                params: resolve_params(&ctor.params, &mut problems),
                ty: TypeRef::Void,
                readonly: true,
                tree,
                span: ctor.name.span,
            },
        };

        for d in problems {
            self.diagnostics.push((tree, d));
        }

        let Some(owner_type) = self.types.get_mut(owner) else {
            return;
        };
        let clash = owner_type.members.iter().find(|existing| {
            existing.name == declared.name
                && existing.kind != MemberKind::Constructor
                && declared.kind != MemberKind::Constructor
                && (existing.kind != MemberKind::Method
                    || declared.kind != MemberKind::Method
                    || existing.params == declared.params)
        });
        if let Some(existing) = clash {
            let message = if existing.kind == MemberKind::Method && declared.kind == MemberKind::Method {
                format!(
                    "Type '{owner}' already defines a member called '{}' with the same parameter types",
                    declared.name
                )
            } else {
                format!("The type '{owner}' already contains a definition for '{}'", declared.name)
            };
            self.diagnostics
                .push((tree, Diagnostic::declaration(message, declared.span)));
            return;
        }
        owner_type.members.push(declared);
    }
}

/// Namespaces imported into `tree`: the compilation's plus its own `using`s.
pub fn tree_usings(tree: &SyntaxTree, usings: &[String]) -> Vec<String> {
    let mut all = usings.to_vec();
    for using in &tree.root().usings {
        let name = using.dotted();
        if !all.contains(&name) {
            all.push(name);
        }
    }
    all
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::FixedModules;
    use crate::host::ModuleLister;
    use crate::syntax::{ParseOptions, SourceKind};

    fn hosts() -> HostIndex {
        let refs: Vec<_> = FixedModules::core()
            .loaded_modules()
            .into_iter()
            .filter_map(MetadataReference::from_module)
            .collect();
        HostIndex::new(&refs)
    }

    fn tree(src: &str, kind: SourceKind) -> SyntaxTree {
        SyntaxTree::parse(src, "Editor", ParseOptions::new(kind)).unwrap()
    }

    fn usings() -> Vec<String> {
        vec!["System".into(), "System.IO".into()]
    }

    #[test]
    fn host_index_namespaces_include_parents() {
        let index = hosts();
        assert!(index.has_namespace("System"));
        assert!(index.has_namespace("System.IO"));
        assert!(!index.has_namespace("System.Net"));
        assert!(index.derives_from("System.IO.StringWriter", "System.IO.TextWriter"));
        assert!(index.derives_from("System.IO.StringWriter", "System.Object"));
        assert!(!index.derives_from("System.IO.TextWriter", "System.IO.StringWriter"));
    }

    #[test]
    fn script_members_form_script_class() {
        let trees = vec![
            tree("public static object Eval() { return 1; }", SourceKind::Interactive),
            tree("public static readonly StringWriter __Console = new StringWriter();", SourceKind::Script),
        ];
        let decls = Declarations::collect(&trees, &hosts(), &usings());
        assert!(decls.diagnostics.is_empty(), "{:?}", decls.diagnostics);
        let script = decls.get(SCRIPT_CLASS).unwrap();
        assert!(script.implicit);
        let names: Vec<_> = script.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Eval", "__Console"]);
        assert_eq!(script.members[1].ty, TypeRef::Host("System.IO.StringWriter"));
        assert!(script.members[1].readonly);
    }

    #[test]
    fn classes_from_all_trees() {
        let trees = vec![
            tree("class A { public static int F() => 1; }", SourceKind::Regular),
            tree("class B { public A Make() => null; }", SourceKind::Script),
        ];
        let decls = Declarations::collect(&trees, &hosts(), &usings());
        assert!(decls.diagnostics.is_empty(), "{:?}", decls.diagnostics);
        let b = decls.get("B").unwrap();
        assert_eq!(b.members[0].ty, TypeRef::User("A".into()));
    }

    #[test]
    fn duplicate_class_reported() {
        let trees = vec![tree("class A { } class A { }", SourceKind::Script)];
        let decls = Declarations::collect(&trees, &hosts(), &usings());
        assert_eq!(decls.diagnostics.len(), 1);
        assert!(decls.diagnostics[0].1.message.contains("already contains a definition for 'A'"));
    }

    #[test]
    fn duplicate_members_and_overloads() {
        let src = "class A { int x; string x; void F(int a) { } void F(string a) { } void F(int b) { } }";
        let decls = Declarations::collect(&[tree(src, SourceKind::Script)], &hosts(), &usings());
        let messages: Vec<_> = decls.diagnostics.iter().map(|(_, d)| d.message.clone()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("already contains a definition for 'x'"));
        assert!(messages[1].contains("same parameter types"));
        assert_eq!(decls.get("A").unwrap().members_named("F").count(), 2);
    }

    #[test]
    fn user_class_named_script_conflicts_with_script_members() {
        let trees = vec![
            tree("class Script { }", SourceKind::Regular),
            tree("static int x = 1;", SourceKind::Script),
        ];
        let decls = Declarations::collect(&trees, &hosts(), &usings());
        assert_eq!(decls.diagnostics.len(), 1);
        assert!(decls.diagnostics[0].1.message.contains("reserved"));
    }

    #[test]
    fn unknown_type_reported() {
        let decls = Declarations::collect(&[tree("class A { Widget w; }", SourceKind::Script)], &hosts(), &usings());
        assert_eq!(decls.diagnostics.len(), 1);
        assert!(decls.diagnostics[0].1.message.contains("'Widget' could not be found"));
    }

    #[test]
    fn tree_usings_extend_compilation_usings() {
        let t = tree("using System.Text;\nclass A { StringBuilder sb; }", SourceKind::Script);
        let decls = Declarations::collect(std::slice::from_ref(&t), &hosts(), &usings());
        assert!(decls.diagnostics.is_empty(), "{:?}", decls.diagnostics);
        assert_eq!(tree_usings(&t, &usings()).last().unwrap(), "System.Text");
    }

    #[test]
    fn declared_type_shadows_host_type() {
        let decls = Declarations::collect(
            &[tree("class Console { }", SourceKind::Script)],
            &hosts(),
            &usings(),
        );
        let resolved = resolve_named("Console", true, &decls.types, &hosts(), &usings());
        assert_eq!(resolved, Some(TypeRef::User("Console".into())));
        let qualified = resolve_named("System.Console", false, &decls.types, &hosts(), &usings());
        assert_eq!(qualified, Some(TypeRef::Host("System.Console")));
    }
}
