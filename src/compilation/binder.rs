//! Name binding and type checking for one syntax tree.
//!
//! The binder walks a tree once, resolving every name, member access and
//! invocation against the compilation's [`Declarations`] and [`HostIndex`],
//! and records what each expression refers to and what type it has. The
//! result is a read-only [`SemanticModel`].

use std::collections::HashMap;

use super::symbols::{
    resolve_named, resolve_type, tree_usings, Declarations, DeclaredMember, HostIndex, MemberSymbol, Symbol,
    SymbolOrigin, SCRIPT_CLASS,
};
use super::types::TypeRef;
use crate::host::{HostMember, MemberKind};
use crate::syntax::ast::{
    AssignOp, BinOp, Block, ClassDecl, Expr, ExprKind, Ident, Literal, Member, MethodBody, NodeId, Param, PostfixOp,
    Span, Stmt, StmtKind, TypeSyntax, TypeSyntaxKind, UnaryOp,
};
use crate::syntax::{Diagnostic, SyntaxTree};

/// What one tree's expressions mean within one compilation.
#[derive(Debug, Clone)]
pub struct SemanticModel {
    tree: SyntaxTree,
    symbols: HashMap<NodeId, Symbol>,
    types: HashMap<NodeId, TypeRef>,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticModel {
    /// The tree this model was built for.
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// What a name, member access, invocation or object creation refers to.
    /// For an invocation this is the chosen method overload.
    pub fn symbol_info(&self, expr: &Expr) -> Option<&Symbol> {
        self.symbols.get(&expr.id)
    }

    /// The type of a value-producing expression.
    pub fn type_info(&self, expr: &Expr) -> Option<&TypeRef> {
        self.types.get(&expr.id)
    }

    /// Binding problems found in this tree.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Bind `tree` against its compilation's declarations.
pub(crate) fn bind_tree(
    tree: &SyntaxTree,
    decls: &Declarations,
    hosts: &HostIndex,
    usings: &[String],
) -> SemanticModel {
    let mut binder = Binder::new(decls, hosts, tree_usings(tree, usings), tree.is_script());
    let root = tree.root();
    for member in &root.members {
        match member {
            Member::Class(class) => binder.bind_class(class),
            other if tree.is_script() => binder.bind_member(SCRIPT_CLASS, other),
            _ => {}
        }
    }
    if !root.statements.is_empty() {
        binder.context = Context::script_statements();
        binder.push_scope();
        for stmt in &root.statements {
            binder.bind_stmt(stmt);
        }
        binder.pop_scope();
    }
    SemanticModel {
        tree: tree.clone(),
        symbols: binder.symbols,
        types: binder.types,
        diagnostics: binder.diagnostics,
    }
}

/// Give `var` script fields the type of their initializer, in declaration
/// order so later fields see earlier ones.
pub(crate) fn infer_script_fields(trees: &[SyntaxTree], decls: &mut Declarations, hosts: &HostIndex, usings: &[String]) {
    for (index, tree) in trees.iter().enumerate() {
        if !tree.is_script() {
            continue;
        }
        for member in &tree.root().members {
            let Member::Field(field) = member else {
                continue;
            };
            let Some(init) = field.init.as_ref().filter(|_| field.ty.kind == TypeSyntaxKind::Var) else {
                continue;
            };
            let inferred = {
                let mut binder = Binder::new(decls, hosts, tree_usings(tree, usings), true);
                binder.context = Context::script_statements();
                match binder.value_of(init) {
                    TypeRef::Null | TypeRef::Void => TypeRef::Error,
                    ty => ty,
                }
            };
            let target = decls.types.get_mut(SCRIPT_CLASS).and_then(|script| {
                script
                    .members
                    .iter_mut()
                    .find(|m| m.kind == MemberKind::Field && m.name == field.name.name && m.tree == index)
            });
            if let Some(target) = target {
                target.ty = inferred;
            }
        }
    }
}

// ── Binding state ───────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Context {
    containing: String,
    member: String,
    is_static: bool,
    return_type: TypeRef,
    in_constructor: bool,
    loop_depth: usize,
}

impl Context {
    fn script_statements() -> Self {
        Context {
            containing: SCRIPT_CLASS.to_string(),
            member: "<top-level>".to_string(),
            is_static: true,
            return_type: TypeRef::Object,
            in_constructor: false,
            loop_depth: 0,
        }
    }
}

/// How a method group was reached, which decides the static checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    /// `Type.Member`
    Type,
    /// `value.Member`
    Instance,
    /// A simple name inside a type body.
    Implicit { enforce_static: bool },
}

#[derive(Debug, Clone)]
struct Candidate {
    symbol: MemberSymbol,
    variadic: bool,
}

#[derive(Debug, Clone)]
struct MethodGroup {
    owner: String,
    name: String,
    candidates: Vec<Candidate>,
    receiver: Receiver,
}

#[derive(Debug, Clone)]
enum Bound {
    Value(TypeRef),
    Type(TypeRef),
    Namespace(String),
    Methods(MethodGroup),
}

struct Binder<'a> {
    decls: &'a Declarations,
    hosts: &'a HostIndex,
    usings: Vec<String>,
    in_script: bool,
    context: Context,
    scopes: Vec<HashMap<String, (TypeRef, bool)>>,
    symbols: HashMap<NodeId, Symbol>,
    types: HashMap<NodeId, TypeRef>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Binder<'a> {
    fn new(decls: &'a Declarations, hosts: &'a HostIndex, usings: Vec<String>, in_script: bool) -> Self {
        Binder {
            decls,
            hosts,
            usings,
            in_script,
            context: Context::script_statements(),
            scopes: Vec::new(),
            symbols: HashMap::new(),
            types: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::binding(message, span));
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare_local(&mut self, name: &Ident, ty: TypeRef, is_param: bool) {
        if self.scopes.iter().any(|scope| scope.contains_key(&name.name)) {
            self.error(
                format!("A local or parameter named '{}' is already defined in this scope", name.name),
                name.span,
            );
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.clone(), (ty, is_param));
        }
    }

    fn lookup_local(&self, name: &str) -> Option<&(TypeRef, bool)> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Resolve type syntax; `None` for `var`. Failures become [`TypeRef::Error`].
    fn resolve_syntax(&mut self, ty: &TypeSyntax, report: bool) -> Option<TypeRef> {
        match resolve_type(ty, &self.decls.types, self.hosts, &self.usings) {
            Ok(resolved) => resolved,
            Err(diagnostic) => {
                if report {
                    self.diagnostics.push(diagnostic);
                }
                Some(TypeRef::Error)
            }
        }
    }

    // ── Members ─────────────────────────────────────────────────

    fn bind_class(&mut self, class: &ClassDecl) {
        for member in &class.members {
            match member {
                Member::Class(nested) => self.bind_class(nested),
                other => self.bind_member(&class.name.name, other),
            }
        }
    }

    fn bind_member(&mut self, owner: &str, member: &Member) {
        match member {
            Member::Class(class) => self.bind_class(class),
            Member::Property(_) => {}
            Member::Field(field) => {
                let Some(init) = &field.init else {
                    return;
                };
                self.enter(owner, &field.name.name, field.modifiers.is_static(), TypeRef::Void, false);
                let declared = self.resolve_syntax(&field.ty, false);
                let value = self.value_of(init);
                if let Some(declared) = declared {
                    self.check_convertible(&value, &declared, init.span);
                }
            }
            Member::Method(method) => {
                let return_type = self.resolve_syntax(&method.return_type, false).unwrap_or(TypeRef::Error);
                self.enter(owner, &method.name.name, method.modifiers.is_static(), return_type.clone(), false);
                self.bind_params(&method.params);
                match &method.body {
                    MethodBody::Block(block) => self.bind_block_stmts(block),
                    MethodBody::Expr { expr, .. } => {
                        let value = self.value_of(expr);
                        if return_type != TypeRef::Void {
                            self.check_convertible(&value, &return_type, expr.span);
                        }
                    }
                }
                self.pop_scope();
            }
            Member::Constructor(ctor) => {
                if ctor.name.name != owner {
                    self.error("Method must have a return type", ctor.name.span);
                }
                self.enter(owner, &ctor.name.name, false, TypeRef::Void, true);
                self.bind_params(&ctor.params);
                self.bind_block_stmts(&ctor.body);
                self.pop_scope();
            }
        }
    }

    fn enter(&mut self, owner: &str, member: &str, is_static: bool, return_type: TypeRef, in_constructor: bool) {
        self.context = Context {
            containing: owner.to_string(),
            member: member.to_string(),
            is_static,
            return_type,
            in_constructor,
            loop_depth: 0,
        };
        self.scopes.clear();
    }

    fn bind_params(&mut self, params: &[Param]) {
        self.push_scope();
        for param in params {
            let ty = self.resolve_syntax(&param.ty, false).unwrap_or(TypeRef::Error);
            if self.scopes.last().is_some_and(|scope| scope.contains_key(&param.name.name)) {
                self.error(
                    format!("The parameter name '{}' is a duplicate", param.name.name),
                    param.name.span,
                );
                continue;
            }
            self.declare_local(&param.name, ty, true);
        }
    }

    // ── Statements ──────────────────────────────────────────────

    /// A method body shares its scope with the parameters.
    fn bind_block_stmts(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.bind_stmt(stmt);
        }
    }

    /// An embedded statement gets its own scope.
    fn bind_embedded(&mut self, stmt: &Stmt) {
        self.push_scope();
        self.bind_stmt(stmt);
        self.pop_scope();
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => {
                self.push_scope();
                self.bind_block_stmts(block);
                self.pop_scope();
            }
            StmtKind::Local { ty, name, init, .. } => {
                let declared = self.resolve_syntax(ty, true);
                let local_ty = match (declared, init) {
                    (Some(declared), Some(init)) => {
                        let value = self.value_of(init);
                        self.check_convertible(&value, &declared, init.span);
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(init)) => match self.value_of(init) {
                        TypeRef::Null => {
                            self.error("Cannot assign <null> to an implicitly-typed variable", init.span);
                            TypeRef::Error
                        }
                        TypeRef::Void => {
                            self.error("Cannot assign void to an implicitly-typed variable", init.span);
                            TypeRef::Error
                        }
                        value => value,
                    },
                    (None, None) => {
                        self.error("Implicitly-typed variables must be initialized", name.span);
                        TypeRef::Error
                    }
                };
                self.declare_local(name, local_ty, false);
            }
            StmtKind::Expr { expr, .. } => {
                self.value_of(expr);
                if !is_statement_expression(expr) {
                    self.error(
                        "Only assignment, call, increment, decrement, and new object expressions can be used as a statement",
                        expr.span,
                    );
                }
            }
            StmtKind::Return { value, .. } => self.bind_return(value.as_ref(), stmt.span),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition);
                self.bind_embedded(then_branch);
                if let Some(else_branch) = else_branch {
                    self.bind_embedded(else_branch);
                }
            }
            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.context.loop_depth += 1;
                self.bind_embedded(body);
                self.context.loop_depth -= 1;
            }
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.push_scope();
                if let Some(init) = init {
                    self.bind_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition);
                }
                self.context.loop_depth += 1;
                self.bind_embedded(body);
                self.context.loop_depth -= 1;
                for expr in step {
                    self.value_of(expr);
                }
                self.pop_scope();
            }
            StmtKind::Break { .. } | StmtKind::Continue { .. } => {
                if self.context.loop_depth == 0 {
                    self.error("No enclosing loop out of which to break or continue", stmt.span);
                }
            }
            StmtKind::Empty | StmtKind::Error => {}
        }
    }

    fn bind_return(&mut self, value: Option<&Expr>, span: Span) {
        let expected = self.context.return_type.clone();
        match value {
            Some(value) if expected == TypeRef::Void => {
                self.value_of(value);
                let message = format!(
                    "Since '{}.{}' returns void, a return keyword must not be followed by an object expression",
                    self.context.containing, self.context.member
                );
                self.error(message, value.span);
            }
            Some(value) => {
                let actual = self.value_of(value);
                self.check_convertible(&actual, &expected, value.span);
            }
            None if expected == TypeRef::Void || expected.is_error() => {}
            None => self.error(
                format!("An object of a type convertible to '{expected}' is required"),
                span,
            ),
        }
    }

    fn check_condition(&mut self, condition: &Expr) {
        let ty = self.value_of(condition);
        self.check_convertible(&ty, &TypeRef::Bool, condition.span);
    }

    // ── Conversions ─────────────────────────────────────────────

    /// Implicit conversion from `from` to `to`.
    fn convertible(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to || from.is_error() || to.is_error() {
            return true;
        }
        match (from, to) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => false,
            (_, TypeRef::Object) => true,
            (TypeRef::Null, to) => to.is_reference(),
            (from, to) if from.is_numeric() && to.is_numeric() => from.numeric_rank() <= to.numeric_rank(),
            (from, to) => match (from.host_name(), to.host_name()) {
                (Some(from), Some(to)) => self.hosts.derives_from(from, to),
                _ => false,
            },
        }
    }

    fn check_convertible(&mut self, from: &TypeRef, to: &TypeRef, span: Span) {
        if self.convertible(from, to) {
            return;
        }
        let message = if *from == TypeRef::Null {
            format!("Cannot convert null to '{to}' because it is a non-nullable value type")
        } else {
            format!("Cannot implicitly convert type '{from}' to '{to}'")
        };
        self.error(message, span);
    }

    // ── Expressions ─────────────────────────────────────────────

    /// Bind an expression that must produce a value.
    fn value_of(&mut self, expr: &Expr) -> TypeRef {
        let ty = match self.bind_expr(expr) {
            Bound::Value(ty) => ty,
            Bound::Type(ty) => {
                self.error(format!("'{ty}' is a type, which is not valid in the given context"), expr.span);
                TypeRef::Error
            }
            Bound::Namespace(name) => {
                self.error(format!("'{name}' is a namespace but is used like a variable"), expr.span);
                TypeRef::Error
            }
            Bound::Methods(group) => {
                self.error(
                    format!("Cannot convert method group '{}' to non-delegate type", group.name),
                    expr.span,
                );
                TypeRef::Error
            }
        };
        self.types.insert(expr.id, ty.clone());
        ty
    }

    fn bind_expr(&mut self, expr: &Expr) -> Bound {
        let bound = self.bind_expr_inner(expr);
        if let Bound::Value(ty) = &bound {
            self.types.insert(expr.id, ty.clone());
        }
        bound
    }

    fn bind_expr_inner(&mut self, expr: &Expr) -> Bound {
        match &expr.kind {
            ExprKind::Literal(literal) => Bound::Value(literal_type(literal)),
            ExprKind::Name(name) => self.bind_name(name, expr),
            ExprKind::This => {
                if self.context.is_static {
                    self.error(
                        "Keyword 'this' is not valid in a static property, static method, or static field initializer",
                        expr.span,
                    );
                    Bound::Value(TypeRef::Error)
                } else {
                    Bound::Value(TypeRef::User(self.context.containing.clone()))
                }
            }
            ExprKind::PredefinedType(p) => Bound::Type(TypeRef::from_predefined(*p)),
            ExprKind::MemberAccess { target, name } => self.bind_member_access(target, name, expr),
            ExprKind::Invocation { target, args, .. } => self.bind_invocation(target, args, expr),
            ExprKind::ObjectCreation { ty, args, .. } => self.bind_creation(ty, args, expr),
            ExprKind::Assign { op, target, value } => Bound::Value(self.bind_assign(*op, target, value, expr.span)),
            ExprKind::Binary { op, left, right } => {
                let left = self.value_of(left);
                let right = self.value_of(right);
                Bound::Value(self.binary_result(*op, &left, &right, expr.span))
            }
            ExprKind::Unary { op, operand } => Bound::Value(self.bind_unary(*op, operand)),
            ExprKind::Postfix { op, operand } => {
                let symbol = match op {
                    PostfixOp::Increment => "++",
                    PostfixOp::Decrement => "--",
                };
                Bound::Value(self.bind_increment(symbol, operand))
            }
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.check_condition(condition);
                let a = self.value_of(when_true);
                let b = self.value_of(when_false);
                Bound::Value(if a == b || self.convertible(&b, &a) {
                    a
                } else if self.convertible(&a, &b) {
                    b
                } else {
                    self.error(
                        format!(
                            "Type of conditional expression cannot be determined because there is no implicit conversion between '{a}' and '{b}'"
                        ),
                        expr.span,
                    );
                    TypeRef::Error
                })
            }
            ExprKind::Paren(inner) => {
                let bound = self.bind_expr(inner);
                if let Some(symbol) = self.symbols.get(&inner.id).cloned() {
                    self.symbols.insert(expr.id, symbol);
                }
                bound
            }
            ExprKind::Missing => Bound::Value(TypeRef::Error),
        }
    }

    // ── Names ───────────────────────────────────────────────────

    fn bind_name(&mut self, name: &str, expr: &Expr) -> Bound {
        if let Some((ty, is_param)) = self.lookup_local(name).cloned() {
            let symbol = if is_param {
                Symbol::Parameter {
                    name: name.to_string(),
                    ty: ty.clone(),
                }
            } else {
                Symbol::Local {
                    name: name.to_string(),
                    ty: ty.clone(),
                }
            };
            self.symbols.insert(expr.id, symbol);
            return Bound::Value(ty);
        }

        let containing = self.context.containing.clone();
        if let Some(bound) = self.simple_member(&containing, name, expr) {
            return bound;
        }
        if self.in_script && containing != SCRIPT_CLASS {
            if let Some(bound) = self.simple_member(SCRIPT_CLASS, name, expr) {
                return bound;
            }
        }

        if let Some(ty) = resolve_named(name, true, &self.decls.types, self.hosts, &self.usings) {
            self.symbols.insert(expr.id, Symbol::Type { ty: ty.clone() });
            return Bound::Type(ty);
        }
        if self.hosts.has_namespace(name) {
            self.symbols.insert(
                expr.id,
                Symbol::Namespace {
                    name: name.to_string(),
                },
            );
            return Bound::Namespace(name.to_string());
        }

        self.error(format!("The name '{name}' does not exist in the current context"), expr.span);
        Bound::Value(TypeRef::Error)
    }

    /// A member of `type_name` reached by its simple name.
    fn simple_member(&mut self, type_name: &str, name: &str, expr: &Expr) -> Option<Bound> {
        let decls = self.decls;
        let declared = decls.get(type_name)?;
        let members: Vec<&DeclaredMember> = declared.members_named(name).collect();
        let first = *members.first()?;
        // Script members are reachable from every script context.
        let receiver = Receiver::Implicit {
            enforce_static: type_name != SCRIPT_CLASS,
        };
        if first.kind == MemberKind::Method {
            let candidates = members
                .iter()
                .filter(|m| m.kind == MemberKind::Method)
                .map(|m| Candidate {
                    symbol: declared.symbol_for(m),
                    variadic: false,
                })
                .collect();
            return Some(Bound::Methods(MethodGroup {
                owner: type_name.to_string(),
                name: name.to_string(),
                candidates,
                receiver,
            }));
        }
        let symbol = declared.symbol_for(first);
        self.check_static_access(&symbol, receiver, expr.span);
        Some(self.member_value(expr, first.kind, symbol))
    }

    fn member_value(&mut self, expr: &Expr, kind: MemberKind, symbol: MemberSymbol) -> Bound {
        let ty = symbol.ty.clone();
        let symbol = if kind == MemberKind::Property {
            Symbol::Property(symbol)
        } else {
            Symbol::Field(symbol)
        };
        self.symbols.insert(expr.id, symbol);
        Bound::Value(ty)
    }

    fn check_static_access(&mut self, symbol: &MemberSymbol, receiver: Receiver, span: Span) {
        let qualified = format!("{}.{}", symbol.containing_type, symbol.name);
        let needs_instance = match receiver {
            Receiver::Type => !symbol.is_static,
            Receiver::Implicit { enforce_static } => enforce_static && self.context.is_static && !symbol.is_static,
            Receiver::Instance => {
                if symbol.is_static {
                    self.error(
                        format!(
                            "Member '{qualified}' cannot be accessed with an instance reference; qualify it with a type name instead"
                        ),
                        span,
                    );
                }
                false
            }
        };
        if needs_instance {
            self.error(
                format!("An object reference is required for the non-static field, method, or property '{qualified}'"),
                span,
            );
        }
    }

    // ── Member access ───────────────────────────────────────────

    fn bind_member_access(&mut self, target: &Expr, name: &Ident, expr: &Expr) -> Bound {
        match self.bind_expr(target) {
            Bound::Namespace(namespace) => {
                let full = format!("{namespace}.{}", name.name);
                if let Some(host) = self.hosts.get(&full) {
                    let ty = TypeRef::from_host_name(host.full_name);
                    self.symbols.insert(expr.id, Symbol::Type { ty: ty.clone() });
                    Bound::Type(ty)
                } else if self.hosts.has_namespace(&full) {
                    self.symbols.insert(expr.id, Symbol::Namespace { name: full.clone() });
                    Bound::Namespace(full)
                } else {
                    self.error(
                        format!(
                            "The type or namespace name '{}' does not exist in the namespace '{namespace}' (are you missing an assembly reference?)",
                            name.name
                        ),
                        name.span,
                    );
                    Bound::Value(TypeRef::Error)
                }
            }
            Bound::Type(ty) => self.type_member(&ty, name, expr, Receiver::Type),
            Bound::Value(ty) if ty.is_error() => Bound::Value(TypeRef::Error),
            Bound::Value(TypeRef::Void) => {
                self.error("Operator '.' cannot be applied to operand of type 'void'", name.span);
                Bound::Value(TypeRef::Error)
            }
            Bound::Value(ty) => self.type_member(&ty, name, expr, Receiver::Instance),
            Bound::Methods(group) => {
                self.error(
                    format!("'{}' is a method, which is not valid in the given context", group.name),
                    target.span,
                );
                Bound::Value(TypeRef::Error)
            }
        }
    }

    /// `name` looked up on `ty`: declared members first, then host members
    /// along the base chain.
    fn type_member(&mut self, ty: &TypeRef, name: &Ident, expr: &Expr, receiver: Receiver) -> Bound {
        let decls = self.decls;
        if let TypeRef::User(type_name) = ty {
            if let Some(declared) = decls.get(type_name) {
                let members: Vec<&DeclaredMember> = declared.members_named(&name.name).collect();
                if let Some(&first) = members.first() {
                    if first.kind == MemberKind::Method {
                        let candidates = members
                            .iter()
                            .filter(|m| m.kind == MemberKind::Method)
                            .map(|m| Candidate {
                                symbol: declared.symbol_for(m),
                                variadic: false,
                            })
                            .collect();
                        return Bound::Methods(MethodGroup {
                            owner: type_name.clone(),
                            name: name.name.clone(),
                            candidates,
                            receiver,
                        });
                    }
                    let symbol = declared.symbol_for(first);
                    self.check_static_access(&symbol, receiver, name.span);
                    return self.member_value(expr, first.kind, symbol);
                }
            }
        }

        let host_name = match ty {
            TypeRef::Array(_) if name.name == "Length" && receiver == Receiver::Instance => {
                return Bound::Value(TypeRef::Int);
            }
            TypeRef::User(_) | TypeRef::Array(_) => Some("System.Object"),
            other => other.host_name(),
        };
        if let Some((declaring, members)) = host_name.and_then(|h| self.host_members(h, &name.name)) {
            if let Some(&first) = members.first() {
                if first.kind == MemberKind::Method {
                    let candidates = members
                        .iter()
                        .filter(|m| m.kind == MemberKind::Method)
                        .map(|m| Candidate {
                            symbol: self.host_symbol(declaring, m),
                            variadic: m.variadic,
                        })
                        .collect();
                    return Bound::Methods(MethodGroup {
                        owner: declaring.to_string(),
                        name: name.name.clone(),
                        candidates,
                        receiver,
                    });
                }
                let symbol = self.host_symbol(declaring, first);
                self.check_static_access(&symbol, receiver, name.span);
                return self.member_value(expr, first.kind, symbol);
            }
        }

        self.error(
            format!("'{ty}' does not contain a definition for '{}'", name.name),
            name.span,
        );
        Bound::Value(TypeRef::Error)
    }

    /// The first type along `full_name`'s base chain declaring `name`.
    fn host_members(&self, full_name: &'static str, name: &str) -> Option<(&'static str, Vec<&'static HostMember>)> {
        let mut current = Some(full_name);
        let mut steps = 0;
        while let Some(type_name) = current {
            steps += 1;
            if steps > 64 {
                return None;
            }
            let ty = self.hosts.get(type_name)?;
            let found: Vec<&'static HostMember> = ty.members_named(name).collect();
            if !found.is_empty() {
                return Some((ty.full_name, found));
            }
            current = ty.base;
        }
        None
    }

    fn host_symbol(&self, declaring: &str, member: &HostMember) -> MemberSymbol {
        MemberSymbol {
            containing_type: declaring.to_string(),
            name: member.name.to_string(),
            is_static: member.is_static,
            params: member.params.to_vec(),
            ty: member.ty.clone(),
            readonly: true,
            origin: SymbolOrigin::Host {
                module: self.hosts.module_of(declaring).unwrap_or_default().to_string(),
            },
        }
    }

    // ── Calls ───────────────────────────────────────────────────

    fn bind_invocation(&mut self, target: &Expr, args: &[Expr], expr: &Expr) -> Bound {
        let group = match self.bind_expr(target) {
            Bound::Methods(group) => group,
            Bound::Value(ty) if ty.is_error() => {
                self.bind_args(args);
                return Bound::Value(TypeRef::Error);
            }
            _ => {
                self.bind_args(args);
                self.error(
                    format!(
                        "Non-invocable member '{}' cannot be used like a method",
                        self.source_text(target)
                    ),
                    target.span,
                );
                return Bound::Value(TypeRef::Error);
            }
        };
        let arg_types = self.bind_args(args);
        let qualified = format!("{}.{}", group.owner, group.name);
        match self.resolve_overload(&group.candidates, &arg_types) {
            Some(chosen) => {
                self.check_static_access(&chosen.symbol, group.receiver, target.span);
                let ty = chosen.symbol.ty.clone();
                let symbol = Symbol::Method(chosen.symbol);
                self.symbols.insert(target.id, symbol.clone());
                self.symbols.insert(expr.id, symbol);
                Bound::Value(ty)
            }
            None => {
                self.report_no_overload(&qualified, &group.candidates, &arg_types, args, expr.span);
                Bound::Value(TypeRef::Error)
            }
        }
    }

    fn bind_args(&mut self, args: &[Expr]) -> Vec<TypeRef> {
        args.iter().map(|arg| self.value_of(arg)).collect()
    }

    fn applicable(&self, candidate: &Candidate, args: &[TypeRef]) -> bool {
        let params = &candidate.symbol.params;
        let arity_ok = if candidate.variadic {
            args.len() >= params.len()
        } else {
            args.len() == params.len()
        };
        arity_ok
            && args.iter().enumerate().all(|(i, arg)| match params.get(i) {
                Some(param) => self.convertible(arg, param),
                None => self.convertible(arg, &TypeRef::Object),
            })
    }

    /// Fixed-arity candidates first, then variadic ones. Among applicable
    /// candidates the one with the most exact parameter matches wins; ties go
    /// to declaration order.
    fn resolve_overload(&self, candidates: &[Candidate], args: &[TypeRef]) -> Option<Candidate> {
        for variadic in [false, true] {
            let mut best: Option<(&Candidate, usize)> = None;
            for candidate in candidates.iter().filter(|c| c.variadic == variadic) {
                if !self.applicable(candidate, args) {
                    continue;
                }
                let exact = candidate
                    .symbol
                    .params
                    .iter()
                    .zip(args)
                    .filter(|(param, arg)| param == arg)
                    .count();
                if best.map_or(true, |(_, score)| exact > score) {
                    best = Some((candidate, exact));
                }
            }
            if let Some((candidate, _)) = best {
                return Some(candidate.clone());
            }
        }
        None
    }

    fn report_no_overload(
        &mut self,
        qualified: &str,
        candidates: &[Candidate],
        arg_types: &[TypeRef],
        args: &[Expr],
        span: Span,
    ) {
        if arg_types.iter().any(TypeRef::is_error) {
            return;
        }
        let same_arity: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| {
                if c.variadic {
                    arg_types.len() >= c.symbol.params.len()
                } else {
                    arg_types.len() == c.symbol.params.len()
                }
            })
            .collect();
        match same_arity.as_slice() {
            [] => {
                let name = qualified.rsplit_once('.').map_or(qualified, |(_, n)| n);
                self.error(
                    format!("No overload for method '{name}' takes {} arguments", arg_types.len()),
                    span,
                );
            }
            [only] => {
                let mismatch = arg_types.iter().zip(args).enumerate().find(|(i, (arg, _))| {
                    let param = only.symbol.params.get(*i).unwrap_or(&TypeRef::Object);
                    !self.convertible(arg, param)
                });
                if let Some((i, (arg, expr))) = mismatch {
                    let param = only.symbol.params.get(i).unwrap_or(&TypeRef::Object).clone();
                    let message = format!("Argument {}: cannot convert from '{arg}' to '{param}'", i + 1);
                    self.error(message, expr.span);
                }
            }
            _ => {
                let list: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
                self.error(
                    format!(
                        "The call to '{qualified}' does not match any overload for argument types ({})",
                        list.join(", ")
                    ),
                    span,
                );
            }
        }
    }

    fn bind_creation(&mut self, ty: &TypeSyntax, args: &[Expr], expr: &Expr) -> Bound {
        let created = self.resolve_syntax(ty, true).unwrap_or_else(|| {
            self.error("'var' cannot be instantiated", ty.span);
            TypeRef::Error
        });
        let arg_types = self.bind_args(args);
        if created.is_error() {
            return Bound::Value(TypeRef::Error);
        }

        let decls = self.decls;
        let (owner, candidates) = match &created {
            TypeRef::User(name) => {
                let Some(declared) = decls.get(name) else {
                    return Bound::Value(created);
                };
                let mut candidates: Vec<Candidate> = declared
                    .constructors()
                    .map(|c| Candidate {
                        symbol: declared.symbol_for(c),
                        variadic: false,
                    })
                    .collect();
                if candidates.is_empty() {
                    candidates.push(Candidate {
                        symbol: MemberSymbol {
                            containing_type: name.clone(),
                            name: name.clone(),
                            is_static: false,
                            params: Vec::new(),
                            ty: TypeRef::Void,
                            readonly: true,
                            origin: SymbolOrigin::Source {
                                tree: declared.tree,
                                span: declared.span,
                            },
                        },
                        variadic: false,
                    });
                }
                (name.clone(), candidates)
            }
            other => {
                let hosted = other.host_name().and_then(|h| self.hosts.get(h));
                let candidates = hosted
                    .map(|h| {
                        h.constructors()
                            .map(|c| Candidate {
                                symbol: self.host_symbol(h.full_name, c),
                                variadic: c.variadic,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (other.to_string(), candidates)
            }
        };

        match self.resolve_overload(&candidates, &arg_types) {
            Some(chosen) => {
                self.symbols.insert(expr.id, Symbol::Method(chosen.symbol));
            }
            None if candidates.is_empty() || !arg_types.iter().any(TypeRef::is_error) => {
                self.error(
                    format!(
                        "'{owner}' does not contain a constructor that takes {} arguments",
                        arg_types.len()
                    ),
                    expr.span,
                );
            }
            None => {}
        }
        Bound::Value(created)
    }

    // ── Operators ───────────────────────────────────────────────

    fn binary_result(&mut self, op: BinOp, left: &TypeRef, right: &TypeRef, span: Span) -> TypeRef {
        let comparison = matches!(
            op,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne | BinOp::And | BinOp::Or
        );
        if left.is_error() || right.is_error() {
            return if comparison { TypeRef::Bool } else { TypeRef::Error };
        }
        let result = match op {
            BinOp::Add
                if (*left == TypeRef::String || *right == TypeRef::String)
                    && *left != TypeRef::Void
                    && *right != TypeRef::Void =>
            {
                Some(TypeRef::String)
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => numeric_promotion(left, right),
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                numeric_promotion(left, right).map(|_| TypeRef::Bool)
            }
            BinOp::Eq | BinOp::Ne => {
                let comparable = *left != TypeRef::Void
                    && *right != TypeRef::Void
                    && (numeric_promotion(left, right).is_some()
                        || self.convertible(left, right)
                        || self.convertible(right, left));
                comparable.then_some(TypeRef::Bool)
            }
            BinOp::And | BinOp::Or => {
                (*left == TypeRef::Bool && *right == TypeRef::Bool).then_some(TypeRef::Bool)
            }
        };
        result.unwrap_or_else(|| {
            self.error(
                format!(
                    "Operator '{}' cannot be applied to operands of type '{left}' and '{right}'",
                    op.symbol()
                ),
                span,
            );
            if comparison {
                TypeRef::Bool
            } else {
                TypeRef::Error
            }
        })
    }

    fn bind_unary(&mut self, op: UnaryOp, operand: &Expr) -> TypeRef {
        let (symbol, ty) = match op {
            UnaryOp::PreIncrement => return self.bind_increment("++", operand),
            UnaryOp::PreDecrement => return self.bind_increment("--", operand),
            UnaryOp::Neg => ("-", self.value_of(operand)),
            UnaryOp::Not => ("!", self.value_of(operand)),
        };
        let result = match (op, &ty) {
            (_, TypeRef::Error) => Some(TypeRef::Error),
            (UnaryOp::Neg, TypeRef::Char) => Some(TypeRef::Int),
            (UnaryOp::Neg, ty) if ty.is_numeric() => Some(ty.clone()),
            (UnaryOp::Not, TypeRef::Bool) => Some(TypeRef::Bool),
            _ => None,
        };
        result.unwrap_or_else(|| {
            self.error(
                format!("Operator '{symbol}' cannot be applied to operand of type '{ty}'"),
                operand.span,
            );
            TypeRef::Error
        })
    }

    fn bind_increment(&mut self, symbol: &str, operand: &Expr) -> TypeRef {
        let ty = self.value_of(operand);
        if ty.is_error() {
            return ty;
        }
        if !ty.is_numeric() {
            self.error(
                format!("Operator '{symbol}' cannot be applied to operand of type '{ty}'"),
                operand.span,
            );
            return TypeRef::Error;
        }
        self.check_assignable(
            operand,
            "The operand of an increment or decrement operator must be a variable, property or indexer",
        );
        ty
    }

    fn bind_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, span: Span) -> TypeRef {
        let target_ty = self.value_of(target);
        let value_ty = self.value_of(value);
        if !target_ty.is_error() {
            self.check_assignable(target, "The left-hand side of an assignment must be a variable, property or indexer");
        }
        match op.binary() {
            None => self.check_convertible(&value_ty, &target_ty, value.span),
            Some(bop) => {
                let result = self.binary_result(bop, &target_ty, &value_ty, span);
                if !result.is_error() {
                    self.check_convertible(&result, &target_ty, span);
                }
            }
        }
        target_ty
    }

    fn check_assignable(&mut self, target: &Expr, not_variable: &str) {
        let mut inner = target;
        while let ExprKind::Paren(e) = &inner.kind {
            inner = e;
        }
        match self.symbols.get(&inner.id).cloned() {
            Some(Symbol::Local { .. } | Symbol::Parameter { .. }) => {}
            Some(Symbol::Field(field)) => {
                let in_own_constructor = self.context.in_constructor
                    && !field.is_host()
                    && field.containing_type == self.context.containing;
                if field.readonly && !in_own_constructor {
                    self.error(
                        "A readonly field cannot be assigned to (except in a constructor or a variable initializer)",
                        target.span,
                    );
                }
            }
            Some(Symbol::Property(prop)) if prop.readonly => {
                self.error(
                    format!(
                        "Property or indexer '{}.{}' cannot be assigned to -- it is read only",
                        prop.containing_type, prop.name
                    ),
                    target.span,
                );
            }
            Some(Symbol::Property(_)) => {}
            _ => self.error(not_variable, target.span),
        }
    }

    fn source_text(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Name(name) => name.clone(),
            ExprKind::MemberAccess { target, name } => format!("{}.{}", self.source_text(target), name.name),
            ExprKind::PredefinedType(p) => p.keyword().to_string(),
            ExprKind::This => "this".to_string(),
            _ => "expression".to_string(),
        }
    }
}

fn literal_type(literal: &Literal) -> TypeRef {
    match literal {
        Literal::Int(v) if i32::try_from(*v).is_ok() => TypeRef::Int,
        Literal::Int(_) => TypeRef::Long,
        Literal::Double(_) => TypeRef::Double,
        Literal::String(_) => TypeRef::String,
        Literal::Char(_) => TypeRef::Char,
        Literal::Bool(_) => TypeRef::Bool,
        Literal::Null => TypeRef::Null,
    }
}

/// Result of an arithmetic operator over two numeric operands; at least `int`.
fn numeric_promotion(left: &TypeRef, right: &TypeRef) -> Option<TypeRef> {
    let rank = left.numeric_rank()?.max(right.numeric_rank()?);
    Some(match rank {
        0 | 1 => TypeRef::Int,
        2 => TypeRef::Long,
        _ => TypeRef::Double,
    })
}

fn is_statement_expression(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Invocation { .. }
            | ExprKind::Assign { .. }
            | ExprKind::ObjectCreation { .. }
            | ExprKind::Postfix { .. }
            | ExprKind::Unary {
                op: UnaryOp::PreIncrement | UnaryOp::PreDecrement,
                ..
            }
            | ExprKind::Missing
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::compilation::{Compilation, CompilationOptions, MetadataReference, OutputKind};
    use crate::host::{FixedModules, ModuleLister};
    use crate::syntax::walk::{walk_expr, walk_unit, Visitor};
    use crate::syntax::{ParseOptions, SourceKind};

    fn compile(src: &str, kind: SourceKind) -> (Compilation, SyntaxTree) {
        let tree = SyntaxTree::parse(src, "Editor", ParseOptions::new(kind)).unwrap();
        let references: Vec<_> = FixedModules::core()
            .loaded_modules()
            .into_iter()
            .filter_map(MetadataReference::from_module)
            .collect();
        let options = CompilationOptions::new(OutputKind::DynamicallyLinkedLibrary)
            .with_usings(vec!["System".into(), "System.IO".into()]);
        let compilation = Compilation::create("Test", options, vec![tree.clone()], references).unwrap();
        (compilation, tree)
    }

    fn model(src: &str) -> SemanticModel {
        let (compilation, tree) = compile(src, SourceKind::Script);
        compilation.semantic_model(&tree).unwrap()
    }

    fn errors(src: &str) -> Vec<String> {
        model(src).diagnostics().iter().map(|d| d.message.clone()).collect()
    }

    /// Every invocation in the tree with its bound symbol.
    struct Calls<'m> {
        model: &'m SemanticModel,
        found: Vec<Option<Symbol>>,
    }

    impl Visitor for Calls<'_> {
        fn visit_expr(&mut self, expr: &Expr) {
            if matches!(expr.kind, ExprKind::Invocation { .. }) {
                self.found.push(self.model.symbol_info(expr).cloned());
            }
            walk_expr(self, expr);
        }
    }

    fn calls(model: &SemanticModel) -> Vec<Option<Symbol>> {
        let mut calls = Calls {
            model,
            found: Vec::new(),
        };
        walk_unit(&mut calls, model.tree().root());
        calls.found
    }

    fn method(symbol: &Option<Symbol>) -> &MemberSymbol {
        match symbol {
            Some(Symbol::Method(m)) => m,
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn console_call_binds_to_host_method() {
        let m = model("static void F() { Console.WriteLine(\"hi\"); }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        let found = calls(&m);
        assert_eq!(found.len(), 1);
        let symbol = method(&found[0]);
        assert_eq!(symbol.containing_type, "System.Console");
        assert_eq!(symbol.name, "WriteLine");
        assert!(symbol.is_host());
        assert!(symbol.is_static);
    }

    #[test]
    fn fully_qualified_console_call() {
        let m = model("static void F() { System.Console.Write(1); }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        assert_eq!(method(&calls(&m)[0]).containing_type, "System.Console");
    }

    #[test]
    fn user_console_class_shadows_host() {
        let m = model("class Console { public static void WriteLine(string s) { } }\nstatic void F() { Console.WriteLine(\"x\"); }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        let found = calls(&m);
        let symbol = method(&found[0]);
        assert_eq!(symbol.containing_type, "Console");
        assert!(!symbol.is_host());
    }

    #[test]
    fn inherited_host_member_reports_declaring_type() {
        let m = model("static void F() { var w = new StringWriter(); w.WriteLine(\"x\"); }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        let found = calls(&m);
        assert_eq!(method(&found[0]).containing_type, "System.IO.TextWriter");
    }

    #[test]
    fn unknown_name() {
        let errs = errors("static int F() { return y; }");
        assert_eq!(errs, vec!["The name 'y' does not exist in the current context"]);
    }

    #[test]
    fn missing_member() {
        let errs = errors("static void F() { Console.Frobnicate(); }");
        assert_eq!(errs, vec!["'System.Console' does not contain a definition for 'Frobnicate'"]);
    }

    #[test]
    fn return_type_mismatch() {
        let errs = errors("static int F() { return \"s\"; }");
        assert_eq!(errs, vec!["Cannot implicitly convert type 'string' to 'int'"]);
    }

    #[test]
    fn numeric_widening_is_implicit() {
        assert!(errors("static double F() { int i = 1; long l = i; return l + 'c'; }").is_empty());
        let errs = errors("static int F() { return 2.5; }");
        assert_eq!(errs, vec!["Cannot implicitly convert type 'double' to 'int'"]);
    }

    #[test]
    fn boxing_to_object() {
        assert!(errors("static object F() { return 1 + 1; }").is_empty());
    }

    #[test]
    fn string_concatenation() {
        let m = model("static string F() { return \"a\" + 1; }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
    }

    #[test]
    fn invalid_operator_operands() {
        let errs = errors("static bool F() { return true + 1 > 0; }");
        assert_eq!(errs, vec!["Operator '+' cannot be applied to operands of type 'bool' and 'int'"]);
    }

    #[test]
    fn condition_must_be_bool() {
        let errs = errors("static void F() { if (1) { } }");
        assert_eq!(errs, vec!["Cannot implicitly convert type 'int' to 'bool'"]);
    }

    #[test]
    fn break_outside_loop() {
        let errs = errors("static void F() { break; }");
        assert_eq!(errs, vec!["No enclosing loop out of which to break or continue"]);
        assert!(errors("static void F() { while (true) { break; } for (int i = 0; i < 3; i++) continue; }").is_empty());
    }

    #[test]
    fn expression_statement_must_have_effect() {
        let errs = errors("static void F() { int x = 1; x + 1; }");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("Only assignment, call"));
    }

    #[test]
    fn instance_member_from_static_context() {
        let errs = errors("class A { int n; static int F() { return n; } }");
        assert_eq!(
            errs,
            vec!["An object reference is required for the non-static field, method, or property 'A.n'"]
        );
        assert!(errors("class A { int n; int F() { return n; } }").is_empty());
    }

    #[test]
    fn script_members_visible_everywhere_in_script() {
        let src = "int counter = 0;\nstatic int Next() { counter++; return counter; }\nclass Helper { public static int Twice() => Next() * 2; }";
        assert!(errors(src).is_empty(), "{:?}", errors(src));
    }

    #[test]
    fn overloads_pick_by_arity_then_exactness() {
        let m = model("static string F() { return \"abc\".Substring(1) + \"abc\".Substring(0, 1); }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        let found = calls(&m);
        assert_eq!(method(&found[0]).params.len(), 1);
        assert_eq!(method(&found[1]).params.len(), 2);
    }

    #[test]
    fn variadic_host_method() {
        assert!(errors("static void F() { Console.WriteLine(\"{0} {1}\", 1, true); }").is_empty());
    }

    #[test]
    fn wrong_argument_count() {
        let errs = errors("static void F() { Math.Sqrt(1, 2); }");
        assert_eq!(errs, vec!["No overload for method 'Sqrt' takes 2 arguments"]);
    }

    #[test]
    fn wrong_argument_type() {
        let errs = errors("static void F() { Math.Sqrt(\"x\"); }");
        assert_eq!(errs, vec!["Argument 1: cannot convert from 'string' to 'double'"]);
    }

    #[test]
    fn readonly_field_assignment() {
        let errs = errors("class A { readonly int n; A() { n = 1; } void F() { n = 2; } }");
        assert_eq!(
            errs,
            vec!["A readonly field cannot be assigned to (except in a constructor or a variable initializer)"]
        );
    }

    #[test]
    fn getter_only_property_assignment() {
        let errs = errors("class A { public int P { get; } void F() { P = 2; } }");
        assert_eq!(errs, vec!["Property or indexer 'A.P' cannot be assigned to -- it is read only"]);
    }

    #[test]
    fn var_locals_take_initializer_type() {
        let m = model("static int F() { var s = \"x\"; return s.Length; }");
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        let errs = errors("static void F() { var n = null; }");
        assert_eq!(errs, vec!["Cannot assign <null> to an implicitly-typed variable"]);
    }

    #[test]
    fn var_script_field_inferred() {
        let src = "var greeting = \"hi\";\nstatic int F() { return greeting.Length; }";
        assert!(errors(src).is_empty(), "{:?}", errors(src));
    }

    #[test]
    fn duplicate_local() {
        let errs = errors("static void F(int a) { int a = 1; }");
        assert_eq!(errs, vec!["A local or parameter named 'a' is already defined in this scope"]);
    }

    #[test]
    fn object_creation_checks_constructors() {
        assert!(errors("class P { P(int x) { } static P Make() => new P(1); }").is_empty());
        let errs = errors("class P { P(int x) { } static P Make() => new P(); }");
        assert_eq!(errs, vec!["'P' does not contain a constructor that takes 0 arguments"]);
        assert!(errors("static object F() => new System.Text.StringBuilder(\"x\");").is_empty());
    }

    #[test]
    fn void_return_with_value() {
        let errs = errors("class A { void F() { return 1; } }");
        assert_eq!(
            errs,
            vec!["Since 'A.F' returns void, a return keyword must not be followed by an object expression"]
        );
    }

    #[test]
    fn expression_types_recorded() {
        struct Literals<'m> {
            model: &'m SemanticModel,
            seen: Vec<TypeRef>,
        }
        impl Visitor for Literals<'_> {
            fn visit_expr(&mut self, expr: &Expr) {
                if matches!(expr.kind, ExprKind::Binary { .. }) {
                    self.seen.push(self.model.type_info(expr).cloned().unwrap());
                }
                walk_expr(self, expr);
            }
        }
        let m = model("static object F() { return 1 + 2147483648; }");
        let mut v = Literals {
            model: &m,
            seen: Vec::new(),
        };
        walk_unit(&mut v, m.tree().root());
        assert_eq!(v.seen, vec![TypeRef::Long]);
    }

    #[test]
    fn interactive_statements_bind() {
        let (compilation, tree) = compile("int x = 2;\nConsole.WriteLine(x * 3);", SourceKind::Interactive);
        let m = compilation.semantic_model(&tree).unwrap();
        assert!(m.diagnostics().is_empty(), "{:?}", m.diagnostics());
        assert_eq!(method(&calls(&m)[0]).name, "WriteLine");
    }
}
