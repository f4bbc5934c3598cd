//! Syntax node types for the host script grammar.

use serde::Serialize;

/// Byte range into the source text of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// Identity of an expression node within one parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorKind {
    Semicolon,
    CloseParen,
    CloseBrace,
}

impl TerminatorKind {
    pub fn text(self) -> &'static str {
        match self {
            TerminatorKind::Semicolon => ";",
            TerminatorKind::CloseParen => ")",
            TerminatorKind::CloseBrace => "}",
        }
    }
}

/// A token the grammar requires at this position.
///
/// When the source lacks it, the parser records it as `missing` with a
/// zero-width span right after the preceding token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminator {
    pub kind: TerminatorKind,
    pub span: Span,
    pub missing: bool,
}

/// Root of one tree.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub usings: Vec<UsingDirective>,
    pub members: Vec<Member>,
    /// Top-level statements (interactive trees only).
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// `using System.Text;`
#[derive(Debug, Clone)]
pub struct UsingDirective {
    pub namespace: Vec<String>,
    pub semicolon: Terminator,
    pub span: Span,
}

impl UsingDirective {
    pub fn dotted(&self) -> String {
        self.namespace.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Readonly,
    Const,
}

#[derive(Debug, Clone, Default)]
pub struct Modifiers {
    pub items: Vec<(Modifier, Span)>,
}

impl Modifiers {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.items.iter().any(|(m, _)| *m == modifier)
    }

    /// Constants are implicitly static.
    pub fn is_static(&self) -> bool {
        self.has(Modifier::Static) || self.has(Modifier::Const)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Member {
    Class(ClassDecl),
    Field(FieldDecl),
    Property(PropertyDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

impl Member {
    pub fn name(&self) -> &Ident {
        match self {
            Member::Class(c) => &c.name,
            Member::Field(f) => &f.name,
            Member::Property(p) => &p.name,
            Member::Method(m) => &m.name,
            Member::Constructor(c) => &c.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Member::Class(c) => c.span,
            Member::Field(f) => f.span,
            Member::Property(p) => p.span,
            Member::Method(m) => m.span,
            Member::Constructor(c) => c.span,
        }
    }
}

/// `class Helper { ... }`
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub members: Vec<Member>,
    pub close_brace: Terminator,
    pub span: Span,
}

/// `public static readonly StringWriter __Console = new StringWriter();`
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeSyntax,
    pub name: Ident,
    pub init: Option<Expr>,
    pub semicolon: Terminator,
    pub span: Span,
}

/// `public static object Result { get; set; }`
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub modifiers: Modifiers,
    pub ty: TypeSyntax,
    pub name: Ident,
    pub has_getter: bool,
    pub has_setter: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub return_type: TypeSyntax,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: MethodBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeSyntax,
    pub name: Ident,
}

#[derive(Debug, Clone)]
pub enum MethodBody {
    Block(Block),
    /// `=> expr;`
    Expr { expr: Expr, semicolon: Terminator },
}

#[derive(Debug, Clone)]
pub struct TypeSyntax {
    pub kind: TypeSyntaxKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSyntaxKind {
    Predefined(PredefinedType),
    /// Dotted name: `StringWriter`, `System.IO.StringWriter`.
    Named(Vec<String>),
    Array(Box<TypeSyntax>),
    /// Implicitly typed local or script field.
    Var,
}

impl PartialEq for TypeSyntax {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedType {
    Object,
    String,
    Int,
    Long,
    Double,
    Bool,
    Char,
    Void,
}

impl PredefinedType {
    pub fn keyword(self) -> &'static str {
        match self {
            PredefinedType::Object => "object",
            PredefinedType::String => "string",
            PredefinedType::Int => "int",
            PredefinedType::Long => "long",
            PredefinedType::Double => "double",
            PredefinedType::Bool => "bool",
            PredefinedType::Char => "char",
            PredefinedType::Void => "void",
        }
    }
}

/// `{ ... }`
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub close_brace: Terminator,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    /// `var x = 1;` or `int x;`
    Local {
        ty: TypeSyntax,
        name: Ident,
        init: Option<Expr>,
        semicolon: Terminator,
    },
    Expr {
        expr: Expr,
        semicolon: Terminator,
    },
    Return {
        value: Option<Expr>,
        semicolon: Terminator,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Vec<Expr>,
        body: Box<Stmt>,
    },
    Break {
        semicolon: Terminator,
    },
    Continue {
        semicolon: Terminator,
    },
    /// A lone `;`.
    Empty,
    /// Tokens skipped while recovering from a syntax error.
    Error,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// Simple name: `x`, `Console`, `Helper`.
    Name(String),
    This,
    /// Predefined type keyword used as a receiver: `string.Join(...)`.
    PredefinedType(PredefinedType),
    /// `target.name`
    MemberAccess {
        target: Box<Expr>,
        name: Ident,
    },
    /// `target(args)`
    Invocation {
        target: Box<Expr>,
        args: Vec<Expr>,
        close_paren: Terminator,
    },
    /// `new T(args)`
    ObjectCreation {
        ty: TypeSyntax,
        args: Vec<Expr>,
        close_paren: Terminator,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `x++`, `x--`
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },
    /// `c ? a : b`
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// An expression was required here but the source had none.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Double(f64),
    String(String),
    Char(char),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    PreIncrement,
    PreDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
        }
    }
}
