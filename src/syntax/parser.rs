use super::ast::*;
use super::diagnostic::Diagnostic;
use super::lexer::{SpannedToken, Token};
use super::tree::SourceKind;

pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug)]
pub struct ParseOutput {
    pub root: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a token stream into a compilation unit.
///
/// Syntax errors are recovered from and reported in the output. The only
/// failure is nesting deeper than `max_depth`.
pub fn parse(tokens: Vec<SpannedToken>, kind: SourceKind, max_depth: usize) -> Result<ParseOutput, Diagnostic> {
    let mut parser = Parser::new(tokens, kind, max_depth);
    let root = parser.parse_compilation_unit();
    match parser.fatal {
        Some(diagnostic) => Err(diagnostic),
        None => Ok(ParseOutput {
            root,
            diagnostics: parser.diagnostics,
        }),
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    kind: SourceKind,
    diagnostics: Vec<Diagnostic>,
    next_id: u32,
    depth: usize,
    max_depth: usize,
    fatal: Option<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, kind: SourceKind, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            kind,
            diagnostics: Vec::new(),
            next_id: 0,
            depth: 0,
            max_depth,
            fatal: None,
        }
    }

    fn parse_compilation_unit(&mut self) -> CompilationUnit {
        let mut unit = CompilationUnit::default();

        while matches!(self.peek(), Token::Using) {
            match self.parse_using() {
                Ok(u) => unit.usings.push(u),
                Err(e) => {
                    self.diagnostics.push(e);
                    self.recover();
                }
            }
        }

        while !self.at_eof() && !self.is_fatal() {
            match self.peek() {
                Token::Semicolon => {
                    self.advance();
                }
                Token::RBrace => {
                    self.diagnostics.push(Diagnostic::syntax(
                        "Type or namespace definition, or end-of-file expected",
                        self.span(),
                    ));
                    self.advance();
                }
                Token::Using => {
                    self.diagnostics.push(Diagnostic::syntax(
                        "A using clause must precede all other elements defined in the namespace",
                        self.span(),
                    ));
                    self.recover();
                }
                _ if self.starts_member() => match self.parse_member(None) {
                    Ok(member) => {
                        if self.kind == SourceKind::Regular && !matches!(member, Member::Class(_)) {
                            self.diagnostics.push(Diagnostic::syntax(
                                "Members can only be declared at the top level of script code",
                                member.name().span,
                            ));
                        }
                        unit.members.push(member);
                    }
                    Err(e) => {
                        self.diagnostics.push(e);
                        self.recover();
                    }
                },
                _ => {
                    let start = self.span();
                    match self.parse_stmt() {
                        Ok(stmt) => {
                            if self.kind != SourceKind::Interactive {
                                self.diagnostics.push(Diagnostic::syntax(
                                    "Top-level statements are only allowed in interactive code",
                                    start,
                                ));
                            }
                            unit.statements.push(stmt);
                        }
                        Err(e) => {
                            self.diagnostics.push(e);
                            self.recover();
                        }
                    }
                }
            }
        }

        unit.span = Span::new(0, self.span().end);
        unit
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).map_or(&Token::Eof, |t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens.get(self.pos).map_or(Span::new(0, 0), |t| t.span)
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    fn advance(&mut self) -> Span {
        let span = self.span();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, Diagnostic> {
        if self.peek() == expected {
            Ok(self.advance())
        } else {
            Err(Diagnostic::syntax(
                format!("{} expected, found {}", expected.describe(), self.peek().describe()),
                self.span(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, Diagnostic> {
        if let Token::Ident(name) = self.peek().clone() {
            let span = self.advance();
            Ok(Ident { name, span })
        } else {
            Err(Diagnostic::syntax(
                format!("Identifier expected, found {}", self.peek().describe()),
                self.span(),
            ))
        }
    }

    /// Consume a required token, or record it as missing right after the
    /// previous token.
    fn expect_terminator(&mut self, kind: TerminatorKind) -> Terminator {
        let token = match kind {
            TerminatorKind::Semicolon => Token::Semicolon,
            TerminatorKind::CloseParen => Token::RParen,
            TerminatorKind::CloseBrace => Token::RBrace,
        };
        if self.peek() == &token {
            let span = self.advance();
            Terminator { kind, span, missing: false }
        } else {
            let span = Span::at(self.prev_end());
            self.diagnostics.push(Diagnostic::syntax(format!("'{}' expected", kind.text()), span));
            Terminator { kind, span, missing: true }
        }
    }

    /// Skip to just past the next `;`, or up to the next `}`.
    fn recover(&mut self) {
        loop {
            match self.peek() {
                Token::Semicolon => {
                    self.advance();
                    break;
                }
                Token::RBrace | Token::Eof => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Run `f` one nesting level deeper. Exceeding the limit aborts the parse.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Diagnostic>) -> Result<T, Diagnostic> {
        self.chain_link()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Go one nesting level deeper. Exceeding the limit aborts the parse.
    /// Links of left-deep chains (`a + b + c`, `a.b.c()`) count too; the
    /// caller restores `self.depth` once the chain ends.
    fn chain_link(&mut self) -> Result<(), Diagnostic> {
        if self.depth >= self.max_depth {
            let diagnostic = Diagnostic::syntax(
                format!("Nesting exceeds the maximum depth of {}", self.max_depth),
                self.span(),
            );
            self.fatal.get_or_insert_with(|| diagnostic.clone());
            return Err(diagnostic);
        }
        self.depth += 1;
        Ok(())
    }

    fn node(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr { id, kind, span }
    }

    fn predefined(token: &Token) -> Option<PredefinedType> {
        Some(match token {
            Token::ObjectTy => PredefinedType::Object,
            Token::StringTy => PredefinedType::String,
            Token::IntTy => PredefinedType::Int,
            Token::LongTy => PredefinedType::Long,
            Token::DoubleTy => PredefinedType::Double,
            Token::BoolTy => PredefinedType::Bool,
            Token::CharTy => PredefinedType::Char,
            Token::VoidTy => PredefinedType::Void,
            _ => return None,
        })
    }

    /// Index just past a type starting at `index`, without consuming anything.
    fn scan_type(&self, index: usize) -> Option<usize> {
        let mut i = index;
        match self.token_at(i) {
            Token::Var => i += 1,
            Token::Ident(_) => {
                i += 1;
                while matches!(self.token_at(i), Token::Dot) && matches!(self.token_at(i + 1), Token::Ident(_)) {
                    i += 2;
                }
            }
            t if Self::predefined(t).is_some() => i += 1,
            _ => return None,
        }
        while matches!(self.token_at(i), Token::LBracket) && matches!(self.token_at(i + 1), Token::RBracket) {
            i += 2;
        }
        Some(i)
    }

    /// `Type name` at the cursor; returns the token after the name.
    fn declaration_follow(&self) -> Option<&Token> {
        let after_type = self.scan_type(self.pos)?;
        if matches!(self.token_at(after_type), Token::Ident(_)) {
            Some(self.token_at(after_type + 1))
        } else {
            None
        }
    }

    fn starts_member(&self) -> bool {
        match self.peek() {
            Token::Public
            | Token::Private
            | Token::Protected
            | Token::Internal
            | Token::Static
            | Token::Readonly
            | Token::Const
            | Token::Class => true,
            _ => match self.declaration_follow() {
                Some(Token::LParen | Token::LBrace | Token::FatArrow) => true,
                // Interactive code declares variables as statements.
                Some(_) => self.kind != SourceKind::Interactive,
                None => false,
            },
        }
    }

    fn looks_like_local(&self) -> bool {
        self.declaration_follow()
            .is_some_and(|follow| !matches!(follow, Token::LParen))
    }

    // ── Declarations ──────────────────────────────────────────────

    fn parse_using(&mut self) -> Result<UsingDirective, Diagnostic> {
        let start = self.advance().start;
        let mut namespace = vec![self.expect_ident()?.name];
        while self.eat(&Token::Dot) {
            namespace.push(self.expect_ident()?.name);
        }
        let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
        Ok(UsingDirective {
            namespace,
            semicolon,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            let modifier = match self.peek() {
                Token::Public => Modifier::Public,
                Token::Private => Modifier::Private,
                Token::Protected => Modifier::Protected,
                Token::Internal => Modifier::Internal,
                Token::Static => Modifier::Static,
                Token::Readonly => Modifier::Readonly,
                Token::Const => Modifier::Const,
                _ => break,
            };
            let span = self.advance();
            if modifiers.has(modifier) {
                self.diagnostics.push(Diagnostic::syntax(
                    format!("Duplicate '{}' modifier", Self::modifier_keyword(modifier)),
                    span,
                ));
            }
            modifiers.items.push((modifier, span));
        }
        modifiers
    }

    fn modifier_keyword(modifier: Modifier) -> &'static str {
        match modifier {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Internal => "internal",
            Modifier::Static => "static",
            Modifier::Readonly => "readonly",
            Modifier::Const => "const",
        }
    }

    fn parse_member(&mut self, enclosing: Option<&str>) -> Result<Member, Diagnostic> {
        let start = self.span().start;
        let modifiers = self.parse_modifiers();

        if matches!(self.peek(), Token::Class) {
            return self.parse_class(modifiers, start).map(Member::Class);
        }

        let is_constructor = enclosing
            .is_some_and(|class_name| matches!(self.peek(), Token::Ident(n) if n == class_name))
            && matches!(self.token_at(self.pos + 1), Token::LParen);
        if is_constructor {
            let name = self.expect_ident()?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(Member::Constructor(ConstructorDecl {
                modifiers,
                name,
                params,
                body,
                span: Span::new(start, self.prev_end()),
            }));
        }

        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        match self.peek() {
            Token::LParen => {
                let params = self.parse_params()?;
                let body = match self.peek() {
                    Token::LBrace => MethodBody::Block(self.parse_block()?),
                    Token::FatArrow => {
                        self.advance();
                        let expr = self.parse_expr()?;
                        let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
                        MethodBody::Expr { expr, semicolon }
                    }
                    other => {
                        return Err(Diagnostic::syntax(
                            format!("'{{' or '=>' expected, found {}", other.describe()),
                            self.span(),
                        ))
                    }
                };
                Ok(Member::Method(MethodDecl {
                    modifiers,
                    return_type: ty,
                    name,
                    params,
                    body,
                    span: Span::new(start, self.prev_end()),
                }))
            }
            Token::LBrace => {
                self.advance();
                let mut has_getter = false;
                let mut has_setter = false;
                while !matches!(self.peek(), Token::RBrace | Token::Eof) {
                    let accessor = self.expect_ident()?;
                    match accessor.name.as_str() {
                        "get" => has_getter = true,
                        "set" => has_setter = true,
                        _ => {
                            return Err(Diagnostic::syntax("A get or set accessor expected", accessor.span));
                        }
                    }
                    self.expect(&Token::Semicolon)?;
                }
                self.expect_terminator(TerminatorKind::CloseBrace);
                Ok(Member::Property(PropertyDecl {
                    modifiers,
                    ty,
                    name,
                    has_getter,
                    has_setter,
                    span: Span::new(start, self.prev_end()),
                }))
            }
            _ => {
                let init = if self.eat(&Token::Eq) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
                Ok(Member::Field(FieldDecl {
                    modifiers,
                    ty,
                    name,
                    init,
                    semicolon,
                    span: Span::new(start, self.prev_end()),
                }))
            }
        }
    }

    fn parse_class(&mut self, modifiers: Modifiers, start: usize) -> Result<ClassDecl, Diagnostic> {
        self.nested(|p| {
            p.advance(); // class
            let name = p.expect_ident()?;
            p.expect(&Token::LBrace)?;
            let mut members = Vec::new();
            while !matches!(p.peek(), Token::RBrace | Token::Eof) && !p.is_fatal() {
                match p.parse_member(Some(&name.name)) {
                    Ok(member) => members.push(member),
                    Err(e) => {
                        p.diagnostics.push(e);
                        p.recover();
                    }
                }
            }
            let close_brace = p.expect_terminator(TerminatorKind::CloseBrace);
            Ok(ClassDecl {
                modifiers,
                name,
                members,
                close_brace,
                span: Span::new(start, p.prev_end()),
            })
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, Diagnostic> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                let name = self.expect_ident()?;
                params.push(Param { ty, name });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect_terminator(TerminatorKind::CloseParen);
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<TypeSyntax, Diagnostic> {
        let start = self.span().start;
        let kind = match self.peek().clone() {
            Token::Var => {
                self.advance();
                TypeSyntaxKind::Var
            }
            Token::Ident(first) => {
                self.advance();
                let mut parts = vec![first];
                while matches!(self.peek(), Token::Dot) && matches!(self.token_at(self.pos + 1), Token::Ident(_)) {
                    self.advance();
                    parts.push(self.expect_ident()?.name);
                }
                TypeSyntaxKind::Named(parts)
            }
            other => match Self::predefined(&other) {
                Some(p) => {
                    self.advance();
                    TypeSyntaxKind::Predefined(p)
                }
                None => {
                    return Err(Diagnostic::syntax(
                        format!("Type expected, found {}", other.describe()),
                        self.span(),
                    ))
                }
            },
        };
        let mut ty = TypeSyntax {
            kind,
            span: Span::new(start, self.prev_end()),
        };
        while matches!(self.peek(), Token::LBracket) && matches!(self.token_at(self.pos + 1), Token::RBracket) {
            self.advance();
            self.advance();
            ty = TypeSyntax {
                kind: TypeSyntaxKind::Array(Box::new(ty)),
                span: Span::new(start, self.prev_end()),
            };
        }
        Ok(ty)
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        let start = self.expect(&Token::LBrace)?.start;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Token::RBrace | Token::Eof) && !self.is_fatal() {
            let from = self.span().start;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.diagnostics.push(e);
                    self.recover();
                    stmts.push(Stmt {
                        kind: StmtKind::Error,
                        span: Span::new(from, self.prev_end().max(from)),
                    });
                }
            }
        }
        let close_brace = self.expect_terminator(TerminatorKind::CloseBrace);
        Ok(Block {
            stmts,
            close_brace,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        self.nested(Self::parse_stmt_inner)
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.span().start;
        let kind = match self.peek() {
            Token::LBrace => StmtKind::Block(self.parse_block()?),
            Token::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            Token::Return => {
                self.advance();
                let value = if matches!(self.peek(), Token::Semicolon | Token::RBrace | Token::Eof) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
                StmtKind::Return { value, semicolon }
            }
            Token::If => {
                self.advance();
                self.expect(&Token::LParen)?;
                let condition = self.parse_expr()?;
                self.expect_terminator(TerminatorKind::CloseParen);
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                StmtKind::If {
                    condition,
                    then_branch,
                    else_branch,
                }
            }
            Token::While => {
                self.advance();
                self.expect(&Token::LParen)?;
                let condition = self.parse_expr()?;
                self.expect_terminator(TerminatorKind::CloseParen);
                let body = Box::new(self.parse_stmt()?);
                StmtKind::While { condition, body }
            }
            Token::For => self.parse_for()?,
            Token::Break => {
                self.advance();
                StmtKind::Break {
                    semicolon: self.expect_terminator(TerminatorKind::Semicolon),
                }
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue {
                    semicolon: self.expect_terminator(TerminatorKind::Semicolon),
                }
            }
            _ if self.looks_like_local() => self.parse_local()?,
            _ => {
                let expr = self.parse_expr()?;
                let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
                StmtKind::Expr { expr, semicolon }
            }
        };
        Ok(Stmt {
            kind,
            span: Span::new(start, self.prev_end().max(start)),
        })
    }

    fn parse_local(&mut self) -> Result<StmtKind, Diagnostic> {
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let init = if self.eat(&Token::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
        Ok(StmtKind::Local {
            ty,
            name,
            init,
            semicolon,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, Diagnostic> {
        self.advance(); // for
        self.expect(&Token::LParen)?;

        let init = if self.eat(&Token::Semicolon) {
            None
        } else {
            let start = self.span().start;
            let kind = if self.looks_like_local() {
                self.parse_local()?
            } else {
                let expr = self.parse_expr()?;
                let semicolon = self.expect_terminator(TerminatorKind::Semicolon);
                StmtKind::Expr { expr, semicolon }
            };
            Some(Box::new(Stmt {
                kind,
                span: Span::new(start, self.prev_end()),
            }))
        };

        let condition = if matches!(self.peek(), Token::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semicolon)?;

        let mut step = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                step.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect_terminator(TerminatorKind::CloseParen);

        let body = Box::new(self.parse_stmt()?);
        Ok(StmtKind::For {
            init,
            condition,
            step,
            body,
        })
    }

    // ── Expression parsing (precedence climbing) ──────────────────

    fn parse_expr(&mut self) -> Result<Expr, Diagnostic> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let target = self.parse_conditional()?;
        let op = match self.peek() {
            Token::Eq => AssignOp::Assign,
            Token::PlusEq => AssignOp::Add,
            Token::MinusEq => AssignOp::Sub,
            Token::StarEq => AssignOp::Mul,
            Token::SlashEq => AssignOp::Div,
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_expr()?;
        let span = target.span.merge(value.span);
        Ok(self.node(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_conditional(&mut self) -> Result<Expr, Diagnostic> {
        let condition = self.parse_or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let when_true = self.parse_expr()?;
        self.expect(&Token::Colon)?;
        let when_false = self.parse_expr()?;
        let span = condition.span.merge(when_false.span);
        Ok(self.node(
            ExprKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
            span,
        ))
    }

    /// Left-associative binary level: `next (op next)*`.
    fn parse_binary(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, Diagnostic>,
        op_for: fn(&Token) -> Option<BinOp>,
    ) -> Result<Expr, Diagnostic> {
        let depth = self.depth;
        let result = self.parse_binary_chain(next, op_for);
        self.depth = depth;
        result
    }

    fn parse_binary_chain(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, Diagnostic>,
        op_for: fn(&Token) -> Option<BinOp>,
    ) -> Result<Expr, Diagnostic> {
        let mut left = next(self)?;
        while let Some(op) = op_for(self.peek()) {
            self.chain_link()?;
            self.advance();
            let right = next(self)?;
            let span = left.span.merge(right.span);
            left = self.node(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_and, |t| matches!(t, Token::Or).then_some(BinOp::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_equality, |t| matches!(t, Token::And).then_some(BinOp::And))
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_relational, |t| match t {
            Token::EqEq => Some(BinOp::Eq),
            Token::Ne => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_additive, |t| match t {
            Token::Lt => Some(BinOp::Lt),
            Token::Gt => Some(BinOp::Gt),
            Token::Le => Some(BinOp::Le),
            Token::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_multiplicative, |t| match t {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_binary(Self::parse_unary, |t| match t {
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            Token::PlusPlus => UnaryOp::PreIncrement,
            Token::MinusMinus => UnaryOp::PreDecrement,
            Token::Plus => {
                self.advance();
                return self.nested(Self::parse_unary);
            }
            _ => return self.parse_postfix(),
        };
        let start = self.advance();
        let operand = self.nested(Self::parse_unary)?;
        let span = start.merge(operand.span);
        Ok(self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let depth = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = depth;
        result
    }

    fn parse_postfix_chain(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek(), Token::Dot | Token::LParen | Token::PlusPlus | Token::MinusMinus) {
                self.chain_link()?;
            }
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    let span = expr.span.merge(name.span);
                    expr = self.node(
                        ExprKind::MemberAccess {
                            target: Box::new(expr),
                            name,
                        },
                        span,
                    );
                }
                Token::LParen => {
                    let args = self.parse_args()?;
                    let close_paren = self.expect_terminator(TerminatorKind::CloseParen);
                    let span = Span::new(expr.span.start, self.prev_end());
                    expr = self.node(
                        ExprKind::Invocation {
                            target: Box::new(expr),
                            args,
                            close_paren,
                        },
                        span,
                    );
                }
                Token::PlusPlus | Token::MinusMinus => {
                    let op = if matches!(self.peek(), Token::PlusPlus) {
                        PostfixOp::Increment
                    } else {
                        PostfixOp::Decrement
                    };
                    let end = self.advance();
                    let span = expr.span.merge(end);
                    expr = self.node(
                        ExprKind::Postfix {
                            op,
                            operand: Box::new(expr),
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `(a, b, c` up to, not including, the closing paren.
    fn parse_args(&mut self) -> Result<Vec<Expr>, Diagnostic> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let span = self.span();
        let kind = match self.peek().clone() {
            Token::Int(v) => ExprKind::Literal(Literal::Int(v)),
            Token::Double(v) => ExprKind::Literal(Literal::Double(v)),
            Token::Str(s) => ExprKind::Literal(Literal::String(s)),
            Token::Char(c) => ExprKind::Literal(Literal::Char(c)),
            Token::True => ExprKind::Literal(Literal::Bool(true)),
            Token::False => ExprKind::Literal(Literal::Bool(false)),
            Token::Null => ExprKind::Literal(Literal::Null),
            Token::Ident(name) => ExprKind::Name(name),
            Token::This => ExprKind::This,
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_terminator(TerminatorKind::CloseParen);
                let span = Span::new(span.start, self.prev_end());
                return Ok(self.node(ExprKind::Paren(Box::new(inner)), span));
            }
            Token::New => {
                self.advance();
                let ty = self.parse_type()?;
                let args = self.parse_args()?;
                let close_paren = self.expect_terminator(TerminatorKind::CloseParen);
                let span = Span::new(span.start, self.prev_end());
                return Ok(self.node(ExprKind::ObjectCreation { ty, args, close_paren }, span));
            }
            other => match Self::predefined(&other) {
                Some(p) if p != PredefinedType::Void => ExprKind::PredefinedType(p),
                _ => {
                    return Err(Diagnostic::syntax(
                        format!("Invalid expression term {}", other.describe()),
                        span,
                    ))
                }
            },
        };
        self.advance();
        Ok(self.node(kind, span))
    }
}
