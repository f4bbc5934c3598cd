//! Read-only traversal over a compilation unit.
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending.

use super::ast::*;

pub trait Visitor {
    fn visit_member(&mut self, member: &Member) {
        walk_member(self, member);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_terminator(&mut self, _terminator: &Terminator) {}
}

pub fn walk_unit<V: Visitor + ?Sized>(v: &mut V, unit: &CompilationUnit) {
    for using in &unit.usings {
        v.visit_terminator(&using.semicolon);
    }
    for member in &unit.members {
        v.visit_member(member);
    }
    for stmt in &unit.statements {
        v.visit_stmt(stmt);
    }
}

pub fn walk_member<V: Visitor + ?Sized>(v: &mut V, member: &Member) {
    match member {
        Member::Class(class) => {
            for m in &class.members {
                v.visit_member(m);
            }
            v.visit_terminator(&class.close_brace);
        }
        Member::Field(field) => {
            if let Some(init) = &field.init {
                v.visit_expr(init);
            }
            v.visit_terminator(&field.semicolon);
        }
        Member::Property(_) => {}
        Member::Method(method) => match &method.body {
            MethodBody::Block(block) => walk_block(v, block),
            MethodBody::Expr { expr, semicolon } => {
                v.visit_expr(expr);
                v.visit_terminator(semicolon);
            }
        },
        Member::Constructor(ctor) => walk_block(v, &ctor.body),
    }
}

pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
    v.visit_terminator(&block.close_brace);
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(block) => walk_block(v, block),
        StmtKind::Local { init, semicolon, .. } => {
            if let Some(init) = init {
                v.visit_expr(init);
            }
            v.visit_terminator(semicolon);
        }
        StmtKind::Expr { expr, semicolon } => {
            v.visit_expr(expr);
            v.visit_terminator(semicolon);
        }
        StmtKind::Return { value, semicolon } => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_terminator(semicolon);
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(condition);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { condition, body } => {
            v.visit_expr(condition);
            v.visit_stmt(body);
        }
        StmtKind::For {
            init,
            condition,
            step,
            body,
        } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(condition) = condition {
                v.visit_expr(condition);
            }
            for e in step {
                v.visit_expr(e);
            }
            v.visit_stmt(body);
        }
        StmtKind::Break { semicolon } | StmtKind::Continue { semicolon } => v.visit_terminator(semicolon),
        StmtKind::Empty | StmtKind::Error => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Name(_)
        | ExprKind::This
        | ExprKind::PredefinedType(_)
        | ExprKind::Missing => {}
        ExprKind::MemberAccess { target, .. } => v.visit_expr(target),
        ExprKind::Invocation {
            target,
            args,
            close_paren,
        } => {
            v.visit_expr(target);
            for arg in args {
                v.visit_expr(arg);
            }
            v.visit_terminator(close_paren);
        }
        ExprKind::ObjectCreation { args, close_paren, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
            v.visit_terminator(close_paren);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Unary { operand, .. } | ExprKind::Postfix { operand, .. } => v.visit_expr(operand),
        ExprKind::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            v.visit_expr(condition);
            v.visit_expr(when_true);
            v.visit_expr(when_false);
        }
        ExprKind::Paren(inner) => v.visit_expr(inner),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::syntax::tree::{ParseOptions, SourceKind, SyntaxTree};

    #[derive(Default)]
    struct Counter {
        names: Vec<String>,
        missing: usize,
    }

    impl Visitor for Counter {
        fn visit_expr(&mut self, expr: &Expr) {
            if let ExprKind::Name(n) = &expr.kind {
                self.names.push(n.clone());
            }
            walk_expr(self, expr);
        }

        fn visit_terminator(&mut self, terminator: &Terminator) {
            if terminator.missing {
                self.missing += 1;
            }
        }
    }

    #[test]
    fn visits_nested_expressions_and_terminators() {
        let src = "class A { int F(int a) { if (a > b) { return c(d) } return e; } }";
        let tree = SyntaxTree::parse(src, "", ParseOptions::new(SourceKind::Script)).unwrap();
        let mut counter = Counter::default();
        walk_unit(&mut counter, tree.root());
        assert_eq!(counter.names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(counter.missing, 1);
    }
}
