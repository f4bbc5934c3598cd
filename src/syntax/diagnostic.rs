use std::fmt;

use serde::Serialize;

use super::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    Lexer,
    Syntax,
    Declaration,
    Binding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found in one tree, addressed by byte span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub kind: DiagnosticKind,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::error(DiagnosticKind::Lexer, message, span)
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::error(DiagnosticKind::Syntax, message, span)
    }

    pub fn declaration(message: impl Into<String>, span: Span) -> Self {
        Self::error(DiagnosticKind::Declaration, message, span)
    }

    pub fn binding(message: impl Into<String>, span: Span) -> Self {
        Self::error(DiagnosticKind::Binding, message, span)
    }

    fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            severity: Severity::Error,
        }
    }

    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A diagnostic resolved to a displayable position.
///
/// Line numbers honor `#line` directives, so a problem in user content is
/// reported against the user's own numbering. Columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedDiagnostic {
    pub origin: String,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl LocatedDiagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for LocatedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let origin = if self.origin.is_empty() {
            "<fragment>"
        } else {
            &self.origin
        };
        if self.line == 0 {
            write!(f, "{origin}: {severity}: {}", self.message)
        } else {
            write!(
                f,
                "{origin}({},{}): {severity}: {}",
                self.line, self.column, self.message
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let d = LocatedDiagnostic {
            origin: "Prompt".into(),
            line: 3,
            column: 5,
            severity: Severity::Error,
            kind: DiagnosticKind::Binding,
            message: "The name 'x' does not exist in the current context".into(),
        };
        assert_eq!(
            d.to_string(),
            "Prompt(3,5): error: The name 'x' does not exist in the current context"
        );
    }

    #[test]
    fn display_without_position() {
        let d = LocatedDiagnostic {
            origin: String::new(),
            line: 0,
            column: 0,
            severity: Severity::Warning,
            kind: DiagnosticKind::Lexer,
            message: "odd".into(),
        };
        assert_eq!(d.to_string(), "<fragment>: warning: odd");
    }

    #[test]
    fn warning_is_not_error() {
        let d = Diagnostic::lexer("x", Span::at(0)).as_warning();
        assert!(!d.is_error());
        assert_eq!(d.kind, DiagnosticKind::Lexer);
    }
}
