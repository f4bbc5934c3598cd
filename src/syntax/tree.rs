use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ast::{CompilationUnit, Span};
use super::diagnostic::{Diagnostic, LocatedDiagnostic};
use super::lexer::{lex, LineMapping};
use super::parser::{self, DEFAULT_MAX_DEPTH};
use crate::error::{Error, Result};

/// How a fragment is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Ordinary source: only type declarations at the top level.
    Regular,
    /// Script source: top-level members belong to the implicit `Script` class.
    Script,
    /// Like `Script`, and top-level statements are allowed.
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub kind: SourceKind,
    pub max_depth: usize,
}

impl ParseOptions {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Replace the text under `span` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::at(offset),
            replacement: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            replacement: text.into(),
        }
    }
}

/// An immutable parsed fragment.
///
/// Clones share the same parse; identity (`==`) is sharing, not textual
/// equality, so a tree rebuilt from identical text is a different tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    inner: Arc<TreeInner>,
}

#[derive(Debug)]
struct TreeInner {
    origin: String,
    options: ParseOptions,
    text: String,
    root: CompilationUnit,
    line_mappings: Vec<LineMapping>,
    diagnostics: Vec<Diagnostic>,
}

impl SyntaxTree {
    /// Parse `text` into a tree tagged with `origin` (may be empty).
    ///
    /// Fails only when no tree can be produced at all.
    pub fn parse(text: &str, origin: &str, options: ParseOptions) -> Result<Self> {
        let lexed = lex(text);
        let parsed = parser::parse(lexed.tokens, options.kind, options.max_depth)
            .map_err(|d| Error::parse(origin, d.message))?;

        let mut diagnostics = lexed.diagnostics;
        diagnostics.extend(parsed.diagnostics);
        diagnostics.sort_by_key(|d| d.span.start);

        Ok(Self {
            inner: Arc::new(TreeInner {
                origin: origin.to_string(),
                options,
                text: text.to_string(),
                root: parsed.root,
                line_mappings: lexed.line_mappings,
                diagnostics,
            }),
        })
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn kind(&self) -> SourceKind {
        self.inner.options.kind
    }

    pub fn options(&self) -> ParseOptions {
        self.inner.options
    }

    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub fn root(&self) -> &CompilationUnit {
        &self.inner.root
    }

    pub fn line_mappings(&self) -> &[LineMapping] {
        &self.inner.line_mappings
    }

    /// Lexical and syntax diagnostics, in source order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.inner.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.inner.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Whether top-level members of this tree form the `Script` class.
    pub fn is_script(&self) -> bool {
        matches!(self.kind(), SourceKind::Script | SourceKind::Interactive)
    }

    pub fn ptr_eq(&self, other: &SyntaxTree) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn slice(&self, span: Span) -> &str {
        self.inner.text.get(span.start..span.end).unwrap_or("")
    }

    /// Apply `edits` to the text and re-parse with the same origin and options.
    ///
    /// An empty edit list returns this same tree.
    pub fn with_edits(&self, mut edits: Vec<TextEdit>) -> Result<SyntaxTree> {
        if edits.is_empty() {
            return Ok(self.clone());
        }
        edits.sort_by_key(|e| (e.span.start, e.span.end));

        let text = self.text();
        let mut previous_end = 0;
        for edit in &edits {
            let Span { start, end } = edit.span;
            if start < previous_end {
                return Err(Error::invalid_argument("edits", "edits overlap"));
            }
            if start > end || end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                return Err(Error::invalid_argument(
                    "edits",
                    format!("span {start}..{end} is outside the tree text"),
                ));
            }
            previous_end = end;
        }

        let mut out = String::with_capacity(text.len() + edits.iter().map(|e| e.replacement.len()).sum::<usize>());
        let mut cursor = 0;
        for edit in &edits {
            out.push_str(text.get(cursor..edit.span.start).unwrap_or(""));
            out.push_str(&edit.replacement);
            cursor = edit.span.end;
        }
        out.push_str(text.get(cursor..).unwrap_or(""));

        SyntaxTree::parse(&out, self.origin(), self.options())
    }

    /// Displayed `(line, column)` for a byte offset, both 1-based.
    ///
    /// Lines honor `#line` mappings; columns count characters.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let (physical, column) = physical_line_col(self.text(), offset);
        let mapping = self
            .line_mappings()
            .iter()
            .rev()
            .find(|m| m.from_offset <= offset);
        let line = match mapping {
            Some(LineMapping {
                from_offset,
                line: Some(mapped),
            }) => {
                let (mapping_line, _) = physical_line_col(self.text(), *from_offset);
                mapped.saturating_add(physical.saturating_sub(mapping_line))
            }
            _ => physical,
        };
        (line, column)
    }

    pub fn locate(&self, diagnostic: &Diagnostic) -> LocatedDiagnostic {
        let (line, column) = self.line_col(diagnostic.span.start);
        LocatedDiagnostic {
            origin: self.origin().to_string(),
            line,
            column,
            severity: diagnostic.severity,
            kind: diagnostic.kind,
            message: diagnostic.message.clone(),
        }
    }
}

impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SyntaxTree {}

fn physical_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn script(text: &str) -> SyntaxTree {
        SyntaxTree::parse(text, "Prompt", ParseOptions::new(SourceKind::Interactive)).unwrap()
    }

    #[test]
    fn keeps_origin_text_and_kind() {
        let tree = script("public static object Eval() { return 1; }");
        assert_eq!(tree.origin(), "Prompt");
        assert_eq!(tree.kind(), SourceKind::Interactive);
        assert!(tree.is_script());
        assert!(!tree.has_errors());
    }

    #[test]
    fn identity_is_sharing() {
        let a = script("int x = 1;");
        let b = script("int x = 1;");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn huge_line_directive_locates_without_overflow() {
        let tree = script("#line 18446744073709551615\nint a = 1;\nint b = 2");
        let located: Vec<_> = tree.diagnostics().iter().map(|d| tree.locate(d)).collect();
        assert_eq!(located.len(), 2, "{located:?}");
        assert_eq!(located[0].line, 1);
        assert_eq!(located[1].line, 3);

        let tree = script("#line 16707565\nint a = 1;\nint b = 2");
        let located: Vec<_> = tree.diagnostics().iter().map(|d| tree.locate(d)).collect();
        assert_eq!(located.len(), 1, "{located:?}");
        assert_eq!(located[0].line, 16_707_566);
    }

    #[test]
    fn empty_edits_return_same_tree() {
        let tree = script("int x = 1;");
        let same = tree.with_edits(Vec::new()).unwrap();
        assert!(same.ptr_eq(&tree));
    }

    #[test]
    fn edits_reparse_with_same_origin() {
        let tree = script("static object Eval() {\nreturn 1\n}");
        assert!(tree.has_errors());
        let offset = tree.text().find("1\n").unwrap() + 1;
        let fixed = tree.with_edits(vec![TextEdit::insert(offset, ";")]).unwrap();
        assert_eq!(fixed.text(), "static object Eval() {\nreturn 1;\n}");
        assert_eq!(fixed.origin(), "Prompt");
        assert_eq!(fixed.kind(), SourceKind::Interactive);
        assert!(fixed.diagnostics().is_empty());
    }

    #[test]
    fn overlapping_edits_rejected() {
        let tree = script("int x = 1;");
        let err = tree
            .with_edits(vec![
                TextEdit::replace(Span::new(0, 5), "a"),
                TextEdit::replace(Span::new(3, 6), "b"),
            ])
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn line_directive_maps_lines() {
        let text = "public static object Eval() {\n#line 1\nreturn 1 +;\n}";
        let tree = script(text);
        let diag = &tree.diagnostics()[0];
        let located = tree.locate(diag);
        assert_eq!(located.line, 1);
        assert_eq!(located.origin, "Prompt");
    }

    #[test]
    fn line_default_restores_physical_numbering() {
        let text = "a\n#line 100\nb\n#line default\nc";
        let tree = script(text);
        let b = text.find('b').unwrap();
        let c = text.find('c').unwrap();
        assert_eq!(tree.line_col(b).0, 100);
        assert_eq!(tree.line_col(c).0, 5);
        assert_eq!(tree.line_col(0), (1, 1));
    }

    #[test]
    fn depth_limit_is_parse_error() {
        let text = format!("static int F() => {}1{};", "(".repeat(40), ")".repeat(40));
        let err = SyntaxTree::parse(&text, "Editor", ParseOptions::new(SourceKind::Script).with_max_depth(16)).unwrap_err();
        assert!(matches!(err, Error::Parse { ref origin, .. } if origin == "Editor"));
    }
}
