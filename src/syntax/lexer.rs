use super::ast::Span;
use super::diagnostic::Diagnostic;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Double(f64),
    Str(String),
    Char(char),
    True,
    False,
    Null,

    // Identifiers & keywords
    Ident(String),
    Using,
    Class,
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Readonly,
    Const,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    New,
    This,
    Var,

    // Predefined type keywords
    ObjectTy,
    StringTy,
    IntTy,
    LongTy,
    DoubleTy,
    BoolTy,
    CharTy,
    VoidTy,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Question,
    FatArrow,  // =>

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Lt,
    Gt,
    Le,        // <=
    Ge,        // >=
    EqEq,      // ==
    Ne,        // !=
    And,       // &&
    Or,        // ||
    Bang,      // !
    Eq,        // =
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    Eof,
}

impl Token {
    /// Source spelling for diagnostics.
    pub fn describe(&self) -> String {
        let text = match self {
            Token::Int(v) => return v.to_string(),
            Token::Double(v) => return v.to_string(),
            Token::Str(_) => "string literal",
            Token::Char(_) => "character literal",
            Token::Ident(name) => return format!("'{name}'"),
            Token::Eof => "end of file",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Using => "using",
            Token::Class => "class",
            Token::Public => "public",
            Token::Private => "private",
            Token::Protected => "protected",
            Token::Internal => "internal",
            Token::Static => "static",
            Token::Readonly => "readonly",
            Token::Const => "const",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::New => "new",
            Token::This => "this",
            Token::Var => "var",
            Token::ObjectTy => "object",
            Token::StringTy => "string",
            Token::IntTy => "int",
            Token::LongTy => "long",
            Token::DoubleTy => "double",
            Token::BoolTy => "bool",
            Token::CharTy => "char",
            Token::VoidTy => "void",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Colon => ":",
            Token::Question => "?",
            Token::FatArrow => "=>",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Bang => "!",
            Token::Eq => "=",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::StarEq => "*=",
            Token::SlashEq => "/=",
        };
        if text.len() <= 2 || text.chars().all(|c| c.is_ascii_alphabetic()) {
            format!("'{text}'")
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Largest line number a `#line` directive may set.
pub const MAX_LINE_DIRECTIVE: usize = 16_707_565;

/// A `#line` directive: text from `from_offset` onwards displays as `line`,
/// or with physical numbering again when `line` is `None` (`#line default`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMapping {
    pub from_offset: usize,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<SpannedToken>,
    pub line_mappings: Vec<LineMapping>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenize `source`. Lexical problems become diagnostics; a token stream
/// ending in `Eof` is always produced.
pub fn lex(source: &str) -> LexOutput {
    let mut lexer = Lexer::new(source);
    lexer.tokenize();
    LexOutput {
        tokens: lexer.tokens,
        line_mappings: lexer.line_mappings,
        diagnostics: lexer.diagnostics,
    }
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<SpannedToken>,
    line_mappings: Vec<LineMapping>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            line_mappings: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn tokenize(&mut self) {
        while self.pos < self.bytes.len() {
            self.skip_whitespace_and_comments();
            if self.pos >= self.bytes.len() {
                break;
            }

            let start = self.pos;
            let ch = self.bytes[self.pos];

            match ch {
                b'(' => self.single(Token::LParen, start),
                b')' => self.single(Token::RParen, start),
                b'{' => self.single(Token::LBrace, start),
                b'}' => self.single(Token::RBrace, start),
                b'[' => self.single(Token::LBracket, start),
                b']' => self.single(Token::RBracket, start),
                b';' => self.single(Token::Semicolon, start),
                b',' => self.single(Token::Comma, start),
                b':' => self.single(Token::Colon, start),
                b'?' => self.single(Token::Question, start),
                b'%' => self.single(Token::Percent, start),
                b'.' => {
                    if self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
                        self.lex_number(start);
                    } else {
                        self.single(Token::Dot, start);
                    }
                }
                b'+' => self.operator(start, Token::Plus, &[(b'+', Token::PlusPlus), (b'=', Token::PlusEq)]),
                b'-' => self.operator(start, Token::Minus, &[(b'-', Token::MinusMinus), (b'=', Token::MinusEq)]),
                b'*' => self.operator(start, Token::Star, &[(b'=', Token::StarEq)]),
                b'/' => self.operator(start, Token::Slash, &[(b'=', Token::SlashEq)]),
                b'<' => self.operator(start, Token::Lt, &[(b'=', Token::Le)]),
                b'>' => self.operator(start, Token::Gt, &[(b'=', Token::Ge)]),
                b'=' => self.operator(start, Token::Eq, &[(b'=', Token::EqEq), (b'>', Token::FatArrow)]),
                b'!' => self.operator(start, Token::Bang, &[(b'=', Token::Ne)]),
                b'&' => {
                    self.pos += 1;
                    if self.peek() == Some(b'&') {
                        self.pos += 1;
                        self.push(Token::And, start, self.pos);
                    } else {
                        self.diagnostics.push(Diagnostic::lexer(
                            "Expected '&&' for logical AND",
                            Span::new(start, self.pos),
                        ));
                    }
                }
                b'|' => {
                    self.pos += 1;
                    if self.peek() == Some(b'|') {
                        self.pos += 1;
                        self.push(Token::Or, start, self.pos);
                    } else {
                        self.diagnostics.push(Diagnostic::lexer(
                            "Expected '||' for logical OR",
                            Span::new(start, self.pos),
                        ));
                    }
                }
                b'#' => {
                    if self.at_line_start(start) {
                        self.lex_directive(start);
                    } else {
                        self.pos += 1;
                        self.diagnostics.push(Diagnostic::lexer(
                            "Preprocessor directives must appear as the first non-whitespace character on a line",
                            Span::new(start, self.pos),
                        ));
                    }
                }
                b'"' => {
                    self.pos += 1;
                    self.lex_string(start);
                }
                b'\'' => {
                    self.pos += 1;
                    self.lex_char(start);
                }
                b'@' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"') => {
                            self.pos += 1;
                            self.lex_verbatim_string(start);
                        }
                        Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                            let word_start = self.pos;
                            self.scan_word();
                            let word = self.source[word_start..self.pos].to_string();
                            self.push(Token::Ident(word), start, self.pos);
                        }
                        _ => self.diagnostics.push(Diagnostic::lexer(
                            "Keyword, identifier, or string expected after verbatim specifier: @",
                            Span::new(start, self.pos),
                        )),
                    }
                }
                b'0'..=b'9' => self.lex_number(start),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_ident(start),
                _ => {
                    let width = self.source[start..].chars().next().map_or(1, char::len_utf8);
                    let shown = &self.source[start..start + width];
                    self.pos += width;
                    self.diagnostics.push(Diagnostic::lexer(
                        format!("Unexpected character '{shown}'"),
                        Span::new(start, self.pos),
                    ));
                }
            }
        }

        self.tokens.push(SpannedToken {
            token: Token::Eof,
            span: Span::at(self.pos),
        });
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn push(&mut self, token: Token, start: usize, end: usize) {
        self.tokens.push(SpannedToken {
            token,
            span: Span::new(start, end),
        });
    }

    fn single(&mut self, token: Token, start: usize) {
        self.pos += 1;
        self.push(token, start, self.pos);
    }

    /// One-byte operator, or a two-byte form when the next byte matches.
    fn operator(&mut self, start: usize, single: Token, doubles: &[(u8, Token)]) {
        self.pos += 1;
        let next = self.peek();
        for (byte, token) in doubles {
            if next == Some(*byte) {
                self.pos += 1;
                self.push(token.clone(), start, self.pos);
                return;
            }
        }
        self.push(single, start, self.pos);
    }

    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.pos >= self.bytes.len() {
                            self.diagnostics.push(Diagnostic::lexer(
                                "End-of-file found, '*/' expected",
                                Span::new(start, self.pos),
                            ));
                            break;
                        }
                        if self.bytes[self.pos] == b'*' && self.bytes.get(self.pos + 1) == Some(&b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn at_line_start(&self, offset: usize) -> bool {
        self.bytes[..offset]
            .iter()
            .rev()
            .take_while(|&&b| b != b'\n')
            .all(|&b| b == b' ' || b == b'\t' || b == b'\r')
    }

    fn line_end(&self) -> usize {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |i| self.pos + i)
    }

    fn lex_directive(&mut self, start: usize) {
        let end = self.line_end();
        let text = self.source[start + 1..end].trim();
        // Mapped numbering starts on the line after the directive.
        let next_line = (end + 1).min(self.bytes.len());
        self.pos = end;

        let (name, arg) = text
            .split_once(char::is_whitespace)
            .map_or((text, ""), |(n, a)| (n, a.trim()));
        let span = Span::new(start, end);
        match name {
            "line" => {
                if arg == "default" || arg == "hidden" {
                    self.line_mappings.push(LineMapping {
                        from_offset: next_line,
                        line: None,
                    });
                    return;
                }
                // `#line 12 "file.cs"` carries an optional file name
                let number = arg.split_whitespace().next().unwrap_or("");
                match number.parse::<usize>() {
                    Ok(line) if (1..=MAX_LINE_DIRECTIVE).contains(&line) => self.line_mappings.push(LineMapping {
                        from_offset: next_line,
                        line: Some(line),
                    }),
                    _ => self.diagnostics.push(Diagnostic::lexer(
                        "Invalid line number specified for #line directive",
                        span,
                    )),
                }
            }
            "r" | "load" => {}
            _ => self.diagnostics.push(
                Diagnostic::lexer(format!("Unrecognized preprocessor directive '#{name}'"), span)
                    .as_warning(),
            ),
        }
    }

    fn lex_escape(&mut self, literal_start: usize) -> Option<char> {
        let escape_start = self.pos;
        self.pos += 1; // skip '\'
        let Some(c) = self.peek() else {
            return None;
        };
        self.pos += 1;
        let ch = match c {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'0' => '\0',
            b'\\' => '\\',
            b'"' => '"',
            b'\'' => '\'',
            _ => {
                self.diagnostics.push(Diagnostic::lexer(
                    "Unrecognized escape sequence",
                    Span::new(escape_start.max(literal_start), self.pos),
                ));
                return None;
            }
        };
        Some(ch)
    }

    fn lex_string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.diagnostics.push(Diagnostic::lexer(
                        "Newline in constant",
                        Span::new(start, self.pos),
                    ));
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    if let Some(ch) = self.lex_escape(start) {
                        value.push(ch);
                    }
                }
                Some(_) => {
                    let ch_start = self.pos;
                    let width = self.source[ch_start..].chars().next().map_or(1, char::len_utf8);
                    self.pos += width;
                    value.push_str(&self.source[ch_start..self.pos]);
                }
            }
        }
        self.push(Token::Str(value), start, self.pos);
    }

    fn lex_verbatim_string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    self.diagnostics.push(Diagnostic::lexer(
                        "Unterminated string literal",
                        Span::new(start, self.pos),
                    ));
                    break;
                }
                Some(b'"') if self.bytes.get(self.pos + 1) == Some(&b'"') => {
                    value.push('"');
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let ch_start = self.pos;
                    let width = self.source[ch_start..].chars().next().map_or(1, char::len_utf8);
                    self.pos += width;
                    value.push_str(&self.source[ch_start..self.pos]);
                }
            }
        }
        self.push(Token::Str(value), start, self.pos);
    }

    fn lex_char(&mut self, start: usize) {
        let value = match self.peek() {
            Some(b'\\') => self.lex_escape(start),
            Some(b'\'' | b'\n') | None => None,
            Some(_) => {
                let ch = self.source[self.pos..].chars().next();
                self.pos += ch.map_or(1, char::len_utf8);
                ch
            }
        };
        if self.peek() == Some(b'\'') {
            self.pos += 1;
        } else {
            self.diagnostics.push(Diagnostic::lexer(
                "Too many characters in character literal",
                Span::new(start, self.pos),
            ));
            while self.pos < self.bytes.len() && !matches!(self.bytes[self.pos], b'\'' | b'\n') {
                self.pos += 1;
            }
            if self.peek() == Some(b'\'') {
                self.pos += 1;
            }
        }
        match value {
            Some(ch) => self.push(Token::Char(ch), start, self.pos),
            None => {
                self.diagnostics.push(Diagnostic::lexer("Empty character literal", Span::new(start, self.pos)));
                self.push(Token::Char('\0'), start, self.pos);
            }
        }
    }

    fn lex_number(&mut self, start: usize) {
        let mut is_float = false;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            self.pos += 1;
            while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut probe = self.pos + 1;
            if matches!(self.bytes.get(probe), Some(b'+' | b'-')) {
                probe += 1;
            }
            if self.bytes.get(probe).is_some_and(u8::is_ascii_digit) {
                is_float = true;
                self.pos = probe;
                while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        let text = &self.source[start..self.pos];
        // `d`/`D` forces a double, as in `1d`
        if matches!(self.peek(), Some(b'd' | b'D')) {
            self.pos += 1;
            is_float = true;
        }
        if self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.scan_word();
            self.diagnostics.push(Diagnostic::lexer(
                format!("Invalid number: {}", &self.source[start..self.pos]),
                Span::new(start, self.pos),
            ));
            self.push(Token::Int(0), start, self.pos);
            return;
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(v) => self.push(Token::Double(v), start, self.pos),
                Err(_) => self.diagnostics.push(Diagnostic::lexer(
                    format!("Invalid number: {text}"),
                    Span::new(start, self.pos),
                )),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => self.push(Token::Int(v), start, self.pos),
                Err(_) => {
                    self.diagnostics.push(Diagnostic::lexer(
                        "Integral constant is too large",
                        Span::new(start, self.pos),
                    ));
                    self.push(Token::Int(0), start, self.pos);
                }
            }
        }
    }

    fn scan_word(&mut self) {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    fn lex_ident(&mut self, start: usize) {
        self.scan_word();
        let word = &self.source[start..self.pos];
        let token = match word {
            "using" => Token::Using,
            "class" => Token::Class,
            "public" => Token::Public,
            "private" => Token::Private,
            "protected" => Token::Protected,
            "internal" => Token::Internal,
            "static" => Token::Static,
            "readonly" => Token::Readonly,
            "const" => Token::Const,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "new" => Token::New,
            "this" => Token::This,
            "var" => Token::Var,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "object" => Token::ObjectTy,
            "string" => Token::StringTy,
            "int" => Token::IntTy,
            "long" => Token::LongTy,
            "double" => Token::DoubleTy,
            "bool" => Token::BoolTy,
            "char" => Token::CharTy,
            "void" => Token::VoidTy,
            _ => Token::Ident(word.to_string()),
        };
        self.push(token, start, self.pos);
    }
}
