use crate::analysis::{Diag, Severity};

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Like `contains` but also accepts a cursor sitting right after the
    /// last character, the way editors report it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn to(&self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    Str,

    // Keywords; lookup is case-insensitive.
    Procedure,
    Variable,
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    Foreach,
    In,
    Switch,
    Case,
    Default,
    Call,
    Return,
    And,
    Or,
    Not,

    Assign, // :=
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Colon,

    /// A `#` at the start of a line; the token covers the whole logical
    /// line including backslash-newline continuations.
    Directive,

    Eof,
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident.to_ascii_lowercase().as_str() {
        "procedure" => TokenKind::Procedure,
        "variable" => TokenKind::Variable,
        "begin" => TokenKind::Begin,
        "end" => TokenKind::End,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "foreach" => TokenKind::Foreach,
        "in" => TokenKind::In,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "call" => TokenKind::Call,
        "return" => TokenKind::Return,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        _ => return None,
    };
    Some(kind)
}

pub fn tokenize(src: &str, diags: &mut Vec<Diag>) -> Vec<Token> {
    Lexer {
        src: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        diags,
    }
    .run()
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    diags: &'a mut Vec<Diag>,
}

impl Lexer<'_> {
    fn run(mut self) -> Vec<Token> {
        while self.pos < self.src.len() {
            let start = self.pos;
            let b = self.src[self.pos];
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.pos += 1;
                }
                b'#' if self.at_line_start() => self.directive(start),
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => self.block_comment(start),
                b'"' => self.string(start),
                b'0'..=b'9' => self.number(start),
                _ if b.is_ascii_alphabetic() || b == b'_' => self.ident(start),
                _ => self.punct(start),
            }
        }
        let end = Span::new(self.src.len(), self.src.len());
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: end,
        });
        self.tokens
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    /// Only whitespace may precede a directive `#` on its line.
    fn at_line_start(&self) -> bool {
        let mut i = self.pos;
        while i > 0 {
            match self.src[i - 1] {
                b' ' | b'\t' => i -= 1,
                b'\n' => return true,
                _ => return false,
            }
        }
        true
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.pos),
        });
    }

    fn directive(&mut self, start: usize) {
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' if matches!(self.peek(1), Some(b'\n')) => self.pos += 2,
                b'\\' if matches!(self.peek(1), Some(b'\r')) && matches!(self.peek(2), Some(b'\n')) => {
                    self.pos += 3
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.push(TokenKind::Directive, start);
    }

    fn block_comment(&mut self, start: usize) {
        self.pos += 2;
        loop {
            if self.pos >= self.src.len() {
                self.diags.push(Diag {
                    span: Span::new(start, self.pos),
                    message: "unterminated block comment".to_string(),
                    severity: Severity::Warning,
                });
                return;
            }
            if self.src[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn string(&mut self, start: usize) {
        self.pos += 1;
        loop {
            match self.src.get(self.pos) {
                None | Some(b'\n') => {
                    // Unterminated: close at end of line so the rest of the
                    // file still lexes.
                    self.diags.push(Diag {
                        span: Span::new(start, self.pos),
                        message: "unterminated string literal".to_string(),
                        severity: Severity::Warning,
                    });
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') if self.peek(1).is_some_and(|b| b != b'\n') => self.pos += 2,
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::Str, start);
    }

    fn number(&mut self, start: usize) {
        if self.src[self.pos] == b'0' && matches!(self.peek(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while self.peek(0).is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            self.push(TokenKind::Int, start);
            return;
        }

        while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'.') && self.peek(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            self.push(TokenKind::Float, start);
        } else {
            self.push(TokenKind::Int, start);
        }
    }

    fn ident(&mut self, start: usize) {
        while self
            .peek(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let kind = keyword(text).unwrap_or(TokenKind::Ident);
        self.push(kind, start);
    }

    fn punct(&mut self, start: usize) {
        let b = self.src[self.pos];
        let two = self.peek(1);
        let kind = match (b, two) {
            (b':', Some(b'=')) => {
                self.pos += 2;
                TokenKind::Assign
            }
            (b':', _) => {
                self.pos += 1;
                TokenKind::Colon
            }
            (b'=', Some(b'=')) => {
                self.pos += 2;
                TokenKind::EqEq
            }
            (b'!', Some(b'=')) => {
                self.pos += 2;
                TokenKind::BangEq
            }
            (b'<', Some(b'=')) => {
                self.pos += 2;
                TokenKind::LtEq
            }
            (b'>', Some(b'=')) => {
                self.pos += 2;
                TokenKind::GtEq
            }
            (b'<', _) => {
                self.pos += 1;
                TokenKind::Lt
            }
            (b'>', _) => {
                self.pos += 1;
                TokenKind::Gt
            }
            (b'+', _) => {
                self.pos += 1;
                TokenKind::Plus
            }
            (b'-', _) => {
                self.pos += 1;
                TokenKind::Minus
            }
            (b'*', _) => {
                self.pos += 1;
                TokenKind::Star
            }
            (b'/', _) => {
                self.pos += 1;
                TokenKind::Slash
            }
            (b'%', _) => {
                self.pos += 1;
                TokenKind::Percent
            }
            (b'(', _) => {
                self.pos += 1;
                TokenKind::LParen
            }
            (b')', _) => {
                self.pos += 1;
                TokenKind::RParen
            }
            (b',', _) => {
                self.pos += 1;
                TokenKind::Comma
            }
            (b';', _) => {
                self.pos += 1;
                TokenKind::Semicolon
            }
            _ => {
                // Skip the whole UTF-8 character, not just one byte.
                let text = std::str::from_utf8(&self.src[self.pos..]).unwrap_or_default();
                let width = text.chars().next().map(char::len_utf8).unwrap_or(1);
                self.pos += width;
                self.diags.push(Diag {
                    span: Span::new(start, self.pos),
                    message: format!(
                        "unexpected character `{}`",
                        text.chars().next().unwrap_or('?')
                    ),
                    severity: Severity::Error,
                });
                return;
            }
        };
        self.push(kind, start);
    }
}
