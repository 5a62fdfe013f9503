//! Hand-written lexer for resource description files.
//!
//! The lexer only classifies byte spans; every `Token` borrows its text from
//! the source buffer. Interpretation of names and type tags happens later.
//
//  Lexical items:
//
//      Ident    ::= [A-Za-z_][A-Za-z0-9_]*
//      Int      ::= '-'? [0-9]+
//      Float    ::= '-'? [0-9]+ '.' [0-9]*
//      Str      ::= '"' .*? '"'        (verbatim, no escapes)
//      Header   ::= '{' .*? '}'        (verbatim, no nesting)
//      Symbols  ::= '=' '(' ')' '[' ']' ',' ':' '|'
//      Newline  ::= '\n'
//
//  Spaces, tabs, carriage returns and comments (# until end-of-line) are
//  discarded. Any other byte produces `Invalid` and stops the lexer.

use super::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    Str,
    Header,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Pipe,
    Newline,
    Invalid,
}

impl TokenKind {
    /// Tokens that become leaves of a statement tree.
    pub fn is_value(self) -> bool {
        matches!(self, Self::Ident | Self::Int | Self::Float | Self::Str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Span in the source buffer. Quotes and braces are not included.
    pub text: &'a str,
    /// 1-based source line.
    pub line: usize,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: &'a str, line: usize) -> Self {
        Self { kind, text, line }
    }
}

/// Token stream for one buffer plus the number of newlines seen.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    pub tokens: Vec<Token<'a>>,
    pub line_count: usize,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    finished: bool,
    /// Set when the lexer stopped on bad input; describes why.
    failure: Option<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            finished: false,
            failure: None,
        }
    }

    /// Newlines consumed so far.
    pub fn line_count(&self) -> usize {
        self.line - 1
    }

    /// Reason the lexer terminated early, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn consume_while<F: Fn(u8) -> bool>(&mut self, pred: F) {
        while let Some(b) = self.peek_byte() {
            if pred(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        Token::new(TokenKind::Ident, &self.src[start..self.pos], self.line)
    }

    fn read_number(&mut self, start: usize) -> Token<'a> {
        let mut kind = TokenKind::Int;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && kind == TokenKind::Int {
                kind = TokenKind::Float;
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::new(kind, &self.src[start..self.pos], self.line)
    }

    /// Reads up to `close`, bounds-checked against the end of the buffer.
    fn read_delimited(&mut self, kind: TokenKind, close: u8) -> Token<'a> {
        let start = self.pos;
        let line = self.line;
        match self.src.as_bytes()[start..].iter().position(|&b| b == close) {
            Some(len) => {
                let text = &self.src[start..start + len];
                self.line += text.bytes().filter(|&b| b == b'\n').count();
                self.pos = start + len + 1;
                Token::new(kind, text, line)
            }
            None => self.fail(start - 1, format!("no closing {} found", close as char)),
        }
    }

    fn fail(&mut self, at: usize, reason: String) -> Token<'a> {
        self.finished = true;
        self.failure = Some(reason);
        let end = (at + 1).min(self.src.len());
        Token::new(TokenKind::Invalid, &self.src[at..end], self.line)
    }

    fn symbol(&mut self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, &self.src[start..self.pos], self.line)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // Skip whitespace that isn't newline, and comments
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t' | b'\r') => self.pos += 1,
                Some(b'#') => self.consume_while(|b| b != b'\n'),
                _ => break,
            }
        }

        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            self.finished = true;
            return None;
        };
        self.pos += 1;

        let tok = match b {
            b'\n' => {
                let tok = self.symbol(TokenKind::Newline, start);
                self.line += 1;
                tok
            }
            b'=' => self.symbol(TokenKind::Assign, start),
            b'(' => self.symbol(TokenKind::LParen, start),
            b')' => self.symbol(TokenKind::RParen, start),
            b'[' => self.symbol(TokenKind::LBracket, start),
            b']' => self.symbol(TokenKind::RBracket, start),
            b',' => self.symbol(TokenKind::Comma, start),
            b':' => self.symbol(TokenKind::Colon, start),
            b'|' => self.symbol(TokenKind::Pipe, start),
            b'"' => self.read_delimited(TokenKind::Str, b'"'),
            b'{' => self.read_delimited(TokenKind::Header, b'}'),
            b'-' if self.peek_byte().is_some_and(|n| n.is_ascii_digit()) => self.read_number(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_ascii_alphabetic() || c == b'_' => self.read_identifier(start),
            _ => {
                // keep the span on a char boundary for non-ASCII input
                let ch = self.src[start..].chars().next().unwrap_or('\0');
                self.pos = start + ch.len_utf8();
                self.finished = true;
                self.failure = Some(format!("unexpected character {ch:?}"));
                Token::new(TokenKind::Invalid, &self.src[start..self.pos], self.line)
            }
        };

        Some(tok)
    }
}

/// Splits `src` into tokens.
///
/// An `Invalid` token ends the stream; the rest of the buffer is dropped and a
/// lex diagnostic is recorded. No error is returned.
pub fn tokenize<'a>(src: &'a str, diagnostics: &mut Diagnostics) -> Tokens<'a> {
    let mut lexer = Lexer::new(src);
    let tokens: Vec<Token<'a>> = lexer.by_ref().collect();
    if let (Some(reason), Some(last)) = (lexer.failure(), tokens.last()) {
        diagnostics.report(
            DiagnosticKind::Lex,
            last.line,
            format!("{reason}; ignoring rest of input"),
        );
    }
    Tokens {
        tokens,
        line_count: lexer.line_count(),
    }
}
