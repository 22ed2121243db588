//! Tokens and the token-stream interface
//!
//! The expression parser consumes any [`TokenStream`]: a cursor over tokens
//! with lookahead and absolute repositioning (multi-token operator
//! resolution backtracks). [`TokenBuffer`] is the concrete stream, built by
//! a `logos` lexer that understands every literal form the renderer emits.

use std::fmt;

use logos::Logos;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("void")]
    Void,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("if")]
    #[token("then")]
    #[token("else")]
    #[token("is")]
    #[token("not")]
    #[token("return")]
    #[token("raise")]
    #[token("break")]
    #[token("continue")]
    Keyword,

    #[regex(r"b'[0-9a-fA-F]{2}'")]
    Byte,
    #[regex(r"'([^'\\]|\\.)'")]
    Char,
    #[regex(r"[0-9]+L")]
    Long,
    #[regex(r"[0-9]+u")]
    Index,
    #[regex(r"0x[0-9a-fA-F]+")]
    Bits,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    Syntax,
    #[regex(r"B'([0-9a-fA-F]{2})*'")]
    Bytes,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Text,
    #[regex(r#"R"([^"\\]|\\.)*""#)]
    Regex,
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*")]
    NamePath,
    #[regex(r#"F"([^"\\]|\\.)*""#)]
    Path,

    #[token("P(")]
    PlainOpen,
    #[token("D(")]
    DynamicOpen,
    #[token("E(")]
    DataOpen,
    #[token("T(")]
    TypeOpen,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[token("=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("||")]
    #[token("&&")]
    #[token("|")]
    #[token("^")]
    #[token("&")]
    #[token("==")]
    #[token("!=")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    #[token("<=>")]
    #[token("<<")]
    #[token(">>")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("!")]
    #[token("~")]
    #[token("?")]
    #[token(":")]
    Symbol,
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `void`
    Void,
    /// `true`
    True,
    /// `false`
    False,
    /// `if then else is not return raise break continue`
    Keyword,
    /// `b'2a'`
    Byte,
    /// `'c'`
    Char,
    /// `42`
    Int,
    /// `42L`
    Long,
    /// `42u`
    Index,
    /// `0x2a`
    Bits,
    /// `4.5`
    Float,
    /// `foo`
    Ident,
    /// `$foo`
    Syntax,
    /// `B'0a0b'`
    Bytes,
    /// `"text"`
    Text,
    /// `R"a+"`
    Regex,
    /// `@a.b.c`
    NamePath,
    /// `F"/tmp"`
    Path,
    /// `P(`
    PlainOpen,
    /// `D(`
    DynamicOpen,
    /// `E(`
    DataOpen,
    /// `T(`
    TypeOpen,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// Operator punctuation, including `?` and `:`
    Symbol,
    /// Unrecognized input
    Invalid,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Check if the token is a scalar literal.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Void
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Byte
                | TokenKind::Char
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Index
                | TokenKind::Bits
                | TokenKind::Float
                | TokenKind::Syntax
                | TokenKind::Bytes
                | TokenKind::Text
                | TokenKind::Regex
                | TokenKind::NamePath
                | TokenKind::Path
        )
    }

    /// Check if the token opens a tuple or type literal.
    pub fn is_tuple_open(self) -> bool {
        matches!(
            self,
            TokenKind::PlainOpen | TokenKind::DynamicOpen | TokenKind::DataOpen | TokenKind::TypeOpen
        )
    }
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Void => TokenKind::Void,
            RawToken::True => TokenKind::True,
            RawToken::False => TokenKind::False,
            RawToken::Keyword => TokenKind::Keyword,
            RawToken::Byte => TokenKind::Byte,
            RawToken::Char => TokenKind::Char,
            RawToken::Long => TokenKind::Long,
            RawToken::Index => TokenKind::Index,
            RawToken::Bits => TokenKind::Bits,
            RawToken::Int => TokenKind::Int,
            RawToken::Float => TokenKind::Float,
            RawToken::Ident => TokenKind::Ident,
            RawToken::Syntax => TokenKind::Syntax,
            RawToken::Bytes => TokenKind::Bytes,
            RawToken::Text => TokenKind::Text,
            RawToken::Regex => TokenKind::Regex,
            RawToken::NamePath => TokenKind::NamePath,
            RawToken::Path => TokenKind::Path,
            RawToken::PlainOpen => TokenKind::PlainOpen,
            RawToken::DynamicOpen => TokenKind::DynamicOpen,
            RawToken::DataOpen => TokenKind::DataOpen,
            RawToken::TypeOpen => TokenKind::TypeOpen,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Symbol => TokenKind::Symbol,
        }
    }
}

/// Source position of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset past the last character
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A token: kind, source text and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Classification
    pub kind: TokenKind,
    /// Source text
    pub text: String,
    /// Position
    pub span: Span,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Check for an operator or keyword token spelled `text`.
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Symbol | TokenKind::Keyword) && self.text == text
    }
}

/// Cursor over a token sequence.
pub trait TokenStream {
    /// The token `offset` positions ahead of the cursor; the end-of-input
    /// token once past the end.
    fn peek(&self, offset: usize) -> &Token;

    /// Move the cursor forward by `n` tokens.
    fn advance(&mut self, n: usize);

    /// Current cursor position.
    fn position(&self) -> usize;

    /// Move the cursor to an absolute position.
    fn seek(&mut self, position: usize);

    /// The token under the cursor.
    fn current(&self) -> &Token {
        self.peek(0)
    }

    /// Check if the cursor reached the end of input.
    fn at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }
}

/// A fully lexed token sequence.
#[derive(Debug, Clone)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl TokenBuffer {
    /// Wrap already built tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map(|t| t.span).unwrap_or_default();
        let eof = Token::new(
            TokenKind::Eof,
            "",
            Span {
                start: end.end,
                end: end.end,
                line: end.line.max(1),
                column: end.column + (end.end - end.start),
            },
        );
        Self {
            tokens,
            pos: 0,
            eof,
        }
    }

    /// Lex `source`. Unrecognized input becomes [`TokenKind::Invalid`]
    /// tokens for the parser to report.
    pub fn lex(source: &str) -> Self {
        let lines = LineIndex::new(source);
        let mut lexer = RawToken::lexer(source);
        let mut tokens = Vec::new();
        while let Some(raw) = lexer.next() {
            let range = lexer.span();
            let (line, column) = lines.locate(range.start);
            let span = Span {
                start: range.start,
                end: range.end,
                line,
                column,
            };
            let kind = match raw {
                Ok(raw) => TokenKind::from(raw),
                Err(()) => TokenKind::Invalid,
            };
            tokens.push(Token::new(kind, lexer.slice(), span));
        }
        Self::new(tokens)
    }

    /// Number of tokens (excluding end of input)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if there are no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl TokenStream for TokenBuffer {
    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.tokens.len());
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, position: usize) {
        self.pos = position.min(self.tokens.len());
    }
}

/// Byte offset to line/column.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn locate(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line.saturating_sub(1)];
        (line, offset - start + 1)
    }
}
