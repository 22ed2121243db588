//! Literal values: scalars, tuples and types
//!
//! The same grammar reads everything the tuple renderer writes, so a
//! rendered tuple parses back to an equal one.

use std::path::PathBuf;

use super::node::Node;
use super::parser::Parser;
use crate::diagnostics::Diagnostics;
use crate::runtime::Runtime;
use crate::token::{Token, TokenKind, TokenStream};
use crate::tuple::{TupleId, TupleKind};
use crate::types::{TypeField, TypeTuple};
use crate::value::{Attribute, Hint, Name, NamePath, Pattern};

/// Parse one value (scalar, tuple or type literal) from `tokens`.
///
/// Tuples are created in `rt` with `scope` as their parent. Errors go to
/// `diagnostics`; on error nothing is left allocated and `None` is
/// returned.
///
/// ```
/// use tuplex::{parse_value, DiagnosticBag, Runtime, TokenBuffer};
///
/// let mut rt = Runtime::new();
/// let scope = rt.global();
/// let mut tokens = TokenBuffer::lex("P(x=1, y=\"two\")");
/// let mut diags = DiagnosticBag::new();
/// let value = parse_value(&mut rt, scope, &mut tokens, &mut diags).unwrap();
/// let id = value.tuple_id().unwrap();
/// assert_eq!(rt.tuple(id).unwrap().at::<i32>("x").unwrap(), 1);
/// ```
pub fn parse_value(
    rt: &mut Runtime,
    scope: TupleId,
    tokens: &mut dyn TokenStream,
    diagnostics: &mut dyn Diagnostics,
) -> Option<Attribute> {
    let mut parser = Parser::new(rt, scope, tokens, diagnostics);
    let value = parser.value();
    let errors = parser.finish();
    match value {
        Some(value) if errors.is_empty() => Some(value),
        Some(value) => {
            rt.release(value);
            None
        }
        None => None,
    }
}

impl Parser<'_> {
    /// An operand literal inside an expression.
    pub(super) fn operand(&mut self, token: &Token) -> Option<Node> {
        match token.kind {
            TokenKind::DynamicOpen | TokenKind::DataOpen => {
                self.error("only plain tuples are allowed in expressions", token.span);
                None
            }
            TokenKind::PlainOpen | TokenKind::TypeOpen => self.value().map(Node::literal),
            _ if token.kind.is_literal() => {
                self.tokens.advance(1);
                match literal_value(token, false) {
                    Ok(attr) => Some(Node::literal(attr)),
                    Err(message) => {
                        self.error(message, token.span);
                        None
                    }
                }
            }
            _ => {
                self.error(format!("unexpected `{}`", token.text), token.span);
                None
            }
        }
    }

    /// A standalone value. Unlike in expressions, a leading `-` belongs to a
    /// numeric literal and bare identifiers are names.
    pub(super) fn value(&mut self) -> Option<Attribute> {
        let token = self.tokens.current().clone();
        match token.kind {
            TokenKind::PlainOpen => {
                self.tokens.advance(1);
                self.tuple_body(TupleKind::Plain)
            }
            TokenKind::DynamicOpen => {
                self.tokens.advance(1);
                self.tuple_body(TupleKind::Dynamic)
            }
            TokenKind::DataOpen => {
                self.tokens.advance(1);
                self.tuple_body(TupleKind::Data)
            }
            TokenKind::TypeOpen => {
                self.tokens.advance(1);
                self.type_body().map(Attribute::of)
            }
            TokenKind::Ident => {
                self.tokens.advance(1);
                Some(Attribute::of(Name::new(token.text)))
            }
            TokenKind::Symbol if token.text == "-" => {
                let number = self.tokens.peek(1).clone();
                if !matches!(
                    number.kind,
                    TokenKind::Int | TokenKind::Long | TokenKind::Float
                ) {
                    self.error("expected a number after `-`", number.span);
                    return None;
                }
                self.tokens.advance(2);
                self.scalar(&number, true)
            }
            kind if kind.is_literal() => {
                self.tokens.advance(1);
                self.scalar(&token, false)
            }
            _ => {
                self.error(format!("expected a value, found `{}`", token.text), token.span);
                None
            }
        }
    }

    fn scalar(&mut self, token: &Token, negative: bool) -> Option<Attribute> {
        match literal_value(token, negative) {
            Ok(attr) => Some(attr),
            Err(message) => {
                self.error(message, token.span);
                None
            }
        }
    }

    /// Elements up to the closing `)`; the opening token is consumed.
    fn tuple_body(&mut self, kind: TupleKind) -> Option<Attribute> {
        self.nested("tuple", |parser| parser.tuple_elements(kind))
    }

    fn tuple_elements(&mut self, kind: TupleKind) -> Option<Attribute> {
        let mut entries: Vec<(Option<String>, Attribute)> = Vec::new();
        loop {
            if self.tokens.current().kind == TokenKind::RParen {
                self.tokens.advance(1);
                break;
            }
            let name = self.element_name();
            let element = match self.tokens.current().kind {
                TokenKind::LParen => {
                    self.tokens.advance(1);
                    self.tuple_body(kind.clone())
                }
                _ => self.value(),
            };
            let Some(element) = element else {
                self.release_entries(entries);
                return None;
            };
            entries.push((name, element));

            match self.tokens.current().kind {
                TokenKind::Comma => self.tokens.advance(1),
                TokenKind::RParen => {
                    self.tokens.advance(1);
                    break;
                }
                _ => {
                    let text = self.tokens.current().text.clone();
                    self.error_here(format!("expected `,` or `)` in tuple, found `{text}`"));
                    self.release_entries(entries);
                    return None;
                }
            }
        }

        let created = self
            .rt
            .create_from(kind, Some(self.scope), entries)
            .and_then(|id| Ok(Attribute::tuple(self.rt.type_of(id)?, id)));
        match created {
            Ok(attr) => Some(attr),
            Err(err) => {
                self.error_here(err.to_string());
                None
            }
        }
    }

    /// `name=` or `name:` in front of a tuple element.
    fn element_name(&mut self) -> Option<String> {
        let current = self.tokens.current();
        let named = current.kind == TokenKind::Ident
            && (self.tokens.peek(1).is("=") || self.tokens.peek(1).is(":"));
        if !named {
            return None;
        }
        let name = current.text.clone();
        self.tokens.advance(2);
        Some(name)
    }

    fn release_entries(&mut self, entries: Vec<(Option<String>, Attribute)>) {
        for (_, attr) in entries {
            self.rt.release(attr);
        }
    }

    /// Type elements up to the closing `)`; the opening token is consumed.
    ///
    /// A single unnamed element without a trailing comma is that element
    /// itself: `T(int)` is the leaf `int`, `T(int,)` a one-child tree.
    fn type_body(&mut self) -> Option<TypeTuple> {
        self.nested("type", |parser| parser.type_fields())
    }

    fn type_fields(&mut self) -> Option<TypeTuple> {
        let mut fields = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.tokens.current().kind == TokenKind::RParen {
                self.tokens.advance(1);
                break;
            }
            let name = (self.tokens.current().kind == TokenKind::Ident
                && self.tokens.peek(1).is("="))
            .then(|| self.tokens.current().text.clone());
            if name.is_some() {
                self.tokens.advance(2);
            }

            let token = self.tokens.current().clone();
            let ty = match token.kind {
                TokenKind::LParen | TokenKind::TypeOpen => {
                    self.tokens.advance(1);
                    self.type_body()?
                }
                TokenKind::Ident | TokenKind::Void => {
                    self.tokens.advance(1);
                    TypeTuple::name(token.text)
                }
                _ => {
                    self.error(format!("expected a type, found `{}`", token.text), token.span);
                    return None;
                }
            };
            fields.push(TypeField { name, ty });

            trailing_comma = false;
            match self.tokens.current().kind {
                TokenKind::Comma => {
                    self.tokens.advance(1);
                    trailing_comma = true;
                }
                TokenKind::RParen => {
                    self.tokens.advance(1);
                    break;
                }
                _ => {
                    let text = self.tokens.current().text.clone();
                    self.error_here(format!("expected `,` or `)` in type, found `{text}`"));
                    return None;
                }
            }
        }

        if fields.len() == 1 && fields[0].name.is_none() && !trailing_comma {
            return fields.pop().map(|field| field.ty);
        }
        Some(TypeTuple::Tree(fields))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Scalar literals
// ═══════════════════════════════════════════════════════════════════════

/// Convert a scalar literal token to a cell.
fn literal_value(token: &Token, negative: bool) -> Result<Attribute, String> {
    let text = token.text.as_str();
    let hinted = |value: u64, hint| Attribute::hinted(value, hint).map_err(|e| e.to_string());
    match token.kind {
        TokenKind::Void => Ok(Attribute::void()),
        TokenKind::True => Ok(Attribute::of(true)),
        TokenKind::False => Ok(Attribute::of(false)),
        TokenKind::Int => integer(text, negative),
        TokenKind::Long => {
            let magnitude = parse_magnitude(strip(text, 0, 1))?;
            let value = if negative { -magnitude } else { magnitude };
            i64::try_from(value)
                .map(Attribute::of)
                .map_err(|_| format!("long literal `{text}` out of range"))
        }
        TokenKind::Float => {
            let value: f64 = text
                .parse()
                .map_err(|_| format!("invalid float literal `{text}`"))?;
            Ok(Attribute::of(if negative { -value } else { value }))
        }
        TokenKind::Index => strip(text, 0, 1)
            .parse::<u64>()
            .map_err(|_| format!("index literal `{text}` out of range"))
            .and_then(|v| hinted(v, Hint::Index)),
        TokenKind::Bits => u64::from_str_radix(strip(text, 2, 0), 16)
            .map_err(|_| format!("bits literal `{text}` out of range"))
            .and_then(|v| hinted(v, Hint::Bits)),
        TokenKind::Byte => u8::from_str_radix(strip(text, 2, 1), 16)
            .map(Attribute::of)
            .map_err(|_| format!("invalid byte literal `{text}`")),
        TokenKind::Bytes => decode_hex(strip(text, 2, 1))
            .map(Attribute::of)
            .ok_or_else(|| format!("invalid bytes literal `{text}`")),
        TokenKind::Char => {
            let body = unescape(strip(text, 1, 1));
            let mut chars = body.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Attribute::of(c)),
                _ => Err(format!("invalid char literal `{text}`")),
            }
        }
        TokenKind::Text => Ok(Attribute::of(unescape(strip(text, 1, 1)))),
        TokenKind::Regex => Ok(Attribute::of(Pattern::new(unescape(strip(text, 2, 1))))),
        TokenKind::Path => Ok(Attribute::of(PathBuf::from(unescape(strip(text, 2, 1))))),
        TokenKind::NamePath => Ok(Attribute::of(NamePath::parse(strip(text, 1, 0)))),
        TokenKind::Syntax => Attribute::hinted(Name::new(strip(text, 1, 0)), Hint::Syntax)
            .map_err(|e| e.to_string()),
        TokenKind::Ident => Ok(Attribute::of(Name::new(text))),
        _ => Err(format!("`{text}` is not a literal")),
    }
}

/// An integer picks `int` when it fits in 32 bits and `long` otherwise.
fn integer(text: &str, negative: bool) -> Result<Attribute, String> {
    let magnitude = parse_magnitude(text)?;
    let value = if negative { -magnitude } else { magnitude };
    if let Ok(int) = i32::try_from(value) {
        return Ok(Attribute::of(int));
    }
    i64::try_from(value)
        .map(Attribute::of)
        .map_err(|_| format!("integer literal `{text}` out of range"))
}

fn parse_magnitude(digits: &str) -> Result<i128, String> {
    digits
        .parse::<i128>()
        .map_err(|_| format!("integer literal `{digits}` out of range"))
}

/// `text` without `head` leading and `tail` trailing bytes (all ASCII).
fn strip(text: &str, head: usize, tail: usize) -> &str {
    text.get(head..text.len().saturating_sub(tail)).unwrap_or("")
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
