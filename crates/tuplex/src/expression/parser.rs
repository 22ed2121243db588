//! Operator precedence parser
//!
//! A frame holds an operand stack and a stack of pending operators. Binary
//! operators reduce everything on the pending stack that binds at least as
//! tightly as they do; prefix operators are pushed without reducing.
//!
//! Multi-token operators (`if a then b else c`, `a ? b : c`, `a is not T`)
//! are resolved by parsing their inner operands in sub-frames that stop at
//! the next expected sub-token. When several sequences share a prefix, the
//! candidates are narrowed after every inner operand; a candidate that ends
//! early wins when nothing longer matches, and its already parsed operand is
//! discarded and re-parsed by precedence.

use tracing::{debug, warn};

use super::node::{Node, OperatorNode};
use crate::diagnostics::Diagnostics;
use crate::operators::OperatorCode;
use crate::runtime::Runtime;
use crate::token::{Span, Token, TokenKind, TokenStream};
use crate::tuple::TupleId;
use crate::value::{Attribute, Name};

/// An entry on a frame's pending-operator stack.
#[derive(Debug)]
enum Pending {
    /// An open parenthesis
    Open,
    /// A single-token operator waiting for its operands
    Operator(OperatorCode),
    /// A resolved multi-token operator with its inner operands, waiting for
    /// the trailing operand
    Tail {
        code: OperatorCode,
        operands: Vec<Node>,
    },
}

impl Pending {
    fn stack_precedence(&self) -> Option<u8> {
        match self {
            Pending::Open => None,
            Pending::Operator(code) | Pending::Tail { code, .. } => Some(code.stack_precedence()),
        }
    }
}

#[derive(Debug)]
struct Frame {
    operands: Vec<Node>,
    pending: Vec<Pending>,
    last_operand: bool,
    terminators: Vec<&'static str>,
}

impl Frame {
    fn new(terminators: &[&'static str]) -> Self {
        Self {
            operands: Vec::new(),
            pending: Vec::new(),
            last_operand: false,
            terminators: terminators.to_vec(),
        }
    }

    fn has_open(&self) -> bool {
        self.pending.iter().any(|p| matches!(p, Pending::Open))
    }

    fn is_terminator(&self, token: &Token) -> bool {
        self.terminators.iter().any(|t| token.is(t))
    }

    fn push_operand(&mut self, node: Node) {
        self.operands.push(node);
        self.last_operand = true;
    }
}

/// A saved parser position for backtracking.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    position: usize,
    errors: usize,
}

pub(crate) struct Parser<'a> {
    pub(super) rt: &'a mut Runtime,
    pub(super) scope: TupleId,
    pub(super) tokens: &'a mut dyn TokenStream,
    sink: &'a mut dyn Diagnostics,
    /// Errors of the statement being parsed, dropped on backtrack
    pending_errors: Vec<(String, Span)>,
    /// Every error forwarded to the sink
    errors: Vec<String>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        rt: &'a mut Runtime,
        scope: TupleId,
        tokens: &'a mut dyn TokenStream,
        sink: &'a mut dyn Diagnostics,
    ) -> Self {
        Self {
            rt,
            scope,
            tokens,
            sink,
            pending_errors: Vec::new(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Forward buffered errors and return every error seen.
    pub(crate) fn finish(mut self) -> Vec<String> {
        self.flush();
        self.errors
    }

    // ═══════════════════════════════════════════════════════════════════
    // Errors and backtracking
    // ═══════════════════════════════════════════════════════════════════

    pub(super) fn error(&mut self, message: impl Into<String>, span: Span) {
        self.pending_errors.push((message.into(), span));
    }

    pub(super) fn error_here(&mut self, message: impl Into<String>) {
        let span = self.tokens.current().span;
        self.error(message, span);
    }

    fn flush(&mut self) {
        for (message, span) in self.pending_errors.drain(..) {
            warn!(%span, "{message}");
            self.sink.error(&message, span);
            self.errors.push(message);
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.tokens.position(),
            errors: self.pending_errors.len(),
        }
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.tokens.seek(checkpoint.position);
        self.pending_errors.truncate(checkpoint.errors);
    }

    /// Skip to the end of the current statement (`;` is left in place).
    pub(super) fn skip_statement(&mut self) {
        while !matches!(
            self.tokens.current().kind,
            TokenKind::Semicolon | TokenKind::Eof
        ) {
            self.tokens.advance(1);
        }
    }

    pub(super) fn release_all(&mut self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            node.release(self.rt);
        }
    }

    fn abandon(&mut self, frame: Frame) -> Option<Node> {
        self.release_frame(frame);
        self.skip_statement();
        None
    }

    fn release_frame(&mut self, frame: Frame) {
        self.release_all(frame.operands);
        for pending in frame.pending {
            if let Pending::Tail { operands, .. } = pending {
                self.release_all(operands);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════

    /// Parse `;`-separated expressions up to the end of input.
    ///
    /// A statement with errors is skipped; parsing resumes after the next
    /// `;`.
    pub(crate) fn parse_roots(&mut self) -> Vec<Node> {
        let mut roots = Vec::new();
        while !self.tokens.at_end() {
            if self.tokens.current().kind == TokenKind::Semicolon {
                self.tokens.advance(1);
                continue;
            }
            let root = self.parse_frame(&[]);
            match self.tokens.current().kind {
                TokenKind::Semicolon | TokenKind::Eof => {}
                _ => {
                    if root.is_some() {
                        let text = self.tokens.current().text.clone();
                        self.error_here(format!("unexpected `{text}` after expression"));
                    }
                    self.skip_statement();
                }
            }
            let failed = !self.pending_errors.is_empty();
            self.flush();
            match root {
                Some(node) if failed => node.release(self.rt),
                Some(node) => roots.push(node),
                None => {}
            }
        }
        roots
    }

    /// Parse one expression, stopping at `;`, end of input, an unmatched
    /// `,` or `)`, or any of `terminators`.
    pub(super) fn parse_frame(&mut self, terminators: &[&'static str]) -> Option<Node> {
        self.depth += 1;
        let result = if !self.rt.context().allows(self.depth) {
            let max = self.rt.context().max_depth;
            self.error_here(format!("expression nested deeper than {max} levels"));
            self.skip_statement();
            None
        } else {
            self.run_frame(terminators)
        };
        self.depth -= 1;
        result
    }

    /// Run `parse` one nesting level deeper; past the context's depth limit
    /// an error is reported instead.
    pub(super) fn nested<T>(
        &mut self,
        what: &str,
        parse: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        self.depth += 1;
        let result = if self.rt.context().allows(self.depth) {
            parse(self)
        } else {
            let max = self.rt.context().max_depth;
            self.error_here(format!("{what} nested deeper than {max} levels"));
            None
        };
        self.depth -= 1;
        result
    }

    fn run_frame(&mut self, terminators: &[&'static str]) -> Option<Node> {
        let mut frame = Frame::new(terminators);
        loop {
            let token = self.tokens.current().clone();
            match token.kind {
                TokenKind::Eof | TokenKind::Semicolon => break,
                TokenKind::Comma | TokenKind::RParen if !frame.has_open() => break,
                _ if !frame.has_open() && frame.is_terminator(&token) => break,
                TokenKind::Comma => {
                    self.error("unexpected `,` inside parentheses", token.span);
                    return self.abandon(frame);
                }
                TokenKind::RParen => {
                    if !frame.last_operand {
                        self.error("expected an operand before `)`", token.span);
                        return self.abandon(frame);
                    }
                    if !self.close_group(&mut frame) {
                        return self.abandon(frame);
                    }
                    self.tokens.advance(1);
                    frame.last_operand = true;
                }
                TokenKind::LParen => {
                    if frame.last_operand {
                        self.error("unexpected `(` after an operand", token.span);
                        return self.abandon(frame);
                    }
                    frame.pending.push(Pending::Open);
                    self.tokens.advance(1);
                }
                TokenKind::Symbol | TokenKind::Keyword => {
                    if !self.operator(&mut frame, &token) {
                        return self.abandon(frame);
                    }
                }
                TokenKind::Invalid => {
                    self.error(format!("unrecognized input `{}`", token.text), token.span);
                    return self.abandon(frame);
                }
                _ if frame.last_operand => {
                    self.error(
                        format!("unexpected `{}`; expected an operator", token.text),
                        token.span,
                    );
                    return self.abandon(frame);
                }
                TokenKind::Ident => {
                    let node = if self.tokens.peek(1).kind == TokenKind::LParen {
                        self.parse_call(&token)
                    } else {
                        self.tokens.advance(1);
                        Some(self.variable(&token))
                    };
                    match node {
                        Some(node) => frame.push_operand(node),
                        None => return self.abandon(frame),
                    }
                }
                _ => match self.operand(&token) {
                    Some(node) => frame.push_operand(node),
                    None => return self.abandon(frame),
                },
            }
        }
        self.finish_frame(frame)
    }

    fn finish_frame(&mut self, mut frame: Frame) -> Option<Node> {
        if !frame.last_operand {
            if frame.operands.is_empty() && frame.pending.is_empty() {
                self.error_here("expected an expression");
            } else {
                self.error_here("expected an operand");
            }
            return self.abandon(frame);
        }
        while let Some(pending) = frame.pending.pop() {
            if matches!(pending, Pending::Open) {
                self.error_here("unclosed `(`");
                return self.abandon(frame);
            }
            if !self.reduce(&mut frame, pending) {
                return self.abandon(frame);
            }
        }
        let root = frame.operands.pop();
        debug_assert!(frame.operands.is_empty());
        self.release_frame(frame);
        root
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reduction
    // ═══════════════════════════════════════════════════════════════════

    fn reduce(&mut self, frame: &mut Frame, pending: Pending) -> bool {
        let span = self.tokens.current().span;
        let node = match pending {
            Pending::Open => return false,
            Pending::Operator(code) => {
                let arity = code.num_operands();
                if frame.operands.len() < arity {
                    self.error(format!("missing operand for `{code}`"), span);
                    return false;
                }
                let children = frame.operands.split_off(frame.operands.len() - arity);
                self.bind(OperatorNode::new(code, children), span)
            }
            Pending::Tail { code, mut operands } => match frame.operands.pop() {
                Some(trailing) => {
                    operands.push(trailing);
                    self.bind(OperatorNode::new(code, operands), span)
                }
                None => {
                    self.error(format!("missing operand for `{code}`"), span);
                    self.release_all(operands);
                    return false;
                }
            },
        };
        match node {
            Some(node) => {
                frame.operands.push(node);
                true
            }
            None => false,
        }
    }

    /// Reduce pending operators binding at least as tightly as `precedence`.
    fn reduce_while(&mut self, frame: &mut Frame, precedence: u8) -> bool {
        while frame
            .pending
            .last()
            .and_then(Pending::stack_precedence)
            .is_some_and(|top| top >= precedence)
        {
            let Some(pending) = frame.pending.pop() else {
                break;
            };
            if !self.reduce(frame, pending) {
                return false;
            }
        }
        true
    }

    /// Reduce up to and including the innermost open parenthesis.
    fn close_group(&mut self, frame: &mut Frame) -> bool {
        loop {
            match frame.pending.pop() {
                Some(Pending::Open) => return true,
                Some(pending) => {
                    if !self.reduce(frame, pending) {
                        return false;
                    }
                }
                None => {
                    self.error_here("unmatched `)`");
                    return false;
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════

    fn operator(&mut self, frame: &mut Frame, token: &Token) -> bool {
        let prefix_position = !frame.last_operand;
        let sequences = OperatorCode::sequences_starting(&token.text, prefix_position);
        if !sequences.is_empty() {
            return self.resolve_sequence(frame, sequences, token);
        }

        let Some(code) = OperatorCode::map_code(&token.text, prefix_position) else {
            let other_position = OperatorCode::map_code(&token.text, !prefix_position).is_some()
                || !OperatorCode::sequences_starting(&token.text, !prefix_position).is_empty();
            let message = match (other_position, prefix_position) {
                (true, true) => format!("missing left operand for `{}`", token.text),
                (true, false) => format!("`{}` cannot follow an operand", token.text),
                (false, _) => format!("unexpected `{}`", token.text),
            };
            self.error(message, token.span);
            return false;
        };
        self.tokens.advance(1);

        match code.num_operands() {
            0 => match self.bind(OperatorNode::new(code, Vec::new()), token.span) {
                Some(node) => {
                    frame.push_operand(node);
                    true
                }
                None => false,
            },
            1 => {
                frame.pending.push(Pending::Operator(code));
                frame.last_operand = false;
                true
            }
            _ => {
                if !self.reduce_while(frame, code.input_precedence()) {
                    return false;
                }
                frame.pending.push(Pending::Operator(code));
                frame.last_operand = false;
                true
            }
        }
    }

    fn resolve_sequence(
        &mut self,
        frame: &mut Frame,
        candidates: Vec<OperatorCode>,
        token: &Token,
    ) -> bool {
        let mut operands = Vec::new();
        if frame.last_operand {
            let precedence = candidates
                .iter()
                .map(|c| c.input_precedence())
                .max()
                .unwrap_or_default();
            if !self.reduce_while(frame, precedence) {
                return false;
            }
            match frame.operands.pop() {
                Some(left) => operands.push(left),
                None => {
                    self.error(format!("missing left operand for `{}`", token.text), token.span);
                    return false;
                }
            }
            frame.last_operand = false;
        }
        self.tokens.advance(1);

        let mut candidates = candidates;
        let mut step = 1;
        loop {
            let (ended, alive): (Vec<OperatorCode>, Vec<OperatorCode>) = candidates
                .iter()
                .copied()
                .partition(|c| sequence_len(*c) <= step);
            if alive.is_empty() {
                break;
            }
            let next = self.tokens.current().clone();

            // A prefix sub-token decides on its own.
            if let Some(chosen) = alive.iter().copied().find(|c| {
                sub_token(*c, step).is_some_and(|(text, prefix)| prefix && next.is(text))
            }) {
                candidates = vec![chosen];
                self.tokens.advance(1);
                step += 1;
                continue;
            }

            let alive: Vec<OperatorCode> = alive
                .into_iter()
                .filter(|c| sub_token(*c, step).is_some_and(|(_, prefix)| !prefix))
                .collect();
            if alive.is_empty() {
                candidates = ended;
                break;
            }

            let mut terminators: Vec<&'static str> = alive
                .iter()
                .filter_map(|c| sub_token(*c, step).map(|(text, _)| text))
                .collect();
            terminators.extend(frame.terminators.iter().copied());

            let checkpoint = self.checkpoint();
            let Some(operand) = self.parse_frame(&terminators) else {
                self.release_all(operands);
                return false;
            };
            let after = self.tokens.current().clone();
            let survivors: Vec<OperatorCode> = alive
                .iter()
                .copied()
                .filter(|c| sub_token(*c, step).is_some_and(|(text, _)| after.is(text)))
                .collect();

            if !survivors.is_empty() {
                operands.push(operand);
                self.tokens.advance(1);
                candidates = survivors;
                step += 1;
                continue;
            }
            if !ended.is_empty() {
                // The operand belongs to a shorter sequence: parse it again
                // by precedence.
                operand.release(self.rt);
                self.rewind(checkpoint);
                candidates = ended;
                break;
            }

            let expected = alive
                .iter()
                .filter_map(|c| sub_token(*c, step).map(|(text, _)| format!("`{text}`")))
                .collect::<Vec<_>>()
                .join(" or ");
            self.error(
                format!("expected {expected} to continue `{}`", token.text),
                after.span,
            );
            operand.release(self.rt);
            self.release_all(operands);
            return false;
        }

        let [code] = candidates[..] else {
            self.error(format!("ambiguous operator `{}`", token.text), token.span);
            self.release_all(operands);
            return false;
        };
        debug!(operator = %code, inner = operands.len(), "resolved operator sequence");
        frame.pending.push(Pending::Tail { code, operands });
        frame.last_operand = false;
        true
    }

    // ═══════════════════════════════════════════════════════════════════
    // Names and calls
    // ═══════════════════════════════════════════════════════════════════

    /// A bare identifier: the nearest variable, or else a name literal.
    fn variable(&mut self, token: &Token) -> Node {
        match self.rt.variable_cell(self.scope, &token.text) {
            Some(attr) => Node::Value {
                attr,
                label: Some(token.text.clone()),
            },
            None => Node::literal(Attribute::of(Name::new(token.text.as_str()))),
        }
    }

    /// `name(arg, key = arg, ...)`
    fn parse_call(&mut self, token: &Token) -> Option<Node> {
        self.tokens.advance(2);
        let mut args = Vec::new();
        let mut names = Vec::new();

        if self.tokens.current().kind == TokenKind::RParen {
            self.tokens.advance(1);
        } else {
            loop {
                let name = (self.tokens.current().kind == TokenKind::Ident
                    && self.tokens.peek(1).is("="))
                .then(|| self.tokens.current().text.clone());
                if name.is_some() {
                    self.tokens.advance(2);
                }
                let Some(arg) = self.parse_frame(&[]) else {
                    self.release_all(args);
                    return None;
                };
                args.push(arg);
                names.push(name);

                match self.tokens.current().kind {
                    TokenKind::Comma => self.tokens.advance(1),
                    TokenKind::RParen => {
                        self.tokens.advance(1);
                        break;
                    }
                    _ => {
                        self.error_here(format!(
                            "expected `,` or `)` in call to `{}`",
                            token.text
                        ));
                        self.release_all(args);
                        return None;
                    }
                }
            }
        }
        self.bind(OperatorNode::call(&token.text, args, names), token.span)
    }
}

fn sequence_len(code: OperatorCode) -> usize {
    code.sequence().map_or(1, <[_]>::len)
}

fn sub_token(code: OperatorCode, step: usize) -> Option<(&'static str, bool)> {
    code.sequence()
        .and_then(|s| s.get(step))
        .map(|sub| (sub.text, sub.prefix))
}
