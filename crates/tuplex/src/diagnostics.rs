//! Diagnostics sink for parse errors and notes

use std::fmt;

use crate::token::Span;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input is invalid
    Error,
    /// Additional context for a preceding error
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Note => f.write_str("note"),
        }
    }
}

/// One reported message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Where in the source
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.severity, self.message)
    }
}

/// Receives diagnostics from the parser.
///
/// The parser only forwards messages; formatting and filtering are up to
/// the sink.
pub trait Diagnostics {
    /// Report an error.
    fn error(&mut self, message: &str, span: Span);

    /// Report a note.
    fn note(&mut self, message: &str, span: Span);
}

/// A sink that collects every diagnostic in order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any error was reported
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Error diagnostics, in report order
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Every diagnostic, in report order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing was reported
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Forget everything reported so far.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Diagnostics for DiagnosticBag {
    fn error(&mut self, message: &str, span: Span) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            message: message.to_string(),
            span,
        });
    }

    fn note(&mut self, message: &str, span: Span) {
        self.items.push(Diagnostic {
            severity: Severity::Note,
            message: message.to_string(),
            span,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_tracks_errors() {
        let mut bag = DiagnosticBag::new();
        bag.note("just so you know", Span::default());
        assert!(!bag.has_errors());
        bag.error("bad", Span { start: 0, end: 1, line: 2, column: 5 });
        assert!(bag.has_errors());
        assert_eq!(bag.len(), 2);
        let first = bag.errors().next().unwrap();
        assert_eq!(first.to_string(), "2:5: error: bad");
    }
}
