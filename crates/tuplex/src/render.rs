//! Append-only text building for rendering types, tuples and expressions
//!
//! Renderers never produce strings directly. They describe their output as
//! a sequence of primitives (words, punctuation, operators, blocks and line
//! breaks) so that a downstream formatter can choose its own layout.
//! [`PlainText`] is the default layout used by `Display` impls.

/// Sink for rendered text.
pub trait TextBuilder {
    /// An atom: a name, a literal, a keyword.
    fn word(&mut self, word: &str);

    /// Punctuation that attaches to its neighbours (`(`, `)`, `,`, `=`, `:`).
    fn punct(&mut self, punct: &str);

    /// An infix operator, spaced on both sides.
    fn operator(&mut self, op: &str);

    /// Increase indentation for subsequent lines.
    fn start_block(&mut self);

    /// Decrease indentation for subsequent lines.
    fn end_block(&mut self);

    /// Start a new line at the current indentation.
    fn line_break(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    LineStart,
    Word,
    Open,
    Close,
    Separator,
    Attached,
    Operator,
}

/// Default layout: single spaces between words, two-space indentation.
#[derive(Debug, Clone)]
pub struct PlainText {
    out: String,
    indent: usize,
    last: Last,
}

impl Default for PlainText {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainText {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            last: Last::LineStart,
        }
    }

    /// The text produced so far.
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consume the builder and return the text.
    pub fn finish(self) -> String {
        self.out
    }

    fn space_if(&mut self, needed: bool) {
        if needed {
            self.out.push(' ');
        }
    }
}

impl TextBuilder for PlainText {
    fn word(&mut self, word: &str) {
        let needed = matches!(
            self.last,
            Last::Word | Last::Close | Last::Separator | Last::Operator
        );
        self.space_if(needed);
        self.out.push_str(word);
        self.last = Last::Word;
    }

    fn punct(&mut self, punct: &str) {
        match punct {
            "(" | "[" => {
                let needed = matches!(self.last, Last::Separator | Last::Operator);
                self.space_if(needed);
                self.last = Last::Open;
            }
            ")" | "]" => self.last = Last::Close,
            "," | ";" => self.last = Last::Separator,
            _ => self.last = Last::Attached,
        }
        self.out.push_str(punct);
    }

    fn operator(&mut self, op: &str) {
        let needed = !matches!(self.last, Last::LineStart | Last::Open);
        self.space_if(needed);
        self.out.push_str(op);
        self.last = Last::Operator;
    }

    fn start_block(&mut self) {
        self.indent += 1;
    }

    fn end_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn line_break(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.last = Last::LineStart;
    }
}

/// Run a renderer against a fresh [`PlainText`] and return the result.
pub fn render_to_string(render: impl FnOnce(&mut dyn TextBuilder)) -> String {
    let mut text = PlainText::new();
    render(&mut text);
    text.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_and_separators() {
        let mut t = PlainText::new();
        t.word("T");
        t.punct("(");
        t.word("int");
        t.punct(",");
        t.word("x");
        t.punct("=");
        t.word("float");
        t.punct(",");
        t.punct("(");
        t.word("a");
        t.punct(")");
        t.punct(")");
        assert_eq!(t.finish(), "T(int, x=float, (a))");
    }

    #[test]
    fn test_operator_spacing() {
        let mut t = PlainText::new();
        t.punct("(");
        t.word("1");
        t.operator("+");
        t.punct("(");
        t.word("2");
        t.operator("*");
        t.word("3");
        t.punct(")");
        t.punct(")");
        assert_eq!(t.finish(), "(1 + (2 * 3))");
    }

    #[test]
    fn test_blocks_indent_lines() {
        let text = render_to_string(|t| {
            t.word("P");
            t.punct("(");
            t.start_block();
            t.line_break();
            t.word("x");
            t.end_block();
            t.line_break();
            t.punct(")");
        });
        assert_eq!(text, "P(\n  x\n)");
    }
}
