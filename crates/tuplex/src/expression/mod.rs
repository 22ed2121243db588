//! Expressions: parsing, binding and evaluation
//!
//! An [`Expression`] is a list of roots, one per `;`-separated statement.
//! Every operator node is bound to an action while parsing, so evaluation
//! never searches: it evaluates children onto a stack and runs the bound
//! action.
//!
//! # Example
//!
//! ```
//! use tuplex::{Expression, Runtime};
//!
//! let mut rt = Runtime::new();
//! let scope = rt.global();
//! let expr = Expression::from_source(&mut rt, scope, "1 + 2 * 3; (1 + 2) * 3").unwrap();
//! let results = expr.evaluate(&mut rt).unwrap();
//! let values: Vec<i32> = results.iter().map(|r| r.value.value::<i32>().unwrap()).collect();
//! assert_eq!(values, vec![7, 9]);
//! expr.release(&mut rt);
//! ```

mod binding;
mod literal;
mod node;
mod parser;

pub use literal::parse_value;
pub use node::{Node, OperatorNode};

use tracing::instrument;

use crate::action::Signal;
use crate::diagnostics::{DiagnosticBag, Diagnostics};
use crate::error::{Result, TuplexError};
use crate::render::{render_to_string, TextBuilder};
use crate::runtime::Runtime;
use crate::token::{TokenBuffer, TokenStream};
use crate::tuple::TupleId;
use crate::value::Attribute;
use parser::Parser;

/// Result of evaluating one root.
#[derive(Debug)]
pub struct Outcome {
    /// How evaluation ended
    pub signal: Signal,
    /// The value produced (the raised condition for [`Signal::Raise`])
    pub value: Attribute,
}

/// A parsed, fully bound expression.
///
/// Literal tuples inside the expression are owned by it; call
/// [`release`](Expression::release) to free them.
#[derive(Debug)]
pub struct Expression {
    roots: Vec<Node>,
    scope: TupleId,
}

impl Expression {
    /// Parse `tokens` in `scope`.
    ///
    /// Variables, types and the root action table are resolved from
    /// `scope`. Every error is reported to `diagnostics`; when any occurred
    /// the whole expression is rejected.
    #[instrument(level = "debug", skip_all, fields(%scope))]
    pub fn parse(
        rt: &mut Runtime,
        scope: TupleId,
        tokens: &mut dyn TokenStream,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Expression> {
        rt.tuple(scope)?;
        let mut parser = Parser::new(rt, scope, tokens, diagnostics);
        let roots = parser.parse_roots();
        let errors = parser.finish();
        if !errors.is_empty() {
            for root in roots {
                root.release(rt);
            }
            return Err(TuplexError::InvalidExpression { errors });
        }
        Ok(Expression { roots, scope })
    }

    /// Lex and parse `source`, collecting diagnostics internally.
    pub fn from_source(rt: &mut Runtime, scope: TupleId, source: &str) -> Result<Expression> {
        let mut tokens = TokenBuffer::lex(source);
        let mut diagnostics = DiagnosticBag::new();
        Self::parse(rt, scope, &mut tokens, &mut diagnostics)
    }

    /// Evaluate every root in order.
    ///
    /// A `Return` signal stops evaluation after its root; other signals are
    /// reported per root. Tuple values that come straight from literals are
    /// handles on the expression's own tuples and live as long as it does.
    #[instrument(level = "debug", skip_all, fields(scope = %self.scope, roots = self.roots.len()))]
    pub fn evaluate(&self, rt: &mut Runtime) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            let (signal, value) = root.evaluate(rt, 1)?;
            outcomes.push(Outcome { signal, value });
            if signal == Signal::Return {
                break;
            }
        }
        Ok(outcomes)
    }

    /// The scope the expression was parsed in
    pub fn scope(&self) -> TupleId {
        self.scope
    }

    /// Root nodes, one per statement
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Number of statements
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Check if the expression has no statements
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Free the tuples owned by literals.
    pub fn release(self, rt: &mut Runtime) {
        for root in self.roots {
            root.release(rt);
        }
    }

    /// Render every root fully parenthesized, separated by `;`.
    pub fn render(&self, rt: &Runtime, out: &mut dyn TextBuilder) {
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                out.punct(";");
            }
            root.render(rt, out);
        }
    }

    /// Render with the default layout.
    pub fn to_text(&self, rt: &Runtime) -> String {
        render_to_string(|out| self.render(rt, out))
    }
}
