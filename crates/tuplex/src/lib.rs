//! # Tuplex
//!
//! Runtime core of a small, dynamically typed, tuple-oriented expression
//! language.
//!
//! Tuplex provides structural type descriptors, scoped attribute tuples with
//! permission bits, a registry of typed actions, and an operator-precedence
//! parser that binds every operator to an action at parse time and then
//! evaluates the resulting tree against a value stack.
//!
//! ## Architecture
//!
//! - **Types**: [`TypeTuple`] leaf names and ordered trees with one-way
//!   structural compatibility
//! - **Values**: [`Attribute`] cells pairing a value with its type, either
//!   owned or aliasing another cell
//! - **Tuples**: ordered, optionally named attributes in a [`Runtime`] arena,
//!   linked by parent ids into scope chains
//! - **Actions**: [`Action`]s keyed by their full [`Signature`], resolved at
//!   the root scope
//! - **Expressions**: [`Expression::parse`] builds a bound tree;
//!   [`Expression::evaluate`] runs it and reports a [`Signal`] per statement
//!
//! ## Example
//!
//! ```
//! use tuplex::{Attribute, Expression, Runtime, Signal, TupleKind};
//!
//! let mut rt = Runtime::new();
//! let scope = rt.create(TupleKind::Dynamic, Some(rt.global()));
//! rt.add(scope, Some("x"), Attribute::of(6i32)).unwrap();
//!
//! let expr = Expression::from_source(&mut rt, scope, "x *= 7; x / 0").unwrap();
//! let results = expr.evaluate(&mut rt).unwrap();
//! assert_eq!(results[0].value.value::<i32>().unwrap(), 42);
//! assert_eq!(results[1].signal, Signal::Raise);
//! assert_eq!(rt.tuple(scope).unwrap().at::<i32>("x").unwrap(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub(crate) mod builtins;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod operators;
pub mod render;
pub mod runtime;
pub mod token;
pub mod tuple;
pub mod types;
pub mod value;

// Re-export main types
pub use action::{category, raised_type, Action, ActionFn, Signal, Signature, Stack};
pub use builtins::conditions;
pub use context::EvalContext;
pub use diagnostics::{Diagnostic, DiagnosticBag, Diagnostics, Severity};
pub use error::{Result, TuplexError};
pub use expression::{parse_value, Expression, Node, OperatorNode, Outcome};
pub use operators::{OperatorCode, SubToken};
pub use render::{render_to_string, PlainText, TextBuilder};
pub use runtime::Runtime;
pub use token::{Span, Token, TokenBuffer, TokenKind, TokenStream};
pub use tuple::{is_data_type, Key, Permissions, Tuple, TupleId, TupleKind};
pub use types::{names, TypeField, TypeTuple};
pub use value::{Attribute, Hint, Name, NamePath, NativeType, Pattern, TypeHandler, TypeHandlers, Value};

/// Tuplex version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
