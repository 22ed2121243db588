//! Expression tree nodes

use std::rc::Rc;

use tracing::trace;

use crate::action::{Action, Signal, Stack};
use crate::error::{Result, TuplexError};
use crate::operators::OperatorCode;
use crate::render::TextBuilder;
use crate::runtime::Runtime;
use crate::types::TypeTuple;
use crate::value::Attribute;

/// A node of a parsed expression.
#[derive(Debug)]
pub enum Node {
    /// A literal or a resolved variable
    Value {
        /// The cell (owned for literals, usually an alias for variables)
        attr: Attribute,
        /// Variable name, for rendering
        label: Option<String>,
    },
    /// An operator or call applied to child nodes
    Operator(OperatorNode),
}

/// An operator application, bound to an action at parse time.
#[derive(Debug)]
pub struct OperatorNode {
    pub(crate) code: OperatorCode,
    pub(crate) name: String,
    pub(crate) action: Option<Rc<Action>>,
    pub(crate) ret: Option<TypeTuple>,
    pub(crate) children: Vec<Node>,
    pub(crate) arg_names: Vec<Option<String>>,
}

impl OperatorNode {
    pub(crate) fn new(code: OperatorCode, children: Vec<Node>) -> Self {
        Self {
            code,
            name: code.action_name().to_string(),
            action: None,
            ret: None,
            children,
            arg_names: Vec::new(),
        }
    }

    pub(crate) fn call(name: &str, children: Vec<Node>, arg_names: Vec<Option<String>>) -> Self {
        Self {
            code: OperatorCode::Call,
            name: name.to_string(),
            action: None,
            ret: None,
            children,
            arg_names,
        }
    }

    /// The operator code
    pub fn code(&self) -> OperatorCode {
        self.code
    }

    /// Name of the bound action (or called function)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound action
    pub fn action(&self) -> Option<&Rc<Action>> {
        self.action.as_ref()
    }

    /// Child nodes in evaluation order
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    fn evaluate(&self, rt: &mut Runtime, depth: usize) -> Result<(Signal, Attribute)> {
        let action = self
            .action
            .clone()
            .ok_or_else(|| TuplexError::not_found(format!("action bound to `{}`", self.name)))?;
        let mut stack = Stack::new(self.name.as_str());

        if self.code.is_conditional() {
            // Only the chosen branch runs; the other one is pushed as void.
            let Some((condition, branches)) = self.children.split_first() else {
                return Err(TuplexError::StackUnderflow {
                    action: self.name.clone(),
                });
            };
            let (signal, cond) = condition.evaluate(rt, depth + 1)?;
            if !signal.is_normal() {
                return Ok((signal, cond));
            }
            let truth = cond.value::<bool>()?;
            stack.push(cond);
            for (i, branch) in branches.iter().enumerate() {
                if (i == 0) == truth {
                    let (signal, value) = branch.evaluate(rt, depth + 1)?;
                    if !signal.is_normal() {
                        return Ok((signal, value));
                    }
                    stack.push(value);
                } else {
                    stack.push(Attribute::void());
                }
            }
        } else {
            for child in &self.children {
                let (signal, value) = child.evaluate(rt, depth + 1)?;
                if !signal.is_normal() {
                    return Ok((signal, value));
                }
                stack.push(value);
            }
        }

        if rt.context().trace {
            trace!(action = %action.signature(), depth, "evaluate");
        }
        let signal = action.call(rt, &mut stack)?;
        Ok((signal, stack.into_result()))
    }
}

impl Node {
    /// A literal value node.
    pub fn literal(attr: Attribute) -> Self {
        Node::Value { attr, label: None }
    }

    /// The node's type: the cell's type for values, the bound return type
    /// for operators.
    pub fn ty(&self) -> Option<TypeTuple> {
        match self {
            Node::Value { attr, .. } => Some(attr.ty().clone()),
            Node::Operator(op) => op.ret.clone(),
        }
    }

    /// Evaluate the node.
    ///
    /// Value nodes yield their held cell: scalars as a copy (or a fresh
    /// reference for aliased variables), nested tuples as a non-owning
    /// handle. Operator nodes evaluate their children left to right onto a
    /// fresh stack and run the bound action.
    pub fn evaluate(&self, rt: &mut Runtime, depth: usize) -> Result<(Signal, Attribute)> {
        if !rt.context().allows(depth) {
            let max = rt.context().max_depth;
            return Err(TuplexError::DepthExceeded { depth, max });
        }
        match self {
            Node::Value { attr, .. } => {
                let value = if attr.tuple_id().is_some() {
                    attr.shared()
                } else {
                    attr.reborrow()
                };
                Ok((Signal::Normal, value))
            }
            Node::Operator(op) => op.evaluate(rt, depth),
        }
    }

    /// Free any tuple owned by literals in this subtree.
    pub fn release(self, rt: &mut Runtime) {
        match self {
            Node::Value { attr, .. } => rt.release(attr),
            Node::Operator(op) => {
                for child in op.children {
                    child.release(rt);
                }
            }
        }
    }

    /// Render fully parenthesized: `(1 + (2 * 3))`.
    pub fn render(&self, rt: &Runtime, out: &mut dyn TextBuilder) {
        match self {
            Node::Value {
                label: Some(label), ..
            } => out.word(label),
            Node::Value { attr, .. } => match rt.attribute_text(attr) {
                Ok(text) => out.word(&text),
                Err(_) => out.word("?"),
            },
            Node::Operator(op) => render_operator(op, rt, out),
        }
    }
}

fn render_operator(op: &OperatorNode, rt: &Runtime, out: &mut dyn TextBuilder) {
    use OperatorCode::*;

    let child = |i: usize, out: &mut dyn TextBuilder| {
        if let Some(node) = op.children.get(i) {
            node.render(rt, out);
        }
    };

    match op.code {
        Call => {
            out.word(&op.name);
            out.punct("(");
            for (i, node) in op.children.iter().enumerate() {
                if i > 0 {
                    out.punct(",");
                }
                if let Some(Some(name)) = op.arg_names.get(i) {
                    out.word(name);
                    out.punct("=");
                }
                node.render(rt, out);
            }
            out.punct(")");
        }
        Break | Continue => out.word(op.code.spelling()),
        IfThen | IfThenElse => {
            out.punct("(");
            out.operator("if");
            child(0, out);
            out.operator("then");
            child(1, out);
            if op.code == IfThenElse {
                out.operator("else");
                child(2, out);
            }
            out.punct(")");
        }
        Select => {
            out.punct("(");
            child(0, out);
            out.operator("?");
            child(1, out);
            out.operator(":");
            child(2, out);
            out.punct(")");
        }
        code if code.is_prefix() => {
            out.punct("(");
            out.operator(code.spelling());
            child(0, out);
            out.punct(")");
        }
        code => {
            out.punct("(");
            child(0, out);
            out.operator(code.spelling());
            child(1, out);
            out.punct(")");
        }
    }
}
