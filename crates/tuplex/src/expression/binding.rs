//! Binding operator nodes to actions
//!
//! Every node is bound while the parser reduces it: the operand types form
//! an owner type and an argument tuple, and the action table at the root
//! scope is searched for a signature accepting them. When several accept,
//! the most specific wins.

use std::rc::Rc;

use tracing::debug;

use super::node::{Node, OperatorNode};
use super::parser::Parser;
use crate::action::{category, Action};
use crate::operators::OperatorCode;
use crate::token::Span;
use crate::types::{names, TypeField, TypeTuple};
use crate::value::{Attribute, Name};

enum Choice {
    None,
    One(Rc<Action>),
    Ambiguous(usize),
}

/// Pick the signature that refines every other candidate.
fn most_specific(candidates: &[Rc<Action>]) -> Choice {
    match candidates {
        [] => Choice::None,
        [only] => Choice::One(Rc::clone(only)),
        _ => {
            let best: Vec<&Rc<Action>> = candidates
                .iter()
                .filter(|c| {
                    candidates
                        .iter()
                        .all(|d| Rc::ptr_eq(c, d) || c.signature().refines(d.signature()))
                })
                .collect();
            match best[..] {
                [winner] => Choice::One(Rc::clone(winner)),
                _ => Choice::Ambiguous(candidates.len()),
            }
        }
    }
}

/// Owner type and argument tuple of an operator node.
fn operand_types(node: &OperatorNode) -> (TypeTuple, TypeTuple) {
    let type_of = |n: &Node| n.ty().unwrap_or_else(TypeTuple::any);
    match node.code {
        OperatorCode::Call => {
            let fields = node
                .children
                .iter()
                .zip(node.arg_names.iter().chain(std::iter::repeat(&None)))
                .map(|(child, name)| TypeField {
                    name: name.clone(),
                    ty: type_of(child),
                })
                .collect();
            (TypeTuple::void(), TypeTuple::Tree(fields))
        }
        _ => match node.children.split_first() {
            Some((owner, rest)) => (type_of(owner), TypeTuple::of(rest.iter().map(type_of))),
            None => (TypeTuple::void(), TypeTuple::tree()),
        },
    }
}

impl Parser<'_> {
    /// Bind `node` to an action, or report why it cannot be bound.
    ///
    /// On failure the node's children are released.
    pub(super) fn bind(&mut self, mut node: OperatorNode, span: Span) -> Option<Node> {
        if matches!(node.code, OperatorCode::Is | OperatorCode::IsNot) {
            self.coerce_type_operand(&mut node);
        }
        let (owner, args) = operand_types(&node);

        let candidates = self.candidates(&node, &owner, &args);
        match most_specific(&candidates) {
            Choice::One(action) => {
                self.finish_binding(&mut node, action, &owner, &args);
                Some(Node::Operator(node))
            }
            Choice::Ambiguous(count) => {
                self.error(
                    format!(
                        "ambiguous `{}` for owner {owner} and arguments {args}: {count} signatures match",
                        node.name
                    ),
                    span,
                );
                self.release_all(node.children);
                None
            }
            Choice::None => {
                let node = if node.code.is_relational() {
                    match self.compare_fallback(node, &owner, &args) {
                        Ok(rewritten) => return Some(rewritten),
                        Err(node) => node,
                    }
                } else {
                    node
                };
                let message = if node.code == OperatorCode::Call {
                    format!("no function `{}` accepting {args}", node.name)
                } else {
                    format!("no action `{}` for owner {owner} and arguments {args}", node.name)
                };
                self.error(message, span);
                self.release_all(node.children);
                None
            }
        }
    }

    fn candidates(&self, node: &OperatorNode, owner: &TypeTuple, args: &TypeTuple) -> Vec<Rc<Action>> {
        if node.code != OperatorCode::Call {
            return self.operators(&node.name, owner, args);
        }
        // A type name calls its constructor; builtin leaf types have
        // conversion functions instead.
        if self.rt.is_type(self.scope, &node.name) {
            let constructors = self.rt.constructors(self.scope, &node.name, args);
            if !constructors.is_empty() {
                return constructors;
            }
        }
        self.rt
            .signatures_matching(self.scope, &node.name, owner, args)
            .into_iter()
            .filter(|a| a.signature().category() == category::FUNCTION)
            .collect()
    }

    fn operators(&self, name: &str, owner: &TypeTuple, args: &TypeTuple) -> Vec<Rc<Action>> {
        self.rt
            .signatures_matching(self.scope, name, owner, args)
            .into_iter()
            .filter(|a| a.signature().category() == category::OPERATOR)
            .collect()
    }

    fn finish_binding(
        &mut self,
        node: &mut OperatorNode,
        action: Rc<Action>,
        owner: &TypeTuple,
        args: &TypeTuple,
    ) {
        let signature = action.signature();
        let returns = signature.resolve_return(owner, args);

        // Named call arguments are evaluated in declaration order.
        if node.code == OperatorCode::Call && node.arg_names.iter().any(Option::is_some) {
            if let Some(positions) = signature.declared_positions(args) {
                let mut slots: Vec<(usize, Node, Option<String>)> = std::mem::take(&mut node.children)
                    .into_iter()
                    .zip(std::mem::take(&mut node.arg_names))
                    .zip(positions)
                    .map(|((child, name), pos)| (pos, child, name))
                    .collect();
                slots.sort_by_key(|(pos, _, _)| *pos);
                for (_, child, name) in slots {
                    node.children.push(child);
                    node.arg_names.push(name);
                }
            }
        }

        debug!(action = %signature, %owner, %args, %returns, "bound");
        node.ret = Some(returns);
        node.action = Some(action);
    }

    /// `a < b` with no `<` for the operands becomes `(a <=> b) < 0`.
    ///
    /// Gives the node back when the operands have no `<=>` either.
    fn compare_fallback(
        &mut self,
        node: OperatorNode,
        owner: &TypeTuple,
        args: &TypeTuple,
    ) -> Result<Node, OperatorNode> {
        let compare_name = OperatorCode::Cmp.action_name();
        let Choice::One(compare) = most_specific(&self.operators(compare_name, owner, args)) else {
            return Err(node);
        };
        let ordering = compare.signature().resolve_return(owner, args);
        let zero = TypeTuple::name(names::INT);
        let Choice::One(relation) =
            most_specific(&self.operators(&node.name, &ordering, &TypeTuple::of([zero.clone()])))
        else {
            return Err(node);
        };
        let returns = relation.signature().resolve_return(&ordering, &TypeTuple::of([zero]));

        debug!(operator = %node.code, %owner, "comparison rewritten through `<=>`");
        let comparison = OperatorNode {
            code: OperatorCode::Cmp,
            name: compare_name.to_string(),
            action: Some(compare),
            ret: Some(ordering),
            children: node.children,
            arg_names: Vec::new(),
        };
        Ok(Node::Operator(OperatorNode {
            code: node.code,
            name: node.name,
            action: Some(relation),
            ret: Some(returns),
            children: vec![Node::Operator(comparison), Node::literal(Attribute::of(0i32))],
            arg_names: Vec::new(),
        }))
    }

    /// In `x is T`, a bare `T` naming a visible type becomes a type literal.
    fn coerce_type_operand(&mut self, node: &mut OperatorNode) {
        let Some(Node::Value { attr, label: None }) = node.children.last_mut() else {
            return;
        };
        let Ok(name) = attr.value::<Name>() else {
            return;
        };
        if let Some(ty) = self.rt.lookup_type(self.scope, name.as_str()) {
            *attr = Attribute::of(ty);
        }
    }
}
