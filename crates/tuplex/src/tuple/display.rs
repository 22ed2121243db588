//! Text rendering of tuples
//!
//! ```text
//! P(x=1, y="two",
//!   (3, 4),
//!   inner:
//!     D(5)
//! )
//! ```
//!
//! Scalars share a line; unnamed nested tuples go on their own indented
//! line; named nested tuples render as `name:` followed by an indented
//! block. The kind prefix is only written when the kind changes from the
//! enclosing tuple, so a bare `(` inside a tuple means "same kind as the
//! parent".

use super::{TupleId, TupleKind};
use crate::error::Result;
use crate::render::TextBuilder;
use crate::runtime::Runtime;
use crate::value::{raw_text, Attribute};

pub(crate) fn render_tuple(
    rt: &Runtime,
    id: TupleId,
    enclosing: Option<&TupleKind>,
    out: &mut dyn TextBuilder,
) -> Result<()> {
    let tuple = rt.tuple(id)?;
    let kind = tuple.kind();
    if enclosing != Some(kind) {
        out.word(kind.prefix());
    }
    out.punct("(");

    let mut in_block = false;
    let mut after_tuple = false;
    for (i, (name, attr)) in tuple.iter().enumerate() {
        if i > 0 {
            out.punct(",");
        }
        match attr.tuple_id() {
            Some(child) => {
                if !in_block {
                    out.start_block();
                    in_block = true;
                }
                out.line_break();
                match name {
                    Some(name) => {
                        out.word(name);
                        out.punct(":");
                        out.start_block();
                        out.line_break();
                        render_tuple(rt, child, Some(kind), out)?;
                        out.end_block();
                    }
                    None => render_tuple(rt, child, Some(kind), out)?,
                }
                after_tuple = true;
            }
            None => {
                if after_tuple {
                    out.line_break();
                    after_tuple = false;
                }
                if let Some(name) = name {
                    out.word(name);
                    out.punct("=");
                }
                out.word(&scalar_text(rt, attr));
            }
        }
    }

    if in_block {
        out.end_block();
        out.line_break();
    }
    out.punct(")");
    Ok(())
}

/// Literal text of a non-tuple attribute.
pub(crate) fn scalar_text(rt: &Runtime, attr: &Attribute) -> String {
    let value = attr.raw();
    rt.handlers()
        .format(attr.ty(), &value)
        .unwrap_or_else(|| raw_text(&value))
}
