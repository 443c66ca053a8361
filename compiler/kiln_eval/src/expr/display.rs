//! S-expression rendering of trees.
//!
//! Slots print by declared name; a slot read through `d` lexical links prints
//! as `name^d`. Tail calls print as `(tail f x)`.

use std::fmt;

use super::{Expr, ExprKind};
use crate::frame::SlotId;
use crate::Value;

struct SlotRef(SlotId, usize);

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            0 => write!(f, "{}", self.0),
            depth => write!(f, "{}^{depth}", self.0),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            // Primitive and other named closure constants print as their name.
            ExprKind::Literal(Value::Closure(c)) if !c.name().is_empty() => {
                write!(f, "{}", c.name())
            }
            ExprKind::Literal(value) => write!(f, "{value}"),
            ExprKind::Read { slot, depth } => write!(f, "{}", SlotRef(*slot, *depth)),
            ExprKind::Write { slot, depth, value } => {
                write!(f, "(set! {} {value})", SlotRef(*slot, *depth))
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "(if {cond} {then_branch} {else_branch})"),
            ExprKind::Begin(exprs) => {
                f.write_str("(begin")?;
                for e in exprs {
                    write!(f, " {e}")?;
                }
                f.write_str(")")
            }
            ExprKind::Lambda(code) => {
                f.write_str("(lambda ")?;
                if !code.name().is_empty() {
                    write!(f, "{} ", code.name())?;
                }
                f.write_str("(")?;
                for (i, param) in code.params().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {})", code.body())
            }
            ExprKind::Apply(node) => {
                if node.is_tail() {
                    f.write_str("(tail ")?;
                } else {
                    f.write_str("(")?;
                }
                write!(f, "{}", node.callee())?;
                for arg in node.args() {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
