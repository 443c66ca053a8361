//! Built-in operations.
//!
//! Primitives are ordinary callables: each is wrapped in a [`Closure`] and
//! reached through `Apply` and the call-site cache like user code. Arity is
//! checked at transfer, so `apply` can rely on the argument count.
//!
//! [`Closure`]: crate::Closure

use std::fmt;

use crate::errors::{arithmetic_overflow, arity_mismatch, EvalResult};
use crate::eval_mode::OverflowPolicy;
use crate::print_handler::PrintHandlerImpl;
use crate::value::BoxCell;
use crate::Value;

/// A built-in operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Lt,
    Eq,
    MakeBox,
    Unbox,
    SetBox,
    Println,
}

impl PrimOp {
    pub const ALL: [PrimOp; 9] = [
        PrimOp::Add,
        PrimOp::Sub,
        PrimOp::Mul,
        PrimOp::Lt,
        PrimOp::Eq,
        PrimOp::MakeBox,
        PrimOp::Unbox,
        PrimOp::SetBox,
        PrimOp::Println,
    ];

    /// Name the operation is known by.
    pub fn name(self) -> &'static str {
        match self {
            PrimOp::Add => "add",
            PrimOp::Sub => "sub",
            PrimOp::Mul => "mul",
            PrimOp::Lt => "lt",
            PrimOp::Eq => "eq",
            PrimOp::MakeBox => "box",
            PrimOp::Unbox => "unbox",
            PrimOp::SetBox => "set-box!",
            PrimOp::Println => "println",
        }
    }

    pub fn from_name(name: &str) -> Option<PrimOp> {
        PrimOp::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn arity(self) -> usize {
        match self {
            PrimOp::MakeBox | PrimOp::Unbox | PrimOp::Println => 1,
            PrimOp::Add | PrimOp::Sub | PrimOp::Mul | PrimOp::Lt | PrimOp::Eq | PrimOp::SetBox => 2,
        }
    }

    /// Run the operation on already-evaluated arguments.
    pub fn apply(
        self,
        args: &[Value],
        overflow: OverflowPolicy,
        out: &PrintHandlerImpl,
    ) -> EvalResult {
        match (self, args) {
            (PrimOp::Add, [a, b]) => {
                arith(overflow, "add", a, b, i64::wrapping_add, i64::checked_add)
            }
            (PrimOp::Sub, [a, b]) => {
                arith(overflow, "sub", a, b, i64::wrapping_sub, i64::checked_sub)
            }
            (PrimOp::Mul, [a, b]) => {
                arith(overflow, "mul", a, b, i64::wrapping_mul, i64::checked_mul)
            }
            (PrimOp::Lt, [a, b]) => Ok(Value::Bool(a.as_int()? < b.as_int()?)),
            (PrimOp::Eq, [a, b]) => Ok(Value::Bool(a == b)),
            (PrimOp::MakeBox, [v]) => Ok(Value::Box(BoxCell::new(v.clone()))),
            (PrimOp::Unbox, [b]) => Ok(b.as_box()?.get()),
            (PrimOp::SetBox, [b, v]) => {
                b.as_box()?.set(v.clone());
                Ok(Value::Unit)
            }
            (PrimOp::Println, [v]) => {
                out.println(&v.to_string());
                Ok(Value::Unit)
            }
            (op, args) => Err(arity_mismatch(
                kiln_ir::Name::intern(op.name()),
                op.arity(),
                args.len(),
            )),
        }
    }
}

#[inline]
fn arith(
    overflow: OverflowPolicy,
    operation: &'static str,
    a: &Value,
    b: &Value,
    wrapping: fn(i64, i64) -> i64,
    checked: fn(i64, i64) -> Option<i64>,
) -> EvalResult {
    let (a, b) = (a.as_int()?, b.as_int()?);
    match overflow {
        OverflowPolicy::Wrapping => Ok(Value::Int(wrapping(a, b))),
        OverflowPolicy::Trapping => checked(a, b)
            .map(Value::Int)
            .ok_or_else(|| arithmetic_overflow(operation)),
    }
}

impl fmt::Display for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
