//! Evaluable tree nodes and the factory API used to assemble them.
//!
//! Trees are built directly by a host (there is no parser). Nodes are
//! immutable once built and cheap to clone; the only state they carry is the
//! inline cache of each `Apply` node, which evaluation mutates through
//! interior mutability.
//!
//! # Example
//!
//! ```
//! use kiln_eval::{Expr, FrameDescriptor, Interpreter, PrimOp, Value};
//!
//! let mut scope = FrameDescriptor::new();
//! let n = scope.add_slot("n");
//! let double = Expr::lambda(
//!     vec![n],
//!     Expr::call_prim(PrimOp::Add, vec![Expr::read(n), Expr::read(n)]),
//!     scope.into_shared(),
//! );
//! let program = Expr::apply(double, vec![Expr::int(21)]);
//! assert_eq!(Interpreter::new().invoke(&program).ok(), Some(Value::Int(42)));
//! ```

mod display;

use std::rc::Rc;

use kiln_ir::Name;
use smallvec::SmallVec;

use crate::dispatch::CallSite;
use crate::frame::{FrameDescriptor, SlotId};
use crate::function::{Closure, LambdaCode};
use crate::primitives::PrimOp;
use crate::Value;

/// Inline argument storage; most calls pass few arguments.
pub type ExprList = SmallVec<[Expr; 4]>;

/// A shared, immutable tree node.
#[derive(Clone)]
pub struct Expr(Rc<ExprKind>);

/// Node variants.
pub enum ExprKind {
    /// A constant.
    Literal(Value),
    /// Read `slot` of the frame `depth` lexical levels out.
    Read { slot: SlotId, depth: usize },
    /// Evaluate `value`, store it, produce unit.
    Write {
        slot: SlotId,
        depth: usize,
        value: Expr,
    },
    /// Two-way branch on a boolean. Both branches are tail positions.
    If {
        cond: Expr,
        then_branch: Expr,
        else_branch: Expr,
    },
    /// Sequence; the last element is a tail position.
    Begin(Vec<Expr>),
    /// Closure creation over the current frame.
    Lambda(Rc<LambdaCode>),
    /// Call.
    Apply(ApplyNode),
}

/// A call node with its inline cache.
pub struct ApplyNode {
    callee: Expr,
    args: ExprList,
    tail: bool,
    site: Rc<CallSite>,
}

impl ApplyNode {
    pub fn callee(&self) -> &Expr {
        &self.callee
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Whether this call may replace the current activation.
    pub fn is_tail(&self) -> bool {
        self.tail
    }

    pub fn site(&self) -> &Rc<CallSite> {
        &self.site
    }
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Expr(Rc::new(kind))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    pub fn lit(value: Value) -> Self {
        Self::new(ExprKind::Literal(value))
    }

    pub fn int(n: i64) -> Self {
        Self::lit(Value::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Self::lit(Value::Bool(b))
    }

    pub fn unit() -> Self {
        Self::lit(Value::Unit)
    }

    pub fn symbol(name: &str) -> Self {
        Self::lit(Value::symbol(name))
    }

    /// Read a slot of the current frame.
    pub fn read(slot: SlotId) -> Self {
        Self::read_at(slot, 0)
    }

    /// Read a slot `depth` lexical levels out.
    pub fn read_at(slot: SlotId, depth: usize) -> Self {
        Self::new(ExprKind::Read { slot, depth })
    }

    pub fn write(slot: SlotId, value: Expr) -> Self {
        Self::write_at(slot, 0, value)
    }

    pub fn write_at(slot: SlotId, depth: usize, value: Expr) -> Self {
        Self::new(ExprKind::Write { slot, depth, value })
    }

    pub fn if_(cond: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Self::new(ExprKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn begin(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(ExprKind::Begin(exprs.into_iter().collect()))
    }

    /// An anonymous lambda. `params` are slots of `descriptor`, filled from
    /// the arguments in order.
    pub fn lambda(params: Vec<SlotId>, body: Expr, descriptor: Rc<FrameDescriptor>) -> Self {
        Self::named_lambda(Name::EMPTY, params, body, descriptor)
    }

    /// A lambda whose closures report `name` in errors and backtraces.
    pub fn named_lambda(
        name: impl Into<Name>,
        params: Vec<SlotId>,
        body: Expr,
        descriptor: Rc<FrameDescriptor>,
    ) -> Self {
        let code = LambdaCode::new(name.into(), params, body, descriptor);
        Self::new(ExprKind::Lambda(Rc::new(code)))
    }

    pub fn apply(callee: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::make_apply(callee, args, false)
    }

    /// A call that replaces the current activation when reached in tail
    /// position.
    pub fn tail_apply(callee: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::make_apply(callee, args, true)
    }

    /// A literal primitive closure.
    pub fn prim(op: PrimOp) -> Self {
        Self::lit(Value::Closure(Closure::primitive(op)))
    }

    pub fn call_prim(op: PrimOp, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::apply(Self::prim(op), args)
    }

    fn make_apply(callee: Expr, args: impl IntoIterator<Item = Expr>, tail: bool) -> Self {
        Self::new(ExprKind::Apply(ApplyNode {
            callee,
            args: args.into_iter().collect(),
            tail,
            site: Rc::new(CallSite::new()),
        }))
    }

    /// The inline cache of an `Apply` node.
    pub fn call_site(&self) -> Option<&Rc<CallSite>> {
        match self.kind() {
            ExprKind::Apply(node) => Some(&node.site),
            _ => None,
        }
    }
}

// Nesting depth is bounded only by the host, so uniquely owned subtrees are
// torn down with an explicit worklist rather than recursive drop glue.
impl Drop for Expr {
    fn drop(&mut self) {
        let Some(kind) = Rc::get_mut(&mut self.0) else {
            return;
        };
        let mut pending = Vec::new();
        detach_children(kind, &mut pending);
        while let Some(mut expr) = pending.pop() {
            if let Some(kind) = Rc::get_mut(&mut expr.0) {
                detach_children(kind, &mut pending);
            }
        }
    }
}

/// Move the children of `kind` into `out`, leaving a childless node behind.
fn detach_children(kind: &mut ExprKind, out: &mut Vec<Expr>) {
    match std::mem::replace(kind, ExprKind::Begin(Vec::new())) {
        ExprKind::Literal(_) | ExprKind::Read { .. } => {}
        ExprKind::Write { value, .. } => out.push(value),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => out.extend([cond, then_branch, else_branch]),
        ExprKind::Begin(exprs) => out.extend(exprs),
        ExprKind::Lambda(code) => {
            if let Some(code) = Rc::into_inner(code) {
                out.push(code.into_body());
            }
        }
        ExprKind::Apply(node) => {
            out.push(node.callee);
            out.extend(node.args);
        }
    }
}
