//! Function cells and closures.
//!
//! A [`Function`] cell owns the current code entry point of a callable
//! ([`CallTarget`]) and a generation stamp. Rebinding the entry point bumps
//! the stamp, which is how call-site caches notice that a cached entry has
//! gone stale. A [`Closure`] pairs a cell with the frame it captured.
//!
//! Every evaluation of a lambda node creates a fresh cell, but all of them
//! point at the node's single [`LambdaCode`], so a call site that sees many
//! closures from one lambda node stays monomorphic.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use kiln_ir::Name;

use crate::expr::Expr;
use crate::frame::{Frame, FrameDescriptor, SlotId};
use crate::primitives::PrimOp;

/// Compiled form of a lambda: its parameters, body and frame layout.
pub struct LambdaCode {
    name: Name,
    params: Vec<SlotId>,
    body: Expr,
    descriptor: Rc<FrameDescriptor>,
}

impl LambdaCode {
    pub fn new(
        name: Name,
        params: Vec<SlotId>,
        body: Expr,
        descriptor: Rc<FrameDescriptor>,
    ) -> Self {
        Self {
            name,
            params,
            body,
            descriptor,
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn params(&self) -> &[SlotId] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn descriptor(&self) -> &Rc<FrameDescriptor> {
        &self.descriptor
    }

    pub(crate) fn into_body(self) -> Expr {
        self.body
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Debug for LambdaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaCode")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Code entry point of a function cell.
#[derive(Clone, Debug)]
pub enum CallTarget {
    /// User code.
    Lambda(Rc<LambdaCode>),
    /// Built-in operation.
    Primitive(PrimOp),
    /// Forward declaration not yet bound.
    Unbound,
}

impl CallTarget {
    /// Parameter count, `None` while unbound.
    pub fn arity(&self) -> Option<usize> {
        match self {
            CallTarget::Lambda(code) => Some(code.arity()),
            CallTarget::Primitive(op) => Some(op.arity()),
            CallTarget::Unbound => None,
        }
    }

    /// Whether both refer to the same entry point.
    ///
    /// Lambdas compare by code identity. `Unbound` is never the same entry as
    /// anything, itself included, so it can never produce a cache hit.
    #[inline]
    pub fn same_entry(&self, other: &CallTarget) -> bool {
        match (self, other) {
            (CallTarget::Lambda(a), CallTarget::Lambda(b)) => Rc::ptr_eq(a, b),
            (CallTarget::Primitive(a), CallTarget::Primitive(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, CallTarget::Unbound)
    }
}

/// A named, rebindable code entry point.
pub struct Function {
    name: Name,
    target: RefCell<CallTarget>,
    generation: Cell<u64>,
}

impl Function {
    pub fn new(name: Name, target: CallTarget) -> Self {
        Self {
            name,
            target: RefCell::new(target),
            generation: Cell::new(0),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    /// Current entry point.
    #[inline]
    pub fn target(&self) -> CallTarget {
        self.target.borrow().clone()
    }

    /// Number of times the entry point has been replaced.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Replace the entry point. Cache entries recorded earlier become stale.
    pub fn bind(&self, target: CallTarget) {
        let generation = self.generation.get().wrapping_add(1);
        tracing::debug!(function = %self.name, generation, "function rebound");
        *self.target.borrow_mut() = target;
        self.generation.set(generation);
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("target", &*self.target.borrow())
            .field("generation", &self.generation.get())
            .finish()
    }
}

/// A callable value: a function cell plus its captured frame.
///
/// Clones share both the cell and the frame, and compare equal.
#[derive(Clone)]
pub struct Closure {
    function: Rc<Function>,
    env: Option<Rc<Frame>>,
}

impl Closure {
    pub fn new(function: Rc<Function>, env: Option<Rc<Frame>>) -> Self {
        Self { function, env }
    }

    /// Close `code` over `env`.
    pub fn from_lambda(code: Rc<LambdaCode>, env: Rc<Frame>) -> Self {
        let name = code.name();
        Self::new(
            Rc::new(Function::new(name, CallTarget::Lambda(code))),
            Some(env),
        )
    }

    /// A closure over a built-in operation.
    pub fn primitive(op: PrimOp) -> Self {
        Self::new(
            Rc::new(Function::new(Name::intern(op.name()), CallTarget::Primitive(op))),
            None,
        )
    }

    /// A forward-declared function. Calling it fails until [`Closure::bind`].
    pub fn placeholder(name: impl Into<Name>) -> Self {
        Self::new(
            Rc::new(Function::new(name.into(), CallTarget::Unbound)),
            None,
        )
    }

    /// Rebind the entry point of this closure's function cell.
    ///
    /// Every closure sharing the cell sees the new entry point. A bound lambda
    /// runs with this closure's captured frame as its parent.
    pub fn bind(&self, target: CallTarget) {
        self.function.bind(target);
    }

    pub fn name(&self) -> Name {
        self.function.name()
    }

    #[inline]
    pub fn target(&self) -> CallTarget {
        self.function.target()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.function.generation()
    }

    pub fn function(&self) -> &Rc<Function> {
        &self.function
    }

    pub fn env(&self) -> Option<&Rc<Frame>> {
        self.env.as_ref()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Closure) -> bool {
        let same_env = match (&self.env, &other.env) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        Rc::ptr_eq(&self.function, &other.function) && same_env
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("function", &self.function)
            .field("captures", &self.env.is_some())
            .finish()
    }
}
