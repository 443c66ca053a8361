//! Error types for evaluation.
//!
//! Every failure aborts the enclosing `invoke` and reaches the host as a typed
//! [`EvalError`]. Nothing is retried or coerced.
//!
//! # Structured Error Categories
//!
//! [`EvalErrorKind`] carries the structured data for each condition. Factory
//! functions (e.g. [`type_mismatch`]) are the public construction API.

use std::fmt;

use kiln_ir::Name;
use thiserror::Error;

use crate::Value;

/// Result of evaluation.
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Why a slot access failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotFault {
    /// The slot exists but was read before any write.
    Unwritten,
    /// The slot index is outside the frame's descriptor.
    OutOfRange,
    /// Fewer enclosing frames exist than the requested depth.
    NoEnclosingFrame,
}

impl fmt::Display for SlotFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotFault::Unwritten => "read before write",
            SlotFault::OutOfRange => "slot out of range",
            SlotFault::NoEnclosingFrame => "no enclosing frame",
        })
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    /// A node required a value of one shape and received another.
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    /// Argument count differs from the callee's parameter count.
    #[error("{} expects {expected} {}, got {got}", callee(.name), arguments(.expected))]
    ArityMismatch {
        name: Name,
        expected: usize,
        got: usize,
    },

    /// Interpreter invariant violation on a frame slot.
    #[error("invalid slot access: `{slot}` at depth {depth}: {fault}")]
    InvalidSlotAccess {
        slot: Name,
        depth: usize,
        fault: SlotFault,
    },

    /// Integer overflow under the trapping policy.
    #[error("integer overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// A forward-declared function was called before being bound.
    #[error("call to unbound function {}", callee(.name))]
    UnboundFunction { name: Name },

    /// The configured recursion limit was exceeded.
    #[error("maximum recursion depth exceeded (limit: {depth})")]
    StackOverflow { depth: usize },
}

fn callee(name: &Name) -> &'static str {
    if name.is_empty() {
        "<anonymous>"
    } else {
        name.as_str()
    }
}

fn arguments(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

/// Immutable snapshot of the active callables at an error site,
/// most recent call first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<Name>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<Name>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Name] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, name) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {}", callee(name))?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Call chain at the error site, attached by the innermost activation.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        Self {
            kind,
            backtrace: None,
        }
    }

    /// Attach a backtrace to this error.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// True for interpreter defects rather than program errors.
    ///
    /// Slot faults mean the tree was assembled against the wrong descriptor
    /// or the evaluator broke a frame invariant; no source program can
    /// trigger one through well-formed construction.
    pub fn is_defect(&self) -> bool {
        matches!(self.kind, EvalErrorKind::InvalidSlotAccess { .. })
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        Self::new(kind)
    }
}

// Factory functions

#[cold]
pub fn type_mismatch(expected: &'static str, got: &'static str) -> EvalError {
    EvalErrorKind::TypeMismatch { expected, got }.into()
}

#[cold]
pub fn arity_mismatch(name: Name, expected: usize, got: usize) -> EvalError {
    EvalErrorKind::ArityMismatch {
        name,
        expected,
        got,
    }
    .into()
}

#[cold]
pub fn invalid_slot_access(slot: Name, depth: usize, fault: SlotFault) -> EvalError {
    tracing::error!(slot = %slot, depth, %fault, "frame invariant violated");
    EvalErrorKind::InvalidSlotAccess { slot, depth, fault }.into()
}

#[cold]
pub fn arithmetic_overflow(operation: &'static str) -> EvalError {
    EvalErrorKind::ArithmeticOverflow { operation }.into()
}

#[cold]
pub fn unbound_function(name: Name) -> EvalError {
    EvalErrorKind::UnboundFunction { name }.into()
}

#[cold]
pub fn recursion_limit_exceeded(depth: usize) -> EvalError {
    EvalErrorKind::StackOverflow { depth }.into()
}
