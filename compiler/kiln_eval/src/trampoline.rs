//! Tail-call elimination.
//!
//! Evaluating a node in tail position yields a [`Step`]. A tail-flagged call
//! there does not run its callee; it hands the call back as
//! [`Step::TailCall`] so the activation that produced it can finish first.
//! The nearest enclosing non-tail call then drives the loop in
//! [`Interpreter::run_trampoline`], so a chain of tail calls of any length
//! runs at constant native stack and call stack depth.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::dispatch::CallSite;
use crate::errors::EvalResult;
use crate::function::Closure;
use crate::interpreter::Interpreter;
use crate::Value;

/// Evaluated arguments of one call.
pub type Args = SmallVec<[Value; 4]>;

/// A call ready to dispatch.
pub struct Call {
    /// Cache of the `Apply` node the call came from.
    pub site: Rc<CallSite>,
    pub closure: Closure,
    pub args: Args,
}

/// Result of evaluating a node in tail position.
pub enum Step {
    /// Finished with a value.
    Done(Value),
    /// The caller must dispatch this call next.
    TailCall(Call),
}

impl Interpreter {
    /// Dispatch `call` and every tail call it produces until a value results.
    pub(crate) fn run_trampoline(&mut self, mut call: Call) -> EvalResult {
        loop {
            match self.dispatch(call)? {
                Step::Done(value) => return Ok(value),
                Step::TailCall(next) => {
                    self.count(|c| c.tail_calls += 1);
                    call = next;
                }
            }
        }
    }
}
