//! Tree-walking evaluator.
//!
//! `eval` produces a value; `eval_tail` evaluates a node in tail position and
//! may instead produce a pending tail call (see [`crate::trampoline`]). Calls
//! go through the call site's inline cache ([`crate::dispatch`]) and then
//! [`Interpreter::transfer`], which checks arity and runs the entry point.

mod builder;

use std::rc::Rc;

use kiln_ir::Name;
use smallvec::SmallVec;

pub use builder::InterpreterBuilder;

use crate::diagnostics::{CallStack, EvalCounters};
use crate::dispatch::{CacheEvent, CallSite, TransferKind};
use crate::errors::{arity_mismatch, invalid_slot_access, unbound_function, EvalResult};
use crate::eval_mode::{EvalMode, OverflowPolicy};
use crate::expr::{Expr, ExprKind};
use crate::frame::{Frame, FrameDescriptor, SlotId};
use crate::function::{CallTarget, Closure, LambdaCode};
use crate::print_handler::SharedPrintHandler;
use crate::stack::ensure_sufficient_stack;
use crate::trampoline::{Args, Call, Step};
use crate::Value;

/// Evaluates trees.
///
/// One interpreter may run any number of `invoke`s; inline caches live in
/// the trees, not here, so they persist across invocations of the same tree.
pub struct Interpreter {
    mode: EvalMode,
    overflow: OverflowPolicy,
    inline_cache_size: usize,
    call_stack: CallStack,
    counters: Option<EvalCounters>,
    print_handler: SharedPrintHandler,
}

impl Default for Interpreter {
    fn default() -> Self {
        InterpreterBuilder::new().build()
    }
}

impl Interpreter {
    /// An interpreter in `Interpret` mode writing to stdout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Evaluate `expr` in a fresh root frame with no slots.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn invoke(&mut self, expr: &Expr) -> EvalResult {
        let root = Frame::empty();
        self.eval(expr, &root)
    }

    /// Evaluate `expr` in a fresh root frame laid out by `descriptor`.
    #[tracing::instrument(level = "debug", skip_all, fields(slots = descriptor.len()))]
    pub fn invoke_with(&mut self, expr: &Expr, descriptor: Rc<FrameDescriptor>) -> EvalResult {
        let root = Frame::activate(descriptor, None);
        self.eval(expr, &root)
    }

    /// Call `callee` with `args` from the host.
    ///
    /// Each host call dispatches through its own fresh call site.
    #[tracing::instrument(level = "debug", skip_all, fields(args = args.len()))]
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult {
        let closure = callee.as_closure()?.clone();
        self.run_trampoline(Call {
            site: Rc::new(CallSite::new()),
            closure,
            args: SmallVec::from_vec(args),
        })
    }

    pub fn mode(&self) -> &EvalMode {
        &self.mode
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    pub fn inline_cache_size(&self) -> usize {
        self.inline_cache_size
    }

    /// Dispatch counters, `None` unless enabled on the builder.
    pub fn counters(&self) -> Option<&EvalCounters> {
        self.counters.as_ref()
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    /// Number of calls currently active.
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    #[inline]
    pub(crate) fn count(&mut self, bump: impl FnOnce(&mut EvalCounters)) {
        if let Some(counters) = self.counters.as_mut() {
            bump(counters);
        }
    }

    /// Evaluate `expr` to a value, running any tail call it yields.
    pub(crate) fn eval(&mut self, expr: &Expr, frame: &Rc<Frame>) -> EvalResult {
        match self.eval_tail(expr, frame)? {
            Step::Done(value) => Ok(value),
            Step::TailCall(call) => self.run_trampoline(call),
        }
    }

    /// Evaluate `expr` in tail position.
    ///
    /// Every node goes through here, so arbitrarily deep operand nesting
    /// grows the native stack instead of overflowing it.
    #[inline]
    fn eval_tail(&mut self, expr: &Expr, frame: &Rc<Frame>) -> EvalResult<Step> {
        ensure_sufficient_stack(|| self.eval_tail_inner(expr, frame))
    }

    fn eval_tail_inner(&mut self, expr: &Expr, frame: &Rc<Frame>) -> EvalResult<Step> {
        match expr.kind() {
            ExprKind::Literal(value) => Ok(Step::Done(value.clone())),
            ExprKind::Read { slot, depth } => read_slot(frame, *slot, *depth).map(Step::Done),
            ExprKind::Write { slot, depth, value } => {
                let value = self.eval(value, frame)?;
                write_slot(frame, *slot, *depth, value)?;
                Ok(Step::Done(Value::Unit))
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, frame)?.as_bool()? {
                    self.eval_tail(then_branch, frame)
                } else {
                    self.eval_tail(else_branch, frame)
                }
            }
            ExprKind::Begin(exprs) => match exprs.split_last() {
                None => Ok(Step::Done(Value::Unit)),
                Some((last, init)) => {
                    for e in init {
                        self.eval(e, frame)?;
                    }
                    self.eval_tail(last, frame)
                }
            },
            ExprKind::Lambda(code) => Ok(Step::Done(Value::Closure(Closure::from_lambda(
                Rc::clone(code),
                Rc::clone(frame),
            )))),
            ExprKind::Apply(node) => {
                let closure = self.eval(node.callee(), frame)?.as_closure()?.clone();
                let args = node
                    .args()
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<EvalResult<Args>>()?;
                let call = Call {
                    site: Rc::clone(node.site()),
                    closure,
                    args,
                };
                if node.is_tail() {
                    Ok(Step::TailCall(call))
                } else {
                    self.run_trampoline(call).map(Step::Done)
                }
            }
        }
    }

    /// Resolve the entry point for one call through its site's cache, then
    /// transfer to it.
    pub(crate) fn dispatch(&mut self, call: Call) -> EvalResult<Step> {
        let Call {
            site,
            closure,
            args,
        } = call;
        self.count(|c| c.calls += 1);
        let lookup = site.lookup(&closure, self.inline_cache_size)?;
        self.count(|c| {
            c.evictions += lookup.evicted as u64;
            match lookup.event {
                CacheEvent::Hit => c.cache_hits += 1,
                CacheEvent::Recorded => c.cache_misses += 1,
                CacheEvent::WentMegamorphic => {
                    c.cache_misses += 1;
                    c.megamorphic_transitions += 1;
                }
                CacheEvent::Generic => {}
            }
            match lookup.transfer {
                TransferKind::Direct => c.direct_transfers += 1,
                TransferKind::Indirect => c.indirect_transfers += 1,
            }
        });
        self.transfer(&lookup.target, &closure, args)
    }

    /// Run `target` for `closure` with `args`.
    fn transfer(&mut self, target: &CallTarget, closure: &Closure, args: Args) -> EvalResult<Step> {
        let Some(arity) = target.arity() else {
            return Err(unbound_function(closure.name()));
        };
        if args.len() != arity {
            return Err(self
                .call_stack
                .attach_backtrace(arity_mismatch(closure.name(), arity, args.len())));
        }
        match target {
            CallTarget::Primitive(op) => op
                .apply(&args, self.overflow, &self.print_handler)
                .map(Step::Done)
                .map_err(|e| self.call_stack.attach_backtrace(e)),
            CallTarget::Lambda(code) => self.enter(code, closure, args),
            CallTarget::Unbound => Err(unbound_function(closure.name())),
        }
    }

    /// Activate a lambda body.
    ///
    /// The returned step may be a tail call; it is dispatched after this
    /// activation has been popped.
    fn enter(&mut self, code: &LambdaCode, closure: &Closure, args: Args) -> EvalResult<Step> {
        let name = callable_name(closure, code);
        if let Err(e) = self.call_stack.push(name) {
            return Err(self.call_stack.attach_backtrace(e));
        }
        let frame = Frame::activate(Rc::clone(code.descriptor()), closure.env().cloned());
        let result = code
            .params()
            .iter()
            .zip(args)
            .try_for_each(|(slot, arg)| write_slot(&frame, *slot, 0, arg))
            .and_then(|()| self.eval_tail(code.body(), &frame))
            .map_err(|e| self.call_stack.attach_backtrace(e));
        self.call_stack.pop();
        result
    }
}

fn callable_name(closure: &Closure, code: &LambdaCode) -> Name {
    if closure.name().is_empty() {
        code.name()
    } else {
        closure.name()
    }
}

#[inline]
fn read_slot(frame: &Frame, slot: SlotId, depth: usize) -> EvalResult {
    frame
        .ancestor(depth)
        .and_then(|f| f.read(slot))
        .map_err(|fault| invalid_slot_access(slot.name(), depth, fault))
}

#[inline]
fn write_slot(frame: &Frame, slot: SlotId, depth: usize, value: Value) -> EvalResult<()> {
    frame
        .ancestor(depth)
        .and_then(|f| f.write(slot, value))
        .map_err(|fault| invalid_slot_access(slot.name(), depth, fault))
}
