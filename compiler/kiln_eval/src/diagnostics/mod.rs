//! Diagnostic infrastructure for the evaluator.
//!
//! - `CallStack`: active callables, the recursion limit and backtraces
//! - `EvalCounters`: optional dispatch counters for profiling

use kiln_ir::Name;

use crate::errors::{recursion_limit_exceeded, EvalBacktrace, EvalError};

/// Live call stack for the interpreter.
///
/// Each lambda activation pushes its callable's name and pops it on return.
/// A tail call replaces the top activation instead of nesting, so trampolined
/// loops run at constant depth.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<Name>,
    max_depth: Option<usize>,
}

impl CallStack {
    /// Create an empty call stack. `None` means unlimited.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call, checking the depth limit.
    ///
    /// Fails with `StackOverflow` if the limit is reached. The frame is not
    /// pushed on failure.
    pub fn push(&mut self, name: Name) -> Result<(), EvalError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(recursion_limit_exceeded(max));
            }
        }
        self.frames.push(name);
        Ok(())
    }

    /// Pop the most recent call.
    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Snapshot the stack, most recent call first.
    pub fn capture(&self) -> EvalBacktrace {
        EvalBacktrace::new(self.frames.iter().rev().copied().collect())
    }

    /// Attach a backtrace unless the error already carries one.
    ///
    /// The innermost activation sees the error first, so its snapshot is the
    /// most complete.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if err.backtrace.is_some() || self.frames.is_empty() {
            return err;
        }
        err.with_backtrace(self.capture())
    }
}

/// Dispatch counters for profiling.
///
/// Stored as `Option<EvalCounters>` on the interpreter; when `None` every
/// increment is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalCounters {
    pub calls: u64,
    pub direct_transfers: u64,
    pub indirect_transfers: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub megamorphic_transitions: u64,
    pub tail_calls: u64,
}

impl EvalCounters {
    /// Format a summary report.
    pub fn report(&self) -> String {
        format!(
            "Dispatch profile:\n  \
             Calls:                   {}\n  \
             Direct transfers:        {}\n  \
             Indirect transfers:      {}\n  \
             Cache hits:              {}\n  \
             Cache misses:            {}\n  \
             Stale evictions:         {}\n  \
             Megamorphic transitions: {}\n  \
             Tail calls:              {}",
            self.calls,
            self.direct_transfers,
            self.indirect_transfers,
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.megamorphic_transitions,
            self.tail_calls,
        )
    }
}
