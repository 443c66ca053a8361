//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use super::Interpreter;
use crate::diagnostics::{CallStack, EvalCounters};
use crate::dispatch::DEFAULT_INLINE_CACHE_SIZE;
use crate::eval_mode::{EvalMode, OverflowPolicy};
use crate::print_handler::{stdout_handler, SharedPrintHandler};

/// Builder for creating Interpreter instances with various configurations.
///
/// Unset options come from the mode: `EvalMode::Interpret` unless
/// [`InterpreterBuilder::mode`] says otherwise.
pub struct InterpreterBuilder {
    mode: EvalMode,
    inline_cache_size: usize,
    overflow: Option<OverflowPolicy>,
    print_handler: Option<SharedPrintHandler>,
    counters: bool,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterBuilder {
    /// Create a new builder with default `Interpret` mode.
    pub fn new() -> Self {
        Self {
            mode: EvalMode::default(),
            inline_cache_size: DEFAULT_INLINE_CACHE_SIZE,
            overflow: None,
            print_handler: None,
            counters: false,
        }
    }

    /// Set the evaluation mode.
    ///
    /// Controls the recursion limit and the default overflow policy.
    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Entries each call site may cache before going megamorphic.
    ///
    /// Clamped to at least 1.
    #[must_use]
    pub fn inline_cache_size(mut self, size: usize) -> Self {
        self.inline_cache_size = size.max(1);
        self
    }

    /// Override the mode's overflow policy.
    #[must_use]
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = Some(policy);
        self
    }

    /// Set the print handler used by `println`. Default is stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Enable dispatch counters.
    #[must_use]
    pub fn counters(mut self, enabled: bool) -> Self {
        self.counters = enabled;
        self
    }

    /// Build the interpreter.
    pub fn build(self) -> Interpreter {
        let overflow = self
            .overflow
            .unwrap_or_else(|| self.mode.overflow_policy());
        let call_stack = CallStack::new(self.mode.max_recursion_depth());
        Interpreter {
            overflow,
            inline_cache_size: self.inline_cache_size,
            call_stack,
            counters: self.counters.then(EvalCounters::default),
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            mode: self.mode,
        }
    }
}
