//! Tree-walking evaluator with closures, tail calls and call-site inline
//! caching.
//!
//! Hosts assemble [`Expr`] trees through its factory functions, lay out
//! local slots with [`FrameDescriptor`], and run them with an
//! [`Interpreter`]. Values are `Rc`-based; one interpreter and the trees it
//! runs belong to a single thread.

mod diagnostics;
pub mod dispatch;
mod errors;
mod eval_mode;
pub mod expr;
pub mod frame;
pub mod function;
pub mod interpreter;
pub mod primitives;
mod print_handler;
mod stack;
pub mod trampoline;
pub mod value;

use std::sync::Once;

pub use diagnostics::{CallStack, EvalCounters};
pub use dispatch::{CacheState, CallSite, DEFAULT_INLINE_CACHE_SIZE};
pub use errors::{
    arithmetic_overflow, arity_mismatch, invalid_slot_access, recursion_limit_exceeded,
    type_mismatch, unbound_function, EvalBacktrace, EvalError, EvalErrorKind, EvalResult,
    SlotFault,
};
pub use eval_mode::{EvalMode, OverflowPolicy};
pub use expr::{Expr, ExprKind};
pub use frame::{Frame, FrameDescriptor, SlotId, SlotKind};
pub use function::{CallTarget, Closure, Function, LambdaCode};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use kiln_ir::Name;
pub use primitives::PrimOp;
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, PrintHandlerImpl, SharedPrintHandler,
};
pub use stack::ensure_sufficient_stack;
pub use value::{BoxCell, HostObject, Value};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
