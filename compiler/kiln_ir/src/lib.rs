//! Kiln IR - shared identifier types.
//!
//! The evaluator is built from programmatically assembled trees, so the only
//! IR-level concern shared across crates is naming: slot names, callable
//! names and symbol values are all interned into a compact [`Name`].
//!
//! Interning happens through a process-wide [`StringInterner`], so a `Name`
//! can be rendered anywhere (value display, backtraces, the tree printer)
//! without threading an interner reference through the runtime.

mod interner;
mod name;

pub use interner::{global_interner, InternError, StringInterner};
pub use name::Name;
