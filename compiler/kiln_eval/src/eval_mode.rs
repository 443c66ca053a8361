//! Evaluation modes for the interpreter.
//!
//! An `EvalMode` bundles the policies a host usually wants to switch together:
//! how deep non-tail recursion may go and what integer overflow does. Policies
//! are read through methods so callers never match on the variants.

/// What `add`, `sub` and `mul` do when the result does not fit in 64 bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverflowPolicy {
    /// Two's complement wraparound.
    #[default]
    Wrapping,
    /// Fail with `ArithmeticOverflow`.
    Trapping,
}

/// Evaluation mode, determining interpreter behavior via match dispatch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Unbounded recursion (the native stack grows on demand), wrapping
    /// arithmetic.
    #[default]
    Interpret,
    /// Like `Interpret`, but non-tail recursion deeper than `max_depth` fails
    /// with `StackOverflow`.
    Bounded {
        /// Maximum number of simultaneously active calls.
        max_depth: usize,
    },
    /// Trapping arithmetic and a generous recursion bound.
    Checked,
}

impl EvalMode {
    /// Recursion bound used by [`EvalMode::Checked`].
    pub const CHECKED_MAX_DEPTH: usize = 10_000;

    /// Maximum recursion depth, or `None` for unlimited (native `stacker` fallback).
    ///
    /// On WASM `Interpret` is bounded at 200 because the stack cannot grow.
    #[inline]
    pub fn max_recursion_depth(&self) -> Option<usize> {
        match self {
            Self::Interpret => {
                #[cfg(target_arch = "wasm32")]
                {
                    Some(200)
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    None
                }
            }
            Self::Bounded { max_depth } => Some(*max_depth),
            Self::Checked => Some(Self::CHECKED_MAX_DEPTH),
        }
    }

    /// Integer overflow behavior for arithmetic primitives.
    #[inline]
    pub fn overflow_policy(&self) -> OverflowPolicy {
        match self {
            Self::Interpret | Self::Bounded { .. } => OverflowPolicy::Wrapping,
            Self::Checked => OverflowPolicy::Trapping,
        }
    }
}
