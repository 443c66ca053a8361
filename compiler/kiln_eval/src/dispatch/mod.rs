//! Call-site inline caching.
//!
//! Every `Apply` node owns a [`CallSite`]. The site remembers up to
//! `limit` entry points it has dispatched to, each stamped with the
//! generation of the function cell it came from:
//!
//! 1. Entries whose cell has since been rebound are evicted.
//! 2. If the callee's current entry point matches an entry, the call is a
//!    *direct transfer* through the cached entry point.
//! 3. Otherwise, with room left, the entry point is recorded and the call is
//!    a direct transfer.
//! 4. Otherwise the site turns megamorphic for good: entries are dropped and
//!    every later call is an *indirect transfer* that reads the entry point
//!    from the callee.
//!
//! Both transfers run the same code for the same callee; only the lookup
//! path differs.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::errors::{unbound_function, EvalResult};
use crate::function::{CallTarget, Closure, Function};

/// Entries per call site unless configured otherwise.
pub const DEFAULT_INLINE_CACHE_SIZE: usize = 2;

struct CacheEntry {
    target: CallTarget,
    // Keeps the cell alive so its generation can be checked later.
    function: Rc<Function>,
    generation: u64,
}

impl CacheEntry {
    #[inline]
    fn is_stale(&self) -> bool {
        self.function.generation() != self.generation
    }
}

/// Observable state of a call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// Never dispatched, or every entry was evicted.
    Uninitialized,
    /// One cached entry point.
    Monomorphic,
    /// More than one cached entry point.
    Polymorphic,
    /// Cache abandoned; all calls use indirect transfer.
    Megamorphic,
}

/// How a call reaches its entry point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferKind {
    /// Through a cached entry point.
    Direct,
    /// Through the callee's function cell.
    Indirect,
}

/// What a lookup did to the cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Recorded,
    WentMegamorphic,
    /// The site was already megamorphic.
    Generic,
}

/// Outcome of [`CallSite::lookup`].
#[derive(Clone, Debug)]
pub struct Lookup {
    pub target: CallTarget,
    pub transfer: TransferKind,
    pub event: CacheEvent,
    /// Stale entries evicted before the lookup.
    pub evicted: usize,
}

/// Per-node inline cache.
#[derive(Default)]
pub struct CallSite {
    entries: RefCell<SmallVec<[CacheEntry; DEFAULT_INLINE_CACHE_SIZE]>>,
    megamorphic: Cell<bool>,
}

impl CallSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the entry point for a call to `closure`, updating the cache.
    ///
    /// Fails with `UnboundFunction` if the closure's cell has no entry point.
    pub fn lookup(&self, closure: &Closure, limit: usize) -> EvalResult<Lookup> {
        let current = closure.target();
        if !current.is_bound() {
            return Err(unbound_function(closure.name()));
        }
        if self.megamorphic.get() {
            return Ok(Lookup {
                target: current,
                transfer: TransferKind::Indirect,
                event: CacheEvent::Generic,
                evicted: 0,
            });
        }

        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| !entry.is_stale());
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "evicted stale cache entries");
        }

        if let Some(entry) = entries.iter().find(|entry| entry.target.same_entry(&current)) {
            tracing::trace!(callee = %closure.name(), "inline cache hit");
            return Ok(Lookup {
                target: entry.target.clone(),
                transfer: TransferKind::Direct,
                event: CacheEvent::Hit,
                evicted,
            });
        }

        tracing::trace!(callee = %closure.name(), "inline cache miss");
        if entries.len() < limit {
            entries.push(CacheEntry {
                target: current.clone(),
                function: Rc::clone(closure.function()),
                generation: closure.generation(),
            });
            tracing::debug!(callee = %closure.name(), entries = entries.len(), "cached entry point");
            Ok(Lookup {
                target: current,
                transfer: TransferKind::Direct,
                event: CacheEvent::Recorded,
                evicted,
            })
        } else {
            entries.clear();
            self.megamorphic.set(true);
            tracing::debug!(callee = %closure.name(), limit, "call site went megamorphic");
            Ok(Lookup {
                target: current,
                transfer: TransferKind::Indirect,
                event: CacheEvent::WentMegamorphic,
                evicted,
            })
        }
    }

    pub fn state(&self) -> CacheState {
        if self.megamorphic.get() {
            return CacheState::Megamorphic;
        }
        match self.entries.borrow().len() {
            0 => CacheState::Uninitialized,
            1 => CacheState::Monomorphic,
            _ => CacheState::Polymorphic,
        }
    }

    /// Number of cached entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_megamorphic(&self) -> bool {
        self.megamorphic.get()
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("state", &self.state())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
