//! Interned string identifier.

use std::fmt;

use crate::interner::global_interner;

/// Interned string identifier.
///
/// Layout: 32-bit index split into shard (3 bits) + local index (29 bits)
/// - Bits 31-29: Shard index (0-7)
/// - Bits 28-0: Local index within shard
///
/// Two names are equal exactly when their strings are equal, so symbol
/// comparison at runtime is a single `u32` compare.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Maximum local index per shard.
    pub const MAX_LOCAL: u32 = 0x1FFF_FFFF;

    /// Number of shards.
    pub const NUM_SHARDS: usize = 8;

    /// Create from shard and local index.
    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!(shard < 8);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << 29) | local)
    }

    /// Intern `s` in the global interner.
    #[inline]
    pub fn intern(s: &str) -> Self {
        global_interner().intern(s)
    }

    /// The interned string.
    #[inline]
    pub fn as_str(self) -> &'static str {
        global_interner().lookup(self)
    }

    /// Extract shard index.
    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> 29) as usize
    }

    /// Extract local index.
    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::intern(s)
    }
}
