//! # Cache — Memo Store for Power-of-Two Modular Powers
//!
//! `ModExpCache` remembers `a^(2^i) mod n` values between calls to
//! [`mod_pow`](crate::modpow::mod_pow). Entries are addressed by a fingerprint
//! of `(a, 2^i, n)` rather than by the triple itself:
//!
//! ```text
//! s   = a + p
//! key = s * (s + 1) / 2 + p      (Cantor pairing, order-sensitive)
//! key = key XOR n
//! ```
//!
//! The pairing is computed in a `u128` accumulator, so for `u32` inputs it is
//! exact and injective: two triples with the same modulus never share a key.
//! The final XOR with `n` is not injective, so triples with *different* moduli
//! can collide (for example `(2, 1, 17)` and `(3, 1, 29)` both map to 22).
//!
//! ## Eviction
//!
//! No LRU bookkeeping. When the store holds `capacity` entries, the next
//! insertion of a new key clears everything first. The inserted key is always
//! readable immediately afterwards.
//!
//! ## Scope
//!
//! With [`CacheScope::PerModulus`] (the default) the cache drops its entries
//! whenever it is used with a modulus other than the one they were computed
//! for, which rules out the cross-modulus collisions above. With
//! [`CacheScope::Shared`] entries from every modulus live side by side and a
//! colliding key returns the other triple's value.
//!
//! The cache is plain owned data mutated through `&mut self`. Parallel callers
//! must give each worker its own instance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::CacheConfig;

/// Default number of entries before a full clear.
pub const DEFAULT_CAPACITY: usize = 0x1_0000;

/// Fingerprint type. Wide enough that the pairing never truncates for `u32` inputs.
pub type CacheKey = u128;

/// Whether entries survive a change of modulus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheScope {
    /// Clear on every change of modulus.
    #[default]
    PerModulus,
    /// Keep entries for all moduli; fingerprint collisions are observable.
    Shared,
}

impl std::fmt::Display for CacheScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheScope::PerModulus => write!(f, "per-modulus"),
            CacheScope::Shared => write!(f, "shared"),
        }
    }
}

impl std::str::FromStr for CacheScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-modulus" => Ok(CacheScope::PerModulus),
            "shared" => Ok(CacheScope::Shared),
            other => Err(format!(
                "unknown cache scope '{}' (expected 'per-modulus' or 'shared')",
                other
            )),
        }
    }
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub clears: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Fingerprint of `(a, p, n)` where `p` is a power-of-two exponent.
#[inline]
pub fn fingerprint(a: u32, p: u32, n: u32) -> CacheKey {
    let s = a as u128 + p as u128;
    ((s * (s + 1)) / 2 + p as u128) ^ n as u128
}

#[derive(Debug, Clone)]
pub struct ModExpCache {
    entries: HashMap<CacheKey, u32>,
    capacity: usize,
    scope: CacheScope,
    modulus: Option<u32>,
    stats: CacheStats,
}

impl ModExpCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A capacity of 0 is treated as 1 so the last insertion is always kept.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ModExpCache {
            entries: HashMap::new(),
            capacity,
            scope: CacheScope::default(),
            modulus: None,
            stats: CacheStats::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.capacity).with_scope(config.scope)
    }

    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn get(&mut self, key: CacheKey) -> Option<u32> {
        let value = self.entries.get(&key).copied();
        if value.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        value
    }

    /// Insert `value` under `key`, clearing the whole store first if it is full.
    pub fn put(&mut self, key: CacheKey, value: u32) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            debug!(capacity = self.capacity, "modexp cache full, clearing");
            self.clear();
        }
        self.entries.insert(key, value);
        self.stats.insertions += 1;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.clears += 1;
    }

    /// Prepare the cache for computations modulo `n`.
    ///
    /// Under `PerModulus` scope this drops entries computed for another modulus.
    pub fn bind_modulus(&mut self, n: u32) {
        if self.scope == CacheScope::PerModulus && self.modulus != Some(n) {
            if !self.entries.is_empty() {
                self.clear();
            }
            self.modulus = Some(n);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for ModExpCache {
    fn default() -> Self {
        Self::new()
    }
}
