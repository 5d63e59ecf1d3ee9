use compact_str::CompactString;
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use sievedns_application::DecisionCacheStats;
use sievedns_domain::RoutingDecision;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const L0_CAPACITY: usize = 256;

type L0Cache = LruCache<CompactString, RoutingDecision, FxBuildHasher>;

// ---------------------------------------------------------------------------
// L0 — thread-local LRU (no lock)
// ---------------------------------------------------------------------------
//
// Decisions are immutable facts for the lifetime of the engine (the store is
// read-only), so the per-thread layer needs no TTL and cannot go stale.

thread_local! {
    static DECISION_L0: RefCell<L0Cache> =
        RefCell::new(LruCache::with_hasher(
            NonZeroUsize::new(L0_CAPACITY).unwrap(),
            FxBuildHasher,
        ));
}

#[inline]
fn l0_get(domain: &str) -> Option<RoutingDecision> {
    DECISION_L0.with(|c| c.borrow_mut().get(domain).copied())
}

#[inline]
fn l0_set(domain: &str, decision: RoutingDecision) {
    DECISION_L0.with(|c| {
        c.borrow_mut().put(CompactString::new(domain), decision);
    });
}

fn l0_clear() {
    DECISION_L0.with(|c| c.borrow_mut().clear());
}

// ---------------------------------------------------------------------------
// Shared layer — bounded LRU behind one writer lock
// ---------------------------------------------------------------------------

/// The shared decision cache: domain → routing decision.
///
/// Both `get` and `put` hold the exclusive lock for their full duration.
/// Taking a reader lock, observing a hit, and upgrading is unsound here:
/// the observed entry may be evicted between unlock and relock, so a single
/// writer lock it is. A lock-striped map would need bounded capacity and
/// recency tracking to replace this; the plain design already sits behind
/// the per-thread L0, which absorbs the hot keys.
pub struct DecisionCache {
    shared: Mutex<LruCache<CompactString, RoutingDecision, FxBuildHasher>>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            shared: Mutex::new(LruCache::with_hasher(capacity, FxBuildHasher)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Cached decision for `domain`, promoting the entry to most-recent.
    pub fn get(&self, domain: &str) -> Option<RoutingDecision> {
        if let Some(decision) = l0_get(domain) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(decision);
        }

        let Ok(mut shared) = self.shared.lock() else {
            return None;
        };
        match shared.get(domain) {
            Some(&decision) => {
                drop(shared);
                self.hits.fetch_add(1, Ordering::Relaxed);
                l0_set(domain, decision);
                Some(decision)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store the decision for `domain`, evicting the least-recently-used
    /// entry at capacity. A poisoned lock skips caching; the caller's
    /// decision is unaffected.
    pub fn put(&self, domain: &str, decision: RoutingDecision) {
        let key = CompactString::new(domain);
        if let Ok(mut shared) = self.shared.lock() {
            if let Some((evicted, _)) = shared.push(key, decision) {
                if evicted.as_bytes() != domain.as_bytes() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.insertions.fetch_add(1, Ordering::Relaxed);
        }
        l0_set(domain, decision);
    }

    /// Drop every cached decision, including the calling thread's L0.
    pub fn clear(&self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.clear();
        }
        l0_clear();
    }

    pub fn stats(&self) -> DecisionCacheStats {
        DecisionCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
