use async_trait::async_trait;
use sievedns_domain::{RouteTarget, RoutingDecision};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Counters for the decision cache, reported at shutdown and exposed for
/// operator inspection. All counters are monotonic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
}

impl DecisionCacheStats {
    /// Hit rate over all lookups, in [0, 1]. Zero when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Application-layer port for the domain-classification engine.
///
/// The resolver's query path calls `classify` once per incoming query and
/// `select_address` to turn the decision into a concrete reply address.
/// `alias` runs before forwarding; the rewrite lookups run on the answer
/// records after upstream resolution.
///
/// The lookup methods are infallible at the signature level: runtime store
/// errors are logged inside the engine and degrade to "no match" for the
/// affected step. Only engine construction can fail.
#[async_trait]
pub trait DomainClassifierPort: Send + Sync {
    /// Classify a queried name into a routing decision.
    ///
    /// Deterministic for a fixed store and config; the result (including
    /// `NoMatch`) is cached, so a repeat query is answered without touching
    /// the store.
    async fn classify(&self, name: &str) -> RoutingDecision;

    /// Resolve a CNAME-equivalent alias for the name, preserving the
    /// query's leading label on parent-domain matches.
    ///
    /// The returned target is an owned value: it needs no explicit release
    /// and stays valid across later engine calls and thread boundaries.
    /// Nothing handed back borrows engine-internal or per-thread storage.
    async fn alias(&self, name: &str) -> Option<String>;

    /// Look up a post-resolution substitute for an IPv4 answer address.
    async fn rewrite_v4(&self, source: Ipv4Addr) -> Option<Ipv4Addr>;

    /// Look up a post-resolution substitute for an IPv6 answer address.
    async fn rewrite_v6(&self, source: Ipv6Addr) -> Option<Ipv6Addr>;

    /// Resolve a decision and address family to a concrete target from the
    /// configured address sets. `None` when the relevant set is empty.
    fn select_address(&self, decision: &RoutingDecision, want_v6: bool) -> Option<RouteTarget>;

    /// Snapshot of the decision-cache counters.
    fn cache_stats(&self) -> DecisionCacheStats;
}
