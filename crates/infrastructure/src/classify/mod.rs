pub mod alias;
pub mod bloom;
pub mod decision_cache;
pub mod patterns;
pub mod rewrite;
pub mod suffix;

use crate::database::TableCatalog;
use alias::AliasResolver;
use async_trait::async_trait;
use bloom::ExactBloom;
use decision_cache::DecisionCache;
use futures::TryStreamExt;
use patterns::PatternCache;
use rewrite::AnswerRewriter;
use sievedns_application::{DecisionCacheStats, DomainClassifierPort};
use sievedns_domain::config::CacheConfig;
use sievedns_domain::{normalize, EngineError, RouteTarget, RoutingConfig, RoutingDecision};
use sqlx::SqlitePool;
use std::net::{Ipv4Addr, Ipv6Addr};
use suffix::suffixes;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// The domain-classification engine.
///
/// One instance is constructed at startup and shared behind `Arc`; all
/// mutable state lives in the decision cache. For each query the engine
/// runs a fixed-priority cascade over the store's lookup tables, fronted
/// by the decision cache and, for the exact-block step, a bloom filter:
///
///   1. compiled block patterns          → Terminate
///   2. exact block (bloom-gated)        → Terminate
///   3. wildcard block (suffix-indexed)  → DnsBlock
///   4. fqdn allow (suffix-indexed)      → DnsAllow
///   5. fqdn block (suffix-indexed)      → DnsBlock
///   6. no match
///
/// Every terminal outcome, including `NoMatch`, is cached so negative
/// lookups amortize the full cascade.
pub struct ClassificationEngine {
    store: SqlitePool,
    routing: RoutingConfig,
    decisions: DecisionCache,
    bloom: ExactBloom,
    patterns: OnceCell<PatternCache>,
    pattern_soft_limit: usize,
    aliases: AliasResolver,
    rewriter: AnswerRewriter,
}

impl ClassificationEngine {
    /// One-shot engine construction.
    ///
    /// Sizes and loads the bloom filter from `block_exact` before
    /// returning, so a shared engine never observes a half-built filter.
    /// The pattern cache is the one lazily built piece (first query that
    /// reaches the regex step populates it behind a once-latch).
    pub async fn init(
        store: SqlitePool,
        catalog: TableCatalog,
        routing: RoutingConfig,
        cache: &CacheConfig,
    ) -> Result<Self, EngineError> {
        let decisions = DecisionCache::new(cache.decision_capacity);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM block_exact")
            .fetch_one(&store)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        let mut bloom = ExactBloom::with_expected_rows(rows.max(0) as u64);
        {
            let mut domains =
                sqlx::query_scalar::<_, String>("SELECT domain FROM block_exact").fetch(&store);
            while let Some(domain) = domains
                .try_next()
                .await
                .map_err(|e| EngineError::Database(e.to_string()))?
            {
                bloom.insert(&domain);
            }
        }
        info!(
            rows,
            bits = bloom.bit_len(),
            "Exact-block bloom filter loaded"
        );

        let aliases = AliasResolver::new(store.clone(), catalog.alias);
        let rewriter = AnswerRewriter::new(store.clone(), catalog.rewrite_v4, catalog.rewrite_v6);

        Ok(Self {
            store,
            routing,
            decisions,
            bloom,
            patterns: OnceCell::new(),
            pattern_soft_limit: cache.pattern_soft_limit,
            aliases,
            rewriter,
        })
    }

    /// Classify a queried name into a routing decision.
    ///
    /// Infallible: malformed names classify as `NoMatch`, and runtime store
    /// errors degrade the affected cascade step to a miss.
    pub async fn classify(&self, name: &str) -> RoutingDecision {
        let domain = match normalize(name) {
            Ok(domain) => domain,
            Err(e) => {
                debug!(name, error = %e, "Rejected query name");
                return RoutingDecision::NoMatch;
            }
        };

        if let Some(decision) = self.decisions.get(&domain) {
            return decision;
        }

        let decision = self.cascade(&domain).await;
        self.decisions.put(&domain, decision);
        decision
    }

    /// The six-step priority cascade. First match wins.
    async fn cascade(&self, domain: &str) -> RoutingDecision {
        if let Some(pattern) = self.pattern_match(domain).await {
            debug!(domain, pattern, "Pattern block");
            return RoutingDecision::Terminate;
        }

        // The bloom filter only ever skips work: false means the domain is
        // definitely not in block_exact, so the lookup is elided.
        if self.bloom.check(domain) {
            match sqlx::query_scalar::<_, i64>("SELECT 1 FROM block_exact WHERE domain = ?")
                .bind(domain)
                .fetch_optional(&self.store)
                .await
            {
                Ok(Some(_)) => {
                    debug!(domain, "Exact block");
                    return RoutingDecision::Terminate;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(domain, error = %e, step = "block_exact", "Store lookup failed; treating as miss");
                }
            }
        }

        let suffixes = suffixes(domain);

        // Wildcard before the fqdn lists: on a tie the wildcard table wins.
        if let Some(row) = self.longest_suffix_match("block_wildcard", &suffixes).await {
            debug!(domain, row = %row, "Wildcard block");
            return RoutingDecision::DnsBlock;
        }
        if let Some(row) = self.longest_suffix_match("fqdn_dns_allow", &suffixes).await {
            debug!(domain, row = %row, "Allow-list forward");
            return RoutingDecision::DnsAllow;
        }
        if let Some(row) = self.longest_suffix_match("fqdn_dns_block", &suffixes).await {
            debug!(domain, row = %row, "Block-list forward");
            return RoutingDecision::DnsBlock;
        }

        RoutingDecision::NoMatch
    }

    async fn pattern_match(&self, domain: &str) -> Option<&str> {
        let patterns = match self
            .patterns
            .get_or_try_init(|| PatternCache::load(&self.store, self.pattern_soft_limit))
            .await
        {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(error = %e, step = "block_regex", "Pattern load failed; treating as miss");
                return None;
            }
        };
        patterns.find_match(domain)
    }

    /// Longest suffix of the query present in `table`, via an indexed
    /// `IN (?1..?k)` point lookup over the suffix set instead of a
    /// `LIKE '%.' || domain` table scan. Errors degrade to a miss.
    async fn longest_suffix_match(&self, table: &'static str, suffixes: &[&str]) -> Option<String> {
        let mut sql = format!("SELECT domain FROM {table} WHERE domain IN (");
        for i in 0..suffixes.len() {
            if i > 0 {
                sql.push(',');
            }
            sql.push('?');
        }
        sql.push_str(") ORDER BY length(domain) DESC LIMIT 1");

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for suffix in suffixes {
            query = query.bind(*suffix);
        }

        match query.fetch_optional(&self.store).await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, step = table, "Store lookup failed; treating as miss");
                None
            }
        }
    }

    /// Alias target for the name, preserving the leading label on
    /// parent-domain hits.
    pub async fn alias(&self, name: &str) -> Option<String> {
        let domain = match normalize(name) {
            Ok(domain) => domain,
            Err(e) => {
                debug!(name, error = %e, "Rejected alias query name");
                return None;
            }
        };
        self.aliases.resolve(&domain).await
    }

    pub async fn rewrite_v4(&self, source: Ipv4Addr) -> Option<Ipv4Addr> {
        self.rewriter.rewrite_v4(source).await
    }

    pub async fn rewrite_v6(&self, source: Ipv6Addr) -> Option<Ipv6Addr> {
        self.rewriter.rewrite_v6(source).await
    }

    /// In-place best-effort rewrite of an answer's addresses; see
    /// [`AnswerRewriter::rewrite_answers`].
    pub async fn rewrite_answers(&self, answers: &mut [std::net::IpAddr]) -> usize {
        self.rewriter.rewrite_answers(answers).await
    }

    pub fn select_address(
        &self,
        decision: &RoutingDecision,
        want_v6: bool,
    ) -> Option<RouteTarget> {
        self.routing.select(decision, want_v6)
    }

    pub fn cache_stats(&self) -> DecisionCacheStats {
        self.decisions.stats()
    }

    /// Drop all cached decisions. Classification remains correct
    /// throughout; the next lookups repopulate the cache.
    pub fn clear_cache(&self) {
        self.decisions.clear();
    }

    /// Tear the engine down: log cache statistics and close the store pool.
    pub async fn shutdown(self) {
        let stats = self.decisions.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            insertions = stats.insertions,
            evictions = stats.evictions,
            hit_rate = %format!("{:.1}%", stats.hit_rate() * 100.0),
            "Decision cache statistics"
        );
        self.store.close().await;
    }
}

#[async_trait]
impl DomainClassifierPort for ClassificationEngine {
    async fn classify(&self, name: &str) -> RoutingDecision {
        ClassificationEngine::classify(self, name).await
    }

    async fn alias(&self, name: &str) -> Option<String> {
        ClassificationEngine::alias(self, name).await
    }

    async fn rewrite_v4(&self, source: Ipv4Addr) -> Option<Ipv4Addr> {
        ClassificationEngine::rewrite_v4(self, source).await
    }

    async fn rewrite_v6(&self, source: Ipv6Addr) -> Option<Ipv6Addr> {
        ClassificationEngine::rewrite_v6(self, source).await
    }

    fn select_address(&self, decision: &RoutingDecision, want_v6: bool) -> Option<RouteTarget> {
        ClassificationEngine::select_address(self, decision, want_v6)
    }

    fn cache_stats(&self) -> DecisionCacheStats {
        ClassificationEngine::cache_stats(self)
    }
}
