use fancy_regex::Regex;
use futures::TryStreamExt;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// One bucket per possible leading byte plus a catch-all for patterns whose
/// first matchable character cannot be predicted.
const BUCKET_COUNT: usize = 257;
const CATCH_ALL: usize = 256;

struct BlockPattern {
    source: Box<str>,
    regex: Regex,
}

/// Compiled block patterns, bucketed by a conservative first-character
/// analysis so that matching a domain examines one bucket plus the
/// catch-all instead of the whole table.
///
/// Built once at first use (the engine holds it behind a once-latch) and
/// immutable afterwards. Within a bucket patterns keep insertion order and
/// the first match wins.
pub struct PatternCache {
    buckets: Vec<Vec<BlockPattern>>,
    total: usize,
}

impl PatternCache {
    /// Stream `block_regex` and compile every pattern. Compile failures are
    /// logged and skipped; only a store error aborts the load (and the
    /// caller's once-latch stays unset so a later query retries).
    pub async fn load(store: &SqlitePool, soft_limit: usize) -> Result<Self, sqlx::Error> {
        let mut cache = Self::empty();
        let mut skipped = 0usize;

        let mut rows = sqlx::query_scalar::<_, String>("SELECT pattern FROM block_regex").fetch(store);
        while let Some(pattern) = rows.try_next().await? {
            if !cache.insert(&pattern) {
                skipped += 1;
            }
        }

        if cache.total > soft_limit {
            warn!(
                patterns = cache.total,
                soft_limit, "Block pattern count exceeds soft limit; match latency will suffer"
            );
        }
        info!(patterns = cache.total, skipped, "Block patterns compiled");

        Ok(cache)
    }

    fn empty() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
            total: 0,
        }
    }

    /// Compile and file one pattern. False when compilation failed.
    fn insert(&mut self, pattern: &str) -> bool {
        match Regex::new(pattern) {
            Ok(regex) => {
                self.buckets[bucket_for(pattern)].push(BlockPattern {
                    source: pattern.into(),
                    regex,
                });
                self.total += 1;
                true
            }
            Err(e) => {
                warn!(pattern, error = %e, "Failed to compile block pattern; skipping");
                false
            }
        }
    }

    /// First matching pattern for `domain` (already case-folded), searching
    /// the domain's leading-byte bucket and then the catch-all.
    pub fn find_match(&self, domain: &str) -> Option<&str> {
        let first = *domain.as_bytes().first()?;
        self.scan(first.to_ascii_lowercase() as usize, domain)
            .or_else(|| self.scan(CATCH_ALL, domain))
    }

    fn scan(&self, bucket: usize, domain: &str) -> Option<&str> {
        for pattern in &self.buckets[bucket] {
            match pattern.regex.is_match(domain) {
                Ok(true) => return Some(&pattern.source),
                Ok(false) => {}
                Err(e) => {
                    warn!(pattern = %pattern.source, error = %e, "Pattern evaluation failed; skipping");
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Bucket choice: skip a leading `^`, then a literal ASCII alphanumeric
/// anchors the pattern to that character's bucket. Anything else — `.`,
/// `(`, `[`, `\`, `*`, `?`, or any other metacharacter — cannot predict the
/// first matched character and goes to the catch-all.
fn bucket_for(pattern: &str) -> usize {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    match body.as_bytes().first() {
        Some(&b) if b.is_ascii_alphanumeric() => b.to_ascii_lowercase() as usize,
        _ => CATCH_ALL,
    }
}
