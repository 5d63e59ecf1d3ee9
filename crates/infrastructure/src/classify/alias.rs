use sievedns_domain::{split_first_label, MAX_NAME_OCTETS};
use sqlx::SqlitePool;
use tracing::warn;

/// CNAME-equivalent alias lookup over `domain_alias`.
///
/// Two-step: the exact name first, then the parent domain (everything after
/// the first label). A parent hit preserves the query's leading label, so
/// `domain_alias(example.com → target.com)` aliases `www.example.com` to
/// `www.target.com`. The surrounding resolver chases the returned target
/// and answers with the CNAME chain plus the target's records.
pub struct AliasResolver {
    store: SqlitePool,
    enabled: bool,
}

impl AliasResolver {
    pub fn new(store: SqlitePool, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Alias target for `domain` (already normalized), or `None`.
    pub async fn resolve(&self, domain: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        match self.lookup(domain).await {
            Ok(Some(target)) => return Some(target),
            Ok(None) => {}
            Err(e) => {
                warn!(domain, error = %e, "Alias lookup failed; treating as no alias");
                return None;
            }
        }

        let (label, parent) = split_first_label(domain)?;
        match self.lookup(parent).await {
            Ok(Some(target)) => join_alias(label, &target),
            Ok(None) => None,
            Err(e) => {
                warn!(domain, error = %e, "Parent alias lookup failed; treating as no alias");
                None
            }
        }
    }

    async fn lookup(&self, source: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT target FROM domain_alias WHERE source = ?")
            .bind(source)
            .fetch_optional(&self.store)
            .await
    }
}

/// Carry the query's leading label onto the alias target. Results that
/// would exceed the name bound are dropped, never truncated into a
/// different name.
fn join_alias(label: &str, target: &str) -> Option<String> {
    if label.len() + 1 + target.len() > MAX_NAME_OCTETS {
        warn!(label, target, "Alias expansion exceeds name bound; dropping alias");
        return None;
    }
    Some(format!("{label}.{target}"))
}
