use sievedns_domain::EngineError;
use sqlx::SqlitePool;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use tracing::warn;

/// Post-resolution answer rewriting over `ip_rewrite_v4` / `ip_rewrite_v6`.
///
/// Rewrite is best-effort: a lookup error or an unparseable target keeps
/// the original address. Tables are keyed by the canonical textual form of
/// the source address.
pub struct AnswerRewriter {
    store: SqlitePool,
    v4_enabled: bool,
    v6_enabled: bool,
}

impl AnswerRewriter {
    pub fn new(store: SqlitePool, v4_enabled: bool, v6_enabled: bool) -> Self {
        Self {
            store,
            v4_enabled,
            v6_enabled,
        }
    }

    pub async fn rewrite_v4(&self, source: Ipv4Addr) -> Option<Ipv4Addr> {
        if !self.v4_enabled {
            return None;
        }
        let target = self.lookup("SELECT target FROM ip_rewrite_v4 WHERE source = ?", &source.to_string()).await?;
        match parse_target::<Ipv4Addr>("IPv4", &target) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!(%source, error = %e, "Keeping original answer address");
                None
            }
        }
    }

    pub async fn rewrite_v6(&self, source: Ipv6Addr) -> Option<Ipv6Addr> {
        if !self.v6_enabled {
            return None;
        }
        let target = self.lookup("SELECT target FROM ip_rewrite_v6 WHERE source = ?", &source.to_string()).await?;
        match parse_target::<Ipv6Addr>("IPv6", &target) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!(%source, error = %e, "Keeping original answer address");
                None
            }
        }
    }

    /// Substitute every configured A/AAAA address in an answer in place,
    /// returning how many records changed. The caller re-serializes the
    /// mutated records, keeping its cache and the wire bytes consistent.
    pub async fn rewrite_answers(&self, answers: &mut [IpAddr]) -> usize {
        let mut rewritten = 0;
        for addr in answers.iter_mut() {
            let replacement = match *addr {
                IpAddr::V4(v4) => self.rewrite_v4(v4).await.map(IpAddr::V4),
                IpAddr::V6(v6) => self.rewrite_v6(v6).await.map(IpAddr::V6),
            };
            if let Some(target) = replacement {
                if target != *addr {
                    *addr = target;
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    async fn lookup(&self, sql: &'static str, source: &str) -> Option<String> {
        match sqlx::query_scalar(sql)
            .bind(source)
            .fetch_optional(&self.store)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                warn!(source, error = %e, "Rewrite lookup failed; keeping original");
                None
            }
        }
    }
}

/// Malformed target text in a rewrite table is a store-data defect; it
/// surfaces as `InvalidAddress` and the caller keeps the original address.
fn parse_target<T: FromStr>(family: &'static str, target: &str) -> Result<T, EngineError> {
    target
        .parse()
        .map_err(|_| EngineError::InvalidAddress(format!("{family} rewrite target '{target}'")))
}
