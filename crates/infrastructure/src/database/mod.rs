use sievedns_domain::config::StoreConfig;
use sievedns_domain::EngineError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Tables the classification cascade cannot run without.
const REQUIRED_TABLES: [&str; 5] = [
    "block_regex",
    "block_exact",
    "block_wildcard",
    "fqdn_dns_allow",
    "fqdn_dns_block",
];

/// Presence of the optional feature tables, probed once at open.
///
/// A missing optional table disables the corresponding feature cleanly:
/// its lookups short-circuit to "no match" without touching the store.
#[derive(Debug, Clone, Copy)]
pub struct TableCatalog {
    pub alias: bool,
    pub rewrite_v4: bool,
    pub rewrite_v6: bool,
}

/// Build read-only connection options with the store tuning hints.
///
/// mmap stays disabled: memory-mapping multi-gigabyte stores trades page
/// cache control for fault storms under concurrent readers.
fn read_options(cfg: &StoreConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&cfg.path)
        .read_only(true)
        .shared_cache(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(cfg.busy_timeout_secs))
        .pragma("temp_store", "MEMORY")
        .pragma("mmap_size", "0")
}

/// Apply the page-cache and worker-thread hints.
///
/// These are pragmatic tuning choices; a store that rejects them still
/// serves lookups correctly, so failures warn instead of aborting.
async fn apply_cache_hints(pool: &SqlitePool, cfg: &StoreConfig) {
    let cache_size = format!("PRAGMA cache_size = -{}", cfg.cache_size_kib);
    if let Err(e) = sqlx::query(&cache_size).execute(pool).await {
        warn!(error = %e, "Failed to set store cache size; continuing with driver default");
    }

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = format!("PRAGMA threads = {cores}");
    if let Err(e) = sqlx::query(&threads).execute(pool).await {
        warn!(error = %e, "Failed to set store worker-thread hint");
    }
}

/// Verify the schema and probe the optional tables.
async fn verify_schema(pool: &SqlitePool) -> Result<TableCatalog, EngineError> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

    let tables: HashSet<&str> = names.iter().map(String::as_str).collect();

    for required in REQUIRED_TABLES {
        if !tables.contains(required) {
            return Err(EngineError::MissingTable(required.to_string()));
        }
    }

    let catalog = TableCatalog {
        alias: tables.contains("domain_alias"),
        rewrite_v4: tables.contains("ip_rewrite_v4"),
        rewrite_v6: tables.contains("ip_rewrite_v6"),
    };

    if !catalog.alias {
        warn!("domain_alias table not present; alias lookups disabled");
    }
    if !catalog.rewrite_v4 {
        warn!("ip_rewrite_v4 table not present; IPv4 answer rewriting disabled");
    }
    if !catalog.rewrite_v6 {
        warn!("ip_rewrite_v6 table not present; IPv6 answer rewriting disabled");
    }

    Ok(catalog)
}

/// Issue one trivial query per pooled handle to prime the store's page
/// cache and fault in each connection before the first real lookup.
async fn warm_up(pool: &SqlitePool, handles: u32) {
    let mut conns = Vec::with_capacity(handles as usize);
    for _ in 0..handles {
        match pool.acquire().await {
            Ok(conn) => conns.push(conn),
            Err(e) => {
                warn!(error = %e, "Store warm-up acquired fewer handles than configured");
                break;
            }
        }
    }
    for conn in conns.iter_mut() {
        if let Err(e) = sqlx::query("SELECT 1").execute(&mut **conn).await {
            warn!(error = %e, "Store warm-up query failed");
        }
    }
}

/// Open the persistent store read-only with a fixed-size handle pool.
///
/// Open failure and a missing required table are the engine's only fatal
/// errors; everything past this point degrades per step.
pub async fn open_store(cfg: &StoreConfig) -> Result<(SqlitePool, TableCatalog), EngineError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.pool_size)
        .min_connections(cfg.pool_size)
        .acquire_timeout(Duration::from_secs(cfg.busy_timeout_secs))
        .connect_with(read_options(cfg))
        .await
        .map_err(|e| EngineError::StoreOpen(e.to_string()))?;

    apply_cache_hints(&pool, cfg).await;
    let catalog = verify_schema(&pool).await?;
    warm_up(&pool, cfg.pool_size).await;

    info!(
        path = %cfg.path,
        handles = cfg.pool_size,
        alias = catalog.alias,
        rewrite_v4 = catalog.rewrite_v4,
        rewrite_v6 = catalog.rewrite_v6,
        "Store opened"
    );

    Ok((pool, catalog))
}
