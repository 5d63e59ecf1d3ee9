use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path to the persistent store. The engine opens it read-only; the
    /// store is populated and maintained by external tooling.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Number of read handles in the pool. The pool is fixed-size: all
    /// handles are opened and warmed during init. SQLite WAL allows
    /// concurrent readers, so this bounds in-flight store lookups, not
    /// correctness. Default: 32.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Seconds a handle waits on a database lock before a lookup fails.
    /// Default: 5.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Page-cache size in KiB, applied as a negative `cache_size` pragma.
    /// Stores holding billions of rows benefit from a large page cache;
    /// a failure to apply this hint is logged, not fatal. Default: 65536
    /// (64 MiB).
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            pool_size: default_pool_size(),
            busy_timeout_secs: default_busy_timeout_secs(),
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

fn default_store_path() -> String {
    "./sievedns.db".to_string()
}

fn default_pool_size() -> u32 {
    32
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_cache_size_kib() -> u32 {
    65_536
}
