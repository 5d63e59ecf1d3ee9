use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Capacity of the shared decision cache. Every terminal outcome of the
    /// classification cascade is cached, including negative ones, so this
    /// bounds the working set of hot names. Default: 10 000.
    #[serde(default = "default_decision_capacity")]
    pub decision_capacity: usize,

    /// Soft limit on the number of compiled block patterns. Exceeding it
    /// logs a capacity warning; patterns are still loaded. Default: 100 000.
    #[serde(default = "default_pattern_soft_limit")]
    pub pattern_soft_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            decision_capacity: default_decision_capacity(),
            pattern_soft_limit: default_pattern_soft_limit(),
        }
    }
}

fn default_decision_capacity() -> usize {
    10_000
}

fn default_pattern_soft_limit() -> usize {
    100_000
}
