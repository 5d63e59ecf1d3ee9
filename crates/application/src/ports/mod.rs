pub mod classifier;

pub use classifier::{DecisionCacheStats, DomainClassifierPort};
