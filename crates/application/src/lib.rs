//! SieveDNS application layer
pub mod ports;

pub use ports::{DecisionCacheStats, DomainClassifierPort};
