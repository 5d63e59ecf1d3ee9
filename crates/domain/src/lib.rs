//! SieveDNS domain layer
pub mod config;
pub mod decision;
pub mod errors;
pub mod name;

pub use config::{Config, ConfigError, RoutingConfig};
pub use decision::{RouteTarget, RoutingDecision, UpstreamAddr};
pub use errors::EngineError;
pub use name::{normalize, split_first_label, MAX_NAME_OCTETS};
