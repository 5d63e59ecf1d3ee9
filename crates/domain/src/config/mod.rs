//! Configuration for the classification engine
//!
//! Structures organized by concern:
//! - `root`: top-level configuration and loading
//! - `routing`: the four address sets consulted by `select_address`
//! - `store`: persistent store path and pool tuning
//! - `cache`: decision-cache and pattern-cache sizing
//! - `logging`: logging settings
//! - `errors`: configuration errors

pub mod cache;
pub mod errors;
pub mod logging;
pub mod root;
pub mod routing;
pub mod store;

pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::Config;
pub use routing::RoutingConfig;
pub use store::StoreConfig;
