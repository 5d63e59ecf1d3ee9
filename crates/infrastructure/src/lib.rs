//! SieveDNS infrastructure layer
pub mod classify;
pub mod database;

pub use classify::ClassificationEngine;
pub use database::{open_store, TableCatalog};
