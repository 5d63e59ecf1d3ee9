use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open store: {0}")]
    StoreOpen(String),

    #[error("Required table missing from store: {0}")]
    MissingTable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
