//! Error types for Cinder

use thiserror::Error;

/// Result type alias using Cinder's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cinder
#[derive(Error, Debug)]
pub enum Error {
    // Transaction errors
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    // Statistics-store errors
    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),

    // Not found
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    // Already exists
    #[error("{0} already exists: {1}")]
    AlreadyExists(String, String),

    // Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction not active: {0}")]
    NotActive(u64),

    #[error("Transaction already committed: {0}")]
    AlreadyCommitted(u64),

    #[error("Too many active transactions")]
    TooManyActive,
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Partial sample insertion: {inserted} of {attempted} rows inserted")]
    PartialInsert { inserted: usize, attempted: usize },
}
