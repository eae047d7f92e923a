//! Error types shared by the store, the engines and the views.

use crate::accounting::RewardError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    /// A row that should exist was not found.
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: i64 },

    /// User input rejected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Reward(#[from] RewardError),
}

pub type Result<T> = std::result::Result<T, Error>;
