//! Search error types.

use boardstate_core::{ConsistencyError, ContractViolation, Error as CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The machine refused a move or failed a consistency check mid-search.
    /// The worker's clone is discarded.
    #[error("search aborted: {0}")]
    Engine(#[from] CoreError),

    #[error("search worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ContractViolation> for SearchError {
    fn from(err: ContractViolation) -> Self {
        SearchError::Engine(err.into())
    }
}

impl From<ConsistencyError> for SearchError {
    fn from(err: ConsistencyError) -> Self {
        SearchError::Engine(err.into())
    }
}
