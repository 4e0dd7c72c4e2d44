use crate::domain::request::FulfillmentStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("request {reference} is {current}; cannot move to {requested}")]
    IllegalTransition {
        reference: String,
        current: FulfillmentStatus,
        requested: FulfillmentStatus,
    },

    #[error(
        "request {reference} was modified concurrently (expected version {expected}, found {found})"
    )]
    Conflict {
        reference: String,
        expected: u64,
        found: u64,
    },

    #[error("request {reference} would violate an invariant: {detail}")]
    InvariantViolated {
        reference: String,
        detail: &'static str,
    },

    #[error("reference {0} is already taken")]
    DuplicateReference(String),

    #[error("could not generate a unique reference after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("caller is not allowed to {0}")]
    Forbidden(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the caller may re-fetch and retry the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TrackerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
