use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the storage contract and the iterator algebra.
///
/// The first group are contract violations: the caller can recover by
/// adjusting the request (dedup, merge, re-init). The rest wrap backend
/// failures and are only recoverable by retrying the whole operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("quad exists")]
    QuadExists,
    #[error("quad does not exist")]
    QuadNotExist,
    #[error("quad store already exists")]
    DatabaseExists,
    #[error("invalid action")]
    InvalidAction,
    #[error("quad store {0:?} is not registered")]
    NotRegistered(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("invalid term syntax: {0}")]
    InvalidSyntax(String),
    #[error("invalid typed value: {0}")]
    BadTypedValue(String),
    #[error("invalid option {key:?}: expected {expected}")]
    BadOption { key: String, expected: &'static str },
    #[error("operation cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the error is a contract violation rather than a backend
    /// failure. Higher layers map these to distinct client-facing codes.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            StoreError::QuadExists
                | StoreError::QuadNotExist
                | StoreError::DatabaseExists
                | StoreError::InvalidAction
        )
    }
}

impl Clone for StoreError {
    fn clone(&self) -> Self {
        match self {
            StoreError::QuadExists => StoreError::QuadExists,
            StoreError::QuadNotExist => StoreError::QuadNotExist,
            StoreError::DatabaseExists => StoreError::DatabaseExists,
            StoreError::InvalidAction => StoreError::InvalidAction,
            StoreError::NotRegistered(name) => StoreError::NotRegistered(name.clone()),
            StoreError::Unsupported(what) => StoreError::Unsupported(what),
            StoreError::InvalidSyntax(s) => StoreError::InvalidSyntax(s.clone()),
            StoreError::BadTypedValue(s) => StoreError::BadTypedValue(s.clone()),
            StoreError::BadOption { key, expected } => StoreError::BadOption {
                key: key.clone(),
                expected,
            },
            StoreError::Cancelled => StoreError::Cancelled,
            // io::Error is not Clone; keep the kind and message.
            StoreError::Io(err) => StoreError::Io(io::Error::new(err.kind(), err.to_string())),
            StoreError::Backend(msg) => StoreError::Backend(msg.clone()),
        }
    }
}
