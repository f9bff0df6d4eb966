use thiserror::Error;

/// Errors produced by type validation and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("unknown grid kind: {0}")]
    UnknownGridKind(String),
}
