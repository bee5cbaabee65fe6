use thiserror::Error;

/// Errors raised by the cast/tidy conversions and their helpers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An input row is missing a field or carries a value of the wrong type.
    #[error("schema error at row {row}: {message}")]
    Schema { row: usize, message: String },

    /// The same (document, term) pair appeared twice under `DuplicatePolicy::Error`.
    #[error("duplicate entry for document {document:?} and term {term:?}")]
    DuplicateKey { document: String, term: String },

    /// No documents or no terms, and the caller asked for empty input to be rejected.
    #[error("input contains no documents or no terms")]
    EmptyInput,

    /// Matrix parts or labels do not agree with each other.
    #[error("shape error: {0}")]
    Shape(String),

    #[error("invalid option {name}: {message}")]
    InvalidOption { name: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
