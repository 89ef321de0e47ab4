//! Library-wide error type.
//!
//! Every error signals a malformed model definition. None of them are recovered from inside the
//! crate: they are raised at construction time or on the first offending `evaluate`/`jac` call.

use discretise_sparse::SparseShapeError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Sibling domains overlap, auxiliary domains disagree, or a domain-aware concatenation
    /// ended up without a domain.
    #[error("Domain conflict: {0}")]
    DomainConflict(String),
    /// A constructor argument or evaluation input is not acceptable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Vector or matrix sizes are inconsistent.
    #[error("Size mismatch: {0}")]
    SizeMismatch(String),
    /// The requested operation is not implemented for this configuration of nodes.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The mesh has no entry for the domain.
    #[error("Domain `{0}` is not part of the mesh")]
    UnknownDomain(String),
}

impl From<SparseShapeError> for Error {
    fn from(err: SparseShapeError) -> Self {
        Self::SizeMismatch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
