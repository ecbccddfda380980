//! Errors the ledger engine can surface.
//!
//! Every failure is either a documented no-op or an immediate error to the
//! direct caller; the engine performs no retries and never leaves a
//! half-applied mutation behind.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    /// Structurally invalid input: empty transaction batch, invalid regex
    /// pattern at filter-add time, duplicate category name on rename.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced entity (category name, filter id) does not exist.
    #[error("\"{0}\" not found")]
    NotFound(String),

    /// Transaction data could not be parsed.
    #[error("could not parse transactions: {0}")]
    Format(String),

    /// Transaction data parsed cleanly but contained no transactions.
    #[error("no transactions were present in the given data")]
    EmptyResult,
}
