//! Error taxonomy for reading and decoding ledger data.
use thiserror::Error;

/// Failures raised while reading the node's store or decoding its records.
///
/// Missing *optional* fields are never an error; they decode to `None`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A key is absent from the store. Also the "end of chain" signal.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A block record was found but a required field is missing or unreadable.
    #[error("malformed block at height {height}: {reason}")]
    MalformedBlock {
        /// Height whose record failed to decode.
        height: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// A transaction carries a version this decoder does not know.
    #[error("transaction version {version} not handled (block {height:?})")]
    UnsupportedVersion {
        /// The raw `version` value as found.
        version: String,
        /// Height of the enclosing block, if known.
        height: Option<u64>,
    },

    /// A success check was attempted on a transaction without a hash.
    #[error("transaction has no hash, its result cannot be looked up")]
    MissingResult,

    /// A transaction result record exists but has no readable `result.status`.
    #[error("malformed result record for {txhash}: {reason}")]
    MalformedResult {
        /// Hash the record was fetched by.
        txhash: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The underlying key-value engine failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl ScanError {
    /// `true` for [`ScanError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanError::NotFound(_))
    }

    /// `true` for the errors that mean "walked past the available chain":
    /// a missing block or a block record that cannot be decoded.
    pub fn is_end_of_chain(&self) -> bool {
        matches!(
            self,
            ScanError::NotFound(_) | ScanError::MalformedBlock { .. }
        )
    }
}
