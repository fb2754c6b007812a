use thiserror::Error;

/// Alias for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by source and replica Merkle tree operations.
///
/// Every variant is recoverable. A write-once slot observed with two
/// different values is not represented here: it means the hash function
/// is broken or the tree logic has a bug, and it panics instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Malformed construction input: empty data, a block count that is not
    /// a positive power of two, or data exceeding the declared block size.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The requested block number is not below the known block count.
    #[error("block {block_number} is out of range (tree has {block_count} blocks)")]
    OutOfRange {
        /// Requested block.
        block_number: usize,
        /// Number of blocks in the tree.
        block_count: usize,
    },
    /// The replica has not verified any block yet, so its size is unknown.
    #[error("number of blocks is not known yet")]
    NotYetAvailable,
    /// The block is in range but has not been received yet.
    #[error("We don't have block {block_number}")]
    NotFound {
        /// Requested block.
        block_number: usize,
    },
    /// A proof implies a different number of blocks than already
    /// established.
    #[error("Wrong number of blocks: proof suggests {implied}, while we expect {expected}")]
    SizeMismatch {
        /// Number of blocks established by earlier verified proofs.
        expected: usize,
        /// Number of blocks implied by the rejected proof.
        implied: usize,
    },
    /// The block number does not fit the tree implied by its proof.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The recomputed root hash does not match the trusted root.
    #[error("Verification failed, block rejected")]
    VerificationFailed,
    /// The operation makes no sense for this kind of tree.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// A proof could not be decoded or is structurally unusable.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    /// Encoded block bytes could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
