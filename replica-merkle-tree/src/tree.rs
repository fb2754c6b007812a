use crate::{Block, Proof, Result, hash::Hash};

/// A block together with the proof tying it to the root hash.
pub type BlockWithProof = (Block, Proof);

/// Behaviour shared by the source-of-truth and replica trees.
///
/// Methods take `&self`; trees that accept blocks use interior
/// mutability, so one instance can be shared between threads.
pub trait MerkleTree {
    /// The trusted root hash.
    fn root_hash(&self) -> Hash;

    /// Number of blocks (a power of two), if known.
    fn number_of_blocks(&self) -> Option<usize>;

    /// Fetch block `block_number` and its proof.
    fn get_block_with_proof(&self, block_number: usize) -> Result<BlockWithProof>;

    /// Verify `block` against the root hash with `proof` and store it.
    fn verify_and_add_block(&self, block: Block, proof: &Proof) -> Result<()>;
}
