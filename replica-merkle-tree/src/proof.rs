//! Inclusion proofs: sibling hashes on the path from a leaf to the root.
//!
//! The proof carries no position or size information of its own. Its
//! length fixes the number of leaves (`2^len`) and the block number fixes
//! the leaf, so a proof only verifies for the block it was issued for.

#[cfg(feature = "wire")]
use bincode::{Decode, Encode};

use crate::{
    Block, Error, Result,
    cursor::Cursor,
    hash::{Hash, MerkleHasher, combine},
};

/// Longest proof accepted, enough for `2^63` leaves.
pub const MAX_PROOF_LEN: usize = 63;

/// Sibling hashes from the leaf's immediate sibling up to, but excluding,
/// the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "wire", derive(Encode, Decode))]
pub struct Proof {
    hashes: Vec<Hash>,
}

/// Everything a successful verification learned about the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPath {
    /// Number of leaves implied by the proof length.
    pub leaf_count: usize,
    /// The leaf, every sibling consumed and every recomputed ancestor up to
    /// and including the root, in walk order.
    pub nodes: Vec<(Cursor, Hash)>,
}

impl Proof {
    pub fn new(hashes: Vec<Hash>) -> Self {
        Self { hashes }
    }

    pub fn hashes(&self) -> &[Hash] {
        &self.hashes
    }

    pub fn into_hashes(self) -> Vec<Hash> {
        self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// An empty proof belongs to a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Number of leaves of the tree this proof was taken from.
    pub fn leaf_count(&self) -> Result<usize> {
        let len = self.hashes.len();
        if len > MAX_PROOF_LEN || len >= usize::BITS as usize {
            return Err(Error::InvalidProof(format!(
                "proof of length {} implies too many blocks",
                len
            )));
        }
        Ok(1usize << len)
    }

    /// Check `block` against `root` by recomputing the hash chain.
    ///
    /// At each step the running hash is the left operand when the current
    /// cursor is a left child and the right operand otherwise, matching how
    /// the source tree combined its nodes.
    pub fn verify<H: MerkleHasher>(&self, block: &Block, root: &Hash) -> Result<VerifiedPath> {
        let leaf_count = self.leaf_count()?;
        let block_number = block.block_number();
        if block_number >= leaf_count {
            return Err(Error::InvalidArgument(format!(
                "Block number {} is too big, we expect only {} blocks",
                block_number, leaf_count
            )));
        }

        let mut cursor = Cursor::leaf(block_number, leaf_count);
        let mut hash = *block.hash();
        let mut nodes = Vec::with_capacity(2 * self.hashes.len() + 1);
        nodes.push((cursor, hash));

        let mut hasher = H::default();
        for sibling in &self.hashes {
            nodes.push((cursor.sibling(), *sibling));
            hash = if cursor.is_left_child() {
                combine(&mut hasher, &hash, sibling)
            } else {
                combine(&mut hasher, sibling, &hash)
            };
            cursor = cursor.parent();
            nodes.push((cursor, hash));
        }

        if &hash != root {
            return Err(Error::VerificationFailed);
        }
        Ok(VerifiedPath { leaf_count, nodes })
    }
}

#[cfg(feature = "wire")]
impl Proof {
    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, crate::wire::encode_config())
            .map_err(|e| Error::InvalidProof(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    ///
    /// Rejects proofs longer than [`MAX_PROOF_LEN`].
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let (proof, _): (Self, _) = bincode::decode_from_slice(bytes, crate::wire::decode_config())
            .map_err(|e| Error::InvalidProof(format!("decode error: {}", e)))?;
        if proof.hashes.len() > MAX_PROOF_LEN {
            return Err(Error::InvalidProof(format!(
                "proof has {} hashes (max {})",
                proof.hashes.len(),
                MAX_PROOF_LEN
            )));
        }
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::hash::{HASH_SIZE, Keccak224Hasher, node_hash};

    fn two_leaf_tree() -> (Block, Block, Hash) {
        let b0 = Block::new(0, 2, b"ab".to_vec()).expect("valid block");
        let b1 = Block::new(1, 2, b"c".to_vec()).expect("valid block");
        let root = node_hash::<Keccak224Hasher>(b0.hash(), b1.hash());
        (b0, b1, root)
    }

    #[test]
    fn test_leaf_count_from_length() {
        assert_eq!(Proof::default().leaf_count(), Ok(1));
        assert_eq!(Proof::new(vec![[0u8; HASH_SIZE]; 4]).leaf_count(), Ok(16));
        assert_matches!(
            Proof::new(vec![[0u8; HASH_SIZE]; 64]).leaf_count(),
            Err(Error::InvalidProof(_))
        );
    }

    #[test]
    fn test_single_leaf_tree() {
        let block = Block::new(0, 4, b"only".to_vec()).expect("valid block");
        let root = *block.hash();
        let path = Proof::default()
            .verify::<Keccak224Hasher>(&block, &root)
            .expect("verify should succeed");
        assert_eq!(path.leaf_count, 1);
        assert_eq!(path.nodes, vec![(Cursor::ROOT, root)]);
    }

    #[test]
    fn test_walk_records_touched_nodes() {
        let (b0, b1, root) = two_leaf_tree();

        let path = Proof::new(vec![*b1.hash()])
            .verify::<Keccak224Hasher>(&b0, &root)
            .expect("left leaf verifies");
        assert_eq!(path.leaf_count, 2);
        assert_eq!(
            path.nodes,
            vec![
                (Cursor::new(2), *b0.hash()),
                (Cursor::new(3), *b1.hash()),
                (Cursor::ROOT, root),
            ]
        );

        let path = Proof::new(vec![*b0.hash()])
            .verify::<Keccak224Hasher>(&b1, &root)
            .expect("right leaf verifies");
        assert_eq!(path.nodes.last(), Some(&(Cursor::ROOT, root)));
    }

    #[test]
    fn test_swapped_operands_fail() {
        let (b0, _, _) = two_leaf_tree();
        let b1 = Block::new(1, 2, b"c".to_vec()).expect("valid block");
        let wrong_root = node_hash::<Keccak224Hasher>(b1.hash(), b0.hash());
        assert_matches!(
            Proof::new(vec![*b1.hash()]).verify::<Keccak224Hasher>(&b0, &wrong_root),
            Err(Error::VerificationFailed)
        );
    }

    #[test]
    fn test_block_number_beyond_proof_is_invalid_argument() {
        let (_, b1, root) = two_leaf_tree();
        let stray = Block::new(2, 2, b"c".to_vec()).expect("valid block");
        assert_matches!(
            Proof::new(vec![*b1.hash()]).verify::<Keccak224Hasher>(&stray, &root),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_wrong_root_fails() {
        let (b0, b1, _) = two_leaf_tree();
        assert_matches!(
            Proof::new(vec![*b1.hash()]).verify::<Keccak224Hasher>(&b0, &[0xFFu8; HASH_SIZE]),
            Err(Error::VerificationFailed)
        );
    }

    #[cfg(feature = "wire")]
    #[test]
    fn test_decode_rejects_oversized_proof() {
        let bytes = bincode::encode_to_vec(
            Proof::new(vec![[1u8; HASH_SIZE]; MAX_PROOF_LEN + 1]),
            crate::wire::encode_config(),
        )
        .expect("encode");
        assert_matches!(Proof::decode_from_slice(&bytes), Err(Error::InvalidProof(_)));

        let proof = Proof::new(vec![[3u8; HASH_SIZE]; 5]);
        let bytes = proof.encode_to_vec().expect("encode");
        assert_eq!(Proof::decode_from_slice(&bytes), Ok(proof));
    }
}
