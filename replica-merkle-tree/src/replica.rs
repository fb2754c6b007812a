//! The replica tree: rebuilt block by block from a trusted root hash.
//!
//! A replica starts knowing only the root hash, not even the number of
//! blocks. Every block arrives with a proof and is verified on its own; the
//! first verified proof fixes the number of blocks, and from then on the
//! replica serves the blocks it holds exactly like the source would.
//!
//! All state is write-once: the block count, the two backing arrays and
//! every slot in them go from empty to filled at most once, using a single
//! compare-and-set each. Nothing is written until a proof has verified, so
//! any value already present must equal the one being written (barring a
//! hash collision), and concurrent writers never need to coordinate.
//!
//! Publishing order per block: tree hashes, then the block, then the block
//! count. A reader that sees the count and the block therefore also sees
//! every hash needed to rebuild that block's proof.

use std::{
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicUsize, Ordering},
};

use once_cell::race::OnceBox;
use tracing::{debug, trace, warn};

use crate::{
    Block, Error, Proof, Result,
    cursor::{ArrayTree, Cursor},
    hash::{Hash, Keccak224Hasher, MerkleHasher},
    slot::{Fill, WriteOnce},
    tree::{BlockWithProof, MerkleTree},
};

/// Block count value meaning "not established yet". Real trees have at
/// least one block.
const UNKNOWN_COUNT: usize = 0;

/// A Merkle tree reconstructed incrementally from verified blocks.
///
/// `ReplicaTree` is `Sync`: any number of threads may add and read blocks
/// through a shared reference, in any order, without blocking each other.
pub struct ReplicaTree<H = Keccak224Hasher> {
    root_hash: Hash,
    block_count: AtomicUsize,
    tree: OnceBox<ArrayTree<WriteOnce<Hash>>>,
    blocks: OnceBox<Box<[WriteOnce<Block>]>>,
    _hasher: PhantomData<fn() -> H>,
}

impl<H: MerkleHasher> ReplicaTree<H> {
    /// An empty replica of the tree with the given root hash.
    pub fn new(root_hash: Hash) -> Self {
        Self {
            root_hash,
            block_count: AtomicUsize::new(UNKNOWN_COUNT),
            tree: OnceBox::new(),
            blocks: OnceBox::new(),
            _hasher: PhantomData,
        }
    }

    /// Number of blocks received so far.
    pub fn received_blocks(&self) -> usize {
        self.blocks
            .get()
            .map_or(0, |blocks| blocks.iter().filter(|slot| slot.is_filled()).count())
    }

    /// Block numbers not received yet, in ascending order.
    ///
    /// Empty while the number of blocks is unknown.
    pub fn missing_blocks(&self) -> Vec<usize> {
        if self.number_of_blocks().is_none() {
            return Vec::new();
        }
        self.blocks.get().map_or_else(Vec::new, |blocks| {
            blocks
                .iter()
                .enumerate()
                .filter(|(_, slot)| !slot.is_filled())
                .map(|(block_number, _)| block_number)
                .collect()
        })
    }

    /// `true` once every block has been received.
    pub fn is_complete(&self) -> bool {
        self.number_of_blocks().is_some() && self.missing_blocks().is_empty()
    }

    /// Concatenate the data of all blocks.
    ///
    /// Fails with [`Error::NotYetAvailable`] before the first block and with
    /// [`Error::NotFound`] for the first block still missing.
    pub fn reassemble(&self) -> Result<Vec<u8>> {
        let block_count = self.number_of_blocks().ok_or(Error::NotYetAvailable)?;
        let blocks = self.published_blocks();
        let mut data = Vec::new();
        for (block_number, slot) in blocks.iter().enumerate().take(block_count) {
            let block = slot.get().ok_or(Error::NotFound { block_number })?;
            data.extend_from_slice(block.data());
        }
        Ok(data)
    }

    /// Verify `block` and return the nodes to publish.
    fn verify(&self, block: &Block, proof: &Proof) -> Result<(usize, Vec<(Cursor, Hash)>)> {
        let implied = proof.leaf_count()?;
        if let Some(expected) = self.number_of_blocks() {
            if expected != implied {
                return Err(Error::SizeMismatch { expected, implied });
            }
        }
        let path = proof.verify::<H>(block, &self.root_hash)?;
        Ok((path.leaf_count, path.nodes))
    }

    fn add_block(&self, block: Block, proof: &Proof) -> Result<()> {
        let (leaf_count, nodes) = self.verify(&block, proof)?;

        // Losing racers drop their allocation and use the winner's.
        let tree = self.tree.get_or_try_init(|| {
            debug!(leaf_count, "Allocating replica tree");
            ArrayTree::with_leaves(leaf_count, WriteOnce::default).map(Box::new)
        })?;
        if tree.leaf_count() != leaf_count {
            return Err(Error::SizeMismatch {
                expected: tree.leaf_count(),
                implied: leaf_count,
            });
        }
        // The block itself is not published yet, so readers do not look at
        // these nodes and the order of writes does not matter.
        for (cursor, hash) in nodes {
            tree[cursor].fill(hash);
        }

        let blocks = self.blocks.get_or_init(|| {
            Box::new((0..leaf_count).map(|_| WriteOnce::default()).collect())
        });
        let block_number = block.block_number();
        let duplicate = blocks[block_number].fill(block) == Fill::Present;

        match self.block_count.compare_exchange(
            UNKNOWN_COUNT,
            leaf_count,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => debug!(block_count = leaf_count, "Established number of blocks"),
            Err(current) if current == leaf_count => {}
            Err(current) => panic!(
                "internal invariant violation: block count is {}, refusing {}",
                current, leaf_count
            ),
        }

        trace!(block_number, duplicate, "Accepted block");
        Ok(())
    }

    /// The block array. Only called once the block count is known, which is
    /// published after the array.
    fn published_blocks(&self) -> &[WriteOnce<Block>] {
        match self.blocks.get() {
            Some(blocks) => &blocks[..],
            None => panic!("internal invariant violation: block count known but no block array"),
        }
    }

    fn published_tree(&self) -> &ArrayTree<WriteOnce<Hash>> {
        match self.tree.get() {
            Some(tree) => tree,
            None => panic!("internal invariant violation: block count known but no tree"),
        }
    }
}

impl<H: MerkleHasher> MerkleTree for ReplicaTree<H> {
    fn root_hash(&self) -> Hash {
        self.root_hash
    }

    fn number_of_blocks(&self) -> Option<usize> {
        match self.block_count.load(Ordering::Acquire) {
            UNKNOWN_COUNT => None,
            count => Some(count),
        }
    }

    fn get_block_with_proof(&self, block_number: usize) -> Result<BlockWithProof> {
        let block_count = self.number_of_blocks().ok_or(Error::NotYetAvailable)?;
        if block_number >= block_count {
            return Err(Error::OutOfRange {
                block_number,
                block_count,
            });
        }
        let block = self.published_blocks()[block_number]
            .get()
            .ok_or(Error::NotFound { block_number })?
            .clone();

        // The block was published after its proof hashes, so they are all
        // present.
        let tree = self.published_tree();
        let mut cursor = tree.leaf(block_number);
        let mut hashes = Vec::with_capacity(block_count.trailing_zeros() as usize);
        while !cursor.is_root() {
            match tree[cursor.sibling()].get() {
                Some(hash) => hashes.push(*hash),
                None => panic!(
                    "internal invariant violation: block {} published without sibling {:?}",
                    block_number,
                    cursor.sibling()
                ),
            }
            cursor = cursor.parent();
        }
        Ok((block, Proof::new(hashes)))
    }

    fn verify_and_add_block(&self, block: Block, proof: &Proof) -> Result<()> {
        let block_number = block.block_number();
        self.add_block(block, proof).inspect_err(|err| {
            warn!(
                block_number,
                proof_len = proof.len(),
                block_count = ?self.number_of_blocks(),
                reason = %err,
                "Rejected block"
            );
        })
    }
}

impl<H> fmt::Debug for ReplicaTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaTree")
            .field("root_hash", &self.root_hash)
            .field("block_count", &self.block_count.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{SourceTree, hash::HASH_SIZE};

    fn source() -> SourceTree {
        let data: Vec<u8> = (0..100u8).collect();
        SourceTree::from_bytes(&data, 8).expect("valid source")
    }

    #[test]
    fn test_fresh_replica_knows_nothing() {
        let replica = ReplicaTree::<Keccak224Hasher>::new([1u8; HASH_SIZE]);
        assert_eq!(replica.root_hash(), [1u8; HASH_SIZE]);
        assert_eq!(replica.number_of_blocks(), None);
        assert_eq!(replica.received_blocks(), 0);
        assert!(replica.missing_blocks().is_empty());
        assert!(!replica.is_complete());
        assert_matches!(replica.get_block_with_proof(0), Err(Error::NotYetAvailable));
        assert_matches!(replica.reassemble(), Err(Error::NotYetAvailable));
    }

    #[test]
    fn test_first_block_fixes_geometry() {
        let source = source();
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        let (block, proof) = source.get_block_with_proof(6).expect("block 6 exists");
        replica
            .verify_and_add_block(block.clone(), &proof)
            .expect("valid block accepted");

        assert_eq!(replica.number_of_blocks(), Some(8));
        assert_eq!(replica.received_blocks(), 1);
        assert_eq!(replica.missing_blocks(), vec![0, 1, 2, 3, 4, 5, 7]);
        assert_eq!(
            replica.get_block_with_proof(6).expect("block 6 present"),
            (block, proof)
        );
        assert_matches!(
            replica.get_block_with_proof(0),
            Err(Error::NotFound { block_number: 0 })
        );
        assert_matches!(
            replica.get_block_with_proof(8),
            Err(Error::OutOfRange {
                block_number: 8,
                block_count: 8
            })
        );
        assert_matches!(replica.reassemble(), Err(Error::NotFound { block_number: 0 }));
    }

    #[test]
    fn test_duplicate_block_is_accepted() {
        let source = source();
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        let (block, proof) = source.get_block_with_proof(2).expect("block 2 exists");
        replica
            .verify_and_add_block(block.clone(), &proof)
            .expect("first copy accepted");
        replica
            .verify_and_add_block(block, &proof)
            .expect("second copy accepted");
        assert_eq!(replica.received_blocks(), 1);
    }

    #[test]
    fn test_size_mismatch() {
        let source = source();
        let other = SourceTree::<Keccak224Hasher>::from_bytes(&[1, 2, 3, 4], 4)
            .expect("valid source");
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        let (block, proof) = source.get_block_with_proof(0).expect("block 0 exists");
        replica
            .verify_and_add_block(block, &proof)
            .expect("valid block accepted");

        let (block, proof) = other.get_block_with_proof(1).expect("block 1 exists");
        assert_matches!(
            replica.verify_and_add_block(block, &proof),
            Err(Error::SizeMismatch {
                expected: 8,
                implied: 4
            })
        );
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let source = source();
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        let (block, proof) = source.get_block_with_proof(3).expect("block 3 exists");
        let forged = Block::new(3, block.block_size(), vec![0u8; block.len()])
            .expect("valid block");
        assert_matches!(
            replica.verify_and_add_block(forged, &proof),
            Err(Error::VerificationFailed)
        );
        assert_eq!(replica.number_of_blocks(), None);
        assert!(replica.tree.get().is_none());
        assert!(replica.blocks.get().is_none());

        let stray = Block::new(8, block.block_size(), block.data()).expect("valid block");
        assert_matches!(
            replica.verify_and_add_block(stray, &proof),
            Err(Error::InvalidArgument(_))
        );
        assert_eq!(replica.number_of_blocks(), None);
    }

    #[test]
    fn test_reassemble_complete_replica() {
        let data: Vec<u8> = (0..37u8).collect();
        let source = SourceTree::<Keccak224Hasher>::from_bytes(&data, 4).expect("valid source");
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        for n in (0..4).rev() {
            let (block, proof) = source.get_block_with_proof(n).expect("block exists");
            replica
                .verify_and_add_block(block, &proof)
                .expect("valid block accepted");
        }
        assert!(replica.is_complete());
        assert_eq!(replica.reassemble().expect("complete"), data);
    }

    #[test]
    fn test_single_block_tree() {
        let source = SourceTree::<Keccak224Hasher>::from_bytes(b"xyz", 1).expect("valid source");
        let replica = ReplicaTree::<Keccak224Hasher>::new(source.root_hash());
        let (block, proof) = source.get_block_with_proof(0).expect("block 0 exists");
        replica
            .verify_and_add_block(block, &proof)
            .expect("valid block accepted");
        assert_eq!(replica.number_of_blocks(), Some(1));
        assert_eq!(
            replica.get_block_with_proof(0).expect("block 0 present"),
            source.get_block_with_proof(0).expect("block 0 exists")
        );
    }
}
