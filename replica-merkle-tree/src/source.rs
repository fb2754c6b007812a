//! The source-of-truth tree: built once from the complete data.

use std::{fmt, marker::PhantomData};

use tracing::debug;

use crate::{
    Block, Error, Proof, Result,
    cursor::{ArrayTree, is_power_of_two},
    hash::{HASH_SIZE, Hash, Keccak224Hasher, MerkleHasher, combine},
    tree::{BlockWithProof, MerkleTree},
};

/// A complete Merkle tree over data that is fully available.
///
/// Every hash is computed at construction and never changes afterwards, so
/// a `SourceTree` can be shared between threads without synchronization.
#[derive(Clone)]
pub struct SourceTree<H = Keccak224Hasher> {
    blocks: Vec<Block>,
    tree: ArrayTree<Hash>,
    _hasher: PhantomData<fn() -> H>,
}

impl<H: MerkleHasher> SourceTree<H> {
    /// Split `bytes` into `block_count` blocks and build the tree.
    ///
    /// The nominal block size is `ceil(len / block_count)`. The first
    /// `len % block_count` blocks (all of them if that is 0) are full and the
    /// rest are one byte shorter, so block sizes never increase and the
    /// blocks concatenate back to `bytes`.
    pub fn from_bytes(bytes: &[u8], block_count: usize) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidConfiguration(
                "bytes can't be empty".to_string(),
            ));
        }
        if block_count == 0 {
            return Err(Error::InvalidConfiguration(
                "number of blocks must be positive".to_string(),
            ));
        }
        if !is_power_of_two(block_count) {
            return Err(Error::InvalidConfiguration(format!(
                "number of blocks must be a power of two, got {}",
                block_count
            )));
        }

        let block_size = bytes.len().div_ceil(block_count);
        let full_blocks = block_count - (block_size * block_count - bytes.len());
        let blocks = (0..block_count)
            .map(|idx| {
                let offset = idx * block_size - idx.saturating_sub(full_blocks);
                let size = if idx < full_blocks {
                    block_size
                } else {
                    block_size - 1
                };
                Block::with_hasher::<H>(idx, block_size, &bytes[offset..offset + size])
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_blocks(blocks)
    }

    /// Build the tree over blocks that are already split.
    ///
    /// Block `i` must carry block number `i`, and the blocks must have been
    /// hashed with `H`.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(Error::InvalidConfiguration(
                "blocks can't be empty".to_string(),
            ));
        }
        if !is_power_of_two(blocks.len()) {
            return Err(Error::InvalidConfiguration(format!(
                "number of blocks must be a power of two, got {}",
                blocks.len()
            )));
        }
        if let Some((idx, block)) = blocks
            .iter()
            .enumerate()
            .find(|(idx, block)| block.block_number() != *idx)
        {
            return Err(Error::InvalidConfiguration(format!(
                "block at index {} has block number {}",
                idx,
                block.block_number()
            )));
        }

        let mut tree = ArrayTree::with_leaves(blocks.len(), || [0u8; HASH_SIZE])?;
        build_tree::<H>(&mut tree, &blocks);
        debug!(
            block_count = blocks.len(),
            block_size = blocks[0].block_size(),
            "Built source Merkle tree"
        );

        Ok(Self {
            blocks,
            tree,
            _hasher: PhantomData,
        })
    }

    /// Nominal size of every block.
    pub fn block_size(&self) -> usize {
        self.blocks[0].block_size()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl<H> fmt::Debug for SourceTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTree")
            .field("block_count", &self.blocks.len())
            .field("root_hash", &self.tree[self.tree.root()])
            .finish()
    }
}

/// Fill the leaves with block hashes, then every layer above from left to
/// right until the root.
fn build_tree<H: MerkleHasher>(tree: &mut ArrayTree<Hash>, blocks: &[Block]) {
    let mut cursor = tree.leaf(0);
    for block in blocks {
        tree[cursor] = *block.hash();
        cursor = cursor.right();
    }

    let mut hasher = H::default();
    let mut layer = tree.leaf(0);
    while !layer.is_root() {
        layer = layer.parent();
        let mut node = layer;
        loop {
            let hash = combine(&mut hasher, &tree[node.left_child()], &tree[node.right_child()]);
            tree[node] = hash;
            if !node.has_right() {
                break;
            }
            node = node.right();
        }
    }
}

impl<H: MerkleHasher> MerkleTree for SourceTree<H> {
    fn root_hash(&self) -> Hash {
        self.tree[self.tree.root()]
    }

    fn number_of_blocks(&self) -> Option<usize> {
        Some(self.blocks.len())
    }

    fn get_block_with_proof(&self, block_number: usize) -> Result<BlockWithProof> {
        let block = self.blocks.get(block_number).ok_or(Error::OutOfRange {
            block_number,
            block_count: self.blocks.len(),
        })?;

        let mut cursor = self.tree.leaf(block_number);
        let mut hashes = Vec::with_capacity(self.tree.leaf_count().trailing_zeros() as usize);
        while !cursor.is_root() {
            hashes.push(self.tree[cursor.sibling()]);
            cursor = cursor.parent();
        }
        Ok((block.clone(), Proof::new(hashes)))
    }

    fn verify_and_add_block(&self, _block: Block, _proof: &Proof) -> Result<()> {
        Err(Error::Unsupported(
            "can't add block to the source of truth tree".to_string(),
        ))
    }
}
