//! Hash-bound chunks of the transferred data.

#[cfg(feature = "wire")]
use bincode::{Decode, Encode};

use crate::{
    Error, Result,
    hash::{Hash, Keccak224Hasher, MerkleHasher, block_hash},
};

/// An immutable chunk of data bound to its position in the tree.
///
/// The hash covers the block number, the nominal block size and the actual
/// data length as well as the bytes, so it is computed once at
/// construction. Two blocks are equal when number, size and data are; the
/// hash is derived from those and is not compared.
#[derive(Debug, Clone)]
pub struct Block {
    block_number: usize,
    block_size: usize,
    data: Vec<u8>,
    hash: Hash,
}

impl Block {
    /// Create a block hashed with the default [`Keccak224Hasher`].
    ///
    /// Fails with [`Error::InvalidConfiguration`] if `data` is longer than
    /// `block_size`.
    pub fn new(block_number: usize, block_size: usize, data: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_hasher::<Keccak224Hasher>(block_number, block_size, data)
    }

    /// Create a block hashed with `H`.
    pub fn with_hasher<H: MerkleHasher>(
        block_number: usize,
        block_size: usize,
        data: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let data = data.into();
        if data.len() > block_size {
            return Err(Error::InvalidConfiguration(format!(
                "actual size {} must be smaller or equal than the block size {}",
                data.len(),
                block_size
            )));
        }
        let hash = block_hash::<H>(block_number, block_size, &data);
        Ok(Self {
            block_number,
            block_size,
            data,
            hash,
        })
    }

    pub fn block_number(&self) -> usize {
        self.block_number
    }

    /// Nominal size shared by all blocks of a tree; the data may be shorter.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Actual length of the data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Leaf hash of this block.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.block_number == other.block_number
            && self.block_size == other.block_size
            && self.data == other.data
    }
}

impl Eq for Block {}

/// What goes on the wire for a block. The hash is left out and recomputed
/// by the receiver.
#[cfg(feature = "wire")]
#[derive(Encode, Decode)]
struct BlockRecord {
    block_number: u64,
    block_size: u64,
    data: Vec<u8>,
}

#[cfg(feature = "wire")]
impl Block {
    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let record = BlockRecord {
            block_number: self.block_number as u64,
            block_size: self.block_size as u64,
            data: self.data.clone(),
        };
        bincode::encode_to_vec(&record, crate::wire::encode_config())
            .map_err(|e| Error::InvalidData(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode, hashing with the default hasher.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        Self::decode_from_slice_with_hasher::<Keccak224Hasher>(bytes)
    }

    /// Decode from bytes using bincode, hashing with `H`.
    ///
    /// The block is rebuilt through [`Block::with_hasher`], so the size
    /// check applies and the hash always matches the decoded data.
    pub fn decode_from_slice_with_hasher<H: MerkleHasher>(bytes: &[u8]) -> Result<Self> {
        let (record, _): (BlockRecord, _) =
            bincode::decode_from_slice(bytes, crate::wire::decode_config())
                .map_err(|e| Error::InvalidData(format!("decode error: {}", e)))?;
        let block_number = usize::try_from(record.block_number).map_err(|_| {
            Error::InvalidData(format!("block number {} too large", record.block_number))
        })?;
        let block_size = usize::try_from(record.block_size).map_err(|_| {
            Error::InvalidData(format!("block size {} too large", record.block_size))
        })?;
        Self::with_hasher::<H>(block_number, block_size, record.data)
    }
}
