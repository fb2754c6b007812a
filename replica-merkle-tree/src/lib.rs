//! Verified block transfer over Merkle trees with a power-of-two number of
//! leaves.
//!
//! A [`SourceTree`] is built once from complete data and hands out blocks
//! with their inclusion proofs. A [`ReplicaTree`] starts from nothing but
//! the trusted root hash and accepts `(Block, Proof)` pairs from any number
//! of threads, in any order, from any number of untrusted senders. Each
//! block is verified on its own; once verified it is stored and served back
//! with a proof identical to the source's, so a replica can in turn act as
//! a source for other replicas.
//!
//! Hashing:
//!
//! - Blocks: `H("[#<number>/<size>/<len>]" || data)`
//! - Internal nodes: `H(left || right)`
//!
//! `H` is a 224-bit digest chosen by the [`MerkleHasher`] type parameter,
//! Keccak-224 by default.

mod block;
pub mod cursor;
mod error;
pub mod hash;
mod proof;
mod replica;
mod slot;
mod source;
mod tree;
#[cfg(feature = "wire")]
mod wire;


pub use block::Block;
pub use cursor::{ArrayTree, Cursor};
pub use error::{Error, Result};
pub use hash::{Blake3Hasher, HASH_SIZE, Hash, Keccak224Hasher, MerkleHasher};
pub use proof::{MAX_PROOF_LEN, Proof, VerifiedPath};
pub use replica::ReplicaTree;
pub use source::SourceTree;
pub use tree::{BlockWithProof, MerkleTree};
