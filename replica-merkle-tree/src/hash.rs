//! Digest primitive and the two hashing schemes built on it.
//!
//! - Blocks: `H("[#<number>/<size>/<len>]" || data)`
//! - Internal nodes: `H(left || right)`, no separator or length prefix.
//!
//! The block header binds the position, the declared capacity and the
//! actual length into the leaf hash, so bytes cannot be replayed under a
//! different index or truncated/padded without changing the hash.

use sha3::Digest;

/// Size in bytes of every hash in the tree (224 bits).
pub const HASH_SIZE: usize = 28;

/// A tree hash.
pub type Hash = [u8; HASH_SIZE];

/// An incremental 224-bit digest.
///
/// Any deterministic, collision resistant function works; both tree kinds
/// and the blocks fed to them must agree on the implementation.
pub trait MerkleHasher: Default {
    /// Absorb `bytes`.
    fn update(&mut self, bytes: &[u8]);

    /// Produce the digest of everything absorbed since the last reset and
    /// reset the state.
    fn finalize_reset(&mut self) -> Hash;

    /// Discard everything absorbed so far.
    fn reset(&mut self);

    /// Produce the digest, consuming the hasher.
    fn finalize(mut self) -> Hash {
        self.finalize_reset()
    }
}

/// Keccak-224, the default digest.
#[derive(Clone, Default)]
pub struct Keccak224Hasher(sha3::Keccak224);

impl MerkleHasher for Keccak224Hasher {
    fn update(&mut self, bytes: &[u8]) {
        Digest::update(&mut self.0, bytes);
    }

    fn finalize_reset(&mut self) -> Hash {
        let digest = Digest::finalize_reset(&mut self.0);
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(&digest);
        out
    }

    fn reset(&mut self) {
        Digest::reset(&mut self.0);
    }
}

/// BLAKE3 with its extendable output truncated to 28 bytes.
#[derive(Clone, Default)]
pub struct Blake3Hasher(blake3::Hasher);

impl MerkleHasher for Blake3Hasher {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize_reset(&mut self) -> Hash {
        let mut out = [0u8; HASH_SIZE];
        self.0.finalize_xof().fill(&mut out);
        self.0.reset();
        out
    }

    fn reset(&mut self) {
        self.0.reset();
    }
}

/// Hash a block: `H("[#<block_number>/<block_size>/<data.len()>]" || data)`.
pub fn block_hash<H: MerkleHasher>(block_number: usize, block_size: usize, data: &[u8]) -> Hash {
    let header = format!("[#{}/{}/{}]", block_number, block_size, data.len());
    let mut hasher = H::default();
    hasher.update(header.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

/// Hash an internal node from its children: `H(left || right)`.
pub fn node_hash<H: MerkleHasher>(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = H::default();
    combine(&mut hasher, left, right)
}

/// Same as [`node_hash`] but reuses `hasher`, which is left reset.
pub(crate) fn combine<H: MerkleHasher>(hasher: &mut H, left: &Hash, right: &Hash) -> Hash {
    hasher.update(left);
    hasher.update(right);
    hasher.finalize_reset()
}
