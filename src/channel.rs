//! Fiat–Shamir channel
//!
//! The channel holds a running 32-byte digest plus a draw counter. Every mix
//! absorbs into the digest and resets the counter; every draw hashes
//! `digest ‖ counter` so repeated draws differ without advancing the digest.
//! Two channels observing identical mix sequences produce identical draws.

use blake2::{Blake2s256, Digest};

use crate::m31::{M31, P};
use crate::merkle::{Blake2sHash, Blake2sMerkleHasher, MerkleHasher, HASH_SIZE};
use crate::qm31::{QM31, SECURE_EXTENSION_DEGREE};

/// Channel capability set used by the prover and verifier.
pub trait Channel {
    fn mix_u32s(&mut self, data: &[u32]);
    fn mix_u64(&mut self, value: u64);
    fn mix_felts(&mut self, felts: &[QM31]);
    fn draw_secure_felt(&mut self) -> QM31;
    fn draw_queries(&mut self, n_queries: usize, log_domain_size: u32) -> Vec<usize>;
    fn verify_pow_nonce(&self, pow_bits: u32, nonce: u64) -> bool;
}

/// Capability tying a hasher to the channel that absorbs its roots.
pub trait MerkleChannel: Channel {
    type Hasher: MerkleHasher;
    fn mix_root(&mut self, root: <Self::Hasher as MerkleHasher>::Hash);
}

/// The Blake2s-backed reference channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blake2sChannel {
    digest: Blake2sHash,
    n_draws: u64,
}

impl Blake2sChannel {
    pub fn digest(&self) -> Blake2sHash {
        self.digest
    }

    fn absorb(&mut self, parts: &[&[u8]]) {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        for part in parts {
            hasher.update(part);
        }
        self.digest.copy_from_slice(&hasher.finalize());
        self.n_draws = 0;
    }

    /// One digest-derived block; advances the draw counter only.
    fn draw_block(&mut self) -> Blake2sHash {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        hasher.update(self.n_draws.to_le_bytes());
        self.n_draws += 1;
        let mut block = [0u8; HASH_SIZE];
        block.copy_from_slice(&hasher.finalize());
        block
    }

    /// Searches for a nonce satisfying the proof-of-work condition. The
    /// caller mixes the returned nonce into the channel.
    pub fn grind(&self, pow_bits: u32) -> u64 {
        let mut nonce = 0u64;
        loop {
            if self.verify_pow_nonce(pow_bits, nonce) {
                return nonce;
            }
            nonce += 1;
        }
    }
}

fn leading_zero_bits(hash: &Blake2sHash) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

impl Channel for Blake2sChannel {
    fn mix_u32s(&mut self, data: &[u32]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.absorb(&[&bytes]);
    }

    fn mix_u64(&mut self, value: u64) {
        self.absorb(&[&value.to_le_bytes()]);
    }

    fn mix_felts(&mut self, felts: &[QM31]) {
        let mut bytes = Vec::with_capacity(felts.len() * 16);
        for felt in felts {
            for coord in felt.to_m31_array() {
                bytes.extend_from_slice(&coord.to_le_bytes());
            }
        }
        self.absorb(&[&bytes]);
    }

    /// Samples a secure felt uniformly: u32 words from digest-derived blocks
    /// are rejected unless canonical, so out-of-range coordinates never
    /// occur.
    fn draw_secure_felt(&mut self) -> QM31 {
        let mut coords = [M31::ZERO; SECURE_EXTENSION_DEGREE];
        let mut filled = 0;
        while filled < SECURE_EXTENSION_DEGREE {
            let block = self.draw_block();
            for word in block.chunks_exact(4) {
                let value = u32::from_le_bytes(word.try_into().unwrap());
                if value < P {
                    coords[filled] = M31::from_u32_unchecked(value);
                    filled += 1;
                    if filled == SECURE_EXTENSION_DEGREE {
                        break;
                    }
                }
            }
        }
        QM31::from_m31_array(coords)
    }

    /// Draws `n_queries` positions in `[0, 2^log_domain_size)`. Duplicates
    /// are allowed; masking keeps the distribution uniform.
    fn draw_queries(&mut self, n_queries: usize, log_domain_size: u32) -> Vec<usize> {
        assert!(log_domain_size <= 31);
        let mask = (1usize << log_domain_size) - 1;
        let mut queries = Vec::with_capacity(n_queries);
        while queries.len() < n_queries {
            let block = self.draw_block();
            for word in block.chunks_exact(4) {
                if queries.len() == n_queries {
                    break;
                }
                let value = u32::from_le_bytes(word.try_into().unwrap());
                queries.push(value as usize & mask);
            }
        }
        queries
    }

    /// True iff `blake2s(digest ‖ nonce)` starts with `pow_bits` zero bits.
    /// Does not advance the channel.
    fn verify_pow_nonce(&self, pow_bits: u32, nonce: u64) -> bool {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        hasher.update(nonce.to_le_bytes());
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&hasher.finalize());
        leading_zero_bits(&hash) >= pow_bits
    }
}

impl MerkleChannel for Blake2sChannel {
    type Hasher = Blake2sMerkleHasher;

    fn mix_root(&mut self, root: Blake2sHash) {
        self.absorb(&[&root]);
    }
}
