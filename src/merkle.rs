//! Lifted Merkle vector commitment
//!
//! Leaves are rows across one or more base-field columns of the same log
//! size. Leaf and node hashes use distinct 64-byte-padded domain separators.
//! Decommitments carry only the sibling hashes a sorted query batch cannot
//! reconstruct itself.

use blake2::{Blake2s256, Digest};

use crate::m31::M31;

/// Hash output size in bytes.
pub const HASH_SIZE: usize = 32;

/// The Blake2s hash value used throughout the engine.
pub type Blake2sHash = [u8; HASH_SIZE];

const fn pad64(bytes: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    let mut i = 0;
    while i < bytes.len() {
        out[i] = bytes[i];
        i += 1;
    }
    out
}

/// Domain separator absorbed before leaf data.
pub const LEAF_PREFIX: [u8; 64] = pad64(b"circlet:leaf:v1");

/// Domain separator absorbed before child hashes.
pub const NODE_PREFIX: [u8; 64] = pad64(b"circlet:node:v1");

/// Hasher capability set of the lifted Merkle commitment.
pub trait MerkleHasher: Clone {
    type Hash: Copy + Eq + core::fmt::Debug;

    /// A hasher pre-absorbed with the leaf domain separator.
    fn default_with_initial_state() -> Self;

    /// Absorbs one row of base-field values in 4-byte little-endian form.
    fn update_leaf(&mut self, row: &[M31]);

    fn finalize(self) -> Self::Hash;

    /// Hashes two children under the node domain separator.
    fn hash_children(left: &Self::Hash, right: &Self::Hash) -> Self::Hash;
}

/// The reference hasher: Blake2s with 32-byte output.
#[derive(Clone)]
pub struct Blake2sMerkleHasher {
    state: Blake2s256,
}

impl MerkleHasher for Blake2sMerkleHasher {
    type Hash = Blake2sHash;

    fn default_with_initial_state() -> Self {
        let mut state = Blake2s256::new();
        state.update(LEAF_PREFIX);
        Self { state }
    }

    fn update_leaf(&mut self, row: &[M31]) {
        for value in row {
            self.state.update(value.to_le_bytes());
        }
    }

    fn finalize(self) -> Blake2sHash {
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&self.state.finalize());
        hash
    }

    fn hash_children(left: &Blake2sHash, right: &Blake2sHash) -> Blake2sHash {
        let mut state = Blake2s256::new();
        state.update(NODE_PREFIX);
        state.update(left);
        state.update(right);
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&state.finalize());
        hash
    }
}

/// Sibling hashes for a query batch, bottom layer first.
pub struct MerkleDecommitmentLifted<H: MerkleHasher> {
    pub hash_witness: Vec<H::Hash>,
}

impl<H: MerkleHasher> Clone for MerkleDecommitmentLifted<H> {
    fn clone(&self) -> Self {
        Self {
            hash_witness: self.hash_witness.clone(),
        }
    }
}

impl<H: MerkleHasher> core::fmt::Debug for MerkleDecommitmentLifted<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MerkleDecommitmentLifted")
            .field("hash_witness", &self.hash_witness)
            .finish()
    }
}

impl<H: MerkleHasher> PartialEq for MerkleDecommitmentLifted<H> {
    fn eq(&self, other: &Self) -> bool {
        self.hash_witness == other.hash_witness
    }
}

impl<H: MerkleHasher> Eq for MerkleDecommitmentLifted<H> {}

impl<H: MerkleHasher> Default for MerkleDecommitmentLifted<H> {
    fn default() -> Self {
        Self {
            hash_witness: Vec::new(),
        }
    }
}

/// Errors surfaced by Merkle verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleVerificationError {
    /// A column or hash witness ran out before the sweep finished.
    WitnessTooShort,
    /// Unused values or hashes remained after the sweep.
    WitnessTooLong,
    /// The recomputed root does not match the commitment.
    RootMismatch,
}

impl core::fmt::Display for MerkleVerificationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WitnessTooShort => write!(f, "witness too short"),
            Self::WitnessTooLong => write!(f, "witness too long"),
            Self::RootMismatch => write!(f, "root mismatch"),
        }
    }
}

impl std::error::Error for MerkleVerificationError {}

/// Prover-side lifted Merkle tree: `layers[0]` are the leaf hashes, the last
/// layer is the root alone.
pub struct MerkleTreeLifted<H: MerkleHasher> {
    pub layers: Vec<Vec<H::Hash>>,
}

impl<H: MerkleHasher> MerkleTreeLifted<H> {
    /// Builds the tree over columns of equal power-of-two length. Leaf `i`
    /// hashes the `i`-th row across all columns.
    pub fn build(columns: &[&[M31]]) -> Self {
        assert!(!columns.is_empty(), "cannot commit to zero columns");
        let n_rows = columns[0].len();
        assert!(n_rows.is_power_of_two(), "column length must be a power of two");
        assert!(
            columns.iter().all(|c| c.len() == n_rows),
            "columns must have equal lengths"
        );

        let mut leaf_row = Vec::with_capacity(columns.len());
        let mut leaves = Vec::with_capacity(n_rows);
        for i in 0..n_rows {
            leaf_row.clear();
            leaf_row.extend(columns.iter().map(|c| c[i]));
            let mut hasher = H::default_with_initial_state();
            hasher.update_leaf(&leaf_row);
            leaves.push(hasher.finalize());
        }

        let mut layers = vec![leaves];
        while layers.last().unwrap().len() > 1 {
            let prev = layers.last().unwrap();
            let next: Vec<H::Hash> = prev
                .chunks_exact(2)
                .map(|pair| H::hash_children(&pair[0], &pair[1]))
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    pub fn root(&self) -> H::Hash {
        self.layers.last().unwrap()[0]
    }

    /// Produces the sibling-hash witness for sorted, deduplicated query
    /// positions. Siblings that are themselves queried (or derivable) are
    /// skipped.
    pub fn decommit(&self, positions: &[usize]) -> MerkleDecommitmentLifted<H> {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        let mut hash_witness = Vec::new();
        let mut layer_positions: Vec<usize> = positions.to_vec();

        for layer in &self.layers[..self.layers.len() - 1] {
            let mut next_positions = Vec::with_capacity(layer_positions.len());
            let mut i = 0;
            while i < layer_positions.len() {
                let pos = layer_positions[i];
                let sibling = pos ^ 1;
                if i + 1 < layer_positions.len() && layer_positions[i + 1] == sibling {
                    i += 2;
                } else {
                    hash_witness.push(layer[sibling]);
                    i += 1;
                }
                next_positions.push(pos >> 1);
            }
            layer_positions = next_positions;
        }

        MerkleDecommitmentLifted { hash_witness }
    }
}

/// Verifier-side state for one committed tree.
pub struct MerkleVerifierLifted<H: MerkleHasher> {
    pub root: H::Hash,
    pub column_log_sizes: Vec<u32>,
}

impl<H: MerkleHasher> MerkleVerifierLifted<H> {
    pub fn new(root: H::Hash, column_log_sizes: Vec<u32>) -> Self {
        Self {
            root,
            column_log_sizes,
        }
    }

    /// Verifies queried values against the root.
    ///
    /// `query_positions` are sorted (duplicates allowed; duplicate entries
    /// must agree across all columns). `queried_values` holds one value per
    /// query entry per column.
    pub fn verify(
        &self,
        query_positions: &[usize],
        queried_values: &[Vec<M31>],
        decommitment: &MerkleDecommitmentLifted<H>,
    ) -> Result<(), MerkleVerificationError> {
        debug_assert!(query_positions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(queried_values.len(), self.column_log_sizes.len());

        // Duplicate adjacent positions must agree on every column's value.
        for (i, w) in query_positions.windows(2).enumerate() {
            if w[0] == w[1] {
                for column in queried_values {
                    if column.get(i) != column.get(i + 1) {
                        return Err(MerkleVerificationError::RootMismatch);
                    }
                }
            }
        }

        // Stable-sort columns by log size ascending. Trees in this engine
        // hold equal-size columns, but the general rule is implemented.
        let mut column_order: Vec<usize> = (0..self.column_log_sizes.len()).collect();
        column_order.sort_by_key(|&c| self.column_log_sizes[c]);

        // Deduplicate positions, collapsing each column's values alongside.
        let mut unique_positions: Vec<usize> = Vec::with_capacity(query_positions.len());
        for &pos in query_positions {
            if unique_positions.last() != Some(&pos) {
                unique_positions.push(pos);
            }
        }
        let mut column_iters: Vec<std::vec::IntoIter<M31>> = column_order
            .iter()
            .map(|&c| {
                let mut dedup = Vec::with_capacity(unique_positions.len());
                for (i, &pos) in query_positions.iter().enumerate() {
                    if i == 0 || query_positions[i - 1] != pos {
                        if let Some(&v) = queried_values[c].get(i) {
                            dedup.push(v);
                        }
                    }
                }
                dedup.into_iter()
            })
            .collect();

        // Hash a row per queried position; every column advances one step
        // per query.
        let mut row = Vec::with_capacity(column_iters.len());
        let mut hashes: Vec<(usize, H::Hash)> = Vec::with_capacity(unique_positions.len());
        for &pos in &unique_positions {
            row.clear();
            for iter in &mut column_iters {
                match iter.next() {
                    Some(v) => row.push(v),
                    None => return Err(MerkleVerificationError::WitnessTooShort),
                }
            }
            let mut hasher = H::default_with_initial_state();
            hasher.update_leaf(&row);
            hashes.push((pos, hasher.finalize()));
        }
        if column_iters.iter_mut().any(|iter| iter.next().is_some()) {
            return Err(MerkleVerificationError::WitnessTooLong);
        }

        // Climb the tree, pairing siblings and consuming witness hashes on
        // whichever side the parity dictates.
        let n_layers = self
            .column_log_sizes
            .iter()
            .max()
            .copied()
            .unwrap_or_default();
        let mut witness = decommitment.hash_witness.iter();
        for _ in 0..n_layers {
            let mut next: Vec<(usize, H::Hash)> = Vec::with_capacity(hashes.len());
            let mut i = 0;
            while i < hashes.len() {
                let (pos, hash) = hashes[i];
                let parent = if i + 1 < hashes.len() && hashes[i + 1].0 == pos ^ 1 {
                    let combined = H::hash_children(&hash, &hashes[i + 1].1);
                    i += 2;
                    combined
                } else {
                    let sibling = match witness.next() {
                        Some(h) => *h,
                        None => return Err(MerkleVerificationError::WitnessTooShort),
                    };
                    i += 1;
                    if pos & 1 == 0 {
                        H::hash_children(&hash, &sibling)
                    } else {
                        H::hash_children(&sibling, &hash)
                    }
                };
                next.push((pos >> 1, parent));
            }
            hashes = next;
        }

        if witness.next().is_some() {
            return Err(MerkleVerificationError::WitnessTooLong);
        }
        match hashes.as_slice() {
            [(_, computed)] if *computed == self.root => Ok(()),
            _ => Err(MerkleVerificationError::RootMismatch),
        }
    }
}
