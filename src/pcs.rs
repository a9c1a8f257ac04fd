//! Polynomial commitment scheme over lifted Merkle trees
//!
//! Columns are interpolated, blown up onto the extended canonic domain and
//! committed in per-tree lifted Merkle trees. Openings at out-of-domain
//! points are proven through a per-row quotient column handed to FRI. Tree 0
//! is the preprocessed tree; its query positions are remapped from the
//! lifted positions.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::channel::{Blake2sChannel, Channel, MerkleChannel};
use crate::circle::{CanonicCoset, CirclePoint};
use crate::fields::FieldError;
use crate::fri::{
    FriConfig, FriDecommitmentError, FriProof, FriProver, FriProverError,
};
use crate::m31::M31;
use crate::merkle::{
    Blake2sHash, Blake2sMerkleHasher, MerkleDecommitmentLifted, MerkleTreeLifted,
    MerkleVerifierLifted,
};
use crate::poly::{
    evaluation_weights, CircleCoefficients, CircleEvaluation, PolyError, SecureEvaluation,
};
use crate::qm31::{SecureColumn, QM31};
use crate::quotients::{
    accumulate_row_quotients, column_samples_with_coeffs, group_sample_batches,
    quotient_constants, QuotientError,
};
use crate::treevec::TreeVec;
use crate::twiddles::{precompute_twiddles, TwiddleTree};
use crate::utils::bit_reverse_index;

/// Public parameters of the commitment scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcsConfig {
    pub pow_bits: u32,
    pub fri_config: FriConfig,
}

impl PcsConfig {
    pub fn security_bits(&self) -> u32 {
        self.pow_bits + self.fri_config.n_queries as u32 * self.fri_config.log_blowup_factor
    }

    /// Mixes the packed configuration into the channel at proof start.
    pub fn mix_into(&self, channel: &mut Blake2sChannel) {
        channel.mix_felts(&[QM31::from_u32_unchecked(
            self.pow_bits,
            self.fri_config.log_blowup_factor,
            self.fri_config.n_queries as u32,
            self.fri_config.log_last_layer_degree_bound,
        )]);
    }
}

/// Errors surfaced while producing a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvingError {
    ShapeMismatch,
    Poly(PolyError),
    Field(FieldError),
    Constraint(QuotientError),
    FriProver(FriProverError),
    FriDecommitment(FriDecommitmentError),
}

impl core::fmt::Display for ProvingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ShapeMismatch => write!(f, "input shape mismatch"),
            Self::Poly(e) => write!(f, "polynomial error: {e}"),
            Self::Field(e) => write!(f, "field error: {e}"),
            Self::Constraint(e) => write!(f, "constraint error: {e}"),
            Self::FriProver(e) => write!(f, "fri commit error: {e}"),
            Self::FriDecommitment(e) => write!(f, "fri decommit error: {e}"),
        }
    }
}

impl std::error::Error for ProvingError {}

impl From<PolyError> for ProvingError {
    fn from(e: PolyError) -> Self {
        Self::Poly(e)
    }
}

impl From<FieldError> for ProvingError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<QuotientError> for ProvingError {
    fn from(e: QuotientError) -> Self {
        Self::Constraint(e)
    }
}

impl From<FriProverError> for ProvingError {
    fn from(e: FriProverError) -> Self {
        Self::FriProver(e)
    }
}

impl From<FriDecommitmentError> for ProvingError {
    fn from(e: FriDecommitmentError) -> Self {
        Self::FriDecommitment(e)
    }
}

/// Remaps one lifted query position into the preprocessed tree.
pub fn preprocessed_position(position: usize, lifting_log_size: u32, pp_max_log_size: u32) -> usize {
    if lifting_log_size < pp_max_log_size {
        (position >> 1 << (pp_max_log_size - lifting_log_size + 1)) + (position & 1)
    } else {
        (position >> (lifting_log_size - pp_max_log_size + 1) << 1) + (position & 1)
    }
}

/// Remaps, sorts and deduplicates the lifted query positions for the
/// preprocessed tree. Empty when `pp_max_log_size` is zero.
pub fn preprocessed_query_positions(
    positions: &[usize],
    lifting_log_size: u32,
    pp_max_log_size: u32,
) -> Vec<usize> {
    if pp_max_log_size == 0 {
        return Vec::new();
    }
    let mut remapped: Vec<usize> = positions
        .iter()
        .map(|&p| preprocessed_position(p, lifting_log_size, pp_max_log_size))
        .collect();
    remapped.sort_unstable();
    remapped.dedup();
    remapped
}

/// The full proof of the commitment scheme.
#[derive(Clone, Debug)]
pub struct CommitmentSchemeProof {
    pub config: PcsConfig,
    pub commitments: TreeVec<Blake2sHash>,
    pub sampled_values: TreeVec<Vec<Vec<QM31>>>,
    pub decommitments: TreeVec<MerkleDecommitmentLifted<Blake2sMerkleHasher>>,
    pub queried_values: TreeVec<Vec<Vec<M31>>>,
    pub proof_of_work: u64,
    pub fri_proof: FriProof,
}

/// One committed tree on the prover side: the (optional) coefficient
/// columns, the extended-domain evaluations and their Merkle tree.
pub struct CommitmentTreeProver {
    pub log_size: u32,
    pub polynomials: Option<Vec<CircleCoefficients>>,
    pub evaluations: Vec<Vec<M31>>,
    pub merkle: MerkleTreeLifted<Blake2sMerkleHasher>,
    pub commitment: Blake2sHash,
}

impl CommitmentTreeProver {
    fn new(
        polys: Vec<CircleCoefficients>,
        extended_log_size: u32,
        store_coefficients: bool,
        twiddles: &TwiddleTree,
    ) -> Self {
        let domain = CanonicCoset::new(extended_log_size).circle_domain();
        let evaluations: Vec<Vec<M31>> = polys
            .iter()
            .map(|poly| poly.evaluate_with_twiddles(domain, twiddles).values)
            .collect();
        let columns: Vec<&[M31]> = evaluations.iter().map(|c| c.as_slice()).collect();
        let merkle = MerkleTreeLifted::build(&columns);
        let commitment = merkle.root();
        Self {
            log_size: extended_log_size,
            polynomials: store_coefficients.then_some(polys),
            evaluations,
            merkle,
            commitment,
        }
    }
}

/// Prover state: committed trees plus a per-session twiddle cache keyed by
/// extended domain log size.
pub struct CommitmentSchemeProver {
    pub config: PcsConfig,
    store_coefficients: bool,
    twiddle_cache: BTreeMap<u32, TwiddleTree>,
    pub trees: Vec<CommitmentTreeProver>,
}

impl CommitmentSchemeProver {
    pub fn new(config: PcsConfig) -> Self {
        Self {
            config,
            store_coefficients: true,
            twiddle_cache: BTreeMap::new(),
            trees: Vec::new(),
        }
    }

    /// A prover that discards coefficient columns after commitment; sampled
    /// values are then computed from the committed evaluations.
    pub fn without_stored_coefficients(config: PcsConfig) -> Self {
        Self {
            store_coefficients: false,
            ..Self::new(config)
        }
    }

    fn twiddles_for(&mut self, domain_log_size: u32) -> &TwiddleTree {
        self.twiddle_cache.entry(domain_log_size).or_insert_with(|| {
            precompute_twiddles(CanonicCoset::new(domain_log_size).circle_domain().half_coset)
        })
    }

    /// Commits a tree of coefficient polynomials (the fast path). All
    /// columns of one tree must share a log size.
    pub fn commit_polynomials(
        &mut self,
        polys: Vec<CircleCoefficients>,
        channel: &mut Blake2sChannel,
    ) -> Result<(), ProvingError> {
        if polys.is_empty() {
            return Err(ProvingError::ShapeMismatch);
        }
        let base_log_size = polys[0].log_size();
        if polys.iter().any(|p| p.log_size() != base_log_size) {
            return Err(ProvingError::ShapeMismatch);
        }
        if base_log_size == 0 || base_log_size + self.config.fri_config.log_blowup_factor > 30 {
            return Err(ProvingError::Poly(PolyError::InvalidLogSize));
        }
        let extended_log_size = base_log_size + self.config.fri_config.log_blowup_factor;
        let store = self.store_coefficients;
        let twiddles = self.twiddles_for(extended_log_size);
        let tree = CommitmentTreeProver::new(polys, extended_log_size, store, twiddles);
        tracing::debug!(
            tree_index = self.trees.len(),
            log_size = extended_log_size,
            "committed tree"
        );
        channel.mix_root(tree.commitment);
        self.trees.push(tree);
        Ok(())
    }

    /// Commits a tree of base-field evaluations on canonic domains,
    /// interpolating them first.
    pub fn commit_evaluations(
        &mut self,
        evaluations: Vec<CircleEvaluation>,
        channel: &mut Blake2sChannel,
    ) -> Result<(), ProvingError> {
        if evaluations.is_empty() {
            return Err(ProvingError::ShapeMismatch);
        }
        let base_log_size = evaluations[0].domain.log_size();
        if evaluations
            .iter()
            .any(|e| e.domain.log_size() != base_log_size || !e.domain.is_canonic())
        {
            return Err(ProvingError::ShapeMismatch);
        }
        if base_log_size == 0 || base_log_size + self.config.fri_config.log_blowup_factor > 30 {
            return Err(ProvingError::Poly(PolyError::InvalidLogSize));
        }
        let extended_log_size = base_log_size + self.config.fri_config.log_blowup_factor;
        let twiddles = self.twiddles_for(extended_log_size);
        let polys: Vec<CircleCoefficients> = evaluations
            .into_iter()
            .map(|evaluation| evaluation.interpolate_with_twiddles(twiddles))
            .collect();
        self.commit_polynomials(polys, channel)
    }

    /// Extended column log sizes, per tree per column.
    pub fn tree_log_sizes(&self) -> TreeVec<Vec<u32>> {
        TreeVec(
            self.trees
                .iter()
                .map(|tree| vec![tree.log_size; tree.evaluations.len()])
                .collect(),
        )
    }

    /// Proves the sampled values of every committed column at the requested
    /// out-of-domain points.
    pub fn prove_values(
        &mut self,
        sampled_points: TreeVec<Vec<Vec<CirclePoint<QM31>>>>,
        channel: &mut Blake2sChannel,
    ) -> Result<CommitmentSchemeProof, ProvingError> {
        if sampled_points.len() != self.trees.len() {
            return Err(ProvingError::ShapeMismatch);
        }
        for (points_tree, tree) in sampled_points.iter().zip(&self.trees) {
            if points_tree.len() != tree.evaluations.len() {
                return Err(ProvingError::ShapeMismatch);
            }
        }
        let lifting_log_size = self
            .trees
            .iter()
            .map(|t| t.log_size)
            .max()
            .ok_or(ProvingError::ShapeMismatch)?;
        // All trees after the preprocessed one live on the lifted domain.
        if self.trees[1..].iter().any(|t| t.log_size != lifting_log_size) {
            return Err(ProvingError::ShapeMismatch);
        }

        // Make sure the cache covers every committed size before the
        // immutable sampling phase below.
        let needed: BTreeSet<u32> = self.trees.iter().map(|t| t.log_size).collect();
        for log_size in needed {
            self.twiddles_for(log_size);
        }

        // Evaluate every column at its sample points. Weight vectors are
        // cached per (log size, point) for the duration of this call.
        let mut weight_cache: HashMap<(u32, [u32; 8]), Vec<QM31>> = HashMap::new();
        let mut sampled_values: TreeVec<Vec<Vec<QM31>>> = TreeVec(Vec::with_capacity(self.trees.len()));
        for (points_tree, tree) in sampled_points.iter().zip(&self.trees) {
            let mut tree_values = Vec::with_capacity(points_tree.len());
            for (column_index, points_column) in points_tree.iter().enumerate() {
                // Reject sampling at points that live on the base circle:
                // such points can collide with the committed domain.
                if points_column
                    .iter()
                    .any(|p| p.x.try_to_base().is_ok() && p.y.try_to_base().is_ok())
                {
                    return Err(ProvingError::Poly(PolyError::PointOnDomain));
                }
                let column_values = match &tree.polynomials {
                    Some(polys) => points_column
                        .iter()
                        .map(|&point| polys[column_index].eval_at_point(point))
                        .collect(),
                    None => {
                        let domain = CanonicCoset::new(tree.log_size).circle_domain();
                        let twiddles = &self.twiddle_cache[&tree.log_size];
                        points_column
                            .iter()
                            .map(|&point| {
                                let weights = weight_cache
                                    .entry((tree.log_size, point_fingerprint(point)))
                                    .or_insert_with(|| {
                                        evaluation_weights(domain, point, twiddles)
                                    });
                                dot_weights(weights, &tree.evaluations[column_index])
                            })
                            .collect()
                    }
                };
                tree_values.push(column_values);
            }
            sampled_values.push(tree_values);
        }

        channel.mix_felts(&sampled_values.clone().flatten().concat());
        let random_coeff = channel.draw_secure_felt();
        tracing::debug!(lifting_log_size, "sampled values mixed");

        // Batch the samples and precompute the quotient constants.
        let column_samples = column_samples_with_coeffs(
            &sampled_points,
            &sampled_values,
            &self.tree_log_sizes(),
            self.config.fri_config.log_blowup_factor,
            lifting_log_size,
            random_coeff,
        );
        let sample_batches = group_sample_batches(&column_samples);
        let constants = quotient_constants(&sample_batches)?;

        // Accumulate the quotient column over every row of the lifted
        // domain.
        let lifted_domain = CanonicCoset::new(lifting_log_size).circle_domain();
        let pp_max_log_size = self.trees[0].log_size;
        let size = lifted_domain.size();
        let mut quotient_column = SecureColumn::zeros(size);
        let mut row_values = Vec::new();
        for row in 0..size {
            row_values.clear();
            for (tree_index, tree) in self.trees.iter().enumerate() {
                let index = if tree_index == 0 {
                    preprocessed_position(row, lifting_log_size, pp_max_log_size)
                } else {
                    row
                };
                for column in &tree.evaluations {
                    row_values.push(column[index]);
                }
            }
            let domain_point = lifted_domain.at(bit_reverse_index(row, lifting_log_size));
            let value =
                accumulate_row_quotients(&sample_batches, &constants, &row_values, domain_point)?;
            quotient_column.set(row, value);
        }

        // FRI commit, proof of work, then query sampling inside the FRI
        // decommitment.
        let quotient_evaluation = SecureEvaluation::new(lifted_domain, quotient_column);
        let fri_prover = FriProver::commit(channel, self.config.fri_config, quotient_evaluation)?;
        let proof_of_work = channel.grind(self.config.pow_bits);
        channel.mix_u64(proof_of_work);
        let (fri_proof, unsorted_query_locations) = fri_prover.decommit(channel)?;

        let mut query_positions = unsorted_query_locations;
        query_positions.sort_unstable();
        query_positions.dedup();
        let pp_positions =
            preprocessed_query_positions(&query_positions, lifting_log_size, pp_max_log_size);

        let mut decommitments = TreeVec(Vec::with_capacity(self.trees.len()));
        let mut queried_values = TreeVec(Vec::with_capacity(self.trees.len()));
        for (tree_index, tree) in self.trees.iter().enumerate() {
            let positions: &[usize] = if tree_index == 0 {
                &pp_positions
            } else {
                &query_positions
            };
            decommitments.push(tree.merkle.decommit(positions));
            queried_values.push(
                tree.evaluations
                    .iter()
                    .map(|column| positions.iter().map(|&p| column[p]).collect())
                    .collect(),
            );
        }

        Ok(CommitmentSchemeProof {
            config: self.config,
            commitments: TreeVec(self.trees.iter().map(|t| t.commitment).collect()),
            sampled_values,
            decommitments,
            queried_values,
            proof_of_work,
            fri_proof,
        })
    }
}

fn point_fingerprint(point: CirclePoint<QM31>) -> [u32; 8] {
    let x = point.x.to_m31_array();
    let y = point.y.to_m31_array();
    [
        x[0].0, x[1].0, x[2].0, x[3].0, y[0].0, y[1].0, y[2].0, y[3].0,
    ]
}

fn dot_weights(weights: &[QM31], values: &[M31]) -> QM31 {
    weights
        .iter()
        .zip(values)
        .map(|(&w, &v)| w.mul_m31(v))
        .fold(QM31::ZERO, |acc, term| acc + term)
}

/// Verifier state: one Merkle verifier per committed tree, with column log
/// sizes already extended by the blowup factor.
pub struct CommitmentSchemeVerifier {
    pub config: PcsConfig,
    pub trees: Vec<MerkleVerifierLifted<Blake2sMerkleHasher>>,
}

impl CommitmentSchemeVerifier {
    pub fn new(config: PcsConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    /// Ingests one tree commitment: mixes the root and records the extended
    /// column log sizes.
    pub fn commit(
        &mut self,
        commitment: Blake2sHash,
        log_sizes: &[u32],
        channel: &mut Blake2sChannel,
    ) {
        let extended: Vec<u32> = log_sizes
            .iter()
            .map(|&log_size| log_size + self.config.fri_config.log_blowup_factor)
            .collect();
        channel.mix_root(commitment);
        self.trees
            .push(MerkleVerifierLifted::new(commitment, extended));
    }

    /// Extended column log sizes, per tree per column.
    pub fn tree_log_sizes(&self) -> TreeVec<Vec<u32>> {
        TreeVec(
            self.trees
                .iter()
                .map(|tree| tree.column_log_sizes.clone())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_bits() {
        let config = PcsConfig {
            pow_bits: 10,
            fri_config: FriConfig::new(1, 2, 7),
        };
        assert_eq!(config.security_bits(), 10 + 7 * 2);
    }

    #[test]
    fn test_preprocessed_remap_lifting_above() {
        // lifting 8, preprocessed 6: positions collapse pairs.
        let positions = [3usize, 7, 11, 15];
        let remapped: Vec<usize> = positions
            .iter()
            .map(|&p| preprocessed_position(p, 8, 6))
            .collect();
        assert_eq!(remapped, vec![1, 1, 3, 3]);
        assert_eq!(preprocessed_query_positions(&positions, 8, 6), vec![1, 3]);
    }

    #[test]
    fn test_preprocessed_remap_lifting_below() {
        // lifting 6, preprocessed 8: positions spread out.
        let positions = [3usize, 7, 11, 15];
        let remapped: Vec<usize> = positions
            .iter()
            .map(|&p| preprocessed_position(p, 6, 8))
            .collect();
        assert_eq!(remapped, vec![9, 25, 41, 57]);
    }

    #[test]
    fn test_preprocessed_remap_preserves_parity() {
        for &(lifting, pp) in &[(8u32, 6u32), (6, 8), (5, 5)] {
            for position in 0..32usize {
                let remapped = preprocessed_position(position, lifting, pp);
                assert_eq!(remapped & 1, position & 1);
            }
        }
    }

    #[test]
    fn test_preprocessed_empty_when_zero() {
        assert!(preprocessed_query_positions(&[1, 2, 3], 8, 0).is_empty());
    }

    #[test]
    fn test_commit_rejects_mixed_sizes() {
        let config = PcsConfig {
            pow_bits: 0,
            fri_config: FriConfig::new(0, 1, 3),
        };
        let mut scheme = CommitmentSchemeProver::new(config);
        let mut channel = Blake2sChannel::default();
        let polys = vec![
            CircleCoefficients::new(vec![M31::ONE; 8]),
            CircleCoefficients::new(vec![M31::ONE; 16]),
        ];
        assert_eq!(
            scheme.commit_polynomials(polys, &mut channel).err(),
            Some(ProvingError::ShapeMismatch)
        );
    }
}
