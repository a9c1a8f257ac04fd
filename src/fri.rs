//! FRI low-degree test
//!
//! The committed secure column is folded circle-to-line once, then
//! line-to-line until the evaluation fits the last-layer domain, where it is
//! interpolated into an explicit low-degree polynomial. Every layer is
//! Merkle-committed over its four coordinate columns; queries decommit whole
//! fold subsets so the verifier can replay the folds.

use crate::channel::{Blake2sChannel, Channel, MerkleChannel};
use crate::circle::{CanonicCoset, CircleDomain};
use crate::fields::Field;
use crate::line::{
    fold_line, LineDomain, LineEvaluation, LinePoly, CIRCLE_TO_LINE_FOLD_STEP, FOLD_STEP,
};
use crate::m31::M31;
use crate::merkle::{
    Blake2sHash, Blake2sMerkleHasher, MerkleDecommitmentLifted, MerkleTreeLifted,
    MerkleVerificationError, MerkleVerifierLifted,
};
use crate::poly::{ibutterfly_secure, SecureEvaluation};
use crate::qm31::{SecureColumn, QM31, SECURE_EXTENSION_DEGREE};
use crate::utils::bit_reverse_index;

/// FRI parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FriConfig {
    pub log_blowup_factor: u32,
    pub log_last_layer_degree_bound: u32,
    pub n_queries: usize,
}

impl FriConfig {
    pub fn new(log_last_layer_degree_bound: u32, log_blowup_factor: u32, n_queries: usize) -> Self {
        assert!(log_last_layer_degree_bound + log_blowup_factor <= 31);
        Self {
            log_blowup_factor,
            log_last_layer_degree_bound,
            n_queries,
        }
    }

    /// Folding stops once the line evaluation is at most this long.
    pub fn last_layer_domain_size(&self) -> usize {
        1 << (self.log_last_layer_degree_bound + self.log_blowup_factor)
    }
}

/// Degree bound of a committed circle polynomial, as a log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CirclePolyDegreeBound {
    pub log_degree_bound: u32,
}

/// Errors from the FRI commit phase on the prover side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriProverError {
    NotCanonicDomain,
    ShapeMismatch,
    InvalidLastLayerSize,
    InvalidLastLayerDegree,
}

impl core::fmt::Display for FriProverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotCanonicDomain => write!(f, "first layer domain is not canonic"),
            Self::ShapeMismatch => write!(f, "column length does not match the domain"),
            Self::InvalidLastLayerSize => write!(f, "column too short for the last layer"),
            Self::InvalidLastLayerDegree => write!(f, "last layer exceeds its degree bound"),
        }
    }
}

impl std::error::Error for FriProverError {}

/// Errors from the per-layer decommitment helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriDecommitmentError {
    QueryOutOfRange,
    FoldStepTooLarge,
}

impl core::fmt::Display for FriDecommitmentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::QueryOutOfRange => write!(f, "query position out of range"),
            Self::FoldStepTooLarge => write!(f, "fold step too large"),
        }
    }
}

impl std::error::Error for FriDecommitmentError {}

/// Errors from FRI verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriVerificationError {
    InvalidNumFriLayers,
    LastLayerDegreeInvalid,
    LastLayerEvaluationsInvalid,
    InnerLayerEvaluationsInvalid,
    InnerLayerCommitmentInvalid,
    Merkle(MerkleVerificationError),
}

impl core::fmt::Display for FriVerificationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidNumFriLayers => write!(f, "wrong number of FRI layers"),
            Self::LastLayerDegreeInvalid => write!(f, "last layer degree bound exceeded"),
            Self::LastLayerEvaluationsInvalid => write!(f, "last layer evaluation mismatch"),
            Self::InnerLayerEvaluationsInvalid => write!(f, "layer evaluations are inconsistent"),
            Self::InnerLayerCommitmentInvalid => write!(f, "layer commitment mismatch"),
            Self::Merkle(e) => write!(f, "merkle verification failed: {e}"),
        }
    }
}

impl std::error::Error for FriVerificationError {}

/// One committed layer in the proof: witness values for non-queried subset
/// positions, the Merkle witness and the layer root.
#[derive(Clone, Debug)]
pub struct FriLayerProof {
    pub fri_witness: Vec<QM31>,
    pub decommitment: MerkleDecommitmentLifted<Blake2sMerkleHasher>,
    pub commitment: Blake2sHash,
}

#[derive(Clone, Debug)]
pub struct FriProof {
    pub first_layer: FriLayerProof,
    pub inner_layers: Vec<FriLayerProof>,
    pub last_layer_poly: LinePoly,
}

fn commit_secure_column(values: &SecureColumn) -> MerkleTreeLifted<Blake2sMerkleHasher> {
    let columns: Vec<&[M31]> = values.columns.iter().map(|c| c.as_slice()).collect();
    MerkleTreeLifted::build(&columns)
}

struct FriFirstLayerProver {
    evaluation: SecureEvaluation,
    merkle: MerkleTreeLifted<Blake2sMerkleHasher>,
    commitment: Blake2sHash,
}

impl FriFirstLayerProver {
    fn new(evaluation: SecureEvaluation) -> Self {
        let merkle = commit_secure_column(&evaluation.values);
        let commitment = merkle.root();
        Self {
            evaluation,
            merkle,
            commitment,
        }
    }
}

struct FriInnerLayerProver {
    evaluation: LineEvaluation,
    merkle: MerkleTreeLifted<Blake2sMerkleHasher>,
    commitment: Blake2sHash,
}

impl FriInnerLayerProver {
    fn new(evaluation: LineEvaluation) -> Self {
        let merkle = commit_secure_column(&evaluation.values);
        let commitment = merkle.root();
        Self {
            evaluation,
            merkle,
            commitment,
        }
    }
}

/// FRI prover state between the commit and decommit phases.
pub struct FriProver {
    config: FriConfig,
    first_layer: FriFirstLayerProver,
    inner_layers: Vec<FriInnerLayerProver>,
    last_layer_poly: LinePoly,
}

impl FriProver {
    /// Commits all layers: Merkle root per layer mixed into the channel, a
    /// folding alpha drawn after each, and finally the last-layer polynomial
    /// coefficients.
    pub fn commit(
        channel: &mut Blake2sChannel,
        config: FriConfig,
        evaluation: SecureEvaluation,
    ) -> Result<Self, FriProverError> {
        if !evaluation.domain.is_canonic() {
            return Err(FriProverError::NotCanonicDomain);
        }
        if evaluation.len() != evaluation.domain.size() {
            return Err(FriProverError::ShapeMismatch);
        }
        let last_layer_domain_size = config.last_layer_domain_size();
        if evaluation.len() >> CIRCLE_TO_LINE_FOLD_STEP < last_layer_domain_size {
            return Err(FriProverError::InvalidLastLayerSize);
        }

        let first_layer = FriFirstLayerProver::new(evaluation);
        channel.mix_root(first_layer.commitment);
        let mut alpha = channel.draw_secure_felt();

        let mut line_evaluation =
            LineEvaluation::zeros(LineDomain::new(first_layer.evaluation.domain.half_coset));
        crate::line::fold_circle_into_line(&mut line_evaluation, &first_layer.evaluation, alpha);

        let mut inner_layers = Vec::new();
        while line_evaluation.len() > last_layer_domain_size {
            let layer = FriInnerLayerProver::new(line_evaluation);
            channel.mix_root(layer.commitment);
            alpha = channel.draw_secure_felt();
            line_evaluation = fold_line(&layer.evaluation, alpha);
            inner_layers.push(layer);
        }

        let mut last_layer_poly = line_evaluation.interpolate();
        let degree_bound = 1usize << config.log_last_layer_degree_bound;
        if last_layer_poly.coefficients()[degree_bound..]
            .iter()
            .any(|c| *c != QM31::ZERO)
        {
            return Err(FriProverError::InvalidLastLayerDegree);
        }
        last_layer_poly.truncate(degree_bound);
        channel.mix_felts(last_layer_poly.coefficients());

        Ok(Self {
            config,
            first_layer,
            inner_layers,
            last_layer_poly,
        })
    }

    /// Draws query positions and produces every layer's decommitment.
    /// Returns the proof together with the unsorted query locations as
    /// drawn.
    pub fn decommit(
        self,
        channel: &mut Blake2sChannel,
    ) -> Result<(FriProof, Vec<usize>), FriDecommitmentError> {
        let first_layer_log_size = self.first_layer.evaluation.domain.log_size();
        let unsorted_query_locations = channel.draw_queries(self.config.n_queries, first_layer_log_size);
        let mut positions = unsorted_query_locations.clone();
        positions.sort_unstable();
        positions.dedup();

        let (fri_witness, decommitment) = layer_decommitment(
            &self.first_layer.merkle,
            &self.first_layer.evaluation.values,
            &positions,
            CIRCLE_TO_LINE_FOLD_STEP,
        )?;
        let first_layer = FriLayerProof {
            fri_witness,
            decommitment,
            commitment: self.first_layer.commitment,
        };
        positions = fold_positions(&positions, CIRCLE_TO_LINE_FOLD_STEP);

        let mut inner_layers = Vec::with_capacity(self.inner_layers.len());
        for layer in &self.inner_layers {
            let (fri_witness, decommitment) = layer_decommitment(
                &layer.merkle,
                &layer.evaluation.values,
                &positions,
                FOLD_STEP,
            )?;
            inner_layers.push(FriLayerProof {
                fri_witness,
                decommitment,
                commitment: layer.commitment,
            });
            positions = fold_positions(&positions, FOLD_STEP);
        }

        Ok((
            FriProof {
                first_layer,
                inner_layers,
                last_layer_poly: self.last_layer_poly,
            },
            unsorted_query_locations,
        ))
    }
}

/// Maps sorted queries to the next layer: one query per fold subset.
pub fn fold_positions(positions: &[usize], fold_step: u32) -> Vec<usize> {
    let mut folded: Vec<usize> = positions.iter().map(|&p| p >> fold_step).collect();
    folded.dedup();
    folded
}

/// Decommits one layer for sorted, unique queries.
///
/// Queries are grouped into `2^fold_step`-sized subsets; every subset
/// position is decommitted and values at non-queried positions are emitted
/// as witness values, in position order.
fn layer_decommitment(
    merkle: &MerkleTreeLifted<Blake2sMerkleHasher>,
    values: &SecureColumn,
    queries: &[usize],
    fold_step: u32,
) -> Result<(Vec<QM31>, MerkleDecommitmentLifted<Blake2sMerkleHasher>), FriDecommitmentError> {
    if fold_step >= usize::BITS {
        return Err(FriDecommitmentError::FoldStepTooLarge);
    }
    if queries.iter().any(|&q| q >= values.len()) {
        return Err(FriDecommitmentError::QueryOutOfRange);
    }

    let mut decommit_positions = Vec::new();
    let mut fri_witness = Vec::new();
    let mut i = 0;
    while i < queries.len() {
        let subset_key = queries[i] >> fold_step;
        let subset_start = subset_key << fold_step;
        let subset_end = subset_start + (1 << fold_step);
        let mut subset_queries = Vec::with_capacity(1 << fold_step);
        while i < queries.len() && queries[i] >> fold_step == subset_key {
            subset_queries.push(queries[i]);
            i += 1;
        }
        for position in subset_start..subset_end {
            decommit_positions.push(position);
            if !subset_queries.contains(&position) {
                fri_witness.push(values.at(position));
            }
        }
    }

    let decommitment = merkle.decommit(&decommit_positions);
    Ok((fri_witness, decommitment))
}

struct FriFirstLayerVerifier {
    domain: CircleDomain,
    folding_alpha: QM31,
    proof: FriLayerProof,
}

struct FriInnerLayerVerifier {
    domain: LineDomain,
    folding_alpha: QM31,
    proof: FriLayerProof,
}

/// FRI verifier state.
pub struct FriVerifier {
    config: FriConfig,
    first_layer: FriFirstLayerVerifier,
    inner_layers: Vec<FriInnerLayerVerifier>,
    last_layer_domain: LineDomain,
    last_layer_poly: LinePoly,
    query_positions: Option<Vec<usize>>,
}

impl FriVerifier {
    /// Replays the commit-phase transcript and deep-clones the proof layers
    /// into verifier-owned storage.
    pub fn commit(
        channel: &mut Blake2sChannel,
        config: FriConfig,
        proof: &FriProof,
        column_bound: CirclePolyDegreeBound,
    ) -> Result<Self, FriVerificationError> {
        let Some(mut line_degree_bound) = column_bound
            .log_degree_bound
            .checked_sub(CIRCLE_TO_LINE_FOLD_STEP)
        else {
            return Err(FriVerificationError::InvalidNumFriLayers);
        };

        let first_layer_domain =
            CanonicCoset::new(column_bound.log_degree_bound + config.log_blowup_factor)
                .circle_domain();
        channel.mix_root(proof.first_layer.commitment);
        let first_layer = FriFirstLayerVerifier {
            domain: first_layer_domain,
            folding_alpha: channel.draw_secure_felt(),
            proof: proof.first_layer.clone(),
        };

        let mut line_domain = LineDomain::new(first_layer_domain.half_coset);
        let mut inner_layers = Vec::new();
        while line_degree_bound > config.log_last_layer_degree_bound {
            let layer_proof = proof
                .inner_layers
                .get(inner_layers.len())
                .ok_or(FriVerificationError::InvalidNumFriLayers)?;
            channel.mix_root(layer_proof.commitment);
            inner_layers.push(FriInnerLayerVerifier {
                domain: line_domain,
                folding_alpha: channel.draw_secure_felt(),
                proof: layer_proof.clone(),
            });
            line_domain = line_domain.double();
            line_degree_bound -= FOLD_STEP;
        }
        if proof.inner_layers.len() != inner_layers.len() {
            return Err(FriVerificationError::InvalidNumFriLayers);
        }

        let last_layer_poly = proof.last_layer_poly.clone();
        if last_layer_poly.len() > 1 << config.log_last_layer_degree_bound {
            return Err(FriVerificationError::LastLayerDegreeInvalid);
        }
        channel.mix_felts(last_layer_poly.coefficients());

        Ok(Self {
            config,
            first_layer,
            inner_layers,
            last_layer_domain: line_domain,
            last_layer_poly,
            query_positions: None,
        })
    }

    /// Draws the query positions in the first-layer domain; returns them
    /// sorted and deduplicated.
    pub fn sample_query_positions(&mut self, channel: &mut Blake2sChannel) -> Vec<usize> {
        let mut positions =
            channel.draw_queries(self.config.n_queries, self.first_layer.domain.log_size());
        positions.sort_unstable();
        positions.dedup();
        self.query_positions = Some(positions.clone());
        positions
    }

    /// Checks every layer against the expected first-layer answers and the
    /// last-layer polynomial.
    pub fn decommit(self, first_layer_answers: &[QM31]) -> Result<(), FriVerificationError> {
        let positions = self
            .query_positions
            .as_ref()
            .expect("query positions must be sampled before decommit");
        if first_layer_answers.len() != positions.len() {
            return Err(FriVerificationError::InnerLayerEvaluationsInvalid);
        }

        // First layer: reconstruct subset values from the answers and the
        // witness, verify the commitment and fold into the line domain.
        let first_domain = self.first_layer.domain;
        let queried: Vec<(usize, QM31)> = positions
            .iter()
            .copied()
            .zip(first_layer_answers.iter().copied())
            .collect();
        let (decommit_positions, subset_values, mut current) = reconstruct_and_fold(
            &queried,
            &self.first_layer.proof.fri_witness,
            CIRCLE_TO_LINE_FOLD_STEP,
            |subset_start, pair| {
                let p = first_domain.at(bit_reverse_index(
                    subset_start,
                    first_domain.log_size(),
                ));
                let (mut f0, mut f1) = (pair[0], pair[1]);
                ibutterfly_secure(&mut f0, &mut f1, p.y.inverse());
                f0 + self.first_layer.folding_alpha * f1
            },
        )?;
        verify_layer_merkle(
            self.first_layer.proof.commitment,
            first_domain.log_size(),
            &decommit_positions,
            &subset_values,
            &self.first_layer.proof.decommitment,
        )?;

        // Inner layers.
        for layer in &self.inner_layers {
            let domain = layer.domain;
            let (decommit_positions, subset_values, next) = reconstruct_and_fold(
                &current,
                &layer.proof.fri_witness,
                FOLD_STEP,
                |subset_start, pair| {
                    let x = domain.at(bit_reverse_index(subset_start, domain.log_size()));
                    let (mut f0, mut f1) = (pair[0], pair[1]);
                    ibutterfly_secure(&mut f0, &mut f1, x.inverse());
                    f0 + layer.folding_alpha * f1
                },
            )?;
            verify_layer_merkle(
                layer.proof.commitment,
                domain.log_size(),
                &decommit_positions,
                &subset_values,
                &layer.proof.decommitment,
            )?;
            current = next;
        }

        // Last layer: the surviving values must match the committed
        // polynomial.
        for (position, value) in current {
            let x = self
                .last_layer_domain
                .at(bit_reverse_index(position, self.last_layer_domain.log_size()));
            if self.last_layer_poly.eval_at_point(QM31::from(x)) != value {
                return Err(FriVerificationError::LastLayerEvaluationsInvalid);
            }
        }

        Ok(())
    }
}

/// Rebuilds the full subset values of one layer from the expected values at
/// queried positions plus the witness, and folds each subset. Returns the
/// decommitment positions, the values at those positions and the
/// `(position, value)` pairs for the next layer.
fn reconstruct_and_fold(
    queried: &[(usize, QM31)],
    fri_witness: &[QM31],
    fold_step: u32,
    fold_subset: impl Fn(usize, &[QM31]) -> QM31,
) -> Result<(Vec<usize>, Vec<QM31>, Vec<(usize, QM31)>), FriVerificationError> {
    let mut witness_iter = fri_witness.iter().copied();
    let mut decommit_positions = Vec::new();
    let mut subset_values = Vec::new();
    let mut folded = Vec::new();

    let mut i = 0;
    while i < queried.len() {
        let subset_key = queried[i].0 >> fold_step;
        let subset_start = subset_key << fold_step;
        let subset_end = subset_start + (1 << fold_step);
        let mut subset_queried = Vec::with_capacity(1 << fold_step);
        while i < queried.len() && queried[i].0 >> fold_step == subset_key {
            subset_queried.push(queried[i]);
            i += 1;
        }

        let mut pair = Vec::with_capacity(1 << fold_step);
        for position in subset_start..subset_end {
            let value = match subset_queried.iter().find(|(p, _)| *p == position) {
                Some((_, v)) => *v,
                None => witness_iter
                    .next()
                    .ok_or(FriVerificationError::InnerLayerEvaluationsInvalid)?,
            };
            decommit_positions.push(position);
            subset_values.push(value);
            pair.push(value);
        }
        folded.push((subset_key, fold_subset(subset_start, &pair)));
    }

    if witness_iter.next().is_some() {
        return Err(FriVerificationError::InnerLayerEvaluationsInvalid);
    }
    Ok((decommit_positions, subset_values, folded))
}

/// Verifies a layer's Merkle decommitment over the four coordinate columns.
fn verify_layer_merkle(
    commitment: Blake2sHash,
    column_log_size: u32,
    positions: &[usize],
    values: &[QM31],
    decommitment: &MerkleDecommitmentLifted<Blake2sMerkleHasher>,
) -> Result<(), FriVerificationError> {
    let mut columns: Vec<Vec<M31>> =
        vec![Vec::with_capacity(values.len()); SECURE_EXTENSION_DEGREE];
    for value in values {
        for (column, coord) in columns.iter_mut().zip(value.to_m31_array()) {
            column.push(coord);
        }
    }
    let verifier = MerkleVerifierLifted::<Blake2sMerkleHasher>::new(
        commitment,
        vec![column_log_size; SECURE_EXTENSION_DEGREE],
    );
    verifier
        .verify(positions, &columns, decommitment)
        .map_err(|e| match e {
            MerkleVerificationError::RootMismatch => {
                FriVerificationError::InnerLayerCommitmentInvalid
            }
            other => FriVerificationError::Merkle(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_evaluation(log_size: u32, value: QM31) -> SecureEvaluation {
        let domain = CanonicCoset::new(log_size).circle_domain();
        let values: SecureColumn = (0..domain.size()).map(|_| value).collect();
        SecureEvaluation::new(domain, values)
    }

    fn low_degree_evaluation(log_size: u32, log_degree: u32) -> SecureEvaluation {
        // Evaluate a base polynomial of degree bound 2^log_degree on the
        // blown-up domain and lift it to the secure field.
        let poly = crate::poly::CircleCoefficients::new(
            (0..(1u32 << log_degree)).map(|i| M31::new(i * 7 + 3)).collect(),
        );
        let domain = CanonicCoset::new(log_size).circle_domain();
        let evals = poly.evaluate(domain);
        let values: SecureColumn = evals.values.iter().map(|&v| QM31::from(v)).collect();
        SecureEvaluation::new(domain, values)
    }

    fn roundtrip(config: FriConfig, evaluation: SecureEvaluation) -> Result<(), FriVerificationError> {
        let log_size = evaluation.domain.log_size();
        let bound = CirclePolyDegreeBound {
            log_degree_bound: log_size - config.log_blowup_factor,
        };

        let mut prover_channel = Blake2sChannel::default();
        let prover =
            FriProver::commit(&mut prover_channel, config, evaluation.clone()).expect("commit");
        let answers_source = evaluation;
        let (proof, _unsorted) = prover.decommit(&mut prover_channel).expect("decommit");

        let mut verifier_channel = Blake2sChannel::default();
        let mut verifier =
            FriVerifier::commit(&mut verifier_channel, config, &proof, bound)?;
        let positions = verifier.sample_query_positions(&mut verifier_channel);
        let answers: Vec<QM31> = positions
            .iter()
            .map(|&p| answers_source.values.at(p))
            .collect();
        verifier.decommit(&answers)
    }

    #[test]
    fn test_constant_column_roundtrip() {
        // log_blowup 1, last layer bound 0, 4 queries over a size-8 column.
        let config = FriConfig::new(0, 1, 4);
        let value = QM31::from_u32_unchecked(7, 0, 0, 0);
        assert!(roundtrip(config, constant_evaluation(3, value)).is_ok());
    }

    #[test]
    fn test_low_degree_roundtrip() {
        let config = FriConfig::new(1, 2, 5);
        assert!(roundtrip(config, low_degree_evaluation(7, 5)).is_ok());
    }

    #[test]
    fn test_high_degree_fails_commit() {
        // A full-degree column cannot satisfy the last layer bound.
        let config = FriConfig::new(0, 1, 3);
        let evaluation = low_degree_evaluation(4, 4);
        let mut channel = Blake2sChannel::default();
        assert_eq!(
            FriProver::commit(&mut channel, config, evaluation).err(),
            Some(FriProverError::InvalidLastLayerDegree)
        );
    }

    #[test]
    fn test_non_canonic_domain_rejected() {
        let domain = CircleDomain::new(crate::circle::Coset::subgroup(3));
        let values: SecureColumn = (0..domain.size()).map(|_| QM31::ONE).collect();
        let evaluation = SecureEvaluation::new(domain, values);
        let mut channel = Blake2sChannel::default();
        assert_eq!(
            FriProver::commit(&mut channel, FriConfig::new(0, 1, 3), evaluation).err(),
            Some(FriProverError::NotCanonicDomain)
        );
    }

    #[test]
    fn test_tampered_answer_fails() {
        let config = FriConfig::new(1, 1, 4);
        let evaluation = low_degree_evaluation(6, 5);

        let mut prover_channel = Blake2sChannel::default();
        let prover = FriProver::commit(&mut prover_channel, config, evaluation.clone()).unwrap();
        let (proof, _) = prover.decommit(&mut prover_channel).unwrap();

        let bound = CirclePolyDegreeBound { log_degree_bound: 5 };
        let mut verifier_channel = Blake2sChannel::default();
        let mut verifier =
            FriVerifier::commit(&mut verifier_channel, config, &proof, bound).unwrap();
        let positions = verifier.sample_query_positions(&mut verifier_channel);
        let mut answers: Vec<QM31> = positions
            .iter()
            .map(|&p| evaluation.values.at(p))
            .collect();
        answers[0] += QM31::ONE;
        assert!(verifier.decommit(&answers).is_err());
    }

    #[test]
    fn test_wrong_layer_count_rejected() {
        let config = FriConfig::new(1, 1, 4);
        let evaluation = low_degree_evaluation(6, 5);
        let mut prover_channel = Blake2sChannel::default();
        let prover = FriProver::commit(&mut prover_channel, config, evaluation).unwrap();
        let (mut proof, _) = prover.decommit(&mut prover_channel).unwrap();
        proof.inner_layers.pop();

        let bound = CirclePolyDegreeBound { log_degree_bound: 5 };
        let mut verifier_channel = Blake2sChannel::default();
        assert_eq!(
            FriVerifier::commit(&mut verifier_channel, config, &proof, bound).err(),
            Some(FriVerificationError::InvalidNumFriLayers)
        );
    }

    #[test]
    fn test_fold_positions() {
        assert_eq!(fold_positions(&[0, 1, 4, 5, 6], 1), vec![0, 2, 3]);
    }

    #[test]
    fn test_layer_decommitment_errors() {
        let evaluation = constant_evaluation(3, QM31::ONE);
        let merkle = commit_secure_column(&evaluation.values);
        assert_eq!(
            layer_decommitment(&merkle, &evaluation.values, &[100], 1).err(),
            Some(FriDecommitmentError::QueryOutOfRange)
        );
        assert_eq!(
            layer_decommitment(&merkle, &evaluation.values, &[0], usize::BITS).err(),
            Some(FriDecommitmentError::FoldStepTooLarge)
        );
    }
}
