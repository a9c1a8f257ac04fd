//! Proof verification
//!
//! The verifier replays the prover's transcript mix-for-mix, checks the
//! out-of-domain sampled values against the component constraints, and
//! delegates consistency of the committed columns to the Merkle and FRI
//! verifiers.

use crate::air::{Component, Components};
use crate::channel::{Blake2sChannel, Channel};
use crate::circle::CanonicCoset;
use crate::fields::FieldError;
use crate::fri::{CirclePolyDegreeBound, FriVerificationError, FriVerifier};
use crate::m31::M31;
use crate::merkle::MerkleVerificationError;
use crate::pcs::{preprocessed_query_positions, CommitmentSchemeProof, CommitmentSchemeVerifier};
use crate::prover::{draw_oods_point, StarkProof};
use crate::qm31::{QM31, SECURE_EXTENSION_DEGREE};
use crate::quotients::{
    column_samples_with_coeffs, fri_answers, group_sample_batches, quotient_constants,
    QuotientError,
};
use crate::treevec::TreeVec;

/// Errors surfaced while verifying a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The composition evaluation reconstructed from the sampled values does
    /// not match the constraints.
    OodsNotMatching,
    /// The proof structure disagrees with the statement.
    InvalidStructure(String),
    /// A size or count does not line up.
    ShapeMismatch,
    /// No trees were committed.
    EmptyTrees,
    /// No column was sampled anywhere.
    EmptySampledSet,
    /// The proof-of-work nonce does not satisfy the required difficulty.
    ProofOfWork,
    Merkle(MerkleVerificationError),
    Fri(FriVerificationError),
    Constraint(QuotientError),
    Field(FieldError),
}

impl core::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OodsNotMatching => write!(f, "oods values do not match the constraints"),
            Self::InvalidStructure(msg) => write!(f, "invalid proof structure: {msg}"),
            Self::ShapeMismatch => write!(f, "shape mismatch"),
            Self::EmptyTrees => write!(f, "no committed trees"),
            Self::EmptySampledSet => write!(f, "no sampled values"),
            Self::ProofOfWork => write!(f, "proof of work verification failed"),
            Self::Merkle(e) => write!(f, "merkle verification failed: {e}"),
            Self::Fri(e) => write!(f, "fri verification failed: {e}"),
            Self::Constraint(e) => write!(f, "constraint error: {e}"),
            Self::Field(e) => write!(f, "field error: {e}"),
        }
    }
}

impl std::error::Error for VerificationError {}

impl From<MerkleVerificationError> for VerificationError {
    fn from(e: MerkleVerificationError) -> Self {
        Self::Merkle(e)
    }
}

impl From<FriVerificationError> for VerificationError {
    fn from(e: FriVerificationError) -> Self {
        Self::Fri(e)
    }
}

impl From<QuotientError> for VerificationError {
    fn from(e: QuotientError) -> Self {
        Self::Constraint(e)
    }
}

impl From<FieldError> for VerificationError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

/// Verifies a STARK proof against the committed trees and components.
///
/// The channel must have observed the same mixings as the prover's channel
/// up to this call: configuration, per-tree commitments and component
/// statements, in that order.
pub fn verify(
    components: &[&dyn Component],
    channel: &mut Blake2sChannel,
    commitment_scheme: &mut CommitmentSchemeVerifier,
    proof: StarkProof,
) -> Result<(), VerificationError> {
    let components = Components(components.to_vec());
    let random_coeff = channel.draw_secure_felt();
    let composition_log_degree_bound = components.composition_log_degree_bound();

    // The committed trees must match the components' declared trace shape.
    let declared = components
        .trace_log_degree_bounds()
        .map_err(|_| VerificationError::InvalidStructure("trace shape".into()))?;
    if declared.len() != commitment_scheme.trees.len() {
        return Err(VerificationError::InvalidStructure(
            "tree count does not match the components".into(),
        ));
    }
    let blowup = commitment_scheme.config.fri_config.log_blowup_factor;
    for (columns, tree) in declared.iter().zip(&commitment_scheme.trees) {
        if columns.len() != tree.column_log_sizes.len() {
            return Err(VerificationError::InvalidStructure(
                "column count does not match the components".into(),
            ));
        }
        for (&declared_log, &committed_log) in columns.iter().zip(&tree.column_log_sizes) {
            if declared_log + blowup != committed_log {
                return Err(VerificationError::InvalidStructure(
                    "column log size does not match the components".into(),
                ));
            }
        }
    }
    let n_preprocessed = commitment_scheme
        .trees
        .first()
        .map(|t| t.column_log_sizes.len())
        .unwrap_or(0);
    for component in &components.0 {
        if component
            .preprocessed_column_indices()
            .iter()
            .any(|&i| i >= n_preprocessed)
        {
            return Err(VerificationError::InvalidStructure(
                "preprocessed column index out of range".into(),
            ));
        }
    }

    if proof.0.commitments.len() != commitment_scheme.trees.len() + 1 {
        return Err(VerificationError::InvalidStructure(
            "wrong number of commitments".into(),
        ));
    }
    commitment_scheme.commit(
        *proof.0.commitments.last().unwrap(),
        &vec![composition_log_degree_bound; SECURE_EXTENSION_DEGREE],
        channel,
    );

    let oods_point = draw_oods_point(channel);
    let lifting_log_size = commitment_scheme
        .tree_log_sizes()
        .flatten()
        .into_iter()
        .max()
        .unwrap_or(0);

    let mut sample_points = components
        .mask_points(oods_point, lifting_log_size)
        .map_err(|_| VerificationError::InvalidStructure("mask shape".into()))?;
    sample_points
        .0
        .push(vec![vec![oods_point]; SECURE_EXTENSION_DEGREE]);

    // Reconstruct the composition evaluation from its coordinate samples and
    // compare with the constraint evaluation.
    let sampled = &proof.0.sampled_values;
    let composition_columns = sampled
        .last()
        .ok_or_else(|| VerificationError::InvalidStructure("missing composition tree".into()))?;
    if composition_columns.len() != SECURE_EXTENSION_DEGREE
        || composition_columns.iter().any(|c| c.len() != 1)
    {
        return Err(VerificationError::InvalidStructure(
            "composition tree shape".into(),
        ));
    }
    let composition_oods_eval =
        QM31::from_partial_evals(core::array::from_fn(|k| composition_columns[k][0]));
    let mask_values = TreeVec(sampled.0[..sampled.len() - 1].to_vec());
    if composition_oods_eval
        != components.eval_composition_polynomial_at_point(
            oods_point,
            &mask_values,
            random_coeff,
            lifting_log_size,
        )
    {
        return Err(VerificationError::OodsNotMatching);
    }

    commitment_scheme.verify_values(sample_points, proof.0, channel)
}

impl CommitmentSchemeVerifier {
    /// Verifies the opened values of every committed column: transcript
    /// replay, proof of work, per-tree Merkle checks and the FRI low-degree
    /// test over the reconstructed quotient answers.
    pub fn verify_values(
        &self,
        sampled_points: TreeVec<Vec<Vec<crate::circle::CirclePoint<QM31>>>>,
        proof: CommitmentSchemeProof,
        channel: &mut Blake2sChannel,
    ) -> Result<(), VerificationError> {
        if self.trees.is_empty() {
            return Err(VerificationError::EmptyTrees);
        }
        if sampled_points.len() != self.trees.len()
            || proof.sampled_values.len() != self.trees.len()
            || proof.commitments.len() != self.trees.len()
            || proof.decommitments.len() != self.trees.len()
            || proof.queried_values.len() != self.trees.len()
        {
            return Err(VerificationError::InvalidStructure(
                "tree count mismatch".into(),
            ));
        }
        for ((tree, points_tree), values_tree) in self
            .trees
            .iter()
            .zip(&sampled_points.0)
            .zip(&proof.sampled_values.0)
        {
            if points_tree.len() != tree.column_log_sizes.len()
                || values_tree.len() != tree.column_log_sizes.len()
            {
                return Err(VerificationError::InvalidStructure(
                    "column count mismatch".into(),
                ));
            }
            for (points_column, values_column) in points_tree.iter().zip(values_tree) {
                if points_column.len() != values_column.len() {
                    return Err(VerificationError::InvalidStructure(
                        "sample count mismatch".into(),
                    ));
                }
            }
        }
        for (tree, &commitment) in self.trees.iter().zip(&proof.commitments.0) {
            if tree.root != commitment {
                return Err(VerificationError::InvalidStructure(
                    "commitment mismatch".into(),
                ));
            }
        }
        if sampled_points.iter().flatten().all(|points| points.is_empty()) {
            return Err(VerificationError::EmptySampledSet);
        }

        channel.mix_felts(&proof.sampled_values.clone().flatten().concat());
        let random_coeff = channel.draw_secure_felt();

        let tree_log_sizes = self.tree_log_sizes();
        let lifting_log_size = tree_log_sizes
            .clone()
            .flatten()
            .into_iter()
            .max()
            .unwrap_or(0);
        let blowup = self.config.fri_config.log_blowup_factor;
        if lifting_log_size < blowup {
            return Err(VerificationError::ShapeMismatch);
        }
        for tree in &self.trees[1..] {
            if tree.column_log_sizes.iter().any(|&l| l != lifting_log_size) {
                return Err(VerificationError::ShapeMismatch);
            }
        }

        let mut fri_verifier = FriVerifier::commit(
            channel,
            self.config.fri_config,
            &proof.fri_proof,
            CirclePolyDegreeBound {
                log_degree_bound: lifting_log_size - blowup,
            },
        )?;

        if !channel.verify_pow_nonce(self.config.pow_bits, proof.proof_of_work) {
            return Err(VerificationError::ProofOfWork);
        }
        channel.mix_u64(proof.proof_of_work);

        let query_positions = fri_verifier.sample_query_positions(channel);
        let pp_max_log_size = self.trees[0]
            .column_log_sizes
            .iter()
            .max()
            .copied()
            .unwrap_or(0);
        let pp_positions =
            preprocessed_query_positions(&query_positions, lifting_log_size, pp_max_log_size);

        // Per-tree Merkle verification of the queried values. Every column
        // must hold exactly one value per queried position.
        for (tree_index, ((tree, values_tree), decommitment)) in self
            .trees
            .iter()
            .zip(&proof.queried_values.0)
            .zip(&proof.decommitments.0)
            .enumerate()
        {
            let positions: &[usize] = if tree_index == 0 {
                &pp_positions
            } else {
                &query_positions
            };
            if values_tree.len() != tree.column_log_sizes.len()
                || values_tree.iter().any(|column| column.len() != positions.len())
            {
                return Err(VerificationError::InvalidStructure(
                    "queried value shape mismatch".into(),
                ));
            }
            if tree_index == 0 && positions.is_empty() {
                continue;
            }
            tree.verify(positions, values_tree, decommitment)?;
        }

        // Reconstruct the first-layer FRI answers from the queried rows.
        let column_samples = column_samples_with_coeffs(
            &sampled_points,
            &proof.sampled_values,
            &tree_log_sizes,
            blowup,
            lifting_log_size,
            random_coeff,
        );
        let sample_batches = group_sample_batches(&column_samples);
        let constants = quotient_constants(&sample_batches)?;

        let mut queried_rows: Vec<Vec<M31>> = Vec::with_capacity(query_positions.len());
        for (row_index, &position) in query_positions.iter().enumerate() {
            let mut row = Vec::new();
            for (tree_index, (tree, values_tree)) in self
                .trees
                .iter()
                .zip(&proof.queried_values.0)
                .enumerate()
            {
                let value_index = if tree_index == 0 {
                    if pp_max_log_size == 0 {
                        // Conservative empty preprocessed query set.
                        for _ in &tree.column_log_sizes {
                            row.push(M31::ZERO);
                        }
                        continue;
                    }
                    let remapped = crate::pcs::preprocessed_position(
                        position,
                        lifting_log_size,
                        pp_max_log_size,
                    );
                    pp_positions.binary_search(&remapped).map_err(|_| {
                        VerificationError::InvalidStructure("missing remapped query".into())
                    })?
                } else {
                    row_index
                };
                for column in values_tree {
                    let value = column.get(value_index).copied().ok_or_else(|| {
                        VerificationError::InvalidStructure("missing queried value".into())
                    })?;
                    row.push(value);
                }
            }
            queried_rows.push(row);
        }

        let lifted_domain = CanonicCoset::new(lifting_log_size).circle_domain();
        let answers = fri_answers(
            &sample_batches,
            &constants,
            lifted_domain,
            &query_positions,
            &queried_rows,
        )?;

        fri_verifier.decommit(&answers)?;
        tracing::debug!("proof verified");
        Ok(())
    }
}
