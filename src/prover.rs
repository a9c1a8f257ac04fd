//! Top-level proof generation
//!
//! Ties the pieces together: composition polynomial accumulation, its
//! commitment as the last tree, out-of-domain sampling and the commitment
//! scheme opening.

use crate::air::{Component, ComponentProver, Components, DomainEvaluationAccumulator, Trace};
use crate::channel::{Blake2sChannel, Channel};
use crate::circle::{secure_field_circle_gen, CirclePoint};
use crate::pcs::{CommitmentSchemeProof, CommitmentSchemeProver, ProvingError};
use crate::qm31::{QM31, SECURE_EXTENSION_DEGREE};
use crate::treevec::TreeVec;

/// A STARK proof: the commitment scheme proof under the public parameters.
#[derive(Clone, Debug)]
pub struct StarkProof(pub CommitmentSchemeProof);

/// Derives the out-of-domain sample point from the channel: the four
/// canonical limbs of a drawn secure felt form a scalar multiplying the
/// secure-field circle generator.
pub fn draw_oods_point(channel: &mut Blake2sChannel) -> CirclePoint<QM31> {
    let limbs = channel.draw_secure_felt().to_m31_array();
    let mut scalar = 0u128;
    for (i, limb) in limbs.into_iter().enumerate() {
        scalar |= (limb.value() as u128) << (31 * i as u32);
    }
    secure_field_circle_gen().mul(scalar)
}

/// Proves that the committed trace satisfies the components' constraints.
///
/// The commitment scheme must already hold the preprocessed and trace trees,
/// and the channel must have observed the same mixings the verifier will
/// replay.
pub fn prove(
    components: &[&dyn ComponentProver],
    channel: &mut Blake2sChannel,
    mut commitment_scheme: CommitmentSchemeProver,
) -> Result<StarkProof, ProvingError> {
    let component_views: Vec<&dyn Component> =
        components.iter().map(|c| *c as &dyn Component).collect();
    let components_view = Components(component_views);
    let n_constraints = components_view.n_constraints();
    let composition_log_degree_bound = components_view.composition_log_degree_bound();

    let random_coeff = channel.draw_secure_felt();
    tracing::debug!(n_constraints, composition_log_degree_bound, "proving started");

    // Accumulate the composition polynomial over the components.
    let trace = trace_view(&commitment_scheme);
    let mut accumulator =
        DomainEvaluationAccumulator::new(random_coeff, composition_log_degree_bound, n_constraints);
    for component in components {
        component.evaluate_constraint_quotients_on_domain(&trace, &mut accumulator);
    }
    let composition_poly = accumulator.finalize();

    // The composition tree is always the last one.
    commitment_scheme.commit_polynomials(Vec::from(composition_poly.0), channel)?;

    let oods_point = draw_oods_point(channel);
    let lifting_log_size = commitment_scheme
        .trees
        .iter()
        .map(|t| t.log_size)
        .max()
        .unwrap_or(0);

    let mut sample_points = components_view
        .mask_points(oods_point, lifting_log_size)
        .map_err(|_| ProvingError::ShapeMismatch)?;
    sample_points
        .0
        .push(vec![vec![oods_point]; SECURE_EXTENSION_DEGREE]);

    let proof = commitment_scheme.prove_values(sample_points, channel)?;
    tracing::debug!("proving finished");
    Ok(StarkProof(proof))
}

fn trace_view(commitment_scheme: &CommitmentSchemeProver) -> Trace<'_> {
    Trace {
        evals: TreeVec(
            commitment_scheme
                .trees
                .iter()
                .map(|tree| tree.evaluations.iter().map(|c| c.as_slice()).collect())
                .collect(),
        ),
        column_log_sizes: commitment_scheme.tree_log_sizes(),
    }
}
