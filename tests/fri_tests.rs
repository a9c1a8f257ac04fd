//! FRI protocol tests, including the literal constant-column round trip

use circlet::channel::{Blake2sChannel, Channel};
use circlet::circle::CanonicCoset;
use circlet::fri::{CirclePolyDegreeBound, FriConfig, FriProver, FriVerifier};
use circlet::m31::M31;
use circlet::poly::{CircleCoefficients, SecureEvaluation};
use circlet::qm31::{SecureColumn, QM31};

fn secure_constant(log_size: u32, value: QM31) -> SecureEvaluation {
    let domain = CanonicCoset::new(log_size).circle_domain();
    let values: SecureColumn = (0..domain.size()).map(|_| value).collect();
    SecureEvaluation::new(domain, values)
}

fn lifted_low_degree(log_size: u32, log_degree: u32, seed: u32) -> SecureEvaluation {
    let poly = CircleCoefficients::new(
        (0..(1u32 << log_degree))
            .map(|i| M31::new(i * seed + 11))
            .collect(),
    );
    let domain = CanonicCoset::new(log_size).circle_domain();
    let evals = poly.evaluate(domain);
    let values: SecureColumn = evals.values.iter().map(|&v| QM31::from(v)).collect();
    SecureEvaluation::new(domain, values)
}

#[test]
fn test_constant_column_round_trip_literal() {
    // config = {log_blowup_factor: 1, log_last_layer_degree_bound: 0,
    // n_queries: 4}, log_size = 3, column = [(7,0,0,0); 8].
    let config = FriConfig::new(0, 1, 4);
    let value = QM31::from_u32_unchecked(7, 0, 0, 0);
    let evaluation = secure_constant(3, value);

    let mut prover_channel = Blake2sChannel::default();
    let prover = FriProver::commit(&mut prover_channel, config, evaluation.clone()).unwrap();
    let (proof, _) = prover.decommit(&mut prover_channel).unwrap();

    // The last layer of a constant column is the constant polynomial.
    assert_eq!(proof.last_layer_poly.coefficients(), &[value]);

    let mut verifier_channel = Blake2sChannel::default();
    let mut verifier = FriVerifier::commit(
        &mut verifier_channel,
        config,
        &proof,
        CirclePolyDegreeBound {
            log_degree_bound: 2,
        },
    )
    .unwrap();
    let positions = verifier.sample_query_positions(&mut verifier_channel);

    // Both channels observed the same transcript, so the query positions
    // must coincide with the prover's.
    let mut prover_side = Blake2sChannel::default();
    let replay = FriProver::commit(&mut prover_side, config, evaluation).unwrap();
    let (_, unsorted) = replay.decommit(&mut prover_side).unwrap();
    let mut expected = unsorted;
    expected.sort_unstable();
    expected.dedup();
    assert_eq!(positions, expected);

    // First-layer answers of a constant column are the constant.
    let answers = vec![value; positions.len()];
    assert!(verifier.decommit(&answers).is_ok());
}

#[test]
fn test_query_draws_match_between_prover_and_verifier() {
    let config = FriConfig::new(1, 2, 6);
    let evaluation = lifted_low_degree(7, 5, 13);

    let mut prover_channel = Blake2sChannel::default();
    prover_channel.mix_u64(123);
    let prover = FriProver::commit(&mut prover_channel, config, evaluation.clone()).unwrap();
    let (proof, _) = prover.decommit(&mut prover_channel).unwrap();

    let mut verifier_channel = Blake2sChannel::default();
    verifier_channel.mix_u64(123);
    let mut verifier = FriVerifier::commit(
        &mut verifier_channel,
        config,
        &proof,
        CirclePolyDegreeBound {
            log_degree_bound: 5,
        },
    )
    .unwrap();
    let positions = verifier.sample_query_positions(&mut verifier_channel);
    let answers: Vec<QM31> = positions.iter().map(|&p| evaluation.values.at(p)).collect();
    assert!(verifier.decommit(&answers).is_ok());
}

#[test]
fn test_last_layer_poly_bound_enforced() {
    let config = FriConfig::new(1, 1, 3);
    let evaluation = lifted_low_degree(6, 5, 7);
    let mut prover_channel = Blake2sChannel::default();
    let prover = FriProver::commit(&mut prover_channel, config, evaluation).unwrap();
    let (mut proof, _) = prover.decommit(&mut prover_channel).unwrap();

    // Padding the last layer polynomial beyond the bound must be rejected.
    let mut coeffs = proof.last_layer_poly.clone().into_ordered_coefficients();
    coeffs.extend([QM31::ONE; 2]);
    proof.last_layer_poly = circlet::line::LinePoly::from_ordered_coefficients(coeffs);

    let mut verifier_channel = Blake2sChannel::default();
    let result = FriVerifier::commit(
        &mut verifier_channel,
        config,
        &proof,
        CirclePolyDegreeBound {
            log_degree_bound: 5,
        },
    );
    assert!(matches!(
        result.err(),
        Some(circlet::fri::FriVerificationError::LastLayerDegreeInvalid)
    ));
}

#[test]
fn test_tampered_witness_value_fails() {
    let config = FriConfig::new(0, 1, 5);
    let evaluation = lifted_low_degree(5, 4, 3);
    let mut prover_channel = Blake2sChannel::default();
    let prover = FriProver::commit(&mut prover_channel, config, evaluation.clone()).unwrap();
    let (mut proof, _) = prover.decommit(&mut prover_channel).unwrap();

    if let Some(v) = proof.first_layer.fri_witness.first_mut() {
        *v += QM31::ONE;
    }

    let mut verifier_channel = Blake2sChannel::default();
    let mut verifier = FriVerifier::commit(
        &mut verifier_channel,
        config,
        &proof,
        CirclePolyDegreeBound {
            log_degree_bound: 4,
        },
    )
    .unwrap();
    let positions = verifier.sample_query_positions(&mut verifier_channel);
    let answers: Vec<QM31> = positions.iter().map(|&p| evaluation.values.at(p)).collect();
    assert!(verifier.decommit(&answers).is_err());
}
