//! Circle group, domain and FFT tests

use circlet::circle::{
    secure_field_circle_gen, CanonicCoset, CirclePoint, CirclePointIndex, Coset, M31_CIRCLE_GEN,
};
use circlet::m31::M31;
use circlet::poly::{CircleCoefficients, CircleEvaluation};
use circlet::qm31::QM31;
use circlet::utils::{bit_reverse_index, coset_index_to_circle_domain_index};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_circle_generator_order() {
    // g^(2^30) = (-1, 0) and g^(2^31) = (1, 0).
    let half_order = M31_CIRCLE_GEN.repeated_double(30);
    assert_eq!(
        half_order,
        CirclePoint {
            x: -M31::ONE,
            y: M31::ZERO
        }
    );
    assert_eq!(half_order.double(), CirclePoint::identity());
}

#[test]
fn test_subgroup_generator_orders() {
    for log_size in 1..=10u32 {
        let gen = CirclePointIndex::subgroup_gen(log_size).to_point();
        assert_eq!(gen.mul(1 << log_size), CirclePoint::identity());
        assert_ne!(gen.mul(1 << (log_size - 1)), CirclePoint::identity());
    }
}

#[test]
fn test_canonic_coset_structure() {
    for log_size in 1..=8u32 {
        let canonic = CanonicCoset::new(log_size);
        let domain = canonic.circle_domain();
        assert_eq!(domain.size(), 1 << log_size);
        assert!(domain.is_canonic());
        for p in domain.iter() {
            assert!(p.is_on_curve());
        }
    }
}

#[test]
fn test_coset_index_bridge_covers_canonic_domain() {
    // Iterating the canonic coset and bridging indices visits exactly the
    // circle domain points.
    let log_size = 4;
    let canonic = CanonicCoset::new(log_size);
    let domain = canonic.circle_domain();
    for i in 0..canonic.size() {
        let domain_index = coset_index_to_circle_domain_index(i, log_size);
        assert_eq!(canonic.at(i), domain.at(domain_index));
    }
}

#[test]
fn test_fft_round_trip_on_random_polys() {
    let mut rng = StdRng::seed_from_u64(17);
    for log_size in 1..=8u32 {
        let coeffs: Vec<M31> = (0..(1usize << log_size))
            .map(|_| M31::from_u32_unchecked(rng.gen_range(0..circlet::m31::P)))
            .collect();
        let poly = CircleCoefficients::new(coeffs);
        let domain = CanonicCoset::new(log_size).circle_domain();
        let back = poly.evaluate(domain).interpolate();
        assert_eq!(back, poly);
    }
}

#[test]
fn test_evaluations_match_eval_at_point_after_bit_reverse() {
    let mut rng = StdRng::seed_from_u64(23);
    let log_size = 5u32;
    let coeffs: Vec<M31> = (0..(1usize << log_size))
        .map(|_| M31::from_u32_unchecked(rng.gen_range(0..circlet::m31::P)))
        .collect();
    let poly = CircleCoefficients::new(coeffs);
    let domain = CanonicCoset::new(log_size).circle_domain();
    let evals = poly.evaluate(domain);
    for i in 0..domain.size() {
        let point = domain.at(bit_reverse_index(i, log_size));
        assert_eq!(
            QM31::from(evals.values[i]),
            poly.eval_at_point(point.into_ef())
        );
    }
}

#[test]
fn test_split_at_mid_identity_random() {
    let mut rng = StdRng::seed_from_u64(31);
    for log_size in 2..=7u32 {
        let coeffs: Vec<M31> = (0..(1usize << log_size))
            .map(|_| M31::from_u32_unchecked(rng.gen_range(0..circlet::m31::P)))
            .collect();
        let poly = CircleCoefficients::new(coeffs);
        let (left, right) = poly.split_at_mid();
        let z = secure_field_circle_gen().mul(rng.gen_range(1..1_000_000u128));
        let mut pi_x = z.x;
        for _ in 0..log_size.saturating_sub(2) {
            pi_x = CirclePoint::<QM31>::double_x(pi_x);
        }
        assert_eq!(
            poly.eval_at_point(z),
            left.eval_at_point(z) + pi_x * right.eval_at_point(z),
            "split identity failed at log size {log_size}"
        );
    }
}

#[test]
fn test_interpolation_of_known_function() {
    // Interpolate x-coordinate values and evaluate back elsewhere.
    let log_size = 4u32;
    let domain = CanonicCoset::new(log_size).circle_domain();
    let values: Vec<M31> = (0..domain.size())
        .map(|i| domain.at(bit_reverse_index(i, log_size)).x)
        .collect();
    let poly = CircleEvaluation::new(domain, values).interpolate();
    // f(p) = p.x must hold at fresh points of a larger domain.
    let big_domain = CanonicCoset::new(6).circle_domain();
    for i in [0usize, 5, 17, 40] {
        let p = big_domain.at(i);
        assert_eq!(poly.eval_at_point(p.into_ef()), QM31::from(p.x));
    }
}

#[test]
fn test_conjugate_coset_points() {
    let coset = Coset::half_odds(4);
    let conjugate = coset.conjugate();
    for (p, q) in coset.iter().zip(conjugate.iter()) {
        assert_eq!(q, p.conjugate());
    }
}

proptest! {
    #[test]
    fn prop_bit_reverse_involution(log_size in 1u32..=16, i in 0usize..(1 << 16)) {
        let i = i & ((1 << log_size) - 1);
        prop_assert_eq!(bit_reverse_index(bit_reverse_index(i, log_size), log_size), i);
    }

    #[test]
    fn prop_point_index_add_matches_group(a in 0u32..(1 << 31), b in 0u32..(1 << 31)) {
        let ia = CirclePointIndex(a);
        let ib = CirclePointIndex(b);
        prop_assert_eq!((ia + ib).to_point(), ia.to_point() + ib.to_point());
    }
}
