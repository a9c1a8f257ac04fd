//! Field law tests for M31, CM31 and QM31

use circlet::cm31::CM31;
use circlet::fields::{batch_inverse, batch_inverse_chunked, Field, FieldError};
use circlet::m31::{M31, P};
use circlet::qm31::QM31;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_m31(rng: &mut StdRng) -> M31 {
    M31::from_u32_unchecked(rng.gen_range(0..P))
}

fn random_qm31(rng: &mut StdRng) -> QM31 {
    QM31::from_m31(
        random_m31(rng),
        random_m31(rng),
        random_m31(rng),
        random_m31(rng),
    )
}

#[test]
fn test_qm31_field_laws_randomized() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let a = random_qm31(&mut rng);
        let b = random_qm31(&mut rng);
        let c = random_qm31(&mut rng);

        assert_eq!(a + b, b + a);
        assert_eq!(a * b, b * a);
        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!((a * b) * c, a * (b * c));
        assert_eq!(a * (b + c), a * b + a * c);
        assert_eq!(a - a, QM31::ZERO);

        if !a.is_zero() {
            assert_eq!(a * a.inverse(), QM31::ONE);
        }
    }
}

#[test]
fn test_cm31_field_laws_randomized() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let a = CM31::from_m31(random_m31(&mut rng), random_m31(&mut rng));
        let b = CM31::from_m31(random_m31(&mut rng), random_m31(&mut rng));
        let c = CM31::from_m31(random_m31(&mut rng), random_m31(&mut rng));

        assert_eq!(a * (b + c), a * b + a * c);
        assert_eq!((a * b) * c, a * (b * c));
        if !a.is_zero() {
            assert_eq!(a * a.inverse(), CM31::ONE);
        }
    }
}

#[test]
fn test_qm31_pow_and_frobenius_sanity() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_qm31(&mut rng);
    // a^(q - 1) = 1 with q = p^4 for non-zero a.
    let q_minus_one = (P as u128).pow(4) - 1;
    assert_eq!(a.pow(q_minus_one), QM31::ONE);
}

#[test]
fn test_batch_inverse_matches_pointwise() {
    let mut rng = StdRng::seed_from_u64(11);
    let values: Vec<QM31> = (0..100).map(|_| random_qm31(&mut rng)).collect();
    let inverses = batch_inverse(&values).unwrap();
    for (v, inv) in values.iter().zip(&inverses) {
        assert_eq!(*v * *inv, QM31::ONE);
        assert_eq!(*inv, v.inverse());
    }
}

#[test]
fn test_batch_inverse_chunked_large() {
    let values: Vec<M31> = (1..=5000u32).map(M31::new).collect();
    let chunked = batch_inverse_chunked(&values, 1 << 10).unwrap();
    assert_eq!(chunked, batch_inverse(&values).unwrap());
}

#[test]
fn test_batch_inverse_zero_anywhere_fails() {
    for position in [0usize, 3, 7] {
        let mut values: Vec<M31> = (1..=8u32).map(M31::new).collect();
        values[position] = M31::ZERO;
        assert_eq!(batch_inverse(&values), Err(FieldError::DivisionByZero));
    }
}

#[test]
fn test_mixed_multiplications_agree() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let q = random_qm31(&mut rng);
        let c = CM31::from_m31(random_m31(&mut rng), random_m31(&mut rng));
        let m = random_m31(&mut rng);
        assert_eq!(q.mul_cm31(c), q * QM31::from(c));
        assert_eq!(q.mul_m31(m), q * QM31::from(m));
        assert_eq!(c.mul_m31(m), c * CM31::from(m));
    }
}

proptest! {
    #[test]
    fn prop_m31_add_mul_laws(a in 0..P, b in 0..P, c in 0..P) {
        let (a, b, c) = (M31::new(a), M31::new(b), M31::new(c));
        prop_assert_eq!(a + b, b + a);
        prop_assert_eq!(a * b, b * a);
        prop_assert_eq!(a * (b + c), a * b + a * c);
        prop_assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn prop_m31_inverse(a in 1..P) {
        let a = M31::new(a);
        prop_assert_eq!(a * a.inverse(), M31::ONE);
    }

    #[test]
    fn prop_m31_from_u64_reduction(x in any::<u64>()) {
        prop_assert_eq!(M31::from_u64(x).value() as u64, x % P as u64);
    }

    #[test]
    fn prop_qm31_m31_array_round_trip(a in 0..P, b in 0..P, c in 0..P, d in 0..P) {
        let felt = QM31::from_m31(M31::new(a), M31::new(b), M31::new(c), M31::new(d));
        prop_assert_eq!(QM31::from_m31_array(felt.to_m31_array()), felt);
    }
}
