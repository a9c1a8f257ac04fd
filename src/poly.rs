//! Polynomials in the circle-FFT basis
//!
//! A `CircleCoefficients` is a length-`2^L` vector of base-field
//! coefficients against the basis `{1, y, x, xy, π(x), …}` where
//! `π(x) = 2x² - 1`. Evaluations on a circle domain are always stored in
//! bit-reversed order.

use crate::circle::{CircleDomain, CirclePoint};
use crate::fields::Field;
use crate::m31::M31;
use crate::qm31::{SecureColumn, QM31, SECURE_EXTENSION_DEGREE};
use crate::twiddles::{domain_line_twiddles_from_tree, precompute_twiddles, TwiddleTree};
use crate::utils::fold;

/// Errors surfaced by domain and polynomial handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyError {
    /// A coefficient or evaluation vector is empty or not a power of two.
    InvalidLength,
    /// A log size is outside the supported range.
    InvalidLogSize,
    /// A sample point lies on the evaluation domain.
    PointOnDomain,
    /// An interpolation system has no unique solution.
    SingularSystem,
    /// A secure-field evaluation appeared where a base-field one is
    /// required.
    NonBaseEvaluation,
}

impl core::fmt::Display for PolyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidLength => write!(f, "length must be a non-zero power of two"),
            Self::InvalidLogSize => write!(f, "log size out of range"),
            Self::PointOnDomain => write!(f, "sample point lies on the domain"),
            Self::SingularSystem => write!(f, "singular interpolation system"),
            Self::NonBaseEvaluation => write!(f, "expected a base field evaluation"),
        }
    }
}

impl std::error::Error for PolyError {}

#[inline]
pub(crate) fn butterfly(v0: &mut M31, v1: &mut M31, twid: M31) {
    let tmp = *v1 * twid;
    (*v0, *v1) = (*v0 + tmp, *v0 - tmp);
}

#[inline]
pub(crate) fn ibutterfly(v0: &mut M31, v1: &mut M31, itwid: M31) {
    (*v0, *v1) = (*v0 + *v1, (*v0 - *v1) * itwid);
}

#[inline]
pub(crate) fn butterfly_secure(v0: &mut QM31, v1: &mut QM31, twid: M31) {
    let tmp = v1.mul_m31(twid);
    (*v0, *v1) = (*v0 + tmp, *v0 - tmp);
}

#[inline]
pub(crate) fn ibutterfly_secure(v0: &mut QM31, v1: &mut QM31, itwid: M31) {
    (*v0, *v1) = (*v0 + *v1, (*v0 - *v1).mul_m31(itwid));
}

/// Runs one FFT layer: butterflies at stride `2^i` within each group `h`.
pub(crate) fn fft_layer_loop<T: Copy>(
    values: &mut [T],
    i: usize,
    h: usize,
    t: M31,
    butterfly_fn: impl Fn(&mut T, &mut T, M31),
) {
    for l in 0..(1 << i) {
        let idx0 = (h << (i + 1)) + l;
        let idx1 = idx0 + (1 << i);
        let (mut v0, mut v1) = (values[idx0], values[idx1]);
        butterfly_fn(&mut v0, &mut v1, t);
        values[idx0] = v0;
        values[idx1] = v1;
    }
}

/// Derives the circle-layer (y-coordinate) twiddles from the first
/// line-twiddle layer.
///
/// Valid on canonic domains, where each pair of line twiddles `[x, y]`
/// expands to the four circle twiddles `[-y, y, x, -x]`. The identity holds
/// for inverse twiddles as well.
pub(crate) fn circle_twiddles_from_line_twiddles(
    first_line_twiddles: &[M31],
) -> impl Iterator<Item = M31> + '_ {
    first_line_twiddles
        .chunks_exact(2)
        .flat_map(|chunk| [-chunk[1], chunk[1], chunk[0], -chunk[0]])
}

/// A polynomial in the circle-FFT basis.
///
/// Invariant: the coefficient vector length is a non-zero power of two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircleCoefficients {
    coeffs: Vec<M31>,
}

impl CircleCoefficients {
    /// # Panics
    /// Panics if the length is not a non-zero power of two.
    pub fn new(coeffs: Vec<M31>) -> Self {
        assert!(
            !coeffs.is_empty() && coeffs.len().is_power_of_two(),
            "coefficient length must be a non-zero power of two"
        );
        Self { coeffs }
    }

    pub fn try_new(coeffs: Vec<M31>) -> Result<Self, PolyError> {
        if coeffs.is_empty() || !coeffs.len().is_power_of_two() {
            return Err(PolyError::InvalidLength);
        }
        Ok(Self { coeffs })
    }

    #[inline]
    pub fn log_size(&self) -> u32 {
        self.coeffs.len().ilog2()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn coeffs(&self) -> &[M31] {
        &self.coeffs
    }

    pub fn into_coeffs(self) -> Vec<M31> {
        self.coeffs
    }

    /// Evaluates at a secure-field point using the iterative factor schedule
    /// `(y, x, 2x² - 1, …)`, folding the coefficients in one pass.
    pub fn eval_at_point(&self, point: CirclePoint<QM31>) -> QM31 {
        fold(&self.coeffs, &point_mappings(self.log_size(), point))
    }

    /// Zero-pads the coefficients to length `2^log_size`.
    pub fn extend(&self, log_size: u32) -> Self {
        assert!(log_size >= self.log_size());
        let mut coeffs = Vec::with_capacity(1 << log_size);
        coeffs.extend_from_slice(&self.coeffs);
        coeffs.resize(1 << log_size, M31::ZERO);
        Self { coeffs }
    }

    /// Splits into halves `(left, right)` with
    /// `p(z) = left(z) + π^(L-2)(z.x) · right(z)`.
    pub fn split_at_mid(&self) -> (Self, Self) {
        assert!(self.log_size() >= 1);
        let mid = self.len() / 2;
        (
            Self::new(self.coeffs[..mid].to_vec()),
            Self::new(self.coeffs[mid..].to_vec()),
        )
    }

    /// Evaluates on a domain, computing the twiddles on the fly.
    pub fn evaluate(&self, domain: CircleDomain) -> CircleEvaluation {
        let tree = precompute_twiddles(domain.half_coset);
        self.evaluate_with_twiddles(domain, &tree)
    }

    /// Evaluates on a domain using a precomputed twiddle tree.
    /// `domain.half_coset` must be a doubling-descendant of the tree's root
    /// coset.
    pub fn evaluate_with_twiddles(&self, domain: CircleDomain, tree: &TwiddleTree) -> CircleEvaluation {
        let mut values = self.extend(domain.log_size()).into_coeffs();

        match domain.log_size() {
            1 => {
                let y = domain.half_coset.initial.y;
                let (mut v0, mut v1) = (values[0], values[1]);
                butterfly(&mut v0, &mut v1, y);
                values[0] = v0;
                values[1] = v1;
            }
            2 => {
                let CirclePoint { x, y } = domain.half_coset.initial;
                let (mut v0, mut v1, mut v2, mut v3) = (values[0], values[1], values[2], values[3]);
                butterfly(&mut v0, &mut v2, x);
                butterfly(&mut v1, &mut v3, x);
                butterfly(&mut v0, &mut v1, y);
                butterfly(&mut v2, &mut v3, -y);
                values = vec![v0, v1, v2, v3];
            }
            _ => {
                assert!(domain.half_coset.is_doubling_of(&tree.root_coset));
                let line_twiddles = domain_line_twiddles_from_tree(domain, &tree.twiddles);
                let circle_twiddles: Vec<M31> =
                    circle_twiddles_from_line_twiddles(line_twiddles[0]).collect();

                for (layer, layer_twiddles) in line_twiddles.iter().enumerate().rev() {
                    for (h, &t) in layer_twiddles.iter().enumerate() {
                        fft_layer_loop(&mut values, layer + 1, h, t, butterfly);
                    }
                }
                for (h, &t) in circle_twiddles.iter().enumerate() {
                    fft_layer_loop(&mut values, 0, h, t, butterfly);
                }
            }
        }

        CircleEvaluation::new(domain, values)
    }
}

/// The factor schedule for pointwise evaluation:
/// `[π^(L-2)(x), …, π(x), x, y]` in fold order.
fn point_mappings(log_size: u32, point: CirclePoint<QM31>) -> Vec<QM31> {
    let mut mappings = Vec::with_capacity(log_size as usize);
    if log_size >= 1 {
        mappings.push(point.y);
    }
    if log_size >= 2 {
        mappings.push(point.x);
    }
    let mut x = point.x;
    for _ in 2..log_size {
        x = CirclePoint::<QM31>::double_x(x);
        mappings.push(x);
    }
    mappings.reverse();
    mappings
}

/// Base-field evaluations on a circle domain, in bit-reversed order:
/// `values[i] = f(domain.at(bit_reverse_index(i, log_size)))`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircleEvaluation {
    pub domain: CircleDomain,
    pub values: Vec<M31>,
}

impl CircleEvaluation {
    pub fn new(domain: CircleDomain, values: Vec<M31>) -> Self {
        assert_eq!(values.len(), domain.size(), "evaluation length mismatch");
        Self { domain, values }
    }

    /// Interpolates back to coefficients, computing twiddles on the fly.
    pub fn interpolate(self) -> CircleCoefficients {
        let tree = precompute_twiddles(self.domain.half_coset);
        self.interpolate_with_twiddles(&tree)
    }

    /// Interpolates using a precomputed twiddle tree; divides by the domain
    /// size at the end.
    pub fn interpolate_with_twiddles(self, tree: &TwiddleTree) -> CircleCoefficients {
        let domain = self.domain;
        let mut values = self.values;

        match domain.log_size() {
            1 => {
                let y = domain.half_coset.initial.y;
                // One inversion for both 1/y and 1/2.
                let yn_inv = (y.double()).inverse();
                let y_inv = yn_inv.double();
                let n_inv = yn_inv * y;
                let (mut v0, mut v1) = (values[0], values[1]);
                ibutterfly(&mut v0, &mut v1, y_inv);
                values[0] = v0 * n_inv;
                values[1] = v1 * n_inv;
            }
            2 => {
                let CirclePoint { x, y } = domain.half_coset.initial;
                let n = M31::from(4u32);
                let xyn_inv = (x * y * n).inverse();
                let x_inv = xyn_inv * y * n;
                let y_inv = xyn_inv * x * n;
                let n_inv = xyn_inv * x * y;
                let (mut v0, mut v1, mut v2, mut v3) = (values[0], values[1], values[2], values[3]);
                ibutterfly(&mut v0, &mut v1, y_inv);
                ibutterfly(&mut v2, &mut v3, -y_inv);
                ibutterfly(&mut v0, &mut v2, x_inv);
                ibutterfly(&mut v1, &mut v3, x_inv);
                values = vec![v0 * n_inv, v1 * n_inv, v2 * n_inv, v3 * n_inv];
            }
            _ => {
                assert!(domain.half_coset.is_doubling_of(&tree.root_coset));
                let line_twiddles = domain_line_twiddles_from_tree(domain, &tree.itwiddles);
                let circle_twiddles: Vec<M31> =
                    circle_twiddles_from_line_twiddles(line_twiddles[0]).collect();

                for (h, &t) in circle_twiddles.iter().enumerate() {
                    fft_layer_loop(&mut values, 0, h, t, ibutterfly);
                }
                for (layer, layer_twiddles) in line_twiddles.iter().enumerate() {
                    for (h, &t) in layer_twiddles.iter().enumerate() {
                        fft_layer_loop(&mut values, layer + 1, h, t, ibutterfly);
                    }
                }

                let n_inv = M31::from_u64(domain.size() as u64).inverse();
                for v in &mut values {
                    *v *= n_inv;
                }
            }
        }

        CircleCoefficients::new(values)
    }
}

/// Four coordinate polynomials of equal log size forming a secure-field
/// polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecureCirclePoly(pub [CircleCoefficients; SECURE_EXTENSION_DEGREE]);

impl SecureCirclePoly {
    pub fn log_size(&self) -> u32 {
        self.0[0].log_size()
    }

    pub fn eval_at_point(&self, point: CirclePoint<QM31>) -> QM31 {
        QM31::from_partial_evals(core::array::from_fn(|k| self.0[k].eval_at_point(point)))
    }

    /// Evaluates all four coordinates with one shared twiddle tree.
    pub fn evaluate_with_twiddles(&self, domain: CircleDomain, tree: &TwiddleTree) -> SecureEvaluation {
        let coordinate_evals: [Vec<M31>; SECURE_EXTENSION_DEGREE] = core::array::from_fn(|k| {
            self.0[k].evaluate_with_twiddles(domain, tree).values
        });
        SecureEvaluation {
            domain,
            values: SecureColumn {
                columns: coordinate_evals,
            },
        }
    }
}

/// Secure-field evaluations on a circle domain, stored by coordinate and in
/// bit-reversed order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecureEvaluation {
    pub domain: CircleDomain,
    pub values: SecureColumn,
}

impl SecureEvaluation {
    pub fn new(domain: CircleDomain, values: SecureColumn) -> Self {
        assert_eq!(values.len(), domain.size(), "evaluation length mismatch");
        Self { domain, values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Computes the weight vector `w` with `f(point) = Σ wᵢ · valuesᵢ` for any
/// `f` committed as a bit-reversed evaluation on `domain`.
///
/// The weights are the circle-basis vector at `point` pushed through the
/// transpose of the interpolation network: forward butterflies over the
/// inverse twiddles, then a division by the domain size. One weight vector
/// serves every column sampled at the same point on the same domain.
pub fn evaluation_weights(
    domain: CircleDomain,
    point: CirclePoint<QM31>,
    tree: &TwiddleTree,
) -> Vec<QM31> {
    let log_size = domain.log_size();
    let n = domain.size();

    // Basis vector: basis[i] = Π factor_j^{bit_j(i)} with factors y, x,
    // π(x), …
    let mut factors = Vec::with_capacity(log_size as usize);
    factors.push(point.y);
    if log_size >= 2 {
        factors.push(point.x);
    }
    let mut x = point.x;
    for _ in 2..log_size {
        x = CirclePoint::<QM31>::double_x(x);
        factors.push(x);
    }
    let mut basis = Vec::with_capacity(n);
    basis.push(QM31::ONE);
    for factor in factors {
        for k in 0..basis.len() {
            basis.push(basis[k] * factor);
        }
    }

    match log_size {
        1 => {
            let y_inv = domain.half_coset.initial.y.inverse();
            let (mut b0, mut b1) = (basis[0], basis[1]);
            butterfly_secure(&mut b0, &mut b1, y_inv);
            basis[0] = b0;
            basis[1] = b1;
        }
        2 => {
            let CirclePoint { x, y } = domain.half_coset.initial;
            let x_inv = x.inverse();
            let y_inv = y.inverse();
            let (mut b0, mut b1, mut b2, mut b3) = (basis[0], basis[1], basis[2], basis[3]);
            butterfly_secure(&mut b0, &mut b2, x_inv);
            butterfly_secure(&mut b1, &mut b3, x_inv);
            butterfly_secure(&mut b0, &mut b1, y_inv);
            butterfly_secure(&mut b2, &mut b3, -y_inv);
            basis = vec![b0, b1, b2, b3];
        }
        _ => {
            assert!(domain.half_coset.is_doubling_of(&tree.root_coset));
            let line_twiddles = domain_line_twiddles_from_tree(domain, &tree.itwiddles);
            let circle_twiddles: Vec<M31> =
                circle_twiddles_from_line_twiddles(line_twiddles[0]).collect();

            for (layer, layer_twiddles) in line_twiddles.iter().enumerate().rev() {
                for (h, &t) in layer_twiddles.iter().enumerate() {
                    fft_layer_loop(&mut basis, layer + 1, h, t, butterfly_secure);
                }
            }
            for (h, &t) in circle_twiddles.iter().enumerate() {
                fft_layer_loop(&mut basis, 0, h, t, butterfly_secure);
            }
        }
    }

    let n_inv = M31::from_u64(n as u64).inverse();
    for w in &mut basis {
        *w = w.mul_m31(n_inv);
    }
    basis
}
