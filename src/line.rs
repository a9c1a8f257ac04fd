//! Line domains and univariate polynomials for FRI
//!
//! After the first circle-to-line fold, FRI works over `{P.x : P ∈ coset}`.
//! The last layer is an explicit low-degree `LinePoly` in ordered
//! coefficients.

use crate::circle::{CirclePoint, Coset};
use crate::fields::{batch_inverse, Field};
use crate::m31::M31;
use crate::poly::{fft_layer_loop, ibutterfly_secure, SecureEvaluation};
use crate::qm31::{SecureColumn, QM31};
use crate::utils::{bit_reverse_index, fold};

/// Log folding factor of the circle-to-line fold.
pub const CIRCLE_TO_LINE_FOLD_STEP: u32 = 1;

/// Log folding factor of a line-to-line fold.
pub const FOLD_STEP: u32 = 1;

/// The x-coordinates of a coset: the domain of a line polynomial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineDomain {
    coset: Coset,
}

impl LineDomain {
    pub fn new(coset: Coset) -> Self {
        Self { coset }
    }

    #[inline]
    pub fn log_size(&self) -> u32 {
        self.coset.log_size
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.coset.size()
    }

    #[inline]
    pub fn at(&self, index: usize) -> M31 {
        self.coset.at(index).x
    }

    #[inline]
    pub fn coset(&self) -> Coset {
        self.coset
    }

    /// Domain of the folded evaluations: x-coordinates of the doubled coset.
    pub fn double(&self) -> Self {
        Self {
            coset: self.coset.double(),
        }
    }
}

/// Secure-field evaluations on a line domain, in bit-reversed order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineEvaluation {
    domain: LineDomain,
    pub values: SecureColumn,
}

impl LineEvaluation {
    pub fn new(domain: LineDomain, values: SecureColumn) -> Self {
        assert_eq!(values.len(), domain.size(), "evaluation length mismatch");
        Self { domain, values }
    }

    pub fn zeros(domain: LineDomain) -> Self {
        Self {
            values: SecureColumn::zeros(domain.size()),
            domain,
        }
    }

    #[inline]
    pub fn domain(&self) -> LineDomain {
        self.domain
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Interpolates to a `LinePoly` in ordered coefficients. Divides by the
    /// domain size at the end.
    pub fn interpolate(self) -> LinePoly {
        let log_size = self.domain.log_size();
        let mut values = self.values.to_vec();

        let mut coset = self.domain.coset();
        for layer in 0..log_size as usize {
            let mut layer_twiddles: Vec<M31> =
                coset.iter().take(coset.size() / 2).map(|p| p.x).collect();
            crate::utils::bit_reverse(&mut layer_twiddles);
            let layer_itwiddles =
                batch_inverse(&layer_twiddles).expect("line domain x-coordinates are non-zero");
            for (h, &t) in layer_itwiddles.iter().enumerate() {
                fft_layer_loop(&mut values, layer, h, t, ibutterfly_secure);
            }
            if coset.log_size > 0 {
                coset = coset.double();
            }
        }

        let n_inv = M31::from_u64(1u64 << log_size).inverse();
        for v in &mut values {
            *v = v.mul_m31(n_inv);
        }
        LinePoly::from_ordered_coefficients(values)
    }
}

/// A univariate polynomial over the secure field in the line-FFT basis
/// `{1, x, π(x), x·π(x), …}`, stored in ordered coefficients: bit `b` of a
/// coefficient index selects the factor `π^b(x)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinePoly {
    coeffs: Vec<QM31>,
    log_size: u32,
}

impl LinePoly {
    /// # Panics
    /// Panics if the length is not a non-zero power of two.
    pub fn from_ordered_coefficients(coeffs: Vec<QM31>) -> Self {
        assert!(
            !coeffs.is_empty() && coeffs.len().is_power_of_two(),
            "coefficient length must be a non-zero power of two"
        );
        let log_size = coeffs.len().ilog2();
        Self { coeffs, log_size }
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
    pub fn coefficients(&self) -> &[QM31] {
        &self.coeffs
    }

    pub fn into_ordered_coefficients(self) -> Vec<QM31> {
        self.coeffs
    }

    /// Truncates to the leading `len` ordered coefficients.
    pub fn truncate(&mut self, len: usize) {
        assert!(len.is_power_of_two() && len <= self.coeffs.len());
        self.coeffs.truncate(len);
        self.log_size = len.ilog2();
    }

    pub fn eval_at_point(&self, x: QM31) -> QM31 {
        let mut doublings = Vec::with_capacity(self.log_size as usize);
        let mut x = x;
        for _ in 0..self.log_size {
            doublings.push(x);
            x = CirclePoint::<QM31>::double_x(x);
        }
        doublings.reverse();
        fold(&self.coeffs, &doublings)
    }
}

/// Folds a line evaluation in half with randomness `alpha`:
/// `f'(π(x)) = f₀(π(x)) + α·f₁(π(x))` where `f(x) = f₀(π(x)) + x·f₁(π(x))`.
pub fn fold_line(eval: &LineEvaluation, alpha: QM31) -> LineEvaluation {
    let n = eval.len();
    assert!(n >= 2, "cannot fold an evaluation of length < 2");
    let domain = eval.domain();
    let log_size = domain.log_size();

    let xs: Vec<M31> = (0..n >> FOLD_STEP)
        .map(|i| domain.at(bit_reverse_index(i << FOLD_STEP, log_size)))
        .collect();
    let x_invs = batch_inverse(&xs).expect("line domain x-coordinates are non-zero");

    let folded: SecureColumn = (0..n >> FOLD_STEP)
        .map(|i| {
            let (mut f0, mut f1) = (eval.values.at(i << 1), eval.values.at((i << 1) + 1));
            ibutterfly_secure(&mut f0, &mut f1, x_invs[i]);
            f0 + alpha * f1
        })
        .collect();
    LineEvaluation::new(domain.double(), folded)
}

/// Folds a circle evaluation into a half-size line evaluation by combining
/// conjugate pairs with randomness `alpha`, accumulating into `dst`:
/// `dst ← dst·α² + (f₀ + α·f₁)`.
pub fn fold_circle_into_line(dst: &mut LineEvaluation, src: &SecureEvaluation, alpha: QM31) {
    assert_eq!(src.len() >> CIRCLE_TO_LINE_FOLD_STEP, dst.len());
    let domain = src.domain;
    let alpha_sq = alpha * alpha;
    for i in 0..dst.len() {
        let p = domain.at(bit_reverse_index(
            i << CIRCLE_TO_LINE_FOLD_STEP,
            domain.log_size(),
        ));
        let (mut f0, mut f1) = (src.values.at(i << 1), src.values.at((i << 1) + 1));
        ibutterfly_secure(&mut f0, &mut f1, p.y.inverse());
        let f_prime = f0 + alpha * f1;
        dst.values.set(i, dst.values.at(i) * alpha_sq + f_prime);
    }
}
