//! Component contract and constraint accumulation
//!
//! A component exposes its constraint count, degree bounds, mask points and
//! pointwise/domain constraint evaluation. Constraint evaluations are
//! combined into the composition polynomial through the accumulators below.

use crate::circle::{CanonicCoset, CirclePoint};
use crate::m31::M31;
use crate::poly::{CircleCoefficients, CircleEvaluation, SecureCirclePoly};
use crate::qm31::{generate_secure_powers, SecureColumn, QM31, SECURE_EXTENSION_DEGREE};
use crate::treevec::{TreeVec, TreeVecError};
use crate::twiddles::precompute_twiddles;

/// The verifier-side component contract.
pub trait Component {
    fn n_constraints(&self) -> usize;

    /// Log degree bound of the composition polynomial contribution.
    fn max_constraint_log_degree_bound(&self) -> u32;

    /// Base log sizes of the trace columns, per tree per column.
    fn trace_log_degree_bounds(&self) -> TreeVec<Vec<u32>>;

    /// Sample points per tree, per column, per mask item.
    fn mask_points(
        &self,
        point: CirclePoint<QM31>,
        lifting_log_size: u32,
    ) -> TreeVec<Vec<Vec<CirclePoint<QM31>>>>;

    /// Indices of the preprocessed (tree 0) columns this component uses.
    fn preprocessed_column_indices(&self) -> Vec<usize>;

    fn evaluate_constraint_quotients_at_point(
        &self,
        point: CirclePoint<QM31>,
        mask: &TreeVec<Vec<Vec<QM31>>>,
        evaluation_accumulator: &mut PointEvaluationAccumulator,
        lifting_log_size: u32,
    );
}

/// The prover-side extension of the contract.
pub trait ComponentProver: Component {
    fn evaluate_constraint_quotients_on_domain(
        &self,
        trace: &Trace<'_>,
        evaluation_accumulator: &mut DomainEvaluationAccumulator,
    );
}

/// A borrowed view of the committed trace: extended-domain evaluations per
/// tree per column, in bit-reversed order.
pub struct Trace<'a> {
    pub evals: TreeVec<Vec<&'a [M31]>>,
    pub column_log_sizes: TreeVec<Vec<u32>>,
}

/// Accumulates constraint evaluations at a single point via Horner's rule in
/// the composition randomness.
pub struct PointEvaluationAccumulator {
    random_coeff: QM31,
    accumulation: QM31,
}

impl PointEvaluationAccumulator {
    pub fn new(random_coeff: QM31) -> Self {
        Self {
            random_coeff,
            accumulation: QM31::ZERO,
        }
    }

    pub fn accumulate(&mut self, evaluation: QM31) {
        self.accumulation = self.accumulation * self.random_coeff + evaluation;
    }

    pub fn finalize(self) -> QM31 {
        self.accumulation
    }
}

/// Accumulates constraint evaluations over whole domains, one secure column
/// per evaluation log size, and finalizes into the composition polynomial.
pub struct DomainEvaluationAccumulator {
    random_coeff_powers: Vec<QM31>,
    sub_accumulations: Vec<Option<SecureColumn>>,
}

impl DomainEvaluationAccumulator {
    /// `max_log_size` bounds the composition domain; `total_constraints` is
    /// the constraint count across all components.
    pub fn new(random_coeff: QM31, max_log_size: u32, total_constraints: usize) -> Self {
        Self {
            random_coeff_powers: generate_secure_powers(random_coeff, total_constraints),
            sub_accumulations: vec![None; max_log_size as usize + 1],
        }
    }

    /// Hands out the accumulation column for one evaluation log size along
    /// with this caller's chunk of randomness powers.
    pub fn column(&mut self, log_size: u32, n_constraints: usize) -> ColumnAccumulator<'_> {
        let split_at = self.random_coeff_powers.len() - n_constraints;
        let random_coeff_powers = self.random_coeff_powers.split_off(split_at);
        let col = self.sub_accumulations[log_size as usize]
            .get_or_insert_with(|| SecureColumn::zeros(1 << log_size));
        ColumnAccumulator {
            random_coeff_powers,
            col,
        }
    }

    pub fn log_size(&self) -> u32 {
        (self.sub_accumulations.len() - 1) as u32
    }

    /// Interpolates every sub-accumulation and sums them in coefficient
    /// space into one composition polynomial.
    pub fn finalize(self) -> SecureCirclePoly {
        let total_log_size = self.log_size();
        let mut coeffs: [Vec<M31>; SECURE_EXTENSION_DEGREE] =
            core::array::from_fn(|_| vec![M31::ZERO; 1 << total_log_size]);

        for (log_size, sub) in self.sub_accumulations.into_iter().enumerate() {
            let Some(column) = sub else {
                continue;
            };
            let domain = CanonicCoset::new(log_size as u32).circle_domain();
            let tree = precompute_twiddles(domain.half_coset);
            for (k, coordinate) in column.columns.into_iter().enumerate() {
                let poly = CircleEvaluation::new(domain, coordinate).interpolate_with_twiddles(&tree);
                for (target, c) in coeffs[k].iter_mut().zip(poly.coeffs()) {
                    *target += *c;
                }
            }
        }

        SecureCirclePoly(coeffs.map(CircleCoefficients::new))
    }
}

/// Accumulation handle for one evaluation log size.
pub struct ColumnAccumulator<'a> {
    pub random_coeff_powers: Vec<QM31>,
    col: &'a mut SecureColumn,
}

impl ColumnAccumulator<'_> {
    pub fn accumulate(&mut self, index: usize, evaluation: QM31) {
        let value = self.col.at(index) + evaluation;
        self.col.set(index, value);
    }
}

/// An ordered set of components proved and verified together.
pub struct Components<'a>(pub Vec<&'a dyn Component>);

impl Components<'_> {
    pub fn n_constraints(&self) -> usize {
        self.0.iter().map(|c| c.n_constraints()).sum()
    }

    pub fn composition_log_degree_bound(&self) -> u32 {
        self.0
            .iter()
            .map(|c| c.max_constraint_log_degree_bound())
            .max()
            .unwrap_or(0)
    }

    pub fn trace_log_degree_bounds(&self) -> Result<TreeVec<Vec<u32>>, TreeVecError> {
        TreeVec::concat_cols(self.0.iter().map(|c| c.trace_log_degree_bounds()))
    }

    pub fn mask_points(
        &self,
        point: CirclePoint<QM31>,
        lifting_log_size: u32,
    ) -> Result<TreeVec<Vec<Vec<CirclePoint<QM31>>>>, TreeVecError> {
        TreeVec::concat_cols(self.0.iter().map(|c| c.mask_points(point, lifting_log_size)))
    }

    pub fn eval_composition_polynomial_at_point(
        &self,
        point: CirclePoint<QM31>,
        mask_values: &TreeVec<Vec<Vec<QM31>>>,
        random_coeff: QM31,
        lifting_log_size: u32,
    ) -> QM31 {
        let mut accumulator = PointEvaluationAccumulator::new(random_coeff);
        for component in &self.0 {
            component.evaluate_constraint_quotients_at_point(
                point,
                mask_values,
                &mut accumulator,
                lifting_log_size,
            );
        }
        accumulator.finalize()
    }
}
