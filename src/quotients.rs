//! Quotient accumulation for out-of-domain openings
//!
//! Every opening `(point, value)` contributes a line numerator; openings are
//! grouped by point into batches sharing one CM31 denominator per row. The
//! verifier reuses the same machinery to reconstruct the first-layer FRI
//! answers from queried values.

use itertools::{izip, zip_eq};

use crate::circle::{CanonicCoset, CircleDomain, CirclePoint};
use crate::cm31::CM31;
use crate::fields::{batch_inverse, FieldError};
use crate::m31::M31;
use crate::qm31::QM31;
use crate::treevec::TreeVec;
use crate::utils::bit_reverse_index;

/// Constraint-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotientError {
    /// A sample point whose y-coordinate equals its own complex conjugate
    /// admits no conjugate line.
    DegenerateLine,
}

impl core::fmt::Display for QuotientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DegenerateLine => write!(f, "degenerate conjugate line"),
        }
    }
}

impl std::error::Error for QuotientError {}

/// An opening: a value claimed at an out-of-domain point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointSample {
    pub point: CirclePoint<QM31>,
    pub value: QM31,
}

/// All openings sharing one sample point, with per-entry randomness:
/// `(column_index, sampled_value, random_coeff_power)`.
#[derive(Clone, Debug)]
pub struct ColumnSampleBatch {
    pub point: CirclePoint<QM31>,
    pub columns_and_values: Vec<(usize, QM31, QM31)>,
}

/// Expands per-column samples into the flat sample lists the quotient engine
/// consumes, applying periodicity lifting and assigning `random_coeff`
/// powers.
///
/// A column with exactly two samples receives a third, synthetic sample
/// inserted at the *front*: the second sample shifted by the period
/// generator of the column, carrying the second sample's value. Powers
/// `α^0, α^1, α^2, …` are assigned in traversal order (tree, column, then
/// inserted-then-original entries per column).
pub fn column_samples_with_coeffs(
    sampled_points: &TreeVec<Vec<Vec<CirclePoint<QM31>>>>,
    sampled_values: &TreeVec<Vec<Vec<QM31>>>,
    column_log_sizes: &TreeVec<Vec<u32>>,
    log_blowup_factor: u32,
    lifting_log_size: u32,
    random_coeff: QM31,
) -> Vec<Vec<(PointSample, QM31)>> {
    let mut columns = Vec::new();
    let mut alpha = QM31::ONE;
    for (points_tree, values_tree, logs_tree) in
        izip!(&sampled_points.0, &sampled_values.0, &column_log_sizes.0)
    {
        for (points_col, values_col, &column_log_size) in
            izip!(points_tree, values_tree, logs_tree)
        {
            let mut samples: Vec<PointSample> = zip_eq(points_col, values_col)
                .map(|(&point, &value)| PointSample { point, value })
                .collect();
            if samples.len() == 2 {
                let base_log_size = column_log_size - log_blowup_factor;
                let period_gen = CanonicCoset::new(lifting_log_size)
                    .step()
                    .repeated_double(base_log_size)
                    .into_ef::<QM31>();
                samples.insert(
                    0,
                    PointSample {
                        point: samples[1].point + period_gen,
                        value: samples[1].value,
                    },
                );
            }
            let with_coeffs = samples
                .into_iter()
                .map(|sample| {
                    let entry = (sample, alpha);
                    alpha = alpha * random_coeff;
                    entry
                })
                .collect();
            columns.push(with_coeffs);
        }
    }
    columns
}

/// Groups per-column samples into batches by their point, preserving the
/// first-occurrence order of points across the column traversal.
pub fn group_sample_batches(columns: &[Vec<(PointSample, QM31)>]) -> Vec<ColumnSampleBatch> {
    let mut batches: Vec<ColumnSampleBatch> = Vec::new();
    for (column_index, samples) in columns.iter().enumerate() {
        for (sample, coeff) in samples {
            match batches.iter_mut().find(|b| b.point == sample.point) {
                Some(batch) => {
                    batch
                        .columns_and_values
                        .push((column_index, sample.value, *coeff));
                }
                None => batches.push(ColumnSampleBatch {
                    point: sample.point,
                    columns_and_values: vec![(column_index, sample.value, *coeff)],
                }),
            }
        }
    }
    batches
}

/// Coefficients of the line through a sample and its complex conjugate,
/// scaled by `alpha`.
pub fn complex_conjugate_line_coeffs(
    sample: &PointSample,
    alpha: QM31,
) -> Result<(QM31, QM31, QM31), QuotientError> {
    let a = sample.value.complex_conjugate() - sample.value;
    let c = sample.point.y.complex_conjugate() - sample.point.y;
    if c == QM31::ZERO {
        return Err(QuotientError::DegenerateLine);
    }
    let b = sample.value * c - a * sample.point.y;
    Ok((alpha * a, alpha * b, alpha * c))
}

/// Precomputed per-batch line coefficients, one triple per entry.
#[derive(Clone, Debug)]
pub struct QuotientConstants {
    pub line_coeffs: Vec<Vec<(QM31, QM31, QM31)>>,
}

pub fn quotient_constants(
    sample_batches: &[ColumnSampleBatch],
) -> Result<QuotientConstants, QuotientError> {
    let line_coeffs = sample_batches
        .iter()
        .map(|batch| {
            batch
                .columns_and_values
                .iter()
                .map(|&(_, value, coeff)| {
                    complex_conjugate_line_coeffs(
                        &PointSample {
                            point: batch.point,
                            value,
                        },
                        coeff,
                    )
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QuotientConstants { line_coeffs })
}

/// One CM31 denominator per batch at a domain row, inverted together with a
/// single field inversion.
fn denominator_inverses(
    sample_batches: &[ColumnSampleBatch],
    domain_point: CirclePoint<M31>,
) -> Result<Vec<CM31>, FieldError> {
    let denominators: Vec<CM31> = sample_batches
        .iter()
        .map(|batch| {
            let prx = batch.point.x.0;
            let pix = batch.point.x.1;
            let pry = batch.point.y.0;
            let piy = batch.point.y.1;
            (prx - domain_point.x) * piy - (pry - domain_point.y) * pix
        })
        .collect();
    batch_inverse(&denominators)
}

/// Accumulates all batch quotient contributions for one domain row.
pub fn accumulate_row_quotients(
    sample_batches: &[ColumnSampleBatch],
    quotient_constants: &QuotientConstants,
    queried_values_at_row: &[M31],
    domain_point: CirclePoint<M31>,
) -> Result<QM31, FieldError> {
    let denominator_inverses = denominator_inverses(sample_batches, domain_point)?;
    let mut row_accumulator = QM31::ZERO;
    for (sample_batch, line_coeffs, denominator_inverse) in izip!(
        sample_batches,
        &quotient_constants.line_coeffs,
        denominator_inverses
    ) {
        let mut numerator = QM31::ZERO;
        for ((column_index, _, _), (a, b, c)) in
            zip_eq(&sample_batch.columns_and_values, line_coeffs)
        {
            let value = QM31::from(queried_values_at_row[*column_index]) * *c;
            let linear_term = *a * domain_point.y + *b;
            numerator += value - linear_term;
        }
        row_accumulator += numerator.mul_cm31(denominator_inverse);
    }
    Ok(row_accumulator)
}

/// Recomputes the expected first-layer FRI answers at the queried rows.
pub fn fri_answers(
    sample_batches: &[ColumnSampleBatch],
    quotient_constants: &QuotientConstants,
    lifted_domain: CircleDomain,
    query_positions: &[usize],
    queried_rows: &[Vec<M31>],
) -> Result<Vec<QM31>, FieldError> {
    debug_assert_eq!(query_positions.len(), queried_rows.len());
    let log_size = lifted_domain.log_size();
    zip_eq(query_positions, queried_rows)
        .map(|(&position, row)| {
            let domain_point = lifted_domain.at(bit_reverse_index(position, log_size));
            accumulate_row_quotients(sample_batches, quotient_constants, row, domain_point)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::secure_field_circle_gen;

    fn sample_at(scalar: u128, value: QM31) -> (PointSample, QM31) {
        (
            PointSample {
                point: secure_field_circle_gen().mul(scalar),
                value,
            },
            QM31::ONE,
        )
    }

    #[test]
    fn test_grouping_preserves_first_occurrence_order() {
        let p1 = secure_field_circle_gen().mul(3);
        let p2 = secure_field_circle_gen().mul(5);
        let columns = vec![
            vec![
                (
                    PointSample {
                        point: p1,
                        value: QM31::ONE,
                    },
                    QM31::ONE,
                ),
                (
                    PointSample {
                        point: p2,
                        value: QM31::ZERO,
                    },
                    QM31::ONE,
                ),
            ],
            vec![(
                PointSample {
                    point: p1,
                    value: QM31::ONE,
                },
                QM31::ONE,
            )],
        ];
        let batches = group_sample_batches(&columns);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].point, p1);
        assert_eq!(batches[1].point, p2);
        assert_eq!(batches[0].columns_and_values.len(), 2);
        assert_eq!(batches[0].columns_and_values[1].0, 1);
    }

    #[test]
    fn test_degenerate_line_detection() {
        // A base-field point is its own complex conjugate.
        let base_point = crate::circle::M31_CIRCLE_GEN.into_ef::<QM31>();
        let sample = PointSample {
            point: base_point,
            value: QM31::ONE,
        };
        assert_eq!(
            complex_conjugate_line_coeffs(&sample, QM31::ONE),
            Err(QuotientError::DegenerateLine)
        );

        let (good, _) = sample_at(7, QM31::ONE);
        assert!(complex_conjugate_line_coeffs(&good, QM31::ONE).is_ok());
    }

    #[test]
    fn test_line_passes_through_sample() {
        // At the sample point itself, value*c - (a*y + b) must vanish.
        let (sample, _) = sample_at(11, QM31::from_u32_unchecked(3, 1, 4, 1));
        let (a, b, c) = complex_conjugate_line_coeffs(&sample, QM31::ONE).unwrap();
        assert_eq!(sample.value * c - (a * sample.point.y + b), QM31::ZERO);
    }

    #[test]
    fn test_periodicity_lifting_insertion() {
        let p = secure_field_circle_gen().mul(9);
        let q = secure_field_circle_gen().mul(13);
        let points = TreeVec::new(vec![vec![vec![p, q]]]);
        let values = TreeVec::new(vec![vec![vec![QM31::ONE, QM31::from_u32_unchecked(2, 0, 0, 0)]]]);
        let logs = TreeVec::new(vec![vec![5u32]]);
        let columns = column_samples_with_coeffs(&points, &values, &logs, 1, 5, QM31::from_u32_unchecked(7, 0, 0, 0));

        assert_eq!(columns.len(), 1);
        let samples = &columns[0];
        // Front insertion: synthetic first, then the originals in order.
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].0.point, p);
        assert_eq!(samples[2].0.point, q);
        // The synthetic entry carries the second sample's value at a shifted
        // point.
        assert_eq!(samples[0].0.value, samples[2].0.value);
        assert_ne!(samples[0].0.point, q);
        // Alpha powers follow traversal order.
        let alpha = QM31::from_u32_unchecked(7, 0, 0, 0);
        assert_eq!(samples[0].1, QM31::ONE);
        assert_eq!(samples[1].1, alpha);
        assert_eq!(samples[2].1, alpha * alpha);
    }

    #[test]
    fn test_single_sample_column_is_unchanged() {
        let p = secure_field_circle_gen().mul(9);
        let points = TreeVec::new(vec![vec![vec![p]]]);
        let values = TreeVec::new(vec![vec![vec![QM31::ONE]]]);
        let logs = TreeVec::new(vec![vec![5u32]]);
        let columns = column_samples_with_coeffs(&points, &values, &logs, 1, 5, QM31::ONE);
        assert_eq!(columns[0].len(), 1);
    }
}
