use super::LatticeSelector;
use crate::domain::{EpsmodError, IngestResult, LatticeAxis, MetricTransform};
use crate::sources::EpsmatSource;
use tracing::{debug, info};

/// Largest imaginary part tolerated on a diagonal entry. The stored
/// matrices are physically real on the diagonal; anything above this is
/// corrupted data, not noise.
pub const IMAGINARY_TOLERANCE: f64 = 1.0e-15;

/// Streaming accumulator for diagonal dielectric samples across one or
/// more sources. Each accepted q-point contributes its Cartesian
/// magnitude and one diagonal entry per lattice index; q-points above
/// the in-plane cutoff are skipped without leaving the cursor behind.
#[derive(Debug, Clone)]
pub struct Aggregator {
    axis: LatticeAxis,
    metric: MetricTransform,
    cutoff: Option<f64>,
    qlens: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

/// Per-source ingestion tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub skipped: usize,
}

/// Magnitude-ordered samples ready for model fitting. Row `i` of
/// `values` pairs with `gz_values[i]`; every row shares the `qlens`
/// abscissae.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedDataset {
    gz_values: Vec<i64>,
    qlens: Vec<f64>,
    values: Vec<Vec<f64>>,
    cutoff: Option<f64>,
}

impl AggregatedDataset {
    pub fn gz_values(&self) -> &[i64] {
        &self.gz_values
    }

    /// The in-plane magnitude cutoff the samples were filtered with,
    /// if any.
    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    pub fn qlens(&self) -> &[f64] {
        &self.qlens
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn sample_count(&self) -> usize {
        self.qlens.len()
    }
}

impl Aggregator {
    pub fn new(axis: LatticeAxis, metric: MetricTransform, cutoff: Option<f64>) -> Self {
        let rows = vec![Vec::new(); axis.len()];
        Self {
            axis,
            metric,
            cutoff,
            qlens: Vec::new(),
            rows,
        }
    }

    pub fn axis(&self) -> &LatticeAxis {
        &self.axis
    }

    pub fn sample_count(&self) -> usize {
        self.qlens.len()
    }

    /// Consumes every q-point of the source, in source-native order.
    /// Filtered q-points are skipped through the reader so the cursor
    /// stays aligned with the header.
    pub fn ingest(&mut self, source: &mut dyn EpsmatSource) -> IngestResult<IngestSummary> {
        let selector = LatticeSelector::resolve(&self.axis, source.stored_gvectors())?;
        let mut summary = IngestSummary {
            accepted: 0,
            skipped: 0,
        };

        for index in 0..source.qpoint_count() {
            let qpoint = source.qpoint(index);
            let qlen = self.metric.cartesian_length(qpoint);
            if let Some(cutoff) = self.cutoff
                && qlen > cutoff
            {
                debug!(
                    source = source.label(),
                    qpoint = index + 1,
                    qlen,
                    cutoff,
                    "skipping q-point above cutoff"
                );
                source.skip_qpoint()?;
                summary.skipped += 1;
                continue;
            }

            let matrix = source.read_qpoint()?;
            let local_sort = source.local_sort(index);
            // Validate the whole diagonal before touching the pending
            // lists, so a failed q-point leaves them aligned.
            let mut diagonal = Vec::with_capacity(self.axis.len());
            for &global_index in selector.global_indices() {
                let position = local_sort[global_index];
                if position == 0 || position > matrix.nrows() {
                    return Err(EpsmodError::input_validation(
                        "INPUT.SORT_INDEX_OUT_OF_RANGE",
                        format!(
                            "source '{}' q-point {} maps gvector {} to local position {} outside 1..={}",
                            source.label(),
                            index + 1,
                            global_index + 1,
                            position,
                            matrix.nrows()
                        ),
                    ));
                }
                let local = position - 1;
                let entry = matrix[(local, local)];
                if entry.im.abs() >= IMAGINARY_TOLERANCE {
                    return Err(EpsmodError::numerical_integrity(
                        "NUM.DIAGONAL_NOT_REAL",
                        format!(
                            "source '{}' q-point {} diagonal entry {} has imaginary part {:e}",
                            source.label(),
                            index + 1,
                            local + 1,
                            entry.im
                        ),
                    ));
                }
                diagonal.push(entry.re);
            }
            for (row, value) in self.rows.iter_mut().zip(diagonal) {
                row.push(value);
            }
            self.qlens.push(qlen);
            summary.accepted += 1;
        }

        info!(
            source = source.label(),
            accepted = summary.accepted,
            skipped = summary.skipped,
            "ingested source"
        );
        Ok(summary)
    }

    /// Commits the accumulated samples, reordering every row by
    /// ascending magnitude with a deterministic tie-break.
    pub fn finalize(self) -> AggregatedDataset {
        let order = crate::numerics::deterministic_argsort(&self.qlens);
        let qlens = order.iter().map(|&i| self.qlens[i]).collect();
        let values = self
            .rows
            .into_iter()
            .map(|row| order.iter().map(|&i| row[i]).collect())
            .collect();
        AggregatedDataset {
            gz_values: self.axis.gz_values().to_vec(),
            qlens,
            values,
            cutoff: self.cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Aggregator, IngestSummary};
    use crate::domain::{CellGeometry, EpsmodErrorCategory, LatticeAxis};
    use crate::numerics::DenseComplexMatrix;
    use crate::sources::{EpsmatSource, InMemoryEpsmat};
    use num_complex::Complex64;

    fn identity_geometry() -> CellGeometry {
        CellGeometry {
            bdot: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            alat: 10.0,
            avec: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]],
        }
    }

    fn diagonal_matrix(values: &[(f64, f64)]) -> DenseComplexMatrix {
        let mut matrix = DenseComplexMatrix::zeros(values.len(), values.len());
        for (index, (re, im)) in values.iter().enumerate() {
            matrix[(index, index)] = Complex64::new(*re, *im);
        }
        matrix
    }

    fn two_qpoint_source() -> InMemoryEpsmat {
        // Identity sort permutations over [0,0,-1], [0,0,0], [0,0,1].
        InMemoryEpsmat::new(
            "fixture",
            vec![[0.3, 0.0, 0.0], [0.1, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 3], vec![1, 2, 3]],
            vec![
                diagonal_matrix(&[(1.1, 0.0), (1.2, 0.0), (1.3, 0.0)]),
                diagonal_matrix(&[(2.1, 0.0), (2.2, 0.0), (2.3, 0.0)]),
            ],
        )
        .expect("source should build")
    }

    fn aggregator(cutoff: Option<f64>) -> Aggregator {
        let geometry = identity_geometry();
        let metric = geometry.metric_transform().expect("bdot is SPD");
        Aggregator::new(LatticeAxis::new(1).expect("axis should build"), metric, cutoff)
    }

    #[test]
    fn finalize_orders_samples_by_ascending_magnitude() {
        let mut aggregator = aggregator(None);
        let summary = aggregator
            .ingest(&mut two_qpoint_source())
            .expect("ingest should succeed");
        assert_eq!(
            summary,
            IngestSummary {
                accepted: 2,
                skipped: 0
            }
        );

        let dataset = aggregator.finalize();
        assert_eq!(dataset.gz_values(), &[-1, 0, 1]);
        assert_eq!(dataset.qlens(), &[0.1, 0.3]);
        // The second stored q-point has the smaller magnitude, so its
        // diagonal comes first in every row.
        assert_eq!(dataset.values()[0], vec![2.1, 1.1]);
        assert_eq!(dataset.values()[1], vec![2.2, 1.2]);
        assert_eq!(dataset.values()[2], vec![2.3, 1.3]);
    }

    #[test]
    fn cutoff_filters_samples_but_advances_the_reader() {
        let mut aggregator = aggregator(Some(0.2));
        let mut source = two_qpoint_source();
        let summary = aggregator
            .ingest(&mut source)
            .expect("ingest should succeed");
        assert_eq!(
            summary,
            IngestSummary {
                accepted: 1,
                skipped: 1
            }
        );

        let dataset = aggregator.finalize();
        assert_eq!(dataset.qlens(), &[0.1]);
        assert_eq!(dataset.values()[1], vec![2.2]);

        // The skipped matrix was consumed; the reader is exhausted.
        assert!(source.read_qpoint().is_err());
    }

    #[test]
    fn nonzero_imaginary_diagonal_is_a_numerical_integrity_error() {
        let mut source = InMemoryEpsmat::new(
            "complex",
            vec![[0.1, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 3]],
            vec![diagonal_matrix(&[(1.1, 0.0), (1.2, 1.0e-12), (1.3, 0.0)])],
        )
        .expect("source should build");

        let error = aggregator(None)
            .ingest(&mut source)
            .expect_err("imaginary diagonal should fail");
        assert_eq!(error.category(), EpsmodErrorCategory::NumericalIntegrityError);
        assert!(error.message().contains("imaginary part"));
    }

    #[test]
    fn failed_qpoint_leaves_no_partial_samples_behind() {
        // The first diagonal entry is clean; the second is
        // contaminated, so the point fails part-way through.
        let mut contaminated = InMemoryEpsmat::new(
            "contaminated",
            vec![[0.3, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 3]],
            vec![diagonal_matrix(&[(9.9, 0.0), (9.8, 1.0e-10), (9.7, 0.0)])],
        )
        .expect("source should build");

        let mut aggregator = aggregator(None);
        aggregator
            .ingest(&mut contaminated)
            .expect_err("contaminated diagonal should fail");
        assert_eq!(aggregator.sample_count(), 0);

        // A clean source afterwards must not pick up stale values from
        // the failed point.
        let mut clean = InMemoryEpsmat::new(
            "clean",
            vec![[0.1, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 3]],
            vec![diagonal_matrix(&[(1.1, 0.0), (1.2, 0.0), (1.3, 0.0)])],
        )
        .expect("source should build");
        aggregator
            .ingest(&mut clean)
            .expect("clean ingest should succeed");

        let dataset = aggregator.finalize();
        assert_eq!(dataset.qlens(), &[0.1]);
        assert_eq!(dataset.values()[0], vec![1.1]);
        assert_eq!(dataset.values()[1], vec![1.2]);
        assert_eq!(dataset.values()[2], vec![1.3]);
    }

    #[test]
    fn sort_permutation_reorders_local_storage() {
        // Stored matrix rows are permuted; the sort maps gvector 0 to
        // local position 3 and so on.
        let mut source = InMemoryEpsmat::new(
            "permuted",
            vec![[0.1, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![3, 1, 2]],
            vec![diagonal_matrix(&[(9.0, 0.0), (8.0, 0.0), (7.0, 0.0)])],
        )
        .expect("source should build");

        let mut aggregator = aggregator(None);
        aggregator
            .ingest(&mut source)
            .expect("ingest should succeed");
        let dataset = aggregator.finalize();
        assert_eq!(dataset.values()[0], vec![7.0]);
        assert_eq!(dataset.values()[1], vec![9.0]);
        assert_eq!(dataset.values()[2], vec![8.0]);
    }

    #[test]
    fn out_of_range_sort_index_is_an_input_error() {
        let mut source = InMemoryEpsmat::new(
            "broken",
            vec![[0.1, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 4]],
            vec![diagonal_matrix(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)])],
        )
        .expect("source should build");

        let error = aggregator(None)
            .ingest(&mut source)
            .expect_err("position 4 of 3 should fail");
        assert_eq!(error.category(), EpsmodErrorCategory::InputValidationError);
    }

    #[test]
    fn multiple_sources_merge_into_one_ordered_dataset() {
        let mut aggregator = aggregator(None);
        aggregator
            .ingest(&mut two_qpoint_source())
            .expect("first ingest should succeed");

        let mut second = InMemoryEpsmat::new(
            "second",
            vec![[0.2, 0.0, 0.0]],
            vec![[0, 0, -1], [0, 0, 0], [0, 0, 1]],
            vec![vec![1, 2, 3]],
            vec![diagonal_matrix(&[(3.1, 0.0), (3.2, 0.0), (3.3, 0.0)])],
        )
        .expect("source should build");
        aggregator
            .ingest(&mut second)
            .expect("second ingest should succeed");

        let dataset = aggregator.finalize();
        assert_eq!(dataset.qlens(), &[0.1, 0.2, 0.3]);
        assert_eq!(dataset.values()[1], vec![2.2, 3.2, 1.2]);
    }
}
