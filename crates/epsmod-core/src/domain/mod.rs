pub mod errors;

pub use errors::{
    EpsmodError, EpsmodErrorCategory, EpsmodResult, FitResult, IngestResult,
};

use crate::numerics::{cholesky_upper_3x3, matvec3, norm3};
use serde::{Deserialize, Serialize};

/// Momentum vector in crystal coordinates.
pub type Vector3 = [f64; 3];

/// Integer reciprocal-lattice vector.
pub type GVector = [i64; 3];

/// Crystal geometry exposed by a wfn-style source: reciprocal-lattice
/// Gram matrix `bdot`, lattice scale `alat`, and real-space lattice
/// vectors `avec` (columns in crystal convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellGeometry {
    pub bdot: [[f64; 3]; 3],
    pub alat: f64,
    pub avec: [[f64; 3]; 3],
}

impl CellGeometry {
    /// Cell length along the third axis, `Lz = alat · avec[2][2]`.
    pub fn slab_length(&self) -> f64 {
        self.alat * self.avec[2][2]
    }

    pub fn metric_transform(&self) -> EpsmodResult<MetricTransform> {
        let upper = cholesky_upper_3x3(&self.bdot).ok_or_else(|| {
            EpsmodError::input_validation(
                "INPUT.BDOT_NOT_POSITIVE_DEFINITE",
                "bdot must be a symmetric positive-definite Gram matrix",
            )
        })?;
        Ok(MetricTransform { upper })
    }
}

/// Upper-triangular Cholesky factor `M` of `bdot`. `|M·q|` is the
/// Cartesian magnitude of a crystal-coordinate momentum vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricTransform {
    upper: [[f64; 3]; 3],
}

impl MetricTransform {
    pub fn cartesian_length(&self, q: Vector3) -> f64 {
        norm3(matvec3(&self.upper, q))
    }
}

/// Ordered Gz axis `[-Gz_max, Gz_max]`. Fixes the output ordering of
/// every per-lattice-index array in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeAxis {
    gz_values: Vec<i64>,
}

impl LatticeAxis {
    pub fn new(gz_max: i64) -> EpsmodResult<Self> {
        if gz_max < 0 {
            return Err(EpsmodError::input_validation(
                "INPUT.GZ_MAX_NEGATIVE",
                format!("Gz_max must be non-negative, got {gz_max}"),
            ));
        }
        Ok(Self {
            gz_values: (-gz_max..=gz_max).collect(),
        })
    }

    pub fn gz_values(&self) -> &[i64] {
        &self.gz_values
    }

    pub fn len(&self) -> usize {
        self.gz_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gz_values.is_empty()
    }

    /// The requested gvectors, varying only in the third coordinate.
    pub fn wanted_gvectors(&self) -> Vec<GVector> {
        self.gz_values.iter().map(|&gz| [0, 0, gz]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CellGeometry, EpsmodErrorCategory, LatticeAxis};

    fn orthorhombic_geometry() -> CellGeometry {
        CellGeometry {
            bdot: [[4.0, 0.0, 0.0], [0.0, 9.0, 0.0], [0.0, 0.0, 0.25]],
            alat: 10.0,
            avec: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.5]],
        }
    }

    #[test]
    fn lattice_axis_is_symmetric_about_zero() {
        let axis = LatticeAxis::new(2).expect("axis should build");
        assert_eq!(axis.len(), 5);
        assert_eq!(axis.gz_values(), &[-2, -1, 0, 1, 2]);
        assert_eq!(axis.wanted_gvectors()[0], [0, 0, -2]);
        assert_eq!(axis.wanted_gvectors()[4], [0, 0, 2]);
    }

    #[test]
    fn lattice_axis_rejects_negative_gz_max() {
        let error = LatticeAxis::new(-1).expect_err("negative Gz_max should fail");
        assert_eq!(error.category(), EpsmodErrorCategory::InputValidationError);
    }

    #[test]
    fn metric_transform_recovers_gram_magnitudes() {
        let geometry = orthorhombic_geometry();
        let metric = geometry.metric_transform().expect("bdot is SPD");

        // |q|^2 = q·bdot·q for the diagonal Gram matrix.
        let qlen = metric.cartesian_length([0.5, 0.0, 0.0]);
        assert!((qlen - 1.0).abs() < 1.0e-12);
        let qlen = metric.cartesian_length([0.0, 1.0, 2.0]);
        assert!((qlen - (9.0_f64 + 4.0 * 0.25).sqrt()).abs() < 1.0e-12);
    }

    #[test]
    fn slab_length_uses_third_lattice_vector() {
        let geometry = orthorhombic_geometry();
        assert!((geometry.slab_length() - 25.0).abs() < 1.0e-12);
    }

    #[test]
    fn indefinite_gram_matrix_is_an_input_error() {
        let mut geometry = orthorhombic_geometry();
        geometry.bdot = [[1.0, 2.0, 0.0], [2.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let error = geometry
            .metric_transform()
            .expect_err("indefinite bdot should fail");
        assert_eq!(error.category(), EpsmodErrorCategory::InputValidationError);
    }
}
