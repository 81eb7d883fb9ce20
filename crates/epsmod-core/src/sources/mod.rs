pub mod memory;

pub use memory::{InMemoryEpsmat, load_cell_geometry};

use crate::domain::{EpsmodResult, GVector, Vector3};
use crate::numerics::DenseComplexMatrix;

/// Accessor contract of an epsmat-style data source.
///
/// Header data (q-points, gvectors, per-q-point sort permutations) is
/// random access. The matrix reader is cursor-based: every q-point's
/// stored matrix must be consumed exactly once, in source-native order,
/// either by `read_qpoint` or by `skip_qpoint`.
pub trait EpsmatSource {
    fn label(&self) -> &str;

    fn qpoint_count(&self) -> usize;

    /// Momentum-transfer vector in crystal coordinates.
    fn qpoint(&self, index: usize) -> Vector3;

    /// Stored reciprocal-lattice vectors, shared across q-points.
    fn stored_gvectors(&self) -> &[GVector];

    /// 1-based positions into the q-point's local matrix storage,
    /// indexed by global gvector index.
    fn local_sort(&self, index: usize) -> &[usize];

    /// Reads the next stored matrix and advances the cursor.
    fn read_qpoint(&mut self) -> EpsmodResult<DenseComplexMatrix>;

    /// Discards the next stored matrix, advancing the cursor without
    /// materializing the data.
    fn skip_qpoint(&mut self) -> EpsmodResult<()>;
}
