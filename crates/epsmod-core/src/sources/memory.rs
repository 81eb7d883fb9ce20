use super::EpsmatSource;
use crate::domain::{CellGeometry, EpsmodError, EpsmodResult, GVector, Vector3};
use crate::numerics::DenseComplexMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Fully materialized epsmat source backed by host memory. Serves both
/// as the JSON interchange loader for the CLI and as the synthetic
/// source used throughout the test suites.
#[derive(Debug, Clone)]
pub struct InMemoryEpsmat {
    label: String,
    qpoints: Vec<Vector3>,
    gvectors: Vec<GVector>,
    local_sorts: Vec<Vec<usize>>,
    matrices: Vec<DenseComplexMatrix>,
    cursor: usize,
}

impl InMemoryEpsmat {
    pub fn new(
        label: impl Into<String>,
        qpoints: Vec<Vector3>,
        gvectors: Vec<GVector>,
        local_sorts: Vec<Vec<usize>>,
        matrices: Vec<DenseComplexMatrix>,
    ) -> EpsmodResult<Self> {
        let label = label.into();
        if local_sorts.len() != qpoints.len() || matrices.len() != qpoints.len() {
            return Err(EpsmodError::input_validation(
                "INPUT.EPSMAT_SHAPE",
                format!(
                    "source '{}' has {} q-points but {} sort permutations and {} matrices",
                    label,
                    qpoints.len(),
                    local_sorts.len(),
                    matrices.len()
                ),
            ));
        }
        for (index, local_sort) in local_sorts.iter().enumerate() {
            if local_sort.len() != gvectors.len() {
                return Err(EpsmodError::input_validation(
                    "INPUT.EPSMAT_SORT_SHAPE",
                    format!(
                        "source '{}' q-point {} has a sort permutation of length {} for {} gvectors",
                        label,
                        index + 1,
                        local_sort.len(),
                        gvectors.len()
                    ),
                ));
            }
        }
        for (index, matrix) in matrices.iter().enumerate() {
            if matrix.nrows() != matrix.ncols() {
                return Err(EpsmodError::input_validation(
                    "INPUT.EPSMAT_MATRIX_SHAPE",
                    format!(
                        "source '{}' q-point {} stores a {}x{} matrix; expected square",
                        label,
                        index + 1,
                        matrix.nrows(),
                        matrix.ncols()
                    ),
                ));
            }
        }

        Ok(Self {
            label,
            qpoints,
            gvectors,
            local_sorts,
            matrices,
            cursor: 0,
        })
    }

    pub fn from_json_file(path: &Path) -> EpsmodResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            EpsmodError::io_system(
                "IO.EPSMAT_READ",
                format!("failed to read epsmat file '{}': {}", path.display(), source),
            )
        })?;
        let dto: EpsmatFileDto = serde_json::from_str(&source).map_err(|source| {
            EpsmodError::input_validation(
                "INPUT.EPSMAT_PARSE",
                format!(
                    "failed to parse epsmat file '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;

        let label = dto
            .label
            .unwrap_or_else(|| path.display().to_string());
        let mut matrices = Vec::with_capacity(dto.matrices.len());
        for (index, matrix) in dto.matrices.into_iter().enumerate() {
            matrices.push(matrix.into_dense(&label, index)?);
        }
        Self::new(label, dto.qpoints, dto.gvectors, dto.local_sorts, matrices)
    }

    fn take_cursor(&mut self) -> EpsmodResult<usize> {
        if self.cursor >= self.matrices.len() {
            return Err(EpsmodError::internal(
                "SYS.EPSMAT_CURSOR_EXHAUSTED",
                format!(
                    "source '{}' has no stored matrix left to consume (cursor at {} of {})",
                    self.label,
                    self.cursor,
                    self.matrices.len()
                ),
            ));
        }
        let position = self.cursor;
        self.cursor += 1;
        Ok(position)
    }
}

impl EpsmatSource for InMemoryEpsmat {
    fn label(&self) -> &str {
        &self.label
    }

    fn qpoint_count(&self) -> usize {
        self.qpoints.len()
    }

    fn qpoint(&self, index: usize) -> Vector3 {
        self.qpoints[index]
    }

    fn stored_gvectors(&self) -> &[GVector] {
        &self.gvectors
    }

    fn local_sort(&self, index: usize) -> &[usize] {
        &self.local_sorts[index]
    }

    fn read_qpoint(&mut self) -> EpsmodResult<DenseComplexMatrix> {
        let position = self.take_cursor()?;
        Ok(self.matrices[position].clone())
    }

    fn skip_qpoint(&mut self) -> EpsmodResult<()> {
        self.take_cursor()?;
        Ok(())
    }
}

/// JSON interchange form of the epsmat accessor contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpsmatFileDto {
    #[serde(default)]
    pub label: Option<String>,
    pub qpoints: Vec<[f64; 3]>,
    pub gvectors: Vec<[i64; 3]>,
    pub local_sorts: Vec<Vec<usize>>,
    pub matrices: Vec<MatrixDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixDto {
    pub dimension: usize,
    /// Row-major complex entries, `dimension * dimension` of them.
    pub entries: Vec<ComplexEntryDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplexEntryDto {
    pub re: f64,
    pub im: f64,
}

impl MatrixDto {
    fn into_dense(self, label: &str, index: usize) -> EpsmodResult<DenseComplexMatrix> {
        if self.entries.len() != self.dimension * self.dimension {
            return Err(EpsmodError::input_validation(
                "INPUT.EPSMAT_MATRIX_ENTRIES",
                format!(
                    "source '{}' q-point {} declares dimension {} but carries {} entries",
                    label,
                    index + 1,
                    self.dimension,
                    self.entries.len()
                ),
            ));
        }
        let mut dense = DenseComplexMatrix::zeros(self.dimension, self.dimension);
        for (flat, entry) in self.entries.iter().enumerate() {
            let row = flat / self.dimension;
            let col = flat % self.dimension;
            dense[(row, col)] = Complex64::new(entry.re, entry.im);
        }
        Ok(dense)
    }
}

pub fn load_cell_geometry(path: &Path) -> EpsmodResult<CellGeometry> {
    let source = fs::read_to_string(path).map_err(|source| {
        EpsmodError::io_system(
            "IO.WFN_READ",
            format!(
                "failed to read geometry file '{}': {}",
                path.display(),
                source
            ),
        )
    })?;
    serde_json::from_str(&source).map_err(|source| {
        EpsmodError::input_validation(
            "INPUT.WFN_PARSE",
            format!(
                "failed to parse geometry file '{}': {}",
                path.display(),
                source
            ),
        )
    })
}
