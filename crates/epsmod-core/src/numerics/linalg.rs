use super::DenseMatrix;

const RELATIVE_PIVOT_EPSILON: f64 = 1.0e-13;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU solve requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU solve requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

/// Solves `matrix · x = rhs` by in-place LU factorization with partial
/// pivoting. Pivots below the relative threshold (scaled by the input's
/// infinity norm) abort with `SingularMatrix`.
pub fn lu_solve(matrix: &DenseMatrix, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
    let dimension = validate_square_shape(matrix)?;
    if rhs.len() != dimension {
        return Err(LuError::RhsLengthMismatch {
            expected: dimension,
            actual: rhs.len(),
        });
    }

    let pivot_threshold = matrix_infinity_norm(matrix) * RELATIVE_PIVOT_EPSILON;
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();

    for pivot_col in 0..dimension {
        let mut best_row = pivot_col;
        let mut best_abs = lu[(pivot_col, pivot_col)].abs();
        for row in (pivot_col + 1)..dimension {
            let candidate = lu[(row, pivot_col)].abs();
            if candidate > best_abs {
                best_abs = candidate;
                best_row = row;
            }
        }
        if !(best_abs > pivot_threshold) {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }

        if best_row != pivot_col {
            swap_rows(&mut lu, pivot_col, best_row);
            pivots.swap(pivot_col, best_row);
        }

        let pivot = lu[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            lu[(row, pivot_col)] /= pivot;
            let multiplier = lu[(row, pivot_col)];
            if multiplier == 0.0 {
                continue;
            }
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    let mut forward = vec![0.0; dimension];
    for row in 0..dimension {
        let mut value = rhs[pivots[row]];
        for col in 0..row {
            value -= lu[(row, col)] * forward[col];
        }
        forward[row] = value;
    }

    let mut solution = vec![0.0; dimension];
    for row in (0..dimension).rev() {
        let mut value = forward[row];
        for col in (row + 1)..dimension {
            value -= lu[(row, col)] * solution[col];
        }
        solution[row] = value / lu[(row, row)];
    }

    Ok(solution)
}

fn validate_square_shape(matrix: &DenseMatrix) -> Result<usize, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }
    Ok(rows)
}

fn swap_rows(matrix: &mut DenseMatrix, lhs: usize, rhs: usize) {
    for col in 0..matrix.ncols() {
        let value = matrix[(lhs, col)];
        matrix[(lhs, col)] = matrix[(rhs, col)];
        matrix[(rhs, col)] = value;
    }
}

fn matrix_infinity_norm(matrix: &DenseMatrix) -> f64 {
    let mut best_row_sum: f64 = 0.0;
    for row in 0..matrix.nrows() {
        let mut row_sum = 0.0;
        for col in 0..matrix.ncols() {
            row_sum += matrix[(row, col)].abs();
        }
        best_row_sum = best_row_sum.max(row_sum);
    }
    best_row_sum
}
