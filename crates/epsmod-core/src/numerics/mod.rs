pub mod linalg;

pub use linalg::{LuError, lu_solve};

use faer::Mat;
use num_complex::Complex64;

pub type DenseMatrix = Mat<f64>;
pub type DenseComplexMatrix = Mat<Complex64>;

const GRAM_SYMMETRY_TOLERANCE: f64 = 1.0e-10;

pub fn deterministic_argsort(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_unstable_by(|lhs, rhs| {
        values[*lhs]
            .total_cmp(&values[*rhs])
            .then_with(|| lhs.cmp(rhs))
    });
    indices
}

pub fn matvec3(matrix: &[[f64; 3]; 3], vector: [f64; 3]) -> [f64; 3] {
    let mut product = [0.0; 3];
    for (row, product_entry) in product.iter_mut().enumerate() {
        *product_entry = matrix[row][0] * vector[0]
            + matrix[row][1] * vector[1]
            + matrix[row][2] * vector[2];
    }
    product
}

pub fn norm3(vector: [f64; 3]) -> f64 {
    (vector[0] * vector[0] + vector[1] * vector[1] + vector[2] * vector[2]).sqrt()
}

/// Upper-triangular factor `M` with `Mᵀ·M = gram`. Returns `None` when
/// the input is not symmetric positive-definite.
pub fn cholesky_upper_3x3(gram: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    for row in 0..3 {
        for col in (row + 1)..3 {
            if (gram[row][col] - gram[col][row]).abs() > GRAM_SYMMETRY_TOLERANCE {
                return None;
            }
        }
    }

    let mut lower = [[0.0; 3]; 3];
    for row in 0..3 {
        for col in 0..=row {
            let mut sum = gram[row][col];
            for inner in 0..col {
                sum -= lower[row][inner] * lower[col][inner];
            }
            if row == col {
                if sum <= 0.0 {
                    return None;
                }
                lower[row][col] = sum.sqrt();
            } else {
                lower[row][col] = sum / lower[col][col];
            }
        }
    }

    let mut upper = [[0.0; 3]; 3];
    for row in 0..3 {
        for col in row..3 {
            upper[row][col] = lower[col][row];
        }
    }
    Some(upper)
}
