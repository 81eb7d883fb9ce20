use crate::numerics::{DenseMatrix, LuError, lu_solve};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineFitError {
    #[error("degree-{degree} spline needs at least {needed} points, got {actual}")]
    TooFewPoints {
        degree: usize,
        needed: usize,
        actual: usize,
    },
    #[error("abscissa and ordinate lengths differ: {x_len} vs {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("abscissae must be non-decreasing")]
    UnsortedAbscissae,
    #[error("spline degree must be at least 1, got {degree}")]
    InvalidDegree { degree: usize },
    #[error("fit system could not be solved: {0}")]
    Solver(#[from] LuError),
}

/// Fitted one-dimensional B-spline: clamped knot vector, coefficient
/// array, and polynomial degree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    degree: usize,
}

impl BSpline {
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Evaluates by de Boor's algorithm. Arguments outside the fitted
    /// range clamp to the boundary, so the curve is constant beyond
    /// its end knots rather than extrapolated.
    pub fn evaluate(&self, x: f64) -> f64 {
        let coefficient_count = self.coefficients.len();
        let x = x.clamp(self.knots[self.degree], self.knots[coefficient_count]);
        let span = find_span(&self.knots, self.degree, coefficient_count, x);
        let basis = basis_functions(&self.knots, self.degree, span, x);
        let mut value = 0.0;
        for (offset, weight) in basis.iter().enumerate() {
            value += self.coefficients[span - self.degree + offset] * weight;
        }
        value
    }
}

/// Exact interpolating spline: clamped ends with the interior knots
/// placed by the averaging rule, then an n-by-n collocation solve.
/// Evaluating at the data abscissae reproduces the data to solver
/// precision.
pub fn fit_interpolating_spline(
    x: &[f64],
    y: &[f64],
    degree: usize,
) -> Result<BSpline, SplineFitError> {
    validate_fit_inputs(x, y, degree)?;
    let knots = interpolating_knot_vector(x, degree);
    let coefficient_count = x.len();

    let collocation = collocation_matrix(x, &knots, degree, coefficient_count);
    let coefficients = lu_solve(&collocation, y)?;

    Ok(BSpline {
        knots,
        coefficients,
        degree,
    })
}

/// Penalized least-squares spline on a thinned knot set. The penalty is
/// a second difference over the coefficient array with weight
/// `smoothing`; callers scale the configured smoothing factor by the
/// sample count before calling. A non-positive smoothing weight falls
/// back to exact interpolation.
pub fn fit_smoothing_spline(
    x: &[f64],
    y: &[f64],
    degree: usize,
    smoothing: f64,
) -> Result<BSpline, SplineFitError> {
    if smoothing <= 0.0 {
        return fit_interpolating_spline(x, y, degree);
    }
    validate_fit_inputs(x, y, degree)?;

    let knots = smoothing_knot_vector(x, degree);
    let coefficient_count = knots.len() - degree - 1;
    let sample_count = x.len();

    // Normal equations BᵀB·c = Bᵀy with the difference penalty added on
    // the left-hand side.
    let mut normal = DenseMatrix::zeros(coefficient_count, coefficient_count);
    let mut rhs = vec![0.0; coefficient_count];
    for sample in 0..sample_count {
        let span = find_span(&knots, degree, coefficient_count, x[sample]);
        let basis = basis_functions(&knots, degree, span, x[sample]);
        let first = span - degree;
        for (row_offset, row_weight) in basis.iter().enumerate() {
            rhs[first + row_offset] += row_weight * y[sample];
            for (col_offset, col_weight) in basis.iter().enumerate() {
                normal[(first + row_offset, first + col_offset)] += row_weight * col_weight;
            }
        }
    }
    if coefficient_count >= 3 {
        let stencil = [1.0, -2.0, 1.0];
        for anchor in 0..coefficient_count - 2 {
            for (row_offset, row_value) in stencil.iter().enumerate() {
                for (col_offset, col_value) in stencil.iter().enumerate() {
                    normal[(anchor + row_offset, anchor + col_offset)] +=
                        smoothing * row_value * col_value;
                }
            }
        }
    }

    let coefficients = lu_solve(&normal, &rhs)?;
    Ok(BSpline {
        knots,
        coefficients,
        degree,
    })
}

fn validate_fit_inputs(x: &[f64], y: &[f64], degree: usize) -> Result<(), SplineFitError> {
    if degree == 0 {
        return Err(SplineFitError::InvalidDegree { degree });
    }
    if x.len() != y.len() {
        return Err(SplineFitError::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    if x.len() < degree + 1 {
        return Err(SplineFitError::TooFewPoints {
            degree,
            needed: degree + 1,
            actual: x.len(),
        });
    }
    if !x.windows(2).all(|window| window[0] <= window[1]) {
        return Err(SplineFitError::UnsortedAbscissae);
    }
    Ok(())
}

/// Clamped knot vector with end multiplicity `degree + 1` and the
/// `n - degree - 1` interior knots placed by the averaging rule
/// `t_{k+1+j} = mean(x_{j+1} .. x_{j+k})`, which satisfies the
/// Schoenberg-Whitney condition for distinct abscissae.
fn interpolating_knot_vector(x: &[f64], degree: usize) -> Vec<f64> {
    let n = x.len();
    let mut knots = Vec::with_capacity(n + degree + 1);
    knots.extend(std::iter::repeat_n(x[0], degree + 1));
    for j in 0..n - degree - 1 {
        let window = &x[j + 1..j + 1 + degree];
        knots.push(window.iter().sum::<f64>() / degree as f64);
    }
    knots.extend(std::iter::repeat_n(x[n - 1], degree + 1));
    knots
}

/// Interpolating knot vector with every other interior knot removed,
/// leaving the least-squares system overdetermined.
fn smoothing_knot_vector(x: &[f64], degree: usize) -> Vec<f64> {
    let full = interpolating_knot_vector(x, degree);
    let interior = &full[degree + 1..full.len() - degree - 1];

    let n = x.len();
    let mut knots = Vec::with_capacity(full.len());
    knots.extend(std::iter::repeat_n(x[0], degree + 1));
    knots.extend(interior.iter().step_by(2));
    knots.extend(std::iter::repeat_n(x[n - 1], degree + 1));
    knots
}

fn collocation_matrix(
    x: &[f64],
    knots: &[f64],
    degree: usize,
    coefficient_count: usize,
) -> DenseMatrix {
    let mut matrix = DenseMatrix::zeros(x.len(), coefficient_count);
    for (row, &abscissa) in x.iter().enumerate() {
        let span = find_span(knots, degree, coefficient_count, abscissa);
        let basis = basis_functions(knots, degree, span, abscissa);
        for (offset, weight) in basis.iter().enumerate() {
            matrix[(row, span - degree + offset)] = *weight;
        }
    }
    matrix
}

/// Span index `s` with `knots[s] <= x < knots[s+1]`, clamped to the
/// valid range `[degree, coefficient_count - 1]`.
fn find_span(knots: &[f64], degree: usize, coefficient_count: usize, x: f64) -> usize {
    if x >= knots[coefficient_count] {
        return coefficient_count - 1;
    }
    if x <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = coefficient_count;
    while high - low > 1 {
        let mid = (low + high) / 2;
        if x < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
    }
    low
}

/// The `degree + 1` non-vanishing B-spline basis values at `x` for the
/// given span, by the standard triangular recurrence. Zero-width spans
/// contribute zero rather than dividing by zero.
fn basis_functions(knots: &[f64], degree: usize, span: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;

    for level in 1..=degree {
        left[level] = x - knots[span + 1 - level];
        right[level] = knots[span + level] - x;
        let mut saved = 0.0;
        for term in 0..level {
            let denominator = right[term + 1] + left[level - term];
            let ratio = if denominator != 0.0 {
                values[term] / denominator
            } else {
                0.0
            };
            values[term] = saved + right[term + 1] * ratio;
            saved = left[level - term] * ratio;
        }
        values[level] = saved;
    }

    values
}
