//! Numerical regression checks for the spline primitives and the
//! Coulomb kernel, independent of the ingestion pipeline.

use epsmod_core::domain::CellGeometry;
use epsmod_core::modeler::{
    CoulombKernel, SplineFitError, fit_interpolating_spline, fit_smoothing_spline,
};

fn chebyshev_like_grid(count: usize, span: f64) -> Vec<f64> {
    (0..count)
        .map(|index| span * index as f64 / (count - 1) as f64)
        .collect()
}

#[test]
fn interpolation_reproduces_data_for_every_supported_degree() {
    let x = chebyshev_like_grid(9, 2.0);
    let y: Vec<f64> = x.iter().map(|&v| (1.5 * v).sin() + 0.3 * v).collect();

    for degree in 1..=4 {
        let spline =
            fit_interpolating_spline(&x, &y, degree).expect("fit should succeed");
        for (&abscissa, &expected) in x.iter().zip(&y) {
            let actual = spline.evaluate(abscissa);
            assert!(
                (actual - expected).abs() < 1.0e-8,
                "degree {degree} at x={abscissa}: {actual} vs {expected}"
            );
        }
    }
}

#[test]
fn cubic_interpolation_converges_between_samples() {
    // Halving the grid spacing must shrink the off-grid error; the
    // target function is smooth so a cubic fit converges fast.
    let target = |v: f64| (-v).exp() * (3.0 * v).cos();
    let error_with = |count: usize| {
        let x = chebyshev_like_grid(count, 2.0);
        let y: Vec<f64> = x.iter().map(|&v| target(v)).collect();
        let spline = fit_interpolating_spline(&x, &y, 3).expect("fit should succeed");
        (0..200)
            .map(|step| {
                let probe = 2.0 * step as f64 / 199.0;
                (spline.evaluate(probe) - target(probe)).abs()
            })
            .fold(0.0_f64, f64::max)
    };

    let coarse = error_with(9);
    let fine = error_with(17);
    assert!(fine < coarse / 4.0, "coarse {coarse}, fine {fine}");
    assert!(fine < 1.0e-3);
}

#[test]
fn smoothing_spline_damps_oscillatory_noise() {
    // Deterministic high-frequency contamination around a flat level.
    // The basis is a partition of unity, so a heavily penalized fit
    // collapses toward the least-squares constant, which for 41
    // alternating samples sits within 0.005 of the level.
    let x = chebyshev_like_grid(41, 4.0);
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(index, _)| 1.0 + if index % 2 == 0 { 0.2 } else { -0.2 })
        .collect();

    let smoothed = fit_smoothing_spline(&x, &y, 3, 100.0 * x.len() as f64)
        .expect("fit should succeed");
    let interpolated = fit_interpolating_spline(&x, &y, 3).expect("fit should succeed");

    let residual: f64 = x
        .iter()
        .map(|&v| (smoothed.evaluate(v) - 1.0).abs())
        .fold(0.0, f64::max);
    assert!(residual < 0.1, "level residual {residual}");

    // Exact interpolation keeps the full contamination at the data
    // points; smoothing is what removes it.
    let retained = (interpolated.evaluate(x[10]) - 1.0).abs();
    assert!((retained - 0.2).abs() < 1.0e-6, "retained {retained}");
}

#[test]
fn rejected_inputs_carry_specific_error_variants() {
    assert_eq!(
        fit_interpolating_spline(&[0.0, 1.0], &[0.0, 1.0, 2.0], 1),
        Err(SplineFitError::LengthMismatch { x_len: 2, y_len: 3 })
    );
    assert_eq!(
        fit_interpolating_spline(&[0.0, 1.0], &[0.0, 1.0], 0),
        Err(SplineFitError::InvalidDegree { degree: 0 })
    );
    assert!(matches!(
        fit_smoothing_spline(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], 3, 1.0),
        Err(SplineFitError::TooFewPoints { .. })
    ));
}

#[test]
fn kernel_is_continuous_across_a_fine_magnitude_sweep() {
    let kernel = CoulombKernel::new(&CellGeometry {
        bdot: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.5]],
        alat: 8.0,
        avec: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 3.0]],
    });

    for gz in [-2_i64, -1, 0, 1, 2] {
        let mut previous: Option<f64> = None;
        for step in 1..=2000 {
            let qlen = step as f64 * 0.005;
            let value = kernel.evaluate(qlen, gz, true);
            assert!(value.is_finite() && value > 0.0, "gz={gz} qlen={qlen}");
            // The kernel diverges like 1/q toward the origin, so the
            // step-to-step bound only holds away from it.
            if qlen >= 0.5
                && let Some(previous) = previous
            {
                let relative = ((value - previous) / previous).abs();
                assert!(relative < 0.05, "gz={gz} qlen={qlen} jump {relative}");
            }
            previous = Some(value);
        }
    }
}
