use crate::domain::CellGeometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Closed-form long-range Coulomb interaction for a slab geometry,
/// evaluated per momentum magnitude and lattice index.
///
/// The truncated form multiplies the bare `8π / (|q|² + Gz²·bdot_zz)`
/// term by `1 − exp(−|q|·zc)·(−1)^Gz` with `zc = Lz/2`, which restores
/// the untruncated kernel asymptotically for large `|q|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoulombKernel {
    bdot_zz: f64,
    half_length: f64,
}

impl CoulombKernel {
    pub fn new(geometry: &CellGeometry) -> Self {
        Self {
            bdot_zz: geometry.bdot[2][2],
            half_length: geometry.slab_length() / 2.0,
        }
    }

    pub fn evaluate(&self, qlen: f64, gz: i64, truncated: bool) -> f64 {
        let g_squared = (gz * gz) as f64 * self.bdot_zz;
        let bare = 8.0 * PI / (qlen * qlen + g_squared);
        if !truncated {
            return bare;
        }
        let parity = if gz.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
        bare * (1.0 - (-qlen * self.half_length).exp() * parity)
    }

    /// Outer-product batch evaluation: one row per lattice index, one
    /// column per magnitude.
    pub fn evaluate_grid(&self, qlens: &[f64], gzs: &[i64], truncated: bool) -> Vec<Vec<f64>> {
        gzs.iter()
            .map(|&gz| {
                qlens
                    .iter()
                    .map(|&qlen| self.evaluate(qlen, gz, truncated))
                    .collect()
            })
            .collect()
    }
}
