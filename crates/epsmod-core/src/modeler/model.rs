use super::aggregate::AggregatedDataset;
use super::kernel::CoulombKernel;
use super::spline::{BSpline, SplineFitError, fit_interpolating_spline, fit_smoothing_spline};
use crate::domain::{EpsmodError, EpsmodResult, FitResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

/// Which quantity the splines are fitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Fit the dielectric diagonal as stored.
    Raw,
    /// Fit the susceptibility `chi = (eps - 1) / v`, with a synthetic
    /// origin sample for even lattice indices so that `eps(q->0) = 1`.
    Susceptibility,
    /// Susceptibility additionally divided by the magnitude on even
    /// lattice indices, without the synthetic origin sample.
    ScaledSusceptibility,
}

impl ModelKind {
    pub fn from_index(index: u8) -> EpsmodResult<Self> {
        match index {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Susceptibility),
            2 => Ok(Self::ScaledSusceptibility),
            other => Err(EpsmodError::input_validation(
                "INPUT.MODEL_KIND",
                format!("model kind must be 0, 1, or 2, got {other}"),
            )),
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Susceptibility => 1,
            Self::ScaledSusceptibility => 2,
        }
    }
}

/// Fit configuration shared by every lattice index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelerConfig {
    pub kind: ModelKind,
    pub degree: usize,
    pub smoothing: f64,
    pub truncated: bool,
}

impl Default for ModelerConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Susceptibility,
            degree: 3,
            smoothing: 0.0,
            truncated: true,
        }
    }
}

/// Fits one spline per lattice index of an aggregated dataset.
#[derive(Debug, Clone)]
pub struct SplineModeler {
    kernel: CoulombKernel,
    config: ModelerConfig,
}

impl SplineModeler {
    pub fn new(kernel: CoulombKernel, config: ModelerConfig) -> EpsmodResult<Self> {
        if config.degree == 0 {
            return Err(EpsmodError::input_validation(
                "INPUT.DEGREE_TOO_SMALL",
                "spline degree must be at least 1",
            ));
        }
        if config.smoothing < 0.0 {
            return Err(EpsmodError::input_validation(
                "INPUT.SMOOTHING_NEGATIVE",
                format!("smoothing factor must be non-negative, got {}", config.smoothing),
            ));
        }
        Ok(Self { kernel, config })
    }

    pub fn fit(&self, dataset: &AggregatedDataset) -> FitResult<SplineModel> {
        let mut entries = Vec::with_capacity(dataset.gz_values().len());
        for (row, &gz) in dataset.values().iter().zip(dataset.gz_values()) {
            let (x, y) = self.transformed_samples(dataset.qlens(), row, gz)?;

            // The zero lattice index is always interpolated exactly;
            // every other index smooths with a weight scaled by the
            // sample count.
            let result = if gz == 0 {
                fit_interpolating_spline(&x, &y, self.config.degree)
            } else {
                fit_smoothing_spline(
                    &x,
                    &y,
                    self.config.degree,
                    self.config.smoothing * x.len() as f64,
                )
            };
            let spline = result.map_err(|error| fit_error(gz, error))?;
            info!(
                gz,
                samples = x.len(),
                knots = spline.knots().len(),
                "fitted spline"
            );
            entries.push(ModelEntry { gz, spline });
        }

        Ok(SplineModel {
            kind: self.config.kind,
            degree: self.config.degree,
            truncated: self.config.truncated,
            cutoff: dataset.cutoff(),
            kernel: self.kernel,
            entries,
        })
    }

    fn transformed_samples(
        &self,
        qlens: &[f64],
        row: &[f64],
        gz: i64,
    ) -> FitResult<(Vec<f64>, Vec<f64>)> {
        let even = gz.rem_euclid(2) == 0;
        match self.config.kind {
            ModelKind::Raw => Ok((qlens.to_vec(), row.to_vec())),
            ModelKind::Susceptibility => {
                let mut x = Vec::with_capacity(qlens.len() + 1);
                let mut y = Vec::with_capacity(qlens.len() + 1);
                if even {
                    x.push(0.0);
                    y.push(0.0);
                }
                for (&qlen, &eps) in qlens.iter().zip(row) {
                    x.push(qlen);
                    y.push((eps - 1.0) / self.kernel.evaluate(qlen, gz, self.config.truncated));
                }
                Ok((x, y))
            }
            ModelKind::ScaledSusceptibility => {
                let mut y = Vec::with_capacity(qlens.len());
                for (&qlen, &eps) in qlens.iter().zip(row) {
                    let mut chi =
                        (eps - 1.0) / self.kernel.evaluate(qlen, gz, self.config.truncated);
                    if even {
                        if qlen == 0.0 {
                            return Err(EpsmodError::computation(
                                "FIT.ZERO_MAGNITUDE_SCALE",
                                format!(
                                    "lattice index {gz} cannot be magnitude-scaled at |q| = 0"
                                ),
                            ));
                        }
                        chi /= qlen;
                    }
                    y.push(chi);
                }
                Ok((qlens.to_vec(), y))
            }
        }
    }
}

fn fit_error(gz: i64, error: SplineFitError) -> EpsmodError {
    match error {
        SplineFitError::TooFewPoints {
            degree,
            needed,
            actual,
        } => EpsmodError::insufficient_data(
            "FIT.TOO_FEW_POINTS",
            format!(
                "lattice index {gz} has {actual} samples; a degree-{degree} fit needs {needed}"
            ),
        ),
        SplineFitError::Solver(source) => EpsmodError::computation(
            "FIT.SINGULAR_SYSTEM",
            format!("lattice index {gz} fit system is singular: {source}"),
        ),
        other => EpsmodError::internal(
            "SYS.FIT_INVARIANT",
            format!("lattice index {gz} fit rejected prepared samples: {other}"),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelEntry {
    gz: i64,
    spline: BSpline,
}

/// One fitted spline per lattice index, plus everything needed to map
/// a raw spline value back to the dielectric diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineModel {
    kind: ModelKind,
    degree: usize,
    truncated: bool,
    cutoff: Option<f64>,
    kernel: CoulombKernel,
    entries: Vec<ModelEntry>,
}

/// Self-describing export of one fitted spline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineParamRecord {
    pub gz: i64,
    pub knot_count: usize,
    pub knots: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub degree: usize,
}

impl SplineModel {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    pub fn gz_values(&self) -> Vec<i64> {
        self.entries.iter().map(|entry| entry.gz).collect()
    }

    fn entry(&self, gz: i64) -> EpsmodResult<&ModelEntry> {
        self.entries
            .iter()
            .find(|entry| entry.gz == gz)
            .ok_or_else(|| {
                EpsmodError::input_validation(
                    "MODEL.GZ_NOT_FITTED",
                    format!("lattice index {gz} is not part of the fitted model"),
                )
            })
    }

    /// Raw fitted-curve value, in whatever space the model kind fits.
    pub fn evaluate(&self, gz: i64, qlen: f64) -> EpsmodResult<f64> {
        Ok(self.entry(gz)?.spline.evaluate(qlen))
    }

    /// Fitted curve mapped back to the dielectric diagonal.
    pub fn evaluate_epsinv(&self, gz: i64, qlen: f64) -> EpsmodResult<f64> {
        let raw = self.evaluate(gz, qlen)?;
        let value = match self.kind {
            ModelKind::Raw => raw,
            ModelKind::Susceptibility => {
                1.0 + self.kernel.evaluate(qlen, gz, self.truncated) * raw
            }
            ModelKind::ScaledSusceptibility => {
                let kernel = self.kernel.evaluate(qlen, gz, self.truncated);
                if gz.rem_euclid(2) == 0 {
                    1.0 + kernel * raw * qlen
                } else {
                    1.0 + kernel * raw
                }
            }
        };
        Ok(value)
    }

    /// Flat parameter records, one per lattice index in axis order.
    pub fn export_params(&self) -> Vec<SplineParamRecord> {
        self.entries
            .iter()
            .map(|entry| SplineParamRecord {
                gz: entry.gz,
                knot_count: entry.spline.knots().len(),
                knots: entry.spline.knots().to_vec(),
                coefficients: entry.spline.coefficients().to_vec(),
                degree: self.degree,
            })
            .collect()
    }

    /// Plain-text parameter block, one `(n, t, c, k)` stanza per
    /// lattice index.
    pub fn render_params_report(&self) -> String {
        let mut report = String::new();
        report.push_str("Splines Data (n,t,c,k):\n");
        let _ = writeln!(
            report,
            "{} {}",
            self.entries.len(),
            self.cutoff.unwrap_or(0.0)
        );
        for record in self.export_params() {
            let _ = writeln!(report, "{}", record.gz);
            let _ = writeln!(report, "{}", record.knot_count);
            let _ = writeln!(report, "{}", join_numbers(&record.knots));
            let _ = writeln!(report, "{}", join_numbers(&record.coefficients));
            let _ = writeln!(report, "{}", record.degree);
        }
        report
    }

    pub fn save_json(&self, path: &Path) -> EpsmodResult<()> {
        let payload = serde_json::to_string_pretty(self).map_err(|source| {
            EpsmodError::internal(
                "SYS.MODEL_SERIALIZE",
                format!("failed to serialize model: {source}"),
            )
        })?;
        fs::write(path, payload).map_err(|source| {
            EpsmodError::io_system(
                "IO.MODEL_WRITE",
                format!("failed to write model file '{}': {}", path.display(), source),
            )
        })
    }

    pub fn load_json(path: &Path) -> EpsmodResult<Self> {
        let payload = fs::read_to_string(path).map_err(|source| {
            EpsmodError::io_system(
                "IO.MODEL_READ",
                format!("failed to read model file '{}': {}", path.display(), source),
            )
        })?;
        serde_json::from_str(&payload).map_err(|source| {
            EpsmodError::input_validation(
                "INPUT.MODEL_PARSE",
                format!("failed to parse model file '{}': {}", path.display(), source),
            )
        })
    }
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
