pub mod aggregate;
pub mod kernel;
pub mod model;
pub mod selector;
pub mod spline;

pub use aggregate::{AggregatedDataset, Aggregator, IMAGINARY_TOLERANCE, IngestSummary};
pub use kernel::CoulombKernel;
pub use model::{ModelKind, ModelerConfig, SplineModel, SplineModeler, SplineParamRecord};
pub use selector::LatticeSelector;
pub use spline::{BSpline, SplineFitError, fit_interpolating_spline, fit_smoothing_spline};
