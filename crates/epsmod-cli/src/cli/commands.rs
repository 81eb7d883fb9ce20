use super::CliError;
use anyhow::Context as _;
use epsmod_core::domain::LatticeAxis;
use epsmod_core::modeler::{
    Aggregator, CoulombKernel, ModelKind, ModelerConfig, SplineModel, SplineModeler,
};
use epsmod_core::sources::{InMemoryEpsmat, load_cell_geometry};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct FitArgs {
    /// Geometry (wfn header) file
    geometry: PathBuf,

    /// One or more epsmat files, aggregated in order
    #[arg(required = true)]
    epsmats: Vec<PathBuf>,

    /// Keep lattice vectors up to |Gz| <= GZ_MAX
    #[arg(long = "gz-max", default_value_t = 0)]
    gz_max: i64,

    /// Keep q-points with |q| <= AVGCUT_XY; 0.0 keeps all q-points
    #[arg(long = "avgcut-xy", default_value_t = 0.0)]
    avgcut_xy: f64,

    /// Order of the spline polynomial
    #[arg(short = 'k', long, default_value_t = 3)]
    degree: usize,

    /// Non-zero value performs a smoothing spline interpolation
    #[arg(short, long, default_value_t = 0.0)]
    smooth: f64,

    /// Which model to use (0-2)
    #[arg(short, long, default_value_t = 1)]
    model: u8,

    /// Dump the fitted model to FILE as JSON
    #[arg(short, long, value_name = "FILE")]
    dump: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ShowArgs {
    /// Model file produced by `fit --dump`
    model: PathBuf,
}

pub(super) fn run_fit_command(args: FitArgs) -> Result<i32, CliError> {
    if args.avgcut_xy < 0.0 {
        return Err(CliError::Usage(format!(
            "--avgcut-xy must be non-negative, got {}",
            args.avgcut_xy
        )));
    }
    // 0.0 is the keep-everything sentinel.
    let cutoff = (args.avgcut_xy > 0.0).then_some(args.avgcut_xy);

    let geometry = load_cell_geometry(&args.geometry)?;
    let axis = LatticeAxis::new(args.gz_max)?;
    let metric = geometry.metric_transform()?;

    let mut aggregator = Aggregator::new(axis, metric, cutoff);
    for path in &args.epsmats {
        info!(path = %path.display(), "aggregating epsmat file");
        let mut source = InMemoryEpsmat::from_json_file(path)?;
        aggregator.ingest(&mut source)?;
    }
    let dataset = aggregator.finalize();

    let modeler = SplineModeler::new(
        CoulombKernel::new(&geometry),
        ModelerConfig {
            kind: ModelKind::from_index(args.model)?,
            degree: args.degree,
            smoothing: args.smooth,
            truncated: true,
        },
    )?;
    let model = modeler.fit(&dataset)?;

    print_report(&model)?;

    if let Some(dump) = &args.dump {
        info!(path = %dump.display(), "dumping fitted model");
        model.save_json(dump)?;
    }
    Ok(0)
}

pub(super) fn run_show_command(args: ShowArgs) -> Result<i32, CliError> {
    let model = SplineModel::load_json(&args.model)?;
    print_report(&model)?;
    Ok(0)
}

fn print_report(model: &SplineModel) -> Result<(), CliError> {
    use std::io::Write as _;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(model.render_params_report().as_bytes())
        .and_then(|()| stdout.flush())
        .context("writing parameter report to stdout")?;
    Ok(())
}
