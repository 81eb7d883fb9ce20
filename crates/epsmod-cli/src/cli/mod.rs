mod commands;

use clap::Parser;
use epsmod_core::domain::EpsmodError;

pub fn run_from_env() -> i32 {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_epsmod_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            diagnostic.exit_code()
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "epsmod-rs", about = "Dielectric-matrix spline modeler")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Aggregate epsmat sources and fit one spline per lattice index
    Fit(commands::FitArgs),
    /// Print the parameter report of a previously dumped model
    Show(commands::ShowArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Fit(args) => commands::run_fit_command(args),
        CliCommand::Show(args) => commands::run_show_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(EpsmodError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EpsmodError> for CliError {
    fn from(error: EpsmodError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_epsmod_error(&self) -> EpsmodError {
        match self {
            Self::Usage(message) => {
                EpsmodError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => EpsmodError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
