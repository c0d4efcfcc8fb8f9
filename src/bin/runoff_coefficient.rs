/// Runoff coefficient for a coordinate.
///
/// Usage: runoff_coefficient <latitude> <longitude> [--report] [--source soilgrids|simulated]
///
/// Prints a JSON result on stdout. Any failure prints `{"error": ...}` on
/// stderr and exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ksat_service::config::{ServiceConfig, SoilSourceKind};
use ksat_service::features::{CoordinateInput, SoilInput};
use ksat_service::logging;
use ksat_service::model::KsatError;
use ksat_service::report::{CliOutput, RunoffReport};
use ksat_service::service::AppContext;

#[derive(Parser, Debug)]
#[command(name = "runoff_coefficient", version, about = "Estimate the runoff coefficient at a location")]
struct Cli {
    /// Latitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    latitude: f64,

    /// Longitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    longitude: f64,

    /// Print the full runoff report instead of the compact result
    #[arg(long)]
    report: bool,

    /// Render the report as text rather than JSON (implies --report)
    #[arg(long)]
    text: bool,

    /// Soil data source, overriding the config file
    #[arg(long, value_parser = parse_source)]
    source: Option<SoilSourceKind>,

    /// Path to a config file (default: ksat.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_source(s: &str) -> Result<SoilSourceKind, String> {
    s.parse().map_err(|e: KsatError| e.to_string())
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{}", serde_json::json!({ "error": message }));
    ExitCode::FAILURE
}

fn run(cli: &Cli) -> Result<String, KsatError> {
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(source) = cli.source {
        config.soil_source = source;
    }

    logging::init_logger(
        config.logging.level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let ctx = AppContext::from_config(&config)?;
    let coord = CoordinateInput::new(cli.latitude, cli.longitude);
    let estimate = ctx.estimate(&SoilInput::Coordinate(coord))?;

    let rendered = if cli.text {
        RunoffReport::new(&coord, &estimate).to_text()
    } else if cli.report {
        to_json(&RunoffReport::new(&coord, &estimate))?
    } else {
        to_json(&CliOutput::from_estimate(&estimate))?
    };

    Ok(rendered)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, KsatError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| KsatError::Prediction(format!("cannot serialize result: {}", e)))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let message = e.render().to_string();
            let first_line = message.lines().next().unwrap_or("invalid arguments");
            return fail(first_line.trim_start_matches("error: "));
        }
    };

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e.to_string()),
    }
}
