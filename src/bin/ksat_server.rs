/// Ksat prediction API server.
///
/// Loads configuration (ksat.toml, .env, KSAT_* variables), loads the model
/// and serves the HTTP API until killed. A missing model is fatal unless the
/// soil source is simulated.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ksat_service::config::{ServiceConfig, SoilSourceKind};
use ksat_service::logging::{self, Component};
use ksat_service::model::KsatError;
use ksat_service::server;
use ksat_service::service::AppContext;

#[derive(Parser, Debug)]
#[command(name = "ksat_server", version, about = "Serve Ksat predictions over HTTP")]
struct Cli {
    /// Path to a config file (default: ksat.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:8000
    #[arg(long)]
    bind: Option<String>,

    /// Soil data source, overriding the config file
    #[arg(long, value_parser = parse_source)]
    source: Option<SoilSourceKind>,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,
}

fn parse_source(s: &str) -> Result<SoilSourceKind, String> {
    s.parse().map_err(|e: KsatError| e.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(source) = cli.source {
        config.soil_source = source;
    }
    if let Some(workers) = cli.workers {
        config.server_workers = workers;
    }
    config.validate()?;

    logging::init_logger(
        config.logging.level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    println!("🌱 Ksat Prediction Service");
    println!("==========================\n");

    let ctx = match AppContext::from_config(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            logging::error(Component::System, None, &format!("Startup failed: {}", e));
            return Err(e.into());
        }
    };

    if let Some(predictor) = ctx.predictor() {
        println!(
            "   Model: {} ({} trees)",
            predictor
                .origin()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<in-memory>".to_string()),
            predictor.tree_count()
        );
    } else {
        println!("   Model: none (synthetic Ksat from simulated soil)");
    }
    println!("   Soil source: {}", ctx.soil_source().name());
    println!("   Listening on http://{}\n", config.bind_addr);

    server::serve(Arc::new(ctx), &config.bind_addr, config.server_workers)?;
    Ok(())
}
