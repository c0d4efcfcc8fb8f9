/// Service configuration.
///
/// Settings come from a TOML file (`ksat.toml` by default, or the path in
/// `KSAT_CONFIG`) with environment overrides on top. A `.env` file in the
/// working directory is loaded first, so overrides can live there too.
///
/// ```toml
/// model_path = "models/ksat_model.json"
/// soil_source = "soilgrids"        # or "simulated"
/// bind_addr = "0.0.0.0:8000"
/// server_workers = 4
///
/// [gateway]
/// soilgrids_base_url = "https://rest.isric.org"
/// open_meteo_base_url = "https://archive-api.open-meteo.com"
/// timeout_secs = 30
/// max_attempts = 3
/// backoff_ms = 200
///
/// [logging]
/// level = "info"
/// file = "ksat_service.log"
/// timestamps = true
/// ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::ingest::{open_meteo, soilgrids, RetryPolicy};
use crate::logging::LogLevel;
use crate::model::KsatError;

pub const DEFAULT_CONFIG_PATH: &str = "ksat.toml";

// ---------------------------------------------------------------------------
// Soil source selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilSourceKind {
    SoilGrids,
    Simulated,
}

impl FromStr for SoilSourceKind {
    type Err = KsatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soilgrids" => Ok(SoilSourceKind::SoilGrids),
            "simulated" => Ok(SoilSourceKind::Simulated),
            other => Err(KsatError::Config(format!(
                "unknown soil source '{}' (expected 'soilgrids' or 'simulated')",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub soilgrids_base_url: String,
    pub open_meteo_base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            soilgrids_base_url: soilgrids::DEFAULT_BASE_URL.to_string(),
            open_meteo_base_url: open_meteo::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<LogLevel, KsatError> {
        self.level.parse().map_err(KsatError::Config)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub soil_source: SoilSourceKind,
    /// Salt for the simulated source's coordinate seeds.
    pub simulation_seed: u64,
    pub bind_addr: String,
    pub server_workers: usize,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ksat_model.json"),
            soil_source: SoilSourceKind::SoilGrids,
            simulation_seed: 0,
            bind_addr: "0.0.0.0:8000".to_string(),
            server_workers: 4,
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    pub fn from_toml(text: &str) -> Result<Self, KsatError> {
        toml::from_str(text).map_err(|e| KsatError::Config(format!("invalid config: {}", e)))
    }

    /// Loads configuration the way the binaries do: `.env`, then the TOML
    /// file (if present), then `KSAT_*` environment overrides.
    ///
    /// An explicit `path` must exist; the default path may be absent, in
    /// which case built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, KsatError> {
        dotenv::dotenv().ok();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("KSAT_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                let text = fs::read_to_string(&path).map_err(|e| {
                    KsatError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(text) => Self::from_toml(&text)?,
                Err(_) => Self::default(),
            },
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `KSAT_*` overrides. `lookup` is `env::var` in production and
    /// a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), KsatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("KSAT_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(source) = lookup("KSAT_SOIL_SOURCE") {
            self.soil_source = source.parse()?;
        }
        if let Some(addr) = lookup("KSAT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(level) = lookup("KSAT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = lookup("KSAT_LOG_FILE") {
            self.logging.file = Some(file);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), KsatError> {
        if self.server_workers == 0 {
            return Err(KsatError::Config("server_workers must be at least 1".to_string()));
        }
        if self.gateway.max_attempts == 0 {
            return Err(KsatError::Config("gateway.max_attempts must be at least 1".to_string()));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(KsatError::Config("gateway.timeout_secs must be at least 1".to_string()));
        }
        self.logging.level()?;
        Ok(())
    }
}
