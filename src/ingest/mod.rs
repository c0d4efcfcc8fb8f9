/// Third-party data gateways.
///
/// Submodules:
/// - `soilgrids`: ISRIC SoilGrids topsoil sand/silt/clay/OCD.
/// - `open_meteo`: Open-Meteo archive precipitation.
///
/// This module holds what they share: the blocking HTTP client, a bounded
/// retry policy for transient failures, and `SoilSource`, the configured
/// provider of coordinate soil data.

pub mod open_meteo;
pub mod soilgrids;

use std::thread;
use std::time::Duration;

use crate::features::{CoordinateInput, SourceReading};
use crate::model::{GatewayError, KsatError};
use crate::simulation::SimulatedSoilSource;

use self::soilgrids::SoilGridsClient;

// ---------------------------------------------------------------------------
// HTTP plumbing
// ---------------------------------------------------------------------------

/// Builds the shared blocking client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, KsatError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ksat_service/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| KsatError::Config(format!("cannot build HTTP client: {}", e)))
}

/// GETs `url` with `query` and decodes the body as JSON.
pub fn get_json(
    client: &reqwest::blocking::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<serde_json::Value, GatewayError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .query(query)
        .send()
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(GatewayError::Http(response.status().as_u16()));
    }

    let body = response
        .text()
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    serde_json::from_str(&body).map_err(|e| GatewayError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded retries with linear backoff. Only transient errors
/// (`GatewayError::is_transient`) are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    /// Sleeps `backoff * attempt` between tries.
    pub fn run<T, F>(&self, mut op: F) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Result<T, GatewayError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Soil source
// ---------------------------------------------------------------------------

/// Where coordinate soil data comes from. Picked once from configuration;
/// the two are never mixed within a process.
#[derive(Debug, Clone)]
pub enum SoilSource {
    SoilGrids(SoilGridsClient),
    Simulated(SimulatedSoilSource),
}

impl SoilSource {
    pub fn read(&self, coord: &CoordinateInput) -> SourceReading {
        match self {
            SoilSource::SoilGrids(client) => SourceReading::Gateway(client.fetch_sample(coord)),
            SoilSource::Simulated(sim) => SourceReading::Simulated(sim.generate(coord)),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, SoilSource::Simulated(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SoilSource::SoilGrids(_) => "soilgrids",
            SoilSource::Simulated(_) => "simulated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn test_retry_stops_after_first_success() {
        let calls = Cell::new(0);
        let result = fast_policy(3).run(|attempt| {
            calls.set(calls.get() + 1);
            if attempt < 2 {
                Err(GatewayError::Http(503))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_retry_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast_policy(3).run(|_| {
            calls.set(calls.get() + 1);
            Err(GatewayError::Transport("connection reset".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast_policy(5).run(|_| {
            calls.set(calls.get() + 1);
            Err(GatewayError::NoData("clay".into()))
        });
        assert_eq!(result, Err(GatewayError::NoData("clay".into())));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let _ = fast_policy(0).run(|_| {
            calls.set(calls.get() + 1);
            Ok::<_, GatewayError>(())
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_simulated_source_reads_synthetic_sample() {
        let source = SoilSource::Simulated(SimulatedSoilSource::default());
        assert!(source.is_simulated());
        assert_eq!(source.name(), "simulated");
        let reading = source.read(&CoordinateInput::new(40.0, -89.0));
        assert!(matches!(reading, SourceReading::Simulated(_)));
    }
}
