/// Open-Meteo Historical Weather API client
///
/// Retrieves daily precipitation sums from the Open-Meteo archive and
/// reduces them to an average annual rainfall for a point.
///
/// API Documentation: https://open-meteo.com/en/docs/historical-weather-api

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::features::CoordinateInput;
use crate::ingest::{get_json, RetryPolicy};
use crate::logging::{self, Component};
use crate::model::{round_to, GatewayError};

pub const DEFAULT_BASE_URL: &str = "https://archive-api.open-meteo.com";
pub const ARCHIVE_PATH: &str = "/v1/archive";

/// Reference period for the annual average.
pub const ARCHIVE_START_DATE: &str = "2000-01-01";
pub const ARCHIVE_END_DATE: &str = "2023-12-31";

// ============================================================================
// API Response Structures
// ============================================================================

/// `latitude`/`longitude` are the centre of the grid cell Open-Meteo
/// snapped the request to, not the requested point.
#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub daily: Option<DailySeries>,
}

impl ArchiveResponse {
    pub fn grid_cell(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(format!("{:.4},{:.4}", lat, lon)),
            _ => None,
        }
    }
}

/// Parallel arrays: `precipitation_sum[i]` is the total for `time[i]`, mm.
#[derive(Debug, Deserialize)]
pub struct DailySeries {
    pub time: Vec<String>,
    pub precipitation_sum: Vec<Option<f64>>,
}

// ============================================================================
// Precipitation Analysis
// ============================================================================

/// Mean of the per-year precipitation sums, in mm, rounded to 2 decimals.
///
/// Null days count as no rain for their year. A series without a single
/// non-null value has nothing to say about rainfall and is `NoData`.
pub fn annual_mean_rainfall(series: &DailySeries) -> Result<f64, GatewayError> {
    if series.time.len() != series.precipitation_sum.len() {
        return Err(GatewayError::Parse(format!(
            "daily series length mismatch: {} dates, {} values",
            series.time.len(),
            series.precipitation_sum.len()
        )));
    }

    if series.precipitation_sum.iter().all(Option::is_none) {
        return Err(GatewayError::NoData("precipitation".to_string()));
    }

    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();
    for (date, value) in series.time.iter().zip(&series.precipitation_sum) {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| GatewayError::Parse(format!("bad date '{}': {}", date, e)))?;
        *yearly.entry(day.year()).or_insert(0.0) += value.unwrap_or(0.0);
    }

    let mean = yearly.values().sum::<f64>() / yearly.len() as f64;
    Ok(round_to(mean, 2))
}

pub fn parse_archive_response(json: serde_json::Value) -> Result<ArchiveResponse, GatewayError> {
    serde_json::from_value(json).map_err(|e| GatewayError::Parse(e.to_string()))
}

// ============================================================================
// API Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenMeteoClient {
    pub fn new(client: reqwest::blocking::Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn archive_url(&self) -> String {
        format!("{}{}", self.base_url, ARCHIVE_PATH)
    }

    /// Average annual rainfall (mm) at `coord` over the reference period.
    pub fn fetch_annual_rainfall(&self, coord: &CoordinateInput) -> Result<f64, GatewayError> {
        let context = format!("{:.4},{:.4}", coord.latitude, coord.longitude);
        let url = self.archive_url();
        let query = [
            ("latitude", coord.latitude.to_string()),
            ("longitude", coord.longitude.to_string()),
            ("start_date", ARCHIVE_START_DATE.to_string()),
            ("end_date", ARCHIVE_END_DATE.to_string()),
            ("daily", "precipitation_sum".to_string()),
            ("timezone", "auto".to_string()),
        ];

        let result = self
            .retry
            .run(|_| get_json(&self.client, &url, &query))
            .and_then(parse_archive_response)
            .and_then(|response| {
                if let Some(cell) = response.grid_cell() {
                    logging::debug(
                        Component::OpenMeteo,
                        Some(&context),
                        &format!("Archive grid cell {}", cell),
                    );
                }
                let daily = response
                    .daily
                    .ok_or_else(|| GatewayError::NoData("daily precipitation".to_string()))?;
                annual_mean_rainfall(&daily)
            });

        match &result {
            Ok(mm) => logging::debug(
                Component::OpenMeteo,
                Some(&context),
                &format!("Annual rainfall {:.2} mm", mm),
            ),
            Err(err) => logging::log_gateway_failure(Component::OpenMeteo, &context, "archive query", err),
        }

        result
    }
}

// ============================================================================
// Tests
// ============================================================================
