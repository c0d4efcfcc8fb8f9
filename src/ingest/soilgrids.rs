/// ISRIC SoilGrids REST client
///
/// Retrieves topsoil (0-5cm) sand, silt, clay and organic carbon density
/// for a point, one property per request.
///
/// API Documentation: https://rest.isric.org/soilgrids/v2.0/docs
///
/// SoilGrids reports sand/silt/clay in g/kg and has no data for water
/// bodies, so a missing property is routine. Each property is fetched
/// independently and a failure leaves that property `Defaulted` instead of
/// failing the whole sample.

use serde_json::Value;

use crate::features::{CoordinateInput, PropertyValue, RawSoilSample};
use crate::ingest::{get_json, RetryPolicy};
use crate::logging::{self, Component};
use crate::model::GatewayError;

pub const DEFAULT_BASE_URL: &str = "https://rest.isric.org";
pub const QUERY_PATH: &str = "/soilgrids/v2.0/properties/query";

/// Only the topsoil layer feeds the model.
pub const TOPSOIL_DEPTH: &str = "0-5cm";

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilProperty {
    Sand,
    Silt,
    Clay,
    Ocd,
}

impl SoilProperty {
    pub const ALL: [SoilProperty; 4] = [
        SoilProperty::Sand,
        SoilProperty::Silt,
        SoilProperty::Clay,
        SoilProperty::Ocd,
    ];

    /// SoilGrids property name.
    pub fn name(self) -> &'static str {
        match self {
            SoilProperty::Sand => "sand",
            SoilProperty::Silt => "silt",
            SoilProperty::Clay => "clay",
            SoilProperty::Ocd => "ocd",
        }
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Pulls `properties.layers[0].depths[0].values.mean` out of a query
/// response. `None` when any step is missing or the mean is null.
pub fn extract_mean(body: &Value) -> Option<f64> {
    body.get("properties")?
        .get("layers")?
        .as_array()?
        .first()?
        .get("depths")?
        .as_array()?
        .first()?
        .get("values")?
        .get("mean")?
        .as_f64()
}

/// Parses a raw response body for `property`.
pub fn parse_property_response(body: &str, property: SoilProperty) -> Result<f64, GatewayError> {
    let json: Value = serde_json::from_str(body).map_err(|e| GatewayError::Parse(e.to_string()))?;
    mean_or_no_data(&json, property)
}

fn mean_or_no_data(json: &Value, property: SoilProperty) -> Result<f64, GatewayError> {
    extract_mean(json).ok_or_else(|| GatewayError::NoData(property.name().to_string()))
}

// ============================================================================
// API Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct SoilGridsClient {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SoilGridsClient {
    pub fn new(client: reqwest::blocking::Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn query_url(&self) -> String {
        format!("{}{}", self.base_url, QUERY_PATH)
    }

    /// Fetches the topsoil mean of one property, in SoilGrids' native units.
    pub fn fetch_property(
        &self,
        coord: &CoordinateInput,
        property: SoilProperty,
    ) -> Result<f64, GatewayError> {
        let url = self.query_url();
        let query = [
            ("lat", coord.latitude.to_string()),
            ("lon", coord.longitude.to_string()),
            ("property", property.name().to_string()),
            ("depth", TOPSOIL_DEPTH.to_string()),
            ("value", "mean".to_string()),
        ];

        let json = self.retry.run(|attempt| {
            if attempt > 1 {
                logging::debug(
                    Component::SoilGrids,
                    Some(property.name()),
                    &format!("Retrying (attempt {})", attempt),
                );
            }
            get_json(&self.client, &url, &query)
        })?;

        mean_or_no_data(&json, property)
    }

    /// Fetches all four properties. Never fails; see the module docs.
    pub fn fetch_sample(&self, coord: &CoordinateInput) -> RawSoilSample {
        let context = format!("{:.4},{:.4}", coord.latitude, coord.longitude);

        let fetch = |property: SoilProperty| match self.fetch_property(coord, property) {
            Ok(value) => PropertyValue::Measured(value),
            Err(err) => {
                logging::log_gateway_failure(
                    Component::SoilGrids,
                    &context,
                    &format!("{} query", property.name()),
                    &err,
                );
                PropertyValue::Defaulted {
                    reason: err.to_string(),
                }
            }
        };

        let sample = RawSoilSample {
            sand: fetch(SoilProperty::Sand),
            silt: fetch(SoilProperty::Silt),
            clay: fetch(SoilProperty::Clay),
            ocd: fetch(SoilProperty::Ocd),
        };

        let total = SoilProperty::ALL.len();
        logging::log_fetch_summary(
            Component::SoilGrids,
            &context,
            total,
            total - sample.defaulted_count(),
        );

        sample
    }
}

// ============================================================================
// Tests
// ============================================================================
