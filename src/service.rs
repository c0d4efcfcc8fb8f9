/// Request handling shared by the HTTP server and the CLI.
///
/// `AppContext` is built once at startup from `ServiceConfig` and then only
/// read: the loaded model, the configured soil source and the weather
/// client. Handlers take it by reference (behind an `Arc` in the server).

use serde::{Deserialize, Serialize};

use crate::config::{ServiceConfig, SoilSourceKind};
use crate::features::{self, AssembledSample, CoordinateInput, ManualInput, SoilInput};
use crate::ingest::open_meteo::OpenMeteoClient;
use crate::ingest::soilgrids::SoilGridsClient;
use crate::ingest::{self, SoilSource};
use crate::logging::{self, Component};
use crate::model::{KsatError, KsatEstimate, RunoffCoefficient};
use crate::predictor::KsatPredictor;
use crate::runoff;
use crate::simulation::SimulatedSoilSource;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /predict`. Coordinates are always required; with
/// `manual_input` set they are ignored and the four fractions are used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub manual_input: bool,
    pub clay: Option<f64>,
    pub silt: Option<f64>,
    pub sand: Option<f64>,
    pub oc: Option<f64>,
}

impl PredictRequest {
    pub fn soil_input(&self) -> SoilInput {
        if self.manual_input {
            SoilInput::Manual(ManualInput {
                clay: self.clay,
                silt: self.silt,
                sand: self.sand,
                oc: self.oc,
            })
        } else {
            SoilInput::Coordinate(CoordinateInput::new(self.latitude, self.longitude))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilProperties {
    pub clay: f64,
    pub silt: f64,
    pub sand: f64,
    pub oc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub ksat: f64,
    pub soil_texture: String,
    pub soil_properties: SoilProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PredictResponse {
    pub fn from_estimate(estimate: &Estimate) -> Self {
        let sample = &estimate.sample;
        Self {
            ksat: estimate.ksat.value(),
            soil_texture: sample.texture.label().to_string(),
            soil_properties: SoilProperties {
                clay: sample.composition.clay,
                silt: sample.composition.silt,
                sand: sample.composition.sand,
                oc: sample.organic_carbon,
            },
            warnings: sample.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallResponse {
    pub annual_rainfall: f64,
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Everything one estimation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub sample: AssembledSample,
    pub ksat: KsatEstimate,
    pub runoff: RunoffCoefficient,
    /// False when the Ksat came from a simulated sample instead of the model.
    pub used_model: bool,
}

pub struct AppContext {
    predictor: Option<KsatPredictor>,
    soil_source: SoilSource,
    weather: Option<OpenMeteoClient>,
}

impl AppContext {
    pub fn new(
        predictor: Option<KsatPredictor>,
        soil_source: SoilSource,
        weather: Option<OpenMeteoClient>,
    ) -> Self {
        Self {
            predictor,
            soil_source,
            weather,
        }
    }

    /// Builds the context the binaries run with.
    ///
    /// The model is required when soil data comes from SoilGrids. In
    /// simulated mode a missing model is tolerated and the synthetic Ksat
    /// stands in for predictions.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, KsatError> {
        let client = ingest::build_client(config.gateway.timeout())?;
        let retry = config.gateway.retry_policy();

        let soil_source = match config.soil_source {
            SoilSourceKind::SoilGrids => SoilSource::SoilGrids(SoilGridsClient::new(
                client.clone(),
                &config.gateway.soilgrids_base_url,
                retry,
            )),
            SoilSourceKind::Simulated => {
                SoilSource::Simulated(SimulatedSoilSource::new(config.simulation_seed))
            }
        };

        let predictor = match KsatPredictor::load(&config.model_path) {
            Ok(predictor) => Some(predictor),
            Err(err) if soil_source.is_simulated() => {
                logging::warn(
                    Component::Model,
                    None,
                    &format!("{}; using synthetic Ksat values", err),
                );
                None
            }
            Err(err) => return Err(err),
        };

        let weather = OpenMeteoClient::new(client, &config.gateway.open_meteo_base_url, retry);

        logging::info(
            Component::System,
            None,
            &format!("Soil source: {}", soil_source.name()),
        );

        Ok(Self::new(predictor, soil_source, Some(weather)))
    }

    pub fn predictor(&self) -> Option<&KsatPredictor> {
        self.predictor.as_ref()
    }

    pub fn soil_source(&self) -> &SoilSource {
        &self.soil_source
    }

    /// Runs the full pipeline for one input.
    pub fn estimate(&self, input: &SoilInput) -> Result<Estimate, KsatError> {
        let sample = features::assemble(input, &self.soil_source)?;

        let (ksat, used_model) = match (&self.predictor, sample.synthetic_ksat) {
            (Some(predictor), _) => (predictor.predict(&sample.features)?, true),
            (None, Some(synthetic)) => (KsatEstimate::new(synthetic)?, false),
            (None, None) => {
                return Err(KsatError::ModelUnavailable(
                    "no model is loaded for this input".to_string(),
                ))
            }
        };

        let runoff = runoff::estimate(ksat.value())?;

        Ok(Estimate {
            sample,
            ksat,
            runoff,
            used_model,
        })
    }

    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, KsatError> {
        let estimate = self.estimate(&request.soil_input())?;
        Ok(PredictResponse::from_estimate(&estimate))
    }

    /// Average annual rainfall at a coordinate. Unlike soil properties, a
    /// gateway failure here is returned to the caller.
    pub fn annual_rainfall(&self, coord: &CoordinateInput) -> Result<f64, KsatError> {
        coord.validate()?;
        let weather = self.weather.as_ref().ok_or_else(|| {
            KsatError::Config("no weather gateway is configured".to_string())
        })?;
        Ok(weather.fetch_annual_rainfall(coord)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT_MODEL: &str = r#"{
        "feature_names": ["Clay", "Silt", "Sand", "Texture Encoded", "OC"],
        "base_score": 10.0,
        "trees": [ { "nodes": [ { "leaf": 0.0 } ] } ]
    }"#;

    fn simulated_context(with_model: bool) -> AppContext {
        let predictor = with_model.then(|| KsatPredictor::from_json(FLAT_MODEL).unwrap());
        AppContext::new(
            predictor,
            SoilSource::Simulated(SimulatedSoilSource::default()),
            None,
        )
    }

    fn manual_request(oc: Option<f64>) -> PredictRequest {
        PredictRequest {
            latitude: 0.0,
            longitude: 0.0,
            manual_input: true,
            clay: Some(23.0),
            silt: Some(32.0),
            sand: Some(45.0),
            oc,
        }
    }

    #[test]
    fn test_request_defaults_to_coordinate_input() {
        let request: PredictRequest =
            serde_json::from_str(r#"{"latitude": 40.69, "longitude": -89.59}"#).unwrap();
        assert_eq!(
            request.soil_input(),
            SoilInput::Coordinate(CoordinateInput::new(40.69, -89.59))
        );
    }

    #[test]
    fn test_manual_prediction_uses_model() {
        let response = simulated_context(true).predict(&manual_request(Some(1.2))).unwrap();
        assert_eq!(response.ksat, 10.0);
        assert_eq!(response.soil_texture, "LOAM");
        assert_eq!(response.soil_properties.oc, 1.2);
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_manual_prediction_missing_oc_is_client_error() {
        let err = simulated_context(true).predict(&manual_request(None)).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_manual_prediction_without_model_is_unavailable() {
        let err = simulated_context(false)
            .predict(&manual_request(Some(1.2)))
            .unwrap_err();
        assert!(matches!(err, KsatError::ModelUnavailable(_)));
    }

    #[test]
    fn test_simulated_coordinate_without_model_uses_synthetic_ksat() {
        let ctx = simulated_context(false);
        let estimate = ctx
            .estimate(&SoilInput::Coordinate(CoordinateInput::new(40.69, -89.59)))
            .unwrap();
        assert!(!estimate.used_model);
        assert!((5.0..=20.0).contains(&estimate.ksat.value()));
        assert_eq!(Some(estimate.ksat.value()), estimate.sample.synthetic_ksat);
    }

    #[test]
    fn test_simulated_coordinate_with_model_prefers_model() {
        let estimate = simulated_context(true)
            .estimate(&SoilInput::Coordinate(CoordinateInput::new(40.69, -89.59)))
            .unwrap();
        assert!(estimate.used_model);
        assert_eq!(estimate.ksat.value(), 10.0);
        assert_eq!(estimate.runoff.value(), 0.5);
    }

    #[test]
    fn test_rainfall_without_weather_client_is_config_error() {
        let err = simulated_context(true)
            .annual_rainfall(&CoordinateInput::new(40.0, -89.0))
            .unwrap_err();
        assert!(matches!(err, KsatError::Config(_)));
    }

    #[test]
    fn test_rainfall_rejects_bad_coordinates_first() {
        let err = simulated_context(true)
            .annual_rainfall(&CoordinateInput::new(120.0, -89.0))
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_response_omits_empty_warnings() {
        let response = simulated_context(true).predict(&manual_request(Some(1.2))).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["soil_properties"]["clay"], 23.0);
    }
}
