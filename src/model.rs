/// Core data types for the Ksat estimation service.
///
/// This module defines the shared domain model imported by all other modules:
/// soil composition, the regressor's feature vector, the Ksat and runoff
/// scalars, and the error taxonomy. It contains no I/O.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Feature columns
// ---------------------------------------------------------------------------

/// Column order the regressor was trained on. `FeatureVector::as_array`
/// and the model artifact's `feature_names` must both follow it.
pub const FEATURE_COLUMNS: [&str; 5] = ["Clay", "Silt", "Sand", "Texture Encoded", "OC"];

/// How far sand + silt + clay may stray from 100 before a composition is
/// rejected, in percentage points.
pub const COMPOSITION_TOLERANCE_PCT: f64 = 1.0;

/// Rounds half away from zero to `places` decimals, for output payloads.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Soil types
// ---------------------------------------------------------------------------

/// Sand, silt and clay fractions of a soil sample, in percent (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilComposition {
    pub sand: f64,
    pub silt: f64,
    pub clay: f64,
}

impl SoilComposition {
    pub fn new(sand: f64, silt: f64, clay: f64) -> Self {
        Self { sand, silt, clay }
    }

    pub fn total(&self) -> f64 {
        self.sand + self.silt + self.clay
    }

    /// Checks that every fraction is a finite percentage and that the three
    /// add up to 100 within `COMPOSITION_TOLERANCE_PCT`.
    pub fn validate(&self) -> Result<(), KsatError> {
        for (name, value) in [("sand", self.sand), ("silt", self.silt), ("clay", self.clay)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(KsatError::Validation(format!(
                    "{} must be a percentage between 0 and 100, got {}",
                    name, value
                )));
            }
        }

        let total = self.total();
        if (total - 100.0).abs() > COMPOSITION_TOLERANCE_PCT {
            return Err(KsatError::Validation(format!(
                "sand + silt + clay must sum to 100 (±{}), got {:.2}",
                COMPOSITION_TOLERANCE_PCT, total
            )));
        }

        Ok(())
    }
}

/// The fixed-width record passed to the Ksat regressor.
///
/// Field order mirrors `FEATURE_COLUMNS`; reordering the fields here without
/// retraining the model silently corrupts every prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub clay: f64,
    pub silt: f64,
    pub sand: f64,
    pub texture_encoded: i32,
    pub oc: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.clay,
            self.silt,
            self.sand,
            f64::from(self.texture_encoded),
            self.oc,
        ]
    }
}

/// Saturated hydraulic conductivity, µm/s. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct KsatEstimate(f64);

impl KsatEstimate {
    pub fn new(value: f64) -> Result<Self, KsatError> {
        if !value.is_finite() || value < 0.0 {
            return Err(KsatError::Validation(format!(
                "ksat must be a finite, non-negative value, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Fraction of rainfall that becomes surface runoff, always within
/// `[runoff::MIN_COEFFICIENT, runoff::MAX_COEFFICIENT]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RunoffCoefficient(f64);

impl RunoffCoefficient {
    /// Only `runoff::estimate` builds these; it owns the clamp.
    pub(crate) fn from_clamped(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures talking to a third-party soil or weather API.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Non-2xx HTTP response.
    Http(u16),
    /// Connection refused, DNS failure, timeout and the like.
    Transport(String),
    /// The body was not the JSON shape we expected.
    Parse(String),
    /// The API answered but had no value for the requested property
    /// (e.g. a coordinate over open water).
    NoData(String),
}

impl GatewayError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Http(status) => *status >= 500 || *status == 429,
            GatewayError::Parse(_) | GatewayError::NoData(_) => false,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Http(code) => write!(f, "HTTP error: {}", code),
            GatewayError::Transport(msg) => write!(f, "Request failed: {}", msg),
            GatewayError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GatewayError::NoData(what) => write!(f, "No data available: {}", what),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Errors surfaced by the estimation pipeline and the service around it.
#[derive(Debug, Clone, PartialEq)]
pub enum KsatError {
    /// Missing or out-of-domain input. Caller-visible as a 4xx.
    Validation(String),
    /// The model artifact is missing, unreadable or malformed.
    ModelUnavailable(String),
    /// A gateway failure that could not be recovered locally.
    Gateway(GatewayError),
    /// The regressor could not evaluate the feature vector.
    Prediction(String),
    /// Bad configuration file or environment.
    Config(String),
}

impl KsatError {
    /// Validation failures are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, KsatError::Validation(_))
    }
}

impl std::fmt::Display for KsatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KsatError::Validation(msg) => write!(f, "{}", msg),
            KsatError::ModelUnavailable(msg) => write!(f, "Model not loaded: {}", msg),
            KsatError::Gateway(err) => write!(f, "{}", err),
            KsatError::Prediction(msg) => write!(f, "{}", msg),
            KsatError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for KsatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KsatError::Gateway(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GatewayError> for KsatError {
    fn from(err: GatewayError) -> Self {
        KsatError::Gateway(err)
    }
}
