/// Feature assembly for the Ksat regressor.
///
/// Normalizes the raw soil-fraction sources (SoilGrids units, synthetic
/// samples or manual input) into percentages, classifies the texture, and
/// builds the fixed-order `FeatureVector`.
///
/// Gateway data is allowed to be incomplete: a property the gateway could not
/// deliver is assembled as 0 and recorded as a warning on the sample, so the
/// caller still gets an estimate but can see it was degraded.

use crate::ingest::SoilSource;
use crate::model::{FeatureVector, KsatError, SoilComposition};
use crate::simulation::SimulatedSoil;
use crate::texture::{classify, TextureClass};

// ---------------------------------------------------------------------------
// Unit conversions
// ---------------------------------------------------------------------------

/// SoilGrids reports sand/silt/clay in g/kg (0–1000).
pub fn percent_from_soilgrids(raw: f64) -> f64 {
    raw / 10.0
}

/// Simplified organic-carbon value from SoilGrids organic carbon density.
pub fn oc_from_ocd(raw: f64) -> f64 {
    raw * 0.001
}

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Soil fractions typed in by the user. Any field may be missing on the wire;
/// `assemble_manual` rejects the input if one is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualInput {
    pub clay: Option<f64>,
    pub silt: Option<f64>,
    pub sand: Option<f64>,
    pub oc: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateInput {
    pub latitude: f64,
    pub longitude: f64,
}

impl CoordinateInput {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), KsatError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(KsatError::Validation(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(KsatError::Validation(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SoilInput {
    Manual(ManualInput),
    Coordinate(CoordinateInput),
}

/// Outcome of fetching one soil property from a gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Measured(f64),
    /// The gateway failed or had no value; the pipeline uses 0.
    Defaulted { reason: String },
}

impl PropertyValue {
    pub fn value_or_zero(&self) -> f64 {
        match self {
            PropertyValue::Measured(v) => *v,
            PropertyValue::Defaulted { .. } => 0.0,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, PropertyValue::Defaulted { .. })
    }
}

/// SoilGrids values in their native units, one outcome per property.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSoilSample {
    pub sand: PropertyValue,
    pub silt: PropertyValue,
    pub clay: PropertyValue,
    pub ocd: PropertyValue,
}

impl RawSoilSample {
    fn properties(&self) -> [(&'static str, &PropertyValue); 4] {
        [
            ("sand", &self.sand),
            ("silt", &self.silt),
            ("clay", &self.clay),
            ("ocd", &self.ocd),
        ]
    }

    pub fn defaulted_count(&self) -> usize {
        self.properties().iter().filter(|(_, v)| v.is_defaulted()).count()
    }
}

/// What a configured soil source hands back for a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceReading {
    Gateway(RawSoilSample),
    Simulated(SimulatedSoil),
}

// ---------------------------------------------------------------------------
// Assembled output
// ---------------------------------------------------------------------------

/// A classified soil sample ready for prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSample {
    pub composition: SoilComposition,
    pub organic_carbon: f64,
    pub texture: TextureClass,
    pub features: FeatureVector,
    /// Ksat that came with a synthetic sample. Used only when no model is
    /// loaded.
    pub synthetic_ksat: Option<f64>,
    /// Human-readable notes on defaulted or suspicious data. Empty when every
    /// value came from the source as-is.
    pub warnings: Vec<String>,
}

impl AssembledSample {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Classifies a composition and lays out the feature vector.
pub fn assemble_from_percentages(
    composition: SoilComposition,
    organic_carbon: f64,
    warnings: Vec<String>,
) -> AssembledSample {
    let (texture, texture_encoded) =
        classify(composition.sand, composition.silt, composition.clay);

    AssembledSample {
        composition,
        organic_carbon,
        texture,
        features: FeatureVector {
            clay: composition.clay,
            silt: composition.silt,
            sand: composition.sand,
            texture_encoded,
            oc: organic_carbon,
        },
        synthetic_ksat: None,
        warnings,
    }
}

/// Assembles manually supplied fractions. All four values are required and
/// must describe a physically possible soil.
pub fn assemble_manual(input: &ManualInput) -> Result<AssembledSample, KsatError> {
    let (clay, silt, sand, oc) = match (input.clay, input.silt, input.sand, input.oc) {
        (Some(clay), Some(silt), Some(sand), Some(oc)) => (clay, silt, sand, oc),
        _ => {
            return Err(KsatError::Validation(
                "Manual input requires clay, silt, sand, and oc values".to_string(),
            ))
        }
    };

    let composition = SoilComposition::new(sand, silt, clay);
    composition.validate()?;

    if !oc.is_finite() || oc < 0.0 {
        return Err(KsatError::Validation(format!(
            "oc must be a finite, non-negative value, got {}",
            oc
        )));
    }

    Ok(assemble_from_percentages(composition, oc, Vec::new()))
}

/// Assembles SoilGrids data. Never fails: defaulted properties become 0
/// and a warning each, and an off-balance composition is flagged rather
/// than rejected.
pub fn assemble_from_gateway(raw: &RawSoilSample) -> AssembledSample {
    let mut warnings: Vec<String> = raw
        .properties()
        .iter()
        .filter_map(|(name, value)| match value {
            PropertyValue::Defaulted { reason } => {
                Some(format!("{} unavailable ({}); assumed 0", name, reason))
            }
            PropertyValue::Measured(_) => None,
        })
        .collect();

    let composition = SoilComposition::new(
        percent_from_soilgrids(raw.sand.value_or_zero()),
        percent_from_soilgrids(raw.silt.value_or_zero()),
        percent_from_soilgrids(raw.clay.value_or_zero()),
    );

    // Only worth mentioning when every fraction was measured; otherwise the
    // defaulted-property warnings already explain the gap.
    if warnings.is_empty() {
        if let Err(err) = composition.validate() {
            warnings.push(format!("composition looks inconsistent: {}", err));
        }
    }

    assemble_from_percentages(composition, oc_from_ocd(raw.ocd.value_or_zero()), warnings)
}

pub fn assemble_from_reading(reading: &SourceReading) -> AssembledSample {
    match reading {
        SourceReading::Gateway(raw) => assemble_from_gateway(raw),
        SourceReading::Simulated(soil) => {
            let mut sample =
                assemble_from_percentages(soil.composition, soil.organic_carbon, Vec::new());
            sample.synthetic_ksat = Some(soil.ksat);
            sample
        }
    }
}

/// Entry point: turns any soil input into an assembled sample, fetching
/// coordinate data from `source`.
pub fn assemble(input: &SoilInput, source: &SoilSource) -> Result<AssembledSample, KsatError> {
    match input {
        SoilInput::Manual(manual) => assemble_manual(manual),
        SoilInput::Coordinate(coord) => {
            coord.validate()?;
            let reading = source.read(coord);
            Ok(assemble_from_reading(&reading))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureClass;

    fn manual(clay: f64, silt: f64, sand: f64, oc: f64) -> ManualInput {
        ManualInput {
            clay: Some(clay),
            silt: Some(silt),
            sand: Some(sand),
            oc: Some(oc),
        }
    }

    fn measured_sample(sand: f64, silt: f64, clay: f64, ocd: f64) -> RawSoilSample {
        RawSoilSample {
            sand: PropertyValue::Measured(sand),
            silt: PropertyValue::Measured(silt),
            clay: PropertyValue::Measured(clay),
            ocd: PropertyValue::Measured(ocd),
        }
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(percent_from_soilgrids(425.0), 42.5);
        assert!((oc_from_ocd(350.0) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_manual_input_builds_vector_in_column_order() {
        let sample = assemble_manual(&manual(23.0, 32.0, 45.0, 1.2)).expect("valid input");
        assert_eq!(sample.texture, TextureClass::Loam);
        assert_eq!(
            sample.features,
            FeatureVector {
                clay: 23.0,
                silt: 32.0,
                sand: 45.0,
                texture_encoded: 2,
                oc: 1.2,
            }
        );
        assert!(!sample.is_degraded());
    }

    #[test]
    fn test_manual_input_missing_oc_is_validation_error() {
        let mut input = manual(23.0, 32.0, 45.0, 1.2);
        input.oc = None;
        let err = assemble_manual(&input).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("clay, silt, sand, and oc"));
    }

    #[test]
    fn test_manual_input_missing_any_fraction_is_rejected() {
        for field in 0..3 {
            let mut input = manual(23.0, 32.0, 45.0, 1.2);
            match field {
                0 => input.clay = None,
                1 => input.silt = None,
                _ => input.sand = None,
            }
            assert!(assemble_manual(&input).is_err());
        }
    }

    #[test]
    fn test_manual_input_rejects_unbalanced_composition() {
        let err = assemble_manual(&manual(10.0, 10.0, 10.0, 1.0)).unwrap_err();
        assert!(matches!(err, KsatError::Validation(_)));
    }

    #[test]
    fn test_manual_input_rejects_negative_oc() {
        assert!(assemble_manual(&manual(23.0, 32.0, 45.0, -0.5)).is_err());
    }

    #[test]
    fn test_gateway_values_are_converted_from_g_per_kg() {
        let sample = assemble_from_gateway(&measured_sample(450.0, 320.0, 230.0, 1200.0));
        assert_eq!(sample.composition, SoilComposition::new(45.0, 32.0, 23.0));
        assert!((sample.organic_carbon - 1.2).abs() < 1e-12);
        assert_eq!(sample.texture, TextureClass::Loam);
        assert!(sample.warnings.is_empty());
    }

    #[test]
    fn test_missing_clay_defaults_to_zero_with_warning() {
        let mut raw = measured_sample(600.0, 300.0, 100.0, 500.0);
        raw.clay = PropertyValue::Defaulted {
            reason: "No data available: clay".to_string(),
        };

        let sample = assemble_from_gateway(&raw);

        assert_eq!(sample.composition.clay, 0.0);
        assert_eq!(sample.features.clay, 0.0);
        assert_eq!(sample.warnings.len(), 1);
        assert!(sample.warnings[0].starts_with("clay unavailable"));
        assert!(sample.is_degraded());
        assert_eq!(raw.defaulted_count(), 1);
    }

    #[test]
    fn test_fully_failed_gateway_still_assembles() {
        let reason = || PropertyValue::Defaulted {
            reason: "Request failed: connection refused".to_string(),
        };
        let raw = RawSoilSample {
            sand: reason(),
            silt: reason(),
            clay: reason(),
            ocd: reason(),
        };
        let sample = assemble_from_gateway(&raw);
        assert_eq!(sample.features.as_array(), [0.0, 0.0, 0.0, 4.0, 0.0]);
        assert_eq!(sample.warnings.len(), 4);
    }

    #[test]
    fn test_measured_but_inconsistent_composition_is_flagged() {
        let sample = assemble_from_gateway(&measured_sample(300.0, 300.0, 100.0, 0.0));
        assert_eq!(sample.warnings.len(), 1);
        assert!(sample.warnings[0].contains("inconsistent"));
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(CoordinateInput::new(40.5, -89.9).validate().is_ok());
        assert!(CoordinateInput::new(91.0, 0.0).validate().is_err());
        assert!(CoordinateInput::new(0.0, -180.5).validate().is_err());
        assert!(CoordinateInput::new(f64::NAN, 0.0).validate().is_err());
    }
}
