/// Output payloads for the runoff CLI.
///
/// `CliOutput` is the default machine-readable result; `RunoffReport` is the
/// longer form printed with `--report`, adding the runoff category and its
/// interpretation.

use serde::Serialize;

use crate::features::CoordinateInput;
use crate::model::round_to;
use crate::runoff::RunoffCategory;
use crate::service::Estimate;

pub const KSAT_UNIT: &str = "µm/s";

// ---------------------------------------------------------------------------
// Default CLI payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CliSoilProperties {
    pub clay: f64,
    pub silt: f64,
    pub sand: f64,
    pub organic_carbon: f64,
    pub texture: String,
}

impl CliSoilProperties {
    /// Fractions to 1 decimal, organic carbon to 2.
    pub fn from_estimate(estimate: &Estimate) -> Self {
        let sample = &estimate.sample;
        Self {
            clay: round_to(sample.composition.clay, 1),
            silt: round_to(sample.composition.silt, 1),
            sand: round_to(sample.composition.sand, 1),
            organic_carbon: round_to(sample.organic_carbon, 2),
            texture: sample.texture.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CliOutput {
    pub runoff_coefficient: f64,
    pub ksat: f64,
    pub soil_properties: CliSoilProperties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CliOutput {
    pub fn from_estimate(estimate: &Estimate) -> Self {
        Self {
            runoff_coefficient: round_to(estimate.runoff.value(), 3),
            ksat: round_to(estimate.ksat.value(), 3),
            soil_properties: CliSoilProperties::from_estimate(estimate),
            warnings: estimate.sample.warnings.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Long-form report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydraulicProperties {
    pub ksat: f64,
    pub ksat_unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunoffSummary {
    pub coefficient: f64,
    pub category: &'static str,
    pub interpretation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunoffReport {
    pub location: ReportLocation,
    pub soil_properties: CliSoilProperties,
    pub hydraulic_properties: HydraulicProperties,
    pub runoff: RunoffSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RunoffReport {
    pub fn new(coord: &CoordinateInput, estimate: &Estimate) -> Self {
        // The category always agrees with the printed coefficient.
        let coefficient = round_to(estimate.runoff.value(), 3);
        let category = RunoffCategory::from_coefficient(coefficient);

        Self {
            location: ReportLocation {
                latitude: coord.latitude,
                longitude: coord.longitude,
            },
            soil_properties: CliSoilProperties::from_estimate(estimate),
            hydraulic_properties: HydraulicProperties {
                ksat: round_to(estimate.ksat.value(), 3),
                ksat_unit: KSAT_UNIT,
            },
            runoff: RunoffSummary {
                coefficient,
                category: category.label(),
                interpretation: category.interpretation(),
            },
            warnings: estimate.sample.warnings.clone(),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Runoff report for {:.4}, {:.4}\n",
            self.location.latitude, self.location.longitude
        ));
        out.push_str(&format!("{}\n", "=".repeat(48)));
        out.push_str(&format!("Texture:            {}\n", self.soil_properties.texture));
        out.push_str(&format!(
            "Sand / Silt / Clay: {:.1}% / {:.1}% / {:.1}%\n",
            self.soil_properties.sand, self.soil_properties.silt, self.soil_properties.clay
        ));
        out.push_str(&format!("Organic carbon:     {:.2}\n", self.soil_properties.organic_carbon));
        out.push_str(&format!(
            "Ksat:               {:.3} {}\n",
            self.hydraulic_properties.ksat, self.hydraulic_properties.ksat_unit
        ));
        out.push_str(&format!(
            "Runoff coefficient: {:.3} ({})\n",
            self.runoff.coefficient, self.runoff.category
        ));
        out.push_str(&format!("\n{}\n", self.runoff.interpretation));
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {}", warning));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::assemble_manual;
    use crate::features::ManualInput;
    use crate::model::KsatEstimate;
    use crate::runoff;

    fn estimate_for(ksat: f64) -> Estimate {
        let sample = assemble_manual(&ManualInput {
            clay: Some(23.04),
            silt: Some(31.96),
            sand: Some(45.0),
            oc: Some(1.234),
        })
        .unwrap();
        Estimate {
            sample,
            ksat: KsatEstimate::new(ksat).unwrap(),
            runoff: runoff::estimate(ksat).unwrap(),
            used_model: true,
        }
    }

    #[test]
    fn test_cli_output_rounding() {
        let output = CliOutput::from_estimate(&estimate_for(12.34567));
        assert_eq!(output.ksat, 12.346);
        assert_eq!(output.runoff_coefficient, 0.448);
        assert_eq!(output.soil_properties.clay, 23.0);
        assert_eq!(output.soil_properties.silt, 32.0);
        assert_eq!(output.soil_properties.organic_carbon, 1.23);
        assert_eq!(output.soil_properties.texture, "LOAM");
    }

    #[test]
    fn test_cli_output_json_shape() {
        let json = serde_json::to_value(CliOutput::from_estimate(&estimate_for(10.0))).unwrap();
        assert_eq!(json["runoff_coefficient"], 0.5);
        assert_eq!(json["soil_properties"]["texture"], "LOAM");
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_report_category_and_unit() {
        let report = RunoffReport::new(&CoordinateInput::new(40.69, -89.59), &estimate_for(30.0));
        assert_eq!(report.runoff.category, "LOW");
        assert_eq!(report.hydraulic_properties.ksat_unit, "µm/s");
        assert!(report.to_text().contains("Runoff coefficient: 0.250 (LOW)"));
    }

    #[test]
    fn test_category_follows_rounded_coefficient() {
        // 1 / (1 + 2.33338) = 0.29999..., printed as 0.300
        let report = RunoffReport::new(&CoordinateInput::new(40.69, -89.59), &estimate_for(23.3338));
        assert!(estimate_for(23.3338).runoff.value() < 0.3);
        assert_eq!(report.runoff.coefficient, 0.3);
        assert_eq!(report.runoff.category, "MODERATE");
        assert!(report.to_text().contains("Runoff coefficient: 0.300 (MODERATE)"));
    }
}
