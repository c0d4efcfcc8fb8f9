//! Runoff coefficient estimation.
//!
//! The coefficient is an empirical inverse of Ksat: well-draining soils shed
//! little rainfall, tight soils shed most of it. The constant and the clamp
//! bounds are placeholders, not values derived from a physical model.
//!
//! Categories and interpretations are for reporting only; `estimate` does
//! not use them.

use crate::model::{KsatError, RunoffCoefficient};

/// Weight of Ksat in `1 / (1 + k * ksat)`.
pub const KSAT_SENSITIVITY: f64 = 0.1;

pub const MIN_COEFFICIENT: f64 = 0.1;
pub const MAX_COEFFICIENT: f64 = 0.9;

/// Maps a Ksat value (µm/s) to a runoff coefficient in
/// `[MIN_COEFFICIENT, MAX_COEFFICIENT]`.
///
/// Negative or non-finite Ksat is physically meaningless and rejected.
pub fn estimate(ksat: f64) -> Result<RunoffCoefficient, KsatError> {
    if !ksat.is_finite() || ksat < 0.0 {
        return Err(KsatError::Validation(format!(
            "ksat must be a finite, non-negative value, got {}",
            ksat
        )));
    }

    let raw = 1.0 / (1.0 + KSAT_SENSITIVITY * ksat);
    Ok(RunoffCoefficient::from_clamped(raw.clamp(MIN_COEFFICIENT, MAX_COEFFICIENT)))
}

/// Runoff categories, in ascending order of runoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunoffCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl RunoffCategory {
    /// `< 0.3` LOW, `< 0.5` MODERATE, `< 0.7` HIGH, otherwise VERY HIGH.
    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient < 0.3 {
            RunoffCategory::Low
        } else if coefficient < 0.5 {
            RunoffCategory::Moderate
        } else if coefficient < 0.7 {
            RunoffCategory::High
        } else {
            RunoffCategory::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RunoffCategory::Low => "LOW",
            RunoffCategory::Moderate => "MODERATE",
            RunoffCategory::High => "HIGH",
            RunoffCategory::VeryHigh => "VERY HIGH",
        }
    }

    pub fn interpretation(self) -> &'static str {
        match self {
            RunoffCategory::Low => {
                "This area has good water infiltration capacity. Soil can absorb most \
                 rainfall, reducing surface runoff."
            }
            RunoffCategory::Moderate => {
                "This area has average water infiltration. Some rainfall will become \
                 surface runoff during moderate to heavy precipitation events."
            }
            RunoffCategory::High => {
                "This area has limited water infiltration capacity. A significant portion \
                 of rainfall will become surface runoff, increasing erosion and flooding risks."
            }
            RunoffCategory::VeryHigh => {
                "This area has poor water infiltration. Most rainfall will become surface \
                 runoff, creating high risks of erosion, flooding, and water quality issues."
            }
        }
    }
}

impl std::fmt::Display for RunoffCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
