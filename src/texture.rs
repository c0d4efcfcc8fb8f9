/// Soil texture classification.
///
/// Maps sand/silt/clay percentages to a texture class by walking an ordered
/// rule list (first match wins), then to the integer code the Ksat model was
/// trained on. The rules overlap, so their order is part of the contract:
/// see `TEXTURE_RULES`.
///
/// `ENCODING_TABLE` is the single source of truth for texture codes. Every
/// other module goes through `TextureClass::code` rather than hardcoding
/// numbers.

use std::fmt;

// ---------------------------------------------------------------------------
// Texture classes
// ---------------------------------------------------------------------------

/// Code for any texture the encoding table does not list.
pub const UNKNOWN_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureClass {
    Clay,
    ClayLoam,
    Loam,
    LoamySand,
    Sand,
    SandyClay,
    /// Legacy label present in the training data's encoding. The classifier
    /// never produces it.
    SandyLoamy,
    SiltyClay,
    SiltyClayLoam,
    SiltyLoam,
    SandyLoam,
    SandyClayLoam,
    Silt,
    SiltLoam,
    Unknown,
}

impl TextureClass {
    /// Every class, in encoding order, followed by the classes that only the
    /// rule list knows about.
    pub const ALL: [TextureClass; 15] = [
        TextureClass::Clay,
        TextureClass::ClayLoam,
        TextureClass::Loam,
        TextureClass::LoamySand,
        TextureClass::Sand,
        TextureClass::SandyClay,
        TextureClass::SandyLoamy,
        TextureClass::SiltyClay,
        TextureClass::SiltyClayLoam,
        TextureClass::SiltyLoam,
        TextureClass::SandyLoam,
        TextureClass::SandyClayLoam,
        TextureClass::Silt,
        TextureClass::SiltLoam,
        TextureClass::Unknown,
    ];

    /// Display name, as used by the training data and the API responses.
    pub fn label(self) -> &'static str {
        match self {
            TextureClass::Clay => "CLAY",
            TextureClass::ClayLoam => "CLAY LOAM",
            TextureClass::Loam => "LOAM",
            TextureClass::LoamySand => "LOAMY SAND",
            TextureClass::Sand => "SAND",
            TextureClass::SandyClay => "SANDY CLAY",
            TextureClass::SandyLoamy => "SANDY LOAMY",
            TextureClass::SiltyClay => "SILTY CLAY",
            TextureClass::SiltyClayLoam => "SILTY CLAY LOAM",
            TextureClass::SiltyLoam => "SILTY LOAM",
            TextureClass::SandyLoam => "SANDY LOAM",
            TextureClass::SandyClayLoam => "SANDY CLAY LOAM",
            TextureClass::Silt => "SILT",
            TextureClass::SiltLoam => "SILT LOAM",
            TextureClass::Unknown => "Unknown",
        }
    }

    /// Model input code for this class. Classes missing from
    /// `ENCODING_TABLE` (SILT, SILT LOAM) encode as `UNKNOWN_CODE`, exactly as
    /// they did when the model was trained.
    pub fn code(self) -> i32 {
        ENCODING_TABLE
            .iter()
            .find(|entry| entry.class == self)
            .map(|entry| entry.code)
            .unwrap_or(UNKNOWN_CODE)
    }

    /// Reverse lookup through `ENCODING_TABLE`. Returns `None` for codes the
    /// table does not contain; `-1` resolves to `Unknown`.
    pub fn from_code(code: i32) -> Option<TextureClass> {
        ENCODING_TABLE
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.class)
    }

    /// Case-insensitive lookup by display name.
    pub fn from_label(label: &str) -> Option<TextureClass> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for TextureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Encoding table
// ---------------------------------------------------------------------------

pub struct TextureEncoding {
    pub class: TextureClass,
    pub code: i32,
}

/// Texture → model code. Reproduces the mapping the regressor was trained
/// with; do not renumber.
pub static ENCODING_TABLE: &[TextureEncoding] = &[
    TextureEncoding { class: TextureClass::Clay, code: 0 },
    TextureEncoding { class: TextureClass::ClayLoam, code: 1 },
    TextureEncoding { class: TextureClass::Loam, code: 2 },
    TextureEncoding { class: TextureClass::LoamySand, code: 3 },
    TextureEncoding { class: TextureClass::Sand, code: 4 },
    TextureEncoding { class: TextureClass::SandyClay, code: 5 },
    TextureEncoding { class: TextureClass::SandyLoamy, code: 6 },
    TextureEncoding { class: TextureClass::SiltyClay, code: 7 },
    TextureEncoding { class: TextureClass::SiltyClayLoam, code: 8 },
    TextureEncoding { class: TextureClass::SiltyLoam, code: 9 },
    TextureEncoding { class: TextureClass::SandyLoam, code: 10 },
    TextureEncoding { class: TextureClass::SandyClayLoam, code: 11 },
    TextureEncoding { class: TextureClass::Unknown, code: UNKNOWN_CODE },
];

// ---------------------------------------------------------------------------
// Classification rules
// ---------------------------------------------------------------------------

/// One classification rule. `matches` takes `(sand, silt, clay)` in percent.
pub struct TextureRule {
    pub class: TextureClass,
    pub matches: fn(f64, f64, f64) -> bool,
}

/// Canonical rule order. Rules are evaluated top to bottom and the first
/// match wins; anything that falls through is `Unknown`.
///
/// The predicates overlap. In particular CLAY LOAM (`clay >= 27 and
/// sand <= 45`) and SANDY CLAY (`clay >= 35 and sand > 45`) together cover
/// every input the SILTY CLAY and SILTY CLAY LOAM rules could match, so those
/// two are shadowed under this ordering. They are kept so the table stays
/// complete.
pub static TEXTURE_RULES: &[TextureRule] = &[
    TextureRule {
        class: TextureClass::Sand,
        matches: |_sand, silt, clay| silt + clay < 20.0,
    },
    TextureRule {
        class: TextureClass::LoamySand,
        matches: |sand, silt, clay| sand > 52.0 && silt < 50.0 && clay < 20.0,
    },
    TextureRule {
        class: TextureClass::SandyLoam,
        matches: |sand, silt, clay| sand > 52.0 && (silt >= 50.0 || clay >= 20.0),
    },
    TextureRule {
        class: TextureClass::Silt,
        matches: |_sand, silt, clay| silt >= 80.0 && clay < 12.0,
    },
    TextureRule {
        class: TextureClass::SiltLoam,
        matches: |_sand, silt, clay| silt >= 50.0 && (12.0..27.0).contains(&clay),
    },
    TextureRule {
        class: TextureClass::ClayLoam,
        matches: |sand, _silt, clay| clay >= 27.0 && sand <= 45.0,
    },
    TextureRule {
        class: TextureClass::Loam,
        matches: |sand, silt, clay| {
            (20.0..27.0).contains(&clay) && (28.0..50.0).contains(&silt) && sand <= 52.0
        },
    },
    TextureRule {
        class: TextureClass::SandyClay,
        matches: |sand, _silt, clay| clay >= 35.0 && sand > 45.0,
    },
    TextureRule {
        class: TextureClass::SiltyClay,
        matches: |_sand, silt, clay| clay >= 35.0 && silt > 40.0,
    },
    TextureRule {
        class: TextureClass::SandyClayLoam,
        matches: |sand, _silt, clay| (27.0..40.0).contains(&clay) && sand > 45.0,
    },
    TextureRule {
        class: TextureClass::SiltyClayLoam,
        matches: |sand, silt, clay| {
            (27.0..40.0).contains(&clay) && silt > 28.0 && sand <= 45.0
        },
    },
];

/// Classifies a soil by its sand, silt and clay percentages.
///
/// Inputs are percentages (0–100); unit conversion is the caller's job.
/// Never fails: anything no rule claims, including NaN input, is `Unknown`.
pub fn classify(sand_pct: f64, silt_pct: f64, clay_pct: f64) -> (TextureClass, i32) {
    let class = TEXTURE_RULES
        .iter()
        .find(|rule| (rule.matches)(sand_pct, silt_pct, clay_pct))
        .map(|rule| rule.class)
        .unwrap_or(TextureClass::Unknown);

    (class, class.code())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Encoding table -----------------------------------------------------

    #[test]
    fn test_encoding_table_matches_training_codes() {
        let expected = [
            ("CLAY", 0),
            ("CLAY LOAM", 1),
            ("LOAM", 2),
            ("LOAMY SAND", 3),
            ("SAND", 4),
            ("SANDY CLAY", 5),
            ("SANDY LOAMY", 6),
            ("SILTY CLAY", 7),
            ("SILTY CLAY LOAM", 8),
            ("SILTY LOAM", 9),
            ("SANDY LOAM", 10),
            ("SANDY CLAY LOAM", 11),
            ("Unknown", -1),
        ];
        assert_eq!(ENCODING_TABLE.len(), expected.len());
        for (label, code) in expected {
            let class = TextureClass::from_label(label)
                .unwrap_or_else(|| panic!("'{}' should be a known label", label));
            assert_eq!(class.code(), code, "wrong code for '{}'", label);
        }
    }

    #[test]
    fn test_no_duplicate_codes_or_classes_in_table() {
        let mut codes = std::collections::HashSet::new();
        let mut classes = std::collections::HashSet::new();
        for entry in ENCODING_TABLE {
            assert!(codes.insert(entry.code), "duplicate code {}", entry.code);
            assert!(classes.insert(entry.class), "duplicate class {}", entry.class);
        }
    }

    #[test]
    fn test_code_round_trip_is_stable_for_named_classes() {
        for code in 0..=11 {
            let class = TextureClass::from_code(code)
                .unwrap_or_else(|| panic!("code {} should map to a class", code));
            assert_eq!(class.code(), code);
        }
        assert_eq!(TextureClass::from_code(-1), Some(TextureClass::Unknown));
        assert_eq!(TextureClass::from_code(12), None);
    }

    #[test]
    fn test_classes_outside_table_encode_as_unknown() {
        assert_eq!(TextureClass::Silt.code(), UNKNOWN_CODE);
        assert_eq!(TextureClass::SiltLoam.code(), UNKNOWN_CODE);
    }

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(TextureClass::from_label("sandy clay loam"), Some(TextureClass::SandyClayLoam));
        assert_eq!(TextureClass::from_label(" Loam "), Some(TextureClass::Loam));
        assert_eq!(TextureClass::from_label("peat"), None);
    }

    // --- One representative sample per reachable rule -----------------------

    #[test]
    fn test_classify_each_reachable_rule() {
        let cases = [
            ((90.0, 5.0, 5.0), TextureClass::Sand, 4),
            ((70.0, 15.0, 15.0), TextureClass::LoamySand, 3),
            ((60.0, 15.0, 25.0), TextureClass::SandyLoam, 10),
            ((5.0, 88.0, 7.0), TextureClass::Silt, -1),
            ((20.0, 65.0, 15.0), TextureClass::SiltLoam, -1),
            ((20.0, 40.0, 40.0), TextureClass::ClayLoam, 1),
            ((45.0, 32.0, 23.0), TextureClass::Loam, 2),
            ((50.0, 10.0, 40.0), TextureClass::SandyClay, 5),
            ((50.0, 20.0, 30.0), TextureClass::SandyClayLoam, 11),
            ((48.0, 40.0, 12.0), TextureClass::Unknown, -1),
        ];
        for ((sand, silt, clay), class, code) in cases {
            assert_eq!(
                classify(sand, silt, clay),
                (class, code),
                "sand={} silt={} clay={}",
                sand,
                silt,
                clay
            );
        }
    }

    // --- Boundaries ----------------------------------------------------------

    #[test]
    fn test_loamy_sand_just_above_sand_threshold() {
        assert_eq!(classify(52.01, 49.0, 19.0).0, TextureClass::LoamySand);
    }

    #[test]
    fn test_sandy_loam_needs_sand_strictly_above_52() {
        // sand > 52 is strict: at exactly 52 the SANDY LOAM rule does not
        // fire and silt=50 / clay=20 lands in SILT LOAM instead.
        assert_eq!(classify(52.01, 50.0, 20.0).0, TextureClass::SandyLoam);
        assert_eq!(classify(52.0, 50.0, 20.0).0, TextureClass::SiltLoam);
    }

    #[test]
    fn test_sand_rule_boundary_is_strict() {
        assert_eq!(classify(80.5, 10.0, 9.5).0, TextureClass::Sand);
        // silt + clay == 20 is no longer SAND
        assert_eq!(classify(80.0, 10.0, 10.0).0, TextureClass::LoamySand);
    }

    #[test]
    fn test_all_zero_fractions_classify_as_sand() {
        // What a gateway that failed on every property produces.
        assert_eq!(classify(0.0, 0.0, 0.0), (TextureClass::Sand, 4));
    }

    #[test]
    fn test_nan_input_is_unknown() {
        assert_eq!(classify(f64::NAN, 40.0, 20.0).0, TextureClass::Unknown);
    }

    // --- Ordering --------------------------------------------------------------

    #[test]
    fn test_clay_loam_shadows_silty_clay() {
        // Matches both CLAY LOAM and SILTY CLAY; CLAY LOAM comes first.
        let (sand, silt, clay) = (10.0, 45.0, 45.0);
        let silty_clay = TEXTURE_RULES
            .iter()
            .find(|r| r.class == TextureClass::SiltyClay)
            .expect("SILTY CLAY rule should exist");
        assert!((silty_clay.matches)(sand, silt, clay));
        assert_eq!(classify(sand, silt, clay).0, TextureClass::ClayLoam);
    }

    #[test]
    fn test_clay_loam_shadows_silty_clay_loam() {
        let (sand, silt, clay) = (30.0, 40.0, 30.0);
        let rule = TEXTURE_RULES
            .iter()
            .find(|r| r.class == TextureClass::SiltyClayLoam)
            .expect("SILTY CLAY LOAM rule should exist");
        assert!((rule.matches)(sand, silt, clay));
        assert_eq!(classify(sand, silt, clay).0, TextureClass::ClayLoam);
    }

    #[test]
    fn test_rule_order_is_canonical() {
        let order: Vec<TextureClass> = TEXTURE_RULES.iter().map(|r| r.class).collect();
        assert_eq!(
            order,
            vec![
                TextureClass::Sand,
                TextureClass::LoamySand,
                TextureClass::SandyLoam,
                TextureClass::Silt,
                TextureClass::SiltLoam,
                TextureClass::ClayLoam,
                TextureClass::Loam,
                TextureClass::SandyClay,
                TextureClass::SiltyClay,
                TextureClass::SandyClayLoam,
                TextureClass::SiltyClayLoam,
            ]
        );
    }

    // --- Whole-triangle sweep --------------------------------------------------

    #[test]
    fn test_sweep_returns_closed_set_with_table_codes() {
        // Every composition on a 1% grid of the texture triangle.
        for clay in 0..=100 {
            for silt in 0..=(100 - clay) {
                let sand = 100 - clay - silt;
                let (class, code) = classify(sand as f64, silt as f64, clay as f64);

                assert_ne!(class, TextureClass::SandyLoamy, "legacy alias must never be produced");
                assert_ne!(class, TextureClass::Clay);
                assert_ne!(class, TextureClass::SiltyLoam);
                assert_eq!(code, class.code());
                assert!((-1..=11).contains(&code));

                // classify is pure
                assert_eq!(classify(sand as f64, silt as f64, clay as f64), (class, code));
            }
        }
    }
}
