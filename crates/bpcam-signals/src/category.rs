//! Blood-pressure categories
//!
//! Half-open thresholds in mmHg:
//!
//! | category             | systolic      |     | diastolic    |
//! |----------------------|---------------|-----|--------------|
//! | Normal               | `< 120`       | and | `< 80`       |
//! | Elevated             | `120 ..< 130` | and | `< 80`       |
//! | Hypertension Stage 1 | `130 ..< 140` | or  | `80 ..< 90`  |
//! | Hypertension Stage 2 | `>= 140`      | or  | `>= 90`      |
//!
//! When the two pressures point at different rows the higher category wins,
//! so `(140, 89)` is Stage 2 and `(129.9, 80)` is Stage 1.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clinical category, ordered from lowest to highest risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BpCategory {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Elevated")]
    Elevated,
    #[serde(rename = "Hypertension Stage 1")]
    HypertensionStage1,
    #[serde(rename = "Hypertension Stage 2")]
    HypertensionStage2,
}

/// Advice shared by every category
pub const GENERAL_SUGGESTIONS: [&str; 2] = [
    "Stay hydrated throughout the day",
    "Ensure 7-8 hours of quality sleep each night",
];

impl BpCategory {
    pub const ALL: [BpCategory; 4] = [
        BpCategory::Normal,
        BpCategory::Elevated,
        BpCategory::HypertensionStage1,
        BpCategory::HypertensionStage2,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BpCategory::Normal => "Normal",
            BpCategory::Elevated => "Elevated",
            BpCategory::HypertensionStage1 => "Hypertension Stage 1",
            BpCategory::HypertensionStage2 => "Hypertension Stage 2",
        }
    }

    /// Inverse of [`label`](Self::label)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Category-specific lifestyle advice
    pub fn specific_suggestions(&self) -> &'static [&'static str] {
        match self {
            BpCategory::Normal => &[
                "Maintain your healthy lifestyle",
                "Continue regular exercise and balanced diet",
            ],
            BpCategory::Elevated => &[
                "Consider reducing sodium intake",
                "Monitor your blood pressure regularly",
            ],
            BpCategory::HypertensionStage1 => &[
                "Consult a healthcare professional",
                "Consider lifestyle changes to lower your blood pressure",
            ],
            BpCategory::HypertensionStage2 => &[
                "Seek medical attention for proper evaluation",
                "Follow your healthcare provider's recommendations",
            ],
        }
    }

    /// Category-specific advice followed by the general advice
    pub fn suggestions(&self) -> Vec<&'static str> {
        self.specific_suggestions()
            .iter()
            .chain(GENERAL_SUGGESTIONS.iter())
            .copied()
            .collect()
    }
}

impl fmt::Display for BpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn systolic_rank(systolic: f64) -> BpCategory {
    if systolic < 120.0 {
        BpCategory::Normal
    } else if systolic < 130.0 {
        BpCategory::Elevated
    } else if systolic < 140.0 {
        BpCategory::HypertensionStage1
    } else {
        // >= 140, and NaN
        BpCategory::HypertensionStage2
    }
}

fn diastolic_rank(diastolic: f64) -> BpCategory {
    if diastolic < 80.0 {
        BpCategory::Normal
    } else if diastolic < 90.0 {
        BpCategory::HypertensionStage1
    } else {
        BpCategory::HypertensionStage2
    }
}

/// Categorize a systolic / diastolic pair (mmHg)
///
/// Total over all `f64` inputs; a NaN pressure lands in Stage 2.
pub fn categorize(systolic: f64, diastolic: f64) -> BpCategory {
    systolic_rank(systolic).max(diastolic_rank(diastolic))
}

/// Final labelled reading of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpReading {
    pub systolic: f64,
    pub diastolic: f64,
    pub category: BpCategory,
}

impl BpReading {
    pub fn new(systolic: f64, diastolic: f64) -> Self {
        Self {
            systolic,
            diastolic,
            category: categorize(systolic, diastolic),
        }
    }
}

impl fmt::Display for BpReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}/{:.0} mmHg ({})", self.systolic, self.diastolic, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(categorize(119.9, 79.9), BpCategory::Normal);
        assert_eq!(categorize(120.0, 79.9), BpCategory::Elevated);
        assert_eq!(categorize(129.9, 79.9), BpCategory::Elevated);
        assert_eq!(categorize(129.9, 80.0), BpCategory::HypertensionStage1);
        assert_eq!(categorize(130.0, 70.0), BpCategory::HypertensionStage1);
        assert_eq!(categorize(139.9, 89.9), BpCategory::HypertensionStage1);
        assert_eq!(categorize(140.0, 89.0), BpCategory::HypertensionStage2);
        assert_eq!(categorize(110.0, 90.0), BpCategory::HypertensionStage2);
    }

    #[test]
    fn test_diastolic_alone_lifts_category() {
        assert_eq!(categorize(100.0, 85.0), BpCategory::HypertensionStage1);
        assert_eq!(categorize(125.0, 80.0), BpCategory::HypertensionStage1);
    }

    #[test]
    fn test_systolic_alone_lifts_category() {
        // Diastolic points at Stage 1, systolic at Stage 2: the higher row wins
        assert_eq!(categorize(150.0, 85.0), BpCategory::HypertensionStage2);
        assert_eq!(categorize(135.0, 70.0), BpCategory::HypertensionStage1);
    }

    #[test]
    fn test_nan_is_stage_2() {
        assert_eq!(categorize(f64::NAN, 70.0), BpCategory::HypertensionStage2);
        assert_eq!(categorize(110.0, f64::NAN), BpCategory::HypertensionStage2);
    }

    #[test]
    fn test_ordering() {
        assert!(BpCategory::Normal < BpCategory::Elevated);
        assert!(BpCategory::Elevated < BpCategory::HypertensionStage1);
        assert!(BpCategory::HypertensionStage1 < BpCategory::HypertensionStage2);
    }

    #[test]
    fn test_reading_serializes_label() {
        let reading = BpReading::new(130.0, 90.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(
            json,
            r#"{"systolic":130.0,"diastolic":90.0,"category":"Hypertension Stage 2"}"#
        );
        let back: BpReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_labels_and_suggestions() {
        for category in BpCategory::ALL {
            assert_eq!(BpCategory::from_label(category.label()), Some(category));
            let suggestions = category.suggestions();
            assert_eq!(suggestions.len(), 4);
            assert_eq!(&suggestions[2..], &GENERAL_SUGGESTIONS[..]);
        }
        assert_eq!(BpCategory::from_label("Crisis"), None);
    }

    proptest! {
        #[test]
        fn test_table_rules_hold(s in 0.0f64..250.0, d in 0.0f64..160.0) {
            let category = categorize(s, d);
            let expected = if s < 120.0 && d < 80.0 {
                BpCategory::Normal
            } else if (120.0..130.0).contains(&s) && d < 80.0 {
                BpCategory::Elevated
            } else if s >= 140.0 || d >= 90.0 {
                BpCategory::HypertensionStage2
            } else if (130.0..140.0).contains(&s) || (80.0..90.0).contains(&d) {
                BpCategory::HypertensionStage1
            } else {
                unreachable!("uncovered pair ({}, {})", s, d)
            };
            prop_assert_eq!(category, expected);
        }

        #[test]
        fn test_monotone_in_each_pressure(s in 0.0f64..250.0, d in 0.0f64..160.0, bump in 0.0f64..50.0) {
            prop_assert!(categorize(s + bump, d) >= categorize(s, d));
            prop_assert!(categorize(s, d + bump) >= categorize(s, d));
        }
    }
}
