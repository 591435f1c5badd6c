//! Brew history records
//!
//! Append-only log of feedback submissions. Field names follow the
//! persisted JSON layout (`selections`, `scaFeedback`,
//! `extractionDiagnosis`, `timestamp` in epoch milliseconds).

use crate::catalog::UserType;
use crate::diagnosis::{ExtractionVerdict, SensoryScores};
use crate::error::Result;
use crate::learning::LearningKey;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Equipment and coffee chosen for a brew
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    #[serde(default)]
    pub user_type: UserType,
    pub brew_method: String,
    pub grinder: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub altitude: String,
    #[serde(default)]
    pub processing: String,
    #[serde(default)]
    pub roast_level: String,
}

impl Selections {
    pub fn new(brew_method: impl Into<String>, grinder: impl Into<String>) -> Self {
        Self {
            brew_method: brew_method.into(),
            grinder: grinder.into(),
            ..Default::default()
        }
    }

    /// Key for the chosen grinder + method; fails if either is blank or
    /// cannot be stored as a key
    pub fn learning_key(&self) -> Result<LearningKey> {
        LearningKey::new(&self.grinder, &self.brew_method)
    }

    pub fn is_complete(&self) -> bool {
        self.learning_key().is_ok()
    }
}

/// Optional measurements taken while brewing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrewMeasurements {
    /// Roast date, `YYYY-MM-DD` or RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roast_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grind_setting: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_temp: Option<f64>,
}

/// One feedback submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrewRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub selections: Selections,
    pub sca_feedback: SensoryScores,
    pub extraction_diagnosis: ExtractionVerdict,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl BrewRecord {
    /// New record with a fresh id; the timestamp is truncated to the
    /// millisecond precision it is stored with
    pub fn new(
        selections: Selections,
        sca_feedback: SensoryScores,
        extraction_diagnosis: ExtractionVerdict,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            selections,
            sca_feedback,
            extraction_diagnosis,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::{diagnose, Attribute};
    use chrono::TimeZone;

    #[test]
    fn test_learning_key_orders_grinder_first() {
        let selections = Selections::new("v60", "comandante-c40");
        assert_eq!(selections.learning_key().unwrap().to_string(), "comandante-c40::v60");
    }

    #[test]
    fn test_is_complete() {
        assert!(Selections::new("v60", "comandante-c40").is_complete());
        assert!(!Selections::new("v60", " ").is_complete());
        assert!(!Selections::new("", "niche-zero").is_complete());
        assert!(!Selections::new("v60", "lab::grinder").is_complete());
    }

    #[test]
    fn test_record_json_layout() {
        let scores = SensoryScores::default().with(Attribute::Flavor, 3.0);
        let ts = Utc.with_ymd_and_hms(2026, 5, 1, 7, 30, 0).unwrap();
        let record = BrewRecord::new(
            Selections::new("espresso", "niche-zero"),
            scores,
            diagnose(&scores),
            ts,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], ts.timestamp_millis());
        assert_eq!(json["selections"]["brewMethod"], "espresso");
        assert_eq!(json["selections"]["userType"], "home");
        assert_eq!(json["scaFeedback"]["flavor"], 3.0);
        assert!(json["scaFeedback"].get("aroma").is_none());
        assert_eq!(json["extractionDiagnosis"]["extractionState"], "under");

        let back: BrewRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_without_id_gets_one() {
        let json = serde_json::json!({
            "selections": {"brewMethod": "v60", "grinder": "fellow-ode"},
            "scaFeedback": {"acidity": 4.0},
            "extractionDiagnosis": {"extractionState": "balanced", "confidence": 0.0},
            "timestamp": 1_700_000_000_000i64
        });
        let record: BrewRecord = serde_json::from_value(json).unwrap();
        assert!(!record.id.is_nil());
        assert_eq!(record.selections.origin, "");
    }
}
