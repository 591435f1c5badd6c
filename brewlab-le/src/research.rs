//! Anonymized research data collection
//!
//! When the user has opted into data sharing, each feedback submission is
//! reduced to an anonymized entry (ISO week instead of a date, no grinder or
//! user identifiers) and appended to a bounded queue. Only the most recent
//! [`RESEARCH_QUEUE_CAPACITY`] entries are kept.

use crate::diagnosis::ExtractionState;
use crate::history::{BrewMeasurements, BrewRecord};
use brewlab_common::time;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Maximum retained research entries (oldest evicted first)
pub const RESEARCH_QUEUE_CAPACITY: usize = 100;

/// Placeholder for selection fields the user left blank
const UNKNOWN: &str = "unknown";

/// One anonymized brew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchEntry {
    pub week_id: String,
    pub brew_method: String,
    pub extraction_state: ExtractionState,
    pub confidence: f64,
    pub origin: String,
    pub altitude: String,
    pub processing: String,
    pub roast_level: String,
    pub dose_grams: Option<f64>,
    pub yield_grams: Option<f64>,
    pub actual_grind_setting: Option<f64>,
    pub roast_age_weeks: Option<i64>,
    pub water_temp_c: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

/// Parse a roast date given as `YYYY-MM-DD` or RFC 3339
fn parse_roast_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole weeks since roasting, `None` if no usable roast date was given
pub fn roast_age_weeks(roast_date: Option<&str>, now: DateTime<Utc>) -> Option<i64> {
    let roast = parse_roast_date(roast_date?)?;
    Some(time::whole_weeks_between(now, roast))
}

/// Reduce a brew to its anonymized research form
pub fn anonymize(
    record: &BrewRecord,
    measurements: &BrewMeasurements,
    now: DateTime<Utc>,
) -> ResearchEntry {
    let selections = &record.selections;
    ResearchEntry {
        week_id: time::iso_week_id(now),
        brew_method: selections.brew_method.clone(),
        extraction_state: record.extraction_diagnosis.state,
        confidence: record.extraction_diagnosis.confidence,
        origin: or_unknown(&selections.origin),
        altitude: or_unknown(&selections.altitude),
        processing: or_unknown(&selections.processing),
        roast_level: or_unknown(&selections.roast_level),
        dose_grams: measurements.dose_used,
        yield_grams: measurements.yield_used,
        actual_grind_setting: measurements.grind_setting,
        roast_age_weeks: roast_age_weeks(measurements.roast_date.as_deref(), now),
        water_temp_c: measurements.water_temp,
        timestamp: now.trunc_subsecs(3),
    }
}

/// Bounded FIFO of research entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResearchQueue {
    entries: Vec<ResearchEntry>,
}

impl ResearchQueue {
    /// Build from stored entries, keeping only the newest ones that fit
    pub fn from_entries(mut entries: Vec<ResearchEntry>) -> Self {
        if entries.len() > RESEARCH_QUEUE_CAPACITY {
            entries.drain(..entries.len() - RESEARCH_QUEUE_CAPACITY);
        }
        Self { entries }
    }

    /// Append, evicting the oldest entries beyond capacity
    pub fn push(&mut self, entry: ResearchEntry) {
        self.entries.push(entry);
        if self.entries.len() > RESEARCH_QUEUE_CAPACITY {
            let excess = self.entries.len() - RESEARCH_QUEUE_CAPACITY;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[ResearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest entries first, at most `limit`
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ResearchEntry> {
        self.entries.iter().rev().take(limit)
    }
}

/// Privacy consent as recorded by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub consented: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data_sharing_enabled: bool,
}
