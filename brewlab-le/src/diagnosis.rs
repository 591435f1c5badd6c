//! Extraction Diagnoser
//!
//! Maps a set of 0-10 sensory ratings to an extraction verdict
//! (under / over / balanced) plus a confidence magnitude.
//!
//! # Scoring Algorithm
//! 1. Each present rating is normalized around the neutral score of 5:
//!    `(raw - 5) / 5`, giving a value in [-1, 1].
//! 2. The normalized value is multiplied by the attribute weight.
//! 3. The weighted value is routed by the attribute's direction:
//!    - **Under-only** (acidity, sweetness): only deficits count, toward under.
//!    - **Both**: deficits count toward under, surpluses toward over.
//! 4. `under` wins if it leads `over` by more than the hysteresis margin,
//!    and vice versa; otherwise the cup is `balanced`.
//! 5. Confidence is `|under - over|`, unbounded.
//!
//! # Weights
//! | Attribute  | Weight | Direction  |
//! |------------|--------|------------|
//! | aroma      | 0.5    | both       |
//! | flavor     | 1.5    | both       |
//! | aftertaste | 1.2    | both       |
//! | acidity    | 1.3    | under-only |
//! | body       | 1.0    | both       |
//! | balance    | 1.5    | both       |
//! | sweetness  | 1.4    | under-only |
//! | overall    | 1.0    | both       |

use crate::error::{Error, Result};
use crate::params::DiagnosisParams;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Score treated as neither deficit nor surplus
const NEUTRAL_SCORE: f64 = 5.0;

/// Valid rating range
const MIN_SCORE: f64 = 0.0;
const MAX_SCORE: f64 = 10.0;

/// Sensory attributes rated on the SCA-style feedback form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Aroma,
    Flavor,
    Aftertaste,
    Acidity,
    Body,
    Balance,
    Sweetness,
    Overall,
}

/// Which extraction side a weighted deviation may count toward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only deficits count, toward under-extraction
    UnderOnly,
    /// Deficits count toward under, surpluses toward over
    Both,
}

impl Attribute {
    /// All attributes in form order
    pub const ALL: [Attribute; 8] = [
        Attribute::Aroma,
        Attribute::Flavor,
        Attribute::Aftertaste,
        Attribute::Acidity,
        Attribute::Body,
        Attribute::Balance,
        Attribute::Sweetness,
        Attribute::Overall,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Aroma => "aroma",
            Attribute::Flavor => "flavor",
            Attribute::Aftertaste => "aftertaste",
            Attribute::Acidity => "acidity",
            Attribute::Body => "body",
            Attribute::Balance => "balance",
            Attribute::Sweetness => "sweetness",
            Attribute::Overall => "overall",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Attribute::Aroma => 0.5,
            Attribute::Flavor => 1.5,
            Attribute::Aftertaste => 1.2,
            Attribute::Acidity => 1.3,
            Attribute::Body => 1.0,
            Attribute::Balance => 1.5,
            Attribute::Sweetness => 1.4,
            Attribute::Overall => 1.0,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Attribute::Acidity | Attribute::Sweetness => Direction::UnderOnly,
            _ => Direction::Both,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Attribute::ALL
            .iter()
            .copied()
            .find(|a| a.name() == needle)
            .ok_or_else(|| Error::InvalidInput(format!("unknown sensory attribute '{}'", s)))
    }
}

/// One feedback submission's ratings; absent attributes are `None`
///
/// Stored ratings may be numbers or the raw form strings they were typed
/// as. Blank and non-numeric values decode as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensoryScores {
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub aroma: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub flavor: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub aftertaste: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub acidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub body: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub sweetness: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub overall: Option<f64>,
}

/// Raw stored rating: a number, a form string, or anything else
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredScore {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match StoredScore::deserialize(deserializer)? {
        StoredScore::Number(v) => Some(v),
        StoredScore::Text(raw) => raw.trim().parse::<f64>().ok(),
        StoredScore::Other(_) => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

impl SensoryScores {
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Aroma => self.aroma,
            Attribute::Flavor => self.flavor,
            Attribute::Aftertaste => self.aftertaste,
            Attribute::Acidity => self.acidity,
            Attribute::Body => self.body,
            Attribute::Balance => self.balance,
            Attribute::Sweetness => self.sweetness,
            Attribute::Overall => self.overall,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: Option<f64>) {
        let slot = match attribute {
            Attribute::Aroma => &mut self.aroma,
            Attribute::Flavor => &mut self.flavor,
            Attribute::Aftertaste => &mut self.aftertaste,
            Attribute::Acidity => &mut self.acidity,
            Attribute::Body => &mut self.body,
            Attribute::Balance => &mut self.balance,
            Attribute::Sweetness => &mut self.sweetness,
            Attribute::Overall => &mut self.overall,
        };
        *slot = value;
    }

    /// Builder-style setter
    pub fn with(mut self, attribute: Attribute, value: f64) -> Self {
        self.set(attribute, Some(value));
        self
    }

    /// Present, finite ratings in form order
    pub fn present(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        Attribute::ALL
            .iter()
            .filter_map(move |&a| self.get(a).filter(|v| v.is_finite()).map(|v| (a, v)))
    }

    /// True when no attribute carries a usable rating
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Apply one `attribute=value` assignment
    ///
    /// Unknown attributes and out-of-range numbers are rejected. A value that
    /// is blank or not a number leaves the attribute absent.
    pub fn apply_pair(&mut self, pair: &str) -> Result<()> {
        let (name, raw) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("expected attribute=value, got '{}'", pair))
        })?;
        let attribute: Attribute = name.parse()?;

        let value = match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                debug!(attribute = %attribute, raw, "Ignoring non-numeric rating");
                None
            }
        };

        if let Some(v) = value {
            if !(MIN_SCORE..=MAX_SCORE).contains(&v) {
                return Err(Error::InvalidInput(format!(
                    "{} rating {} outside [{}, {}]",
                    attribute, v, MIN_SCORE, MAX_SCORE
                )));
            }
        }

        self.set(attribute, value);
        Ok(())
    }

    /// Parse a list of `attribute=value` assignments
    pub fn from_pairs<I, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut scores = Self::default();
        for pair in pairs {
            scores.apply_pair(pair.as_ref())?;
        }
        Ok(scores)
    }
}

/// Extraction classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionState {
    Under,
    Over,
    Balanced,
}

impl ExtractionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionState::Under => "under",
            ExtractionState::Over => "over",
            ExtractionState::Balanced => "balanced",
        }
    }
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnoser output, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionVerdict {
    #[serde(rename = "extractionState")]
    pub state: ExtractionState,
    /// `|under_score - over_score|`, unbounded
    pub confidence: f64,
    #[serde(default)]
    pub under_score: f64,
    #[serde(default)]
    pub over_score: f64,
    /// Weighted deviation per present attribute
    #[serde(default)]
    pub signals: BTreeMap<Attribute, f64>,
}

impl ExtractionVerdict {
    /// False when no attribute contributed; a `balanced` verdict then
    /// means "no information", not a genuinely balanced cup
    pub fn has_signal(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Confidence formatted for display
    pub fn confidence_display(&self) -> String {
        format!("{:.2}", self.confidence)
    }
}

/// Normalize a raw rating to [-1, 1] around the neutral score
pub fn normalize_score(raw: f64) -> f64 {
    (raw - NEUTRAL_SCORE) / NEUTRAL_SCORE
}

/// Extraction diagnoser
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnoser {
    params: DiagnosisParams,
}

impl Diagnoser {
    /// Create a diagnoser with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: DiagnosisParams) -> Self {
        Self { params }
    }

    pub fn diagnose(&self, scores: &SensoryScores) -> ExtractionVerdict {
        let mut under_score = 0.0;
        let mut over_score = 0.0;
        let mut signals = BTreeMap::new();

        for (attribute, raw) in scores.present() {
            let weighted = normalize_score(raw) * attribute.weight();
            signals.insert(attribute, weighted);

            if weighted < 0.0 {
                under_score += weighted.abs();
            } else if weighted > 0.0 && attribute.direction() == Direction::Both {
                over_score += weighted;
            }
        }

        let margin = self.params.hysteresis_margin;
        let state = if under_score > over_score + margin {
            ExtractionState::Under
        } else if over_score > under_score + margin {
            ExtractionState::Over
        } else {
            ExtractionState::Balanced
        };

        let confidence = (under_score - over_score).abs();

        debug!(
            state = %state,
            confidence,
            under = under_score,
            over = over_score,
            attributes = signals.len(),
            "Extraction diagnosis complete"
        );

        ExtractionVerdict {
            state,
            confidence,
            under_score,
            over_score,
            signals,
        }
    }
}

/// Diagnose with default parameters
pub fn diagnose(scores: &SensoryScores) -> ExtractionVerdict {
    Diagnoser::new().diagnose(scores)
}
