//! Adaptive learning model
//!
//! Keeps one bounded (grind, time) offset pair per grinder + brew method and
//! refines it from diagnoser verdicts. Offsets are only applied to recipes
//! once a key has collected the minimum number of samples.
//!
//! # Update rule
//! - strength = `min(confidence / max_confidence, 1)`
//! - strength below the noise threshold: count the sample, leave offsets
//! - `under`: grind finer (`-grind_step * strength`), time longer
//!   (`+time_step * strength`)
//! - `over`: the mirror image
//! - `balanced`: count the sample only
//! - offsets are clamped after every update

use crate::diagnosis::{ExtractionState, ExtractionVerdict};
use crate::error::Error;
use crate::params::LearningParams;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Separator used by the serialized key form
const KEY_SEPARATOR: &str = "::";

/// Grind offset magnitude above which status reports a grinder insight
const GRIND_INSIGHT_THRESHOLD: f64 = 0.5;

/// Time offset magnitude (seconds) above which status reports a time insight
const TIME_INSIGHT_THRESHOLD: f64 = 2.0;

/// Unit of personalization: one grinder used for one brew method
///
/// Neither part may be blank or contain the `::` separator, and no colon
/// may touch the separator, so the serialized form always parses back to
/// the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LearningKey {
    grinder: String,
    method: String,
}

impl LearningKey {
    pub fn new(grinder: impl Into<String>, method: impl Into<String>) -> Result<Self, Error> {
        let grinder = grinder.into();
        let method = method.into();
        if grinder.trim().is_empty() || method.trim().is_empty() {
            return Err(Error::InvalidInput(
                "brew method and grinder must both be selected".to_string(),
            ));
        }
        // A colon next to the separator would shift the split point
        if grinder.contains(KEY_SEPARATOR)
            || method.contains(KEY_SEPARATOR)
            || grinder.ends_with(':')
            || method.starts_with(':')
        {
            return Err(Error::InvalidInput(format!(
                "grinder '{}' and method '{}' must not contain '{}'",
                grinder, method, KEY_SEPARATOR
            )));
        }
        Ok(Self { grinder, method })
    }

    pub fn grinder(&self) -> &str {
        &self.grinder
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for LearningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.grinder, KEY_SEPARATOR, self.method)
    }
}

impl FromStr for LearningKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (grinder, method) = s.split_once(KEY_SEPARATOR).ok_or_else(|| {
            Error::InvalidInput(format!(
                "learning key '{}' is not of the form grinder::method",
                s
            ))
        })?;
        Self::new(grinder, method)
    }
}

impl Serialize for LearningKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LearningKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Learned offsets for one key
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProfile {
    /// Grinder clicks added to the base setting (negative = finer)
    pub grind_offset: f64,
    /// Seconds added to the base time
    pub time_offset: f64,
    /// Feedback events counted for this key
    pub samples: u32,
}

impl LearningProfile {
    /// Clamp offsets to the configured bounds; non-finite offsets reset to 0
    pub fn clamp_to(&mut self, params: &LearningParams) {
        self.grind_offset = clamp_offset(self.grind_offset, params.max_grind_offset);
        self.time_offset = clamp_offset(self.time_offset, params.max_time_offset);
    }
}

fn clamp_offset(value: f64, bound: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}

/// Result of applying learned offsets to a base recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAdjustment {
    pub grind: f64,
    pub time: f64,
    #[serde(rename = "learningApplied")]
    pub applied: bool,
    pub reason: String,
    /// Samples recorded for the key (0 if it has never been seen)
    pub samples: u32,
    /// Samples still required before offsets apply
    pub samples_needed: u32,
}

/// Human-facing summary of a key's learning progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStatus {
    pub samples: u32,
    pub progress_percent: f64,
    pub active: bool,
    pub status_text: String,
    pub insights: Vec<String>,
}

/// Per-key learning store
#[derive(Debug, Clone, Default)]
pub struct LearningModel {
    profiles: BTreeMap<LearningKey, LearningProfile>,
    params: LearningParams,
}

impl LearningModel {
    pub fn new(params: LearningParams) -> Self {
        Self {
            profiles: BTreeMap::new(),
            params,
        }
    }

    /// Build a model from existing profiles, clamping each one
    pub fn from_profiles(
        mut profiles: BTreeMap<LearningKey, LearningProfile>,
        params: LearningParams,
    ) -> Self {
        for profile in profiles.values_mut() {
            profile.clamp_to(&params);
        }
        Self { profiles, params }
    }

    pub fn params(&self) -> &LearningParams {
        &self.params
    }

    pub fn profiles(&self) -> &BTreeMap<LearningKey, LearningProfile> {
        &self.profiles
    }

    pub fn get(&self, key: &LearningKey) -> Option<&LearningProfile> {
        self.profiles.get(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Sum of samples across all keys
    pub fn total_samples(&self) -> u64 {
        self.profiles.values().map(|p| u64::from(p.samples)).sum()
    }

    /// Fold one verdict into the key's profile and return the new profile
    pub fn update(&mut self, key: &LearningKey, verdict: &ExtractionVerdict) -> LearningProfile {
        let params = self.params;
        let profile = self.profiles.entry(key.clone()).or_insert_with(|| {
            info!(key = %key, "Created learning profile");
            LearningProfile::default()
        });

        let strength = params.strength(verdict.confidence);

        if strength < params.noise_threshold {
            profile.samples = profile.samples.saturating_add(1);
            debug!(
                key = %key,
                strength,
                samples = profile.samples,
                "Low-signal feedback counted without adjusting offsets"
            );
            return *profile;
        }

        match verdict.state {
            ExtractionState::Under => {
                profile.grind_offset -= params.grind_step * strength;
                profile.time_offset += params.time_step * strength;
            }
            ExtractionState::Over => {
                profile.grind_offset += params.grind_step * strength;
                profile.time_offset -= params.time_step * strength;
            }
            ExtractionState::Balanced => {}
        }

        profile.clamp_to(&params);
        profile.samples = profile.samples.saturating_add(1);

        debug!(
            key = %key,
            state = %verdict.state,
            strength,
            grind_offset = profile.grind_offset,
            time_offset = profile.time_offset,
            samples = profile.samples,
            "Learning profile updated"
        );

        *profile
    }

    /// Apply learned offsets to base values once the sample gate is met
    pub fn adjust(&self, key: &LearningKey, base_grind: f64, base_time: f64) -> LearningAdjustment {
        let min = self.params.min_samples;

        let Some(profile) = self.profiles.get(key) else {
            return LearningAdjustment {
                grind: base_grind,
                time: base_time,
                applied: false,
                reason: "No learning data yet".to_string(),
                samples: 0,
                samples_needed: min,
            };
        };

        if profile.samples < min {
            return LearningAdjustment {
                grind: base_grind,
                time: base_time,
                applied: false,
                reason: format!("Learning in progress ({}/{})", profile.samples, min),
                samples: profile.samples,
                samples_needed: min - profile.samples,
            };
        }

        LearningAdjustment {
            grind: base_grind + profile.grind_offset,
            time: base_time + profile.time_offset,
            applied: true,
            reason: "Learning applied".to_string(),
            samples: profile.samples,
            samples_needed: 0,
        }
    }

    /// Forget one key; returns whether it existed
    pub fn reset(&mut self, key: &LearningKey) -> bool {
        let removed = self.profiles.remove(key).is_some();
        if removed {
            info!(key = %key, "Learning reset");
        }
        removed
    }

    pub fn reset_all(&mut self) {
        info!(keys = self.profiles.len(), "All learning reset");
        self.profiles.clear();
    }

    /// Replace every profile, clamping the incoming values
    pub fn replace_profiles(&mut self, profiles: BTreeMap<LearningKey, LearningProfile>) {
        *self = Self::from_profiles(profiles, self.params);
    }

    /// Progress and insights for one key
    pub fn status(&self, key: &LearningKey) -> LearningStatus {
        let min = self.params.min_samples;
        let profile = match self.profiles.get(key) {
            Some(p) if p.samples > 0 => *p,
            _ => {
                return LearningStatus {
                    samples: 0,
                    progress_percent: 0.0,
                    active: false,
                    status_text:
                        "Start building your personalized model by brewing and rating!"
                            .to_string(),
                    insights: Vec::new(),
                }
            }
        };

        let progress_percent = (f64::from(profile.samples) / f64::from(min) * 100.0).min(100.0);
        let active = profile.samples >= min;

        let status_text = if active {
            format!("Active learning ({} brews recorded)", profile.samples)
        } else {
            format!("Gathering data ({}/{} brews needed)", profile.samples, min)
        };

        let mut insights = Vec::new();
        if active {
            if profile.grind_offset.abs() > GRIND_INSIGHT_THRESHOLD {
                let direction = if profile.grind_offset < 0.0 { "finer" } else { "coarser" };
                insights.push(format!(
                    "Your grinder runs {:.1} clicks {} than average",
                    profile.grind_offset.abs(),
                    direction
                ));
            }
            if profile.time_offset.abs() > TIME_INSIGHT_THRESHOLD {
                let direction = if profile.time_offset > 0.0 { "longer" } else { "shorter" };
                insights.push(format!(
                    "Your setup needs {:.0}s {} extraction time",
                    profile.time_offset.abs(),
                    direction
                ));
            }
            if insights.is_empty() {
                insights.push("Your setup aligns closely with standard recommendations".to_string());
            }
        }

        LearningStatus {
            samples: profile.samples,
            progress_percent,
            active,
            status_text,
            insights,
        }
    }
}
