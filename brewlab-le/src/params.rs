//! Tunable constants for diagnosis and learning
//!
//! The defaults reproduce the engine's established behavior. None of them has
//! a derivation behind it; they are knobs, exposed through the `[learning]`
//! section of the TOML config.

use crate::error::{Error, Result};
use brewlab_common::config::LearningOverrides;

/// Parameters for [`crate::diagnosis::Diagnoser`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosisParams {
    /// Margin one side must lead by before the verdict leaves `balanced`
    ///
    /// Default: 0.2
    pub hysteresis_margin: f64,
}

impl Default for DiagnosisParams {
    fn default() -> Self {
        Self {
            hysteresis_margin: 0.2,
        }
    }
}

/// Parameters for [`crate::learning::LearningModel`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningParams {
    /// Confidence mapped to full learning strength. Default: 3.0
    pub max_confidence: f64,
    /// Strength below which feedback only counts as a sample. Default: 0.15
    pub noise_threshold: f64,
    /// Grind offset change at full strength (clicks). Default: 0.5
    pub grind_step: f64,
    /// Time offset change at full strength (seconds). Default: 1.0
    pub time_step: f64,
    /// Grind offset bound, applied symmetrically. Default: 4.0
    pub max_grind_offset: f64,
    /// Time offset bound in seconds, applied symmetrically. Default: 12.0
    pub max_time_offset: f64,
    /// Samples required before learned offsets are applied. Default: 3
    pub min_samples: u32,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            max_confidence: 3.0,
            noise_threshold: 0.15,
            grind_step: 0.5,
            time_step: 1.0,
            max_grind_offset: 4.0,
            max_time_offset: 12.0,
            min_samples: 3,
        }
    }
}

impl LearningParams {
    /// Map an unbounded confidence onto a [0, 1] learning strength
    pub fn strength(&self, confidence: f64) -> f64 {
        (confidence / self.max_confidence).clamp(0.0, 1.0)
    }
}

/// Combined engine parameters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineParams {
    pub diagnosis: DiagnosisParams,
    pub learning: LearningParams,
}

impl EngineParams {
    /// Apply TOML overrides on top of the defaults and validate the result
    pub fn from_overrides(overrides: &LearningOverrides) -> Result<Self> {
        let mut params = Self::default();
        let d = &mut params.diagnosis;
        let l = &mut params.learning;

        if let Some(v) = overrides.hysteresis_margin {
            d.hysteresis_margin = v;
        }
        if let Some(v) = overrides.max_confidence {
            l.max_confidence = v;
        }
        if let Some(v) = overrides.noise_threshold {
            l.noise_threshold = v;
        }
        if let Some(v) = overrides.grind_step {
            l.grind_step = v;
        }
        if let Some(v) = overrides.time_step {
            l.time_step = v;
        }
        if let Some(v) = overrides.max_grind_offset {
            l.max_grind_offset = v;
        }
        if let Some(v) = overrides.max_time_offset {
            l.max_time_offset = v;
        }
        if let Some(v) = overrides.min_samples {
            l.min_samples = v;
        }

        params.validate()?;
        Ok(params)
    }

    /// Reject values that would break the engine's invariants
    pub fn validate(&self) -> Result<()> {
        let d = &self.diagnosis;
        let l = &self.learning;

        check(d.hysteresis_margin >= 0.0, "hysteresis_margin must be >= 0")?;
        check(l.max_confidence > 0.0, "max_confidence must be > 0")?;
        check(
            (0.0..=1.0).contains(&l.noise_threshold),
            "noise_threshold must be within [0, 1]",
        )?;
        check(l.grind_step >= 0.0, "grind_step must be >= 0")?;
        check(l.time_step >= 0.0, "time_step must be >= 0")?;
        check(l.max_grind_offset > 0.0, "max_grind_offset must be > 0")?;
        check(l.max_time_offset > 0.0, "max_time_offset must be > 0")?;
        check(l.min_samples >= 1, "min_samples must be >= 1")?;
        Ok(())
    }
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidParameter(message.to_string()))
    }
}
