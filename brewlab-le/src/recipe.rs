//! Recipe resolution: static catalog plus learned adjustment

use crate::catalog::{self, BrewRecommendation};
use crate::error::Result;
use crate::learning::{LearningAdjustment, LearningKey, LearningModel};
use serde::Serialize;
use tracing::debug;

/// Starting recipe for a grinder + method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub method: String,
    pub grinder: String,
    pub recommendation: Option<BrewRecommendation>,
    pub base_grind: Option<i32>,
    pub base_time_secs: Option<u32>,
    /// Present only when both a base grind and a base time exist
    pub adjustment: Option<LearningAdjustment>,
}

impl Recipe {
    pub fn learning_key(&self) -> Result<LearningKey> {
        LearningKey::new(&self.grinder, &self.method)
    }
}

/// Resolves recipes against a learning model
#[derive(Debug, Clone, Copy)]
pub struct RecipeResolver<'a> {
    model: &'a LearningModel,
}

impl<'a> RecipeResolver<'a> {
    pub fn new(model: &'a LearningModel) -> Self {
        Self { model }
    }

    pub fn resolve(&self, method: &str, grinder: &str) -> Recipe {
        let recommendation = catalog::recommendation(method).copied();
        let base_grind = catalog::base_grind(grinder, method);
        let base_time_secs = recommendation.and_then(|r| r.base_time_seconds());

        let adjustment = match (base_grind, base_time_secs) {
            // Catalog ids are always valid keys
            (Some(grind), Some(time)) => LearningKey::new(grinder, method)
                .ok()
                .map(|key| self.model.adjust(&key, f64::from(grind), f64::from(time))),
            _ => None,
        };

        debug!(
            method,
            grinder,
            ?base_grind,
            ?base_time_secs,
            adjusted = adjustment.is_some(),
            "Resolved recipe"
        );

        Recipe {
            method: method.to_string(),
            grinder: grinder.to_string(),
            recommendation,
            base_grind,
            base_time_secs,
            adjustment,
        }
    }
}
