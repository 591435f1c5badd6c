//! Aggregate statistics over collected data
//!
//! Counts come from the research queue (anonymized, consent-gated), the
//! brew history and the learning model.

use crate::history::BrewRecord;
use crate::learning::{LearningKey, LearningModel, LearningProfile};
use crate::research::{ResearchEntry, ResearchQueue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Version tag of the admin export payload
pub const ADMIN_EXPORT_VERSION: u32 = 2;

/// Origins shown in the text report
pub const TOP_ORIGINS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_brews: usize,
    pub total_research_entries: usize,
    /// Distinct week ids in the research queue
    pub unique_users: usize,
    pub brew_methods: BTreeMap<String, usize>,
    pub extraction_states: BTreeMap<String, usize>,
    pub origins: BTreeMap<String, usize>,
    pub total_learning_models: usize,
    pub total_samples: u64,
}

impl AdminStats {
    pub fn collect(history: &[BrewRecord], research: &ResearchQueue, model: &LearningModel) -> Self {
        let entries = research.entries();
        let weeks: BTreeSet<&str> = entries.iter().map(|e| e.week_id.as_str()).collect();

        Self {
            total_brews: history.len(),
            total_research_entries: entries.len(),
            unique_users: weeks.len(),
            brew_methods: count_by(entries, |e| e.brew_method.clone()),
            extraction_states: count_by(entries, |e| e.extraction_state.to_string()),
            origins: count_by(entries, |e| e.origin.clone()),
            total_learning_models: model.len(),
            total_samples: model.total_samples(),
        }
    }

    /// Methods by descending count
    pub fn methods_ranked(&self) -> Vec<(&str, usize)> {
        ranked(&self.brew_methods)
    }

    /// Origins by descending count, at most [`TOP_ORIGINS`]
    pub fn top_origins(&self) -> Vec<(&str, usize)> {
        let mut origins = ranked(&self.origins);
        origins.truncate(TOP_ORIGINS);
        origins
    }
}

fn count_by<F>(entries: &[ResearchEntry], field: F) -> BTreeMap<String, usize>
where
    F: Fn(&ResearchEntry) -> String,
{
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(field(entry)).or_insert(0) += 1;
    }
    counts
}

/// Descending by count, ties by name
fn ranked(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut rows: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

/// Full dump for offline analysis
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminExport<'a> {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub research_data: &'a [ResearchEntry],
    pub brew_history: &'a [BrewRecord],
    pub learning_model: &'a BTreeMap<LearningKey, LearningProfile>,
}

impl<'a> AdminExport<'a> {
    pub fn new(
        research: &'a ResearchQueue,
        history: &'a [BrewRecord],
        model: &'a LearningModel,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: ADMIN_EXPORT_VERSION,
            exported_at,
            research_data: research.entries(),
            brew_history: history,
            learning_model: model.profiles(),
        }
    }
}
