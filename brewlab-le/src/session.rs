//! Brew session: owner of all mutable engine state
//!
//! A session loads history, learning model, research queue and privacy
//! settings from an injected store, exposes the two user flows (initial
//! recipe, feedback submission) and writes state back after every mutation.

use crate::diagnosis::{Diagnoser, ExtractionVerdict, SensoryScores};
use crate::error::{Error, Result};
use crate::history::{BrewMeasurements, BrewRecord, Selections};
use crate::learning::{LearningAdjustment, LearningKey, LearningModel, LearningStatus};
use crate::params::EngineParams;
use crate::persistence::{PersistenceGateway, Snapshot};
use crate::recipe::{Recipe, RecipeResolver};
use crate::report::{AdjustmentAdvice, ExtractionExplanation};
use crate::research::{self, PrivacySettings, ResearchQueue};
use crate::stats::{AdminExport, AdminStats};
use brewlab_common::{time, KeyValueStore};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};

/// Everything a feedback submission produces
#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    pub record: BrewRecord,
    pub verdict: ExtractionVerdict,
    pub explanation: ExtractionExplanation,
    pub advice: AdjustmentAdvice,
    /// Recipe after the update, carrying the learning adjustment when the
    /// catalog has both a base grind and a base time
    pub recipe: Recipe,
    pub status: LearningStatus,
    /// Whether an anonymized research entry was recorded
    pub research_recorded: bool,
}

impl FeedbackOutcome {
    pub fn adjustment(&self) -> Option<&LearningAdjustment> {
        self.recipe.adjustment.as_ref()
    }
}

pub struct BrewSession<S: KeyValueStore> {
    gateway: PersistenceGateway<S>,
    params: EngineParams,
    diagnoser: Diagnoser,
    history: Vec<BrewRecord>,
    model: LearningModel,
    research: ResearchQueue,
    privacy: Option<PrivacySettings>,
}

impl<S: KeyValueStore> BrewSession<S> {
    /// Load all state from `store`
    pub fn open(store: S, params: EngineParams) -> Result<Self> {
        params.validate()?;
        let gateway = PersistenceGateway::new(store);
        let (history, model) = gateway.load(params.learning)?;
        let research = gateway.load_research_queue()?;
        let privacy = gateway.load_privacy()?;

        Ok(Self {
            gateway,
            params,
            diagnoser: Diagnoser::with_params(params.diagnosis),
            history,
            model,
            research,
            privacy,
        })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn history(&self) -> &[BrewRecord] {
        &self.history
    }

    pub fn model(&self) -> &LearningModel {
        &self.model
    }

    pub fn research(&self) -> &ResearchQueue {
        &self.research
    }

    pub fn privacy(&self) -> Option<&PrivacySettings> {
        self.privacy.as_ref()
    }

    pub fn store(&self) -> &S {
        self.gateway.store()
    }

    pub fn into_store(self) -> S {
        self.gateway.into_inner()
    }

    fn sharing_enabled(&self) -> bool {
        self.privacy
            .as_ref()
            .is_some_and(|p| p.consented && p.data_sharing_enabled)
    }


    fn persist(&mut self) -> Result<()> {
        self.gateway.save(&self.history, &self.model)
    }

    /// Starting recipe for the selected equipment
    pub fn initial_recipe(&self, selections: &Selections) -> Result<Recipe> {
        selections.learning_key()?;
        Ok(RecipeResolver::new(&self.model).resolve(&selections.brew_method, &selections.grinder))
    }

    pub fn learning_status(&self, key: &LearningKey) -> LearningStatus {
        self.model.status(key)
    }

    pub fn submit_feedback(
        &mut self,
        selections: Selections,
        scores: SensoryScores,
        measurements: BrewMeasurements,
    ) -> Result<FeedbackOutcome> {
        self.submit_feedback_at(selections, scores, measurements, time::now())
    }

    /// Diagnose, record, learn and persist one brew
    pub fn submit_feedback_at(
        &mut self,
        selections: Selections,
        scores: SensoryScores,
        measurements: BrewMeasurements,
        now: DateTime<Utc>,
    ) -> Result<FeedbackOutcome> {
        let key = selections.learning_key()?;
        if scores.is_empty() {
            return Err(Error::InvalidInput(
                "rate at least one attribute".to_string(),
            ));
        }

        let verdict = self.diagnoser.diagnose(&scores);
        let record = BrewRecord::new(selections, scores, verdict.clone(), now);

        // Memory only keeps the brew once the store has it
        let previous_model = self.model.clone();
        self.history.push(record.clone());
        let profile = self.model.update(&key, &verdict);
        if let Err(e) = self.persist() {
            self.history.pop();
            self.model = previous_model;
            return Err(e);
        }

        let research_recorded =
            self.sharing_enabled() && self.record_research(&record, &measurements, now);

        info!(
            key = %key,
            state = %verdict.state,
            confidence = verdict.confidence,
            samples = profile.samples,
            research = research_recorded,
            "Feedback recorded"
        );

        Ok(FeedbackOutcome {
            explanation: ExtractionExplanation::new(&scores, &verdict),
            advice: AdjustmentAdvice::for_verdict(&verdict),
            recipe: RecipeResolver::new(&self.model).resolve(key.method(), key.grinder()),
            status: self.model.status(&key),
            record,
            verdict,
            research_recorded,
        })
    }

    /// Queue an anonymized entry; a failed write leaves the queue unchanged
    fn record_research(
        &mut self,
        record: &BrewRecord,
        measurements: &BrewMeasurements,
        now: DateTime<Utc>,
    ) -> bool {
        let mut research = self.research.clone();
        research.push(research::anonymize(record, measurements, now));
        match self.gateway.save_research_queue(&research) {
            Ok(()) => {
                self.research = research;
                true
            }
            Err(e) => {
                warn!(error = %e, "Research entry not recorded");
                false
            }
        }
    }

    /// Forget one key; returns whether anything was learned for it
    pub fn reset_learning_for(&mut self, key: &LearningKey) -> Result<bool> {
        let removed = self.model.reset(key);
        self.persist()?;
        Ok(removed)
    }

    pub fn reset_all_learning(&mut self) -> Result<()> {
        self.model.reset_all();
        self.persist()
    }

    pub fn reset_history(&mut self) -> Result<()> {
        info!(brews = self.history.len(), "Brew history cleared");
        self.history.clear();
        self.persist()
    }

    /// Clear history, learning, research data and privacy settings
    pub fn reset_everything(&mut self) -> Result<()> {
        self.history.clear();
        self.model.reset_all();
        self.research = ResearchQueue::default();
        self.privacy = None;
        self.gateway.clear()
    }

    pub fn export_snapshot(&self) -> Snapshot {
        self.gateway
            .export_snapshot(&self.history, &self.model, time::now())
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_snapshot())?)
    }

    /// Replace history and learning model from a snapshot payload
    ///
    /// On rejection the session and store are left as they were.
    pub fn import_snapshot(&mut self, payload: &str) -> Result<()> {
        let snapshot = self
            .gateway
            .import_snapshot(payload, self.params.learning)
            .inspect_err(|e| warn!(error = %e, "Snapshot import rejected"))?;
        self.history = snapshot.brew_history;
        self.model = LearningModel::from_profiles(snapshot.learning_model, self.params.learning);
        Ok(())
    }

    pub fn set_privacy(&mut self, consented: bool, data_sharing_enabled: bool) -> Result<()> {
        let settings = PrivacySettings {
            consented,
            timestamp: time::now().trunc_subsecs(3),
            data_sharing_enabled: consented && data_sharing_enabled,
        };
        self.gateway.save_privacy(&settings)?;
        info!(
            consented,
            sharing = settings.data_sharing_enabled,
            "Privacy settings updated"
        );
        self.privacy = Some(settings);
        Ok(())
    }

    pub fn admin_stats(&self) -> AdminStats {
        AdminStats::collect(&self.history, &self.research, &self.model)
    }

    pub fn admin_export(&self) -> AdminExport<'_> {
        AdminExport::new(&self.research, &self.history, &self.model, time::now())
    }
}
