//! Persistence of engine state over a key-value store
//!
//! Every value is a JSON document under a fixed key. Missing values load as
//! empty state. Corrupt values also load as empty state, with a warning,
//! so a damaged file never prevents the engine from starting. Store I/O
//! failures are returned to the caller.

use crate::error::{Error, Result};
use crate::history::BrewRecord;
use crate::learning::{LearningKey, LearningModel, LearningProfile};
use crate::params::LearningParams;
use crate::research::{PrivacySettings, ResearchEntry, ResearchQueue};
use brewlab_common::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const LEARNING_MODEL_KEY: &str = "learning_model";
pub const BREW_HISTORY_KEY: &str = "brew_history";
pub const RESEARCH_QUEUE_KEY: &str = "research_queue";
pub const PRIVACY_KEY: &str = "privacy_consent";

/// Version tag written to and required from user snapshots
pub const EXPORT_VERSION: u32 = 1;

/// Portable copy of a user's history and learning model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub brew_history: Vec<BrewRecord>,
    pub learning_model: BTreeMap<LearningKey, LearningProfile>,
}

/// Reads and writes engine state through an injected store
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Decode a stored value; corrupt JSON is logged and treated as absent
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Ignoring corrupt persisted value");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)?;
        debug!(key, bytes = json.len(), "Persisted value");
        Ok(())
    }

    pub fn load_history(&self) -> Result<Vec<BrewRecord>> {
        Ok(self.read(BREW_HISTORY_KEY)?.unwrap_or_default())
    }

    /// Stored learning model, clamped to `params`
    pub fn load_model(&self, params: LearningParams) -> Result<LearningModel> {
        let profiles = self.read(LEARNING_MODEL_KEY)?.unwrap_or_default();
        Ok(LearningModel::from_profiles(profiles, params))
    }

    /// History and learning model
    pub fn load(&self, params: LearningParams) -> Result<(Vec<BrewRecord>, LearningModel)> {
        let history = self.load_history()?;
        let model = self.load_model(params)?;
        info!(
            brews = history.len(),
            profiles = model.len(),
            "Loaded brew history and learning model"
        );
        Ok((history, model))
    }

    /// Write history and learning model together
    ///
    /// The model goes first. If the history write then fails, the previous
    /// model value is put back so the store never pairs a new model with an
    /// old history.
    pub fn save(&mut self, history: &[BrewRecord], model: &LearningModel) -> Result<()> {
        let previous_model = self.store.get(LEARNING_MODEL_KEY)?;
        self.write(LEARNING_MODEL_KEY, model.profiles())?;
        if let Err(e) = self.write(BREW_HISTORY_KEY, history) {
            self.restore(LEARNING_MODEL_KEY, previous_model.as_deref());
            return Err(e);
        }
        Ok(())
    }

    fn restore(&mut self, key: &str, previous: Option<&str>) {
        let result = match previous {
            Some(raw) => self.store.set(key, raw),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "Failed to restore previous value after a partial save");
        }
    }

    pub fn load_research_queue(&self) -> Result<ResearchQueue> {
        let entries: Vec<ResearchEntry> = self.read(RESEARCH_QUEUE_KEY)?.unwrap_or_default();
        Ok(ResearchQueue::from_entries(entries))
    }

    pub fn save_research_queue(&mut self, queue: &ResearchQueue) -> Result<()> {
        self.write(RESEARCH_QUEUE_KEY, queue)
    }

    pub fn load_privacy(&self) -> Result<Option<PrivacySettings>> {
        self.read(PRIVACY_KEY)
    }

    pub fn save_privacy(&mut self, settings: &PrivacySettings) -> Result<()> {
        self.write(PRIVACY_KEY, settings)
    }

    /// Remove every engine key from the store
    pub fn clear(&mut self) -> Result<()> {
        for key in [
            LEARNING_MODEL_KEY,
            BREW_HISTORY_KEY,
            RESEARCH_QUEUE_KEY,
            PRIVACY_KEY,
        ] {
            self.store.remove(key)?;
        }
        info!("Cleared all persisted state");
        Ok(())
    }

    /// Snapshot of the given state, stamped with `exported_at`
    pub fn export_snapshot(
        &self,
        history: &[BrewRecord],
        model: &LearningModel,
        exported_at: DateTime<Utc>,
    ) -> Snapshot {
        Snapshot {
            version: EXPORT_VERSION,
            exported_at,
            brew_history: history.to_vec(),
            learning_model: model.profiles().clone(),
        }
    }

    /// Validate a snapshot payload and persist it
    ///
    /// Nothing is written unless the whole payload validates. Returns the
    /// accepted snapshot so the caller can swap its in-memory state.
    pub fn import_snapshot(&mut self, payload: &str, params: LearningParams) -> Result<Snapshot> {
        let snapshot = validate_snapshot(payload)?;
        let model = LearningModel::from_profiles(snapshot.learning_model.clone(), params);

        self.save(&snapshot.brew_history, &model)?;
        info!(
            brews = snapshot.brew_history.len(),
            profiles = model.len(),
            "Imported snapshot"
        );

        Ok(Snapshot {
            learning_model: model.profiles().clone(),
            ..snapshot
        })
    }
}

/// Structural checks first for precise messages, then typed decoding
fn validate_snapshot(payload: &str) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::ImportRejected(format!("not valid JSON: {}", e)))?;

    let version = value.get("version").and_then(Value::as_u64);
    if version != Some(u64::from(EXPORT_VERSION)) {
        return Err(Error::ImportRejected(format!(
            "unsupported version {}",
            value.get("version").map_or_else(|| "none".to_string(), Value::to_string)
        )));
    }
    if !value.get("brewHistory").is_some_and(Value::is_array) {
        return Err(Error::ImportRejected(
            "brewHistory must be an array".to_string(),
        ));
    }
    if !value.get("learningModel").is_some_and(Value::is_object) {
        return Err(Error::ImportRejected(
            "learningModel must be an object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Snapshot failed typed validation");
        Error::ImportRejected(format!("malformed snapshot: {}", e))
    })
}
