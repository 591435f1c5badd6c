//! Integration tests for the brew session flows over an in-memory store

use brewlab_common::{KeyValueStore, MemoryStore};
use brewlab_le::persistence::{BREW_HISTORY_KEY, LEARNING_MODEL_KEY, PRIVACY_KEY, RESEARCH_QUEUE_KEY};
use brewlab_le::research::RESEARCH_QUEUE_CAPACITY;
use brewlab_le::{
    Attribute, BrewMeasurements, BrewSession, EngineParams, Error, ExtractionState, LearningKey,
    Selections, SensoryScores,
};
use chrono::{Duration, TimeZone, Utc};
use std::cell::Cell;
use std::rc::Rc;

fn session() -> BrewSession<MemoryStore> {
    BrewSession::open(MemoryStore::new(), EngineParams::default()).unwrap()
}

fn sour_cup() -> SensoryScores {
    SensoryScores::default()
        .with(Attribute::Acidity, 2.0)
        .with(Attribute::Sweetness, 2.0)
        .with(Attribute::Overall, 4.0)
}

fn bitter_cup() -> SensoryScores {
    SensoryScores::default()
        .with(Attribute::Flavor, 9.0)
        .with(Attribute::Body, 9.0)
        .with(Attribute::Balance, 9.0)
}

fn feedback(session: &mut BrewSession<MemoryStore>, selections: &Selections, scores: SensoryScores) {
    session
        .submit_feedback(selections.clone(), scores, BrewMeasurements::default())
        .unwrap();
}

#[test]
fn test_comandante_v60_learns_after_three_brews() {
    let mut session = session();
    let selections = Selections::new("v60", "comandante-c40");
    let key = LearningKey::new("comandante-c40", "v60").unwrap();

    for _ in 0..3 {
        let outcome = session
            .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
            .unwrap();
        assert_eq!(outcome.verdict.state, ExtractionState::Under);
        // No catalogued base grind for this grinder
        assert!(outcome.adjustment().is_none());
    }

    let profile = *session.model().get(&key).unwrap();
    assert_eq!(profile.samples, 3);
    assert!(profile.grind_offset < 0.0);
    assert!(profile.time_offset > 0.0);

    let adjustment = session.model().adjust(&key, 10.0, 150.0);
    assert!(adjustment.applied);
    assert_eq!(adjustment.reason, "Learning applied");
    assert!(adjustment.grind < 10.0);
    assert!(adjustment.time > 150.0);
}

#[test]
fn test_feedback_reports_progress_for_calibrated_grinder() {
    let mut session = session();
    let selections = Selections::new("espresso", "mazzer-mini");

    let outcome = session
        .submit_feedback(selections.clone(), bitter_cup(), BrewMeasurements::default())
        .unwrap();
    assert_eq!(outcome.verdict.state, ExtractionState::Over);
    assert_eq!(outcome.advice.grind, Some("Go 1–2 clicks coarser."));

    let adjustment = outcome.adjustment().unwrap();
    assert!(!adjustment.applied);
    assert_eq!(adjustment.reason, "Learning in progress (1/3)");
    assert_eq!(adjustment.samples_needed, 2);
    assert_eq!(outcome.status.status_text, "Gathering data (1/3 brews needed)");

    feedback(&mut session, &selections, bitter_cup());
    feedback(&mut session, &selections, bitter_cup());

    let recipe = session.initial_recipe(&selections).unwrap();
    let adjustment = recipe.adjustment.as_ref().unwrap();
    assert!(adjustment.applied);
    assert!(adjustment.grind > 4.0);
    assert!(adjustment.time < 25.0);

    let status = session.learning_status(&recipe.learning_key().unwrap());
    assert!(status.active);
    assert_eq!(status.progress_percent, 100.0);
    assert!(!status.insights.is_empty());
}

#[test]
fn test_feedback_requires_selection_and_rating() {
    let mut session = session();

    let err = session
        .submit_feedback(
            Selections::new("v60", ""),
            sour_cup(),
            BrewMeasurements::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = session
        .submit_feedback(
            Selections::new("v60", "fellow-ode"),
            SensoryScores::default(),
            BrewMeasurements::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert!(session.history().is_empty());
    assert!(session.model().is_empty());
    assert!(session.initial_recipe(&Selections::new("", "fellow-ode")).is_err());
}

#[test]
fn test_state_is_persisted_after_feedback() {
    let mut session = session();
    feedback(&mut session, &Selections::new("chemex", "fellow-ode"), sour_cup());

    let store = session.into_store();
    assert!(store.get(BREW_HISTORY_KEY).unwrap().is_some());
    assert!(store.get(LEARNING_MODEL_KEY).unwrap().is_some());

    let reopened = BrewSession::open(store, EngineParams::default()).unwrap();
    assert_eq!(reopened.history().len(), 1);
    assert_eq!(
        reopened
            .model()
            .get(&LearningKey::new("fellow-ode", "chemex").unwrap())
            .unwrap()
            .samples,
        1
    );
}

#[test]
fn test_reset_all_forgets_learning() {
    let mut session = session();
    let selections = Selections::new("aeropress", "baratza-encore");
    for _ in 0..4 {
        feedback(&mut session, &selections, sour_cup());
    }
    let key = selections.learning_key().unwrap();
    assert!(session.model().adjust(&key, 19.0, 90.0).applied);

    session.reset_all_learning().unwrap();

    let adjustment = session.model().adjust(&key, 19.0, 90.0);
    assert!(!adjustment.applied);
    assert_eq!(adjustment.reason, "No learning data yet");
    assert_eq!(session.history().len(), 4);
}

#[test]
fn test_reset_single_key() {
    let mut session = session();
    let v60 = Selections::new("v60", "fellow-ode");
    let chemex = Selections::new("chemex", "fellow-ode");
    feedback(&mut session, &v60, sour_cup());
    feedback(&mut session, &chemex, sour_cup());

    assert!(session.reset_learning_for(&v60.learning_key().unwrap()).unwrap());
    assert!(!session.reset_learning_for(&v60.learning_key().unwrap()).unwrap());
    assert!(session.model().get(&chemex.learning_key().unwrap()).is_some());
}

#[test]
fn test_reset_history_keeps_model() {
    let mut session = session();
    feedback(&mut session, &Selections::new("v60", "fellow-ode"), sour_cup());
    session.reset_history().unwrap();
    assert!(session.history().is_empty());
    assert_eq!(session.model().len(), 1);
}

#[test]
fn test_reset_everything_clears_store() {
    let mut session = session();
    session.set_privacy(true, true).unwrap();
    feedback(&mut session, &Selections::new("v60", "fellow-ode"), sour_cup());

    session.reset_everything().unwrap();

    assert!(session.history().is_empty());
    assert!(session.model().is_empty());
    assert!(session.research().is_empty());
    assert!(session.privacy().is_none());
    assert!(session.store().keys().unwrap().is_empty());
}

#[test]
fn test_export_import_round_trip() {
    let mut source = session();
    feedback(&mut source, &Selections::new("v60", "fellow-ode"), sour_cup());
    feedback(&mut source, &Selections::new("espresso", "niche-zero"), bitter_cup());
    feedback(&mut source, &Selections::new("v60", "fellow-ode"), bitter_cup());

    let payload = source.export_json().unwrap();

    let mut target = session();
    feedback(&mut target, &Selections::new("chemex", "mazzer-mini"), sour_cup());
    target.import_snapshot(&payload).unwrap();

    assert_eq!(target.history(), source.history());
    assert_eq!(target.model().profiles(), source.model().profiles());

    // Also survives a reload from the store
    let reopened = BrewSession::open(target.into_store(), EngineParams::default()).unwrap();
    assert_eq!(reopened.history(), source.history());
    assert_eq!(reopened.model().profiles(), source.model().profiles());
}

#[test]
fn test_rejected_import_leaves_state_untouched() {
    let mut session = session();
    feedback(&mut session, &Selections::new("v60", "fellow-ode"), sour_cup());
    let history_before = session.history().to_vec();
    let profiles_before = session.model().profiles().clone();
    let stored_before = session.store().get(LEARNING_MODEL_KEY).unwrap();

    let err = session
        .import_snapshot(r#"{"version": 7, "brewHistory": [], "learningModel": {}}"#)
        .unwrap_err();
    assert!(matches!(err, Error::ImportRejected(_)));

    assert_eq!(session.history(), history_before.as_slice());
    assert_eq!(session.model().profiles(), &profiles_before);
    assert_eq!(session.store().get(LEARNING_MODEL_KEY).unwrap(), stored_before);
}

#[test]
fn test_research_requires_consent_and_sharing() {
    let mut session = session();
    let mut selections = Selections::new("v60", "fellow-ode");
    selections.origin = "Colombia".to_string();

    let outcome = session
        .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
        .unwrap();
    assert!(!outcome.research_recorded);

    session.set_privacy(true, false).unwrap();
    feedback(&mut session, &selections, sour_cup());
    assert!(session.research().is_empty());

    session.set_privacy(true, true).unwrap();
    let outcome = session
        .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
        .unwrap();
    assert!(outcome.research_recorded);
    assert_eq!(session.research().len(), 1);
    assert_eq!(session.research().entries()[0].origin, "Colombia");
    assert_eq!(session.research().entries()[0].altitude, "unknown");
    assert!(session.store().get(RESEARCH_QUEUE_KEY).unwrap().is_some());
    assert!(session.store().get(PRIVACY_KEY).unwrap().is_some());

    // Sharing without consent is never stored as enabled
    session.set_privacy(false, true).unwrap();
    assert!(!session.privacy().unwrap().data_sharing_enabled);
}

#[test]
fn test_research_queue_capped() {
    let mut session = session();
    session.set_privacy(true, true).unwrap();
    let selections = Selections::new("v60", "fellow-ode");
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();

    for n in 0..(RESEARCH_QUEUE_CAPACITY + 5) {
        session
            .submit_feedback_at(
                selections.clone(),
                sour_cup(),
                BrewMeasurements::default(),
                start + Duration::minutes(n as i64),
            )
            .unwrap();
    }

    assert_eq!(session.research().len(), RESEARCH_QUEUE_CAPACITY);
    assert_eq!(
        session.research().entries()[0].timestamp,
        start + Duration::minutes(5)
    );
    assert_eq!(session.history().len(), RESEARCH_QUEUE_CAPACITY + 5);

    let reopened = BrewSession::open(session.into_store(), EngineParams::default()).unwrap();
    assert_eq!(reopened.research().len(), RESEARCH_QUEUE_CAPACITY);
}

#[test]
fn test_admin_stats_and_export() {
    let mut session = session();
    session.set_privacy(true, true).unwrap();
    let mut selections = Selections::new("v60", "fellow-ode");
    selections.origin = "Kenya".to_string();
    feedback(&mut session, &selections, sour_cup());
    feedback(&mut session, &Selections::new("espresso", "niche-zero"), bitter_cup());

    let stats = session.admin_stats();
    assert_eq!(stats.total_brews, 2);
    assert_eq!(stats.total_research_entries, 2);
    assert_eq!(stats.unique_users, 1);
    assert_eq!(stats.origins["Kenya"], 1);
    assert_eq!(stats.origins["unknown"], 1);
    assert_eq!(stats.extraction_states["under"], 1);
    assert_eq!(stats.extraction_states["over"], 1);
    assert_eq!(stats.total_learning_models, 2);
    assert_eq!(stats.total_samples, 2);

    let json = serde_json::to_value(session.admin_export()).unwrap();
    assert_eq!(json["version"], 2);
    assert_eq!(json["researchData"].as_array().unwrap().len(), 2);
    assert_eq!(json["brewHistory"].as_array().unwrap().len(), 2);
    assert!(json["learningModel"]["fellow-ode::v60"].is_object());
}

#[test]
fn test_corrupt_store_opens_empty() {
    let mut store = MemoryStore::new();
    store.set(BREW_HISTORY_KEY, "not json").unwrap();
    store.set(PRIVACY_KEY, "{}").unwrap();

    let session = BrewSession::open(store, EngineParams::default()).unwrap();
    assert!(session.history().is_empty());
    assert!(session.privacy().is_none());
}

#[test]
fn test_invalid_params_rejected_on_open() {
    let mut params = EngineParams::default();
    params.learning.min_samples = 0;
    let result = BrewSession::open(MemoryStore::new(), params);
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_separator_in_ids_is_rejected() {
    let mut session = session();
    for selections in [
        Selections::new("v60", "lab::grinder"),
        Selections::new("pour::over", "fellow-ode"),
        Selections::new(":v60", "lab:"),
    ] {
        let err = session
            .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(session.initial_recipe(&selections).is_err());
    }
    assert!(session.history().is_empty());
    assert!(session.model().is_empty());
    assert!(session.store().keys().unwrap().is_empty());
}

#[test]
fn test_colon_in_grinder_id_survives_round_trip() {
    let mut source = session();
    let selections = Selections::new("v60", "lab:grinder");
    feedback(&mut source, &selections, sour_cup());

    let mut target = session();
    target.import_snapshot(&source.export_json().unwrap()).unwrap();

    let key = LearningKey::new("lab:grinder", "v60").unwrap();
    assert_eq!(target.model().get(&key).unwrap().samples, 1);
    assert_eq!(target.model().profiles(), source.model().profiles());
}

#[test]
fn test_import_of_form_string_export() {
    let payload = r#"{
        "version": 1,
        "exportedAt": "2026-03-02T08:15:00.000Z",
        "brewHistory": [{
            "selections": {"userType": "home", "brewMethod": "chemex", "grinder": "fellow-ode",
                           "origin": "Kenya", "altitude": "", "processing": "", "roastLevel": ""},
            "scaFeedback": {"aroma": "", "flavor": "9", "aftertaste": "8", "acidity": "",
                            "body": "9", "balance": "", "sweetness": "", "overall": ""},
            "extractionDiagnosis": {"extractionState": "over", "confidence": 2.42,
                                    "confidenceDisplay": "2.42",
                                    "signals": {"flavor": 1.2, "aftertaste": 0.72, "body": 0.8}},
            "timestamp": 1772439300000
        }],
        "learningModel": {"fellow-ode::chemex": {"grindOffset": 0.4, "timeOffset": -0.8, "samples": 1}}
    }"#;

    let mut session = session();
    session.import_snapshot(payload).unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].sca_feedback.flavor, Some(9.0));
    assert_eq!(session.history()[0].selections.origin, "Kenya");

    // Later brews append to the imported history rather than replacing it
    feedback(&mut session, &Selections::new("chemex", "fellow-ode"), bitter_cup());
    let reopened = BrewSession::open(session.into_store(), EngineParams::default()).unwrap();
    assert_eq!(reopened.history().len(), 2);
    let key = LearningKey::new("fellow-ode", "chemex").unwrap();
    assert_eq!(reopened.model().get(&key).unwrap().samples, 2);
}

/// Memory store that fails writes to one switchable key
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_key: Rc<Cell<Option<&'static str>>>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> brewlab_common::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> brewlab_common::Result<()> {
        if self.fail_key.get() == Some(key) {
            return Err(brewlab_common::Error::Store(format!("write to {} failed", key)));
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> brewlab_common::Result<()> {
        self.inner.remove(key)
    }

    fn keys(&self) -> brewlab_common::Result<Vec<String>> {
        self.inner.keys()
    }
}

#[test]
fn test_failed_write_keeps_memory_and_store_in_step() {
    let fail_key = Rc::new(Cell::new(None));
    let store = FlakyStore {
        inner: MemoryStore::new(),
        fail_key: Rc::clone(&fail_key),
    };
    let mut session = BrewSession::open(store, EngineParams::default()).unwrap();
    let selections = Selections::new("v60", "fellow-ode");
    session
        .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
        .unwrap();
    let history_before = session.history().to_vec();
    let profiles_before = session.model().profiles().clone();
    let stored_model = session.store().get(LEARNING_MODEL_KEY).unwrap();
    let stored_history = session.store().get(BREW_HISTORY_KEY).unwrap();

    for key in [LEARNING_MODEL_KEY, BREW_HISTORY_KEY] {
        fail_key.set(Some(key));
        let err = session
            .submit_feedback(selections.clone(), sour_cup(), BrewMeasurements::default())
            .unwrap_err();
        assert!(matches!(err, Error::Common(_)), "{}", key);

        assert_eq!(session.history(), history_before.as_slice());
        assert_eq!(session.model().profiles(), &profiles_before);
        assert_eq!(session.store().get(LEARNING_MODEL_KEY).unwrap(), stored_model);
        assert_eq!(session.store().get(BREW_HISTORY_KEY).unwrap(), stored_history);
    }
}

#[test]
fn test_failed_research_write_still_records_brew() {
    let fail_key = Rc::new(Cell::new(Some(RESEARCH_QUEUE_KEY)));
    let store = FlakyStore {
        inner: MemoryStore::new(),
        fail_key: Rc::clone(&fail_key),
    };
    let mut session = BrewSession::open(store, EngineParams::default()).unwrap();
    session.set_privacy(true, true).unwrap();

    let outcome = session
        .submit_feedback(
            Selections::new("v60", "fellow-ode"),
            sour_cup(),
            BrewMeasurements::default(),
        )
        .unwrap();
    assert!(!outcome.research_recorded);
    assert!(session.research().is_empty());
    assert_eq!(session.history().len(), 1);
    assert!(session.store().get(RESEARCH_QUEUE_KEY).unwrap().is_none());

    fail_key.set(None);
    let outcome = session
        .submit_feedback(
            Selections::new("v60", "fellow-ode"),
            sour_cup(),
            BrewMeasurements::default(),
        )
        .unwrap();
    assert!(outcome.research_recorded);
    assert_eq!(session.research().len(), 1);
}
