//! Session state over the file-backed store

use brewlab_common::{FileStore, KeyValueStore};
use brewlab_le::persistence::{PersistenceGateway, EXPORT_VERSION, LEARNING_MODEL_KEY};
use brewlab_le::{
    Attribute, BrewMeasurements, BrewSession, EngineParams, LearningKey, Selections,
    SensoryScores,
};
use tempfile::TempDir;

fn weak_cup() -> SensoryScores {
    // One slightly low rating: confidence 0.1, below the noise gate
    SensoryScores::default().with(Attribute::Body, 4.5)
}

fn open(dir: &TempDir) -> BrewSession<FileStore> {
    let store = FileStore::open(dir.path()).unwrap();
    BrewSession::open(store, EngineParams::default()).unwrap()
}

#[test]
fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let selections = Selections::new("v60", "baratza-sette-270");

    {
        let mut session = open(&dir);
        session
            .submit_feedback(selections.clone(), weak_cup(), BrewMeasurements::default())
            .unwrap();
    }

    assert!(dir.path().join("brew_history.json").exists());
    assert!(dir.path().join("learning_model.json").exists());

    let session = open(&dir);
    let profile = session.model().get(&selections.learning_key().unwrap()).unwrap();
    assert_eq!(profile.samples, 1);
    assert_eq!(profile.grind_offset, 0.0);
    assert_eq!(profile.time_offset, 0.0);
}

#[test]
fn test_corrupt_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("learning_model.json"), "{{{{").unwrap();

    let session = open(&dir);
    assert!(session.model().is_empty());
}

#[test]
fn test_export_file_imports_into_fresh_folder() {
    let source_dir = TempDir::new().unwrap();
    let target_dir = TempDir::new().unwrap();
    let selections = Selections::new("moka-pot", "fellow-ode");
    let scores = SensoryScores::from_pairs(["flavor=2", "aftertaste=3", "body=3.5"]).unwrap();

    let mut source = open(&source_dir);
    for _ in 0..3 {
        source
            .submit_feedback(selections.clone(), scores, BrewMeasurements::default())
            .unwrap();
    }
    let export_path = source_dir.path().join("export.json");
    std::fs::write(&export_path, source.export_json().unwrap()).unwrap();

    let payload = std::fs::read_to_string(&export_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(value["version"], EXPORT_VERSION);
    assert!(value["exportedAt"].is_string());

    let mut target = open(&target_dir);
    target.import_snapshot(&payload).unwrap();
    drop(target);

    let reopened = open(&target_dir);
    assert_eq!(reopened.history(), source.history());
    assert_eq!(reopened.model().profiles(), source.model().profiles());
    assert!(
        reopened
            .model()
            .adjust(&LearningKey::new("fellow-ode", "moka-pot").unwrap(), 4.0, 180.0)
            .applied
    );
}

#[test]
fn test_gateway_writes_learning_model_as_object() {
    let dir = TempDir::new().unwrap();
    let mut session = open(&dir);
    session
        .submit_feedback(
            Selections::new("espresso", "niche-zero"),
            weak_cup(),
            BrewMeasurements::default(),
        )
        .unwrap();

    let gateway = PersistenceGateway::new(session.into_store());
    let raw = gateway.store().get(LEARNING_MODEL_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["niche-zero::espresso"]["samples"], 1);
}
