//! Integration tests for the file-backed key-value store

use brewlab_common::{FileStore, KeyValueStore};
use tempfile::TempDir;

#[test]
fn test_open_creates_missing_folder() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("nested").join("data");

    let store = FileStore::open(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(store.root(), root.as_path());
}

#[test]
fn test_values_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut store = FileStore::open(temp_dir.path()).unwrap();
        store.set("learning_model", r#"{"a::b":{}}"#).unwrap();
    }

    let store = FileStore::open(temp_dir.path()).unwrap();
    assert_eq!(
        store.get("learning_model").unwrap().as_deref(),
        Some(r#"{"a::b":{}}"#)
    );
}

#[test]
fn test_set_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(temp_dir.path()).unwrap();

    store.set("brew_history", "[]").unwrap();

    assert!(temp_dir.path().join("brew_history.json").exists());
    assert!(!temp_dir.path().join("brew_history.json.tmp").exists());
}

#[test]
fn test_missing_key_is_none_and_remove_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(temp_dir.path()).unwrap();

    assert_eq!(store.get("research_queue").unwrap(), None);
    store.remove("research_queue").unwrap();

    store.set("research_queue", "[]").unwrap();
    store.remove("research_queue").unwrap();
    assert_eq!(store.get("research_queue").unwrap(), None);
}

#[test]
fn test_keys_lists_only_json_files() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(temp_dir.path()).unwrap();
    store.set("learning_model", "{}").unwrap();
    store.set("brew_history", "[]").unwrap();
    std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(store.keys().unwrap(), vec!["brew_history", "learning_model"]);
}

#[test]
fn test_invalid_key_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = FileStore::open(temp_dir.path()).unwrap();

    assert!(store.set("../escape", "x").is_err());
    assert!(store.get("with space").is_err());
}
