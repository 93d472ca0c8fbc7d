//! Persistence round-trips and incremental re-indexing after a file changes.

use codetrace::config::Settings;
use codetrace::storage::{check_for_updates, IndexPersistence};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn save_and_load_round_trips_through_check_for_updates() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.py"), "def greet():\n    return 'hi'\n").unwrap();

    let settings = Settings::default();
    let persistence = IndexPersistence::new(dir.path().join(".codetrace"));

    let codebase = check_for_updates(dir.path(), &settings, &persistence).await.unwrap();
    assert!(codebase.get("a.greet").is_some());
    assert!(persistence.exists());
}

#[tokio::test]
async fn second_call_picks_up_a_modified_file_without_losing_others() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.py"), "def greet():\n    return 'hi'\n").unwrap();
    fs::write(dir.path().join("b.py"), "def farewell():\n    return 'bye'\n").unwrap();

    let settings = Settings::default();
    let persistence = IndexPersistence::new(dir.path().join(".codetrace"));

    check_for_updates(dir.path(), &settings, &persistence).await.unwrap();

    fs::write(dir.path().join("a.py"), "def greet():\n    return 'hi'\n\n\ndef new_function():\n    return 42\n").unwrap();

    let updated = check_for_updates(dir.path(), &settings, &persistence).await.unwrap();
    assert!(updated.get("a.new_function").is_some());
    assert!(updated.get("b.farewell").is_some());
}

#[tokio::test]
async fn removed_file_drops_its_elements() {
    let dir = TempDir::new().unwrap();
    let stale_path = dir.path().join("stale.py");
    fs::write(&stale_path, "def gone_soon():\n    pass\n").unwrap();

    let settings = Settings::default();
    let persistence = IndexPersistence::new(dir.path().join(".codetrace"));
    check_for_updates(dir.path(), &settings, &persistence).await.unwrap();

    fs::remove_file(&stale_path).unwrap();
    let updated = check_for_updates(dir.path(), &settings, &persistence).await.unwrap();
    assert!(updated.get("stale.gone_soon").is_none());
}
