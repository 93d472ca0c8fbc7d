//! Integration coverage for BM25 ranking and smart-search query variations
//! against a realistic set of short documents.

use codetrace::config::Settings;
use codetrace::search::LexicalIndex;
use std::collections::HashMap;

fn documents() -> HashMap<String, String> {
    let mut docs = HashMap::new();
    docs.insert(
        "auth.py".to_string(),
        "def authenticate_user(token):\n    return verify_token(token)\n".to_string(),
    );
    docs.insert(
        "db.py".to_string(),
        "def connect_database(url):\n    return Database(url)\n".to_string(),
    );
    docs.insert(
        "utils.py".to_string(),
        "def format_timestamp(ts):\n    return str(ts)\n".to_string(),
    );
    docs
}

#[tokio::test]
async fn bm25_query_ranks_best_match_first() {
    let settings = Settings::default();
    let mut index = LexicalIndex::new(&settings.search);
    index.build(documents()).await.unwrap();

    let results = index.query("authenticate token", 5).await.unwrap();
    assert_eq!(results[0].0, "auth.py");
}

#[tokio::test]
async fn smart_search_matches_camel_case_query_against_snake_case_source() {
    let settings = Settings::default();
    let mut index = LexicalIndex::new(&settings.search);
    index.build(documents()).await.unwrap();

    let results = index.smart_search("connectDatabase", 5, settings.search.exact_match_boost).await.unwrap();
    assert!(results.iter().any(|(key, _)| key == "db.py"));
}

#[tokio::test]
async fn smart_search_expands_known_abbreviations() {
    let settings = Settings::default();
    let mut index = LexicalIndex::new(&settings.search);
    index.build(documents()).await.unwrap();

    let results = index.smart_search("auth", 5, settings.search.exact_match_boost).await.unwrap();
    assert!(results.iter().any(|(key, _)| key == "auth.py"));
}

#[tokio::test]
async fn update_then_remove_document_round_trips_visibility() {
    let settings = Settings::default();
    let mut index = LexicalIndex::new(&settings.search);
    index.build(documents()).await.unwrap();

    index.update_document("new.py", "def unique_marker_xyz(): pass");
    let found = index.query("unique_marker_xyz", 5).await.unwrap();
    assert_eq!(found[0].0, "new.py");

    index.remove_document("new.py");
    let after_removal = index.query("unique_marker_xyz", 5).await.unwrap();
    assert!(after_removal.is_empty());
}
