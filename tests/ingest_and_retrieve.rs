//! End-to-end tests: ingest a scratch Python project from disk, look up
//! elements by unique identifier, and pull transitive context around them.

use codetrace::config::Settings;
use codetrace::retrieve::OutputShape;
use codetrace::{ingest, ContextRetriever};
use std::fs;
use tempfile::TempDir;

fn write_project(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("pkg")).unwrap();
    fs::write(
        dir.path().join("pkg/__init__.py"),
        "from .widgets import Widget\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("pkg/widgets.py"),
        "class Widget:\n    def render(self):\n        return 1\n\n\ndef make_widget():\n    return Widget()\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("pkg/app.py"),
        "from pkg import Widget\n\n\ndef run():\n    return Widget().render()\n",
    )
    .unwrap();
}

#[tokio::test]
async fn ingest_resolves_ids_across_files() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let settings = Settings::default();
    let codebase = ingest(dir.path(), &settings).await.unwrap();

    assert!(codebase.get("pkg.widgets.Widget").is_some());
    assert!(codebase.get("pkg.widgets.make_widget").is_some());
    assert!(codebase.get("pkg.app.run").is_some());
}

#[tokio::test]
async fn retrieve_follows_references_at_depth_one() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let settings = Settings::default();
    let codebase = ingest(dir.path(), &settings).await.unwrap();

    let retriever = ContextRetriever::new(&codebase);
    let result = retriever
        .get(&["pkg.app.run".to_string()], 1, settings.context.max_depth, OutputShape::AsStringList)
        .unwrap();

    assert_eq!(result.structure.requested_elements, vec!["pkg.app.run".to_string()]);
    assert!(result.structure.imports.iter().any(|id| id.ends_with("Widget")));
    assert!(result.context.iter().any(|block| block.contains("PACKAGES") && block.contains("from pkg import Widget")));
}

#[tokio::test]
async fn ignored_directories_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);
    fs::create_dir_all(dir.path().join("vendor")).unwrap();
    fs::write(dir.path().join("vendor/thirdparty.py"), "def should_not_appear():\n    pass\n").unwrap();
    fs::write(dir.path().join(".gitignore"), "vendor/\n").unwrap();

    let settings = Settings::default();
    let codebase = ingest(dir.path(), &settings).await.unwrap();

    assert!(codebase.get("vendor.thirdparty.should_not_appear").is_none());
}
