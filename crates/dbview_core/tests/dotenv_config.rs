use dbview_core::{load_dotenv_from, DotenvStatus};
use std::fs;

#[test]
fn dotenv_file_fills_unset_variables_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    fs::write(
        &path,
        "DBVIEW_DOTENV_FRESH=from-file\nDBVIEW_DOTENV_PRESET=from-file\n",
    )
    .unwrap();
    std::env::set_var("DBVIEW_DOTENV_PRESET", "from-process");

    let status = load_dotenv_from(&path);
    assert!(matches!(status, DotenvStatus::Loaded(ref loaded) if loaded == &path));
    assert_eq!(std::env::var("DBVIEW_DOTENV_FRESH").unwrap(), "from-file");
    assert_eq!(std::env::var("DBVIEW_DOTENV_PRESET").unwrap(), "from-process");
}

#[test]
fn missing_dotenv_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let status = load_dotenv_from(&dir.path().join(".env"));
    assert!(matches!(status, DotenvStatus::NotFound));
}

#[test]
fn malformed_dotenv_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    fs::write(&path, "DBVIEW_DOTENV_BROKEN='unterminated\n").unwrap();

    let status = load_dotenv_from(&path);
    assert!(matches!(status, DotenvStatus::Failed(_)));
}
