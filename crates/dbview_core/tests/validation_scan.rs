use dbview_core::{
    find_duplicates, find_missing_fields, run_consistency_check, CheckError, CheckPlan, Document,
    DocumentFilter, DocumentStore, SqliteDocumentStore, StoreError, StoreResult,
};
use serde_json::{json, Value};
use std::cell::Cell;

fn seeded(docs: Vec<Value>) -> SqliteDocumentStore {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for value in docs {
        let Value::Object(doc) = value else {
            panic!("fixture must be an object");
        };
        store.insert_document("events", doc).unwrap();
    }
    store
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn ids(docs: &[Document]) -> Vec<String> {
    let mut ids: Vec<String> = docs
        .iter()
        .map(|doc| doc["_id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

/// Store that fails every call and counts how often it was asked.
#[derive(Default)]
struct UnreachableStore {
    calls: Cell<usize>,
}

impl DocumentStore for UnreachableStore {
    fn find(&self, _collection: &str, _filter: &DocumentFilter) -> StoreResult<Vec<Document>> {
        self.calls.set(self.calls.get() + 1);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn count_by_field(
        &self,
        _collection: &str,
        _field: &str,
        _min_count: u64,
    ) -> StoreResult<Vec<(Value, u64)>> {
        self.calls.set(self.calls.get() + 1);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[test]
fn duplicates_report_only_shared_values() {
    let store = seeded(vec![
        json!({"title": "A"}),
        json!({"title": "A"}),
        json!({"title": "B"}),
    ]);

    let groups = find_duplicates(&store, "events", "title").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].value, json!("A"));
    assert_eq!(groups[0].count, 2);
}

#[test]
fn duplicates_cover_every_shared_value() {
    let store = seeded(vec![
        json!({"title": "A"}),
        json!({"title": "B"}),
        json!({"title": "A"}),
        json!({"title": "B"}),
        json!({"title": "B"}),
        json!({"title": "C"}),
    ]);

    let mut groups: Vec<(String, u64)> = find_duplicates(&store, "events", "title")
        .unwrap()
        .into_iter()
        .map(|group| (group.value.as_str().unwrap().to_string(), group.count))
        .collect();
    groups.sort();
    assert_eq!(groups, vec![("A".to_string(), 2), ("B".to_string(), 3)]);
}

#[test]
fn duplicates_on_absent_field_are_empty() {
    let store = seeded(vec![json!({"title": "A"}), json!({"title": "A"})]);
    assert!(find_duplicates(&store, "events", "owner").unwrap().is_empty());
}

#[test]
fn missing_fields_flags_document_lacking_one_required_field() {
    let store = seeded(vec![
        json!({"_id": "no-owner", "title": "X"}),
        json!({"_id": "complete", "owner": "y", "title": "X"}),
    ]);

    let flagged = find_missing_fields(&store, "events", &fields(&["owner", "title"])).unwrap();
    assert_eq!(ids(&flagged), vec!["no-owner"]);
}

#[test]
fn missing_fields_lists_each_document_once() {
    let store = seeded(vec![
        json!({"_id": "lacks-all"}),
        json!({"_id": "lacks-one", "owner": "y", "title": "X"}),
        json!({"_id": "complete", "owner": "y", "title": "X", "price": "1"}),
    ]);

    let flagged =
        find_missing_fields(&store, "events", &fields(&["owner", "title", "price"])).unwrap();
    assert_eq!(ids(&flagged), vec!["lacks-all", "lacks-one"]);
}

#[test]
fn empty_requirement_set_matches_nothing_without_querying() {
    let store = UnreachableStore::default();
    let flagged = find_missing_fields(&store, "events", &[]).unwrap();
    assert!(flagged.is_empty());
    assert_eq!(store.calls.get(), 0);
}

#[test]
fn unreachable_store_fails_whole_scan() {
    let store = UnreachableStore::default();

    let err = find_missing_fields(&store, "events", &fields(&["owner"])).unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    let err = find_duplicates(&store, "events", "title").unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[test]
fn scans_leave_collection_untouched() {
    let store = seeded(vec![json!({"title": "A"}), json!({"title": "A"})]);
    let before = store.find("events", &DocumentFilter::All).unwrap();

    find_duplicates(&store, "events", "title").unwrap();
    find_missing_fields(&store, "events", &fields(&["owner"])).unwrap();

    assert_eq!(store.find("events", &DocumentFilter::All).unwrap(), before);
}

#[test]
fn consistency_check_prints_both_sections() {
    let store = seeded(vec![
        json!({"_id": "e1", "title": "A"}),
        json!({"_id": "e2", "title": "A", "owner": "y"}),
        json!({"_id": "e3", "title": "B", "owner": "y"}),
    ]);
    let plan = CheckPlan {
        collection: "events".to_string(),
        key_field: "title".to_string(),
        required_fields: fields(&["owner", "title"]),
    };

    let mut out = Vec::new();
    let report = run_consistency_check(&store, &plan, &mut out).unwrap();
    let printed = String::from_utf8(out).unwrap();

    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(ids(&report.missing_fields), vec!["e1"]);
    assert!(printed.starts_with("Duplicate titles:\n"));
    assert!(printed.contains("Title: A, Count: 2\n"));
    assert!(printed.contains("Documents with missing required fields:\n"));
    assert!(printed.contains("\"_id\":\"e1\""));
    assert!(!printed.contains("\"_id\":\"e3\""));
}

#[test]
fn consistency_check_prints_nothing_when_store_fails() {
    let store = UnreachableStore::default();
    let mut out = Vec::new();

    let err = run_consistency_check(&store, &CheckPlan::default(), &mut out).unwrap_err();
    assert!(matches!(err, CheckError::Store(StoreError::Unavailable(_))));
    assert!(out.is_empty());
}
