use dbview_core::{
    Document, DocumentFilter, DocumentStore, DocumentStoreLocation, SqliteDocumentStore,
    StoreError,
};
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

fn seeded(collection: &str, docs: Vec<Value>) -> SqliteDocumentStore {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for value in docs {
        store.insert_document(collection, doc(value)).unwrap();
    }
    store
}

#[test]
fn find_all_returns_documents_in_insertion_order_with_ids() {
    let store = seeded(
        "events",
        vec![
            json!({"_id": "e1", "title": "A"}),
            json!({"_id": "e2", "title": "B"}),
        ],
    );
    store
        .insert_document("accounts", doc(json!({"email": "x@example.com"})))
        .unwrap();

    let events = store.find("events", &DocumentFilter::All).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["_id"], json!("e1"));
    assert_eq!(events[1]["title"], json!("B"));

    let accounts = store.find("accounts", &DocumentFilter::All).unwrap();
    assert_eq!(accounts.len(), 1);
    assert!(accounts[0]["_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn unknown_collection_is_empty() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    assert!(store.find("nope", &DocumentFilter::All).unwrap().is_empty());
    assert!(store.count_by_field("nope", "title", 1).unwrap().is_empty());
}

#[test]
fn insert_with_existing_id_replaces_document() {
    let store = seeded("events", vec![json!({"_id": "e1", "title": "Old"})]);
    store
        .insert_document("events", doc(json!({"_id": "e1", "title": "New"})))
        .unwrap();

    let events = store.find("events", &DocumentFilter::All).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], json!("New"));
}

#[test]
fn non_string_id_is_rejected() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let err = store
        .insert_document("events", doc(json!({"_id": 12})))
        .unwrap_err();
    assert!(matches!(err, StoreError::QueryFailed(_)));
}

#[test]
fn any_field_missing_filter_uses_key_presence() {
    let store = seeded(
        "events",
        vec![
            json!({"_id": "complete", "owner": "y", "title": "X"}),
            json!({"_id": "null-owner", "owner": null, "title": "X"}),
            json!({"_id": "no-owner", "title": "X"}),
            json!({"_id": "bare"}),
        ],
    );
    let filter = DocumentFilter::AnyFieldMissing(vec!["owner".into(), "title".into()]);

    let mut ids: Vec<String> = store
        .find("events", &filter)
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["bare", "no-owner"]);
}

#[test]
fn id_field_is_never_missing() {
    let store = seeded("events", vec![json!({"_id": "e1"})]);
    let filter = DocumentFilter::AnyFieldMissing(vec!["_id".into()]);
    assert!(store.find("events", &filter).unwrap().is_empty());
}

#[test]
fn count_by_field_keeps_json_kinds_apart() {
    let store = seeded(
        "events",
        vec![
            json!({"code": "1"}),
            json!({"code": 1}),
            json!({"code": 1}),
            json!({"code": {"a": 1}}),
            json!({"code": {"a": 1}}),
            json!({"other": true}),
        ],
    );

    let mut groups = store.count_by_field("events", "code", 1).unwrap();
    groups.sort_by_key(|(value, _)| value.to_string());
    assert_eq!(
        groups,
        vec![
            (json!("1"), 1),
            (json!(1), 2),
            (json!({"a": 1}), 2),
        ]
    );

    let duplicated = store.count_by_field("events", "code", 2).unwrap();
    assert_eq!(duplicated.len(), 2);
}

#[test]
fn field_names_with_dots_address_top_level_keys() {
    let store = seeded(
        "events",
        vec![
            json!({"a.b": "x", "a": {"b": "y"}}),
            json!({"a.b": "x"}),
        ],
    );
    let groups = store.count_by_field("events", "a.b", 2).unwrap();
    assert_eq!(groups, vec![(json!("x"), 2)]);
}

#[test]
fn file_store_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.db");
    let location = DocumentStoreLocation::File(path.clone());

    let store = SqliteDocumentStore::create(&path).unwrap();
    store
        .insert_document("events", doc(json!({"_id": "e1", "title": "Kept"})))
        .unwrap();
    drop(store);

    let reopened = SqliteDocumentStore::open(&location).unwrap();
    reopened.ping().unwrap();
    let events = reopened.find("events", &DocumentFilter::All).unwrap();
    assert_eq!(events[0]["title"], json!("Kept"));
}

#[test]
fn unopenable_location_is_unavailable() {
    let location = DocumentStoreLocation::File("/nonexistent-dir/for/dbview/docs.db".into());
    let err = SqliteDocumentStore::open(&location).err().expect("open must fail");
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[test]
fn missing_store_file_is_unavailable_and_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo_docs.db");
    let location = DocumentStoreLocation::File(path.clone());

    let err = SqliteDocumentStore::open(&location).err().expect("open must fail");
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(!path.exists());
}

#[test]
fn mongo_location_is_not_a_sqlite_store() {
    let location = DocumentStoreLocation::Mongo("mongodb://localhost:27017".to_string());
    let err = SqliteDocumentStore::open(&location).err().expect("open must fail");
    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[test]
fn integer_and_float_spellings_group_apart() {
    let store = seeded(
        "events",
        vec![json!({"maxPeople": 1}), json!({"maxPeople": 1.0}), json!({"maxPeople": 1})],
    );
    let mut groups = store.count_by_field("events", "maxPeople", 1).unwrap();
    groups.sort_by_key(|(_, count)| *count);
    assert_eq!(groups, vec![(json!(1.0), 1), (json!(1), 2)]);
}
