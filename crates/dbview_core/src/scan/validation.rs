//! Duplicate-value and missing-field detection.

use crate::model::document::Document;
use crate::store::document_store::{DocumentFilter, DocumentStore};
use crate::store::{StoreError, StoreResult};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::time::Instant;

/// Fields an event document is expected to carry.
pub const DEFAULT_EVENT_REQUIRED_FIELDS: &[&str] = &[
    "owner",
    "id",
    "price",
    "title",
    "description",
    "location",
    "maxPeople",
    "totalPeople",
    "date",
];

/// A field value shared by more than one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub value: Value,
    pub count: u64,
}

/// Returns every value of `key_field` held by more than one document.
///
/// Output order is unspecified. Documents without `key_field` are ignored.
pub fn find_duplicates<D: DocumentStore + ?Sized>(
    store: &D,
    collection: &str,
    key_field: &str,
) -> StoreResult<Vec<DuplicateGroup>> {
    let started_at = Instant::now();
    let groups: Vec<DuplicateGroup> = store
        .count_by_field(collection, key_field, 2)?
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(value, count)| DuplicateGroup { value, count })
        .collect();

    info!(
        "event=scan_duplicates module=scan status=ok collection={collection} field={key_field} groups={} duration_ms={}",
        groups.len(),
        started_at.elapsed().as_millis()
    );
    Ok(groups)
}

/// Returns every document lacking at least one of `required_fields`.
///
/// An empty requirement set matches nothing and does not query the store.
pub fn find_missing_fields<D: DocumentStore + ?Sized>(
    store: &D,
    collection: &str,
    required_fields: &[String],
) -> StoreResult<Vec<Document>> {
    if required_fields.is_empty() {
        return Ok(Vec::new());
    }

    let started_at = Instant::now();
    let filter = DocumentFilter::AnyFieldMissing(required_fields.to_vec());
    let documents = store.find(collection, &filter)?;

    info!(
        "event=scan_missing_fields module=scan status=ok collection={collection} required={} flagged={} duration_ms={}",
        required_fields.len(),
        documents.len(),
        started_at.elapsed().as_millis()
    );
    Ok(documents)
}

/// What a consistency check looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPlan {
    pub collection: String,
    pub key_field: String,
    pub required_fields: Vec<String>,
}

impl Default for CheckPlan {
    fn default() -> Self {
        Self {
            collection: "events".to_string(),
            key_field: "title".to_string(),
            required_fields: DEFAULT_EVENT_REQUIRED_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

/// Findings of one consistency check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyReport {
    pub duplicates: Vec<DuplicateGroup>,
    pub missing_fields: Vec<Document>,
}

#[derive(Debug)]
pub enum CheckError {
    Store(StoreError),
    Output(io::Error),
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to write report: {err}"),
        }
    }
}

impl Error for CheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<StoreError> for CheckError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<io::Error> for CheckError {
    fn from(value: io::Error) -> Self {
        Self::Output(value)
    }
}

/// Runs both checks and prints a human-readable report to `out`.
///
/// Both queries complete before anything is printed, so a store failure
/// leaves `out` untouched.
pub fn run_consistency_check<D: DocumentStore + ?Sized, W: Write>(
    store: &D,
    plan: &CheckPlan,
    out: &mut W,
) -> Result<ConsistencyReport, CheckError> {
    let duplicates = find_duplicates(store, &plan.collection, &plan.key_field)?;
    let missing_fields = find_missing_fields(store, &plan.collection, &plan.required_fields)?;

    let label = capitalize(&plan.key_field);
    writeln!(out, "Duplicate {}s:", plan.key_field)?;
    for group in &duplicates {
        writeln!(
            out,
            "{label}: {}, Count: {}",
            display_value(&group.value),
            group.count
        )?;
    }

    writeln!(out, "Documents with missing required fields:")?;
    for document in &missing_fields {
        writeln!(out, "{}", Value::Object(document.clone()))?;
    }

    Ok(ConsistencyReport {
        duplicates,
        missing_fields,
    })
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
