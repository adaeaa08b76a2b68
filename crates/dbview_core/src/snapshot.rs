//! Dated JSON snapshots of fetch results.
//!
//! # Responsibility
//! - Serialize a result set to indented JSON under `<prefix>_<YYYY-MM-DD>.json`.
//! - Create the target directory on demand.
//!
//! # Invariants
//! - Same prefix and date always map to the same file; the latest write wins.
//! - The file is replaced by rename, so readers never observe a partial write.
//! - Callers treat `SnapshotError` as non-fatal.

use chrono::{Local, NaiveDate};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SNAPSHOT_INDENT: &[u8] = b"    ";

/// Snapshot write failure.
#[derive(Debug)]
pub enum SnapshotError {
    Serialize(serde_json::Error),
    CreateDir { path: PathBuf, source: io::Error },
    Write { path: PathBuf, source: io::Error },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize snapshot: {err}"),
            Self::CreateDir { path, source } => write!(
                f,
                "failed to create snapshot directory `{}`: {source}",
                path.display()
            ),
            Self::Write { path, source } => {
                write!(f, "failed to write snapshot `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::CreateDir { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// File name for a snapshot taken on `date`.
pub fn snapshot_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}.json", date.format("%Y-%m-%d"))
}

/// Writes `data` as today's (local calendar date) snapshot for `prefix`.
pub fn write_snapshot<T: Serialize + ?Sized>(
    data: &T,
    prefix: &str,
    target_dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    write_snapshot_on(data, prefix, target_dir, Local::now().date_naive())
}

/// Writes `data` as the snapshot for `prefix` on `date` and returns its path.
pub fn write_snapshot_on<T: Serialize + ?Sized>(
    data: &T,
    prefix: &str,
    target_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, SnapshotError> {
    let payload = to_indented_json(data)?;

    fs::create_dir_all(target_dir).map_err(|source| SnapshotError::CreateDir {
        path: target_dir.to_path_buf(),
        source,
    })?;

    let file_name = snapshot_file_name(prefix, date);
    let path = target_dir.join(&file_name);
    let staging = target_dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let replaced = fs::write(&staging, &payload).and_then(|()| fs::rename(&staging, &path));
    if let Err(source) = replaced {
        let _ = fs::remove_file(&staging);
        return Err(SnapshotError::Write { path, source });
    }

    info!(
        "event=snapshot_write module=snapshot status=ok path={} bytes={}",
        path.display(),
        payload.len()
    );
    Ok(path)
}

fn to_indented_json<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>, SnapshotError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(SNAPSHOT_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    data.serialize(&mut serializer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::{snapshot_file_name, to_indented_json};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(snapshot_file_name("Events_Backup", date), "Events_Backup_2024-03-07.json");
    }

    #[test]
    fn payload_is_indented_with_four_spaces() {
        let payload = to_indented_json(&json!({"title": "A"})).unwrap();
        let text = String::from_utf8(payload).unwrap();
        assert_eq!(text, "{\n    \"title\": \"A\"\n}");
    }
}
