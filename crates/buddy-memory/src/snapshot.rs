//! Full-snapshot persistence for a [`VectorStore`].
//!
//! A snapshot is a JSONL file: a header line carrying the schema version,
//! vector dimension, metric and record count, followed by one line per record
//! in store order. Every save rewrites the whole file through a temporary sibling
//! that is synced and renamed over the previous snapshot.

use crate::error::MemoryError;
use crate::index::{METRIC, validate_vector};
use crate::model::Record;
use crate::store::VectorStore;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SnapshotLine {
    Header {
        version: u32,
        dimension: Option<usize>,
        metric: String,
        records: usize,
    },
    Record(Record),
}

/// Load a snapshot written by [`save`].
///
/// Failing to open or read the file surfaces as [`MemoryError::Io`]. Content
/// that is not UTF-8, does not decode into a valid, ordered, fixed-dimension
/// record sequence, or holds fewer or more records than its header announces
/// is [`MemoryError::CorruptSnapshot`].
pub fn load(path: impl AsRef<Path>) -> Result<VectorStore, MemoryError> {
    let path = path.as_ref();
    let file = OpenOptions::new().read(true).open(path)?;
    let reader = BufReader::new(file);
    let corrupt = |reason: String| MemoryError::CorruptSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    let mut dimension: Option<usize> = None;
    let mut saw_header = false;
    let mut expected_records = 0;
    let mut records: Vec<Record> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.map_err(|err| match err.kind() {
            ErrorKind::InvalidData => corrupt(format!("line {line_no}: {err}")),
            _ => MemoryError::Io(err),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: SnapshotLine = serde_json::from_str(&line)
            .map_err(|err| corrupt(format!("line {line_no}: {err}")))?;
        match entry {
            SnapshotLine::Header {
                version,
                dimension: header_dimension,
                metric,
                records: header_records,
            } => {
                if saw_header {
                    return Err(corrupt(format!("line {line_no}: duplicate header")));
                }
                if version > SNAPSHOT_VERSION {
                    return Err(corrupt(format!("unsupported snapshot version: {version}")));
                }
                if metric != METRIC {
                    return Err(corrupt(format!("unsupported metric: {metric}")));
                }
                saw_header = true;
                dimension = header_dimension;
                expected_records = header_records;
            }
            SnapshotLine::Record(record) => {
                if !saw_header {
                    return Err(corrupt(format!("line {line_no}: record before header")));
                }
                validate_vector(&record.vector)
                    .map_err(|err| corrupt(format!("line {line_no}: {err}")))?;
                let expected = *dimension.get_or_insert(record.vector.len());
                if record.vector.len() != expected {
                    return Err(corrupt(format!(
                        "line {line_no}: record {} has dimension {}, expected {expected}",
                        record.id,
                        record.vector.len()
                    )));
                }
                if let Some(previous) = records.last() {
                    if record.id <= previous.id || record.created_at <= previous.created_at {
                        return Err(corrupt(format!(
                            "line {line_no}: record {} is out of order",
                            record.id
                        )));
                    }
                }
                records.push(record);
            }
        }
    }

    if !saw_header {
        return Err(corrupt("missing header".to_string()));
    }
    if records.len() != expected_records {
        return Err(corrupt(format!(
            "expected {expected_records} records, found {}",
            records.len()
        )));
    }
    info!(
        "loaded snapshot (path={}, records={}, dimension={:?})",
        path.display(),
        records.len(),
        dimension
    );
    Ok(VectorStore::from_records(records))
}

/// Atomically replace the snapshot at `path` with the full contents of
/// `store`.
pub fn save(path: impl AsRef<Path>, store: &VectorStore) -> Result<(), MemoryError> {
    let path = path.as_ref();
    let persistence = |source: std::io::Error| MemoryError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persistence)?;
    }

    let temp_path = temp_path(path);
    if let Err(err) = write_snapshot(&temp_path, store) {
        let _ = fs::remove_file(&temp_path);
        return Err(persistence(err));
    }
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(persistence(err));
    }
    sync_parent(path).map_err(persistence)?;
    debug!(
        "saved snapshot (path={}, records={})",
        path.display(),
        store.len()
    );
    Ok(())
}

/// Sibling path used while a snapshot is being written.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Flush the directory entry created by the rename.
#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => File::open(parent)?.sync_all(),
        None => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_snapshot(path: &Path, store: &VectorStore) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    let header = SnapshotLine::Header {
        version: SNAPSHOT_VERSION,
        dimension: store.dimension(),
        metric: METRIC.to_string(),
        records: store.len(),
    };
    write_line(&mut writer, &header)?;
    for record in store.all() {
        write_line(&mut writer, &SnapshotLine::Record(record.clone()))?;
    }
    let file: File = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()
}

fn write_line(writer: &mut impl Write, line: &SnapshotLine) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, line)?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::{load, save, temp_path};
    use crate::{MemoryError, Role, VectorStore};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn sample_store() -> VectorStore {
        let mut store = VectorStore::new();
        store.append(Role::System, "initial memory", vec![0.125, -0.5, 0.3]);
        store.append(Role::User, "hello", vec![0.1, 0.2, 0.7]);
        store.append(Role::Agent, "hi there", vec![-0.33333334, 1e-7, 42.0]);
        store
    }

    #[test]
    fn round_trip_preserves_records() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        let store = sample_store();
        save(&path, &store).expect("save");

        let loaded = load(&path).expect("load");
        assert_eq!(loaded.len(), store.len());
        for (original, restored) in store.all().iter().zip(loaded.all()) {
            assert_eq!(restored.id, original.id);
            assert_eq!(restored.role, original.role);
            assert_eq!(restored.text, original.text);
            assert_eq!(restored.created_at, original.created_at);
            for (a, b) in original.vector.iter().zip(&restored.vector) {
                assert!((a - b).abs() <= 1e-6);
            }
        }
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn save_overwrites_previous_snapshot_wholesale() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("memory.jsonl");
        let mut store = sample_store();
        save(&path, &store).expect("first save");
        store.append(Role::User, "again", vec![1.0, 1.0, 1.0]);
        save(&path, &store).expect("second save");

        let loaded = load(&path).expect("load");
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.all()[3].text, "again");
    }

    #[test]
    fn failed_save_keeps_existing_snapshot() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        let store = sample_store();
        save(&path, &store).expect("save");

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir_all(temp_path(&path)).expect("block temp path");
        let mut grown = store.clone();
        grown.append(Role::User, "lost", vec![0.0, 0.0, 1.0]);
        let err = save(&path, &grown).expect_err("save should fail");
        assert!(matches!(err, MemoryError::Persistence { .. }));

        let loaded = load(&path).expect("load");
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn truncated_snapshot_is_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        save(&path, &sample_store()).expect("save");
        let contents = fs::read_to_string(&path).expect("read");
        fs::write(&path, &contents[..contents.len() - 20]).expect("truncate");

        let err = load(&path).expect_err("corrupt");
        assert!(matches!(err, MemoryError::CorruptSnapshot { .. }));
    }

    #[test]
    fn non_utf8_snapshot_is_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        fs::write(&path, b"{\"type\":\"header\",\xff\xfe garbage\n").expect("write");

        let err = load(&path).expect_err("corrupt");
        let MemoryError::CorruptSnapshot { reason, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(reason.starts_with("line 1:"));
    }

    #[test]
    fn missing_trailing_record_is_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        save(&path, &sample_store()).expect("save");
        let contents = fs::read_to_string(&path).expect("read");
        let kept: Vec<&str> = contents.lines().take(3).collect();
        fs::write(&path, format!("{}\n", kept.join("\n"))).expect("rewrite");

        let err = load(&path).expect_err("corrupt");
        let MemoryError::CorruptSnapshot { reason, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(reason, "expected 3 records, found 2");
    }

    #[test]
    fn dimension_mismatch_is_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        let mut store = VectorStore::new();
        store.append(Role::User, "a", vec![0.0, 1.0]);
        store.append(Role::User, "b", vec![0.0, 1.0, 2.0]);
        save(&path, &store).expect("save");

        let err = load(&path).expect_err("corrupt");
        let MemoryError::CorruptSnapshot { reason, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(reason.contains("dimension"));
    }

    #[test]
    fn missing_header_is_corrupt() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("memory.jsonl");
        fs::write(&path, "").expect("write");
        let err = load(&path).expect_err("corrupt");
        assert!(matches!(err, MemoryError::CorruptSnapshot { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp = tempdir().expect("tempdir");
        let err = load(temp.path().join("absent.jsonl")).expect_err("missing");
        assert!(matches!(err, MemoryError::Io(_)));
    }
}
