//! Read contract for diagnostic files and the JSON backend.
//!
//! A diagnostic file is a set of named containers, each holding named
//! objects. The loader only needs four things from a backend: open a file,
//! look up a container, list its names, and fetch one object as a histogram.
//! Fetching never fails hard: objects of another type come back as
//! [`StoredObject::Other`] so callers can log and skip them.
//!
//! [`JsonReader`] reads files shaped like
//!
//! ```json
//! {
//!   "Auto_corr": {
//!     "theta_13": {"nbins": 3, "min": 0.0, "max": 3.0, "contents": [1.0, 0.4, 0.1]},
//!     "comment": "anything that is not a histogram is skipped"
//!   }
//! }
//! ```
//!
//! optionally gzip-compressed (`.gz` suffix).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DiagError, Result};
use crate::histogram::Histogram;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Outcome of fetching one named object.
#[derive(Debug, Clone)]
pub enum StoredObject {
    Histogram(Histogram),
    /// The object exists but is not a usable histogram.
    Other { kind: String, reason: String },
}

/// One named container inside an open file.
pub trait ObjectDirectory {
    /// Object names in storage order.
    fn names(&self) -> Vec<String>;

    /// Fetch `name`; `None` if no such object exists.
    fn get(&self, name: &str) -> Option<StoredObject>;
}

/// An opened diagnostic file.
///
/// Implementations own whatever they read; dropping the value releases it.
pub trait ContainerFile {
    /// Look up a named container.
    fn directory(&self, name: &str) -> Option<Box<dyn ObjectDirectory + '_>>;
}

/// Backend able to open diagnostic files.
pub trait DiagnosticReader: Send + Sync {
    /// Open `path`, failing with [`DiagError::FileOpen`] if it is missing,
    /// unreadable or corrupt.
    fn open(&self, path: &Path) -> Result<Box<dyn ContainerFile>>;
}

// ---------------------------------------------------------------------------
// JSON backend
// ---------------------------------------------------------------------------

/// Reader for JSON (and gzip-compressed JSON) diagnostic files.
#[derive(Debug, Clone, Default)]
pub struct JsonReader {
    timeout: Option<Duration>,
}

impl JsonReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on any single file after `timeout`.
    ///
    /// The read runs on a helper thread; a read stuck on a dead network
    /// mount is abandoned, not cancelled.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl DiagnosticReader for JsonReader {
    fn open(&self, path: &Path) -> Result<Box<dyn ContainerFile>> {
        let bytes = match self.timeout {
            Some(limit) => read_with_timeout(path, limit)?,
            None => read_bytes(path)?,
        };
        let root: Value = serde_json::from_slice(&bytes)
            .map_err(|e| open_error(path, format!("corrupt JSON: {e}")))?;
        match root {
            Value::Object(containers) => Ok(Box::new(JsonFile { containers })),
            other => Err(open_error(
                path,
                format!("top level is {}, expected an object", kind_of(&other)),
            )),
        }
    }
}

struct JsonFile {
    containers: Map<String, Value>,
}

impl ContainerFile for JsonFile {
    fn directory(&self, name: &str) -> Option<Box<dyn ObjectDirectory + '_>> {
        match self.containers.get(name)? {
            Value::Object(entries) => Some(Box::new(JsonDirectory { entries })),
            _ => None,
        }
    }
}

struct JsonDirectory<'a> {
    entries: &'a Map<String, Value>,
}

impl ObjectDirectory for JsonDirectory<'_> {
    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<StoredObject> {
        let value = self.entries.get(name)?;
        Some(match Histogram::deserialize(value) {
            Ok(hist) => StoredObject::Histogram(hist),
            Err(e) => StoredObject::Other {
                kind: kind_of(value).to_string(),
                reason: e.to_string(),
            },
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn open_error(path: &Path, reason: impl Into<String>) -> DiagError {
    DiagError::FileOpen {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Read the whole file, decompressing `.gz` files. The handle is closed on return.
fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| open_error(path, e.to_string()))?;
    let mut bytes = Vec::new();
    let read = if is_gzip(path) {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut bytes)
    } else {
        BufReader::new(file).read_to_end(&mut bytes)
    };
    read.map_err(|e| open_error(path, e.to_string()))?;
    Ok(bytes)
}

fn read_with_timeout(path: &Path, limit: Duration) -> Result<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    let owned: PathBuf = path.to_path_buf();
    std::thread::spawn(move || {
        let _ = tx.send(read_bytes(&owned));
    });
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(open_error(
            path,
            format!("timed out after {:.1}s", limit.as_secs_f64()),
        )),
        Err(RecvTimeoutError::Disconnected) => Err(open_error(path, "reader thread exited")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "Auto_corr": {
            "alpha": {"nbins": 3, "min": 0.0, "max": 3.0, "contents": [1.0, 0.5, 0.1]},
            "note": "not a histogram",
            "broken": {"nbins": 5, "min": 0.0, "max": 3.0, "contents": [1.0]}
        },
        "Trace": 3
    }"#;

    fn write(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_open_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = JsonReader::new()
            .open(&tmp.path().join("nope.json"))
            .err()
            .unwrap();
        assert!(matches!(err, DiagError::FileOpen { .. }));
    }

    #[test]
    fn test_open_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "bad.json", b"{ not json");
        let err = JsonReader::new().open(&path).err().unwrap();
        assert!(err.to_string().contains("corrupt JSON"));
    }

    #[test]
    fn test_open_non_object_top_level() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "list.json", b"[1, 2, 3]");
        let err = JsonReader::new().open(&path).err().unwrap();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_directory_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "diag.json", SAMPLE.as_bytes());
        let file = JsonReader::new().open(&path).unwrap();
        assert!(file.directory("Auto_corr").is_some());
        // present but not a container
        assert!(file.directory("Trace").is_none());
        assert!(file.directory("Missing").is_none());
    }

    #[test]
    fn test_get_tags_objects() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "diag.json", SAMPLE.as_bytes());
        let file = JsonReader::new().open(&path).unwrap();
        let dir = file.directory("Auto_corr").unwrap();

        assert_eq!(dir.names().len(), 3);
        assert!(matches!(dir.get("alpha"), Some(StoredObject::Histogram(_))));
        match dir.get("note") {
            Some(StoredObject::Other { kind, .. }) => assert_eq!(kind, "string"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(dir.get("broken"), Some(StoredObject::Other { .. })));
        assert!(dir.get("gamma").is_none());
    }

    #[test]
    fn test_open_gzip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(SAMPLE.as_bytes()).unwrap();
        let path = write(tmp.path(), "diag.json.gz", &enc.finish().unwrap());

        let file = JsonReader::new().open(&path).unwrap();
        let dir = file.directory("Auto_corr").unwrap();
        assert!(matches!(dir.get("alpha"), Some(StoredObject::Histogram(_))));
    }

    #[test]
    fn test_open_with_timeout_reads_normally() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "diag.json", SAMPLE.as_bytes());
        let reader = JsonReader::with_timeout(Duration::from_secs(5));
        assert_eq!(reader.timeout(), Some(Duration::from_secs(5)));
        assert!(reader.open(&path).is_ok());
    }
}
