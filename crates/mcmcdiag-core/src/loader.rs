//! Extract the named histograms of one container from one diagnostic file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{DiagError, Result};
use crate::histogram::Histogram;
use crate::reader::{DiagnosticReader, StoredObject};

/// Container holding per-parameter autocorrelation histograms.
pub const AUTOCORRELATION_CONTAINER: &str = "Auto_corr";

/// An entry that was present in the container but could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: String,
}

/// Histograms copied out of one file. Holds no file resources.
#[derive(Debug, Clone)]
pub struct DiagnosticFile {
    pub path: PathBuf,
    pub histograms: BTreeMap<String, Histogram>,
    pub skipped: Vec<SkippedEntry>,
}

impl DiagnosticFile {
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

/// Load every histogram in `container` from `path`.
///
/// Entries that are not histograms are logged and recorded in
/// [`DiagnosticFile::skipped`]; they never fail the file. The opened file is
/// dropped before this returns, on success and on error alike.
pub fn load(reader: &dyn DiagnosticReader, path: &Path, container: &str) -> Result<DiagnosticFile> {
    let file = reader.open(path)?;
    let directory = file
        .directory(container)
        .ok_or_else(|| DiagError::MissingContainer {
            path: path.to_path_buf(),
            container: container.to_string(),
        })?;

    let mut histograms = BTreeMap::new();
    let mut skipped = Vec::new();

    for name in directory.names() {
        match directory.get(&name) {
            Some(StoredObject::Histogram(hist)) => {
                histograms.insert(name, hist);
            }
            Some(StoredObject::Other { kind, reason }) => {
                warn!(
                    "{}: skipping {container}/{name} ({kind}): {reason}",
                    path.display()
                );
                skipped.push(SkippedEntry {
                    name,
                    reason: format!("{kind}: {reason}"),
                });
            }
            None => {
                warn!("{}: {container}/{name} vanished while reading", path.display());
                skipped.push(SkippedEntry {
                    name,
                    reason: "listed but not retrievable".into(),
                });
            }
        }
    }

    Ok(DiagnosticFile {
        path: path.to_path_buf(),
        histograms,
        skipped,
    })
}
