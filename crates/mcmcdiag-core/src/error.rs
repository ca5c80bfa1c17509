//! Error type shared by every stage of the aggregation pipeline.
//!
//! Per-file failures ([`DiagError::FileOpen`], [`DiagError::MissingContainer`])
//! are recoverable: the orchestrator logs them and skips the file. Everything
//! else aborts the operation that raised it.

use std::path::PathBuf;

use thiserror::Error;

use crate::histogram::BinAxis;

/// Errors raised while resolving, loading, aggregating or comparing diagnostics.
#[derive(Debug, Error)]
pub enum DiagError {
    /// The file is missing, unreadable, timed out or is not a valid diagnostic file.
    #[error("could not open {}: {reason}", path.display())]
    FileOpen { path: PathBuf, reason: String },

    /// The file opened but does not hold the expected named container.
    #[error("container '{container}' not found in {}", path.display())]
    MissingContainer { path: PathBuf, container: String },

    /// A histogram's bin geometry differs from the ensemble it was offered to.
    #[error("histogram '{name}' is incompatible: expected {expected}, found {found}")]
    IncompatibleHistogram {
        name: String,
        expected: BinAxis,
        found: BinAxis,
    },

    /// No usable histogram survived loading and filtering for one ensemble.
    #[error(
        "no usable histograms for '{label}' (pattern '{pattern}', {files_matched} file(s) matched, {files_loaded} loaded)"
    )]
    EmptyEnsemble {
        label: String,
        pattern: String,
        files_matched: usize,
        files_loaded: usize,
    },

    /// An envelope was requested over zero histograms.
    #[error("cannot compute an envelope over an empty histogram collection")]
    EmptyCollection,

    /// A path-pattern segment is not a valid shell glob.
    #[error("invalid pattern segment '{segment}': {reason}")]
    InvalidPattern { segment: String, reason: String },

    /// Histogram geometry or contents failed validation.
    #[error("invalid histogram: {0}")]
    InvalidHistogram(String),

    /// An options file could not be read or parsed.
    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl DiagError {
    /// True for errors that only invalidate a single file.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::FileOpen { .. } | Self::MissingContainer { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let open = DiagError::FileOpen {
            path: PathBuf::from("a.json"),
            reason: "missing".into(),
        };
        let missing = DiagError::MissingContainer {
            path: PathBuf::from("a.json"),
            container: "Auto_corr".into(),
        };
        assert!(open.is_per_file());
        assert!(missing.is_per_file());
        assert!(!DiagError::EmptyCollection.is_per_file());
    }

    #[test]
    fn test_empty_ensemble_message_names_label() {
        let err = DiagError::EmptyEnsemble {
            label: "tuned".into(),
            pattern: "runs/*/diag.json".into(),
            files_matched: 0,
            files_loaded: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("'tuned'"));
        assert!(msg.contains("runs/*/diag.json"));
        assert!(msg.contains("0 file(s) matched"));
    }
}
