use std::io;
use std::path::PathBuf;

use mcmcdiag_core::DiagError;
use thiserror::Error;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Diag(#[from] DiagError),

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output path has an extension no renderer handles.
    #[error("unsupported output '{0}': use a .svg or .json file name")]
    UnsupportedOutput(String),
}
