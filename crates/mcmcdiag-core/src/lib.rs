//! # mcmcdiag-core
//!
//! **Ensemble autocorrelation diagnostics for MCMC fits.**
//!
//! A fit campaign leaves one diagnostic file per run, each holding one
//! autocorrelation histogram per sampled parameter. `mcmcdiag-core` collects
//! every file matched by a path pattern, throws away degenerate curves,
//! averages the rest and bounds them with a per-lag min/max envelope. Two
//! such ensembles side by side make a comparison.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcmcdiag_core::{CompareOptions, JsonReader, compare};
//!
//! let result = compare(
//!     &JsonReader::new(),
//!     "fits/baseline/*/diag.json",
//!     "baseline",
//!     "fits/tuned/*/diag.json",
//!     "tuned",
//!     &CompareOptions::default(),
//! )
//! .unwrap();
//!
//! for side in result.sides() {
//!     println!("{}: {} parameters", side.label, side.parameter_count);
//! }
//! ```
//!
//! ## Architecture
//!
//! Pattern → Files → Loader → Filter → Ensemble → Envelope/Bands → Renderer
//!
//! File access goes through the [`DiagnosticReader`] trait. [`JsonReader`]
//! reads JSON and gzip-compressed JSON; other storage formats plug in by
//! implementing the trait. Nothing here draws: the result is a plain value
//! handed to whatever renders it.

pub mod compare;
pub mod config;
pub mod ensemble;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod loader;
pub mod pattern;
pub mod reader;

pub use compare::{
    ComparisonResult, EnsembleSummary, MemberSummary, average_pattern, build_ensemble, compare,
    inspect_file, summarize,
};
pub use config::CompareOptions;
pub use ensemble::{Ensemble, EnsembleStats, Member};
pub use envelope::{Band, BandSpread, Envelope, error_band};
pub use error::{DiagError, Result};
pub use filter::{
    DEFAULT_MAX_FAILURES, DEFAULT_TOLERANCE, FilterConfig, Rejection, is_all_ones, is_usable,
};
pub use histogram::{BinAxis, Histogram};
pub use loader::{AUTOCORRELATION_CONTAINER, DiagnosticFile, SkippedEntry, load};
pub use pattern::{FilePattern, find_matching_files};
pub use reader::{ContainerFile, DiagnosticReader, JsonReader, ObjectDirectory, StoredObject};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
