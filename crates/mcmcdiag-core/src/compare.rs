//! Build labeled ensembles from path patterns and summarize them for display.
//!
//! The pipeline per side is resolve → load → filter → add. Per-file failures
//! are logged and counted, never fatal; an ensemble that ends up empty fails
//! the whole comparison with the label of the side that came up short.

use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::CompareOptions;
use crate::ensemble::{Ensemble, EnsembleStats, Member};
use crate::envelope::{Band, Envelope, error_band};
use crate::error::Result;
use crate::filter::Rejection;
use crate::histogram::Histogram;
use crate::loader::load;
use crate::pattern::FilePattern;
use crate::reader::DiagnosticReader;

/// A contributing histogram handed to the renderer.
pub type MemberSummary = Member;

/// Everything a renderer needs to draw one ensemble.
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleSummary {
    pub label: String,
    pub pattern: String,
    pub stats: EnsembleStats,
    /// Histograms that entered the average.
    pub parameter_count: usize,
    pub average: Histogram,
    pub envelope: Option<Envelope>,
    pub error_band: Option<Band>,
    pub range_band: Option<Band>,
    /// Empty unless `show_all_members` was set.
    pub members: Vec<MemberSummary>,
}

/// Two summaries side by side, first and second in argument order.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub first: EnsembleSummary,
    pub second: EnsembleSummary,
}

impl ComparisonResult {
    pub fn sides(&self) -> [&EnsembleSummary; 2] {
        [&self.first, &self.second]
    }
}

// ---------------------------------------------------------------------------
// Ensemble construction
// ---------------------------------------------------------------------------

/// Usable histograms from a run of files, in file order.
struct Candidates {
    accepted: Vec<Member>,
    stats: EnsembleStats,
}

/// Result of one worker's chunk.
enum Chunk {
    /// All accepted histograms share one geometry; pre-summed.
    Uniform(Ensemble),
    /// Geometries differ inside the chunk; replayed in order by the caller.
    Mixed(Candidates),
}

/// Resolve `pattern` and aggregate every usable histogram it yields.
///
/// An empty result is not an error here; [`summarize`] reports it. Only an
/// invalid pattern or a non per-file reader error aborts.
pub fn build_ensemble(
    reader: &dyn DiagnosticReader,
    pattern: &str,
    label: &str,
    options: &CompareOptions,
) -> Result<Ensemble> {
    let files = FilePattern::parse(pattern)?.resolve();
    if files.is_empty() {
        warn!("'{label}': pattern '{pattern}' matched no files");
    } else {
        debug!("'{label}': pattern '{pattern}' matched {} file(s)", files.len());
    }

    let mut ensemble = Ensemble::new(label, pattern);
    ensemble.stats_mut().files_matched = files.len();

    let workers = options.effective_workers().min(files.len().max(1));
    if workers <= 1 {
        let candidates = collect(reader, &files, options)?;
        fold(&mut ensemble, candidates);
    } else {
        let chunk_size = files.len().div_ceil(workers);
        let chunks: Vec<Result<Chunk>> = thread::scope(|s| {
            let handles: Vec<_> = files
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move || -> Result<Chunk> {
                        let candidates = collect(reader, chunk, options)?;
                        Ok(presum(label, pattern, candidates))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
                .collect()
        });

        for chunk in chunks {
            match chunk? {
                Chunk::Uniform(partial) if ensemble.can_merge(&partial) => {
                    ensemble.merge(partial)?;
                }
                Chunk::Uniform(partial) => {
                    let (accepted, stats) = partial.into_parts();
                    fold(&mut ensemble, Candidates { accepted, stats });
                }
                Chunk::Mixed(candidates) => fold(&mut ensemble, candidates),
            }
        }
    }

    let stats = ensemble.stats();
    info!(
        "'{label}': processed {} parameters from {} files ({} failed, {} rejected, {} incompatible)",
        ensemble.count(),
        stats.files_loaded,
        stats.files_failed,
        stats.histograms_rejected,
        stats.histograms_incompatible,
    );
    Ok(ensemble)
}

/// Load and filter `files` in order.
fn collect(
    reader: &dyn DiagnosticReader,
    files: &[PathBuf],
    options: &CompareOptions,
) -> Result<Candidates> {
    let mut accepted = Vec::new();
    let mut stats = EnsembleStats::default();

    for path in files {
        let file = match load(reader, path, &options.container) {
            Ok(file) => file,
            Err(e) if e.is_per_file() => {
                warn!("skipping file: {e}");
                stats.files_failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        stats.files_loaded += 1;
        stats.entries_skipped += file.skipped.len();

        for (name, histogram) in file.histograms {
            if let Some(reason) = options.filter.check(&histogram) {
                debug!("{}: rejecting {name}: {reason}", path.display());
                stats.histograms_rejected += 1;
                continue;
            }
            accepted.push(Member {
                source: path.clone(),
                name,
                histogram,
            });
        }
    }

    Ok(Candidates { accepted, stats })
}

/// Add candidates in order, skipping any whose geometry does not match.
fn fold(ensemble: &mut Ensemble, candidates: Candidates) {
    ensemble.stats_mut().absorb(&candidates.stats);
    for member in candidates.accepted {
        if let Err(e) = ensemble.add(&member.source, &member.name, member.histogram) {
            warn!("skipping histogram: {e}");
            ensemble.stats_mut().histograms_incompatible += 1;
        }
    }
}

/// Pre-sum a worker's candidates when they all share one geometry.
fn presum(label: &str, pattern: &str, candidates: Candidates) -> Chunk {
    let uniform = match candidates.accepted.split_first() {
        Some((head, tail)) => tail.iter().all(|m| m.histogram.is_compatible(&head.histogram)),
        None => true,
    };
    if !uniform {
        return Chunk::Mixed(candidates);
    }
    let mut partial = Ensemble::new(label, pattern);
    fold(&mut partial, candidates);
    Chunk::Uniform(partial)
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Compute the average and the requested display pieces of `ensemble`.
pub fn summarize(ensemble: &Ensemble, options: &CompareOptions) -> Result<EnsembleSummary> {
    let average = ensemble.average()?;

    let envelope = if options.show_min_max {
        ensemble.envelope().cloned()
    } else {
        None
    };
    let range_band = envelope.as_ref().map(Envelope::range_band);
    let error_band = options
        .draw_error_bands
        .then(|| error_band(&average, options.band_spread));
    let members = if options.show_all_members {
        ensemble.members().to_vec()
    } else {
        Vec::new()
    };

    Ok(EnsembleSummary {
        label: ensemble.label().to_string(),
        pattern: ensemble.pattern().to_string(),
        stats: *ensemble.stats(),
        parameter_count: ensemble.count(),
        average,
        envelope,
        error_band,
        range_band,
        members,
    })
}

/// Build and summarize the two sides of a comparison.
///
/// With more than one worker the sides are built concurrently and split the
/// worker budget between them, the first side taking the odd one. If both
/// sides are empty the first one is reported.
pub fn compare(
    reader: &dyn DiagnosticReader,
    pattern1: &str,
    label1: &str,
    pattern2: &str,
    label2: &str,
    options: &CompareOptions,
) -> Result<ComparisonResult> {
    let workers = options.effective_workers();
    let (first, second) = if workers > 1 {
        let (first_options, second_options) = split_workers(options, workers);
        let (first, second) = thread::scope(|s| {
            let second = s.spawn(|| build_ensemble(reader, pattern2, label2, &second_options));
            let first = build_ensemble(reader, pattern1, label1, &first_options);
            let second = second.join().unwrap_or_else(|p| std::panic::resume_unwind(p));
            (first, second)
        });
        (first?, second?)
    } else {
        let first = build_ensemble(reader, pattern1, label1, options)?;
        (first, build_ensemble(reader, pattern2, label2, options)?)
    };

    Ok(ComparisonResult {
        first: summarize(&first, options)?,
        second: summarize(&second, options)?,
    })
}

fn split_workers(options: &CompareOptions, workers: usize) -> (CompareOptions, CompareOptions) {
    let second = workers / 2;
    (
        CompareOptions {
            workers: workers - second,
            ..options.clone()
        },
        CompareOptions {
            workers: second,
            ..options.clone()
        },
    )
}

/// Summary of a single pattern, for the one-ensemble average figure.
pub fn average_pattern(
    reader: &dyn DiagnosticReader,
    pattern: &str,
    label: &str,
    options: &CompareOptions,
) -> Result<EnsembleSummary> {
    let ensemble = build_ensemble(reader, pattern, label, options)?;
    summarize(&ensemble, options)
}

/// Filter verdict for every histogram in one file, in name order.
pub fn inspect_file(
    reader: &dyn DiagnosticReader,
    path: &Path,
    options: &CompareOptions,
) -> Result<Vec<(String, Option<Rejection>)>> {
    let file = load(reader, path, &options.container)?;
    Ok(file
        .histograms
        .iter()
        .map(|(name, hist)| (name.clone(), options.filter.check(hist)))
        .collect())
}
