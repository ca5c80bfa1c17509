pub mod average;
pub mod compare;
pub mod inspect;
pub mod resolve;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use mcmcdiag_core::{BandSpread, CompareOptions, EnsembleSummary, JsonReader};

use crate::error::CliError;

/// Options shared by every command that opens diagnostic files.
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// JSON options file; flags given here override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Container holding the autocorrelation histograms
    #[arg(long)]
    pub container: Option<String>,

    /// Allowed distance from 1.0 before a lag counts as decayed
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Decayed lags a histogram may have and still be rejected as flat
    #[arg(long)]
    pub max_failures: Option<usize>,

    /// Give up on any single file after this many seconds
    #[arg(long)]
    pub timeout_sec: Option<f64>,
}

/// Options for commands that aggregate and draw.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub load: LoadArgs,

    /// Fixed half-width of the error band instead of the average's bin errors
    #[arg(long)]
    pub band_width: Option<f64>,

    /// Threads used to load files
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Figure title
    #[arg(long)]
    pub title: Option<String>,
}

impl LoadArgs {
    /// Options file (or defaults) with these flags applied on top.
    pub fn options(&self) -> Result<CompareOptions, CliError> {
        let mut opts = match &self.config {
            Some(path) => CompareOptions::from_json_path(path)?,
            None => CompareOptions::default(),
        };
        if let Some(container) = &self.container {
            opts.container = container.clone();
        }
        if let Some(tolerance) = self.tolerance {
            opts.filter.tolerance = tolerance;
        }
        if let Some(max_failures) = self.max_failures {
            opts.filter.max_failures = max_failures;
        }
        if let Some(secs) = self.timeout_sec {
            opts.open_timeout_secs = Some(secs);
        }
        Ok(opts)
    }
}

impl RunArgs {
    pub fn options(&self) -> Result<CompareOptions, CliError> {
        let mut opts = self.load.options()?;
        if let Some(half_width) = self.band_width {
            opts.band_spread = BandSpread::Fixed { half_width };
        }
        if let Some(jobs) = self.jobs {
            opts.workers = jobs;
        }
        Ok(opts)
    }
}

/// JSON reader honoring the configured open timeout.
pub fn make_reader(opts: &CompareOptions) -> JsonReader {
    match opts.open_timeout() {
        Some(limit) => JsonReader::with_timeout(limit),
        None => JsonReader::new(),
    }
}

/// One-paragraph text summary of an ensemble.
pub fn print_summary(summary: &EnsembleSummary) {
    let stats = &summary.stats;
    println!("{}", summary.label);
    println!("  pattern:     {}", summary.pattern);
    println!(
        "  files:       {} matched, {} loaded, {} failed",
        stats.files_matched, stats.files_loaded, stats.files_failed
    );
    println!(
        "  histograms:  {} used, {} rejected, {} incompatible",
        summary.parameter_count, stats.histograms_rejected, stats.histograms_incompatible
    );
    println!("  binning:     {}", summary.average.axis());
    if let Some(env) = &summary.envelope {
        let widest = env
            .lower
            .iter()
            .zip(&env.upper)
            .map(|(lo, hi)| hi - lo)
            .fold(0.0_f64, f64::max);
        println!("  max spread:  {widest:.4}");
    }
}

pub fn timeout_display(opts: &CompareOptions) -> String {
    opts.open_timeout()
        .map(|d: Duration| format!("{:.1}s", d.as_secs_f64()))
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("opts.json");
        std::fs::write(
            &path,
            r#"{"workers": 2, "container": "AC", "filter": {"tolerance": 0.01}}"#,
        )
        .unwrap();

        let args = RunArgs {
            load: LoadArgs {
                config: Some(path),
                max_failures: Some(7),
                ..Default::default()
            },
            jobs: Some(6),
            band_width: Some(0.05),
            ..Default::default()
        };
        let opts = args.options().unwrap();
        assert_eq!(opts.workers, 6);
        assert_eq!(opts.container, "AC");
        assert_eq!(opts.filter.tolerance, 0.01);
        assert_eq!(opts.filter.max_failures, 7);
        assert_eq!(opts.band_spread, BandSpread::Fixed { half_width: 0.05 });
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = LoadArgs {
            config: Some(PathBuf::from("/nonexistent/mcmcdiag.json")),
            ..Default::default()
        };
        assert!(matches!(args.options(), Err(CliError::Diag(_))));
    }

    #[test]
    fn test_make_reader_timeout() {
        let opts = CompareOptions {
            open_timeout_secs: Some(3.0),
            ..Default::default()
        };
        assert_eq!(make_reader(&opts).timeout(), Some(Duration::from_secs(3)));
        assert_eq!(timeout_display(&opts), "3.0s");
        assert!(make_reader(&CompareOptions::default()).timeout().is_none());
    }

    #[test]
    fn test_huge_timeout_flag_does_not_panic() {
        let args = LoadArgs {
            timeout_sec: Some(1e20),
            ..Default::default()
        };
        let opts = args.options().unwrap();
        assert_eq!(make_reader(&opts).timeout(), Some(Duration::MAX));
    }
}
