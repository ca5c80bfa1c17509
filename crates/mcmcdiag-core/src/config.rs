//! Options controlling a comparison run.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::envelope::BandSpread;
use crate::error::{DiagError, Result};
use crate::filter::FilterConfig;
use crate::loader::AUTOCORRELATION_CONTAINER;

/// Display and processing options for [`crate::compare`].
///
/// Every field has a default, so an options file only needs the keys it
/// changes:
///
/// ```json
/// {"show_all_members": true, "workers": 4, "filter": {"max_failures": 20}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Compute the min/max envelope and its shaded band.
    pub show_min_max: bool,
    /// Hand every contributing histogram to the renderer.
    pub show_all_members: bool,
    /// Compute the error band around each average.
    pub draw_error_bands: bool,
    /// Container holding the per-parameter histograms.
    pub container: String,
    pub filter: FilterConfig,
    pub band_spread: BandSpread,
    /// Threads used to load files. `1` loads sequentially. A comparison
    /// splits this budget between its two sides.
    pub workers: usize,
    /// Per-file open timeout in seconds.
    pub open_timeout_secs: Option<f64>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            show_min_max: true,
            show_all_members: false,
            draw_error_bands: true,
            container: AUTOCORRELATION_CONTAINER.to_string(),
            filter: FilterConfig::default(),
            band_spread: BandSpread::default(),
            workers: 1,
            open_timeout_secs: None,
        }
    }
}

impl CompareOptions {
    /// Load options from a JSON file.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let config_error = |reason: String| DiagError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let options: Self =
            serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
        if let Some(secs) = options.open_timeout_secs {
            if secs > 0.0 && Duration::try_from_secs_f64(secs).is_err() {
                return Err(config_error(format!(
                    "open_timeout_secs {secs} is out of range"
                )));
            }
        }
        Ok(options)
    }

    /// The open timeout, if a positive finite one is set. Values too large
    /// for a [`Duration`] saturate to [`Duration::MAX`].
    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout_secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| Duration::try_from_secs_f64(s).unwrap_or(Duration::MAX))
    }

    /// Worker count, never below one.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}
