//! Rejection of degenerate autocorrelation histograms.
//!
//! Two failure modes show up in real fits: parameters that were never
//! sampled (all bins zero) and chains stuck at a single value, whose
//! autocorrelation never decays and sits at one for every lag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

/// Allowed distance from 1.0 before a lag counts as decayed.
pub const DEFAULT_TOLERANCE: f64 = 0.001;
/// Decayed lags a histogram may have and still count as flat.
pub const DEFAULT_MAX_FAILURES: usize = 100;

/// Why a histogram was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Maximum bin content is not positive.
    NoSignal,
    /// At least one in-range bin is NaN or infinite.
    NonFinite,
    /// Autocorrelation stays at one across the lags.
    FlatAutocorrelation,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSignal => write!(f, "no signal"),
            Self::NonFinite => write!(f, "non-finite bins"),
            Self::FlatAutocorrelation => write!(f, "flat autocorrelation"),
        }
    }
}

/// Thresholds for the flat-autocorrelation check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub tolerance: f64,
    pub max_failures: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

impl FilterConfig {
    /// First reason to reject `hist`, or `None` if it is usable.
    pub fn check(&self, hist: &Histogram) -> Option<Rejection> {
        if hist.contents().iter().any(|c| !c.is_finite()) {
            return Some(Rejection::NonFinite);
        }
        if hist.maximum() <= 0.0 {
            return Some(Rejection::NoSignal);
        }
        if is_all_ones(hist, self.tolerance, self.max_failures) {
            return Some(Rejection::FlatAutocorrelation);
        }
        None
    }
}

/// True if `hist` should enter an ensemble.
pub fn is_usable(hist: &Histogram, config: &FilterConfig) -> bool {
    config.check(hist).is_none()
}

/// True unless more than `max_failures` lags deviate from one by more than
/// `tolerance`.
///
/// Bin 1 is lag zero, which is one by construction, so the scan starts at
/// bin 2. A histogram with a single bin is therefore always flat.
pub fn is_all_ones(hist: &Histogram, tolerance: f64, max_failures: usize) -> bool {
    let mut failures = 0usize;
    for bin in 2..=hist.nbins() {
        if (hist.bin_content(bin) - 1.0).abs() > tolerance {
            failures += 1;
            if failures > max_failures {
                return false;
            }
        }
    }
    true
}
