//! Per-bin min/max envelopes and shaded bands around an average.

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};
use crate::histogram::{BinAxis, Histogram};

/// Per-bin extremes over a collection of compatible histograms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub axis: BinAxis,
    /// One entry per in-range bin.
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Envelope {
    /// Compute the envelope of `histograms`.
    ///
    /// Fails with [`DiagError::EmptyCollection`] when there is nothing to
    /// bound and with [`DiagError::IncompatibleHistogram`] when geometries
    /// differ.
    pub fn from_histograms<'a, I>(histograms: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Histogram>,
    {
        let mut iter = histograms.into_iter();
        let first = iter.next().ok_or(DiagError::EmptyCollection)?;
        let mut env = Self::of(first);

        for (index, hist) in iter.enumerate() {
            if !hist.axis().is_compatible(&env.axis) {
                return Err(DiagError::IncompatibleHistogram {
                    name: format!("envelope member {}", index + 1),
                    expected: env.axis,
                    found: *hist.axis(),
                });
            }
            env.widen(hist.contents(), hist.contents());
        }

        Ok(env)
    }

    /// Degenerate envelope of one histogram.
    pub fn of(hist: &Histogram) -> Self {
        Self {
            axis: *hist.axis(),
            lower: hist.contents().to_vec(),
            upper: hist.contents().to_vec(),
        }
    }

    /// Widen in place to cover `other`. Geometry is the caller's to check.
    pub(crate) fn absorb(&mut self, other: &Envelope) {
        self.widen(&other.lower, &other.upper);
    }

    pub(crate) fn widen(&mut self, lower: &[f64], upper: &[f64]) {
        for (lo, &v) in self.lower.iter_mut().zip(lower) {
            *lo = lo.min(v);
        }
        for (hi, &v) in self.upper.iter_mut().zip(upper) {
            *hi = hi.max(v);
        }
    }

    /// Pull every in-range bin of `hist` into `[lower, upper]`.
    pub(crate) fn clamp(&self, hist: &mut Histogram) {
        for (i, (&lo, &hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            let bin = i + 1;
            hist.set_bin_content(bin, hist.bin_content(bin).max(lo).min(hi));
        }
    }

    pub fn nbins(&self) -> usize {
        self.lower.len()
    }

    /// True if every in-range bin of `hist` lies within the envelope.
    pub fn contains(&self, hist: &Histogram) -> bool {
        hist.axis().is_compatible(&self.axis)
            && hist
                .contents()
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&lo, &hi))| lo <= v && v <= hi)
    }

    /// The envelope as a band: midpoint center, half the range as width.
    pub fn range_band(&self) -> Band {
        let x = bin_centers(&self.axis);
        let (center, half_width) = self
            .lower
            .iter()
            .zip(&self.upper)
            .map(|(&lo, &hi)| (0.5 * (lo + hi), 0.5 * (hi - lo)))
            .unzip();
        Band {
            x,
            center,
            half_width,
        }
    }
}

/// A symmetric shaded region, one entry per in-range bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub x: Vec<f64>,
    pub center: Vec<f64>,
    pub half_width: Vec<f64>,
}

impl Band {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn lower(&self, i: usize) -> f64 {
        self.center[i] - self.half_width[i]
    }

    pub fn upper(&self, i: usize) -> f64 {
        self.center[i] + self.half_width[i]
    }
}

/// How wide the error band drawn around an average is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandSpread {
    /// The average's own bin errors (unit-weight `sqrt(|content|)` where
    /// none are stored).
    #[default]
    BinErrors,
    /// The same half-width in every bin.
    Fixed { half_width: f64 },
}

/// Band centered on `average`.
///
/// This is a display convention for the shaded region around the average
/// curve, not a confidence interval.
pub fn error_band(average: &Histogram, spread: BandSpread) -> Band {
    let nbins = average.nbins();
    let half_width = match spread {
        BandSpread::BinErrors => (1..=nbins).map(|bin| average.bin_error(bin)).collect(),
        BandSpread::Fixed { half_width } => vec![half_width.abs(); nbins],
    };
    Band {
        x: bin_centers(average.axis()),
        center: average.contents().to_vec(),
        half_width,
    }
}

fn bin_centers(axis: &BinAxis) -> Vec<f64> {
    (1..=axis.nbins).map(|bin| axis.bin_center(bin)).collect()
}
