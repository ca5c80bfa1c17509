//! Fixed-binning 1D histogram used for per-parameter autocorrelation curves.
//!
//! Bins are numbered the usual way for analysis histograms: bin `0` is the
//! underflow, bins `1..=nbins` cover `[min, max)`, and bin `nbins + 1` is the
//! overflow. Flow bins travel with the histogram but are never aggregated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};

/// Relative tolerance used when comparing axis edges.
const EDGE_TOLERANCE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// Uniform bin geometry: `nbins` equal-width bins over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinAxis {
    pub nbins: usize,
    pub min: f64,
    pub max: f64,
}

impl BinAxis {
    /// Validated constructor.
    pub fn new(nbins: usize, min: f64, max: f64) -> Result<Self> {
        if nbins == 0 {
            return Err(DiagError::InvalidHistogram("nbins must be at least 1".into()));
        }
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(DiagError::InvalidHistogram(format!(
                "axis range [{min}, {max}) is not a finite, increasing interval"
            )));
        }
        Ok(Self { nbins, min, max })
    }

    /// Width of every bin.
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.nbins as f64
    }

    /// Center of `bin` (1-based; flow bins extrapolate).
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 0.5) * self.bin_width()
    }

    /// Same bin count and the same edges within a relative tolerance.
    pub fn is_compatible(&self, other: &BinAxis) -> bool {
        self.nbins == other.nbins
            && edges_equal(self.min, other.min)
            && edges_equal(self.max, other.max)
    }
}

impl fmt::Display for BinAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bins [{}, {})", self.nbins, self.min, self.max)
    }
}

fn edges_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= EDGE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// A 1D histogram with optional per-bin sum of squared weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramRecord", into = "HistogramRecord")]
pub struct Histogram {
    axis: BinAxis,
    /// `nbins + 2` entries, flow bins included.
    contents: Vec<f64>,
    /// Same layout as `contents` when bin errors are tracked.
    sumw2: Option<Vec<f64>>,
}

impl Histogram {
    /// Empty histogram with the given geometry.
    pub fn new(nbins: usize, min: f64, max: f64) -> Result<Self> {
        let axis = BinAxis::new(nbins, min, max)?;
        Ok(Self {
            axis,
            contents: vec![0.0; nbins + 2],
            sumw2: None,
        })
    }

    /// Histogram over `[min, max)` whose in-range bins are `contents`.
    pub fn from_contents(min: f64, max: f64, contents: Vec<f64>) -> Result<Self> {
        let axis = BinAxis::new(contents.len(), min, max)?;
        let mut all = Vec::with_capacity(contents.len() + 2);
        all.push(0.0);
        all.extend(contents);
        all.push(0.0);
        Ok(Self {
            axis,
            contents: all,
            sumw2: None,
        })
    }

    /// Attach per-bin errors (one per in-range bin), stored as squared weights.
    pub fn with_errors(mut self, errors: Vec<f64>) -> Result<Self> {
        if errors.len() != self.axis.nbins {
            return Err(DiagError::InvalidHistogram(format!(
                "{} errors supplied for {} bins",
                errors.len(),
                self.axis.nbins
            )));
        }
        let mut sumw2 = Vec::with_capacity(errors.len() + 2);
        sumw2.push(0.0);
        sumw2.extend(errors.iter().map(|e| e * e));
        sumw2.push(0.0);
        self.sumw2 = Some(sumw2);
        Ok(self)
    }

    pub fn axis(&self) -> &BinAxis {
        &self.axis
    }

    pub fn nbins(&self) -> usize {
        self.axis.nbins
    }

    pub fn min(&self) -> f64 {
        self.axis.min
    }

    pub fn max(&self) -> f64 {
        self.axis.max
    }

    pub fn bin_width(&self) -> f64 {
        self.axis.bin_width()
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.axis.bin_center(bin)
    }

    /// Content of `bin`; bins past the overflow read as zero.
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    /// Set the content of `bin`. Bins past the overflow are ignored.
    pub fn set_bin_content(&mut self, bin: usize, value: f64) {
        if let Some(slot) = self.contents.get_mut(bin) {
            *slot = value;
        }
    }

    /// Error of `bin`. Without stored errors every entry counts as unit
    /// weight, so the error is `sqrt(|content|)`.
    pub fn bin_error(&self, bin: usize) -> f64 {
        match &self.sumw2 {
            Some(w) => w.get(bin).map(|w2| w2.sqrt()).unwrap_or(0.0),
            None => self.bin_content(bin).abs().sqrt(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.sumw2.is_some()
    }

    /// Store the implicit unit-weight errors explicitly, if none are stored.
    pub fn with_implicit_errors(mut self) -> Self {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.implicit_sumw2());
        }
        self
    }

    fn implicit_sumw2(&self) -> Vec<f64> {
        self.contents.iter().map(|c| c.abs()).collect()
    }

    /// In-range bin contents (bins `1..=nbins`).
    pub fn contents(&self) -> &[f64] {
        &self.contents[1..=self.axis.nbins]
    }

    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }

    pub fn overflow(&self) -> f64 {
        self.contents[self.axis.nbins + 1]
    }

    /// Largest in-range bin content.
    pub fn maximum(&self) -> f64 {
        self.contents()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest in-range bin content.
    pub fn minimum(&self) -> f64 {
        self.contents().iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn is_compatible(&self, other: &Histogram) -> bool {
        self.axis.is_compatible(&other.axis)
    }

    /// Add `other` bin by bin over the in-range bins.
    ///
    /// Geometry is checked before anything is touched, so a failed call leaves
    /// `self` unchanged. Squared weights are summed when either side carries
    /// them; a side without them contributes `|content|` per bin.
    pub fn accumulate(&mut self, other: &Histogram) -> Result<()> {
        if !self.is_compatible(other) {
            return Err(DiagError::IncompatibleHistogram {
                name: String::new(),
                expected: self.axis,
                found: other.axis,
            });
        }
        let n = self.axis.nbins;
        if self.sumw2.is_some() || other.sumw2.is_some() {
            let mut mine = match self.sumw2.take() {
                Some(w) => w,
                None => self.implicit_sumw2(),
            };
            let implicit;
            let theirs = match &other.sumw2 {
                Some(w) => w,
                None => {
                    implicit = other.implicit_sumw2();
                    &implicit
                }
            };
            for (dst, src) in mine[1..=n].iter_mut().zip(&theirs[1..=n]) {
                *dst += src;
            }
            self.sumw2 = Some(mine);
        }
        for (dst, src) in self.contents[1..=n].iter_mut().zip(&other.contents[1..=n]) {
            *dst += src;
        }
        Ok(())
    }

    /// Copy with every bin multiplied by `factor` (errors scale linearly).
    pub fn scaled(&self, factor: f64) -> Histogram {
        Histogram {
            axis: self.axis,
            contents: self.contents.iter().map(|c| c * factor).collect(),
            sumw2: self
                .sumw2
                .as_ref()
                .map(|w| w.iter().map(|w2| w2 * factor * factor).collect()),
        }
    }

    /// `(bin center, content)` pairs over the in-range bins.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (1..=self.axis.nbins).map(move |bin| (self.bin_center(bin), self.contents[bin]))
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// On-disk shape of a histogram: in-range contents only, flows optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistogramRecord {
    nbins: usize,
    min: f64,
    max: f64,
    contents: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<f64>>,
    #[serde(default)]
    underflow: f64,
    #[serde(default)]
    overflow: f64,
}

impl TryFrom<HistogramRecord> for Histogram {
    type Error = DiagError;

    fn try_from(record: HistogramRecord) -> Result<Self> {
        if record.contents.len() != record.nbins {
            return Err(DiagError::InvalidHistogram(format!(
                "nbins is {} but {} contents were given",
                record.nbins,
                record.contents.len()
            )));
        }
        let mut hist = Histogram::from_contents(record.min, record.max, record.contents)?;
        hist.contents[0] = record.underflow;
        hist.contents[record.nbins + 1] = record.overflow;
        match record.errors {
            Some(errors) => hist.with_errors(errors),
            None => Ok(hist),
        }
    }
}

impl From<Histogram> for HistogramRecord {
    fn from(hist: Histogram) -> Self {
        let n = hist.axis.nbins;
        let errors = hist
            .sumw2
            .as_ref()
            .map(|w| w[1..=n].iter().map(|w2| w2.sqrt()).collect());
        HistogramRecord {
            nbins: n,
            min: hist.axis.min,
            max: hist.axis.max,
            underflow: hist.contents[0],
            overflow: hist.contents[n + 1],
            contents: hist.contents[1..=n].to_vec(),
            errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Histogram {
        Histogram::from_contents(0.0, n as f64, (0..n).map(|i| i as f64).collect()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_new_rejects_zero_bins() {
        assert!(Histogram::new(0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        assert!(Histogram::new(10, 1.0, 0.0).is_err());
        assert!(Histogram::new(10, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_from_contents_layout() {
        let h = ramp(4);
        assert_eq!(h.nbins(), 4);
        assert_eq!(h.contents(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(h.bin_content(0), 0.0);
        assert_eq!(h.bin_content(1), 0.0);
        assert_eq!(h.bin_content(4), 3.0);
        assert_eq!(h.bin_content(5), 0.0);
        assert_eq!(h.bin_content(99), 0.0);
    }

    #[test]
    fn test_bin_centers() {
        let h = Histogram::new(4, 0.0, 2.0).unwrap();
        assert!((h.bin_width() - 0.5).abs() < 1e-12);
        assert!((h.bin_center(1) - 0.25).abs() < 1e-12);
        assert!((h.bin_center(4) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_with_errors_length_checked() {
        let h = ramp(3);
        assert!(h.clone().with_errors(vec![0.1, 0.2]).is_err());
        let h = h.with_errors(vec![0.1, 0.2, 0.3]).unwrap();
        assert!((h.bin_error(2) - 0.2).abs() < 1e-12);
        assert_eq!(h.bin_error(0), 0.0);
    }

    // -----------------------------------------------------------------------
    // Extremes
    // -----------------------------------------------------------------------

    #[test]
    fn test_maximum_ignores_flow_bins() {
        let mut h = ramp(3);
        h.set_bin_content(0, 100.0);
        h.set_bin_content(4, 200.0);
        assert_eq!(h.maximum(), 2.0);
        assert_eq!(h.minimum(), 0.0);
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn test_accumulate_sums_in_range_bins_only() {
        let mut a = ramp(3);
        let mut b = ramp(3);
        b.set_bin_content(0, 5.0);
        b.set_bin_content(4, 7.0);
        a.accumulate(&b).unwrap();
        assert_eq!(a.contents(), &[0.0, 2.0, 4.0]);
        assert_eq!(a.underflow(), 0.0);
        assert_eq!(a.overflow(), 0.0);
    }

    #[test]
    fn test_accumulate_incompatible_leaves_target_untouched() {
        let mut a = ramp(3);
        let before = a.clone();
        let b = ramp(4);
        let err = a.accumulate(&b).unwrap_err();
        assert!(matches!(err, DiagError::IncompatibleHistogram { .. }));
        assert_eq!(a, before);
    }

    #[test]
    fn test_accumulate_rejects_shifted_range() {
        let mut a = Histogram::new(3, 0.0, 3.0).unwrap();
        let b = Histogram::new(3, 0.5, 3.5).unwrap();
        assert!(a.accumulate(&b).is_err());
    }

    #[test]
    fn test_accumulate_errors_in_quadrature() {
        let mut a = ramp(2).with_errors(vec![3.0, 0.0]).unwrap();
        let b = ramp(2).with_errors(vec![4.0, 0.0]).unwrap();
        a.accumulate(&b).unwrap();
        assert!((a.bin_error(1) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_accumulate_side_without_errors_counts_unit_weights() {
        // ramp(2) is [0, 1]
        let mut a = ramp(2).with_errors(vec![1.0, 1.0]).unwrap();
        a.accumulate(&ramp(2)).unwrap();
        assert!(a.has_errors());
        assert_eq!(a.bin_error(1), 1.0);
        assert_eq!(a.bin_error(2), 2.0_f64.sqrt());

        let mut b = ramp(2);
        b.accumulate(&ramp(2).with_errors(vec![2.0, 2.0]).unwrap()).unwrap();
        assert_eq!(b.bin_error(1), 2.0);
        assert_eq!(b.bin_error(2), 5.0_f64.sqrt());
    }

    #[test]
    fn test_implicit_errors_from_contents() {
        let h = Histogram::from_contents(0.0, 3.0, vec![4.0, -0.25, 0.0]).unwrap();
        assert!(!h.has_errors());
        assert_eq!(h.bin_error(1), 2.0);
        assert_eq!(h.bin_error(2), 0.5);
        assert_eq!(h.bin_error(3), 0.0);

        let explicit = h.clone().with_implicit_errors();
        assert!(explicit.has_errors());
        for bin in 1..=3 {
            assert_eq!(explicit.bin_error(bin), h.bin_error(bin));
        }
        // averaging n unit-weight histograms leaves sqrt(|sum|) / n
        let avg = explicit.scaled(0.5);
        assert_eq!(avg.bin_error(1), 1.0);
    }

    #[test]
    fn test_scaled() {
        let h = ramp(3).with_errors(vec![2.0, 2.0, 2.0]).unwrap();
        let s = h.scaled(0.5);
        assert_eq!(s.contents(), &[0.0, 0.5, 1.0]);
        assert!((s.bin_error(1) - 1.0).abs() < 1e-12);
        // source untouched
        assert_eq!(h.contents(), &[0.0, 1.0, 2.0]);
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    #[test]
    fn test_deserialize_record() {
        let json = r#"{"nbins": 3, "min": 0.0, "max": 3.0, "contents": [1.0, 0.5, 0.25], "overflow": 9.0}"#;
        let h: Histogram = serde_json::from_str(json).unwrap();
        assert_eq!(h.nbins(), 3);
        assert_eq!(h.contents(), &[1.0, 0.5, 0.25]);
        assert_eq!(h.overflow(), 9.0);
        assert!(!h.has_errors());
    }

    #[test]
    fn test_deserialize_rejects_length_mismatch() {
        let json = r#"{"nbins": 4, "min": 0.0, "max": 3.0, "contents": [1.0, 0.5, 0.25]}"#;
        assert!(serde_json::from_str::<Histogram>(json).is_err());
    }

    #[test]
    fn test_serialize_keeps_errors() {
        let h = ramp(2).with_errors(vec![0.5, 1.5]).unwrap();
        let value = serde_json::to_value(&h).unwrap();
        assert_eq!(value["nbins"], 2);
        assert_eq!(value["errors"][1], 1.5);
    }

    #[test]
    fn test_axis_display() {
        let axis = BinAxis::new(20, 0.0, 20.0).unwrap();
        assert_eq!(axis.to_string(), "20 bins [0, 20)");
    }
}
