//! Running aggregation of same-shape histograms into an ensemble average.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{DiagError, Result};
use crate::histogram::{BinAxis, Histogram};

/// One histogram that entered the ensemble, with its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub source: PathBuf,
    pub name: String,
    pub histogram: Histogram,
}

/// Bookkeeping for diagnostics and error messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnsembleStats {
    pub files_matched: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub histograms_rejected: usize,
    pub histograms_incompatible: usize,
    pub entries_skipped: usize,
}

impl EnsembleStats {
    /// Add every counter of `other` to this one.
    pub fn absorb(&mut self, other: &EnsembleStats) {
        self.files_matched += other.files_matched;
        self.files_loaded += other.files_loaded;
        self.files_failed += other.files_failed;
        self.histograms_rejected += other.histograms_rejected;
        self.histograms_incompatible += other.histograms_incompatible;
        self.entries_skipped += other.entries_skipped;
    }
}

/// All usable histograms for one label, plus their running sum and per-bin
/// bounds.
///
/// The sum is kept unscaled; [`Ensemble::average`] divides on every call, so
/// asking for the average twice never scales twice. The sum carries
/// unit-weight errors for members that store none.
#[derive(Debug, Clone)]
pub struct Ensemble {
    label: String,
    pattern: String,
    sum: Option<Histogram>,
    bounds: Option<Envelope>,
    count: usize,
    members: Vec<Member>,
    stats: EnsembleStats,
}

impl Ensemble {
    pub fn new(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            sum: None,
            bounds: None,
            count: 0,
            members: Vec::new(),
            stats: EnsembleStats::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of histograms contributed.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.members.iter().map(|m| &m.histogram)
    }

    pub fn stats(&self) -> &EnsembleStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut EnsembleStats {
        &mut self.stats
    }

    /// Add one histogram.
    ///
    /// Fails with [`DiagError::IncompatibleHistogram`] if its geometry differs
    /// from what the ensemble already holds; nothing is modified in that case.
    pub fn add(&mut self, source: &Path, name: &str, hist: Histogram) -> Result<()> {
        match &mut self.sum {
            Some(sum) => sum.accumulate(&hist).map_err(|e| rename(e, source, name))?,
            None => self.sum = Some(hist.clone().with_implicit_errors()),
        }
        match &mut self.bounds {
            Some(bounds) => bounds.widen(hist.contents(), hist.contents()),
            None => self.bounds = Some(Envelope::of(&hist)),
        }
        self.count += 1;
        self.members.push(Member {
            source: source.to_path_buf(),
            name: name.to_string(),
            histogram: hist,
        });
        Ok(())
    }

    /// Fold a partial ensemble built elsewhere into this one.
    ///
    /// Geometry is checked before anything is modified.
    pub fn merge(&mut self, other: Ensemble) -> Result<()> {
        if let (Some(mine), Some(theirs)) = (self.axis(), other.axis()) {
            if !mine.is_compatible(theirs) {
                return Err(DiagError::IncompatibleHistogram {
                    name: format!("partial ensemble '{}'", other.label),
                    expected: *mine,
                    found: *theirs,
                });
            }
        }
        match (&mut self.sum, other.sum) {
            (Some(mine), Some(theirs)) => mine.accumulate(&theirs)?,
            (None, theirs) => self.sum = theirs,
            (Some(_), None) => {}
        }
        match (&mut self.bounds, other.bounds) {
            (Some(mine), Some(theirs)) => mine.absorb(&theirs),
            (None, theirs) => self.bounds = theirs,
            (Some(_), None) => {}
        }
        self.count += other.count;
        self.members.extend(other.members);
        self.stats.absorb(&other.stats);
        Ok(())
    }

    /// Geometry fixed by the first histogram added.
    pub fn axis(&self) -> Option<&BinAxis> {
        self.sum.as_ref().map(Histogram::axis)
    }

    /// True if `other` could be merged without a geometry conflict.
    pub fn can_merge(&self, other: &Ensemble) -> bool {
        match (self.axis(), other.axis()) {
            (Some(mine), Some(theirs)) => mine.is_compatible(theirs),
            _ => true,
        }
    }

    /// Give up the members and bookkeeping, dropping the running sum and bounds.
    pub fn into_parts(self) -> (Vec<Member>, EnsembleStats) {
        (self.members, self.stats)
    }

    /// Raw bin-wise sum of all members, if any.
    pub fn sum(&self) -> Option<&Histogram> {
        self.sum.as_ref()
    }

    /// Per-bin min/max over all members, if any.
    pub fn envelope(&self) -> Option<&Envelope> {
        self.bounds.as_ref()
    }

    /// Element-wise mean of all members.
    ///
    /// Each bin is held inside the members' min/max for that bin, so rounding
    /// in the division never lands the mean outside the envelope.
    pub fn average(&self) -> Result<Histogram> {
        match (&self.sum, &self.bounds) {
            (Some(sum), Some(bounds)) if self.count > 0 => {
                let mut avg = sum.scaled(1.0 / self.count as f64);
                bounds.clamp(&mut avg);
                Ok(avg)
            }
            _ => Err(self.empty_error()),
        }
    }

    /// The error reported when this ensemble has nothing to average.
    pub fn empty_error(&self) -> DiagError {
        DiagError::EmptyEnsemble {
            label: self.label.clone(),
            pattern: self.pattern.clone(),
            files_matched: self.stats.files_matched,
            files_loaded: self.stats.files_loaded,
        }
    }
}

fn rename(err: DiagError, source: &Path, name: &str) -> DiagError {
    match err {
        DiagError::IncompatibleHistogram {
            expected, found, ..
        } => DiagError::IncompatibleHistogram {
            name: format!("{}:{name}", source.display()),
            expected,
            found,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(n: usize, value: f64) -> Histogram {
        Histogram::from_contents(0.0, n as f64, vec![value; n]).unwrap()
    }

    fn src() -> &'static Path {
        Path::new("run/diag.json")
    }

    // -----------------------------------------------------------------------
    // Averaging
    // -----------------------------------------------------------------------

    #[test]
    fn test_identical_histograms_average_to_themselves() {
        let mut ens = Ensemble::new("a", "p");
        for i in 0..7 {
            ens.add(src(), &format!("p{i}"), flat(20, 0.37)).unwrap();
        }
        assert_eq!(ens.count(), 7);
        assert_eq!(ens.average().unwrap().contents(), &[0.37; 20]);
    }

    #[test]
    fn test_identical_histograms_average_exactly_for_any_count() {
        for &c in &[0.1, 0.3, 0.37, 0.7, 0.9, 1.0 / 3.0, -0.2] {
            for n in 2..40 {
                let mut ens = Ensemble::new("a", "p");
                for i in 0..n {
                    ens.add(src(), &i.to_string(), flat(3, c)).unwrap();
                }
                let avg = ens.average().unwrap();
                assert_eq!(avg.contents(), &[c; 3], "c={c}, n={n}");
                assert!(ens.envelope().unwrap().contains(&avg));
            }
        }
    }

    #[test]
    fn test_envelope_tracks_members() {
        let mut ens = Ensemble::new("a", "p");
        assert!(ens.envelope().is_none());
        ens.add(src(), "x", Histogram::from_contents(0.0, 2.0, vec![1.0, 0.2]).unwrap())
            .unwrap();
        ens.add(src(), "y", Histogram::from_contents(0.0, 2.0, vec![0.8, 0.4]).unwrap())
            .unwrap();
        let env = ens.envelope().unwrap();
        assert_eq!(env.lower, vec![0.8, 0.2]);
        assert_eq!(env.upper, vec![1.0, 0.4]);
    }

    #[test]
    fn test_average_is_mean() {
        let mut ens = Ensemble::new("a", "p");
        ens.add(src(), "x", Histogram::from_contents(0.0, 2.0, vec![1.0, 0.0]).unwrap())
            .unwrap();
        ens.add(src(), "y", Histogram::from_contents(0.0, 2.0, vec![0.0, 3.0]).unwrap())
            .unwrap();
        assert_eq!(ens.average().unwrap().contents(), &[0.5, 1.5]);
    }

    #[test]
    fn test_average_twice_is_identical() {
        let mut ens = Ensemble::new("a", "p");
        ens.add(src(), "x", flat(5, 2.0)).unwrap();
        ens.add(src(), "y", flat(5, 4.0)).unwrap();
        let first = ens.average().unwrap();
        let second = ens.average().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.contents(), &[3.0; 5]);
        // the raw sum is untouched
        assert_eq!(ens.sum().unwrap().contents(), &[6.0; 5]);
    }

    #[test]
    fn test_first_add_copies() {
        let mut ens = Ensemble::new("a", "p");
        let h = flat(3, 1.5);
        ens.add(src(), "x", h.clone()).unwrap();
        assert_eq!(ens.sum().unwrap().contents(), h.contents());
        assert_eq!(ens.sum().unwrap(), &h.clone().with_implicit_errors());
        assert_eq!(ens.members()[0].histogram, h);
        assert_eq!(ens.members()[0].name, "x");
        assert_eq!(ens.members()[0].source, PathBuf::from("run/diag.json"));
    }

    // -----------------------------------------------------------------------
    // Failure modes
    // -----------------------------------------------------------------------

    #[test]
    fn test_empty_average_fails_with_label() {
        let ens = Ensemble::new("baseline", "fits/*/diag.json");
        match ens.average().unwrap_err() {
            DiagError::EmptyEnsemble { label, pattern, .. } => {
                assert_eq!(label, "baseline");
                assert_eq!(pattern, "fits/*/diag.json");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_incompatible_add_leaves_state_unchanged() {
        let mut ens = Ensemble::new("a", "p");
        ens.add(src(), "x", flat(20, 0.5)).unwrap();
        ens.add(src(), "y", flat(20, 0.7)).unwrap();
        let sum_before = ens.sum().unwrap().clone();

        let err = ens.add(src(), "z", flat(10, 0.1)).unwrap_err();
        match err {
            DiagError::IncompatibleHistogram { name, expected, found } => {
                assert!(name.ends_with(":z"));
                assert_eq!(expected.nbins, 20);
                assert_eq!(found.nbins, 10);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(ens.count(), 2);
        assert_eq!(ens.members().len(), 2);
        assert_eq!(ens.sum().unwrap(), &sum_before);
        assert_eq!(ens.envelope().unwrap().nbins(), 20);
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    #[test]
    fn test_merge_matches_sequential_adds() {
        let hists: Vec<Histogram> = (1..=6).map(|i| flat(4, i as f64)).collect();

        let mut sequential = Ensemble::new("a", "p");
        for (i, h) in hists.iter().enumerate() {
            sequential.add(src(), &i.to_string(), h.clone()).unwrap();
        }

        let mut left = Ensemble::new("a", "p");
        let mut right = Ensemble::new("a", "p");
        for (i, h) in hists.iter().enumerate() {
            let target = if i < 2 { &mut left } else { &mut right };
            target.add(src(), &i.to_string(), h.clone()).unwrap();
        }
        left.stats_mut().files_loaded = 1;
        right.stats_mut().files_loaded = 2;
        left.merge(right).unwrap();

        assert_eq!(left.count(), 6);
        assert_eq!(left.average().unwrap(), sequential.average().unwrap());
        assert_eq!(left.envelope(), sequential.envelope());
        assert_eq!(left.members(), sequential.members());
        assert_eq!(left.stats().files_loaded, 3);
    }

    #[test]
    fn test_merge_into_empty() {
        let mut empty = Ensemble::new("a", "p");
        let mut full = Ensemble::new("a", "p");
        full.add(src(), "x", flat(3, 1.0)).unwrap();
        empty.merge(full).unwrap();
        assert_eq!(empty.count(), 1);
        assert!(empty.average().is_ok());
    }

    #[test]
    fn test_merge_incompatible_rejected() {
        let mut a = Ensemble::new("a", "p");
        a.add(src(), "x", flat(3, 1.0)).unwrap();
        let mut b = Ensemble::new("a", "p");
        b.add(src(), "y", flat(4, 1.0)).unwrap();
        assert!(!a.can_merge(&b));
        assert!(a.merge(b).is_err());
        assert_eq!(a.count(), 1);
    }

    #[test]
    fn test_into_parts() {
        let mut ens = Ensemble::new("a", "p");
        ens.add(src(), "x", flat(3, 1.0)).unwrap();
        ens.stats_mut().files_loaded = 1;
        assert_eq!(ens.axis().map(|a| a.nbins), Some(3));
        let (members, stats) = ens.into_parts();
        assert_eq!(members.len(), 1);
        assert_eq!(stats.files_loaded, 1);
    }
}
