//! Output renderers. They lay out an already computed result and never
//! aggregate or modify it.

pub mod json;
pub mod svg;

use std::path::Path;

use mcmcdiag_core::{ComparisonResult, EnsembleSummary};

use crate::error::CliError;

/// RGB color, alpha applied per use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const AZURE: Color = Color::rgb(51, 102, 204);
    pub const ORANGE: Color = Color::rgb(255, 102, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Display options handed to a renderer alongside the result.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    /// First and second side, in that order.
    pub colors: [Color; 2],
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            title: "Average Autocorrelation".to_string(),
            x_label: "Lag".to_string(),
            y_label: "Autocorrelation".to_string(),
            width: 1200,
            height: 600,
            colors: [Color::AZURE, Color::ORANGE],
        }
    }
}

impl RenderStyle {
    pub fn color_for(&self, side: usize) -> Color {
        self.colors[side % self.colors.len()]
    }
}

/// Writes one figure (or document) to `path`.
pub trait Renderer {
    /// Render any number of ensemble summaries into one output.
    fn render_summaries(
        &self,
        sides: &[&EnsembleSummary],
        style: &RenderStyle,
        path: &Path,
    ) -> Result<(), CliError>;

    /// Render both sides of a comparison.
    fn render(
        &self,
        result: &ComparisonResult,
        style: &RenderStyle,
        path: &Path,
    ) -> Result<(), CliError> {
        self.render_summaries(&result.sides(), style, path)
    }
}

/// Pick a renderer from the output file extension.
pub fn renderer_for(path: &Path) -> Result<Box<dyn Renderer>, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("svg") => Ok(Box::new(svg::SvgRenderer)),
        Some("json") => Ok(Box::new(json::JsonRenderer)),
        _ => Err(CliError::UnsupportedOutput(path.display().to_string())),
    }
}

/// Lowest and highest value that will be drawn, padded by 5% of the span.
///
/// Covers averages, whichever bands are present and any member curves.
pub fn value_range(sides: &[&EnsembleSummary]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut take = |v: f64| {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    };

    for side in sides {
        side.average.contents().iter().copied().for_each(&mut take);
        for band in [&side.range_band, &side.error_band].into_iter().flatten() {
            for i in 0..band.len() {
                take(band.lower(i));
                take(band.upper(i));
            }
        }
        for member in &side.members {
            member.histogram.contents().iter().copied().for_each(&mut take);
        }
    }

    if lo > hi {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        0.05 * span
    } else {
        0.05 * lo.abs().max(1.0)
    };
    (lo - pad, hi + pad)
}

/// Lowest and highest x edge over every side.
pub fn lag_range(sides: &[&EnsembleSummary]) -> (f64, f64) {
    let lo = sides
        .iter()
        .map(|s| s.average.min())
        .fold(f64::INFINITY, f64::min);
    let hi = sides
        .iter()
        .map(|s| s.average.max())
        .fold(f64::NEG_INFINITY, f64::max);
    if lo < hi { (lo, hi) } else { (0.0, 1.0) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mcmcdiag_core::{CompareOptions, Ensemble, Histogram, summarize};

    pub(crate) fn summary(
        label: &str,
        curves: &[Vec<f64>],
        options: &CompareOptions,
    ) -> EnsembleSummary {
        let mut ens = Ensemble::new(label, format!("{label}/*/diag.json"));
        for (i, c) in curves.iter().enumerate() {
            let h = Histogram::from_contents(0.0, c.len() as f64, c.clone()).unwrap();
            ens.add(Path::new("run/diag.json"), &format!("p{i}"), h).unwrap();
        }
        summarize(&ens, options).unwrap()
    }

    #[test]
    fn test_renderer_selection() {
        assert!(renderer_for(Path::new("out/plot.svg")).is_ok());
        assert!(renderer_for(Path::new("plot.JSON")).is_ok());
        match renderer_for(Path::new("plot.pdf")) {
            Err(CliError::UnsupportedOutput(p)) => assert_eq!(p, "plot.pdf"),
            _ => panic!("pdf output should be rejected"),
        }
        assert!(renderer_for(Path::new("plot")).is_err());
    }

    #[test]
    fn test_value_range_covers_envelope_with_padding() {
        let s = summary(
            "a",
            &[vec![1.0, 0.5, 0.0], vec![1.0, 0.3, -0.2]],
            &CompareOptions::default(),
        );
        let (lo, hi) = value_range(&[&s]);
        // envelope spans [-0.2, 1.0]
        assert!((lo - (-0.2 - 0.06)).abs() < 1e-12);
        assert!((hi - (1.0 + 0.06)).abs() < 1e-12);
    }

    #[test]
    fn test_value_range_flat_curve() {
        let s = summary("a", &[vec![0.5, 0.5]], &CompareOptions::default());
        let (lo, hi) = value_range(&[&s]);
        assert!(lo < 0.5 && hi > 0.5);
    }

    #[test]
    fn test_lag_range_unions_axes() {
        let opts = CompareOptions::default();
        let a = summary("a", &[vec![1.0; 10]], &opts);
        let b = summary("b", &[vec![1.0; 20]], &opts);
        assert_eq!(lag_range(&[&a, &b]), (0.0, 20.0));
    }
}
