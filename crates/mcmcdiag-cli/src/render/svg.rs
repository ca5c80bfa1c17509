//! Minimal SVG figure: shaded bands, member curves and averages on one axes.

use std::fmt::Write as FmtWrite;
use std::path::Path;

use mcmcdiag_core::{Band, EnsembleSummary, Histogram};

use super::{Color, RenderStyle, Renderer, lag_range, value_range};
use crate::error::CliError;

const RANGE_ALPHA: f64 = 0.2;
const ERROR_ALPHA: f64 = 0.3;
const MEMBER_ALPHA: f64 = 0.1;
const TICKS: usize = 5;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;

/// Renders summaries as a single SVG figure.
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render_summaries(
        &self,
        sides: &[&EnsembleSummary],
        style: &RenderStyle,
        path: &Path,
    ) -> Result<(), CliError> {
        let svg = draw(sides, style);
        std::fs::write(path, svg).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Data → pixel mapping for the plot area.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        self.left + (x - self.x0) / (self.x1 - self.x0) * self.width
    }

    fn py(&self, y: f64) -> f64 {
        self.top + (1.0 - (y - self.y0) / (self.y1 - self.y0)) * self.height
    }
}

/// Build the SVG document. Writing into a `String` cannot fail.
pub fn draw(sides: &[&EnsembleSummary], style: &RenderStyle) -> String {
    let w = f64::from(style.width);
    let h = f64::from(style.height);
    let (x0, x1) = lag_range(sides);
    let (y0, y1) = value_range(sides);
    let frame = Frame {
        x0,
        x1,
        y0,
        y1,
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: (w - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
        height: (h - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
    );
    let _ = writeln!(out, r##"<rect width="{w}" height="{h}" fill="#ffffff"/>"##);
    let _ = writeln!(
        out,
        r#"<text class="title" x="{:.1}" y="30" font-size="18" text-anchor="middle">{}</text>"#,
        w / 2.0,
        escape(&style.title)
    );

    draw_axes(&mut out, &frame, style);

    for (i, side) in sides.iter().enumerate() {
        if let Some(band) = &side.range_band {
            draw_band(&mut out, &frame, band, style.color_for(i), RANGE_ALPHA, "range-band");
        }
    }
    for (i, side) in sides.iter().enumerate() {
        if let Some(band) = &side.error_band {
            draw_band(&mut out, &frame, band, style.color_for(i), ERROR_ALPHA, "error-band");
        }
    }
    for (i, side) in sides.iter().enumerate() {
        for member in &side.members {
            draw_curve(
                &mut out,
                &frame,
                &member.histogram,
                style.color_for(i),
                MEMBER_ALPHA,
                1.0,
                "member",
            );
        }
    }
    for (i, side) in sides.iter().enumerate() {
        draw_curve(&mut out, &frame, &side.average, style.color_for(i), 1.0, 2.0, "average");
    }

    draw_legend(&mut out, &frame, sides, style);
    out.push_str("</svg>\n");
    out
}

fn draw_axes(out: &mut String, f: &Frame, style: &RenderStyle) {
    let _ = writeln!(
        out,
        r##"<rect class="frame" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#000000"/>"##,
        f.left, f.top, f.width, f.height
    );
    let bottom = f.top + f.height;

    for i in 0..=TICKS {
        let t = i as f64 / TICKS as f64;

        let xv = f.x0 + t * (f.x1 - f.x0);
        let px = f.px(xv);
        let _ = writeln!(
            out,
            r##"<line x1="{px:.1}" y1="{bottom:.1}" x2="{px:.1}" y2="{:.1}" stroke="#000000"/>"##,
            bottom + 5.0
        );
        let _ = writeln!(
            out,
            r#"<text x="{px:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"#,
            bottom + 20.0,
            tick_label(xv, f.x1 - f.x0)
        );

        let yv = f.y0 + t * (f.y1 - f.y0);
        let py = f.py(yv);
        let _ = writeln!(
            out,
            r##"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#000000"/>"##,
            f.left - 5.0,
            f.left
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end">{}</text>"#,
            f.left - 8.0,
            py + 4.0,
            tick_label(yv, f.y1 - f.y0)
        );
    }

    let _ = writeln!(
        out,
        r#"<text class="x-label" x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">{}</text>"#,
        f.left + f.width / 2.0,
        bottom + 45.0,
        escape(&style.x_label)
    );
    let cy = f.top + f.height / 2.0;
    let _ = writeln!(
        out,
        r#"<text class="y-label" x="20" y="{cy:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 20 {cy:.1})">{}</text>"#,
        escape(&style.y_label)
    );
}

fn draw_band(out: &mut String, f: &Frame, band: &Band, color: Color, alpha: f64, class: &str) {
    if band.is_empty() {
        return;
    }
    let mut points = String::new();
    for i in 0..band.len() {
        let _ = write!(points, "{:.2},{:.2} ", f.px(band.x[i]), f.py(band.upper(i)));
    }
    for i in (0..band.len()).rev() {
        let _ = write!(points, "{:.2},{:.2} ", f.px(band.x[i]), f.py(band.lower(i)));
    }
    let _ = writeln!(
        out,
        r#"<polygon class="{class}" points="{}" fill="{}" fill-opacity="{alpha}" stroke="none"/>"#,
        points.trim_end(),
        color.hex()
    );
}

fn draw_curve(
    out: &mut String,
    f: &Frame,
    hist: &Histogram,
    color: Color,
    alpha: f64,
    width: f64,
    class: &str,
) {
    let points: Vec<String> = hist
        .points()
        .filter(|(_, y)| y.is_finite())
        .map(|(x, y)| format!("{:.2},{:.2}", f.px(x), f.py(y)))
        .collect();
    let _ = writeln!(
        out,
        r#"<polyline class="{class}" points="{}" fill="none" stroke="{}" stroke-opacity="{alpha}" stroke-width="{width}"/>"#,
        points.join(" "),
        color.hex()
    );
}

fn draw_legend(out: &mut String, f: &Frame, sides: &[&EnsembleSummary], style: &RenderStyle) {
    // swatch alpha for bands, none for the average line
    let mut entries: Vec<(String, Color, Option<f64>)> = Vec::new();
    for (i, side) in sides.iter().enumerate() {
        let color = style.color_for(i);
        entries.push((format!("{} Average", side.label), color, None));
        if side.error_band.is_some() {
            entries.push((format!("{} ±1σ", side.label), color, Some(ERROR_ALPHA)));
        }
        if side.range_band.is_some() {
            entries.push((format!("{} Full Range", side.label), color, Some(RANGE_ALPHA)));
        }
    }

    let row = 18.0;
    let box_w = 220.0;
    let x = f.left + f.width - box_w - 10.0;
    let y = f.top + 10.0;
    let _ = writeln!(
        out,
        r##"<rect class="legend" x="{x:.1}" y="{y:.1}" width="{box_w:.1}" height="{:.1}" fill="#ffffff" fill-opacity="0.8" stroke="#888888"/>"##,
        row * entries.len() as f64 + 8.0
    );
    for (k, (text, color, swatch)) in entries.iter().enumerate() {
        let cy = y + 4.0 + row * (k as f64 + 0.5);
        if let Some(alpha) = swatch {
            let _ = writeln!(
                out,
                r#"<rect class="legend-swatch" x="{:.1}" y="{:.1}" width="24" height="10" fill="{}" fill-opacity="{alpha}"/>"#,
                x + 8.0,
                cy - 5.0,
                color.hex()
            );
        } else {
            let _ = writeln!(
                out,
                r#"<line x1="{:.1}" y1="{cy:.1}" x2="{:.1}" y2="{cy:.1}" stroke="{}" stroke-width="2"/>"#,
                x + 8.0,
                x + 32.0,
                color.hex()
            );
        }
        let _ = writeln!(
            out,
            r#"<text class="legend-entry" x="{:.1}" y="{:.1}" font-size="12">{}</text>"#,
            x + 40.0,
            cy + 4.0,
            escape(text)
        );
    }
}

fn tick_label(v: f64, span: f64) -> String {
    if span >= 10.0 {
        format!("{v:.0}")
    } else if span >= 1.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
