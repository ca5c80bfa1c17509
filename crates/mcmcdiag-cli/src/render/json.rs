use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use mcmcdiag_core::EnsembleSummary;
use serde::Serialize;

use super::{RenderStyle, Renderer};
use crate::error::CliError;

/// Writes the summaries as pretty-printed JSON for plotting elsewhere.
pub struct JsonRenderer;

#[derive(Serialize)]
struct Document<'a> {
    generator: String,
    title: &'a str,
    x_label: &'a str,
    y_label: &'a str,
    sides: &'a [&'a EnsembleSummary],
}

impl Renderer for JsonRenderer {
    fn render_summaries(
        &self,
        sides: &[&EnsembleSummary],
        style: &RenderStyle,
        path: &Path,
    ) -> Result<(), CliError> {
        let doc = Document {
            generator: format!("mcmcdiag {}", mcmcdiag_core::VERSION),
            title: &style.title,
            x_label: &style.x_label,
            y_label: &style.y_label,
            sides,
        };
        let write_error = |source| CliError::Write {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(write_error)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &doc).map_err(|e| write_error(e.into()))?;
        out.write_all(b"\n").map_err(write_error)?;
        out.flush().map_err(write_error)
    }
}
