use std::path::Path;

use log::info;
use mcmcdiag_core::average_pattern;

use super::{RunArgs, make_reader, print_summary};
use crate::error::CliError;
use crate::render::{RenderStyle, renderer_for};

pub struct AverageCommandConfig<'a> {
    pub pattern: &'a str,
    pub label: &'a str,
    pub output: Option<&'a Path>,
    pub all_members: bool,
    pub no_min_max: bool,
    pub no_errors: bool,
    pub args: &'a RunArgs,
}

pub fn run(cfg: AverageCommandConfig<'_>) -> Result<(), CliError> {
    let renderer = cfg.output.map(renderer_for).transpose()?;

    let mut opts = cfg.args.options()?;
    opts.show_all_members |= cfg.all_members;
    opts.show_min_max &= !cfg.no_min_max;
    opts.draw_error_bands &= !cfg.no_errors;

    let summary = average_pattern(&make_reader(&opts), cfg.pattern, cfg.label, &opts)?;
    print_summary(&summary);

    if let (Some(renderer), Some(path)) = (renderer, cfg.output) {
        let style = RenderStyle {
            title: cfg
                .args
                .title
                .clone()
                .unwrap_or_else(|| format!("{} Average Autocorrelation", cfg.label)),
            ..Default::default()
        };
        renderer.render_summaries(&[&summary], &style, path)?;
        info!("wrote {}", path.display());
        println!("Wrote {}", path.display());
    }
    Ok(())
}
