use std::path::Path;

use log::{debug, info};
use mcmcdiag_core::compare;

use super::{RunArgs, make_reader, print_summary, timeout_display};
use crate::error::CliError;
use crate::render::{RenderStyle, renderer_for};

pub struct CompareCommandConfig<'a> {
    pub pattern1: &'a str,
    pub label1: &'a str,
    pub pattern2: &'a str,
    pub label2: &'a str,
    pub output: &'a Path,
    pub draw_min_max: Option<bool>,
    pub draw_all: Option<bool>,
    pub draw_errors: Option<bool>,
    pub args: &'a RunArgs,
}

pub fn run(cfg: CompareCommandConfig<'_>) -> Result<(), CliError> {
    // fail on an unusable output name before reading anything
    let renderer = renderer_for(cfg.output)?;

    let mut opts = cfg.args.options()?;
    if let Some(v) = cfg.draw_min_max {
        opts.show_min_max = v;
    }
    if let Some(v) = cfg.draw_all {
        opts.show_all_members = v;
    }
    if let Some(v) = cfg.draw_errors {
        opts.draw_error_bands = v;
    }
    debug!(
        "options: container={} workers={} timeout={}",
        opts.container,
        opts.effective_workers(),
        timeout_display(&opts)
    );

    let reader = make_reader(&opts);
    let result = compare(
        &reader,
        cfg.pattern1,
        cfg.label1,
        cfg.pattern2,
        cfg.label2,
        &opts,
    )?;

    let style = RenderStyle {
        title: cfg
            .args
            .title
            .clone()
            .unwrap_or_else(|| format!("{} vs {}", cfg.label1, cfg.label2)),
        ..Default::default()
    };
    renderer.render(&result, &style, cfg.output)?;
    info!("wrote {}", cfg.output.display());

    for side in result.sides() {
        print_summary(side);
    }
    println!("Wrote {}", cfg.output.display());
    Ok(())
}
