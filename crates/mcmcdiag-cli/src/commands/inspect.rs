use std::path::Path;

use mcmcdiag_core::inspect_file;

use super::{LoadArgs, make_reader};
use crate::error::CliError;

pub fn run(path: &Path, args: &LoadArgs) -> Result<(), CliError> {
    let opts = args.options()?;
    let verdicts = inspect_file(&make_reader(&opts), path, &opts)?;

    let width = verdicts
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("Histogram".len());
    println!("{:<width$}  Verdict", "Histogram");
    println!("{}", "-".repeat(width + 20));

    let mut usable = 0;
    for (name, verdict) in &verdicts {
        match verdict {
            None => {
                usable += 1;
                println!("{name:<width$}  usable");
            }
            Some(reason) => println!("{name:<width$}  rejected ({reason})"),
        }
    }
    println!();
    println!(
        "{usable}/{} histograms usable in {}/{}",
        verdicts.len(),
        path.display(),
        opts.container
    );
    Ok(())
}
