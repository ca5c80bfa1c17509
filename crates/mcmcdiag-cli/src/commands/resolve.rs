use mcmcdiag_core::FilePattern;

use crate::error::CliError;

pub fn run(pattern: &str) -> Result<(), CliError> {
    let parsed = FilePattern::parse(pattern)?;
    let files = parsed.resolve();
    for file in &files {
        println!("{}", file.display());
    }
    eprintln!(
        "{} file(s) matched under {} ({} level(s))",
        files.len(),
        parsed.base().display(),
        parsed.depth()
    );
    Ok(())
}
