//! Segment-wise glob resolution of diagnostic file paths.
//!
//! A pattern such as `fits/*/chain_[0-9]/diag.json` is split on `/` and walked
//! one directory level per segment. Each segment is a shell glob (`*`, `?`,
//! `[...]`) matched against entry names only, so `*` never crosses a `/`.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::debug;

use crate::error::{DiagError, Result};

/// fnmatch-style options: case sensitive, `*` may match a leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A parsed path pattern: a fixed base directory plus one glob per level.
#[derive(Debug, Clone)]
pub struct FilePattern {
    raw: String,
    base: PathBuf,
    segments: Vec<Pattern>,
}

impl FilePattern {
    /// Parse `pattern`.
    ///
    /// Leading wildcard-free segments (all but the last) become the base
    /// directory; a leading `/` keeps it absolute. With no fixed prefix the
    /// walk starts in the current directory.
    pub fn parse(pattern: &str) -> Result<Self> {
        let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();

        let fixed = parts
            .iter()
            .take(parts.len().saturating_sub(1))
            .take_while(|s| !has_wildcard(s))
            .count();

        let mut base = if pattern.starts_with('/') {
            PathBuf::from("/")
        } else if fixed == 0 {
            PathBuf::from(".")
        } else {
            PathBuf::new()
        };
        for part in &parts[..fixed] {
            base.push(part);
        }

        let segments = parts[fixed..]
            .iter()
            .map(|segment| {
                Pattern::new(segment).map_err(|e| DiagError::InvalidPattern {
                    segment: segment.to_string(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            base,
            segments,
        })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory the walk starts from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Number of levels matched below the base.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Every non-directory path matching the full pattern.
    ///
    /// Entries are visited in file-name order within each directory. Missing
    /// or unreadable directories contribute nothing.
    pub fn resolve(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if !self.segments.is_empty() {
            walk(&self.base, &self.segments, &mut out);
        }
        out
    }
}

/// Parse and resolve `pattern` in one step.
pub fn find_matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    Ok(FilePattern::parse(pattern)?.resolve())
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?', '['])
}

fn walk(dir: &Path, segments: &[Pattern], out: &mut Vec<PathBuf>) {
    let Some((current, rest)) = segments.split_first() else {
        return;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("skipping {}: {e}", dir.display());
            return;
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| match entry.file_name().into_string() {
            Ok(name) => Some(name),
            Err(raw) => {
                debug!("skipping non UTF-8 entry {raw:?} in {}", dir.display());
                None
            }
        })
        .filter(|name| current.matches_with(name, MATCH_OPTIONS))
        .collect();
    names.sort_unstable();

    for name in names {
        let path = dir.join(&name);
        // metadata() follows symlinks, so linked run directories are walked.
        let is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        if rest.is_empty() {
            if !is_dir {
                out.push(path);
            }
        } else if is_dir {
            walk(&path, rest, out);
        }
    }
}
