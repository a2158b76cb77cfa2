use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

/// Decides which files in the source folder are uptime reports.
#[derive(Clone, Debug)]
pub struct SourceMatcher {
    pattern: String,
    glob: GlobMatcher,
}

impl SourceMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid source pattern {:?}", pattern))?
            .compile_matcher();
        Ok(Self { pattern: pattern.to_string(), glob })
    }

    pub fn pattern(&self) -> &str { &self.pattern }

    /// Matches on the file name only, so the folder location never matters.
    pub fn is_match(&self, path: &Path) -> bool {
        path.file_name().map(|n| self.glob.is_match(Path::new(n))).unwrap_or(false)
    }
}

pub fn pending_files(dir: &Path, matcher: &SourceMatcher) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = vec![];
    for de in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false).into_iter().filter_map(Result::ok) {
        let p = de.path();
        if !de.file_type().is_file() { continue; }
        if matcher.is_match(p) { out.push(p.to_path_buf()); }
    }
    out.sort();
    out
}
