use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::file_scan::{SourceMatcher, pending_files};
use crate::parser::UptimeReportParser;
use crate::report::{ReportFormat, report_path, write_report};
use crate::settings::Folders;

const BANNER: &str = "##########################";

/// Everything needed to turn one source file into a report.
#[derive(Clone, Debug)]
pub struct Pipeline {
    pub folders: Folders,
    pub matcher: SourceMatcher,
    pub parser: UptimeReportParser,
    pub format: ReportFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped,
    Empty,
    Reported { records: usize, report: PathBuf, archived: PathBuf },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub reported: usize,
    pub records: usize,
    pub empty: usize,
    pub failed: usize,
}

fn display_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned())
}

impl Pipeline {
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        if !self.matcher.is_match(path) {
            log::debug!("Ignoring {} (does not match {})", path.display(), self.matcher.pattern());
            return Ok(FileOutcome::Skipped);
        }
        let name = display_name(path);
        log::info!("{} FILE IN TASK: {} >> STARTED << {}", BANNER, name, BANNER);
        log::info!("Processing new source file. SOURCE FILE NAME >> {} SOURCES HOME >> {}", name, self.folders.input.display());
        let res = self.run(path, &name);
        if let Err(e) = &res {
            log::error!("Error processing file: {}", name);
            log::error!("Error message: {:#}", e);
        }
        log::info!("{} FILE IN TASK: {} >> COMPLETED << {}", BANNER, name, BANNER);
        res
    }

    fn run(&self, path: &Path, name: &str) -> Result<FileOutcome> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let outcome = self.parser.parse_detailed(&text);
        log::debug!("Scanned {} lines of {} (terminator reached: {})", outcome.lines_scanned, name, outcome.terminated);
        if let Some(id) = outcome.dropped_trailing.as_ref() {
            log::warn!("Final section ATM-{} in {} recorded no downtime reasons and was left out", id, name);
        }
        if outcome.records.is_empty() {
            log::warn!("No terminal sections found in {}; leaving it in {}", name, self.folders.input.display());
            return Ok(FileOutcome::Empty);
        }

        let report = report_path(&self.folders.output, path, self.format);
        write_report(&report, &outcome.records, self.format)?;
        log::info!("Report generated. REPORT FILE NAME >> {} REPORTS HOME >> {}", display_name(&report), self.folders.output.display());

        let archived = archive(path, &self.folders.completed)?;
        log::info!("Archived processed file: ARCHIVED FILE NAME >> {} ARCHIVES HOME >> {}", name, self.folders.completed.display());
        Ok(FileOutcome::Reported { records: outcome.records.len(), report, archived })
    }

    /// Processes files that were already waiting before the watcher started.
    pub fn process_pending(&self, progress: bool) -> SweepSummary {
        let files = pending_files(&self.folders.input, &self.matcher);
        let pb = if progress && !files.is_empty() { Some(indicatif::ProgressBar::new(files.len() as u64)) } else { None };
        let mut summary = SweepSummary::default();
        for f in &files {
            if let Some(ref pb) = pb { pb.set_message(display_name(f)); }
            match self.process_file(f) {
                Ok(FileOutcome::Reported { records, report, archived }) => {
                    log::debug!("{} -> {} (archived as {})", f.display(), report.display(), archived.display());
                    summary.reported += 1;
                    summary.records += records;
                }
                Ok(FileOutcome::Empty) => summary.empty += 1,
                Ok(FileOutcome::Skipped) => {}
                Err(_) => summary.failed += 1,
            }
            if let Some(ref pb) = pb { pb.inc(1); }
        }
        if let Some(pb) = pb { pb.finish_and_clear(); }
        summary
    }
}

/// Moves `path` into `dir`, replacing a previous archive of the same name.
pub fn archive(path: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().with_context(|| format!("{} has no file name", path.display()))?;
    let target = dir.join(file_name);
    if target.exists() {
        std::fs::remove_file(&target).with_context(|| format!("removing old archive {}", target.display()))?;
    }
    if let Err(e) = std::fs::rename(path, &target) {
        log::debug!("Rename {} -> {} failed ({}); copying instead", path.display(), target.display(), e);
        std::fs::copy(path, &target).with_context(|| format!("copying {} to {}", path.display(), target.display()))?;
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(target)
}
