use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::ReportFormat;
use crate::{LogFormat, LogLevel};

pub const DEFAULT_CONFIG_PATH: &str = "AtmReporter.toml";
pub const DEFAULT_INPUT: &str = "source";
pub const DEFAULT_OUTPUT: &str = "reports";
pub const DEFAULT_COMPLETED: &str = "completed";
pub const DEFAULT_PATTERN: &str = "*.spa";
pub const DEFAULT_LOCK: &str = "program.lock";
pub const DEFAULT_SETTLE_MS: u64 = 500;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub input_folder: Option<String>,
    pub output_folder: Option<String>,
    pub completed_folder: Option<String>,
    pub source_pattern: Option<String>,
    pub format: Option<ReportFormat>,
    pub settle_ms: Option<u64>,
    pub lock_path: Option<String>,
    pub reasons_path: Option<String>,
    pub log_format: Option<LogFormat>,
    pub log_path: Option<String>,
    pub log_level: Option<LogLevel>,
    pub progress: Option<bool>,
}

impl AppConfig {
    pub fn first_run() -> Self {
        Self {
            input_folder: Some(DEFAULT_INPUT.to_string()),
            output_folder: Some(DEFAULT_OUTPUT.to_string()),
            completed_folder: Some(DEFAULT_COMPLETED.to_string()),
            source_pattern: Some(DEFAULT_PATTERN.to_string()),
            format: Some(ReportFormat::Xlsx),
            ..Default::default()
        }
    }
}

/// Reads the config named on the command line, or the default file.
/// A missing default file is created with first-run values.
pub fn load_config(path_opt: Option<&str>) -> Result<AppConfig> {
    let (path, explicit) = match path_opt { Some(p) => (PathBuf::from(p), true), None => (PathBuf::from(DEFAULT_CONFIG_PATH), false) };
    match std::fs::read_to_string(&path) {
        Ok(s) => toml::from_str::<AppConfig>(&s).with_context(|| format!("parsing config {}", path.display())),
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            let cfg = AppConfig::first_run();
            if let Err(e) = write_config(&path, &cfg) { eprintln!("Failed to write default config {}: {:#}", path.display(), e); }
            Ok(cfg)
        }
        Err(e) => Err(e).with_context(|| format!("reading config {}", path.display())),
    }
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let s = toml::to_string_pretty(cfg)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folders {
    pub input: PathBuf,
    pub output: PathBuf,
    pub completed: PathBuf,
}

impl Folders {
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.input, &self.output, &self.completed] {
            std::fs::create_dir_all(dir).with_context(|| format!("creating folder {}", dir.display()))?;
        }
        Ok(())
    }
}
