use serde::{Deserialize, Serialize};

pub const DEFAULT_LABELS: [&str; 10] = [
    "Closed from Sparrow",
    "Waiting For Comms",
    "Supervisor",
    "Diagnostics",
    "Re-entry",
    "Downloading HCF",
    "Downloading Other",
    "Hardware Fault",
    "Power Fail Recovery",
    "Uptime Adjustment",
];

/// Duration token reported for an event that cost no time.
pub const ZERO_DURATION: &str = "0:00.00";

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ReasonsConfig {
    pub labels: Option<Vec<String>>,       // replaces the built-in list
    pub extra_labels: Option<Vec<String>>, // appended after labels
}

/// Ordered downtime-reason labels. Every label is tried against every line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReasonTable {
    labels: Vec<String>,
}

impl Default for ReasonTable {
    fn default() -> Self { Self { labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect() } }
}

impl ReasonTable {
    pub fn new(labels: Vec<String>) -> Self { Self { labels } }

    pub fn from_config(cfg: ReasonsConfig) -> Self {
        let mut table = match cfg.labels { Some(v) if !v.is_empty() => Self::new(v), _ => Self::default() };
        if let Some(extra) = cfg.extra_labels {
            for l in extra { if !l.is_empty() && !table.labels.contains(&l) { table.labels.push(l); } }
        }
        table
    }

    pub fn labels(&self) -> &[String] { &self.labels }

    /// Reason entries produced by one line, in table order.
    pub fn matches(&self, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        for label in &self.labels {
            if !line.contains(label.as_str()) { continue; }
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 2 { continue; }
            let pct = cols[cols.len() - 1];
            if cols[cols.len() - 2] == ZERO_DURATION { continue; }
            out.push(format!("{} ({}%)", label, pct));
        }
        out
    }
}

pub fn load_reasons(path_opt: Option<&str>) -> ReasonTable {
    let explicit = path_opt
        .map(|s| s.to_string())
        .or_else(|| std::env::var("ATM_REPORTER_REASONS_PATH").ok());
    let path = explicit.clone().unwrap_or_else(|| "reasons.json".to_string());
    let p = std::path::PathBuf::from(&path);
    let data = match std::fs::read(&p) {
        Ok(d) => d,
        Err(e) => {
            if explicit.is_some() { log::warn!("Failed to read reasons file {}: {}", p.to_string_lossy(), e); }
            return ReasonTable::default();
        }
    };
    match serde_json::from_slice::<ReasonsConfig>(&data) {
        Ok(cfg) => {
            let table = ReasonTable::from_config(cfg);
            log::debug!("Loaded {} downtime reason labels from {}", table.labels().len(), p.to_string_lossy());
            table
        }
        Err(e) => { log::warn!("Failed to parse reasons file {}: {}", p.to_string_lossy(), e); ReasonTable::default() }
    }
}
