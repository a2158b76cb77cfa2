use serde::{Deserialize, Serialize};

pub const DEFAULT_DOWNTIME: &str = "00:00.00";

pub const COLUMNS: [&str; 5] = ["ATM ID", "Uptime %", "Downtime %", "Total Downtime(hh:mm.ss)", "Downtime Reasons"];

/// One terminal's summary, in report order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeRecord {
    pub terminal_id: String,
    /// `None` when no Online line was seen, `Some("")` when the report marked it unavailable.
    pub uptime_percent: Option<String>,
    pub total_downtime_percent: Option<String>,
    pub total_downtime_duration: String,
    pub downtime_reasons: Vec<String>,
}

impl UptimeRecord {
    pub fn reasons_display(&self) -> String { self.downtime_reasons.join(", ") }

    pub fn to_row(&self) -> [String; 5] {
        [
            self.terminal_id.clone(),
            self.uptime_percent.clone().unwrap_or_default(),
            self.total_downtime_percent.clone().unwrap_or_default(),
            self.total_downtime_duration.clone(),
            self.reasons_display(),
        ]
    }
}

/// Fields of the section currently being scanned.
#[derive(Clone, Debug)]
pub struct RecordAccumulator {
    terminal_id: String,
    uptime_percent: Option<String>,
    total_downtime_percent: Option<String>,
    total_downtime_duration: String,
    reasons: Vec<String>,
}

impl RecordAccumulator {
    pub fn open(terminal_id: &str) -> Self {
        Self {
            terminal_id: terminal_id.to_string(),
            uptime_percent: None,
            total_downtime_percent: None,
            total_downtime_duration: DEFAULT_DOWNTIME.to_string(),
            reasons: Vec::new(),
        }
    }

    pub fn terminal_id(&self) -> &str { &self.terminal_id }

    pub fn set_uptime(&mut self, pct: &str) { self.uptime_percent = Some(pct.to_string()); }

    pub fn set_total_downtime(&mut self, duration: &str, pct: &str) {
        self.total_downtime_duration = duration.to_string();
        self.total_downtime_percent = Some(pct.to_string());
    }

    pub fn push_reason(&mut self, reason: String) { self.reasons.push(reason); }

    pub fn mark_no_totals(&mut self) {
        self.reasons.push(format!("No Totals Received For ATM-{}", self.terminal_id));
        self.uptime_percent = Some(String::new());
    }

    /// Closes a section because another one starts. Always yields a record.
    pub fn flush(mut self) -> UptimeRecord {
        if self.reasons.is_empty() {
            self.reasons.push(format!("No Recorded Reason For ATM-{}", self.terminal_id));
        }
        self.into_record()
    }

    /// Closes the last section of a document. Sections without reasons are dropped here.
    pub fn finish(self) -> Option<UptimeRecord> {
        if self.reasons.is_empty() { None } else { Some(self.into_record()) }
    }

    fn into_record(self) -> UptimeRecord {
        UptimeRecord {
            terminal_id: self.terminal_id,
            uptime_percent: self.uptime_percent,
            total_downtime_percent: self.total_downtime_percent,
            total_downtime_duration: self.total_downtime_duration,
            downtime_reasons: self.reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_substitutes_placeholder() {
        let rec = RecordAccumulator::open("42").flush();
        assert_eq!(rec.downtime_reasons, vec!["No Recorded Reason For ATM-42".to_string()]);
        assert_eq!(rec.total_downtime_duration, DEFAULT_DOWNTIME);
        assert!(rec.uptime_percent.is_none());
    }

    #[test]
    fn finish_drops_empty_section() {
        assert!(RecordAccumulator::open("42").finish().is_none());
        let mut acc = RecordAccumulator::open("42");
        acc.push_reason("Supervisor (1.00%)".to_string());
        let rec = acc.finish().unwrap();
        assert_eq!(rec.downtime_reasons, vec!["Supervisor (1.00%)".to_string()]);
    }

    #[test]
    fn no_totals_clears_uptime() {
        let mut acc = RecordAccumulator::open("7");
        acc.set_uptime("98.00");
        acc.mark_no_totals();
        let rec = acc.flush();
        assert_eq!(rec.uptime_percent.as_deref(), Some(""));
        assert_eq!(rec.downtime_reasons, vec!["No Totals Received For ATM-7".to_string()]);
    }

    #[test]
    fn row_renders_missing_fields_empty() {
        let mut acc = RecordAccumulator::open("9");
        acc.push_reason("Diagnostics (0.50%)".to_string());
        acc.push_reason("Re-entry (0.25%)".to_string());
        let row = acc.flush().to_row();
        assert_eq!(row, ["9".to_string(), String::new(), String::new(), "00:00.00".to_string(), "Diagnostics (0.50%), Re-entry (0.25%)".to_string()]);
    }
}
