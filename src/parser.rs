//! Line scanner for ATM uptime reports.
//!
//! A report is a run of sections, each opened by an `UPTIME TOTALS FOR ATM <id>`
//! header and closed by the next header or by the all-ATM totals line. Every
//! line is checked against each marker independently; one line may feed
//! several fields.

use std::sync::LazyLock;

use regex::Regex;

use crate::reasons::ReasonTable;
use crate::record::{RecordAccumulator, UptimeRecord};

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UPTIME TOTALS FOR ATM (\d+)").expect("section header pattern"));

const ADJUSTMENT_MARKER: &str = "Uptime Adjustment";
const ONLINE_MARKER: &str = "Online";
const TERMINATOR: &str = "ACCUMULATED UPTIME TOTALS FOR *ALL* ATMS";
const NO_TOTALS_MARKER: &str = "No totals received from ATM";

/// Lines between an adjustment marker and its totals line.
const CAPTURE_OFFSET: usize = 2;

/// Uptime column on an Online line.
const UPTIME_COLUMN: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaptureState {
    Idle,
    AwaitingLine(usize),
}

#[derive(Clone, Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<UptimeRecord>,
    pub lines_scanned: usize,
    pub terminated: bool,
    /// Id of a final section left out because it recorded no reasons.
    pub dropped_trailing: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UptimeReportParser {
    reasons: ReasonTable,
}

impl UptimeReportParser {
    pub fn new(reasons: ReasonTable) -> Self { Self { reasons } }

    pub fn parse(&self, text: &str) -> Vec<UptimeRecord> { self.parse_detailed(text).records }

    pub fn parse_detailed(&self, text: &str) -> ParseOutcome {
        let mut out = ParseOutcome::default();
        let mut current: Option<RecordAccumulator> = None;
        let mut capture = CaptureState::Idle;

        for (idx, line) in text.trim().lines().enumerate() {
            out.lines_scanned = idx + 1;

            if let Some(caps) = SECTION_HEADER.captures(line) {
                if let Some(prev) = current.take() { out.records.push(prev.flush()); }
                current = Some(RecordAccumulator::open(&caps[1]));
            }

            if line.contains(ADJUSTMENT_MARKER) {
                capture = CaptureState::AwaitingLine(idx + CAPTURE_OFFSET);
            } else if capture == CaptureState::AwaitingLine(idx) {
                capture = CaptureState::Idle;
                let cols: Vec<&str> = line.split_whitespace().collect();
                if cols.len() >= 2 && let Some(acc) = current.as_mut() {
                    acc.set_total_downtime(cols[cols.len() - 2], cols[cols.len() - 1]);
                }
            }

            if line.contains(ONLINE_MARKER)
                && let Some(pct) = line.split_whitespace().nth(UPTIME_COLUMN)
                && let Some(acc) = current.as_mut() {
                acc.set_uptime(pct);
            }

            if line.contains(TERMINATOR) {
                out.terminated = true;
                break;
            }

            let Some(acc) = current.as_mut() else { continue };
            if line.contains(NO_TOTALS_MARKER) { acc.mark_no_totals(); }
            for reason in self.reasons.matches(line) { acc.push_reason(reason); }
        }

        if let Some(acc) = current {
            let id = acc.terminal_id().to_string();
            match acc.finish() {
                Some(rec) => out.records.push(rec),
                None => out.dropped_trailing = Some(id),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<UptimeRecord> { UptimeReportParser::default().parse(text) }

    #[test]
    fn no_headers_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("Supervisor  1 1:00.00 2.00\nOnline x x 97.50\n").is_empty());
    }

    #[test]
    fn two_section_document() {
        let text = "UPTIME TOTALS FOR ATM 101\n\
                    Online    x x 97.50\n\
                    Supervisor line ... 1:00.00 2.00\n\
                    UPTIME TOTALS FOR ATM 102\n\
                    Online    x x 99.00\n\
                    ACCUMULATED UPTIME TOTALS FOR *ALL* ATMS\n";
        let out = UptimeReportParser::default().parse_detailed(text);
        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.terminal_id, "101");
        assert_eq!(r.uptime_percent.as_deref(), Some("97.50"));
        assert_eq!(r.downtime_reasons, vec!["Supervisor (2.00%)".to_string()]);
        assert!(out.terminated);
        assert_eq!(out.dropped_trailing.as_deref(), Some("102"));
    }

    #[test]
    fn mid_document_section_gets_placeholder() {
        let text = "UPTIME TOTALS FOR ATM 5\nOnline a b 100.00\nUPTIME TOTALS FOR ATM 6\nDiagnostics 1 0:05.00 0.10\n";
        let recs = parse(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].downtime_reasons, vec!["No Recorded Reason For ATM-5".to_string()]);
        assert_eq!(recs[1].downtime_reasons, vec!["Diagnostics (0.10%)".to_string()]);
    }

    #[test]
    fn last_section_without_reasons_is_dropped_at_end_of_input() {
        let recs = parse("UPTIME TOTALS FOR ATM 5\nOnline a b 100.00\n");
        assert!(recs.is_empty());
    }

    #[test]
    fn zero_impact_lines_do_not_count() {
        let text = "UPTIME TOTALS FOR ATM 8\nHardware Fault  0  0:00.00 0.00\nSupervisor 2 1:15.30 3.50\n";
        let recs = parse(text);
        assert_eq!(recs[0].downtime_reasons, vec!["Supervisor (3.50%)".to_string()]);
    }

    #[test]
    fn no_totals_overrides_uptime() {
        let text = "UPTIME TOTALS FOR ATM 7\nOnline a b 98.00\nNo totals received from ATM\n";
        let recs = parse(text);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].uptime_percent.as_deref(), Some(""));
        assert_eq!(recs[0].downtime_reasons, vec!["No Totals Received For ATM-7".to_string()]);
    }

    #[test]
    fn headers_after_terminator_are_ignored() {
        let text = "UPTIME TOTALS FOR ATM 1\nSupervisor 1 0:30.00 1.00\nACCUMULATED UPTIME TOTALS FOR *ALL* ATMS\nUPTIME TOTALS FOR ATM 2\nSupervisor 1 0:30.00 1.00\n";
        let out = UptimeReportParser::default().parse_detailed(text);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].terminal_id, "1");
        assert_eq!(out.lines_scanned, 3);
    }

    #[test]
    fn adjustment_line_feeds_reason_and_capture() {
        let text = "UPTIME TOTALS FOR ATM 3\n\
                    Uptime Adjustment     1   0:45.00  1.25\n\
                    ---------------------------------------\n\
                    Total Downtime        4   2:10.15  4.75\n";
        let recs = parse(text);
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.downtime_reasons, vec!["Uptime Adjustment (1.25%)".to_string()]);
        assert_eq!(r.total_downtime_duration, "2:10.15");
        assert_eq!(r.total_downtime_percent.as_deref(), Some("4.75"));
    }

    #[test]
    fn capture_crosses_into_next_section() {
        let text = "UPTIME TOTALS FOR ATM 1\n\
                    Uptime Adjustment 1 0:10.00 0.30\n\
                    UPTIME TOTALS FOR ATM 2\n\
                    Total 5 1:20.00 2.50\n\
                    Supervisor 1 0:05.00 0.10\n";
        let recs = parse(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].terminal_id, "1");
        assert_eq!(recs[0].downtime_reasons, vec!["Uptime Adjustment (0.30%)".to_string()]);
        assert_eq!(recs[0].total_downtime_duration, "00:00.00");
        assert!(recs[0].total_downtime_percent.is_none());
        assert_eq!(recs[1].terminal_id, "2");
        assert_eq!(recs[1].total_downtime_duration, "1:20.00");
        assert_eq!(recs[1].total_downtime_percent.as_deref(), Some("2.50"));
        assert_eq!(recs[1].downtime_reasons, vec!["Supervisor (0.10%)".to_string()]);

        // a header sitting on the target line is captured as a totals line
        let text = "UPTIME TOTALS FOR ATM 1\nx\nUptime Adjustment 1 0:10.00 0.30\ny\nUPTIME TOTALS FOR ATM 22\nDiagnostics 1 0:01.00 0.02\n";
        let recs = parse(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].terminal_id, "22");
        assert_eq!(recs[1].total_downtime_duration, "ATM");
        assert_eq!(recs[1].total_downtime_percent.as_deref(), Some("22"));
        assert_eq!(recs[1].downtime_reasons, vec!["Diagnostics (0.02%)".to_string()]);
    }

    #[test]
    fn adjustment_on_target_line_rearms() {
        let lines = [
            "UPTIME TOTALS FOR ATM 9",
            "Uptime Adjustment 1 0:10.00 0.30",
            "----",
            "Uptime Adjustment 2 0:20.00 0.60",
            "----",
            "Total 3 0:30.00 0.90",
        ];
        let recs = parse(&lines.join("\n"));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].total_downtime_duration, "0:30.00");
        assert_eq!(recs[0].total_downtime_percent.as_deref(), Some("0.90"));
        assert_eq!(recs[0].downtime_reasons, vec!["Uptime Adjustment (0.30%)".to_string(), "Uptime Adjustment (0.60%)".to_string()]);

        // the second marker is not itself captured
        let recs = parse(&lines[..4].join("\n"));
        assert_eq!(recs[0].total_downtime_duration, "00:00.00");
        assert!(recs[0].total_downtime_percent.is_none());
        assert_eq!(recs[0].downtime_reasons.len(), 2);
    }

    #[test]
    fn capture_past_end_of_input_keeps_defaults() {
        let text = "UPTIME TOTALS FOR ATM 3\nSupervisor 1 0:10.00 0.30\nUptime Adjustment 0 0:00.00 0.00\n";
        let recs = parse(text);
        assert_eq!(recs[0].total_downtime_duration, "00:00.00");
        assert!(recs[0].total_downtime_percent.is_none());
    }

    #[test]
    fn short_capture_line_is_skipped() {
        let text = "UPTIME TOTALS FOR ATM 3\nUptime Adjustment 1 0:10.00 0.30\n\nTotal\nSupervisor 1 0:10.00 0.30\n";
        let recs = parse(text);
        assert_eq!(recs[0].total_downtime_duration, "00:00.00");
        assert_eq!(recs[0].downtime_reasons.len(), 2);
    }

    #[test]
    fn short_online_line_leaves_uptime_unset() {
        let recs = parse("UPTIME TOTALS FOR ATM 4\nOnline 97.0\nSupervisor 1 0:10.00 0.30\n");
        assert!(recs[0].uptime_percent.is_none());
    }

    #[test]
    fn crlf_reports_parse_like_lf() {
        let text = "UPTIME TOTALS FOR ATM 11\r\nOnline  x x 96.10\r\nWaiting For Comms 2 0:20.00 0.40\r\n";
        let recs = parse(text);
        assert_eq!(recs[0].uptime_percent.as_deref(), Some("96.10"));
        assert_eq!(recs[0].downtime_reasons, vec!["Waiting For Comms (0.40%)".to_string()]);
    }

    #[test]
    fn custom_table_is_used() {
        let p = UptimeReportParser::new(ReasonTable::new(vec!["Card Jam".to_string()]));
        let recs = p.parse("UPTIME TOTALS FOR ATM 12\nCard Jam 1 0:02.00 0.05\nSupervisor 1 0:10.00 0.30\n");
        assert_eq!(recs[0].downtime_reasons, vec!["Card Jam (0.05%)".to_string()]);
    }
}
