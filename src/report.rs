use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use comfy_table::{ContentArrangement, Table};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};

use crate::record::{COLUMNS, UptimeRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat { Xlsx, Csv, Tsv, Json, Markdown }

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self { ReportFormat::Xlsx => "xlsx", ReportFormat::Csv => "csv", ReportFormat::Tsv => "tsv", ReportFormat::Json => "json", ReportFormat::Markdown => "md" }
    }
}

pub fn report_path(output_dir: &Path, source: &Path, format: ReportFormat) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "report".to_string());
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

pub fn write_report(path: &Path, records: &[UptimeRecord], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Xlsx => write_xlsx(path, records),
        ReportFormat::Csv => write_delimited(path, records, b','),
        ReportFormat::Tsv => write_delimited(path, records, b'\t'),
        ReportFormat::Json => {
            let s = serde_json::to_string_pretty(records)?;
            std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))
        }
        ReportFormat::Markdown => std::fs::write(path, render_markdown(records)).with_context(|| format!("writing {}", path.display())),
    }
}

fn write_delimited(path: &Path, records: &[UptimeRecord], delimiter: u8) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(COLUMNS)?;
    for r in records { wtr.write_record(r.to_row())?; }
    wtr.flush()?;
    Ok(())
}

/// One worksheet, bold header row, one row per record.
fn write_xlsx(path: &Path, records: &[UptimeRecord]) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    for (col, h) in COLUMNS.iter().enumerate() { sheet.write_string_with_format(0, col as u16, *h, &bold)?; }
    for (i, r) in records.iter().enumerate() {
        for (col, cell) in r.to_row().iter().enumerate() { sheet.write_string(i as u32 + 1, col as u16, cell.as_str())?; }
    }
    sheet.autofit();
    workbook.save(path).with_context(|| format!("writing {}", path.display()))
}

pub fn render_markdown(records: &[UptimeRecord]) -> String {
    let mut s = String::new();
    s.push_str(&format!("| {} |\n", COLUMNS.join(" | ")));
    s.push_str(&format!("|{}\n", "---|".repeat(COLUMNS.len())));
    for r in records {
        let cells: Vec<String> = r.to_row().iter().map(|c| c.replace('|', "\\|")).collect();
        s.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    s
}

pub fn print_table(records: &[UptimeRecord], no_header: bool) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if !no_header { table.set_header(COLUMNS.iter().map(|h| crate::paint(h, "1")).collect::<Vec<_>>()); }
    for r in records { table.add_row(r.to_row().to_vec()); }
    println!("{}", table);
}
