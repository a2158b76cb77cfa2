use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};

mod file_scan;
mod lock;
mod parser;
mod pipeline;
mod reasons;
mod record;
mod report;
mod settings;
mod watch;

use crate::file_scan::SourceMatcher;
use crate::parser::UptimeReportParser;
use crate::pipeline::Pipeline;
use crate::report::ReportFormat;
use crate::settings::{AppConfig, Folders};

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Clone, Copy, Debug, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { #[default] Text, Json }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug, Default)]
#[command(
    name = "AtmReporter",
    about = "Turns ATM uptime reports into per-terminal summary tables",
    long_about = "Watches a source folder for ATM uptime reports, writes one summary table per report into the reports folder and moves the report into the completed folder.",
    after_long_help = "Examples:\n  AtmReporter\n  AtmReporter --once --format markdown\n  AtmReporter --input D:\\Sparrow\\out --output D:\\Reports\n  AtmReporter --inspect source/day1.spa --print json",
    color = ColorChoice::Auto
)]
struct Args {
    /// Path to TOML config (default ./AtmReporter.toml, created on first run)
    #[arg(long, short = 'c')]
    config: Option<String>,
    #[arg(long, short = 'i')]
    input: Option<String>,
    #[arg(long, short = 'o')]
    output: Option<String>,
    #[arg(long)]
    completed: Option<String>,
    /// File name glob selecting report files (default *.spa)
    #[arg(long, short = 'g')]
    pattern: Option<String>,
    #[arg(long, short = 'f', value_enum)]
    format: Option<ReportFormat>,
    /// Path to JSON downtime-reason registry (default ./reasons.json)
    #[arg(long)]
    reasons: Option<String>,
    /// Process files already in the source folder, then exit
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Parse a single report and print it; nothing is written or moved
    #[arg(long, conflicts_with = "once")]
    inspect: Option<String>,
    #[arg(long, value_enum, default_value = "text")]
    print: OutputFmt,
    #[arg(long, default_value_t = false)]
    no_header: bool,
    #[arg(long)]
    settle_ms: Option<u64>,
    #[arg(long)]
    lock_path: Option<String>,
    #[arg(long, default_value_t = false)]
    no_lock: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.input.is_none() && let Some(v) = cfg.input_folder { args.input = Some(v); }
    if args.output.is_none() && let Some(v) = cfg.output_folder { args.output = Some(v); }
    if args.completed.is_none() && let Some(v) = cfg.completed_folder { args.completed = Some(v); }
    if args.pattern.is_none() && let Some(v) = cfg.source_pattern { args.pattern = Some(v); }
    if args.format.is_none() && let Some(v) = cfg.format { args.format = Some(v); }
    if args.settle_ms.is_none() && let Some(v) = cfg.settle_ms { args.settle_ms = Some(v); }
    if args.lock_path.is_none() && let Some(v) = cfg.lock_path { args.lock_path = Some(v); }
    if args.reasons.is_none() && let Some(v) = cfg.reasons_path { args.reasons = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
    if args.log_level.is_none() && args.verbose == 0 && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if let Some(v) = cfg.progress { args.progress = args.progress || v; }
}

fn level_filter(args: &Args) -> log::LevelFilter {
    if args.quiet { return log::LevelFilter::Error; }
    if let Some(lvl) = args.log_level {
        return match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
    }
    match args.verbose { 0 | 1 => log::LevelFilter::Info, 2 => log::LevelFilter::Debug, _ => log::LevelFilter::Trace }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter(args));
    // RUST_LOG still wins when set
    builder.parse_env(env_logger::Env::default());
    match args.log_format.unwrap_or(LogFormat::Text) {
        LogFormat::Json => {
            builder.format(|buf, record| {
                use std::io::Write;
                let obj = serde_json::json!({
                    "ts": chrono::Local::now().to_rfc3339(),
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "msg": record.args().to_string(),
                });
                writeln!(buf, "{}", obj)
            });
        }
        LogFormat::Text => {
            builder.format(|buf, record| {
                use std::io::Write;
                let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                writeln!(buf, "{} - {} - {}", ts, record.level(), record.args())
            });
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&false) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

fn build_pipeline(args: &Args) -> Result<Pipeline> {
    let folders = Folders {
        input: PathBuf::from(args.input.as_deref().unwrap_or(settings::DEFAULT_INPUT)),
        output: PathBuf::from(args.output.as_deref().unwrap_or(settings::DEFAULT_OUTPUT)),
        completed: PathBuf::from(args.completed.as_deref().unwrap_or(settings::DEFAULT_COMPLETED)),
    };
    let matcher = SourceMatcher::new(args.pattern.as_deref().unwrap_or(settings::DEFAULT_PATTERN))?;
    let parser = UptimeReportParser::new(reasons::load_reasons(args.reasons.as_deref()));
    Ok(Pipeline { folders, matcher, parser, format: args.format.unwrap_or(ReportFormat::Xlsx) })
}

fn inspect(args: &Args, path: &str) -> Result<()> {
    let parser = UptimeReportParser::new(reasons::load_reasons(args.reasons.as_deref()));
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let outcome = parser.parse_detailed(&text);
    match args.print {
        OutputFmt::Json => println!("{}", serde_json::to_string_pretty(&outcome.records)?),
        OutputFmt::Text => {
            report::print_table(&outcome.records, args.no_header);
            if !args.no_header {
                println!("{} {} records, {} lines scanned{}", paint("Summary:", "1"), outcome.records.len(), outcome.lines_scanned, if outcome.terminated { ", stopped at all-ATM totals" } else { "" });
                if let Some(id) = outcome.dropped_trailing.as_ref() { println!("{}", paint(&format!("Final section ATM-{} had no downtime reasons and was left out", id), "33")); }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() && let Ok(mut f) = std::fs::File::create(path) {
            clap_complete::generate(sh, &mut cmd, "AtmReporter", &mut f);
        } else {
            clap_complete::generate(sh, &mut cmd, "AtmReporter", &mut std::io::stdout());
        }
        return Ok(());
    }
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let _ = ENABLE_COLOR.set(if args.force_color { true } else { color_default && !args.no_color });

    // inspect never creates a default config
    if let Some(path) = args.inspect.clone() {
        if let Some(c) = args.config.clone() {
            let cfg = settings::load_config(Some(c.as_str()))?;
            apply_config(&mut args, cfg);
        }
        init_logging(&args);
        return inspect(&args, &path);
    }

    let cfg = settings::load_config(args.config.as_deref())?;
    apply_config(&mut args, cfg);
    init_logging(&args);

    let pipeline = build_pipeline(&args)?;
    pipeline.folders.ensure()?;
    let _lock = if args.no_lock {
        None
    } else {
        let p = PathBuf::from(args.lock_path.as_deref().unwrap_or(settings::DEFAULT_LOCK));
        match lock::InstanceLock::acquire(&p) {
            Ok(l) => Some(l),
            Err(e) => { log::error!("{:#}. Exiting.", e); return Err(e); }
        }
    };

    // watch first so reports landing during the sweep are buffered
    let watch = if args.once { None } else { Some(watch::FolderWatch::start(&pipeline.folders.input)?) };
    let summary = pipeline.process_pending(args.progress);
    log::info!("Startup sweep: {} reported ({} records), {} without sections, {} failed", summary.reported, summary.records, summary.empty, summary.failed);
    let Some(watch) = watch else { return Ok(()); };

    let stop = watch.stopper();
    ctrlc::set_handler(move || { let _ = stop.send(watch::WatchMsg::Stop); }).context("installing the Ctrl-C/SIGTERM handler")?;
    watch.run(&pipeline, Duration::from_millis(args.settle_ms.unwrap_or(settings::DEFAULT_SETTLE_MS)));
    log::info!("ATM Reporter Closed.");
    Ok(())
}
