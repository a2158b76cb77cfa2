use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::file_scan::SourceMatcher;
use crate::pipeline::Pipeline;

/// Paths of newly arrived report files carried by one watcher event.
pub fn arrivals(event: &Event, matcher: &SourceMatcher) -> Vec<PathBuf> {
    let arrived = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
    );
    if !arrived { return vec![]; }
    // a Both rename lists the old path first
    let paths: &[PathBuf] = match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1..).unwrap_or(&[]),
        _ => &event.paths,
    };
    paths.iter().filter(|p| matcher.is_match(p)).cloned().collect()
}

pub enum WatchMsg {
    Fs(notify::Result<Event>),
    Stop,
}

/// Folder watch that buffers events from the moment it is started, so files
/// arriving while the startup sweep runs are still seen.
pub struct FolderWatch {
    _watcher: RecommendedWatcher,
    tx: mpsc::Sender<WatchMsg>,
    rx: mpsc::Receiver<WatchMsg>,
}

impl FolderWatch {
    pub fn start(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WatchMsg>();
        let fs_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| { let _ = fs_tx.send(WatchMsg::Fs(res)); })?;
        watcher.watch(dir, RecursiveMode::NonRecursive).with_context(|| format!("watching {}", dir.display()))?;
        Ok(Self { _watcher: watcher, tx, rx })
    }

    /// Sender that ends `run` once its message is reached.
    pub fn stopper(&self) -> mpsc::Sender<WatchMsg> { self.tx.clone() }

    /// Blocks, processing each report that lands in the source folder until stopped.
    pub fn run(self, pipeline: &Pipeline, settle: Duration) {
        log::info!("ATM Reporter Started >> SOURCES FOLDER >> {}", pipeline.folders.input.display());
        let FolderWatch { _watcher, tx, rx } = self;
        drop(tx);
        drain(&rx, pipeline, settle);
    }
}

fn drain(rx: &mpsc::Receiver<WatchMsg>, pipeline: &Pipeline, settle: Duration) {
    for msg in rx {
        let event = match msg {
            WatchMsg::Stop => { log::info!("Stop requested; leaving watch loop"); return; }
            WatchMsg::Fs(Ok(ev)) => ev,
            WatchMsg::Fs(Err(e)) => { log::warn!("Watch error: {:?}", e); continue; }
        };
        for path in arrivals(&event, &pipeline.matcher) {
            std::thread::sleep(settle);
            if !path.is_file() { log::debug!("{} vanished before processing", path.display()); continue; }
            // failures are already logged per file
            let _ = pipeline.process_file(&path);
        }
    }
    log::info!("Watcher channel closed; stopping");
}
