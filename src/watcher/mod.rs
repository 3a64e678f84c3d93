//! File watcher: keeps the graph incrementally current.
//!
//! A notify watcher thread hands raw events to the loop over a channel;
//! the loop filters them, runs them through the per-path debouncer, and
//! calls into the orchestrator under a process-wide lock so orchestrator
//! invariants hold no matter where the call originates.

pub mod debouncer;
mod error;

pub use debouncer::{DebounceAction, Debouncer};
pub use error::WatchError;

use crossbeam_channel::{RecvTimeoutError, unbounded};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::WatchConfig;
use crate::indexing::{GraphUpdater, is_ignored};
use crate::ingest::Ingestor;
use crate::parsing::Language;

/// How long the loop sleeps when no timer is armed.
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Watch a repository and apply incremental updates until cancelled.
///
/// The updater should have completed an initial full scan; this loop only
/// replays single-file updates.
pub fn run<I: Ingestor>(
    updater: GraphUpdater,
    ingestor: I,
    config: &WatchConfig,
    cancel: Arc<AtomicBool>,
) -> Result<(), WatchError> {
    let root = updater.root().to_path_buf();
    let (tx, rx) = unbounded::<notify::Result<Event>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| WatchError::PathWatchFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    info!(target: "codegraph::watcher", "watching {}", root.display());

    let mut debouncer = Debouncer::new(
        Duration::from_secs_f64(config.debounce_seconds),
        Duration::from_secs_f64(config.max_wait_seconds),
    );
    // Per-process lock: debounce timers and any future callers serialize
    // on the orchestrator.
    let state = Mutex::new((updater, ingestor));

    loop {
        if cancel.load(Ordering::Relaxed) {
            info!(target: "codegraph::watcher", "watch loop cancelled");
            return Ok(());
        }

        let now = Instant::now();
        let timeout = debouncer
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(IDLE_POLL);

        match rx.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                for path in relevant_paths(&event) {
                    match debouncer.on_event(&path, Instant::now()) {
                        DebounceAction::FireNow => process(&path, &mut debouncer, &state),
                        DebounceAction::Scheduled => {}
                    }
                }
            }
            Ok(Err(e)) => {
                // Surface to the operator; the graph stays at last flush.
                warn!(target: "codegraph::watcher", "event source error: {e}");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
        }

        for path in debouncer.take_due(Instant::now()) {
            process(&path, &mut debouncer, &state);
        }
    }
}

fn process<I: Ingestor>(
    path: &Path,
    debouncer: &mut Debouncer,
    state: &Mutex<(GraphUpdater, I)>,
) {
    debouncer.begin(path);
    {
        let mut guard = state.lock();
        let (updater, ingestor) = &mut *guard;
        if let Err(e) = updater.update_file(path, ingestor) {
            warn!(target: "codegraph::watcher", "update failed for {}: {e}", path.display());
        }
    }
    debouncer.finish(path, Instant::now());
}

/// Paths worth re-indexing from one notify event: supported language,
/// not in an ignored directory, and a content-affecting event kind.
fn relevant_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => return Vec::new(),
    }
    event
        .paths
        .iter()
        .filter(|path| !is_ignored(path))
        .filter(|path| Language::from_path(path).is_some())
        .cloned()
        .collect()
}
