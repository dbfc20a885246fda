//! Rebuild-on-change support for the `watch` command.
//!
//! A notify watcher feeds change events into a crossbeam channel; one
//! blocking wait returns the first relevant change plus everything
//! else arriving within the debounce window, so a burst of editor
//! writes triggers a single rebuild.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Error, Result};
use crate::dlog_debug;

/// Window during which follow-up events are folded into one batch.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Block until something under `dir` changes, returning the batch of
/// changed paths.
///
/// Only modify/create/remove events count; metadata-only churn is
/// ignored. The watcher lives for the duration of the call; `watch`
/// re-arms it on every loop iteration.
pub fn wait_for_change(dir: &Path) -> Result<Vec<PathBuf>> {
    let (tx, rx) = unbounded::<Vec<PathBuf>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
                        let _ = tx.send(event.paths);
                    }
                    _ => {}
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| Error::Watch(e.to_string()))?;

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch(e.to_string()))?;

    let mut changed = rx.recv().map_err(|e| Error::Watch(e.to_string()))?;
    loop {
        match rx.recv_timeout(DEBOUNCE) {
            Ok(mut more) => changed.append(&mut more),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    dlog_debug!("Watch batch: {} changed path(s)", changed.len());
    Ok(changed)
}
