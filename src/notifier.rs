// src/notifier.rs
use crate::event::{ChangeEvent, ChangeKind};
use std::path::Path;
use tokio::sync::mpsc::Receiver;
use tracing::debug;

/// Drains classified events and fires `on_refresh` once per file write.
///
/// Writes are not coalesced: a burst of writes to one file produces one
/// refresh per event. Directory creates and removals have already been
/// applied to the watch set by the watcher and are only logged here.
///
/// Returns the number of refreshes signalled once the stream closes.
pub async fn subscribe<F>(mut events: Receiver<ChangeEvent>, mut on_refresh: F) -> usize
where
    F: FnMut(&Path),
{
    let mut refreshes = 0;
    while let Some(event) = events.recv().await {
        match event.kind {
            ChangeKind::Write => {
                debug!("Refreshing after write to {}", event.path.display());
                on_refresh(&event.path);
                refreshes += 1;
            }
            ChangeKind::Create => debug!("Directory created: {}", event.path.display()),
            ChangeKind::Remove => debug!("Path removed: {}", event.path.display()),
        }
    }
    debug!("Change stream closed after {} refreshes.", refreshes);
    refreshes
}
