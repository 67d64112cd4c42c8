// src/watcher.rs
use crate::error::WatchError;
use crate::event::{classify, ChangeEvent, ChangeKind, FileKind, RawOp};
use notify::{RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Capacity of the channel carrying classified events to async code.
const EVENT_BUFFER: usize = 100;

/// Messages delivered to the watch thread.
enum WatchMessage {
    Raw(notify::Result<notify::Event>),
    Shutdown,
}

/// The set of directories registered with the OS watcher.
///
/// Every non-hidden directory under the root is registered exactly once and
/// non-recursively, so hidden subtrees never produce events.
pub struct WatchedTree<W: Watcher> {
    watcher: W,
    root: PathBuf,
    dirs: HashSet<PathBuf>,
}

impl<W: Watcher> WatchedTree<W> {
    pub fn new(watcher: W, root: impl Into<PathBuf>) -> Self {
        Self {
            watcher,
            root: root.into(),
            dirs: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Walks `dir` and registers every directory not already watched.
    ///
    /// Hidden directories are pruned with their whole subtree; the root itself
    /// is exempt so `mdlive .` works. Returns how many directories were added.
    pub fn register_tree(&mut self, dir: &Path) -> Result<usize, WatchError> {
        let root = self.root.clone();
        let mut added = 0;
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| !is_hidden_dir(e, &root))
        {
            let entry = entry.map_err(|source| WatchError::Walk {
                root: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.into_path();
            if self.dirs.contains(&path) {
                continue;
            }
            self.watcher.watch(&path, RecursiveMode::NonRecursive)?;
            debug!("Watching directory {}", path.display());
            self.dirs.insert(path);
            added += 1;
        }
        Ok(added)
    }

    /// Drops `path` and every registered directory below it.
    ///
    /// Unknown paths are ignored. Returns how many directories were removed.
    pub fn deregister(&mut self, path: &Path) -> usize {
        let gone: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(path))
            .cloned()
            .collect();
        for dir in &gone {
            self.dirs.remove(dir);
            // The OS usually drops the watch itself once the directory is gone.
            if let Err(e) = self.watcher.unwatch(dir) {
                debug!("Unwatch of {} reported: {}", dir.display(), e);
            }
            debug!("Stopped watching directory {}", dir.display());
        }
        gone.len()
    }

    /// Keeps the watch set in step with a classified event.
    pub fn apply(&mut self, change: &ChangeEvent) {
        match change.kind {
            ChangeKind::Create => {
                if let Err(e) = self.register_tree(&change.path) {
                    error!(
                        "Failed to walk newly created directory {}: {}",
                        change.path.display(),
                        e
                    );
                }
            }
            ChangeKind::Remove => {
                self.deregister(&change.path);
            }
            ChangeKind::Write => {}
        }
    }
}

fn is_hidden_dir(entry: &DirEntry, root: &Path) -> bool {
    entry.file_type().is_dir()
        && entry.path() != root
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Stats the path when the operation needs it and classifies the result.
///
/// Returns `None` for no-ops and for paths that vanished before the stat.
fn classify_path(path: &Path, op: RawOp) -> Option<ChangeEvent> {
    let kind = if op.is_removal() {
        FileKind::Unknown
    } else {
        match std::fs::metadata(path) {
            Ok(meta) => FileKind::from(&meta),
            Err(e) => {
                error!("Failed to stat event target {}: {}", path.display(), e);
                return None;
            }
        }
    };
    classify(op, kind).into_event(path)
}

/// Handle to a running filesystem watcher.
///
/// The watch loop runs on its own thread and owns the [`WatchedTree`].
/// Dropping the handle stops the loop, which releases the OS watches and
/// closes the event stream.
pub struct FsWatcher {
    control: std_mpsc::Sender<WatchMessage>,
    root: PathBuf,
}

impl FsWatcher {
    /// Registers every directory under `root` and starts the watch loop.
    ///
    /// # Errors
    ///
    /// Fails if the root cannot be resolved, the OS watcher cannot be created,
    /// or any directory of the initial walk cannot be registered.
    pub fn start(root: &Path) -> Result<(Self, Receiver<ChangeEvent>), WatchError> {
        let root = root.canonicalize().map_err(|source| WatchError::Root {
            root: root.to_path_buf(),
            source,
        })?;

        let (control_tx, control_rx) = std_mpsc::channel();
        let notify_tx = control_tx.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = notify_tx.send(WatchMessage::Raw(res));
        })?;

        let mut tree = WatchedTree::new(watcher, root.clone());
        let count = tree.register_tree(&root)?;
        info!(
            "Watching {} directories under {}",
            count,
            root.display()
        );

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        std::thread::Builder::new()
            .name("mdlive-watcher".into())
            .spawn(move || watch_loop(tree, control_rx, event_tx))
            .map_err(WatchError::Thread)?;

        Ok((
            Self {
                control: control_tx,
                root,
            },
            event_rx,
        ))
    }

    /// The canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        let _ = self.control.send(WatchMessage::Shutdown);
    }
}

/// Receives raw events, classifies them, updates the watch set and forwards
/// the survivors. Runs until shutdown or until the receiver is dropped.
fn watch_loop<W: Watcher>(
    mut tree: WatchedTree<W>,
    control_rx: std_mpsc::Receiver<WatchMessage>,
    event_tx: Sender<ChangeEvent>,
) {
    while let Ok(message) = control_rx.recv() {
        let event = match message {
            WatchMessage::Shutdown => break,
            WatchMessage::Raw(Ok(event)) => event,
            WatchMessage::Raw(Err(e)) => {
                error!("[WatcherThread] Caught notify error: {}", e);
                continue;
            }
        };

        for (path, op) in RawOp::split(&event.kind, &event.paths) {
            let Some(change) = classify_path(&path, op) else {
                continue;
            };
            tree.apply(&change);
            debug!("[WatcherThread] Produced event: {:?}", change);
            if event_tx.blocking_send(change).is_err() {
                warn!("[WatcherThread] Event receiver dropped. Watcher thread exiting.");
                return;
            }
        }
    }
    info!(
        "[WatcherThread] Stopped watching {} directories under {}",
        tree.dir_count(),
        tree.root().display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::NullWatcher;
    use std::fs;

    fn null_tree(root: &Path) -> WatchedTree<NullWatcher> {
        let watcher = NullWatcher::new(
            |_: notify::Result<notify::Event>| {},
            notify::Config::default(),
        )
        .unwrap();
        WatchedTree::new(watcher, root)
    }

    #[test]
    fn initial_walk_skips_hidden_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/guide")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("docs/.cache/deep")).unwrap();
        fs::write(root.join("README.md"), "# Hello").unwrap();

        let mut tree = null_tree(root);
        assert_eq!(tree.register_tree(root).unwrap(), 3);
        assert!(tree.contains(root));
        assert!(tree.contains(&root.join("docs")));
        assert!(tree.contains(&root.join("docs/guide")));
        assert!(!tree.contains(&root.join(".git")));
        assert!(!tree.contains(&root.join(".git/objects")));
        assert!(!tree.contains(&root.join("docs/.cache/deep")));
        assert!(!tree.contains(&root.join("README.md")));
    }

    #[test]
    fn hidden_root_is_still_watched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".site");
        fs::create_dir_all(root.join("pages")).unwrap();

        let mut tree = null_tree(&root);
        assert_eq!(tree.register_tree(&root).unwrap(), 2);
        assert!(tree.contains(&root.join("pages")));
    }

    #[test]
    fn create_rewalks_new_subtree_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut tree = null_tree(root);
        tree.register_tree(root).unwrap();

        fs::create_dir_all(root.join("new/nested")).unwrap();
        let created = ChangeEvent::new(root.join("new"), ChangeKind::Create);
        tree.apply(&created);
        assert!(tree.contains(&root.join("new/nested")));
        assert_eq!(tree.dir_count(), 3);

        // A duplicate create registers nothing twice.
        tree.apply(&created);
        assert_eq!(tree.dir_count(), 3);
    }

    #[test]
    fn created_hidden_directory_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut tree = null_tree(root);
        tree.register_tree(root).unwrap();

        fs::create_dir_all(root.join(".hidden/inner")).unwrap();
        tree.apply(&ChangeEvent::new(root.join(".hidden"), ChangeKind::Create));
        assert_eq!(tree.dir_count(), 1);
    }

    #[test]
    fn remove_drops_descendants_and_ignores_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("ab")).unwrap();
        let mut tree = null_tree(root);
        tree.register_tree(root).unwrap();

        assert_eq!(tree.deregister(&root.join("a")), 3);
        assert!(!tree.contains(&root.join("a/b/c")));
        assert!(tree.contains(&root.join("ab")));
        assert_eq!(tree.deregister(&root.join("never-there")), 0);
    }

    #[test]
    fn vanished_path_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone.md");
        assert!(classify_path(&gone, RawOp::Write).is_none());
        assert_eq!(
            classify_path(&gone, RawOp::Remove),
            Some(ChangeEvent::new(&gone, ChangeKind::Remove))
        );
    }
}
