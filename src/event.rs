// src/event.rs
use notify::event::{EventKind, ModifyKind, RenameMode};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Semantic kind of a classified filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A directory appeared under the watched root.
    Create,
    /// A file's content was written.
    Write,
    /// A path was removed or renamed away.
    Remove,
}

/// A classified filesystem change, consumed once by the change notifier.
///
/// # Fields
/// - `path`: The path of the file or directory affected by the event.
/// - `kind`: What happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The path of the file or directory affected by the event.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Raw operation reported by the OS notification backend, reduced to what
/// classification cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    Other,
}

impl RawOp {
    /// Rename and remove are classified without looking at the disk: the path
    /// may already be gone.
    pub fn is_removal(self) -> bool {
        matches!(self, RawOp::Remove | RawOp::Rename)
    }

    /// Splits a notify event into one raw operation per affected path.
    ///
    /// A rename reported with both ends becomes a rename of the old path and a
    /// create of the new one.
    pub fn split(kind: &EventKind, paths: &[PathBuf]) -> Vec<(PathBuf, RawOp)> {
        if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = kind {
            let mut ops = Vec::with_capacity(2);
            if let Some(from) = paths.first() {
                ops.push((from.clone(), RawOp::Rename));
            }
            if let Some(to) = paths.get(1) {
                ops.push((to.clone(), RawOp::Create));
            }
            return ops;
        }
        let op = RawOp::from(kind);
        paths.iter().map(|p| (p.clone(), op)).collect()
    }
}

impl From<&EventKind> for RawOp {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => RawOp::Create,
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => RawOp::Write,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => RawOp::Create,
            EventKind::Modify(ModifyKind::Name(_)) => RawOp::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => RawOp::Chmod,
            EventKind::Modify(ModifyKind::Other) => RawOp::Other,
            EventKind::Remove(_) => RawOp::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => RawOp::Other,
        }
    }
}

/// What a path currently is on disk. `Unknown` is used when the path was not
/// looked at, as for removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Unknown,
}

impl From<&Metadata> for FileKind {
    fn from(meta: &Metadata) -> Self {
        if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        }
    }
}

/// Result of classifying a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Create,
    Write,
    Remove,
    Noop,
}

impl Classification {
    /// Attaches a path, dropping no-ops.
    pub fn into_event(self, path: &Path) -> Option<ChangeEvent> {
        let kind = match self {
            Classification::Create => ChangeKind::Create,
            Classification::Write => ChangeKind::Write,
            Classification::Remove => ChangeKind::Remove,
            Classification::Noop => return None,
        };
        Some(ChangeEvent::new(path, kind))
    }
}

/// Maps a raw operation and the current kind of its path to a semantic change.
///
/// Only directory creation, file writes and removals matter for refresh and
/// watch-set upkeep; every other combination is a no-op.
pub fn classify(op: RawOp, kind: FileKind) -> Classification {
    match (op, kind) {
        (RawOp::Remove | RawOp::Rename, _) => Classification::Remove,
        (RawOp::Create, FileKind::Directory) => Classification::Create,
        (RawOp::Write, FileKind::File) => Classification::Write,
        (RawOp::Create | RawOp::Write, _) => Classification::Noop,
        (RawOp::Chmod | RawOp::Other, _) => Classification::Noop,
    }
}
