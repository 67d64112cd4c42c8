// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the [`ServerConfig`](crate::config::ServerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Merging defaults, the config file, environment and CLI failed.
    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    /// The directory to serve does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The directory to serve is a file or something else.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Errors that stop the filesystem watcher from starting.
///
/// Anything that goes wrong after startup is logged by the watch loop instead.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The OS notification backend could not be created or refused a path.
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The initial directory walk failed.
    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The root could not be resolved to an absolute path.
    #[error("failed to resolve {}: {source}", .root.display())]
    Root {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background watch thread could not be spawned.
    #[error("failed to spawn watcher thread: {0}")]
    Thread(std::io::Error),
}

/// Errors produced while turning a page into HTML.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The page template failed to load or execute.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}
