// src/lib.rs

#![doc = r#"
# mdlive

mdlive serves a directory over HTTP, renders Markdown files as styled HTML and
reloads connected browsers whenever a watched file is written.

## Modules

- [`config`]: Configuration loading and merging from CLI, file, and environment.
- [`event`]: Change events and the classification of raw filesystem events.
- [`watcher`]: Recursive directory watcher that keeps the watch set current.
- [`notifier`]: Turns classified writes into refresh signals.
- [`render`]: Markdown rendering with not-found and error fallbacks.
- [`web`]: Request routing and the HTTP application.
- [`livereload`]: WebSocket reload hub and client script.
- [`assets`]: Embedded stylesheets.
- [`server`]: Wires everything together.
- [`logger`]: Tracing subscriber setup.
"#]

pub mod assets;
pub mod config;
pub mod error;
pub mod event;
pub mod livereload;
pub mod logger;
pub mod notifier;
pub mod render;
pub mod server;
pub mod watcher;
pub mod web;
