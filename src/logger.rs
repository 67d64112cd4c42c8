// src/logger.rs

//! Process-wide logging setup.
//!
//! Components only emit through `tracing` macros; whoever owns the process
//! installs the subscriber. The binary installs a global one writing to
//! stderr, tests install a scoped one with a capturing writer.

use std::io::IsTerminal;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` wins, then `level`, then `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Builds a formatted subscriber writing to `writer`.
pub fn subscriber<W>(level: &str, writer: W, ansi: bool) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_ansi(ansi)
        .with_writer(writer)
        .finish()
}

/// Installs the global subscriber logging to stderr, colored on a terminal.
pub fn init(level: &str) -> Result<(), SetGlobalDefaultError> {
    let ansi = std::io::stderr().is_terminal();
    tracing::subscriber::set_global_default(subscriber(level, std::io::stderr, ansi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn level_filters_lines() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let captured = Captured::default();
        let writer = captured.clone();
        let sub = subscriber("warn", move || writer.clone(), false);

        tracing::subscriber::with_default(sub, || {
            tracing::info!("quiet line");
            tracing::warn!("loud line");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains("quiet line"));
        assert!(output.contains("loud line"));
    }
}
