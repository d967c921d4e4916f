//! Tracing setup.
//!
//! The TUI owns the terminal, so in TUI mode logs go to a file. Headless modes log to stderr.

use crate::cli::Cli;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("arbitrage-watch")
        .join("arbitrage-watch.log")
}

/// Level used when `RUST_LOG` is unset. Headless modes share stderr with their report,
/// so only warnings show there.
fn default_level(args: &Cli) -> &'static str {
    if args.is_headless() {
        "warn"
    } else {
        "info"
    }
}

pub fn init(args: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(args)));

    if args.is_headless() && args.log_file.is_none() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_level_depends_on_mode() {
        let tui = Cli::parse_from(["arbitrage-watch"]);
        assert_eq!(default_level(&tui), "info");
        for flag in ["--list", "--run"] {
            let headless = Cli::parse_from(["arbitrage-watch", flag]);
            assert_eq!(default_level(&headless), "warn", "{flag}");
        }
        let show = Cli::parse_from(["arbitrage-watch", "--show", "120000"]);
        assert_eq!(default_level(&show), "warn");
    }
}
