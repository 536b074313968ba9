//! File logging setup.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::LoggingConfig;

/// Install the global logger according to the config. A disabled config
/// leaves logging uninitialized and every `log` macro a no-op.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let log_path = log_file_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ));
        })
        .level(log::LevelFilter::Debug)
        .chain(fern::log_file(&log_path).with_context(|| {
            format!("Failed to open log file: {}", log_path.display())
        })?)
        .apply()
        .context("Logger already initialized")?;

    Ok(())
}

fn log_file_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        .join("liftlog");
    Ok(dir.join("liftlog.log"))
}
