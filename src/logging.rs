use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::Level;

pub const LOG_PREFIX: &str = "[data_measurements_tool]";

/// Lines at or above this level are echoed to stderr; everything that
/// passes the filter goes to the log file.
pub const STDERR_LEVEL: Level = Level::Warn;

fn echo_to_stderr(level: Level) -> bool {
    level <= STDERR_LEVEL
}

fn format_line(timestamp: impl Display, level: Level, message: impl Display) -> String {
    format!("{timestamp} {LOG_PREFIX} {level:<5} {message}\n")
}

/// Initialise `env_logger`: `<log_dir>/app.log` receives every line that
/// passes the filter, stderr only warnings and errors.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let path = log_dir.join("app.log");
    let file: Mutex<File> = Mutex::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let line = format_line(buf.timestamp(), record.level(), record.args());
            if let Ok(mut file) = file.lock() {
                file.write_all(line.as_bytes())?;
            }
            if echo_to_stderr(record.level()) {
                buf.write_all(line.as_bytes())?;
            }
            Ok(())
        })
        .target(env_logger::Target::Stderr)
        .try_init()
        .context("installing logger")?;
    Ok(())
}
