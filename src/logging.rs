//! File logging for hosts embedding the catalog.
//!
//! The library only emits `tracing` events; a host that wants them on disk
//! calls [`init_tracing`] once with its `[logging]` settings.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// What [`init_tracing`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// No log file configured.
    Disabled,
    /// A subscriber now writes to this file.
    File(PathBuf),
    /// Another subscriber was already installed and stays in place.
    AlreadyInstalled,
}

/// Install a global subscriber writing to `config.file`.
///
/// The file is created as `{file}.{timestamp}.{pid}` so several processes
/// can log side by side. `RUST_LOG` wins over `config.filter`; an invalid
/// filter falls back to `info`.
pub fn init_tracing(config: &LoggingConfig) -> io::Result<LogOutput> {
    let Some(base) = config.file.as_deref().filter(|f| !f.trim().is_empty()) else {
        return Ok(LogOutput::Disabled);
    };

    let path = unique_log_path(Path::new(base));
    let existed = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    match tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => Ok(LogOutput::File(path)),
        Err(_) => {
            if !existed {
                let _ = fs::remove_file(&path);
            }
            Ok(LogOutput::AlreadyInstalled)
        }
    }
}

fn unique_log_path(base: &Path) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}.{}", timestamp, std::process::id()));
    PathBuf::from(name)
}
