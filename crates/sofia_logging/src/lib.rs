//! Shared logging setup for the audit tooling.
//!
//! Installs a `tracing` subscriber with two layers: a size-rotated log file
//! under `<home>/logs` and a stderr console layer. Both honour `RUST_LOG`.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "sofia_audit=info,sofia_db=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Environment variable overriding the tooling home directory.
pub const HOME_ENV: &str = "SOFIA_AUDIT_HOME";

/// Logging configuration for a binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
}

/// Initialize tracing with a rolling file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = LogHandle::open(log_dir, config.app_name)
        .context("Failed to initialize rolling log writer")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// Tooling home directory: `$SOFIA_AUDIT_HOME` or `~/.sofia_audit`.
pub fn tooling_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".sofia_audit"))
        .ok_or_else(|| anyhow!("Could not determine home directory; set {}", HOME_ENV))
}

/// Logs directory: `<home>/logs`.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(tooling_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Size-capped log file with numbered backups; `<app>.log.1` is the newest.
struct RotatingLog {
    path: PathBuf,
    keep: usize,
    limit: u64,
    state: Mutex<OpenLog>,
}

struct OpenLog {
    file: File,
    written: u64,
}

impl RotatingLog {
    fn open(dir: &Path, app_name: &str, keep: usize, limit: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", log_file_stem(app_name)));
        let log = Self {
            state: Mutex::new(open_append(&path)?),
            path,
            keep: keep.max(1),
            limit,
        };
        {
            let mut state = log.lock()?;
            if state.written > log.limit {
                log.roll(&mut state)?;
            }
        }
        Ok(log)
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, OpenLog>> {
        self.state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
    }

    fn backup(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    /// Drop the oldest backup, shift the rest up by one, start a fresh file.
    fn roll(&self, state: &mut OpenLog) -> io::Result<()> {
        state.file.flush()?;
        let backups = self.keep - 1;
        if backups > 0 {
            if let Err(e) = fs::remove_file(self.backup(backups)) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Err(e);
                }
            }
            for n in (1..backups).rev() {
                let from = self.backup(n);
                if from.exists() {
                    fs::rename(&from, self.backup(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
        } else {
            fs::remove_file(&self.path)?;
        }
        *state = open_append(&self.path)?;
        Ok(())
    }

    fn append(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock()?;
        if state.written > 0 && state.written + buf.len() as u64 > self.limit {
            self.roll(&mut state)?;
        }
        let n = state.file.write(buf)?;
        state.written += n as u64;
        Ok(n)
    }
}

fn open_append(path: &Path) -> io::Result<OpenLog> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = file.metadata()?.len();
    Ok(OpenLog { file, written })
}

/// Shared handle handed to the fmt layer.
#[derive(Clone)]
struct LogHandle(Arc<RotatingLog>);

impl LogHandle {
    fn open(dir: PathBuf, app_name: &str) -> Result<Self> {
        let log = RotatingLog::open(&dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", app_name))?;
        Ok(Self(Arc::new(log)))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogHandle {
    type Writer = LogHandle;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for LogHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock()?.file.flush()
    }
}

/// App names become file names; anything but `[A-Za-z0-9_-]` is replaced.
fn log_file_stem(app_name: &str) -> String {
    app_name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_name_is_made_file_safe() {
        assert_eq!(log_file_stem("sofia_audit"), "sofia_audit");
        assert_eq!(log_file_stem("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_rolls_over_when_limit_reached() {
        let tmp = TempDir::new().unwrap();
        let log = RotatingLog::open(tmp.path(), "audit", 3, 16).unwrap();

        log.append(b"0123456789").unwrap();
        log.append(b"abcdefghij").unwrap();

        let current = fs::read_to_string(tmp.path().join("audit.log")).unwrap();
        let backup = fs::read_to_string(tmp.path().join("audit.log.1")).unwrap();
        assert_eq!(backup, "0123456789");
        assert_eq!(current, "abcdefghij");
    }

    #[test]
    fn test_keeps_at_most_configured_files() {
        let tmp = TempDir::new().unwrap();
        let log = RotatingLog::open(tmp.path(), "audit", 2, 4).unwrap();

        for chunk in [b"aaaa", b"bbbb", b"cccc", b"dddd"] {
            log.append(chunk).unwrap();
        }

        assert_eq!(fs::read_to_string(tmp.path().join("audit.log")).unwrap(), "dddd");
        assert_eq!(fs::read_to_string(tmp.path().join("audit.log.1")).unwrap(), "cccc");
        assert!(!tmp.path().join("audit.log.2").exists());
    }

    #[test]
    fn test_oversized_existing_file_is_rolled_on_open() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("audit.log"), "x".repeat(32)).unwrap();

        let _log = RotatingLog::open(tmp.path(), "audit", 3, 16).unwrap();

        assert_eq!(fs::metadata(tmp.path().join("audit.log")).unwrap().len(), 0);
        assert!(tmp.path().join("audit.log.1").exists());
    }
}
