// ABOUTME: Append-only event log shared by host sessions.
// ABOUTME: Writes one timestamped line per connect, command, and transfer event.

use chrono::Local;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOGGER_NAME: &str = "hostssh";

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

/// Handle to the event log. Clones append to the same file.
#[derive(Clone, Default)]
pub struct EventLog {
    sink: Option<Arc<Sink>>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("path", &self.path())
            .finish()
    }
}

impl EventLog {
    /// A log that discards every event.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Create a fresh log file named after the current time inside `dir`.
    pub fn create(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = format!("{}_{LOGGER_NAME}.log", Local::now().format("%Y-%m-%d_%H-%M-%S"));
        Self::open(dir.join(name))
    }

    /// Append to `path`, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            sink: Some(Arc::new(Sink {
                path,
                file: Mutex::new(file),
            })),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_deref().map(|s| s.path.as_path())
    }

    pub fn info(&self, host: &str, message: impl fmt::Display) {
        tracing::info!(host, "{}", message);
        self.write(Level::Info, host, &message);
    }

    pub fn warn(&self, host: &str, message: impl fmt::Display) {
        tracing::warn!(host, "{}", message);
        self.write(Level::Warn, host, &message);
    }

    pub fn error(&self, host: &str, message: impl fmt::Display) {
        tracing::error!(host, "{}", message);
        self.write(Level::Error, host, &message);
    }

    fn write(&self, level: Level, host: &str, message: &dyn fmt::Display) {
        let Some(sink) = &self.sink else {
            return;
        };
        let line = format!(
            "{} - {LOGGER_NAME} - {level} - {host}: {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f")
        );
        let mut file = sink.file.lock();
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            tracing::warn!(path = %sink.path.display(), "failed to write event log: {}", e);
        }
    }
}
