//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr,
//! with a minimum level applied to info and error output.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Global log writer instance
static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log verbosity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    /// Parse a configured level name; unknown names fall back to `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }
}

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

/// Thread-safe log writer
pub struct LogWriter {
    level: Level,
    /// Access and info log target
    access: LogTarget,
    /// Error log target
    error: LogTarget,
}

impl LogWriter {
    /// Create a new log writer with optional file paths
    fn new(
        level: Level,
        access_log_file: Option<&str>,
        error_log_file: Option<&str>,
        info_to_stderr: bool,
    ) -> io::Result<Self> {
        let access = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None if info_to_stderr => LogTarget::Stderr,
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self {
            level,
            access,
            error,
        })
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Write to access log
    pub fn write_access(&self, message: &str) {
        write_to_target(&self.access, message);
    }

    /// Write to error log
    pub fn write_error(&self, message: &str) {
        write_to_target(&self.error, message);
    }

    /// Write info message (to access log target)
    pub fn write_info(&self, message: &str) {
        write_to_target(&self.access, message);
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write message to log target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => {
            println!("{message}");
        }
        LogTarget::Stderr => {
            eprintln!("{message}");
        }
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened.
pub fn init(
    level: Level,
    access_log_file: Option<&str>,
    error_log_file: Option<&str>,
    info_to_stderr: bool,
) -> io::Result<()> {
    let writer = LogWriter::new(level, access_log_file, error_log_file, info_to_stderr)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// Get the global log writer
///
/// Panics if `init()` has not been called.
pub fn get() -> &'static LogWriter {
    LOG_WRITER
        .get()
        .expect("Log writer not initialized. Call logger::writer::init() first.")
}

/// Check if the log writer has been initialized
pub fn is_initialized() -> bool {
    LOG_WRITER.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_level_parse_and_order() {
        assert_eq!(Level::parse("ERROR"), Level::Error);
        assert_eq!(Level::parse("warning"), Level::Warn);
        assert_eq!(Level::parse("debug"), Level::Debug);
        assert_eq!(Level::parse("verbose"), Level::Info);
        assert!(Level::Error < Level::Info);
    }

    #[test]
    fn test_writer_filters_and_writes_to_file() {
        let dir = TempDir::new().unwrap();
        let access = dir.path().join("logs/access.log");
        let writer =
            LogWriter::new(Level::Warn, Some(access.to_str().unwrap()), None, false).unwrap();

        assert!(writer.enabled(Level::Error));
        assert!(writer.enabled(Level::Warn));
        assert!(!writer.enabled(Level::Info));

        writer.write_access("GET /products 200");
        let mut contents = String::new();
        File::open(&access)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "GET /products 200\n");
    }
}
