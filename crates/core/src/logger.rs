use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// `log` backend: plain lines appended to a dated file, echoed to stderr.
struct Logger {
    file: Mutex<Option<File>>,
    echo: bool,
    level: LevelFilter,
}

/// Directory the logger writes into, if initialized.
static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global logger. Appends to `<log_dir>/ranger-YYYYMMDD.log`.
/// Later calls are ignored.
pub fn init(log_dir: &Path, level: LevelFilter, echo: bool) {
    fs::create_dir_all(log_dir).ok();
    let log_path = log_dir.join(format!("ranger-{}.log", Local::now().format("%Y%m%d")));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eprintln!("failed to open log file {}: {}", log_path.display(), e))
        .ok();

    let logger = LOGGER.get_or_init(|| Logger { file: Mutex::new(file), echo, level });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
        LOG_DIR.set(log_dir.to_path_buf()).ok();
    }
}

pub fn log_dir() -> Option<&'static Path> {
    LOG_DIR.get().map(PathBuf::as_path)
}

/// Plain-text line: `[ts] [LEVEL] [target] msg`.
fn format_line(ts: &str, level: Level, target: &str, msg: &str) -> String {
    if target.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, target, msg)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ts = Local::now().format("%H:%M:%S").to_string();
        // Module-path targets (crate::mod) are noise; keep short component names.
        let target = if record.target().contains("::") { "" } else { record.target() };
        let line = format_line(&ts, record.level(), target, &record.args().to_string());

        if let Ok(mut file) = self.file.lock() {
            if let Some(f) = file.as_mut() {
                writeln!(f, "{}", line).ok();
            }
        }
        if self.echo {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            if let Some(f) = file.as_mut() {
                f.flush().ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_with_target() {
        let line = format_line("12:00:00", Level::Warn, "input", "bad coordinate (-1, -1)");
        assert_eq!(line, "[12:00:00] [WARN] [input] bad coordinate (-1, -1)");
    }

    #[test]
    fn test_format_line_without_target() {
        assert_eq!(format_line("t", Level::Info, "", "hello"), "[t] [INFO] hello");
    }
}
