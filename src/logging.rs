//! `log` backend that appends to a file. The terminal belongs to the show while it
//! runs, so nothing is ever written to stderr from here.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{:.3} {:<5} {}: {}",
                stamp,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Install the file logger. Without a path no logger is installed and every
/// record is dropped by the facade.
pub fn init(path: Option<&Path>, level: LevelFilter) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let logger = FileLogger {
        level,
        file: Mutex::new(file),
    };

    log::set_boxed_logger(Box::new(logger))
        .map(|()| log::set_max_level(level))
        .map_err(|e| std::io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn filters_by_level_and_appends() {
        let path = std::env::temp_dir().join(format!("skyshow-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let file = OpenOptions::new().create(true).append(true).open(&path).unwrap();
        let logger = FileLogger {
            level: LevelFilter::Info,
            file: Mutex::new(file),
        };

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("skyshow::sky")
                .args(format_args!("burst"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("skyshow::sky")
                .args(format_args!("hidden"))
                .build(),
        );
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("INFO  skyshow::sky: burst"));
        assert!(!text.contains("hidden"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn no_path_is_a_no_op() {
        assert!(init(None, LevelFilter::Trace).is_ok());
    }
}
