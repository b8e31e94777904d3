//! Logging setup shared by the binaries
//!
//! Logs go to stderr and to a daily file `casekit-YYYY-MM-DD.log` in the data
//! directory. Files older than a week are removed at startup.

use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "casekit-";
const KEEP_DAYS: i64 = 7;

/// Initialize tracing; returns the path of today's log file when it could be opened.
///
/// `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(log_dir: &Path, verbose: bool) -> Option<PathBuf> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("casekit_lib={lvl},casekit_cli={lvl},warn", lvl = default_level)));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file = fs::create_dir_all(log_dir).ok().and_then(|_| {
        prune_old_logs(log_dir, Local::now().date_naive());
        let path = log_dir.join(log_file_name(Local::now().date_naive()));
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()
            .map(|f| (f, path))
    });

    match file {
        Some((file, path)) => {
            let file_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            Some(path)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init();
            None
        }
    }
}

fn log_file_name(date: NaiveDate) -> String {
    format!("{}{}.log", LOG_PREFIX, date.format("%Y-%m-%d"))
}

/// Remove `casekit-YYYY-MM-DD.log` files older than a week. Returns how many were deleted.
pub fn prune_old_logs(log_dir: &Path, today: NaiveDate) -> usize {
    let cutoff = today - chrono::Duration::days(KEEP_DAYS);
    let mut removed = 0;

    let Ok(entries) = fs::read_dir(log_dir) else {
        return 0;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date_str) = name.strip_prefix(LOG_PREFIX).and_then(|s| s.strip_suffix(".log")) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            if date < cutoff && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();

        for name in [
            "casekit-2026-03-01.log",
            "casekit-2026-03-14.log",
            "casekit-2026-03-19.log",
            "casekit-garbage.log",
            "other-2026-01-01.log",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        let removed = prune_old_logs(dir.path(), today);
        assert_eq!(removed, 1);
        assert!(!dir.path().join("casekit-2026-03-01.log").exists());
        assert!(dir.path().join("casekit-2026-03-19.log").exists());
        assert!(dir.path().join("casekit-garbage.log").exists());
        assert!(dir.path().join("other-2026-01-01.log").exists());
    }

    #[test]
    fn test_log_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(log_file_name(date), "casekit-2026-01-05.log");
    }
}
