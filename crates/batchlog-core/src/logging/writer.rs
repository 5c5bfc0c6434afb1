//! JSONL log files: one file per instance per day.
//!
//! ```text
//! logs/
//! └── raw/
//!     ├── 2026-10-15_api.jsonl
//!     └── 2026-10-15_worker.jsonl
//! ```
//!
//! Files are opened in append mode. A [`WriterSink`](crate::WriterSink) over
//! the returned file writes each batch with a single `write_all`.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tracing::warn;

use super::entry::LogRecord;
use crate::error::BatchResult;

/// Path of today's log file for `instance` under `logs_dir`.
pub fn log_file_path(logs_dir: impl AsRef<Path>, instance: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    logs_dir
        .as_ref()
        .join("raw")
        .join(format!("{}_{}.jsonl", date, instance))
}

/// Open (creating if needed) today's log file for `instance` in append mode.
pub async fn open_log_file(
    logs_dir: impl AsRef<Path>,
    instance: &str,
) -> std::io::Result<(PathBuf, File)> {
    let path = log_file_path(logs_dir, instance);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    Ok((path, file))
}

/// Read every record from a JSONL file.
///
/// Blank lines are skipped. Lines that fail to parse are logged and skipped
/// so one torn write does not hide the rest of the file.
pub async fn read_records(path: impl AsRef<Path>) -> BatchResult<Vec<LogRecord>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;

    let mut records = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match LogRecord::from_json_line(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), line = lineno + 1, error = %e, "Skipping malformed log line");
            }
        }
    }

    Ok(records)
}

/// Read all JSONL files under `logs_dir/raw`, sorted by timestamp.
pub async fn read_all_records(logs_dir: impl AsRef<Path>) -> BatchResult<Vec<LogRecord>> {
    let raw_dir = logs_dir.as_ref().join("raw");
    if !tokio::fs::try_exists(&raw_dir).await? {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    let mut entries = tokio::fs::read_dir(&raw_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "jsonl").unwrap_or(false) {
            records.extend(read_records(&path).await?);
        }
    }

    // Stable sort keeps per-file order for equal timestamps
    records.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(records)
}
