//! JSON-lines audit store
//!
//! Entries are appended to `audit_YYYYMMDD.jsonl` in the configured directory,
//! one file per UTC day of the entry's timestamp. Reads skip malformed lines
//! with a warning instead of failing the whole query.

use crate::{AuditBackend, AuditError, AuditFilter, AuditLog};
use chrono::NaiveDate;
use medveil_domain::AuditEntry;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

const FILE_PREFIX: &str = "audit_";
const FILE_SUFFIX: &str = ".jsonl";

/// Durable audit store backed by daily JSON-lines files
#[derive(Debug)]
pub struct JsonlAuditStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Open a store, creating the directory if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened audit log directory");
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Directory holding the log files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file an entry for `date` goes to
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, date.format("%Y%m%d"), FILE_SUFFIX))
    }

    fn log_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>, AuditError> {
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            let date = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix(FILE_PREFIX))
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                .and_then(|stamp| NaiveDate::parse_from_str(stamp, "%Y%m%d").ok());
            if let Some(date) = date {
                files.push((date, path));
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(
        path: &Path,
        filter: &AuditFilter,
        out: &mut Vec<AuditEntry>,
    ) -> Result<(), AuditError> {
        let reader = BufReader::new(fs::File::open(path)?);
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) if filter.matches(&entry) => out.push(entry),
                Ok(_) => {}
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(file = %path.display(), skipped, "Skipped malformed audit lines");
        }
        Ok(())
    }
}

impl AuditLog for JsonlAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(entry.timestamp.date_naive()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let since_day = filter.since.map(|t| t.date_naive());
        let until_day = filter.until.map(|t| t.date_naive());

        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut selected = Vec::new();
        for (date, path) in self.log_files()? {
            if since_day.is_some_and(|d| date < d) || until_day.is_some_and(|d| date > d) {
                continue;
            }
            Self::read_file(&path, filter, &mut selected)?;
        }
        drop(guard);

        Ok(filter.apply(selected))
    }

    fn backend(&self) -> AuditBackend {
        AuditBackend::Jsonl
    }
}
