//! Date-partitioned JSON writer.
//!
//! Layout: `<root>/<source>/<YYYY>/<MM>/<DD>/<source>_<id>.json`.

use crate::error::WriteError;
use crate::timestamps::parse_rfc3339;
use chrono::{Datelike, NaiveDate, Utc};
use lifelog_types::CanonicalRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Existing files are treated as already correct.
    #[default]
    SkipExisting,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    Replaced(PathBuf),
    Skipped(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written(p) | WriteOutcome::Replaced(p) | WriteOutcome::Skipped(p) => p,
        }
    }
}

pub struct PartitionedWriter {
    root: PathBuf,
    policy: OverwritePolicy,
}

impl PartitionedWriter {
    pub fn new(root: impl Into<PathBuf>, policy: OverwritePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Calendar date of `startTime` as written, or today (UTC) when it is
    /// missing or not RFC 3339.
    pub fn partition_date(record: &CanonicalRecord) -> NaiveDate {
        match record.start_time.as_deref().and_then(parse_rfc3339) {
            Some(t) => t.date_naive(),
            None => {
                log::warn!(
                    "[WRITER] Bad startTime {:?} on {} {}, using current date",
                    record.start_time,
                    record.source_type,
                    record.id
                );
                Utc::now().date_naive()
            }
        }
    }

    pub fn path_for(&self, record: &CanonicalRecord) -> PathBuf {
        let date = Self::partition_date(record);
        self.root
            .join(record.source_type.as_str())
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
            .join(format!("{}.json", record.file_stem()))
    }

    /// Persists one record. The JSON is staged in a temporary file next to
    /// the destination and renamed into place, so readers never observe a
    /// partial record.
    pub fn write(&self, record: &CanonicalRecord) -> Result<WriteOutcome, WriteError> {
        let path = self.path_for(record);
        let existed = path.exists();
        if existed && self.policy == OverwritePolicy::SkipExisting {
            log::debug!("[WRITER] Skipping {}: already exists", path.display());
            return Ok(WriteOutcome::Skipped(path));
        }

        let dir = path
            .parent()
            .ok_or_else(|| WriteError::new(&path, "output path has no parent directory"))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| WriteError::new(&path, format!("creating directory: {}", e)))?;

        let mut json = serde_json::to_vec_pretty(record)
            .map_err(|e| WriteError::new(&path, format!("encoding JSON: {}", e)))?;
        json.push(b'\n');

        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| WriteError::new(&path, format!("creating temp file: {}", e)))?;
        staged
            .write_all(&json)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| WriteError::new(&path, format!("writing temp file: {}", e)))?;

        match self.policy {
            OverwritePolicy::Overwrite => {
                staged
                    .persist(&path)
                    .map_err(|e| WriteError::new(&path, e.error.to_string()))?;
                if existed {
                    Ok(WriteOutcome::Replaced(path))
                } else {
                    Ok(WriteOutcome::Written(path))
                }
            }
            OverwritePolicy::SkipExisting => match staged.persist_noclobber(&path) {
                Ok(_) => Ok(WriteOutcome::Written(path)),
                // Another run created it between the check and the rename.
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    Ok(WriteOutcome::Skipped(path))
                }
                Err(e) => Err(WriteError::new(&path, e.error.to_string())),
            },
        }
    }
}
