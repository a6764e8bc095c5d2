//! Resume point detection for incremental remote runs.

use crate::timestamps::parse_rfc3339;
use chrono::{DateTime, Utc};
use lifelog_types::SourceType;
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Deserialize)]
struct StartTimeOnly {
    #[serde(rename = "startTime")]
    start_time: Option<String>,
}

/// Latest `startTime` among records of `source` already under `root`.
/// Unreadable or foreign files are ignored.
pub fn latest_start_time(root: &Path, source: SourceType) -> Option<DateTime<Utc>> {
    let prefix = format!("{}_", source.as_str());
    let mut latest: Option<DateTime<Utc>> = None;
    let mut scanned = 0usize;

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.starts_with(&prefix) || !name.ends_with(".json") {
            continue;
        }
        scanned += 1;

        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        let Ok(record) = serde_json::from_slice::<StartTimeOnly>(&bytes) else {
            continue;
        };
        let Some(t) = record.start_time.as_deref().and_then(parse_rfc3339) else {
            continue;
        };
        let t = t.with_timezone(&Utc);
        if latest.is_none_or(|current| t > current) {
            latest = Some(t);
        }
    }

    log::debug!(
        "[INGEST] Resume scan of {} checked {} {} files",
        root.display(),
        scanned,
        source
    );
    latest
}
