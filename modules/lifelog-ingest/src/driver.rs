//! Ingestion driver.
//!
//! Runs an adapter over its inputs one at a time, stamps bookkeeping onto
//! each record and hands it to the writer. Per-item failures are logged and
//! counted; only run-level conditions stop the batch.

use crate::adapters::TextAdapter;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::limitless_api::PageSource;
use crate::remote::RemoteAdapter;
use crate::writer::{OverwritePolicy, PartitionedWriter, WriteOutcome};
use chrono::{SecondsFormat, Utc};
use lifelog_types::{Bookkeeping, CanonicalRecord};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Written or replaced in this run.
    pub saved: usize,
    /// Already present and left untouched.
    pub skipped: usize,
    /// Parse or write failures.
    pub failed: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records saved ({} already present, {} failed)",
            self.saved, self.skipped, self.failed
        )
    }
}

pub struct Ingestor {
    writer: PartitionedWriter,
    export_version: String,
}

impl Ingestor {
    pub fn new(config: &IngestConfig, policy: OverwritePolicy) -> Self {
        Self {
            writer: PartitionedWriter::new(config.output_root.clone(), policy),
            export_version: config.export_version.clone(),
        }
    }

    fn bookkeeping(&self, source_file: String) -> Bookkeeping {
        Bookkeeping {
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            export_version: self.export_version.clone(),
            source_file,
        }
    }

    fn persist(&self, record: CanonicalRecord, source_file: String, summary: &mut IngestSummary) {
        let record = record.stamp(&self.bookkeeping(source_file));
        match self.writer.write(&record) {
            Ok(WriteOutcome::Skipped(path)) => {
                log::info!("[INGEST] Skipping {}: {} already exists", record.id, path.display());
                summary.skipped += 1;
            }
            Ok(outcome) => {
                log::info!("[INGEST] Saved {} -> {}", record.id, outcome.path().display());
                summary.saved += 1;
            }
            Err(e) => {
                log::warn!("[INGEST] Error saving {}: {}", record.id, e);
                summary.failed += 1;
            }
        }
    }

    /// Parses every file the adapter accepts in `dir`, in name order.
    pub fn ingest_directory(
        &self,
        adapter: &dyn TextAdapter,
        dir: &Path,
    ) -> Result<IngestSummary, IngestError> {
        let unreadable = |e: std::io::Error| IngestError::SourceUnreadable {
            path: dir.to_path_buf(),
            message: e.to_string(),
        };

        let mut inputs: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let path = entry.path();
            if path.is_file() && adapter.accepts(&path) {
                inputs.push(path);
            }
        }
        inputs.sort();

        log::info!(
            "[INGEST] {} {} files found in {}",
            inputs.len(),
            adapter.source_type(),
            dir.display()
        );

        let mut summary = IngestSummary::default();
        for path in inputs {
            match adapter.parse_file(&path) {
                Ok(record) => self.persist(record, absolute(&path), &mut summary),
                Err(e) => {
                    log::warn!("[INGEST] Skipping {}", e);
                    summary.failed += 1;
                }
            }
        }

        log::info!("[INGEST] Done. {}", summary);
        Ok(summary)
    }

    /// Drains the remote adapter page by page. Records already written stay
    /// on disk when a fatal error ends the run.
    pub async fn ingest_remote<S: PageSource>(
        &self,
        remote: &mut RemoteAdapter<S>,
    ) -> Result<IngestSummary, IngestError> {
        let endpoint = remote.endpoint().to_string();
        let mut summary = IngestSummary::default();

        loop {
            let page = match remote.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    log::error!("[INGEST] Aborting run: {}. So far: {}", e, summary);
                    return Err(e);
                }
            };

            log::info!(
                "[INGEST] Page {}: {} in range, {} outside window, {} skipped",
                page.number,
                page.records.len(),
                page.filtered,
                page.skipped
            );
            summary.failed += page.skipped;
            for record in page.records {
                self.persist(record, endpoint.clone(), &mut summary);
            }
        }

        log::info!("[INGEST] Done. {}", summary);
        Ok(summary)
    }
}

fn absolute(path: &Path) -> String {
    std::fs::canonicalize(path)
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::text_adapter;
    use crate::error::ApiError;
    use crate::remote::tests::{lifelog, page, ScriptedSource};
    use crate::remote::DateWindow;
    use lifelog_types::{BlockKind, SourceType};
    use std::collections::BTreeMap;
    use walkdir::WalkDir;

    fn config(root: &Path) -> IngestConfig {
        IngestConfig {
            output_root: root.to_path_buf(),
            export_version: "test 0.0.1".to_string(),
            ..IngestConfig::default()
        }
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), std::fs::read(e.path()).unwrap()))
            .collect()
    }

    fn bee_inputs(dir: &Path) {
        std::fs::write(
            dir.join("one.txt"),
            "Start: 2025-06-01T08:00:00Z\nShort Summary: demo\nSummary:\nhello\nTranscription:\nworld\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("two.txt"),
            "Start Time: Jul 7, 2025 at 10:14 AM\nShort Summary: coffee\n",
        )
        .unwrap();
        std::fs::write(dir.join("empty.txt"), "\n\n").unwrap();
        std::fs::write(dir.join("notes.md"), "ignored").unwrap();
    }

    #[test]
    fn test_directory_run_writes_stamped_records() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        bee_inputs(input.path());

        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);
        let summary = ingestor
            .ingest_directory(text_adapter(SourceType::Bee).unwrap(), input.path())
            .unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                saved: 2,
                skipped: 0,
                failed: 1
            }
        );

        let path = output.path().join("bee/2025/06/01/bee_one.json");
        let record: CanonicalRecord =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(record.id, "one");
        assert_eq!(record.title.as_deref(), Some("demo"));
        assert_eq!(record.overview.as_deref(), Some("hello"));
        assert_eq!(record.transcript.as_deref(), Some("world"));
        let kinds: Vec<BlockKind> = record.contents.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Heading1, BlockKind::Heading2, BlockKind::Paragraph]
        );
        assert_eq!(record.export_version, "test 0.0.1");
        assert!(Path::new(&record.source_file).is_absolute());
        assert!(record.source_file.ends_with("one.txt"));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.export_date).is_ok());

        assert!(output.path().join("bee/2025/07/07/bee_two.json").is_file());
    }

    #[test]
    fn test_second_run_leaves_tree_unchanged() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        bee_inputs(input.path());
        let adapter = text_adapter(SourceType::Bee).unwrap();
        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);

        ingestor.ingest_directory(adapter, input.path()).unwrap();
        let first = snapshot(output.path());

        let summary = ingestor.ingest_directory(adapter, input.path()).unwrap();
        assert_eq!(summary.saved, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(snapshot(output.path()), first);
    }

    #[test]
    fn test_force_overwrite_rewrites_existing_records() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        bee_inputs(input.path());
        let adapter = text_adapter(SourceType::Bee).unwrap();

        Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting)
            .ingest_directory(adapter, input.path())
            .unwrap();
        let summary = Ingestor::new(&config(output.path()), OverwritePolicy::Overwrite)
            .ingest_directory(adapter, input.path())
            .unwrap();
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_unreadable_source_directory_is_fatal() {
        let output = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);
        let err = ingestor
            .ingest_directory(
                text_adapter(SourceType::Omi).unwrap(),
                &output.path().join("missing"),
            )
            .unwrap_err();
        assert!(matches!(err, IngestError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_write_failure_does_not_stop_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        bee_inputs(input.path());
        // A plain file where the bee/2025 directory would go.
        std::fs::create_dir_all(output.path().join("bee")).unwrap();
        std::fs::write(output.path().join("bee/2025"), b"blocker").unwrap();

        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);
        let summary = ingestor
            .ingest_directory(text_adapter(SourceType::Bee).unwrap(), input.path())
            .unwrap();
        assert_eq!(summary.saved, 0);
        assert_eq!(summary.failed, 3);
    }

    #[tokio::test]
    async fn test_remote_run_writes_every_page() {
        let output = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![
            page(
                vec![
                    lifelog("b", "2025-07-04T12:00:00Z"),
                    lifelog("a", "2025-07-04T10:00:00Z"),
                ],
                Some("c1"),
            ),
            page(vec![lifelog("c", "2025-07-05T09:00:00Z")], None),
        ]);
        let mut remote = RemoteAdapter::new(source, DateWindow::default());
        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);

        let summary = ingestor.ingest_remote(&mut remote).await.unwrap();
        assert_eq!(summary.saved, 3);

        let path = output.path().join("limitless/2025/07/04/limitless_a.json");
        let record: CanonicalRecord =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(record.source_file, "https://api.test/v1/lifelogs");
        assert_eq!(record.raw.as_json(), Some(&lifelog("a", "2025-07-04T10:00:00Z")));
        assert!(output.path().join("limitless/2025/07/05/limitless_c.json").is_file());
    }

    #[tokio::test]
    async fn test_fatal_remote_error_keeps_written_records() {
        let output = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![
            page(vec![lifelog("a", "2025-07-04T10:00:00Z")], Some("c1")),
            Err(ApiError::Status {
                code: 500,
                body: "boom".into(),
            }),
        ]);
        let mut remote = RemoteAdapter::new(source, DateWindow::default());
        let ingestor = Ingestor::new(&config(output.path()), OverwritePolicy::SkipExisting);

        let err = ingestor.ingest_remote(&mut remote).await.unwrap_err();
        assert!(matches!(err, IngestError::Api { page: 2, .. }));
        assert!(output.path().join("limitless/2025/07/04/limitless_a.json").is_file());
    }
}
