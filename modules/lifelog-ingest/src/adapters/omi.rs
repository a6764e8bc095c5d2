//! Omi memory exports: `Memory from`, `Title:` and `Overview:` headers
//! followed by a `Transcript:` section that runs to the end of the file.

use super::{labeled, non_empty, ExportFile, TextAdapter};
use crate::error::ParseError;
use crate::timestamps::normalize_or_keep;
use lifelog_types::{BlockKind, CanonicalRecord, ContentBlock, SourceType};

pub struct OmiAdapter;

impl TextAdapter for OmiAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Omi
    }

    fn parse(&self, file: &ExportFile<'_>) -> Result<CanonicalRecord, ParseError> {
        let mut timestamp: Option<String> = None;
        let mut title = String::new();
        let mut overview = String::new();
        let mut transcript: Vec<&str> = Vec::new();
        let mut in_transcript = false;
        let mut recognized = false;

        for line in file.text.lines().map(str::trim) {
            if in_transcript {
                transcript.push(line);
            } else if line.is_empty() {
                continue;
            } else if let Some(v) = labeled(line, "Memory from") {
                timestamp = non_empty(v);
                recognized = true;
            } else if let Some(v) = labeled(line, "Title:") {
                title = v.to_string();
                recognized = true;
            } else if let Some(v) = labeled(line, "Overview:") {
                overview = v.to_string();
                recognized = true;
            } else if line == "Transcript:" {
                in_transcript = true;
                recognized = true;
            }
        }

        if !recognized {
            return Err(ParseError::new(
                file.path,
                "no Omi headers or transcript section found",
            ));
        }

        // Interior blank lines belong to the transcript, the edges do not.
        while transcript.first().is_some_and(|l| l.is_empty()) {
            transcript.remove(0);
        }
        while transcript.last().is_some_and(|l| l.is_empty()) {
            transcript.pop();
        }
        let transcript = transcript.join("\n");

        let origin = file.origin();
        let mut record = file
            .record(SourceType::Omi)
            .with_times(timestamp.map(|t| normalize_or_keep(&t, &origin)), None);
        record.contents = vec![
            ContentBlock::new(BlockKind::Heading1, title.clone()),
            ContentBlock::new(BlockKind::Heading2, overview.clone()),
            ContentBlock::new(BlockKind::Paragraph, transcript.clone()),
        ];
        record.title = non_empty(title);
        record.overview = non_empty(overview);
        record.transcript = non_empty(transcript);

        Ok(record)
    }
}
