//! Bee pendant exports: header fields, a summary section, a transcription
//! section and an optional primary location.

use super::{labeled, non_empty, ExportFile, TextAdapter};
use crate::error::ParseError;
use crate::timestamps::normalize_or_keep;
use lifelog_types::{BlockKind, CanonicalRecord, ContentBlock, Location, SourceType};
use std::iter::Peekable;

pub struct BeeAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Summary,
    Transcription,
    Location,
}

#[derive(Default)]
struct BeeFields {
    start_time: Option<String>,
    end_time: Option<String>,
    device_type: Option<String>,
    short_summary: String,
    summary: Vec<String>,
    transcription: Vec<String>,
    location: Location,
    /// At least one header or section marker was present.
    recognized: bool,
}

const START_LABELS: &[&str] = &["Start Time:", "Start:"];
const END_LABELS: &[&str] = &["End Time:", "End:"];
const ADDRESS_LABELS: &[&str] = &["Address:", "bAddress:"];

fn labeled_any<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels.iter().find_map(|label| labeled(line, label))
}

const SECTION_MARKERS: &[&str] = &["Summary:", "Transcription:", "Primary Location:"];
const HEADER_LABELS: &[&[&str]] = &[
    START_LABELS,
    END_LABELS,
    ADDRESS_LABELS,
    &["Device Type:", "Short Summary:", "Latitude:", "Longitude:"],
];

/// True for lines that start a header or a section of their own.
fn is_structural(line: &str) -> bool {
    SECTION_MARKERS.iter().any(|m| line.starts_with(m))
        || HEADER_LABELS
            .iter()
            .any(|labels| labeled_any(line, labels).is_some())
}

/// A header with nothing after the label takes the following line as its
/// value, unless that line is itself a header or section marker.
fn header_value<'a, I>(value: &'a str, lines: &mut Peekable<I>) -> String
where
    I: Iterator<Item = &'a str>,
{
    if !value.is_empty() {
        return value.to_string();
    }
    match lines.next_if(|next| !is_structural(next)) {
        Some(next) => next.to_string(),
        None => String::new(),
    }
}

fn scan(text: &str) -> BeeFields {
    let mut fields = BeeFields::default();
    let mut section = Section::None;
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();

    while let Some(line) = lines.next() {
        if is_structural(line) {
            fields.recognized = true;
        }
        if let Some(v) = labeled_any(line, START_LABELS) {
            fields.start_time = non_empty(header_value(v, &mut lines));
        } else if let Some(v) = labeled_any(line, END_LABELS) {
            fields.end_time = non_empty(header_value(v, &mut lines));
        } else if let Some(v) = labeled(line, "Device Type:") {
            fields.device_type = non_empty(header_value(v, &mut lines));
        } else if let Some(v) = labeled(line, "Short Summary:") {
            fields.short_summary = header_value(v, &mut lines);
        } else if line == "Summary:" {
            section = Section::Summary;
        } else if line == "Transcription:" {
            section = Section::Transcription;
        } else if line.starts_with("Primary Location:") {
            section = Section::Location;
        } else if let Some(v) = labeled(line, "Latitude:") {
            fields.location.latitude = non_empty(header_value(v, &mut lines));
        } else if let Some(v) = labeled(line, "Longitude:") {
            fields.location.longitude = non_empty(header_value(v, &mut lines));
        } else if let Some(v) = labeled_any(line, ADDRESS_LABELS) {
            fields.location.address = non_empty(header_value(v, &mut lines));
        } else {
            match section {
                Section::Summary => fields.summary.push(line.to_string()),
                Section::Transcription => fields.transcription.push(line.to_string()),
                Section::None | Section::Location => {}
            }
        }
    }

    fields
}

impl TextAdapter for BeeAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Bee
    }

    fn parse(&self, file: &ExportFile<'_>) -> Result<CanonicalRecord, ParseError> {
        let fields = scan(&file.text);
        if !fields.recognized {
            return Err(ParseError::new(
                file.path,
                "no Bee headers or sections found",
            ));
        }
        let origin = file.origin();

        let summary = fields.summary.join("\n");
        let transcription = fields.transcription.join("\n");

        let mut record = file.record(SourceType::Bee).with_times(
            fields.start_time.map(|t| normalize_or_keep(&t, &origin)),
            fields.end_time.map(|t| normalize_or_keep(&t, &origin)),
        );
        record.contents = vec![
            ContentBlock::new(BlockKind::Heading1, fields.short_summary.clone()),
            ContentBlock::new(BlockKind::Heading2, summary.clone()),
            ContentBlock::new(BlockKind::Paragraph, transcription.clone()),
        ];
        record.title = non_empty(fields.short_summary);
        record.overview = non_empty(summary);
        record.transcript = non_empty(transcription);
        record.device_type = fields.device_type;
        if !fields.location.is_empty() {
            record.location = Some(fields.location);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(text: &str) -> CanonicalRecord {
        BeeAdapter
            .parse_bytes(Path::new("exports/conv-42.txt"), text.as_bytes().to_vec())
            .unwrap()
    }

    #[test]
    fn test_short_export_maps_to_canonical_record() {
        let record = parse(
            "Start: 2025-06-01T08:00:00Z\n\
             Short Summary: demo\n\
             \n\
             Summary:\n\
             hello\n\
             \n\
             Transcription:\n\
             world\n",
        );

        assert_eq!(record.id, "conv-42");
        assert_eq!(record.source_type, SourceType::Bee);
        assert_eq!(record.start_time.as_deref(), Some("2025-06-01T08:00:00Z"));
        assert_eq!(record.end_time.as_deref(), Some("2025-06-01T08:00:00Z"));
        assert_eq!(record.title.as_deref(), Some("demo"));
        assert_eq!(record.overview.as_deref(), Some("hello"));
        assert_eq!(record.transcript.as_deref(), Some("world"));

        let kinds: Vec<_> = record.contents.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Heading1, BlockKind::Heading2, BlockKind::Paragraph]
        );
    }

    #[test]
    fn test_full_export_with_location() {
        let record = parse(
            "Start Time: Jul 7, 2025 at 10:14 AM\n\
             End Time:\n\
             Jul 7, 2025 at 10:45 AM\n\
             Device Type: Bee Pioneer\n\
             Short Summary: Coffee planning\n\
             Summary:\n\
             Talked about beans.\n\
             Picked a roaster.\n\
             Transcription:\n\
             Speaker 1: morning\n\
             Speaker 2: hi\n\
             Primary Location:\n\
             Latitude: 47.6\n\
             Longitude: -122.3\n\
             bAddress: 1 Pike St\n\
             somewhere near the market\n",
        );

        assert_eq!(record.start_time.as_deref(), Some("2025-07-07T10:14:00Z"));
        assert_eq!(record.end_time.as_deref(), Some("2025-07-07T10:45:00Z"));
        assert_eq!(record.device_type.as_deref(), Some("Bee Pioneer"));
        assert_eq!(
            record.overview.as_deref(),
            Some("Talked about beans.\nPicked a roaster.")
        );
        assert_eq!(
            record.transcript.as_deref(),
            Some("Speaker 1: morning\nSpeaker 2: hi")
        );
        let location = record.location.unwrap();
        assert_eq!(location.latitude.as_deref(), Some("47.6"));
        assert_eq!(location.longitude.as_deref(), Some("-122.3"));
        assert_eq!(location.address.as_deref(), Some("1 Pike St"));
    }

    #[test]
    fn test_unparseable_time_is_preserved() {
        let record = parse("Start Time: around lunch\nShort Summary: x\n");
        assert_eq!(record.start_time.as_deref(), Some("around lunch"));
        assert_eq!(record.end_time.as_deref(), Some("around lunch"));
    }

    #[test]
    fn test_empty_header_does_not_swallow_next_marker() {
        let record = parse(
            "Short Summary:\n\
             Summary:\n\
             important summary text\n\
             End Time:\n\
             Device Type: Bee\n",
        );
        assert!(record.title.is_none());
        assert_eq!(record.overview.as_deref(), Some("important summary text"));
        assert!(record.end_time.is_none());
        assert_eq!(record.device_type.as_deref(), Some("Bee"));
    }

    #[test]
    fn test_file_without_bee_structure_is_rejected() {
        let err = BeeAdapter
            .parse_bytes(Path::new("exports/README.txt"), b"just some notes\n".to_vec())
            .unwrap_err();
        assert_eq!(err.path, Path::new("exports/README.txt"));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "Start: 2025-06-01T08:00:00Z\nSummary:\na\nTranscription:\nb\n";
        assert_eq!(parse(text), parse(text));
    }
}
