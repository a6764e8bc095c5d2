//! Recorder transcripts produced by the ChatGPT voice exporter:
//! `Key: value` metadata lines and `[offset] Speaker n: text` utterances.

use super::{non_empty, ExportFile, TextAdapter};
use crate::error::ParseError;
use crate::timestamps::normalize_or_keep;
use lifelog_types::{CanonicalRecord, ContentBlock, SourceType};
use once_cell::sync::Lazy;
use regex::Regex;

static META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Recorder|Timezone|Start|End):\s*(.+)$").unwrap());
static LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+(?:\.\d+)?)\]\s+([^:]+?):\s*(.+)$").unwrap());

pub struct ChatGptAdapter;

impl TextAdapter for ChatGptAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::ChatGpt
    }

    fn parse(&self, file: &ExportFile<'_>) -> Result<CanonicalRecord, ParseError> {
        let origin = file.origin();
        let mut start: Option<String> = None;
        let mut end: Option<String> = None;
        let mut recorder: Option<String> = None;
        let mut blocks: Vec<ContentBlock> = Vec::new();
        let mut transcript: Vec<String> = Vec::new();

        for line in file.text.lines().map(str::trim) {
            if let Some(caps) = META_RE.captures(line) {
                let value = caps[2].trim();
                match &caps[1] {
                    "Start" => start = Some(normalize_or_keep(value, &origin)),
                    "End" => end = Some(normalize_or_keep(value, &origin)),
                    "Recorder" => recorder = non_empty(value),
                    _ => log::debug!("[PARSE] {}: timezone {}, times read as UTC", origin, value),
                }
            } else if let Some(caps) = LINE_RE.captures(line) {
                let (offset, speaker, text) = (&caps[1], caps[2].trim(), caps[3].trim());
                transcript.push(format!("[{}] {}: {}", offset, speaker, text));
                blocks.push(ContentBlock::quote(text, speaker, offset));
            }
        }

        if blocks.is_empty() && start.is_none() {
            return Err(ParseError::new(
                file.path,
                "no recorder metadata or utterances found",
            ));
        }

        let mut record = file.record(SourceType::ChatGpt).with_times(start, end);
        record.transcript = non_empty(transcript.join("\n"));
        record.contents = blocks;
        record.device_type = recorder;
        Ok(record)
    }
}
