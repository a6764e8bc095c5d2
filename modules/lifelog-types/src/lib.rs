//! Canonical lifelog record shared by the ingestion pipeline and the tools
//! that read the exported JSON tree.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

// =====================================================
// Source Types
// =====================================================

/// Originating adapter of a record. Also the directory and filename prefix
/// used by the partitioned writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Bee,
    Omi,
    #[serde(rename = "chatgpt")]
    ChatGpt,
    Limitless,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Bee,
        SourceType::Omi,
        SourceType::ChatGpt,
        SourceType::Limitless,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bee" => Some(SourceType::Bee),
            "omi" => Some(SourceType::Omi),
            "chatgpt" => Some(SourceType::ChatGpt),
            "limitless" => Some(SourceType::Limitless),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Bee => "bee",
            SourceType::Omi => "omi",
            SourceType::ChatGpt => "chatgpt",
            SourceType::Limitless => "limitless",
        }
    }

    /// Text sources come from exported files, the rest from a remote API.
    pub fn is_text(&self) -> bool {
        !matches!(self, SourceType::Limitless)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =====================================================
// Content Blocks
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
    Blockquote,
    #[serde(other)]
    Other,
}

impl BlockKind {
    /// Maps a source block type onto the closed set. Unknown types become
    /// `Other`; the original stays available in the record's raw payload.
    pub fn from_source(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "heading1" | "h1" => BlockKind::Heading1,
            "heading2" | "h2" => BlockKind::Heading2,
            "heading3" | "h3" => BlockKind::Heading3,
            "paragraph" | "p" => BlockKind::Paragraph,
            "blockquote" | "quote" => BlockKind::Blockquote,
            _ => BlockKind::Other,
        }
    }
}

/// One structured piece of a record's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_name: Option<String>,
    /// Position inside the recording, as labelled by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl ContentBlock {
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            speaker_name: None,
            offset: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn quote(
        content: impl Into<String>,
        speaker_name: impl Into<String>,
        offset: impl Into<String>,
    ) -> Self {
        Self {
            speaker_name: Some(speaker_name.into()),
            offset: Some(offset.into()),
            ..Self::new(BlockKind::Blockquote, content)
        }
    }
}

// =====================================================
// Raw Payload
// =====================================================

/// The unparsed input a record was built from.
///
/// File bytes are kept as text when they are valid UTF-8 and as base64
/// otherwise; API objects are kept as JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawPayload {
    Text { text: String },
    Bytes { base64: String },
    Json { value: serde_json::Value },
}

impl RawPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => RawPayload::Text { text },
            Err(e) => RawPayload::Bytes {
                base64: BASE64.encode(e.as_bytes()),
            },
        }
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        RawPayload::Json { value }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            RawPayload::Json { value } => Some(value),
            _ => None,
        }
    }
}

// =====================================================
// Canonical Record
// =====================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none() && self.address.is_none()
    }
}

/// Normalized lifelog entry, one JSON file per record on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    #[serde(default)]
    pub export_date: String,
    #[serde(default)]
    pub export_version: String,
    #[serde(default)]
    pub source_file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_starred: Option<bool>,

    pub raw: RawPayload,
}

impl CanonicalRecord {
    pub fn new(id: impl Into<String>, source_type: SourceType, raw: RawPayload) -> Self {
        Self {
            id: id.into(),
            source_type,
            start_time: None,
            end_time: None,
            export_date: String::new(),
            export_version: String::new(),
            source_file: String::new(),
            title: None,
            overview: None,
            transcript: None,
            contents: Vec::new(),
            device_type: None,
            location: None,
            updated_at: None,
            is_starred: None,
            raw,
        }
    }

    /// Sets both timestamps. A missing side mirrors the present one.
    pub fn with_times(mut self, start: Option<String>, end: Option<String>) -> Self {
        let start = start.filter(|s| !s.is_empty());
        let end = end.filter(|s| !s.is_empty());
        let (start, end) = match (start, end) {
            (Some(s), None) => (Some(s.clone()), Some(s)),
            (None, Some(e)) => (Some(e.clone()), Some(e)),
            other => other,
        };
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Filename component for this record, safe to join onto a directory.
    pub fn file_stem(&self) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                c => c,
            })
            .collect();
        format!("{}_{}", self.source_type.as_str(), id)
    }
}

/// Driver-owned fields, stamped after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookkeeping {
    pub export_date: String,
    pub export_version: String,
    pub source_file: String,
}

impl CanonicalRecord {
    pub fn stamp(mut self, bookkeeping: &Bookkeeping) -> Self {
        self.export_date = bookkeeping.export_date.clone();
        self.export_version = bookkeeping.export_version.clone();
        self.source_file = bookkeeping.source_file.clone();
        self
    }
}
