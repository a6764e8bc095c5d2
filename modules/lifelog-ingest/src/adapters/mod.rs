//! Text export adapters.
//!
//! Each pendant export format gets one `TextAdapter` implementation. The
//! driver picks one through `text_adapter`, keyed by `SourceType`.

mod bee;
mod chatgpt;
mod omi;

pub use bee::BeeAdapter;
pub use chatgpt::ChatGptAdapter;
pub use omi::OmiAdapter;

use crate::error::ParseError;
use lifelog_types::{CanonicalRecord, RawPayload, SourceType};
use std::path::Path;

static BEE: BeeAdapter = BeeAdapter;
static OMI: OmiAdapter = OmiAdapter;
static CHATGPT: ChatGptAdapter = ChatGptAdapter;

/// Returns the adapter for a file-based source, `None` for remote sources.
pub fn text_adapter(source: SourceType) -> Option<&'static dyn TextAdapter> {
    match source {
        SourceType::Bee => Some(&BEE),
        SourceType::Omi => Some(&OMI),
        SourceType::ChatGpt => Some(&CHATGPT),
        SourceType::Limitless => None,
    }
}

/// Decoded export file handed to a format parser.
pub struct ExportFile<'a> {
    pub path: &'a Path,
    /// File stem, used as the record id.
    pub stem: String,
    pub text: String,
    pub raw: RawPayload,
}

impl ExportFile<'_> {
    pub fn record(&self, source: SourceType) -> CanonicalRecord {
        CanonicalRecord::new(self.stem.clone(), source, self.raw.clone())
    }

    pub fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Converts one exported text file into one canonical record.
pub trait TextAdapter: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Format-specific parsing. Must not return a partially filled record.
    fn parse(&self, file: &ExportFile<'_>) -> Result<CanonicalRecord, ParseError>;

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
    }

    fn parse_file(&self, path: &Path) -> Result<CanonicalRecord, ParseError> {
        let bytes = std::fs::read(path).map_err(|e| ParseError::new(path, e.to_string()))?;
        self.parse_bytes(path, bytes)
    }

    fn parse_bytes(&self, path: &Path, bytes: Vec<u8>) -> Result<CanonicalRecord, ParseError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ParseError::new(path, "file name has no usable stem"))?
            .to_string();

        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                log::warn!(
                    "[PARSE] {} is not valid UTF-8, parsing a lossy copy",
                    path.display()
                );
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };

        if text.trim().is_empty() {
            return Err(ParseError::new(path, "file is empty"));
        }

        let file = ExportFile {
            path,
            stem,
            text,
            raw: RawPayload::from_bytes(bytes),
        };
        self.parse(&file)
    }
}

/// Value after a `Label:` prefix, trimmed.
pub(crate) fn labeled<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

/// `Some` for non-empty text.
pub(crate) fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lookup_table_covers_text_sources() {
        for source in SourceType::ALL {
            match text_adapter(source) {
                Some(adapter) => assert_eq!(adapter.source_type(), source),
                None => assert!(!source.is_text()),
            }
        }
    }

    #[test]
    fn test_accepts_only_txt_files() {
        let adapter = text_adapter(SourceType::Omi).unwrap();
        assert!(adapter.accepts(&PathBuf::from("a/memory.txt")));
        assert!(adapter.accepts(&PathBuf::from("a/memory.TXT")));
        assert!(!adapter.accepts(&PathBuf::from("a/memory.json")));
        assert!(!adapter.accepts(&PathBuf::from("a/README")));
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let adapter = text_adapter(SourceType::Bee).unwrap();
        let err = adapter
            .parse_bytes(&PathBuf::from("in/blank.txt"), b"  \n\n".to_vec())
            .unwrap_err();
        assert_eq!(err.path, PathBuf::from("in/blank.txt"));
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        let err = text_adapter(SourceType::Omi).unwrap().parse_file(&path).unwrap_err();
        assert_eq!(err.path, path);
    }

    #[test]
    fn test_invalid_utf8_keeps_exact_raw_bytes() {
        let mut bytes = b"Memory from Jul 7, 2025 at 10:14 AM\nTitle: caf".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"\n");
        let record = text_adapter(SourceType::Omi)
            .unwrap()
            .parse_bytes(&PathBuf::from("x.txt"), bytes.clone())
            .unwrap();
        assert!(matches!(record.raw, RawPayload::Bytes { .. }));
        assert_eq!(record.raw, RawPayload::from_bytes(bytes));
    }
}
