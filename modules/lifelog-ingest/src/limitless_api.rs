//! Limitless lifelog API client.
//!
//! Fetches one cursor page per call. Retry and filtering policy lives in
//! `remote`, which drives any `PageSource`.

use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lifelog_types::{BlockKind, ContentBlock};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.limitless.ai/v1/lifelogs";
/// Upper bound for one page request, connect through body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters of one page request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// One decoded page. Lifelogs stay untyped so each record can keep its
/// original JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifelogPage {
    pub lifelogs: Vec<serde_json::Value>,
    pub next_cursor: Option<String>,
}

/// Something that can serve lifelog pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Where records come from; stamped into `sourceFile`.
    fn endpoint(&self) -> &str;

    async fn fetch_page(&self, request: &PageRequest) -> Result<LifelogPage, ApiError>;
}

// =====================================================
// API payload types
// =====================================================

/// A lifelog as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeLog {
    pub id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub title: Option<String>,
    pub markdown: Option<String>,
    #[serde(alias = "summary")]
    pub overview: Option<String>,
    pub transcript: Option<String>,
    #[serde(default)]
    pub contents: Vec<LifeLogBlock>,
    pub is_starred: Option<bool>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeLogBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub content: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_offset_ms: Option<i64>,
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub children: Vec<LifeLogBlock>,
}

/// Flattens nested blocks depth-first, parents before children.
pub fn flatten_blocks(blocks: &[LifeLogBlock]) -> Vec<ContentBlock> {
    let mut out = Vec::new();
    for block in blocks {
        out.push(ContentBlock {
            kind: BlockKind::from_source(&block.block_type),
            content: block.content.clone(),
            speaker_name: block.speaker_name.clone(),
            offset: block.start_offset_ms.map(|ms| ms.to_string()),
            start_time: block.start_time.clone(),
            end_time: block.end_time.clone(),
        });
        out.extend(flatten_blocks(&block.children));
    }
    out
}

/// Pulls the lifelog list and next cursor out of a response body.
pub fn decode_page(body: &str) -> Result<LifelogPage, ApiError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;

    let data = json
        .get("data")
        .ok_or_else(|| ApiError::Decode("missing 'data' node".to_string()))?;
    let lifelogs = match data.get("lifelogs").or_else(|| data.get("lifeLogs")) {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(serde_json::Value::Null) | None => {
            log::warn!("[LIMITLESS] 'data.lifelogs' is missing, treating page as empty");
            Vec::new()
        }
        Some(_) => return Err(ApiError::Decode("'data.lifelogs' is not an array".to_string())),
    };

    let next_cursor = json
        .pointer("/meta/lifelogs/nextCursor")
        .and_then(|v| v.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from);

    Ok(LifelogPage {
        lifelogs,
        next_cursor,
    })
}

// =====================================================
// HTTP client
// =====================================================

pub struct LimitlessClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl LimitlessClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn query(request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", request.limit.to_string()),
            ("includeMarkdown", "true".to_string()),
            ("includeHeadings", "true".to_string()),
        ];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", cursor.clone()));
        }
        if let Some(start) = request.start {
            query.push(("start", start.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        if let Some(end) = request.end {
            query.push(("end", end.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        if request.start.is_some() || request.end.is_some() {
            query.push(("timezone", "UTC".to_string()));
        }
        query
    }
}

#[async_trait]
impl PageSource for LimitlessClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<LifelogPage, ApiError> {
        log::debug!(
            "[LIMITLESS] GET {} cursor={:?}",
            self.base_url,
            request.cursor
        );

        let response = self
            .client
            .get(&self.base_url)
            .header("X-API-Key", &self.api_key)
            .timeout(self.timeout)
            .query(&Self::query(request))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ApiError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response: {}", e)))?;

        if status.as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
                body: truncate_error(&body).to_string(),
            });
        }

        decode_page(&body)
    }
}

fn truncate_error(s: &str) -> &str {
    match s.char_indices().nth(200) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
