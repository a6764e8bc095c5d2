//! Cursor-driven pager over a `PageSource`.
//!
//! Each call to `next_page` runs one fetch cycle:
//! `Idle -> Requesting -> Success | RateLimited | Failed`.
//! A 429 is retried once after the backoff interval; a second consecutive
//! 429 for the same page aborts the run.

use crate::error::{ApiError, IngestError};
use crate::limitless_api::{flatten_blocks, LifeLog, LifelogPage, PageRequest, PageSource};
use crate::timestamps::{in_range, parse_rfc3339};
use chrono::{DateTime, Utc};
use lifelog_types::{CanonicalRecord, RawPayload, SourceType};
use std::time::Duration;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Requesting,
    Success,
    RateLimited,
    Failed,
}

/// Inclusive date window. `None` on either side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Records produced by one page, plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    pub number: u32,
    pub records: Vec<CanonicalRecord>,
    /// Outside the date window. Not an error.
    pub filtered: usize,
    /// Malformed, or undated while a window is active. Logged individually.
    pub skipped: usize,
}

pub struct RemoteAdapter<S: PageSource> {
    source: S,
    window: DateWindow,
    page_limit: u32,
    backoff: Duration,
    cursor: Option<String>,
    state: FetchState,
    pages: u32,
    requests: u32,
    finished: bool,
}

impl<S: PageSource> RemoteAdapter<S> {
    pub fn new(source: S, window: DateWindow) -> Self {
        Self {
            source,
            window,
            page_limit: DEFAULT_PAGE_LIMIT,
            backoff: DEFAULT_BACKOFF,
            cursor: None,
            state: FetchState::Idle,
            pages: 0,
            requests: 0,
            finished: false,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.source.endpoint()
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// HTTP requests issued so far, retries included.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches and converts the next page. `Ok(None)` once the server has
    /// reported no further cursor.
    pub async fn next_page(&mut self) -> Result<Option<RemotePage>, IngestError> {
        if self.finished {
            return Ok(None);
        }

        let number = self.pages + 1;
        let request = PageRequest {
            cursor: self.cursor.clone(),
            start: self.window.start,
            end: self.window.end,
            limit: self.page_limit,
        };

        log::info!("[LIMITLESS] Fetching page {}...", number);
        let page = self.fetch_with_backoff(number, &request).await?;
        self.pages = number;

        match page.next_cursor.clone() {
            Some(next) if Some(&next) == self.cursor.as_ref() => {
                log::warn!(
                    "[LIMITLESS] Server repeated cursor {:?}, ending pagination",
                    next
                );
                self.finished = true;
            }
            Some(next) => self.cursor = Some(next),
            None => {
                log::info!("[LIMITLESS] No more pages.");
                self.finished = true;
            }
        }

        let converted = self.convert(number, page.lifelogs);
        self.state = FetchState::Idle;
        Ok(Some(converted))
    }

    async fn fetch_with_backoff(
        &mut self,
        number: u32,
        request: &PageRequest,
    ) -> Result<LifelogPage, IngestError> {
        let mut rate_limited = false;
        loop {
            self.state = FetchState::Requesting;
            self.requests += 1;

            match self.source.fetch_page(request).await {
                Ok(page) => {
                    self.state = FetchState::Success;
                    return Ok(page);
                }
                Err(error) if error.is_transient() && !rate_limited => {
                    self.state = FetchState::RateLimited;
                    rate_limited = true;
                    log::warn!(
                        "[LIMITLESS] 429 on page {}. Waiting {}s before retrying...",
                        number,
                        self.backoff.as_secs()
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(ApiError::RateLimited) => {
                    self.state = FetchState::Failed;
                    self.finished = true;
                    log::error!("[LIMITLESS] 429 again on page {}. Aborting.", number);
                    return Err(IngestError::RateLimitExhausted { page: number });
                }
                Err(error) => {
                    self.state = FetchState::Failed;
                    self.finished = true;
                    return Err(IngestError::Api {
                        page: number,
                        error,
                    });
                }
            }
        }
    }

    /// Sorts by start time, applies the window and maps to records.
    fn convert(&self, number: u32, items: Vec<serde_json::Value>) -> RemotePage {
        let mut page = RemotePage {
            number,
            ..Default::default()
        };

        let mut logs: Vec<(LifeLog, serde_json::Value, Option<DateTime<Utc>>)> = Vec::new();
        for raw in items {
            match serde_json::from_value::<LifeLog>(raw.clone()) {
                Ok(item) => {
                    let start = item
                        .start_time
                        .as_deref()
                        .and_then(parse_rfc3339)
                        .map(|t| t.with_timezone(&Utc));
                    logs.push((item, raw, start));
                }
                Err(e) => {
                    log::warn!(
                        "[LIMITLESS] Skipping malformed lifelog {} on page {}: {}",
                        raw.get("id").map(|v| v.to_string()).unwrap_or_default(),
                        number,
                        e
                    );
                    page.skipped += 1;
                }
            }
        }

        logs.sort_by(|a, b| {
            a.2.cmp(&b.2)
                .then_with(|| a.0.start_time.cmp(&b.0.start_time))
        });
        log::debug!("[LIMITLESS] Page {}: {} lifelogs", number, logs.len());

        for (item, raw, start) in logs {
            match start {
                Some(t) if !in_range(t, self.window.start, self.window.end) => {
                    page.filtered += 1;
                    continue;
                }
                None if self.window.is_bounded() => {
                    log::warn!(
                        "[LIMITLESS] Skipping {}: invalid startTime {:?} with a date filter set",
                        item.id,
                        item.start_time
                    );
                    page.skipped += 1;
                    continue;
                }
                _ => {}
            }
            page.records.push(to_record(item, raw));
        }

        page
    }
}

fn to_record(item: LifeLog, raw: serde_json::Value) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(item.id, SourceType::Limitless, RawPayload::from_json(raw))
        .with_times(item.start_time, item.end_time);
    record.title = item.title.filter(|s| !s.is_empty());
    record.overview = item.overview.filter(|s| !s.is_empty());
    record.transcript = item.transcript.or(item.markdown).filter(|s| !s.is_empty());
    record.contents = flatten_blocks(&item.contents);
    record.is_starred = item.is_starred;
    record.updated_at = item.updated_at;
    record
}
