//! Job request sent to the crawler as the first frame of every connection.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("session cookie is missing")]
    MissingSession,
    #[error("no participation day selected")]
    NoDays,
    #[error("start_id and end_id are required unless use_full_range is set")]
    MissingRange,
    #[error("start_id ({start}) must be lower than end_id ({end})")]
    InvalidRange { start: i64, end: i64 },
    #[error("query string could not be parsed")]
    InvalidQuery,
    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequest {
    pub session_cookie: String,
    pub selected_days: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub use_full_range: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_id: Option<i64>,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
}

impl JobRequest {
    /// Full-range job over the given days.
    pub fn full_range(
        session_cookie: impl Into<String>,
        selected_days: Vec<String>,
        exclude_keywords: Vec<String>,
    ) -> Self {
        Self {
            session_cookie: session_cookie.into(),
            selected_days,
            exclude_keywords,
            use_full_range: true,
            start_id: None,
            end_id: None,
            exclude_ids: Vec::new(),
        }
    }

    /// Job restricted to the id range `[start_id, end_id)`.
    pub fn id_range(
        session_cookie: impl Into<String>,
        selected_days: Vec<String>,
        exclude_keywords: Vec<String>,
        start_id: i64,
        end_id: i64,
    ) -> Self {
        Self {
            use_full_range: false,
            start_id: Some(start_id),
            end_id: Some(end_id),
            ..Self::full_range(session_cookie, selected_days, exclude_keywords)
        }
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.session_cookie.trim().is_empty() {
            return Err(JobError::MissingSession);
        }
        if self.selected_days.iter().all(|d| d.trim().is_empty()) {
            return Err(JobError::NoDays);
        }
        if self.use_full_range {
            return Ok(());
        }
        match (self.start_id, self.end_id) {
            (Some(start), Some(end)) if start < end => Ok(()),
            (Some(start), Some(end)) => Err(JobError::InvalidRange { start, end }),
            _ => Err(JobError::MissingRange),
        }
    }

    /// Copy of this request carrying `ids` as the producer-side exclusion hint.
    /// Range fields are dropped for full-range jobs so they never reach the wire.
    pub fn with_exclude_ids(&self, ids: Vec<String>) -> Self {
        let mut next = self.clone();
        if next.use_full_range {
            next.start_id = None;
            next.end_id = None;
        }
        next.exclude_ids = ids;
        next
    }

    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse the query string the result page was opened with, e.g.
    /// `session_cookie=abc&selected_days=01일,02일&use_full_range=true`.
    ///
    /// Does not validate; call [`JobRequest::validate`] before connecting.
    pub fn from_query(query: &str) -> Result<Self, JobError> {
        let query = query.trim_start_matches('?');
        let url = Url::parse(&format!("http://localhost/?{query}"))
            .map_err(|_| JobError::InvalidQuery)?;

        let mut job = JobRequest {
            session_cookie: String::new(),
            selected_days: Vec::new(),
            exclude_keywords: Vec::new(),
            use_full_range: false,
            start_id: None,
            end_id: None,
            exclude_ids: Vec::new(),
        };
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "session_cookie" => job.session_cookie = value.into_owned(),
                "selected_days" => job.selected_days = split_list(&value),
                "exclude_keywords" => job.exclude_keywords = split_list(&value),
                "use_full_range" => job.use_full_range = value == "true",
                "start_id" => job.start_id = parse_id("start_id", &value)?,
                "end_id" => job.end_id = parse_id("end_id", &value)?,
                _ => {}
            }
        }
        Ok(job)
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<Option<i64>, JobError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| JobError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a comma-separated keyword field into trimmed, non-empty keywords.
pub fn parse_keywords(text: &str) -> Vec<String> {
    split_list(text)
}

/// Day token as the crawler matches it against the participation time
/// (`1` → `"01일"`). Returns None outside 1..=31.
pub fn day_token(day: u8) -> Option<String> {
    (1..=31).contains(&day).then(|| format!("{day:02}일"))
}

pub fn all_day_tokens() -> Vec<String> {
    (1..=31).filter_map(day_token).collect()
}
