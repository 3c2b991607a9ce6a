//! One-shot batch crawl: POST the job and receive both result sets at once.
use crate::job::JobRequest;
use crate::model::Kind;
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct BatchBody<'a> {
    session_cookie: &'a str,
    selected_days: &'a [String],
    exclude_keywords: &'a [String],
}

/// The crawler answers 200 with either the two line lists or an error text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchResponse {
    Failed {
        error: String,
    },
    Lines {
        #[serde(default)]
        hidden: Vec<String>,
        #[serde(default)]
        public: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub hidden: Vec<String>,
    pub public: Vec<String>,
}

impl BatchResult {
    pub fn lines(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Hidden => &self.hidden,
            Kind::Public => &self.public,
        }
    }
}

#[derive(Clone)]
pub struct BatchClient {
    http: Client,
    endpoint: Url,
}

impl fmt::Debug for BatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl BatchClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).context("invalid batch endpoint")?;
        let http = Client::builder()
            .user_agent(concat!("campaign-stream/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, endpoint })
    }

    pub fn build_request(&self, job: &JobRequest) -> Result<reqwest::Request> {
        let body = BatchBody {
            session_cookie: &job.session_cookie,
            selected_days: &job.selected_days,
            exclude_keywords: &job.exclude_keywords,
        };
        self.http
            .post(self.endpoint.clone())
            .json(&body)
            .build()
            .context("failed to build batch request")
    }

    pub async fn fetch(&self, job: &JobRequest) -> Result<BatchResult> {
        job.validate()?;
        let request = self.build_request(job)?;
        debug!(endpoint = %self.endpoint, "posting batch job");
        let resp = self
            .http
            .execute(request)
            .await
            .context("batch request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("failed to read batch response")?;
        if !status.is_success() {
            return Err(anyhow!("batch endpoint returned {}: {}", status, text));
        }
        let result = parse_response(&text)?;
        info!(
            hidden = result.hidden.len(),
            public = result.public.len(),
            "batch crawl finished"
        );
        Ok(result)
    }
}

/// Decode a batch response body.
pub fn parse_response(text: &str) -> Result<BatchResult> {
    let parsed: BatchResponse =
        serde_json::from_str(text).context("batch response is not valid JSON")?;
    match parsed {
        BatchResponse::Failed { error } => Err(anyhow!("crawler reported an error: {}", error)),
        BatchResponse::Lines { hidden, public } => Ok(BatchResult { hidden, public }),
    }
}
