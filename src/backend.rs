use std::fmt;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::Config;
use crate::query_builder::{ApiQuery, SearchQuery};

/// Error reasons the search API uses for quota and rate exhaustion.
const RATE_LIMIT_REASONS: [&str; 4] = [
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
    "quotaExceeded",
];

/// One API key plus the search engine id it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub key: String,
    pub cx: String,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("key", &"<redacted>")
            .field("cx", &self.cx)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiPayload {
    #[serde(default)]
    pub items: Vec<ApiItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Raw content of a successful call, tagged by backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    Html(String),
    Json(ApiPayload),
}

/// Classified outcome of exactly one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    Success(RawPayload),
    RateLimited,
    Error(String),
    Empty,
}

/// Performs one network call per query and classifies the result.
#[allow(async_fn_in_trait)]
pub trait SearchBackend {
    async fn execute(&self, query: &SearchQuery) -> BackendResponse;
}

pub struct SearchClient {
    client: reqwest::Client,
    api_endpoint: String,
    credentials: Vec<CredentialPair>,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<SearchClient> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(SearchClient {
            client,
            api_endpoint: config.api_endpoint.clone(),
            credentials: config.credentials.clone(),
        })
    }

    pub fn credentials(&self) -> &[CredentialPair] {
        &self.credentials
    }

    async fn fetch_html(&self, url: &str) -> BackendResponse {
        let res = match self.client.get(url).send().await {
            Ok(res) => res,
            Err(e) => return BackendResponse::Error(format!("{e:#}")),
        };
        let res = match res.error_for_status() {
            Ok(res) => res,
            Err(e) => return BackendResponse::Error(format!("{e:#}")),
        };
        match res.text().await {
            Ok(body) if body.trim().is_empty() => BackendResponse::Empty,
            Ok(body) => BackendResponse::Success(RawPayload::Html(body)),
            Err(e) => BackendResponse::Error(format!("{e:#}")),
        }
    }

    /// Walks the credential list in order, each pair at most once. Only a rate-limit
    /// answer moves on to the next pair.
    async fn fetch_api(&self, query: &ApiQuery) -> BackendResponse {
        if self.credentials.is_empty() {
            return BackendResponse::Error("no API credentials configured".to_string());
        }

        for (idx, credential) in self.credentials.iter().enumerate() {
            let mut params = query.params();
            params.push(("key", credential.key.clone()));
            params.push(("cx", credential.cx.clone()));

            let res = match self.client.get(&self.api_endpoint).query(&params).send().await {
                Ok(res) => res,
                Err(e) => return BackendResponse::Error(format!("{e:#}")),
            };

            let status = res.status();
            if status.is_success() {
                return match res.json::<ApiPayload>().await {
                    Ok(payload) => BackendResponse::Success(RawPayload::Json(payload)),
                    Err(e) => BackendResponse::Error(format!("invalid API response: {e:#}")),
                };
            }

            let body = res.text().await.unwrap_or_default();
            if is_rate_limited(status, &body) {
                log::warn!(
                    "API credential {} of {} is rate limited",
                    idx + 1,
                    self.credentials.len()
                );
                continue;
            }
            return BackendResponse::Error(format!("HTTP {status}: {}", body.trim()));
        }

        BackendResponse::RateLimited
    }
}

impl SearchBackend for SearchClient {
    async fn execute(&self, query: &SearchQuery) -> BackendResponse {
        match query {
            SearchQuery::Html(url) => self.fetch_html(url).await,
            SearchQuery::Api(api_query) => self.fetch_api(api_query).await,
        }
    }
}

pub fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN && RATE_LIMIT_REASONS.iter().any(|reason| body.contains(reason))
}
