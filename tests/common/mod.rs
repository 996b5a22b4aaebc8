#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use greylit::backend::{ApiItem, ApiPayload, BackendResponse, RawPayload, SearchBackend};
use greylit::query_builder::SearchQuery;

/// Replays canned responses in order and records every query it was asked.
/// Once the script runs out it answers with an empty API page.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<BackendResponse>>,
    calls: Mutex<Vec<SearchQuery>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<BackendResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SearchBackend for ScriptedBackend {
    async fn execute(&self, query: &SearchQuery) -> BackendResponse {
        self.calls.lock().unwrap().push(query.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BackendResponse::Success(RawPayload::Json(ApiPayload::default())))
    }
}

/// An API page of `count` items with links `https://{prefix}.example/{n}` for n in `from..from+count`.
pub fn api_page(prefix: &str, from: usize, count: usize) -> BackendResponse {
    api_response(api_items(prefix, from, count))
}

pub fn api_items(prefix: &str, from: usize, count: usize) -> Vec<ApiItem> {
    (from..from + count)
        .map(|n| ApiItem {
            title: format!("{prefix} result {n}"),
            link: format!("https://{prefix}.example/{n}"),
            snippet: Some(format!("Snippet {n}, published Mar 3, 2021")),
        })
        .collect()
}

pub fn api_response(items: Vec<ApiItem>) -> BackendResponse {
    BackendResponse::Success(RawPayload::Json(ApiPayload { items }))
}

pub fn html_page(body: &str) -> BackendResponse {
    BackendResponse::Success(RawPayload::Html(format!(
        "<!DOCTYPE html><html><head><title>results</title></head><body>{body}</body></html>"
    )))
}

/// A results block in the usual shape: anchor with heading, snippet as its sibling.
pub fn html_result(link: &str, title: &str, snippet: &str) -> String {
    format!(
        r#"<div class="g"><a href="/url?q={link}&amp;sa=U"><h3>{title}</h3></a><div>{snippet}</div></div>"#
    )
}
