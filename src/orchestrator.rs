use std::time::Duration;

use crate::aggregator::{MultiTierAggregator, TierPolicy};
use crate::backend::{BackendResponse, SearchBackend};
use crate::config::Config;
use crate::data_models::{BackendMode, ResultRecord, SearchSpec};
use crate::error::SearchFailure;
use crate::extractor::extract;
use crate::query_builder::{SearchQuery, html_search_url};

pub const HTML_TABLE_NAME: &str = "google_search_results";

/// One exportable table: the whole run in html mode, one site in api mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    pub name: String,
    pub records: Vec<ResultRecord>,
    pub limit_exceeded: bool,
    pub failure: Option<SearchFailure>,
}

/// Output of a run, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub mode: BackendMode,
    pub tables: Vec<ResultTable>,
}

impl RunResult {
    pub fn rate_limit_warning(&self) -> bool {
        self.tables.iter().any(|t| t.limit_exceeded)
    }

    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}

pub struct Orchestrator<'a, B: SearchBackend> {
    backend: &'a B,
    html_base_url: String,
    api_endpoint: String,
    page_delay: Duration,
    policy: TierPolicy,
}

impl<'a, B: SearchBackend> Orchestrator<'a, B> {
    pub fn new(backend: &'a B, config: &Config) -> Self {
        Self {
            backend,
            html_base_url: config.html_base_url.clone(),
            api_endpoint: config.api_endpoint.clone(),
            page_delay: config.page_delay,
            policy: TierPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TierPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch `number_of_pages` results pages for `spec`, one after the other.
    ///
    /// Every page after the first waits `page_delay` first. The run stops at the first
    /// page that fails or parses to nothing.
    pub async fn run_html(&self, spec: &SearchSpec, number_of_pages: u32) -> RunResult {
        let mut table = ResultTable {
            name: HTML_TABLE_NAME.to_string(),
            records: Vec::new(),
            limit_exceeded: false,
            failure: None,
        };
        let mut pages_fetched = 0u32;

        for page in 0..number_of_pages {
            if page > 0 {
                log::info!(
                    "Sleeping for {} seconds before fetching page {}...",
                    self.page_delay.as_secs(),
                    page + 1
                );
                tokio::time::sleep(self.page_delay).await;
            }
            log::info!("Fetching page {} of {number_of_pages}...", page + 1);

            let url = html_search_url(&self.html_base_url, spec, page);
            if page == 0 {
                log::info!("Search URL: {url}");
            }

            let payload = match self.backend.execute(&SearchQuery::Html(url.clone())).await {
                BackendResponse::Success(payload) => payload,
                BackendResponse::Empty => {
                    log::info!("Page {} came back empty, stopping", page + 1);
                    break;
                }
                BackendResponse::RateLimited => {
                    log::warn!("Search backend refused page {}: rate limited", page + 1);
                    table.limit_exceeded = true;
                    table.failure = Some(SearchFailure::RateLimitExceeded);
                    break;
                }
                BackendResponse::Error(detail) => {
                    log::error!("An error occurred fetching page {}: {detail}", page + 1);
                    table.failure = Some(SearchFailure::Network(detail));
                    break;
                }
            };

            let page_records = extract(&payload);
            if page_records.is_empty() {
                log::info!("No results on page {}, stopping", page + 1);
                break;
            }
            pages_fetched += 1;
            log::info!("Page {} yielded {} results", page + 1, page_records.len());
            table
                .records
                .extend(page_records.into_iter().map(|r| r.tagged(&url, 1)));
        }

        log::info!("{}", completion_summary(table.records.len(), pages_fetched));

        RunResult {
            mode: BackendMode::Html,
            tables: vec![table],
        }
    }

    /// Aggregate every target site in order. A site that hits the rate limit or fails
    /// does not stop the others.
    pub async fn run_api(&self, spec: &SearchSpec) -> RunResult {
        let aggregator = MultiTierAggregator::new(self.backend, self.policy.clone())
            .with_api_endpoint(&self.api_endpoint);
        let tiers = spec.tiers();
        let mut tables = Vec::new();

        for site in spec.sites() {
            let outcome = aggregator.aggregate_site(&tiers, site).await;
            if let Some(failure) = &outcome.failure {
                log::warn!("{site}: {failure}");
            }
            tables.push(ResultTable {
                name: outcome.site,
                records: outcome.records,
                limit_exceeded: outcome.limit_exceeded,
                failure: outcome.failure,
            });
        }

        let result = RunResult {
            mode: BackendMode::Api,
            tables,
        };
        if result.rate_limit_warning() {
            log::warn!("Search limit exceeded for at least one site; results may be incomplete");
        }
        result
    }
}

fn completion_summary(found: usize, pages: u32) -> String {
    if found == 0 {
        "No results found.".to_string()
    } else {
        format!("Search completed. Fetched {found} results from {pages} pages.")
    }
}
