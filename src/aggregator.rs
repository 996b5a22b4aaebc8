use std::collections::HashSet;

use crate::backend::{BackendResponse, SearchBackend};
use crate::data_models::{QueryTerms, ResultRecord};
use crate::error::SearchFailure;
use crate::extractor::extract;
use crate::query_builder::{DEFAULT_API_ENDPOINT, PAGE_SIZE, SearchQuery, api_query};

/// Page caps per tier and the per-site result cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    pub max_pages: [u32; 3],
    pub site_cap: usize,
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy {
            max_pages: [4, 8, 10],
            site_cap: 40,
        }
    }
}

/// Everything gathered for one target site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOutcome {
    pub site: String,
    /// Unique by `link`, at most `site_cap` long.
    pub records: Vec<ResultRecord>,
    pub limit_exceeded: bool,
    pub failure: Option<SearchFailure>,
    pub calls: usize,
}

impl SiteOutcome {
    fn new(site: &str) -> SiteOutcome {
        SiteOutcome {
            site: site.to_string(),
            records: Vec::new(),
            limit_exceeded: false,
            failure: None,
            calls: 0,
        }
    }
}

enum TierEnd {
    Continue,
    StopSite,
}

pub struct MultiTierAggregator<'a, B: SearchBackend> {
    backend: &'a B,
    policy: TierPolicy,
    api_endpoint: String,
}

impl<'a, B: SearchBackend> MultiTierAggregator<'a, B> {
    pub fn new(backend: &'a B, policy: TierPolicy) -> Self {
        Self {
            backend,
            policy,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }

    /// Endpoint used in the request URL that records are tagged with.
    pub fn with_api_endpoint(mut self, api_endpoint: &str) -> Self {
        self.api_endpoint = api_endpoint.to_string();
        self
    }

    /// Run the tiers for `site` from strictest to most permissive.
    ///
    /// A tier is skipped when its text is blank, and no tier starts once the cap is
    /// reached. A rate limit or a failed call stops the site for the rest of the run.
    pub async fn aggregate_site(&self, tiers: &[&QueryTerms], site: &str) -> SiteOutcome {
        let mut outcome = SiteOutcome::new(site);
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, terms) in tiers.iter().take(self.policy.max_pages.len()).enumerate() {
            let tier = idx as u8 + 1;
            if outcome.records.len() >= self.policy.site_cap {
                break;
            }
            if terms.is_empty() {
                log::debug!("{site}: tier {tier} has no query text, skipping");
                continue;
            }

            log::info!("{site}: running tier {tier}");
            let end = self
                .run_tier(terms, site, tier, self.policy.max_pages[idx], &mut seen, &mut outcome)
                .await;
            if let TierEnd::StopSite = end {
                break;
            }
        }

        outcome.records.truncate(self.policy.site_cap);
        log::info!(
            "{site}: collected {} results in {} calls",
            outcome.records.len(),
            outcome.calls
        );
        outcome
    }

    async fn run_tier(
        &self,
        terms: &QueryTerms,
        site: &str,
        tier: u8,
        max_pages: u32,
        seen: &mut HashSet<String>,
        outcome: &mut SiteOutcome,
    ) -> TierEnd {
        for page in 0..max_pages {
            if outcome.records.len() >= self.policy.site_cap {
                break;
            }

            let query = SearchQuery::Api(api_query(terms, site, page));
            let source_query = query.describe(&self.api_endpoint);
            outcome.calls += 1;

            let payload = match self.backend.execute(&query).await {
                BackendResponse::Success(payload) => payload,
                BackendResponse::Empty => break,
                BackendResponse::RateLimited => {
                    log::warn!("{site}: limit exceeded on tier {tier} page {}", page + 1);
                    outcome.limit_exceeded = true;
                    outcome.failure = Some(SearchFailure::RateLimitExceeded);
                    return TierEnd::StopSite;
                }
                BackendResponse::Error(detail) => {
                    log::error!("{site}: tier {tier} page {} failed: {detail}", page + 1);
                    outcome.failure = Some(SearchFailure::Network(detail));
                    return TierEnd::StopSite;
                }
            };

            let page_records = extract(&payload);
            let returned = page_records.len();
            let mut added = 0usize;
            for record in page_records {
                if seen.insert(record.link.clone()) {
                    outcome.records.push(record.tagged(&source_query, tier));
                    added += 1;
                }
            }
            log::info!(
                "{site}: tier {tier} page {} returned {returned} items, {added} new",
                page + 1
            );

            if returned < PAGE_SIZE as usize {
                break;
            }
        }
        TierEnd::Continue
    }
}
