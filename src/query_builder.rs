use std::fmt;

use reqwest::Url;

use crate::data_models::{QueryTerms, SearchSpec};

/// Results requested per page, and the stride of the page offset.
pub const PAGE_SIZE: u32 = 10;

pub const DEFAULT_HTML_BASE_URL: &str = "https://www.google.com/search?q=";
pub const DEFAULT_API_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// A fully built query for one (query, page) pair, tagged by backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    Html(String),
    Api(ApiQuery),
}

impl SearchQuery {
    /// The URL this query requests, credentials left out. Records are tagged with it.
    pub fn describe(&self, api_endpoint: &str) -> String {
        match self {
            SearchQuery::Html(url) => url.clone(),
            SearchQuery::Api(query) => query.request_url(api_endpoint),
        }
    }
}

/// Parameter set for one custom search API request, credentials excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub q: String,
    pub exact_terms: String,
    pub or_terms: String,
    pub exclude_terms: String,
    pub site_search: String,
    pub num: u32,
    /// 1-based index of the first requested result.
    pub start: u32,
}

impl ApiQuery {
    /// Request parameters in wire order. Blank optional fields are left out, `q`,
    /// `num` and `start` are always sent.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q.clone())];
        for (key, value) in [
            ("exactTerms", &self.exact_terms),
            ("orTerms", &self.or_terms),
            ("excludeTerms", &self.exclude_terms),
            ("siteSearch", &self.site_search),
        ] {
            if !value.is_empty() {
                params.push((key, value.clone()));
            }
        }
        params.push(("num", self.num.to_string()));
        params.push(("start", self.start.to_string()));
        params
    }

    /// `endpoint` with the encoded parameters appended, no `key` or `cx`.
    pub fn request_url(&self, endpoint: &str) -> String {
        match Url::parse_with_params(endpoint, self.params()) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{endpoint}?{self}"),
        }
    }
}

impl fmt::Display for ApiQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .params()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        f.write_str(&rendered)
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// The `+`-joinable clauses of a results-page query. Blank inputs contribute nothing.
pub fn query_clauses(terms: &QueryTerms, sites: &[&str]) -> Vec<String> {
    let mut clauses = Vec::new();

    if !sites.is_empty() {
        let sites = sites
            .iter()
            .map(|site| format!("site:{site}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        clauses.push(sites);
    }

    let all_words = words(&terms.include_all_words).collect::<Vec<_>>();
    if !all_words.is_empty() {
        clauses.push(all_words.join("+"));
    }

    let phrase = words(&terms.exact_phrase).collect::<Vec<_>>();
    if !phrase.is_empty() {
        clauses.push(format!("\"{}\"", phrase.join("+")));
    }

    let any_words = words(&terms.any_words).collect::<Vec<_>>();
    if !any_words.is_empty() {
        clauses.push(any_words.join(" OR "));
    }

    clauses.extend(words(&terms.exclude_words).map(|word| format!("-{word}")));
    clauses
}

/// Build the results-page URL for `start_page` (0-based).
///
/// The date clause is only added when both bounds are set, the offset clause only
/// past the first page.
pub fn html_search_url(base_url: &str, spec: &SearchSpec, start_page: u32) -> String {
    let clauses = query_clauses(&spec.terms, &spec.sites());

    let date_range = match (spec.date_range_start, spec.date_range_end) {
        (Some(start), Some(end)) => format!(
            "&tbs=cdr:1,cd_min:{},cd_max:{}",
            start.format("%Y/%m/%d"),
            end.format("%Y/%m/%d")
        ),
        _ => "".to_string(),
    };

    let offset = if start_page > 0 {
        format!("&start={}", start_page * PAGE_SIZE)
    } else {
        "".to_string()
    };

    format!("{base_url}{}{date_range}{offset}", clauses.join("+"))
}

/// Build the API parameter set for one tier, one site and one page (0-based).
pub fn api_query(terms: &QueryTerms, site: &str, page: u32) -> ApiQuery {
    let normalize = |text: &str| words(text).collect::<Vec<_>>().join(" ");
    ApiQuery {
        q: normalize(&terms.include_all_words),
        exact_terms: normalize(&terms.exact_phrase),
        or_terms: normalize(&terms.any_words),
        exclude_terms: normalize(&terms.exclude_words),
        site_search: site.trim().to_string(),
        num: PAGE_SIZE,
        start: page * PAGE_SIZE + 1,
    }
}
