use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which search backend a run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Scraped search-engine results pages.
    Html,
    /// JSON custom search API.
    Api,
}

/// The free-text fields of one query tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryTerms {
    pub include_all_words: String,
    pub exact_phrase: String,
    pub any_words: String,
    pub exclude_words: String,
}

impl QueryTerms {
    /// A tier whose text fields are all blank is never queried.
    pub fn is_empty(&self) -> bool {
        [
            &self.include_all_words,
            &self.exact_phrase,
            &self.any_words,
            &self.exclude_words,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

/// User supplied search specification, immutable for the length of a run.
///
/// `terms` is the strict first tier. `fallback_tiers` holds the optional, increasingly
/// permissive tiers 2 and 3 used by the API aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    #[serde(flatten)]
    pub terms: QueryTerms,
    pub fallback_tiers: Vec<QueryTerms>,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub target_sites: Vec<String>,
}

impl SearchSpec {
    pub const MAX_TIERS: usize = 3;

    /// Tiers in order of specificity, tier 1 first. Anything past the third tier is ignored.
    pub fn tiers(&self) -> Vec<&QueryTerms> {
        std::iter::once(&self.terms)
            .chain(self.fallback_tiers.iter())
            .take(Self::MAX_TIERS)
            .collect()
    }

    /// Sites with surrounding whitespace removed, blank entries dropped.
    pub fn sites(&self) -> Vec<&str> {
        self.target_sites
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// One normalized search hit. The `link` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub domain: String,
    pub date: Option<String>,
    pub source_query: String,
    pub priority_tier: u8,
}

impl ResultRecord {
    pub fn new(
        title: String,
        link: String,
        description: Option<String>,
        domain: String,
        date: Option<String>,
    ) -> ResultRecord {
        ResultRecord {
            title,
            link,
            description,
            domain,
            date,
            source_query: "".to_string(), // tagged later by whoever issued the query.
            priority_tier: 1,
        }
    }

    pub fn tagged(mut self, source_query: &str, priority_tier: u8) -> ResultRecord {
        self.source_query = source_query.to_string();
        self.priority_tier = priority_tier;
        self
    }
}

/// Split a one-site-per-line list, dropping blank lines.
pub fn parse_site_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
