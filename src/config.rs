use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

use crate::backend::CredentialPair;
use crate::query_builder::{DEFAULT_API_ENDPOINT, DEFAULT_HTML_BASE_URL};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const MAX_CREDENTIAL_PAIRS: usize = 3;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_lookup(|key| env::var(key).ok())
});

#[derive(Debug, Clone)]
pub struct Config {
    pub api_endpoint: String,
    pub html_base_url: String,
    pub user_agent: String,
    pub page_delay: Duration,
    pub request_timeout: Duration,
    /// Tried in this order when the API reports a rate limit.
    pub credentials: Vec<CredentialPair>,
}

impl Config {
    /// Build a config from any key lookup. `CONFIG` feeds it the process environment.
    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = (1..=MAX_CREDENTIAL_PAIRS)
            .filter_map(|n| {
                let key = non_blank(lookup(&format!("GREYLIT_API_KEY_{n}")))?;
                let cx = non_blank(lookup(&format!("GREYLIT_API_CX_{n}")))?;
                Some(CredentialPair { key, cx })
            })
            .collect();

        Config {
            api_endpoint: get_or_default(&lookup, "GREYLIT_API_ENDPOINT", DEFAULT_API_ENDPOINT),
            html_base_url: get_or_default(&lookup, "GREYLIT_HTML_BASE_URL", DEFAULT_HTML_BASE_URL),
            user_agent: get_or_default(&lookup, "GREYLIT_USER_AGENT", DEFAULT_USER_AGENT),
            page_delay: Duration::from_secs(get_secs(&lookup, "GREYLIT_PAGE_DELAY_SECS", 3)),
            request_timeout: Duration::from_secs(get_secs(
                &lookup,
                "GREYLIT_REQUEST_TIMEOUT_SECS",
                30,
            )),
            credentials,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_lookup(|_| None)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(lookup(key)).unwrap_or_else(|| default.to_string())
}

fn get_secs<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match non_blank(lookup(key)) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("ignoring malformed {key}={raw}, using {default}");
            default
        }),
    }
}
