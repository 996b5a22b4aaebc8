mod common;

use std::time::Duration;

use greylit::aggregator::TierPolicy;
use greylit::backend::BackendResponse;
use greylit::config::Config;
use greylit::data_models::{BackendMode, QueryTerms, SearchSpec};
use greylit::error::SearchFailure;
use greylit::orchestrator::{HTML_TABLE_NAME, Orchestrator};
use greylit::query_builder::SearchQuery;
use tokio::time::Instant;

use common::*;

fn spec(sites: &[&str]) -> SearchSpec {
    SearchSpec {
        terms: QueryTerms {
            exact_phrase: "climate policy".into(),
            ..Default::default()
        },
        target_sites: sites.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn html_urls(backend: &ScriptedBackend) -> Vec<String> {
    backend
        .calls()
        .into_iter()
        .map(|q| match q {
            SearchQuery::Html(url) => url,
            SearchQuery::Api(api) => panic!("unexpected api query {api}"),
        })
        .collect()
}

#[cfg(test)]
mod html_mode {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pages_are_fetched_in_order_with_delay() {
        let backend = ScriptedBackend::new(vec![
            html_page(&html_result("https://a.org/1", "One", "first")),
            html_page(&html_result("https://a.org/2", "Two", "second")),
            html_page(&html_result("https://a.org/3", "Three", "third")),
        ]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let started = Instant::now();
        let run = orchestrator.run_html(&spec(&["a.org"]), 3).await;

        assert!(started.elapsed() >= Duration::from_secs(6));
        assert_eq!(run.mode, BackendMode::Html);
        assert_eq!(run.tables.len(), 1);
        assert_eq!(run.tables[0].name, HTML_TABLE_NAME);
        assert_eq!(run.total_records(), 3);

        let urls = html_urls(&backend);
        assert_eq!(urls.len(), 3);
        assert!(!urls[0].contains("start="));
        assert!(urls[1].ends_with("&start=10"));
        assert!(urls[2].ends_with("&start=20"));

        let records = &run.tables[0].records;
        assert_eq!(records[1].source_query, urls[1]);
        assert!(records.iter().all(|r| r.priority_tier == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_page_does_not_sleep() {
        let backend = ScriptedBackend::new(vec![html_page(&html_result(
            "https://a.org/1",
            "One",
            "first",
        ))]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let started = Instant::now();
        let run = orchestrator.run_html(&spec(&[]), 1).await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(run.total_records(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_without_results_halts_run() {
        let backend = ScriptedBackend::new(vec![
            html_page(&html_result("https://a.org/1", "One", "first")),
            html_page("<p>Your search did not match any documents.</p>"),
            html_page(&html_result("https://a.org/3", "Three", "third")),
        ]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let run = orchestrator.run_html(&spec(&["a.org"]), 3).await;

        assert_eq!(backend.call_count(), 2);
        assert_eq!(run.total_records(), 1);
        assert!(run.tables[0].failure.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_halts_run() {
        let backend = ScriptedBackend::new(vec![
            BackendResponse::Error("HTTP status server error (503)".into()),
            html_page(&html_result("https://a.org/2", "Two", "second")),
        ]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let run = orchestrator.run_html(&spec(&["a.org"]), 2).await;

        assert_eq!(backend.call_count(), 1);
        assert_eq!(run.total_records(), 0);
        assert!(matches!(run.tables[0].failure, Some(SearchFailure::Network(_))));
        assert!(!run.rate_limit_warning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_body_halts_run() {
        let backend = ScriptedBackend::new(vec![BackendResponse::Empty]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let run = orchestrator.run_html(&spec(&["a.org"]), 4).await;

        assert_eq!(backend.call_count(), 1);
        assert_eq!(run.total_records(), 0);
        assert!(run.tables[0].failure.is_none());
    }
}

#[cfg(test)]
mod api_mode {
    use super::*;

    #[tokio::test]
    async fn test_sites_run_in_order_and_rate_limit_is_per_site() {
        let backend = ScriptedBackend::new(vec![
            // nih.gov: one full page then the limit
            api_page("nih", 0, 10),
            BackendResponse::RateLimited,
            // who.int: a short page ends the only tier
            api_page("who", 0, 6),
        ]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let run = orchestrator.run_api(&spec(&["nih.gov", " ", "who.int"])).await;

        assert_eq!(run.mode, BackendMode::Api);
        assert!(run.rate_limit_warning());
        assert_eq!(run.tables.len(), 2);

        assert_eq!(run.tables[0].name, "nih.gov");
        assert!(run.tables[0].limit_exceeded);
        assert_eq!(run.tables[0].records.len(), 10);

        assert_eq!(run.tables[1].name, "who.int");
        assert!(!run.tables[1].limit_exceeded);
        assert_eq!(run.tables[1].records.len(), 6);
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_between_sites() {
        let backend = ScriptedBackend::new(vec![api_page("a", 0, 2), api_page("b", 0, 2)]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);

        let started = Instant::now();
        let run = orchestrator.run_api(&spec(&["a.org", "b.org"])).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(run.total_records(), 4);
    }

    #[tokio::test]
    async fn test_fallback_tiers_from_spec_are_used() {
        let backend = ScriptedBackend::new(vec![api_page("a", 0, 3), api_page("b", 0, 3)]);
        let config = Config::default();
        let orchestrator = Orchestrator::new(&backend, &config);
        let mut search = spec(&["nih.gov"]);
        search.fallback_tiers = vec![QueryTerms {
            any_words: "climate policy".into(),
            ..Default::default()
        }];

        let run = orchestrator.run_api(&search).await;

        let tiers: Vec<u8> = run.tables[0].records.iter().map(|r| r.priority_tier).collect();
        assert_eq!(tiers, vec![1, 1, 1, 2, 2, 2]);
    }

    #[tokio::test]
    async fn test_custom_policy_caps_each_site() {
        let backend = ScriptedBackend::new(vec![api_page("a", 0, 10), api_page("b", 0, 10)]);
        let config = Config {
            api_endpoint: "http://127.0.0.1:9/cse".into(),
            ..Config::default()
        };
        let orchestrator = Orchestrator::new(&backend, &config).with_policy(TierPolicy {
            max_pages: [1, 1, 1],
            site_cap: 5,
        });

        let run = orchestrator.run_api(&spec(&["a.org", "b.org"])).await;

        assert_eq!(backend.call_count(), 2);
        assert_eq!(run.tables[0].records.len(), 5);
        assert_eq!(run.tables[1].records.len(), 5);
        assert!(
            run.tables[1].records[0]
                .source_query
                .starts_with("http://127.0.0.1:9/cse?q=&exactTerms=climate+policy&siteSearch=b.org")
        );
    }
}
