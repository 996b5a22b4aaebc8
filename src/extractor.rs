use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::backend::{ApiPayload, RawPayload};
use crate::data_models::ResultRecord;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},\s+\d{4}")
        .expect("static date pattern compiles")
});

// Results pages link through a redirect (`/url?q=...`), resolve hrefs against it.
static RESULTS_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://www.google.com/").expect("static base url parses"));

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector parses"));

const HEADING_TAG: &str = "h3";

/// Turn a raw backend payload into normalized records, in document order.
pub fn extract(payload: &RawPayload) -> Vec<ResultRecord> {
    match payload {
        RawPayload::Html(html) => extract_html_results(html),
        RawPayload::Json(payload) => extract_api_results(payload),
    }
}

/// First "Mon D, YYYY" occurrence in `text`. Relative dates are never recognized.
pub fn extract_date(text: &str) -> Option<String> {
    DATE_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Host (and port, when explicit) of `link`, empty when it does not parse.
pub fn domain_of(link: &str) -> String {
    match Url::parse(link) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => "".to_string(),
        },
        Err(_) => "".to_string(),
    }
}

pub fn extract_api_results(payload: &ApiPayload) -> Vec<ResultRecord> {
    payload
        .items
        .iter()
        .map(|item| {
            let description = item
                .snippet
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let date = description.as_deref().and_then(extract_date);
            ResultRecord::new(
                item.title.clone(),
                item.link.clone(),
                description,
                domain_of(&item.link),
                date,
            )
        })
        .collect()
}

/// Organic results are anchors that wrap a heading and point through the `q`
/// redirect parameter. Everything else on the page is skipped.
pub fn extract_html_results(html: &str) -> Vec<ResultRecord> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(heading) = find_heading(anchor) else {
            continue;
        };
        let title = heading.text().collect::<String>();

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(link) = target_link(href) else {
            continue;
        };
        let domain = domain_of(&link);

        let description = describe(anchor);
        let date = description.as_deref().and_then(extract_date);

        results.push(ResultRecord::new(title, link, description, domain, date));
    }

    results
}

fn target_link(href: &str) -> Option<String> {
    let parsed = RESULTS_BASE.join(href).ok()?;
    parsed
        .query_pairs()
        .find(|(key, value)| key == "q" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Descendant heading of `element`, the element itself excluded.
fn find_heading(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == HEADING_TAG)
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Sibling of the anchor, else sibling of the anchor's parent. A candidate holding a
/// heading belongs to the next result and is rejected.
fn describe(anchor: ElementRef<'_>) -> Option<String> {
    if let Some(sibling) = next_element_sibling(anchor) {
        if find_heading(sibling).is_none() {
            return stripped_text(sibling);
        }
    }

    let parent = anchor.parent().and_then(ElementRef::wrap)?;
    let sibling = next_element_sibling(parent)?;
    if find_heading(sibling).is_some() {
        return None;
    }
    stripped_text(sibling)
}

fn stripped_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<String>();
    if text.is_empty() { None } else { Some(text) }
}
