//! Result page retrieval, link extraction and the scrape fan-out

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::compose::{Format, ScrapeDocument};
use crate::dom::{Document, Element};
use crate::pipeline::PageScraper;
use crate::utils::SearchError;

/// Formats scraped for every search result
pub const RESULT_FORMATS: [Format; 2] = [Format::Text, Format::Markdown];

/// Build the result page URL for `query`
pub fn search_url(endpoint: &str, query: &str) -> Result<Url, SearchError> {
    let base = Url::parse(endpoint)?;
    let separator = if base.query().is_some() { '&' } else { '?' };
    Ok(Url::parse(&format!(
        "{}{}q={}",
        base,
        separator,
        urlencoding::encode(query)
    ))?)
}

/// Download the search result page
pub async fn fetch_results_page(
    url: &Url,
    user_agent: &str,
    accept_language: &str,
    timeout: Duration,
) -> Result<String, SearchError> {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .default_headers(headers)
        .build()?;

    debug!("Fetching search results from {}", url);
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

fn is_result_link(el: &Element) -> bool {
    el.tag() == "a"
        && el
            .attr("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == "result__url"))
}

/// Resolve a result href to the target URL
///
/// Direct `http(s)` links are kept as is. DuckDuckGo redirect links
/// (`//duckduckgo.com/l/?uddg=<target>`) are unwrapped. Anything else is `None`.
pub fn resolve_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http") {
        return Some(href.to_string());
    }

    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        Url::parse("https://duckduckgo.com").ok()?.join(href).ok()?.to_string()
    };
    let redirect = Url::parse(&absolute).ok()?;
    redirect
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, target)| target.into_owned())
        .filter(|target| target.starts_with("http"))
}

/// Target URLs of the first `max_results` result links, in page order
pub fn extract_result_urls(html: &str, max_results: usize) -> Vec<String> {
    let document = Document::parse(html);
    document
        .root()
        .descendants()
        .filter(|el| is_result_link(el))
        .take(max_results)
        .filter_map(|el| el.attr("href").and_then(resolve_result_href))
        .collect()
}

/// Scrape every URL with at most `concurrency` in flight
///
/// Failed URLs are logged and dropped; the rest keep their input order.
pub async fn scrape_all(
    scraper: Arc<dyn PageScraper>,
    urls: Vec<String>,
    concurrency: usize,
) -> Vec<ScrapeDocument> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set = JoinSet::new();
    let total = urls.len();

    for (index, url) in urls.into_iter().enumerate() {
        let scraper = scraper.clone();
        let semaphore = semaphore.clone();

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return (index, None);
            };
            match scraper.scrape(&url, &RESULT_FORMATS).await {
                Ok(document) => (index, Some(document)),
                Err(e) => {
                    warn!("Skipping search result: {}", e);
                    (index, None)
                }
            }
        });
    }

    let mut slots: Vec<Option<ScrapeDocument>> = vec![None; total];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, document)) => slots[index] = document,
            Err(e) => warn!("Search scrape task panicked: {}", e),
        }
    }

    let documents: Vec<ScrapeDocument> = slots.into_iter().flatten().collect();
    info!("Scraped {} of {} search results", documents.len(), total);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"<html><body>
        <div class="result"><a class="result__a" href="https://one.example/">One</a>
            <a class="result__url" href="https://one.example/">one.example</a></div>
        <div class="result"><a class="result__url" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Ftwo.example%2Fpath%3Fa%3D1&amp;rut=abc">two.example</a></div>
        <div class="result"><a class="result__url" href="/relative">bad</a></div>
        <div class="result"><a class="result__url" href="http://four.example/">four.example</a></div>
    </body></html>"#;

    #[test]
    fn search_url_encodes_query() {
        let url = search_url("https://html.duckduckgo.com/html/", "rust & tokio").unwrap();
        assert_eq!(url.as_str(), "https://html.duckduckgo.com/html/?q=rust%20%26%20tokio");
    }

    #[test]
    fn extracts_and_unwraps_links_in_order() {
        assert_eq!(
            extract_result_urls(RESULTS_PAGE, 5),
            vec![
                "https://one.example/".to_string(),
                "https://two.example/path?a=1".to_string(),
                "http://four.example/".to_string(),
            ]
        );
    }

    #[test]
    fn limit_applies_to_result_links() {
        assert_eq!(
            extract_result_urls(RESULTS_PAGE, 3),
            vec![
                "https://one.example/".to_string(),
                "https://two.example/path?a=1".to_string(),
            ]
        );
        assert!(extract_result_urls(RESULTS_PAGE, 0).is_empty());
    }

    #[test]
    fn non_http_hrefs_are_rejected() {
        assert_eq!(resolve_result_href("javascript:void(0)"), None);
        assert_eq!(resolve_result_href("/l/?uddg=ftp%3A%2F%2Fx"), None);
    }
}
