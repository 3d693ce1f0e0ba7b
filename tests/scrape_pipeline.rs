//! End-to-end scraping against local mock servers

use allscrape::fetch::{DirectTier, ImpersonatingTier, WorkerPool};
use allscrape::{
    ContentExtractor, EscalationController, FetchConfig, Format, PageScraper, QualityDetector,
    Tier, WebScraper, compose_document,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str =
    "<title>Hi</title><body><main><p>Hello world this is content</p></main></body>";

const CHALLENGE: &str = r#"<html><head><script src="/cdn-cgi/challenge-platform/h/g/orchestrate/jsch/v1"></script></head><body><p>Checking your browser before accessing the site.</p></body></html>"#;

fn http_scraper() -> WebScraper {
    let fetch = FetchConfig::default();
    let timeout = Duration::from_secs(10);
    let controller = EscalationController::new(QualityDetector::default(), WorkerPool::new(2))
        .with_tier(Arc::new(DirectTier::new(&fetch)), timeout)
        .with_tier(Arc::new(ImpersonatingTier::tier_a(&fetch)), timeout)
        .with_tier(Arc::new(ImpersonatingTier::tier_b(&fetch)), timeout);
    WebScraper::new(controller, ContentExtractor::default())
}

#[tokio::test]
async fn direct_tier_page_becomes_text_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/hi", server.uri());
    let document = http_scraper().scrape(&url, &[Format::Text]).await.unwrap();

    let content = serde_json::to_value(&document.content).unwrap();
    assert_eq!(content, serde_json::json!({ "text": "Hello world this is content" }));
    assert_eq!(document.llm_summary.word_count, 5);
    assert_eq!(document.llm_summary.title, "Hi");
    assert_eq!(document.metadata.title, "Hi");
    assert_eq!(document.metadata.author, "");
}

#[tokio::test]
async fn challenge_on_every_http_tier_is_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHALLENGE))
        .expect(3)
        .mount(&server)
        .await;

    let url = format!("{}/guarded", server.uri());
    let err = http_scraper().scrape(&url, &Format::DEFAULT).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with(&format!("Failed to scrape {url}: challenge could not be bypassed")));
    assert!(message.contains(&Tier::Browser.to_string()));
}

#[test]
fn composing_identical_html_is_idempotent() {
    let url = Url::parse("https://example.com/article").unwrap();
    let html = format!(
        "<html><head><title>Story</title><meta name=\"author\" content=\"Ece\"></head><body><nav>Menu</nav><article><h2>Section</h2><p>{}</p><ul><li>one item</li></ul></article></body></html>",
        "A sentence that carries meaning, with punctuation. ".repeat(8)
    );

    let first = compose_document(&url, &html, &Format::DEFAULT);
    let second = compose_document(&url, &html, &Format::DEFAULT);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert_eq!(first.metadata.author, "Ece");
    assert!(first.get(Format::Html).unwrap().starts_with("<article>"));
}

#[test]
fn article_blocks_do_not_run_together() {
    let url = Url::parse("https://example.com/story").unwrap();
    let html = format!(
        "<html><head><title>Story</title></head><body><div><h2>Heading</h2><p>{}</p></div></body></html>",
        "Readable prose about a single subject keeps going for a while. ".repeat(6)
    );

    let document = compose_document(&url, &html, &[Format::Text, Format::Markdown]);

    let text = document.get(Format::Text).unwrap();
    assert!(text.starts_with("Heading Readable prose"));
    assert_eq!(document.llm_summary.word_count, 67);

    let markdown = document.get(Format::Markdown).unwrap();
    assert!(markdown.starts_with("Heading\n\nReadable prose"));
    assert!(!markdown.contains("---"));
}
