mod common;

use common::{fast_overrides, listing, run_config, SiteSpider};
use fetch_events::{
    fetch::{Fetch, HttpFetcher},
    launcher::{Launcher, RunStatus},
    run_config::CrawlOverrides,
    Error,
};
use url::Url;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn tolerant() -> CrawlOverrides {
    CrawlOverrides {
        respect_robots_policy: Some(false),
        allowed_error_statuses: Some(vec![403, 404]),
        ..fast_overrides()
    }
}

async fn serve(status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/retreats/"))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body, "text/html"))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn allowed_error_status_is_scraped_as_a_page() {
    let body = listing(&[("Silent Weekend Retreat", "2025-09-05")], &[]);
    let server = serve(403, body).await;
    let start = format!("{}/retreats/", server.uri());
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path().join("out.json"), &tolerant());

    let page = HttpFetcher::new(&config)
        .unwrap()
        .fetch(&Url::parse(&start).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status, 403);
    assert!(page.is_html());

    let spider = SiteSpider::new(&start);
    let result = Launcher::new(&spider, config).launch().await;
    assert_eq!(result.status, RunStatus::Success, "{:?}", result.error);
    assert_eq!(result.records, 1);
}

#[tokio::test]
async fn bare_allowed_error_status_completes_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/retreats/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let start = format!("{}/retreats/", server.uri());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let spider = SiteSpider::new(&start);

    let result = Launcher::new(&spider, run_config(path.clone(), &tolerant()))
        .launch()
        .await;

    assert_eq!(result.status, RunStatus::Success, "{:?}", result.error);
    assert_eq!(result.records, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
}

#[tokio::test]
async fn other_error_statuses_fail_the_run() {
    let server = serve(500, listing(&[], &[])).await;
    let start = format!("{}/retreats/", server.uri());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let spider = SiteSpider::new(&start);

    let result = Launcher::new(&spider, run_config(path.clone(), &tolerant()))
        .launch()
        .await;

    assert_eq!(result.status, RunStatus::Failure);
    assert!(matches!(
        result.error,
        Some(Error::RequestReturnedError { status, .. }) if status.as_u16() == 500
    ));
    assert!(!path.exists());
}

#[tokio::test]
async fn configured_identity_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/retreats/"))
        .and(header("user-agent", "fetch-events-test"))
        .and(header("x-probe", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing(&[], &[]), "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    let overrides = CrawlOverrides {
        user_agent: Some("fetch-events-test".into()),
        headers: Some([("X-Probe".to_string(), "1".to_string())].into()),
        ..fast_overrides()
    };
    let dir = tempfile::tempdir().unwrap();
    let config = run_config(dir.path().join("out.json"), &overrides);

    let page = HttpFetcher::new(&config)
        .unwrap()
        .fetch(&Url::parse(&format!("{}/retreats/", server.uri())).unwrap())
        .await
        .unwrap();
    assert_eq!(page.status, 200);
}
