#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use fetch_events::{
    fetch::{Fetch, Page},
    run_config::{CrawlDefaults, CrawlOverrides, RunConfigBuilder, RunConfiguration},
    spiders::{
        extract::{self, LinkRules},
        Scraped, Spider,
    },
    Error,
};
use reqwest::StatusCode;
use tokio::time::Instant;
use url::Url;

const LINKS: LinkRules = LinkRules {
    event_paths: &["/e/"],
    listing_paths: &[],
    follow_pagination: true,
};

/// A spider over an arbitrary site, scraped with the shared extractor.
pub struct SiteSpider {
    pub start_urls: Vec<String>,
    pub allowed_domains: Vec<String>,
}

impl SiteSpider {
    pub fn new(start_url: &str) -> Self {
        let host = Url::parse(start_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            start_urls: vec![start_url.to_string()],
            allowed_domains: vec![host],
        }
    }
}

impl Spider for SiteSpider {
    fn name(&self) -> String {
        String::from("testsite")
    }

    fn category(&self) -> &'static str {
        "test"
    }

    fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domains.clone()
    }

    fn start_urls(&self) -> Vec<String> {
        self.start_urls.clone()
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error> {
        extract::scrape_page(self, page, &LINKS)
    }
}

/// Serves canned pages and redirects; anything else answers 404.
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, (u16, String)>,
    redirects: HashMap<String, String>,
    requested: Mutex<Vec<(String, Instant)>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages.insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested_at().into_iter().map(|(url, _)| url).collect()
    }

    /// Requested URLs with the (tokio) time each request started.
    pub fn requested_at(&self) -> Vec<(String, Instant)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, Error> {
        self.requested
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let landed = match self.redirects.get(url.as_str()) {
            Some(target) => Url::parse(target).unwrap(),
            None => url.clone(),
        };
        let Some((status, body)) = self.pages.get(landed.as_str()) else {
            return Err(Error::RequestReturnedError {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            });
        };
        let content_type = if landed.path().ends_with(".txt") {
            "text/plain"
        } else {
            "text/html; charset=utf-8"
        };
        Ok(Page {
            url: landed,
            status: *status,
            content_type: Some(content_type.to_string()),
            body: body.clone(),
            latency: Duration::from_millis(5),
        })
    }
}

/// Zero delays so multi-page crawls finish immediately.
pub fn fast_defaults() -> CrawlDefaults {
    CrawlDefaults {
        request_delay: 0.0,
        delay_randomization_factor: 0.0,
        adaptive_throttle: false,
        ..CrawlDefaults::default()
    }
}

pub fn fast_overrides() -> CrawlOverrides {
    CrawlOverrides {
        request_delay: Some(0.0),
        delay_randomization_factor: Some(0.0),
        adaptive_throttle: Some(false),
        ..CrawlOverrides::default()
    }
}

pub fn run_config(
    output_path: std::path::PathBuf,
    overrides: &CrawlOverrides,
) -> RunConfiguration {
    RunConfigBuilder::new(fast_defaults())
        .build("testsite", output_path, overrides)
        .unwrap()
}

pub fn listing(events: &[(&str, &str)], links: &[&str]) -> String {
    let events = events
        .iter()
        .map(|(name, start)| {
            format!(
                r#"{{"@type": "Event", "name": "{name}", "startDate": "{start}",
                    "location": {{"@type": "Place", "name": "Town Hall",
                    "geo": {{"latitude": 51.5, "longitude": -0.12}}}}}}"#
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    let links = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">more</a>"#))
        .collect::<String>();
    format!(
        r#"<html><head><script type="application/ld+json">[{events}]</script></head>
        <body>{links}</body></html>"#
    )
}
