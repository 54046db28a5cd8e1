use std::collections::BTreeMap;

use super::{
    extract::{self, LinkRules},
    Scraped, Spider,
};
use crate::{fetch::Page, run_config::CrawlOverrides, Error};

const LINKS: LinkRules = LinkRules {
    event_paths: &["/retreats/", "/events/"],
    listing_paths: &[],
    follow_pagination: false,
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Mindfulness retreats at Mindspace.
///
/// The site answers 403 to some valid retreat pages, so those statuses are
/// scraped like any other page.
#[derive(Debug, Default)]
pub struct MindspaceSpider;

impl MindspaceSpider {
    pub fn new() -> Self {
        Self
    }
}

impl Spider for MindspaceSpider {
    fn name(&self) -> String {
        String::from("mindspace")
    }

    fn category(&self) -> &'static str {
        "wellness_mind"
    }

    fn allowed_domains(&self) -> Vec<String> {
        vec!["mindspace.org.uk".into()]
    }

    fn start_urls(&self) -> Vec<String> {
        vec![String::from("https://www.mindspace.org.uk/retreats/")]
    }

    fn overrides(&self) -> CrawlOverrides {
        let headers = BTreeMap::from([
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ]);
        CrawlOverrides {
            request_delay: Some(2.0),
            delay_randomization_factor: Some(0.5),
            user_agent: Some(BROWSER_USER_AGENT.to_string()),
            headers: Some(headers),
            allowed_error_statuses: Some(vec![403, 404]),
            ..Default::default()
        }
    }

    fn categorize(&self, _title: &str, _description: Option<&str>) -> (String, String) {
        ("Wellness & Mind".into(), "Mindfulness".into())
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error> {
        extract::scrape_page(self, page, &LINKS)
    }
}
