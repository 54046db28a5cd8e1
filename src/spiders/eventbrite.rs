use super::{
    extract::{self, LinkRules},
    Scraped, Spider,
};
use crate::{fetch::Page, Error};

const LINKS: LinkRules = LinkRules {
    event_paths: &["/e/"],
    listing_paths: &[],
    follow_pagination: true,
};

/// Charity events listed on Eventbrite UK.
#[derive(Debug, Default)]
pub struct EventbriteSpider;

impl EventbriteSpider {
    pub fn new() -> Self {
        Self
    }
}

impl Spider for EventbriteSpider {
    fn name(&self) -> String {
        String::from("eventbrite")
    }

    fn category(&self) -> &'static str {
        "community_social"
    }

    fn allowed_domains(&self) -> Vec<String> {
        vec!["eventbrite.co.uk".into(), "eventbrite.com".into()]
    }

    fn start_urls(&self) -> Vec<String> {
        let base_url = "https://www.eventbrite.co.uk/b/united-kingdom/charity-and-causes";
        [
            "environment",
            "healthcare",
            "animal-welfare",
            "human-rights",
            "education",
            "poverty",
            "international-aid",
            "disaster-relief",
        ]
        .iter()
        .map(|cause| format!("{base_url}/{cause}/"))
        .collect()
    }

    fn categorize(&self, _title: &str, _description: Option<&str>) -> (String, String) {
        ("Charity Events".into(), "Charity Events".into())
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error> {
        extract::scrape_page(self, page, &LINKS)
    }
}
