use super::{
    extract::{self, LinkRules},
    Scraped, Spider,
};
use crate::{fetch::Page, Error};

const LINKS: LinkRules = LinkRules {
    event_paths: &["/events/"],
    listing_paths: &[],
    follow_pagination: true,
};

/// Race listings on findarace.com.
#[derive(Debug, Default)]
pub struct FindARaceSpider;

impl FindARaceSpider {
    pub fn new() -> Self {
        Self
    }
}

impl Spider for FindARaceSpider {
    fn name(&self) -> String {
        String::from("findarace")
    }

    fn category(&self) -> &'static str {
        "fitness_training"
    }

    fn allowed_domains(&self) -> Vec<String> {
        vec!["findarace.com".into()]
    }

    fn start_urls(&self) -> Vec<String> {
        vec![String::from("https://findarace.com/events")]
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error> {
        extract::scrape_page(self, page, &LINKS)
    }
}
