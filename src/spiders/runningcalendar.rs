use super::{
    extract::{self, LinkRules},
    Scraped, Spider,
};
use crate::{fetch::Page, Error};

const LINKS: LinkRules = LinkRules {
    event_paths: &["/event/", "/race/"],
    listing_paths: &[],
    follow_pagination: true,
};

const SECTIONS: &[&str] = &[
    "", "events/", "races/", "running/", "cycling/", "swimming/", "triathlon/", "ultra/",
    "marathon/", "half-marathon/", "10k/", "5k/",
];

#[derive(Debug, Default)]
pub struct RunningCalendarSpider;

impl RunningCalendarSpider {
    pub fn new() -> Self {
        Self
    }
}

impl Spider for RunningCalendarSpider {
    fn name(&self) -> String {
        String::from("runningcalendar")
    }

    fn category(&self) -> &'static str {
        "fitness_training"
    }

    fn allowed_domains(&self) -> Vec<String> {
        vec!["runningcalendar.co.uk".into()]
    }

    fn start_urls(&self) -> Vec<String> {
        SECTIONS
            .iter()
            .map(|section| format!("https://www.runningcalendar.co.uk/{section}"))
            .collect()
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error> {
        extract::scrape_page(self, page, &LINKS)
    }
}
