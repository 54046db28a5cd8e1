use std::{fmt, str::FromStr};

use crate::{fetch::Page, item::EventRecord, run_config::CrawlOverrides, Error};

pub mod classify;
pub mod eventbrite;
pub mod extract;
pub mod findarace;
pub mod mindspace;
pub mod runningcalendar;

/// What one page yielded: records, plus URLs worth visiting next.
#[derive(Debug, Clone, Default)]
pub struct Scraped {
    pub records: Vec<EventRecord>,
    pub follow: Vec<String>,
}

pub trait Spider: Send + Sync {
    fn name(&self) -> String;

    /// The site group, e.g. `community_social`.
    fn category(&self) -> &'static str;

    /// Hosts the crawl may visit. Subdomains are included.
    fn allowed_domains(&self) -> Vec<String>;

    fn start_urls(&self) -> Vec<String>;

    /// Settings that differ from the process-wide defaults for this site.
    fn overrides(&self) -> CrawlOverrides {
        CrawlOverrides::default()
    }

    /// Returns `(category, subcategory)` for an event.
    fn categorize(&self, title: &str, description: Option<&str>) -> (String, String) {
        let (category, subcategory) = classify::by_keywords(title, description);
        (category.to_string(), subcategory.to_string())
    }

    fn scrape(&self, page: &Page) -> Result<Scraped, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpiderKind {
    Eventbrite,
    FindARace,
    Mindspace,
    RunningCalendar,
}

impl SpiderKind {
    pub const ALL: [SpiderKind; 4] = [
        SpiderKind::Eventbrite,
        SpiderKind::FindARace,
        SpiderKind::Mindspace,
        SpiderKind::RunningCalendar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Eventbrite => "eventbrite",
            Self::FindARace => "findarace",
            Self::Mindspace => "mindspace",
            Self::RunningCalendar => "runningcalendar",
        }
    }

    pub fn spider(self) -> Box<dyn Spider> {
        match self {
            Self::Eventbrite => Box::new(eventbrite::EventbriteSpider::new()),
            Self::FindARace => Box::new(findarace::FindARaceSpider::new()),
            Self::Mindspace => Box::new(mindspace::MindspaceSpider::new()),
            Self::RunningCalendar => Box::new(runningcalendar::RunningCalendarSpider::new()),
        }
    }
}

impl fmt::Display for SpiderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpiderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Internal(format!("unknown spider '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds_a_spider_with_its_own_name() {
        for kind in SpiderKind::ALL {
            let spider = kind.spider();
            assert_eq!(spider.name(), kind.name());
            assert!(!spider.start_urls().is_empty());
            assert!(!spider.allowed_domains().is_empty());
            assert_eq!(kind.name().parse::<SpiderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_names_do_not_parse() {
        assert!("scrapy".parse::<SpiderKind>().is_err());
    }
}
