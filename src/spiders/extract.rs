//! Site-independent extraction: schema.org `Event` JSON-LD blocks become
//! [`EventRecord`]s and anchors matching a [`LinkRules`] become follow-ups.

use std::collections::HashSet;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value as JsonValue;
use url::Url;

use super::{Scraped, Spider};
use crate::{
    fetch::Page,
    item::{Coordinates, EventRecord},
    Error,
};

const SHORT_DESCRIPTION_CHARS: usize = 300;

/// Which links on a page lead somewhere worth crawling.
#[derive(Debug, Clone, Copy)]
pub struct LinkRules {
    /// Path fragments of individual event pages, e.g. `/e/`.
    pub event_paths: &'static [&'static str],
    /// Path fragments of further listing pages.
    pub listing_paths: &'static [&'static str],
    pub follow_pagination: bool,
}

pub fn scrape_page<S>(spider: &S, page: &Page, rules: &LinkRules) -> Result<Scraped, Error>
where
    S: Spider + ?Sized,
{
    if !page.is_html() {
        if !(200..300).contains(&page.status) {
            tracing::info!(
                url = %page.url,
                status = page.status,
                "accepted error response has no HTML, nothing to scrape"
            );
            return Ok(Scraped::default());
        }
        return Err(Error::SiteStructure(format!(
            "'{}' is not an HTML page (content-type: {})",
            page.url,
            page.content_type.as_deref().unwrap_or("none")
        )));
    }
    let document = Html::parse_document(&page.body);

    let site = spider.name();
    let records = json_ld_events(&document)?
        .iter()
        .filter_map(|event| to_record(spider, &site, event, &page.url))
        .collect::<Vec<_>>();
    let follow = follow_links(&document, &page.url, rules)?;

    tracing::debug!(
        url = %page.url,
        records = records.len(),
        follow = follow.len(),
        "scraped page"
    );
    Ok(Scraped { records, follow })
}

fn selector(css: &'static str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|err| Error::Internal(format!("selector '{}': {}", css, err)))
}

/// All JSON-LD objects typed as an event, wherever they sit in the block.
pub fn json_ld_events(document: &Html) -> Result<Vec<JsonValue>, Error> {
    let scripts = selector(r#"script[type="application/ld+json"]"#)?;
    let mut events = Vec::new();
    for script in document.select(&scripts) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<JsonValue>(text.trim()) {
            Ok(value) => collect_events(&value, &mut events),
            Err(err) => tracing::warn!("Skipping malformed JSON-LD block: {}", err),
        }
    }
    Ok(events)
}

fn collect_events(value: &JsonValue, out: &mut Vec<JsonValue>) {
    match value {
        JsonValue::Array(items) => items.iter().for_each(|item| collect_events(item, out)),
        JsonValue::Object(map) => {
            if is_event_type(map.get("@type")) {
                out.push(value.clone());
                return;
            }
            for key in ["@graph", "itemListElement", "item"] {
                if let Some(nested) = map.get(key) {
                    collect_events(nested, out);
                }
            }
        }
        _ => {}
    }
}

fn is_event_type(value: Option<&JsonValue>) -> bool {
    match value {
        Some(JsonValue::String(t)) => t.ends_with("Event"),
        Some(JsonValue::Array(types)) => types.iter().any(|t| is_event_type(Some(t))),
        _ => false,
    }
}

fn to_record<S>(spider: &S, site: &str, event: &JsonValue, page_url: &Url) -> Option<EventRecord>
where
    S: Spider + ?Sized,
{
    let Some(name) = text_field(event, "name") else {
        tracing::warn!(url = %page_url, "Skipping event without a name");
        return None;
    };
    let url = event["url"]
        .as_str()
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone());
    let raw_date = text_field(event, "startDate");
    let date = raw_date
        .as_deref()
        .map(|raw| normalize_date(raw).unwrap_or_else(|| raw.to_string()));
    let short_description = text_field(event, "description").map(|d| truncate(&d));
    let location = first(&event["location"]);
    let (category, subcategory) = spider.categorize(&name, short_description.as_deref());

    Some(EventRecord {
        name,
        date,
        raw_date,
        short_description,
        url: url.to_string(),
        coordinates: coordinates(location),
        address: address(location),
        category,
        subcategory,
        site: site.to_string(),
    })
}

fn first(value: &JsonValue) -> &JsonValue {
    match value {
        JsonValue::Array(items) => items.first().unwrap_or(&JsonValue::Null),
        other => other,
    }
}

fn text_field(value: &JsonValue, key: &str) -> Option<String> {
    value[key].as_str().map(clean_text).filter(|s| !s.is_empty())
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(SHORT_DESCRIPTION_CHARS) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

fn address(location: &JsonValue) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |part: Option<String>| {
        if let Some(part) = part {
            if !parts.iter().any(|p| p.eq_ignore_ascii_case(&part)) {
                parts.push(part);
            }
        }
    };
    match location {
        JsonValue::String(s) => push(Some(clean_text(s))),
        JsonValue::Object(_) => {
            push(text_field(location, "name"));
            match &location["address"] {
                JsonValue::String(s) => push(Some(clean_text(s))),
                postal @ JsonValue::Object(_) => {
                    for key in [
                        "streetAddress",
                        "addressLocality",
                        "addressRegion",
                        "postalCode",
                    ] {
                        push(text_field(postal, key));
                    }
                    push(
                        text_field(postal, "addressCountry")
                            .or_else(|| text_field(&postal["addressCountry"], "name")),
                    );
                }
                _ => {}
            }
        }
        _ => {}
    }
    let parts: Vec<_> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn coordinates(location: &JsonValue) -> Option<Coordinates> {
    let geo = &location["geo"];
    let number = |value: &JsonValue| match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Some(Coordinates {
        lat: number(&geo["latitude"])?,
        lon: number(&geo["longitude"])?,
    })
}

/// Normalizes the common date spellings to `MM/DD/YYYY`.
pub fn normalize_date(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &[
        "%d %B %Y",
        "%d %b %Y",
        "%A %d %B %Y",
        "%a %d %b %Y",
        "%B %d %Y",
        "%b %d %Y",
        "%d/%m/%Y",
        "%d-%m-%Y",
    ];
    let raw = raw.trim();
    if let Some(date) = raw
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    {
        return Some(date.format("%m/%d/%Y").to_string());
    }
    let cleaned = strip_ordinals(&raw.replace(',', " "));
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
        .map(|date| date.format("%m/%d/%Y").to_string())
}

fn strip_ordinals(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            let suffix = &word[digits.len()..];
            let is_ordinal = !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && matches!(suffix, "st" | "nd" | "rd" | "th");
            if is_ordinal {
                digits
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Absolute URLs of event pages, listing pages and pagination links.
pub fn follow_links(document: &Html, base: &Url, rules: &LinkRules) -> Result<Vec<String>, Error> {
    let anchors = selector("a[href]")?;
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(mut url) = resolve_href(anchor, base) else {
            continue;
        };
        url.set_fragment(None);
        if url.path() == base.path() && url.query() == base.query() {
            continue;
        }
        if wanted(&anchor, &url, rules) && seen.insert(url.to_string()) {
            links.push(url.to_string());
        }
    }
    Ok(links)
}

fn resolve_href(anchor: ElementRef, base: &Url) -> Option<Url> {
    let href = anchor.value().attr("href")?.trim();
    if href.is_empty()
        || href.starts_with('#')
        || ["mailto:", "javascript:", "tel:"]
            .iter()
            .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }
    base.join(href).ok()
}

fn wanted(anchor: &ElementRef, url: &Url, rules: &LinkRules) -> bool {
    let path = url.path();
    if rules
        .event_paths
        .iter()
        .chain(rules.listing_paths)
        .any(|fragment| path.contains(fragment))
    {
        return true;
    }
    if !rules.follow_pagination {
        return false;
    }
    let rel_next = anchor
        .value()
        .attr("rel")
        .map_or(false, |rel| rel.split_whitespace().any(|r| r == "next"));
    rel_next || url.query_pairs().any(|(key, _)| key == "page")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::spiders::eventbrite::EventbriteSpider;

    fn page(url: &str, body: &str) -> Page {
        Page {
            url: Url::parse(url).unwrap(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.into(),
            latency: Duration::ZERO,
        }
    }

    const RULES: LinkRules = LinkRules {
        event_paths: &["/e/"],
        listing_paths: &[],
        follow_pagination: true,
    };

    #[test]
    fn reads_events_from_graph_and_item_lists() {
        let body = r#"<html><head>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@graph":[
              {"@type":"WebPage","name":"Listing"},
              {"@type":"ItemList","itemListElement":[
                {"@type":"ListItem","position":1,"item":{
                  "@type":"SportsEvent","name":"  Park   Run ","url":"/e/park-run-1",
                  "startDate":"2025-11-29T09:00:00Z",
                  "location":{"@type":"Place","name":"Hove Park",
                    "address":{"@type":"PostalAddress","streetAddress":"Goldstone Crescent",
                      "addressLocality":"Hove","postalCode":"BN3 7BF","addressCountry":"GB"},
                    "geo":{"latitude":"50.84","longitude":-0.18}}}}
              ]}
            ]}
            </script>
            <script type="application/ld+json">{ not json </script>
            </head><body></body></html>"#;
        let spider = EventbriteSpider::new();
        let scraped = scrape_page(&spider, &page("https://www.eventbrite.co.uk/b/x/", body), &RULES)
            .unwrap();

        assert_eq!(scraped.records.len(), 1);
        let record = &scraped.records[0];
        assert_eq!(record.name, "Park Run");
        assert_eq!(record.url, "https://www.eventbrite.co.uk/e/park-run-1");
        assert_eq!(record.date.as_deref(), Some("11/29/2025"));
        assert_eq!(record.raw_date.as_deref(), Some("2025-11-29T09:00:00Z"));
        assert_eq!(
            record.address.as_deref(),
            Some("Hove Park, Goldstone Crescent, Hove, BN3 7BF, GB")
        );
        let coords = record.coordinates.unwrap();
        assert!((coords.lat - 50.84).abs() < 1e-9);
        assert!((coords.lon + 0.18).abs() < 1e-9);
        assert_eq!(record.site, "eventbrite");
        assert_eq!(record.category, "Charity Events");
    }

    #[test]
    fn follows_event_and_pagination_links_once() {
        let body = r##"<a href="/e/one">1</a><a href="/e/one#tickets">1 again</a>
            <a href="/about">about</a><a href="?page=2">2</a>
            <a rel="next" href="/b/uk/next-batch">next</a>
            <a href="mailto:x@y.z">mail</a><a href="#top">top</a>"##;
        let document = Html::parse_document(body);
        let base = Url::parse("https://www.eventbrite.co.uk/b/uk/").unwrap();
        let links = follow_links(&document, &base, &RULES).unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.eventbrite.co.uk/e/one",
                "https://www.eventbrite.co.uk/b/uk/?page=2",
                "https://www.eventbrite.co.uk/b/uk/next-batch",
            ]
        );
    }

    #[test]
    fn non_html_pages_are_a_structure_error() {
        let mut pdf = page("https://www.eventbrite.co.uk/flyer.pdf", "%PDF-1.7");
        pdf.content_type = Some("application/pdf".into());
        let err = scrape_page(&EventbriteSpider::new(), &pdf, &RULES).unwrap_err();
        assert!(matches!(err, Error::SiteStructure(_)));
    }

    #[test]
    fn bare_error_responses_yield_nothing() {
        let mut forbidden = page("https://www.mindspace.org.uk/retreats/", "");
        forbidden.status = 403;
        forbidden.content_type = None;
        let scraped = scrape_page(&EventbriteSpider::new(), &forbidden, &RULES).unwrap();
        assert!(scraped.records.is_empty());
        assert!(scraped.follow.is_empty());

        forbidden.content_type = Some("text/plain".into());
        forbidden.body = "Forbidden".into();
        assert!(scrape_page(&EventbriteSpider::new(), &forbidden, &RULES).is_ok());
    }

    #[test]
    fn normalizes_common_date_spellings() {
        assert_eq!(normalize_date("2025-03-07").as_deref(), Some("03/07/2025"));
        assert_eq!(normalize_date("30 October 2025").as_deref(), Some("10/30/2025"));
        assert_eq!(normalize_date("Sunday 2nd November 2025").as_deref(), Some("11/02/2025"));
        assert_eq!(normalize_date("Oct 30, 2025").as_deref(), Some("10/30/2025"));
        assert_eq!(normalize_date("30/10/2025").as_deref(), Some("10/30/2025"));
        assert_eq!(normalize_date("sometime soon"), None);
    }

    #[test]
    fn long_descriptions_are_shortened() {
        let long = "word ".repeat(200);
        let short = truncate(&clean_text(&long));
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= SHORT_DESCRIPTION_CHARS + 3);
    }
}
