use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One scraped event, as written to the JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    /// `MM/DD/YYYY` when the source date could be read, otherwise the raw text.
    pub date: Option<String>,
    pub raw_date: Option<String>,
    pub short_description: Option<String>,
    pub url: String,
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub category: String,
    pub subcategory: String,
    pub site: String,
}

impl EventRecord {
    pub fn dedup_key(&self) -> (String, Option<String>) {
        (self.name.to_lowercase(), self.date.clone())
    }
}
