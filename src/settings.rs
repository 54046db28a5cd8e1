//! Process-wide settings: built-in defaults, then `config/default.*`, then
//! `FETCH_EVENTS__*` environment variables.

use std::{collections::HashMap, path::PathBuf};

use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};

use crate::{
    run_config::{CrawlDefaults, CrawlOverrides, RunConfigBuilder},
    spiders::SpiderKind,
    Error,
};

pub const ENV_PREFIX: &str = "FETCH_EVENTS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_level: String,
    /// The project root; artifacts go to `<output_root>/scraped_data`.
    pub output_root: PathBuf,
    pub crawl: CrawlDefaults,
    /// Per-spider overrides keyed by spider name.
    pub spiders: HashMap<String, CrawlOverrides>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: String::from("fetch_events=info,warn"),
            output_root: PathBuf::from("."),
            crawl: CrawlDefaults::default(),
            spiders: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, Error> {
        Self::load_with(File::with_name("config/default").required(false))
    }

    pub fn load_with<S>(file: S) -> Result<Self, Error>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn run_config_builder(&self) -> RunConfigBuilder {
        RunConfigBuilder::new(self.crawl.clone())
    }

    /// The spider's own overrides, with configured ones layered on top.
    pub fn overrides_for(&self, kind: SpiderKind) -> CrawlOverrides {
        let built_in = kind.spider().overrides();
        match self.spiders.get(kind.name()) {
            Some(configured) => built_in.merged_with(configured),
            None => built_in,
        }
    }
}
