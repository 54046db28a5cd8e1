//! Per-run configuration, merged from process-wide defaults and per-spider
//! overrides.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Upper bound for every configured delay and timeout.
pub const MAX_SECONDS: f64 = 86_400.0;

/// Process-wide crawl defaults. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlDefaults {
    pub request_delay: f64,
    pub delay_randomization_factor: f64,
    pub max_concurrent_requests: usize,
    pub max_concurrent_requests_per_host: usize,
    pub respect_robots_policy: bool,
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub allowed_error_statuses: Vec<u16>,
    pub adaptive_throttle: bool,
    pub throttle_start_delay: f64,
    pub throttle_max_delay: f64,
    pub throttle_target_concurrency: f64,
    pub request_timeout: f64,
}

impl Default for CrawlDefaults {
    fn default() -> Self {
        Self {
            request_delay: 1.0,
            delay_randomization_factor: 0.5,
            max_concurrent_requests: 1,
            max_concurrent_requests_per_host: 1,
            respect_robots_policy: false,
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            headers: default_headers(),
            allowed_error_statuses: Vec::new(),
            adaptive_throttle: true,
            throttle_start_delay: 1.0,
            throttle_max_delay: 10.0,
            throttle_target_concurrency: 1.0,
            request_timeout: 30.0,
        }
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        ),
        ("Accept-Language".to_string(), "en".to_string()),
    ])
}

/// Per-spider settings. Unset fields fall back to [`CrawlDefaults`].
/// Carries no output field; the sink always comes from the resolved path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOverrides {
    pub request_delay: Option<f64>,
    pub delay_randomization_factor: Option<f64>,
    pub max_concurrent_requests: Option<usize>,
    pub max_concurrent_requests_per_host: Option<usize>,
    pub respect_robots_policy: Option<bool>,
    pub user_agent: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub allowed_error_statuses: Option<Vec<u16>>,
    pub adaptive_throttle: Option<bool>,
    pub throttle_start_delay: Option<f64>,
    pub throttle_max_delay: Option<f64>,
    pub throttle_target_concurrency: Option<f64>,
    pub request_timeout: Option<f64>,
}

impl CrawlOverrides {
    /// Field-wise merge where `other` wins.
    pub fn merged_with(&self, other: &CrawlOverrides) -> CrawlOverrides {
        let other = other.clone();
        let this = self.clone();
        CrawlOverrides {
            request_delay: other.request_delay.or(this.request_delay),
            delay_randomization_factor: other
                .delay_randomization_factor
                .or(this.delay_randomization_factor),
            max_concurrent_requests: other
                .max_concurrent_requests
                .or(this.max_concurrent_requests),
            max_concurrent_requests_per_host: other
                .max_concurrent_requests_per_host
                .or(this.max_concurrent_requests_per_host),
            respect_robots_policy: other.respect_robots_policy.or(this.respect_robots_policy),
            user_agent: other.user_agent.or(this.user_agent),
            headers: other.headers.or(this.headers),
            allowed_error_statuses: other.allowed_error_statuses.or(this.allowed_error_statuses),
            adaptive_throttle: other.adaptive_throttle.or(this.adaptive_throttle),
            throttle_start_delay: other.throttle_start_delay.or(this.throttle_start_delay),
            throttle_max_delay: other.throttle_max_delay.or(this.throttle_max_delay),
            throttle_target_concurrency: other
                .throttle_target_concurrency
                .or(this.throttle_target_concurrency),
            request_timeout: other.request_timeout.or(this.request_timeout),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Politeness {
    pub request_delay: Duration,
    pub delay_randomization_factor: f64,
    pub max_concurrent_requests: usize,
    pub max_concurrent_requests_per_host: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveThrottle {
    pub start_delay: Duration,
    pub max_delay: Duration,
    pub target_concurrency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSink {
    pub path: PathBuf,
    pub format: FeedFormat,
    pub encoding: &'static str,
    pub overwrite: bool,
    pub indent: usize,
}

impl OutputSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            format: FeedFormat::Json,
            encoding: "utf-8",
            overwrite: true,
            indent: 2,
        }
    }
}

/// Everything a single crawl run needs. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub spider: String,
    pub politeness: Politeness,
    pub identification: Identification,
    pub respect_robots_policy: bool,
    pub allowed_error_statuses: Vec<u16>,
    pub adaptive_throttle: Option<AdaptiveThrottle>,
    pub request_timeout: Duration,
    pub sink: OutputSink,
}

impl RunConfiguration {
    pub fn allows_status(&self, status: u16) -> bool {
        (200..300).contains(&status) || self.allowed_error_statuses.contains(&status)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    defaults: CrawlDefaults,
}

impl RunConfigBuilder {
    pub fn new(defaults: CrawlDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &CrawlDefaults {
        &self.defaults
    }

    /// Merges `overrides` over the defaults.
    ///
    /// Fails with [`Error::Config`] when a delay or timeout is negative, not a
    /// number or above [`MAX_SECONDS`], or when the throttle target concurrency
    /// is not a positive number.
    pub fn build(
        &self,
        spider_identifier: &str,
        output_path: PathBuf,
        overrides: &CrawlOverrides,
    ) -> Result<RunConfiguration, Error> {
        let d = &self.defaults;
        let o = overrides;

        let request_delay = secs(
            "request_delay",
            o.request_delay.unwrap_or(d.request_delay),
        )?;
        let adaptive_throttle = if o.adaptive_throttle.unwrap_or(d.adaptive_throttle) {
            let target_concurrency = o
                .throttle_target_concurrency
                .unwrap_or(d.throttle_target_concurrency);
            if !(target_concurrency.is_finite() && target_concurrency > 0.0) {
                return Err(invalid(
                    "throttle_target_concurrency",
                    target_concurrency,
                    "a positive number",
                ));
            }
            Some(AdaptiveThrottle {
                start_delay: secs(
                    "throttle_start_delay",
                    o.throttle_start_delay.unwrap_or(d.throttle_start_delay),
                )?,
                max_delay: secs(
                    "throttle_max_delay",
                    o.throttle_max_delay.unwrap_or(d.throttle_max_delay),
                )?,
                target_concurrency,
            })
        } else {
            None
        };

        Ok(RunConfiguration {
            spider: spider_identifier.to_string(),
            politeness: Politeness {
                request_delay,
                delay_randomization_factor: o
                    .delay_randomization_factor
                    .unwrap_or(d.delay_randomization_factor)
                    .clamp(0.0, 1.0),
                max_concurrent_requests: o
                    .max_concurrent_requests
                    .unwrap_or(d.max_concurrent_requests)
                    .max(1),
                max_concurrent_requests_per_host: o
                    .max_concurrent_requests_per_host
                    .unwrap_or(d.max_concurrent_requests_per_host)
                    .max(1),
            },
            identification: Identification {
                user_agent: o.user_agent.clone().unwrap_or_else(|| d.user_agent.clone()),
                headers: o.headers.clone().unwrap_or_else(|| d.headers.clone()),
            },
            respect_robots_policy: o.respect_robots_policy.unwrap_or(d.respect_robots_policy),
            allowed_error_statuses: o
                .allowed_error_statuses
                .clone()
                .unwrap_or_else(|| d.allowed_error_statuses.clone()),
            adaptive_throttle,
            request_timeout: secs(
                "request_timeout",
                o.request_timeout.unwrap_or(d.request_timeout),
            )?,
            sink: OutputSink::new(output_path),
        })
    }
}

fn secs(key: &str, value: f64) -> Result<Duration, Error> {
    if !(0.0..=MAX_SECONDS).contains(&value) {
        return Err(invalid(key, value, "between 0 and 86400 seconds"));
    }
    Duration::try_from_secs_f64(value).map_err(|_| invalid(key, value, "a duration in seconds"))
}

fn invalid(key: &str, value: f64, expected: &str) -> Error {
    Error::Config(config::ConfigError::Message(format!(
        "{} = {} is invalid, expected {}",
        key, value, expected
    )))
}
