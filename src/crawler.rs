use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{stream::FuturesUnordered, StreamExt};
use texting_robots::Robot;
use tokio::{
    sync::{Mutex as AsyncMutex, Semaphore},
    time::Instant,
};
use url::Url;

use crate::{
    fetch::{Fetch, Page},
    item::EventRecord,
    run_config::{AdaptiveThrottle, Politeness, RunConfiguration},
    spiders::{Scraped, Spider},
    throttle::HostDelay,
    Error,
};

pub struct Crawler {
    politeness: Politeness,
    adaptive_throttle: Option<AdaptiveThrottle>,
    respect_robots_policy: bool,
    user_agent: String,
    hosts: Mutex<HashMap<String, Arc<HostGate>>>,
    /// Parsed robots.txt per origin; `None` allows everything.
    robots: AsyncMutex<HashMap<String, Option<Robot>>>,
}

/// A fetched and scraped page. `landed` differs from `requested` after a
/// redirect.
struct Visited {
    requested: Url,
    landed: Url,
    scraped: Scraped,
}

/// Caps in-flight requests to one host and spaces their starts.
struct HostGate {
    permits: Arc<Semaphore>,
    schedule: AsyncMutex<Schedule>,
}

struct Schedule {
    next_start: Option<Instant>,
    delay: HostDelay,
}

impl HostGate {
    async fn wait_turn(&self) {
        let mut schedule = self.schedule.lock().await;
        if let Some(at) = schedule.next_start {
            tokio::time::sleep_until(at).await;
        }
        let wait = schedule.delay.next_wait();
        schedule.next_start = Some(Instant::now() + wait);
    }

    async fn observe(&self, latency: Duration, status: u16) {
        self.schedule.lock().await.delay.observe(latency, status);
    }
}

#[derive(Debug, Default)]
struct Frontier {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
}

impl Frontier {
    fn push(&mut self, url: Url) -> bool {
        if self.visited.insert(url.as_str().to_string()) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    /// Marks a redirect target as crawled. False when it was already fetched
    /// or is being fetched; a still-queued copy is dropped instead.
    fn claim(&mut self, url: &Url) -> bool {
        if self.visited.insert(url.as_str().to_string()) {
            return true;
        }
        match self.queue.iter().position(|queued| queued == url) {
            Some(at) => self.queue.remove(at).is_some(),
            None => false,
        }
    }
}

impl Crawler {
    pub fn new(config: &RunConfiguration) -> Self {
        Self {
            politeness: config.politeness.clone(),
            adaptive_throttle: config.adaptive_throttle.clone(),
            respect_robots_policy: config.respect_robots_policy,
            user_agent: config.identification.user_agent.clone(),
            hosts: Mutex::new(HashMap::new()),
            robots: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Crawls until the frontier is exhausted, or until the first error.
    #[tracing::instrument(skip_all, fields(spider = %spider.name()))]
    pub async fn run(
        &self,
        spider: &dyn Spider,
        fetcher: &dyn Fetch,
    ) -> Result<Vec<EventRecord>, Error> {
        let allowed_domains = spider.allowed_domains();
        let mut frontier = Frontier::default();
        for start_url in spider.start_urls() {
            let url = Url::parse(&start_url).map_err(|err| {
                Error::Internal(format!("invalid start url '{}': {}", start_url, err))
            })?;
            if let Some(url) = crawlable(url, &allowed_domains) {
                frontier.push(url);
            }
        }

        let mut in_flight = FuturesUnordered::new();
        let mut records = Vec::new();
        let mut seen_records = HashSet::new();
        let mut pages = 0usize;

        loop {
            while in_flight.len() < self.politeness.max_concurrent_requests {
                let Some(url) = frontier.queue.pop_front() else {
                    break;
                };
                in_flight.push(self.visit(spider, fetcher, url, &allowed_domains));
            }

            let Some(visited) = in_flight.next().await else {
                break;
            };
            let Some(Visited {
                requested,
                landed,
                scraped: Scraped { records: found, follow },
            }) = visited?
            else {
                continue;
            };
            if landed != requested && !frontier.claim(&landed) {
                tracing::debug!(from = %requested, to = %landed, "Redirected to a visited page");
                continue;
            }
            pages += 1;

            for record in found {
                if seen_records.insert(record.dedup_key()) {
                    records.push(record);
                } else {
                    tracing::debug!(name = %record.name, "Skipping duplicate event");
                }
            }
            for link in follow {
                match landed.join(&link) {
                    Ok(next) => {
                        if let Some(next) = crawlable(next, &allowed_domains) {
                            frontier.push(next);
                        }
                    }
                    Err(err) => tracing::debug!("Ignoring link '{}': {}", link, err),
                }
            }
        }

        tracing::info!(pages, records = records.len(), "crawl finished");
        Ok(records)
    }

    /// `Ok(None)` when robots.txt disallows `url` or it redirects offsite.
    async fn visit(
        &self,
        spider: &dyn Spider,
        fetcher: &dyn Fetch,
        url: Url,
        allowed_domains: &[String],
    ) -> Result<Option<Visited>, Error> {
        if self.respect_robots_policy && !self.robots_allow(fetcher, &url).await {
            tracing::info!(url = %url, "Disallowed by robots.txt");
            return Ok(None);
        }
        let page = self.fetch_gated(fetcher, &url).await?;
        let landed = if page.url == url {
            url.clone()
        } else {
            match crawlable(page.url.clone(), allowed_domains) {
                Some(landed) => landed,
                None => {
                    tracing::info!(from = %url, to = %page.url, "Dropped offsite redirect");
                    return Ok(None);
                }
            }
        };
        let scraped = spider.scrape(&page)?;
        Ok(Some(Visited {
            requested: url,
            landed,
            scraped,
        }))
    }

    /// Fetches once the host's concurrency cap and delay allow it.
    async fn fetch_gated(&self, fetcher: &dyn Fetch, url: &Url) -> Result<Page, Error> {
        let gate = self.gate(url.host_str().unwrap_or_default());
        let _permit = gate
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| Error::Internal(err.to_string()))?;
        gate.wait_turn().await;

        tracing::debug!("calling {}", url);
        let page = fetcher.fetch(url).await?;
        gate.observe(page.latency, page.status).await;
        Ok(page)
    }

    fn gate(&self, host: &str) -> Arc<HostGate> {
        let mut hosts = self.hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        hosts
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(HostGate {
                    permits: Arc::new(Semaphore::new(
                        self.politeness.max_concurrent_requests_per_host,
                    )),
                    schedule: AsyncMutex::new(Schedule {
                        next_start: None,
                        delay: HostDelay::new(&self.politeness, self.adaptive_throttle.as_ref()),
                    }),
                })
            })
            .clone()
    }

    /// Holds the cache lock while fetching, so each origin's robots.txt is
    /// requested once.
    async fn robots_allow(&self, fetcher: &dyn Fetch, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let mut cache = self.robots.lock().await;
        if !cache.contains_key(&origin) {
            let robot = match url.join("/robots.txt") {
                Ok(robots_url) => match self.fetch_gated(fetcher, &robots_url).await {
                    Ok(page) if (200..300).contains(&page.status) => {
                        Robot::new(&self.user_agent, page.body.as_bytes())
                            .map_err(|err| tracing::warn!("Unreadable robots.txt: {}", err))
                            .ok()
                    }
                    Ok(page) => {
                        tracing::debug!(status = page.status, "No robots.txt for {}", origin);
                        None
                    }
                    Err(err) => {
                        tracing::warn!("Failed fetching robots.txt for {}: {}", origin, err);
                        None
                    }
                },
                Err(_) => None,
            };
            cache.insert(origin.clone(), robot);
        }
        match cache.get(&origin) {
            Some(Some(robot)) => robot.allowed(url.as_str()),
            _ => true,
        }
    }
}

/// Keeps http(s) URLs on an allowed host, without their fragment.
fn crawlable(mut url: Url, allowed_domains: &[String]) -> Option<Url> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let on_site = allowed_domains.is_empty()
        || allowed_domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        });
    if !on_site {
        tracing::debug!("Filtered offsite request to {}", host);
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
