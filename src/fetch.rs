//! The fetch layer: turns a URL into a [`Page`] or a transport error.

use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client,
};
use url::Url;

use crate::{run_config::RunConfiguration, Error};

#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub latency: Duration,
}

impl Page {
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.starts_with("text/html") || ct.starts_with("application/xhtml")
            }
            None => self.body.trim_start().starts_with('<'),
        }
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, Error>;
}

pub struct HttpFetcher {
    http_client: Client,
    allowed_error_statuses: Vec<u16>,
}

impl HttpFetcher {
    pub fn new(config: &RunConfiguration) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.identification.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::Internal(format!("header name '{}': {}", name, err)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| Error::Internal(format!("header value '{}': {}", value, err)))?;
            headers.insert(name, value);
        }
        tracing::debug!(
            user_agent = %config.identification.user_agent,
            "configuring HttpFetcher"
        );
        let http_client = Client::builder()
            .user_agent(&config.identification.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .timeout(config.request_timeout.max(Duration::from_secs(1)))
            .build()?;
        Ok(Self {
            http_client,
            allowed_error_statuses: config.allowed_error_statuses.clone(),
        })
    }
}

impl Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HttpFetcher {{ /* omitted */ }}")
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<Page, Error> {
        let started = Instant::now();
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| {
                tracing::error!("Failed fetching: {:?}", err);
                err
            })?;
        let status = response.status();
        tracing::trace!("response status: {}", status);

        if !status.is_success() && !self.allowed_error_statuses.contains(&status.as_u16()) {
            tracing::error!("The request returned '{}'", status);
            return Err(Error::RequestReturnedError {
                url: url.to_string(),
                status,
            });
        }
        if !status.is_success() {
            tracing::info!("accepting '{}' as content", status);
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
            latency: started.elapsed(),
        })
    }
}
