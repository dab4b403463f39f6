//! Rate-limited HTTP access to SAS index pages

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::constants::remote;
use crate::errors::{ListingResult, RemoteListingError};

use super::listing::{AutoindexParser, ListingEntry, ListingParser};

/// Configuration for remote listing requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Listing requests per second
    pub rate_limit_rps: u32,
    /// User agent header
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout: remote::DEFAULT_TIMEOUT,
            rate_limit_rps: remote::DEFAULT_RATE_LIMIT_RPS,
            user_agent: remote::USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn build_http_client(&self) -> ListingResult<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// Fetches and parses remote directory listings
#[derive(Debug, Clone)]
pub struct RemoteLister {
    client: Client,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    parser: Arc<dyn ListingParser>,
    credentials: Option<Credentials>,
}

impl RemoteLister {
    /// Build a lister using the autoindex parser
    pub fn new(config: &RemoteConfig, credentials: Option<Credentials>) -> ListingResult<Self> {
        let rps = NonZeroU32::new(config.rate_limit_rps).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            client: config.build_http_client()?,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            parser: Arc::new(AutoindexParser),
            credentials,
        })
    }

    /// Swap the listing parser
    pub fn with_parser(mut self, parser: impl ListingParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    fn request(&self, method: reqwest::Method, url: &Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url.as_str());
        match &self.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(credentials.password()))
            }
            None => builder,
        }
    }

    async fn throttle(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
    }

    /// Fetch the HTML of an index page
    pub async fn fetch_page(&self, url: &str) -> ListingResult<String> {
        let parsed = parse_url(url)?;
        self.throttle().await;
        let response = self.request(reqwest::Method::GET, &parsed).send().await?;
        let status = response.status();
        check_status(url, status)?;
        debug!("Fetched listing {} ({})", url, status);
        Ok(response.text().await?)
    }

    /// List the entries of a remote directory
    pub async fn list(&self, dir_url: &str) -> ListingResult<Vec<ListingEntry>> {
        let url = directory_url(dir_url);
        let html = self.fetch_page(&url).await?;
        self.parser.parse(&url, &html)
    }

    /// Whether a remote file answers a HEAD request successfully
    pub async fn head_exists(&self, url: &str) -> ListingResult<bool> {
        let parsed = parse_url(url)?;
        self.throttle().await;
        let response = self.request(reqwest::Method::HEAD, &parsed).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(url, status)?;
        Ok(true)
    }
}

fn parse_url(url: &str) -> ListingResult<Url> {
    Url::parse(url).map_err(|e| RemoteListingError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}

fn check_status(url: &str, status: StatusCode) -> ListingResult<()> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteListingError::Unauthorized {
            url: url.to_string(),
        }),
        status if !status.is_success() => Err(RemoteListingError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }),
        _ => Ok(()),
    }
}

/// Directory URL with exactly one trailing slash
pub fn directory_url(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_url() {
        assert_eq!(directory_url("https://x/sas/dr17"), "https://x/sas/dr17/");
        assert_eq!(directory_url("https://x/sas/dr17//"), "https://x/sas/dr17/");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("u", StatusCode::OK).is_ok());
        assert!(matches!(
            check_status("u", StatusCode::UNAUTHORIZED),
            Err(RemoteListingError::Unauthorized { .. })
        ));
        assert!(matches!(
            check_status("u", StatusCode::FORBIDDEN),
            Err(RemoteListingError::Unauthorized { .. })
        ));
        assert!(matches!(
            check_status("u", StatusCode::NOT_FOUND),
            Err(RemoteListingError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let lister = RemoteLister::new(&RemoteConfig::default(), None).unwrap();
        let result = lister.list("not a url").await;
        assert!(matches!(result, Err(RemoteListingError::InvalidUrl { .. })));
    }

    #[test]
    fn test_zero_rate_limit_is_clamped() {
        let config = RemoteConfig {
            rate_limit_rps: 0,
            ..RemoteConfig::default()
        };
        assert!(RemoteLister::new(&config, None).is_ok());
    }
}
