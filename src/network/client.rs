//! HTTP client for fetching mirror pages

use super::user_agent::{accept_html, accept_language, generate_user_agent};
use crate::config::OutgoingSettings;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

/// One fetched page. Transport failures are folded into `status` (500
/// sentinel, empty body) so callers never see raw transport errors.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
    pub url: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    fn transport_failure(url: &str) -> Self {
        Self {
            html: String::new(),
            status: 500,
            url: url.to_string(),
        }
    }
}

/// Page-fetch collaborator seam. Safe to call concurrently across
/// independent client instances; used sequentially within one search.
#[async_trait]
pub trait PageFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchedPage;
}

/// HTTP client wrapper with mirror-friendly defaults: bounded timeouts,
/// a realistic user agent, and an outgoing rate limiter since the content
/// source throttles aggressive crawlers.
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    user_agent: String,
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let timeout = Duration::from_secs_f64(
            settings.request_timeout.min(crate::MAX_TIMEOUT as f64),
        );
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .gzip(true)
            .brotli(true);

        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let limiter = NonZeroU32::new(settings.requests_per_minute)
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client: builder.build()?,
            default_timeout: timeout,
            user_agent: generate_user_agent(),
            limiter,
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// GET a JSON document (mirror directory).
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.throttle().await;
        let response = self
            .client
            .get(url)
            .timeout(self.default_timeout)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }
        Ok(response.json().await?)
    }

    /// POST a JSON body and decode the JSON response (classifier endpoint).
    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        self.throttle().await;
        let response = self
            .client
            .post(url)
            .timeout(self.default_timeout)
            .header("User-Agent", &self.user_agent)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("POST {url} returned {status}"));
        }
        Ok(response.json().await?)
    }

    /// Get current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl PageFetch for HttpClient {
    async fn fetch(&self, url: &str) -> FetchedPage {
        self.throttle().await;
        let request = self
            .client
            .get(url)
            .timeout(self.default_timeout)
            .header("User-Agent", &self.user_agent)
            .header("Accept", accept_html())
            .header("Accept-Language", accept_language())
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1");

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                match response.text().await {
                    Ok(html) => FetchedPage {
                        html,
                        status,
                        url: final_url,
                    },
                    Err(e) => {
                        warn!("failed reading body from {final_url}: {e}");
                        FetchedPage::transport_failure(&final_url)
                    }
                }
            }
            Err(e) => {
                warn!("fetch failed for {url}: {e}");
                FetchedPage::transport_failure(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let page = client.fetch(&format!("{}/search", server.uri())).await;
        assert!(page.is_success());
        assert_eq!(page.html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_unreachable_host_becomes_sentinel() {
        let client = HttpClient::with_settings(&OutgoingSettings {
            request_timeout: 1.0,
            ..OutgoingSettings::default()
        })
        .unwrap();
        // reserved TEST-NET address, nothing listens there
        let page = client.fetch("http://192.0.2.1:9/none").await;
        assert!(page.is_server_error());
        assert!(page.html.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_passthrough() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let page = client.fetch(&server.uri()).await;
        assert!(page.is_server_error());
    }
}
