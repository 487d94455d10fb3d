//! Mirror pool management
//!
//! The pool holds the ordered list of mirror base URLs and the current
//! pointer. It is owned by exactly one retrieval client; concurrent
//! searches each build their own pool.

use crate::config::MirrorSettings;
use crate::network::HttpClient;
use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

/// Ordered pool of mirror base URLs with a rotating current pointer.
#[derive(Debug, Clone)]
pub struct MirrorPool {
    mirrors: Vec<String>,
    current: usize,
}

impl MirrorPool {
    /// Build a pool from explicit base URLs. Trailing slashes are trimmed
    /// so paths concatenate cleanly. Empty entries are discarded; at least
    /// one mirror must remain.
    pub fn new(mirrors: Vec<String>) -> Self {
        let mirrors: Vec<String> = mirrors
            .into_iter()
            .map(|m| m.trim_end_matches('/').to_string())
            .filter(|m| !m.is_empty())
            .collect();
        assert!(!mirrors.is_empty(), "mirror pool requires at least one mirror");
        Self {
            mirrors,
            current: 0,
        }
    }

    /// Fetch the mirror directory and build a pool from it, falling back to
    /// the configured fixed mirror when the directory is unreachable or
    /// empty. The directory is consulted once per construction.
    pub async fn from_directory(client: &HttpClient, settings: &MirrorSettings) -> Self {
        match Self::fetch_directory(client, settings).await {
            Ok(list) if !list.is_empty() => {
                info!("mirror directory provided {} instances", list.len());
                Self::new(list)
            }
            Ok(_) => {
                warn!("mirror directory was empty, using fallback {}", settings.fallback);
                Self::new(vec![settings.fallback.clone()])
            }
            Err(e) => {
                warn!(
                    "mirror directory unreachable ({e}), using fallback {}",
                    settings.fallback
                );
                Self::new(vec![settings.fallback.clone()])
            }
        }
    }

    async fn fetch_directory(client: &HttpClient, settings: &MirrorSettings) -> Result<Vec<String>> {
        let json = client.get_json(&settings.directory_url).await?;
        let mut node = &json;
        for key in settings.directory_path.split('.') {
            node = node
                .get(key)
                .ok_or_else(|| anyhow!("directory document has no '{key}' field"))?;
        }
        let list = node
            .as_array()
            .ok_or_else(|| anyhow!("directory field is not a list"))?;
        Ok(list
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect())
    }

    /// The mirror currently serving requests.
    pub fn current(&self) -> &str {
        &self.mirrors[self.current]
    }

    /// Advance to the next mirror, wrapping around at the end.
    pub fn rotate(&mut self) -> &str {
        self.current = (self.current + 1) % self.mirrors.len();
        debug!("rotated to mirror {}", self.current());
        self.current()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let mut pool = MirrorPool::new(vec![
            "https://a.example".into(),
            "https://b.example/".into(),
            "https://c.example".into(),
        ]);
        assert_eq!(pool.current(), "https://a.example");
        assert_eq!(pool.rotate(), "https://b.example");
        assert_eq!(pool.rotate(), "https://c.example");
        assert_eq!(pool.rotate(), "https://a.example");
    }

    #[test]
    fn test_discards_empty_entries() {
        let pool = MirrorPool::new(vec!["".into(), "https://a.example".into()]);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_fallback() {
        use crate::config::OutgoingSettings;

        let client = HttpClient::with_settings(&OutgoingSettings {
            request_timeout: 1.0,
            ..OutgoingSettings::default()
        })
        .unwrap();
        let settings = MirrorSettings {
            directory_url: "http://192.0.2.1:9/data.json".into(),
            ..MirrorSettings::default()
        };
        let pool = MirrorPool::from_directory(&client, &settings).await;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.current(), settings.fallback.trim_end_matches('/'));
    }

    #[tokio::test]
    async fn test_directory_parse() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nitter": { "clearnet": ["https://one.example/", "https://two.example"] }
            })))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let settings = MirrorSettings {
            directory_url: server.uri(),
            ..MirrorSettings::default()
        };
        let pool = MirrorPool::from_directory(&client, &settings).await;
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.current(), "https://one.example");
    }
}
