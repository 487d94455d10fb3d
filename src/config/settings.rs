//! Settings structures for SourceFinder-RS configuration

use crate::search::Granularity;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure matching sourcefinder.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub outgoing: OutgoingSettings,
    pub mirrors: MirrorSettings,
    pub classifier: ClassifierSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (SOURCEFINDER_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("SOURCEFINDER_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("SOURCEFINDER_CLASSIFIER_URL") {
            self.classifier.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("SOURCEFINDER_MIRROR_DIRECTORY") {
            self.mirrors.directory_url = val;
        }
        if let Ok(val) = std::env::var("SOURCEFINDER_FALLBACK_MIRROR") {
            self.mirrors.fallback = val;
        }
        if let Ok(val) = std::env::var("SOURCEFINDER_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.outgoing.request_timeout = timeout;
            }
        }
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug mode
    pub debug: bool,
    /// Instance name shown in logs
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "SourceFinder".to_string(),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Keywords extracted per claim
    pub max_keywords: usize,
    /// Keywords the disjunctive query may drop per clause
    pub drop_count: usize,
    /// Result categories excluded from every search
    pub excludes: Vec<String>,
    /// Result categories required in every search
    pub includes: Vec<String>,
    /// Optional location hint
    pub near: String,
    /// Earliest-buffer capacity; zero disables the buffer
    pub earliest_k: usize,
    /// Window step count
    pub step: u32,
    /// Window step granularity
    pub granularity: Granularity,
    /// Probe windows with a single page before the exhaustive scan
    pub probe_windows: bool,
    /// Scan start when the caller gives no lower bound; the day the
    /// content source went live
    pub default_since: NaiveDate,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_keywords: 5,
            drop_count: 1,
            excludes: vec!["nativeretweets".to_string(), "replies".to_string()],
            includes: Vec::new(),
            near: String::new(),
            earliest_k: 0,
            step: 1,
            granularity: Granularity::Years,
            probe_windows: false,
            default_since: NaiveDate::from_ymd_opt(2006, 3, 21)
                .expect("valid epoch date"),
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Request timeout in seconds
    pub request_timeout: f64,
    /// Outgoing rate limit; zero disables throttling
    pub requests_per_minute: u32,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Max idle connections per host
    pub pool_maxsize: usize,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: crate::DEFAULT_TIMEOUT as f64,
            requests_per_minute: 0,
            verify_ssl: true,
            pool_maxsize: 10,
            proxies: ProxySettings::default(),
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub all: Option<String>,
    pub http: Option<String>,
    pub https: Option<String>,
}

/// Mirror directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    /// Remote document listing live mirror instances
    pub directory_url: String,
    /// Dot-separated path to the instance list inside the document
    pub directory_path: String,
    /// Mirror used when the directory is unreachable
    pub fallback: String,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            directory_url:
                "https://raw.githubusercontent.com/libredirect/instances/main/data.json"
                    .to_string(),
            directory_path: "nitter.clearnet".to_string(),
            fallback: "https://nitter.net".to_string(),
        }
    }
}

/// Classifier service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Inference endpoint; searches cannot run without one
    pub endpoint: Option<String>,
    /// Items sent per inference request
    pub batch_size: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            batch_size: 16,
        }
    }
}
