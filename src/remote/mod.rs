//! Remote catalog host: endpoint layout and HTTP transport

use crate::config::Config;
use crate::error::FetchError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Version string the catalog uses for entries without a published release
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

/// HTTP access; calls are awaited inline by the main loop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the network is reachable at all
    async fn is_online(&self) -> bool;

    /// GET `url`, returning the body of a 200 response
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Which release a file download targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release<'a> {
    /// Newest upload, for entries without a tagged release
    Latest,
    Tag(&'a str),
}

/// URL layout of the catalog host
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("Invalid base URL '{}'", base_url))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            bail!("Base URL must be an http(s) URL, got '{}'", base_url);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.into_iter().filter(|s| !s.is_empty()));
        }
        url.to_string()
    }

    /// Category → script list document
    pub fn catalog(&self) -> String {
        self.endpoint(["service", "main", "filename", "releases.json"])
    }

    /// Per-script file list
    pub fn metadata(&self, reference: &str) -> String {
        self.endpoint(
            ["service", "main", "filename-last"]
                .into_iter()
                .chain(reference.split('/')),
        )
    }

    /// Raw file content for one source path of a repository
    pub fn file(&self, owner: &str, repo: &str, release: Release<'_>, source: &str) -> String {
        let prefix: Vec<&str> = match release {
            Release::Latest => vec!["service", "manual", "owner", owner, "repository", repo],
            Release::Tag(tag) => vec![
                "service", "release", "owner", owner, "repository", repo, "tag", tag,
            ],
        };
        self.endpoint(
            prefix
                .into_iter()
                .chain(std::iter::once("filename-last"))
                .chain(source.split('/')),
        )
    }
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    probe_url: String,
    offline: bool,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.network.user_agent.clone())
            .timeout(Duration::from_secs(config.network.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            probe_url: config.base_url.clone(),
            offline: config.network.offline,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn is_online(&self) -> bool {
        if self.offline {
            return false;
        }
        // One HEAD round trip per install or catalog load, bounded by the client timeout
        match self.client.head(&self.probe_url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Reachability probe failed: {}", e);
                false
            }
        }
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}
