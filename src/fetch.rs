//! Byte transport for catalog documents and file downloads.
//!
//! Every network access of the crate goes through the [`Fetcher`] trait. The
//! default [`HttpFetcher`] issues one blocking request per call, bounded by the
//! timeouts of [`ClientConfig`], and never retries.

use std::io::Read;

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, VlError};

/// Upper bound for a single response body (images and PDFs included).
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Fetches raw bytes from a URL.
pub trait Fetcher {
    /// Fetch the body behind `url`.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::Http`] if the resource cannot be retrieved.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher backed by a shared `ureq` agent.
#[derive(Debug)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher using the timeouts and user agent of `config`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout))
            .timeout_global(Some(config.request_timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {url}");
        let response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| VlError::Http(format!("request for {url} failed: {e}")))?;

        let mut body = Vec::new();
        response
            .into_body()
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| VlError::Http(format!("reading body of {url} failed: {e}")))?;
        Ok(body)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for std::rc::Rc<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}
