//! Configuration options for the catalog client.
//!
//! This module provides the [`ClientConfig`] struct which controls where
//! catalog documents are fetched from, how derived URLs are built and how long
//! a single request may block.

use std::fmt;
use std::time::Duration;

/// Response format requested from the OAI endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// METS container with embedded MODS descriptive metadata.
    #[default]
    Mets,
    /// Plain MODS records.
    Mods,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mets => write!(f, "mets"),
            Self::Mods => write!(f, "mods"),
        }
    }
}

/// Configuration for the catalog client.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use visual_library::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_base_url("https://sammlungen.example.org")
///     .with_request_timeout(Duration::from_secs(10));
///
/// assert_eq!(config.item_url("42"), "https://sammlungen.example.org/42");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // === Endpoints ===
    /// Scheme and host of the catalog, without a trailing slash.
    pub base_url: String,

    /// Path template of the OAI `GetRecord` call.
    ///
    /// `{format}` and `{id}` are substituted.
    pub oai_path: String,

    /// Path template of the direct PDF download; `{id}` is substituted.
    pub pdf_path: String,

    /// Format requested from the OAI endpoint.
    pub response_format: ResponseFormat,

    // === Transport ===
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,

    /// Maximum time for a whole request. Requests are never retried.
    pub request_timeout: Duration,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    // === HTML item pages ===
    /// Element id of the breadcrumb navigation on an item page.
    pub navigation_element_id: String,

    /// Element id of the title block linking to the canonical item.
    pub title_element_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sammlungen.ub.uni-frankfurt.de".to_string(),
            oai_path: "/oai/?verb=GetRecord&metadataPrefix={format}&identifier={id}".to_string(),
            pdf_path: "/biodiv/download/pdf/{id}".to_string(),
            response_format: ResponseFormat::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("visual-library/", env!("CARGO_PKG_VERSION")).to_string(),
            navigation_element_id: "navPath".to_string(),
            title_element_id: "titleinfo".to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the catalog host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the requested response format.
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// URL of the OAI record for an external id.
    #[must_use]
    pub fn oai_url(&self, id: &str) -> String {
        let path = self
            .oai_path
            .replace("{format}", &self.response_format.to_string())
            .replace("{id}", id);
        format!("{}{path}", self.base_url)
    }

    /// Canonical browsing URL of an item.
    #[must_use]
    pub fn item_url(&self, id: &str) -> String {
        format!("{}/{id}", self.base_url)
    }

    /// Direct PDF download URL of an item.
    #[must_use]
    pub fn pdf_url(&self, id: &str) -> String {
        format!("{}{}", self.base_url, self.pdf_path.replace("{id}", id))
    }
}
