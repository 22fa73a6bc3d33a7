//! Entry point for fetching catalog items.
//!
//! [`VisualLibrary`] turns an external id into a fully classified
//! [`ExportElement`]. It fetches the item's OAI record, builds the section
//! tree, classifies the item and constructs the element. Related elements are
//! resolved later, on access.

use std::path::Path;
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::element::ExportElement;
use crate::error::{Result, VlError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::metadata::normalize_whitespace;
use crate::mets::MetsDocument;
use crate::page::{Page, PHYSICAL_ID_PREFIX};
use crate::resolver::Resolver;

lazy_static! {
    static ref TRAILING_ID: Regex = Regex::new(r"(\d+)\D*$").unwrap();
}

/// Client for a Visual Library catalog.
///
/// # Examples
///
/// ```no_run
/// use visual_library::{ElementKind, VisualLibrary};
///
/// let library = VisualLibrary::new();
/// let article = library.fetch_by_id("10902187")?;
/// assert_eq!(article.kind(), ElementKind::Article);
/// for author in article.authors() {
///     println!("{} {}", author.given_name, author.family_name);
/// }
/// # Ok::<(), visual_library::VlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct VisualLibrary {
    resolver: Rc<Resolver>,
}

impl Default for VisualLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualLibrary {
    /// Client for the default catalog over HTTP.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Client for a configured catalog over HTTP.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let fetcher = HttpFetcher::new(&config);
        Self::with_fetcher(config, fetcher)
    }

    /// Client using a custom transport.
    #[must_use]
    pub fn with_fetcher(config: ClientConfig, fetcher: impl Fetcher + 'static) -> Self {
        Self {
            resolver: Rc::new(Resolver::new(config, Rc::new(fetcher))),
        }
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.resolver.config()
    }

    /// Fetch and parse the OAI record of `id` without classifying it.
    ///
    /// # Errors
    ///
    /// Returns transport errors, [`VlError::Markup`] and
    /// [`VlError::MissingStructMap`].
    pub fn fetch_document(&self, id: &str) -> Result<MetsDocument> {
        self.resolver.fetch_document_by_id(id)
    }

    /// Fetch the item `id` and build its element.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`VisualLibrary::fetch_document`] and
    /// [`VlError::Classification`].
    pub fn fetch_by_id(&self, id: &str) -> Result<Rc<ExportElement>> {
        let mets = self.fetch_document(id)?;
        self.fetch_from_document(id, mets)
    }

    /// Build the element of item `id` from an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::Classification`] if no type can be determined.
    pub fn fetch_from_document(&self, id: &str, mets: MetsDocument) -> Result<Rc<ExportElement>> {
        self.resolver.build(id, Rc::new(mets), None)
    }

    /// Build an element from a stored OAI response.
    ///
    /// The item id is read from the `identifier` attribute of the response's
    /// `<request>` element.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::IoError`] if the file cannot be read and
    /// [`VlError::InvalidFormat`] if it has no request marker.
    pub fn fetch_from_local_file(&self, path: impl AsRef<Path>) -> Result<Rc<ExportElement>> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mets = MetsDocument::from_bytes(&bytes)?;
        let id = mets
            .request_identifier()
            .map(str::to_string)
            .ok_or_else(|| {
                VlError::InvalidFormat(format!(
                    "{} has no <request identifier=\"...\"> element",
                    path.display()
                ))
            })?;
        debug!("Loaded item {id} from {}", path.display());
        self.fetch_from_document(&id, mets)
    }

    /// Find a single page by its id.
    ///
    /// Without `article_id` the containing article is discovered through the
    /// HTML item page of the page: its title link names the top-level item and
    /// its breadcrumb labels lead down to the article. Returns `None` if the
    /// article has no page with this id.
    ///
    /// # Errors
    ///
    /// Propagates fetch and parse errors; returns [`VlError::InvalidFormat`]
    /// if the item page has no title link.
    pub fn fetch_page_by_id(&self, page_id: &str, article_id: Option<&str>) -> Result<Option<Page>> {
        let page_id = page_id.strip_prefix(PHYSICAL_ID_PREFIX).unwrap_or(page_id);
        let article_id = match article_id {
            Some(id) => id.to_string(),
            None => {
                let (root_id, labels) = self.item_page_navigation(page_id)?;
                match self.resolver.locate_by_labels(&root_id, &labels)? {
                    Some(id) => id,
                    None => {
                        info!("No section of {root_id} matches the labels {labels:?}");
                        return Ok(None);
                    },
                }
            },
        };

        let article = self.fetch_by_id(&article_id)?;
        Ok(article.pages().into_iter().find(|page| page.id() == page_id))
    }

    /// Title link id and breadcrumb labels of the HTML item page of `id`.
    fn item_page_navigation(&self, id: &str) -> Result<(String, Vec<String>)> {
        let config = self.config();
        let url = config.item_url(id);
        let bytes = self.resolver.fetcher().fetch(&url)?;
        let html = Html::parse_document(&String::from_utf8_lossy(&bytes));

        let navigation = selector(&format!("#{} a", config.navigation_element_id))?;
        let labels: Vec<String> = html
            .select(&navigation)
            .map(|a| normalize_whitespace(&a.text().collect::<String>()))
            .filter(|label| !label.is_empty())
            .collect();

        let title = selector(&format!("#{} a", config.title_element_id))?;
        let root_id = html
            .select(&title)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| TRAILING_ID.captures(href))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| VlError::InvalidFormat(format!("no title link on item page {url}")))?;

        debug!("Item page {url} links to {root_id} via {labels:?}");
        Ok((root_id, labels))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| VlError::InvalidFormat(format!("invalid selector {css}: {e:?}")))
}
