//! Cross-document reference resolution.
//!
//! A catalog document only describes one item in full. Its children and its
//! parent are reached through resource pointers (`<mets:mptr>`) naming the
//! OAI URL of another document. The [`Resolver`] follows such pointers: it
//! fetches the target, builds its section tree, classifies it and constructs
//! the matching [`ExportElement`].
//!
//! Targets that turn out not to be catalog data (an image, an error page
//! without structural map) are skipped with an `info` event; transport and
//! markup errors are passed on.

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use tracing::{debug, info};
use url::Url;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::element::ExportElement;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::mets::MetsDocument;

/// Query parameter carrying the external id in OAI URLs.
const IDENTIFIER_PARAM: &str = "identifier";

/// External id from the `identifier` query parameter of an OAI URL.
///
/// Only the leading digits of the parameter are kept.
///
/// # Errors
///
/// Returns [`crate::VlError::InvalidUrl`] if `url` is not an absolute URL.
pub fn identifier_from_url(url: &str) -> Result<Option<String>> {
    let parsed = Url::parse(url)?;
    let id = parsed
        .query_pairs()
        .find(|(key, _)| key == IDENTIFIER_PARAM)
        .map(|(_, value)| value.chars().take_while(char::is_ascii_digit).collect::<String>())
        .filter(|id| !id.is_empty());
    Ok(id)
}

/// Fetches catalog documents and turns them into elements.
pub struct Resolver {
    config: ClientConfig,
    fetcher: Rc<dyn Fetcher>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(config: ClientConfig, fetcher: Rc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transport used for documents and file downloads.
    #[must_use]
    pub fn fetcher(&self) -> &Rc<dyn Fetcher> {
        &self.fetcher
    }

    /// Fetch and parse the document behind `url`.
    ///
    /// # Errors
    ///
    /// Returns the transport error, [`crate::VlError::Markup`] for malformed
    /// markup or [`crate::VlError::MissingStructMap`] if the response is not
    /// a catalog document.
    pub fn fetch_document(&self, url: &str) -> Result<MetsDocument> {
        debug!("Fetching catalog document {url}");
        let bytes = self.fetcher.fetch(url)?;
        MetsDocument::from_bytes(&bytes)
    }

    /// Fetch and parse the OAI record of an external id.
    ///
    /// # Errors
    ///
    /// See [`Resolver::fetch_document`].
    pub fn fetch_document_by_id(&self, id: &str) -> Result<MetsDocument> {
        self.fetch_document(&self.config.oai_url(id))
    }

    /// Classify the item `id` in `mets` and construct its element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VlError::Classification`] if no type can be determined.
    pub fn build(
        self: &Rc<Self>,
        id: &str,
        mets: Rc<MetsDocument>,
        parent: Option<Weak<ExportElement>>,
    ) -> Result<Rc<ExportElement>> {
        let kind = classify(&mets, id)?;
        Ok(ExportElement::new(Rc::clone(self), id, kind, mets, parent))
    }

    /// Follow a resource pointer to the element it names.
    ///
    /// Returns `None` if the URL carries no identifier or the target is not
    /// valid catalog data.
    ///
    /// # Errors
    ///
    /// Propagates transport and markup errors and unparsable URLs.
    pub fn resolve_pointer(
        self: &Rc<Self>,
        url: &str,
        parent: Option<Weak<ExportElement>>,
    ) -> Result<Option<Rc<ExportElement>>> {
        let Some(id) = identifier_from_url(url)? else {
            info!("The URL {url} carries no identifier -> Skipping!");
            return Ok(None);
        };

        let built = self
            .fetch_document(url)
            .and_then(|mets| self.build(&id, Rc::new(mets), parent));
        match built {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is_invalid_response() => {
                info!("The URL {url} could not be resolved ({e}) -> Skipping!");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    /// Walk a chain of hierarchy labels starting at the item `root_id`.
    ///
    /// Each label either names the current section or is contained in the
    /// label of one of its subsections, which becomes the current section.
    /// A matched subsection that is only a pointer to another document is
    /// followed before the next label is looked up. Labels without a match
    /// are skipped. A pointer back to a document already read ends the walk.
    /// Returns the external id of the last matched section.
    ///
    /// # Errors
    ///
    /// Propagates fetch and parse errors.
    pub fn locate_by_labels(&self, root_id: &str, labels: &[String]) -> Result<Option<String>> {
        let mut mets = self.fetch_document_by_id(root_id)?;
        let mut current = root_id.to_string();
        let mut pending: Option<String> = None;
        let mut visited: HashSet<String> = HashSet::from([self.config.oai_url(root_id)]);
        let mut matched = false;

        for label in labels {
            if let Some(url) = pending.take() {
                if !visited.insert(url.clone()) {
                    debug!("Pointer of section {current} leads back to {url}; stopping");
                    break;
                }
                mets = self.fetch_document(&url)?;
            }

            let path = mets.own_section_path(&current);
            let Some(section) = path.last() else {
                break;
            };
            match section.find_by_label(label) {
                Some(found) if found.id == section.id => {
                    matched = true;
                },
                Some(found) => {
                    debug!("Label \"{label}\" matched section {}", found.id);
                    matched = true;
                    current = found.external_id().to_string();
                    if found.children.is_empty() {
                        pending = found.url_pointer().map(str::to_string);
                    }
                },
                None => debug!("No section labelled \"{label}\" below {}", section.id),
            }
        }

        Ok(matched.then_some(current))
    }
}
