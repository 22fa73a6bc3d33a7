//! Domain type classification of catalog documents.
//!
//! Upstream records are inconsistent: some carry an explicit type in the OAI
//! header, legacy records only reveal their type through the shape of the
//! structural map. Classification therefore runs an ordered list of
//! [`ClassificationStrategy`] implementations and takes the first answer:
//!
//! 1. [`HeaderHint`]: a known `<setSpec>` value in the response header
//! 2. [`AuthoredPages`]: an author and a page extent in the item's metadata
//! 3. [`NestingDepth`]: the depth of the item in the logical structural map

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, VlError};
use crate::mets::MetsDocument;

/// The four kinds of catalog items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    /// A periodical.
    Journal,
    /// A volume of a periodical (or a book).
    Volume,
    /// An issue of a volume.
    Issue,
    /// A single article.
    Article,
}

impl ElementKind {
    /// Map an OAI `setSpec` value to a kind.
    #[must_use]
    pub fn from_set_spec(spec: &str) -> Option<Self> {
        match spec.trim() {
            "periodical" | "journal" | "multivolumework" => Some(Self::Journal),
            "journal_volume" | "book" => Some(Self::Volume),
            "journal_issue" => Some(Self::Issue),
            "article" | "document" => Some(Self::Article),
            _ => None,
        }
    }

    /// Whether items of this kind describe a single point in time, so that
    /// their publication date is reduced to a year.
    #[must_use]
    pub fn is_year_only(self) -> bool {
        !matches!(self, Self::Journal)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Journal => "Journal",
            Self::Volume => "Volume",
            Self::Issue => "Issue",
            Self::Article => "Article",
        };
        write!(f, "{name}")
    }
}

/// One rule of the classification chain.
pub trait ClassificationStrategy {
    /// Kind of the item `id` described by `mets`, if this rule can tell.
    fn classify(&self, mets: &MetsDocument, id: &str) -> Option<ElementKind>;
}

/// Explicit type from the `<setSpec>` entries of the OAI response header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderHint;

impl ClassificationStrategy for HeaderHint {
    fn classify(&self, mets: &MetsDocument, _id: &str) -> Option<ElementKind> {
        mets.set_specs()
            .iter()
            .find_map(|spec| ElementKind::from_set_spec(spec))
    }
}

/// Items whose metadata names an author and a page extent are articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoredPages;

impl ClassificationStrategy for AuthoredPages {
    fn classify(&self, mets: &MetsDocument, id: &str) -> Option<ElementKind> {
        mets.section_by_id(id)?
            .metadata
            .as_ref()?
            .has_authored_pages
            .then_some(ElementKind::Article)
    }
}

/// Kind derived from the nesting depth of the item's section.
///
/// Depth 1 is a journal and depth 3 or more an issue. At depth 2 a section
/// whose subsections point to other documents is a volume; without such
/// subsections it is an article.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestingDepth;

impl ClassificationStrategy for NestingDepth {
    fn classify(&self, mets: &MetsDocument, id: &str) -> Option<ElementKind> {
        let path = mets.own_section_path(id);
        let section = path.last()?;
        let kind = match path.len() {
            1 => ElementKind::Journal,
            2 => {
                if section.children.iter().any(|c| !c.resource_pointers.is_empty()) {
                    ElementKind::Volume
                } else {
                    ElementKind::Article
                }
            },
            _ => ElementKind::Issue,
        };
        Some(kind)
    }
}

/// Default chain, most authoritative rule first.
pub const STRATEGIES: [&dyn ClassificationStrategy; 3] = [&HeaderHint, &AuthoredPages, &NestingDepth];

/// Classify the item `id` described by `mets` with the default chain.
///
/// # Errors
///
/// Returns [`VlError::Classification`] if no rule yields a kind, which only
/// happens for documents without any recognised section.
pub fn classify(mets: &MetsDocument, id: &str) -> Result<ElementKind> {
    classify_with(&STRATEGIES, mets, id)
}

/// Classify with a custom chain of strategies.
///
/// # Errors
///
/// Returns [`VlError::Classification`] if no strategy yields a kind.
pub fn classify_with(
    strategies: &[&dyn ClassificationStrategy],
    mets: &MetsDocument,
    id: &str,
) -> Result<ElementKind> {
    let kind = strategies
        .iter()
        .find_map(|s| s.classify(mets, id))
        .ok_or_else(|| VlError::Classification(format!("no type could be determined for id {id}")))?;
    debug!("Classified {id} as {kind}");
    Ok(kind)
}
