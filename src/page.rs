//! Pages of the physical structural map and their transcriptions.
//!
//! Every `<mets:div TYPE="page">` of the physical map becomes a [`Page`]. A
//! page points at its image files and its ALTO transcription through
//! `<mets:fptr>` children; which file plays which role is encoded in the file
//! id (`IMG_THUMBS_9660761`, `ALTO_9660761`, ...).

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::dom::{decode, Document, Node};
use crate::error::{Result, VlError};
use crate::fetch::Fetcher;
use crate::file::FileResource;
use crate::mets::MetsDocument;

/// Prefix of physical division ids (`phys` + page id).
pub const PHYSICAL_ID_PREFIX: &str = "phys";

const PHYSICAL_MAP_TYPE: &str = "PHYSICAL";
const PAGE_TYPE: &str = "page";

/// Role of a file attached to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRole {
    /// Small preview image.
    Thumbnail,
    /// Lowest resolution image.
    MinResolution,
    /// Default resolution image.
    DefaultResolution,
    /// Full resolution image.
    MaxResolution,
    /// ALTO transcription.
    Transcription,
}

impl ResourceRole {
    /// Substring of the file id marking this role.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Thumbnail => "THUMBS",
            Self::MinResolution => "MIN",
            Self::DefaultResolution => "DEFAULT",
            Self::MaxResolution => "MAX",
            Self::Transcription => "ALTO",
        }
    }
}

/// A `<mets:div TYPE="page">` of the physical structural map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEntry {
    /// Page id without its `phys` prefix.
    pub id: String,
    /// Display label.
    pub label: Option<String>,
    /// Position in the physical sequence.
    pub order: Option<String>,
    /// Ids of the files the page points to.
    pub file_ids: Vec<String>,
}

impl PageEntry {
    fn from_node(div: Node<'_>) -> Self {
        let raw_id = div.attr("id").unwrap_or_default();
        PageEntry {
            id: raw_id
                .strip_prefix(PHYSICAL_ID_PREFIX)
                .unwrap_or(raw_id)
                .to_string(),
            label: div.attr("label").map(str::to_string),
            order: div.attr("order").map(str::to_string),
            file_ids: div
                .children_named("mets:fptr", &[])
                .iter()
                .filter_map(|f| f.attr("fileid"))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Page divisions of the physical structural map of `doc`, in document order.
pub(crate) fn physical_pages(doc: &Document<'_>) -> Vec<PageEntry> {
    let Some(map) = doc.find("mets:structmap", &[("type", PHYSICAL_MAP_TYPE)]) else {
        debug!("Document has no physical structural map");
        return Vec::new();
    };
    map.find_all("mets:div", &[("type", PAGE_TYPE)])
        .into_iter()
        .map(PageEntry::from_node)
        .collect()
}

/// One page of an item.
pub struct Page {
    entry: PageEntry,
    mets: Rc<MetsDocument>,
    fetcher: Rc<dyn Fetcher>,
    full_text: OnceCell<String>,
}

impl Page {
    /// Page id without its `phys` prefix.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.entry.id
    }

    /// Catalog id of the page; the same value as [`Page::id`].
    #[must_use]
    pub fn vl_id(&self) -> &str {
        &self.entry.id
    }

    /// Display label (`Seite 61`).
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.entry.label.as_deref()
    }

    /// Position in the physical sequence.
    #[must_use]
    pub fn order(&self) -> Option<&str> {
        self.entry.order.as_deref()
    }

    /// File of the given role.
    ///
    /// Returns `None` if no file pointer of the page carries the role marker.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::FileNotFound`] if the pointer names a file the
    /// document does not define, and [`VlError::UnsupportedLocation`] for
    /// files not located by URL.
    pub fn resource(&self, role: ResourceRole) -> Result<Option<FileResource>> {
        let Some(file_id) = self
            .entry
            .file_ids
            .iter()
            .find(|id| id.contains(role.marker()))
        else {
            return Ok(None);
        };
        let entry = self.mets.file(file_id).ok_or_else(|| {
            VlError::FileNotFound(format!(
                "page {} points to undefined file {file_id}",
                self.entry.id
            ))
        })?;
        entry.resource().map(Some)
    }

    /// Thumbnail image.
    ///
    /// # Errors
    ///
    /// See [`Page::resource`].
    pub fn thumbnail(&self) -> Result<Option<FileResource>> {
        self.resource(ResourceRole::Thumbnail)
    }

    /// Lowest resolution image.
    ///
    /// # Errors
    ///
    /// See [`Page::resource`].
    pub fn image_min_resolution(&self) -> Result<Option<FileResource>> {
        self.resource(ResourceRole::MinResolution)
    }

    /// Default resolution image.
    ///
    /// # Errors
    ///
    /// See [`Page::resource`].
    pub fn image_default_resolution(&self) -> Result<Option<FileResource>> {
        self.resource(ResourceRole::DefaultResolution)
    }

    /// Full resolution image.
    ///
    /// # Errors
    ///
    /// See [`Page::resource`].
    pub fn image_max_resolution(&self) -> Result<Option<FileResource>> {
        self.resource(ResourceRole::MaxResolution)
    }

    /// ALTO transcription file.
    ///
    /// # Errors
    ///
    /// See [`Page::resource`].
    pub fn transcription(&self) -> Result<Option<FileResource>> {
        self.resource(ResourceRole::Transcription)
    }

    /// Plain text of the transcription, downloaded once.
    ///
    /// Pages without a transcription have an empty text.
    ///
    /// # Errors
    ///
    /// Propagates resource, download and markup errors.
    pub fn full_text(&self) -> Result<&str> {
        if let Some(text) = self.full_text.get() {
            return Ok(text);
        }
        let text = match self.transcription()? {
            Some(file) => parse_transcription(file.download(self.fetcher.as_ref())?)?,
            None => {
                debug!("Page {} has no transcription", self.entry.id);
                String::new()
            },
        };
        Ok(self.full_text.get_or_init(|| text))
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.entry.id)
            .field("label", &self.entry.label)
            .field("order", &self.entry.order)
            .field("file_ids", &self.entry.file_ids)
            .finish_non_exhaustive()
    }
}

/// Pages of the physical structural map of `mets`, in document order.
///
/// Documents without a physical map have no pages.
#[must_use]
pub fn pages_of(mets: &Rc<MetsDocument>, fetcher: &Rc<dyn Fetcher>) -> Vec<Page> {
    mets.pages()
        .iter()
        .map(|entry| Page {
            entry: entry.clone(),
            mets: Rc::clone(mets),
            fetcher: Rc::clone(fetcher),
            full_text: OnceCell::new(),
        })
        .collect()
}

/// Convert an ALTO transcription into plain text.
///
/// Each `<TextLine>` becomes one line. Its element children contribute their
/// `CONTENT` attribute, or a single space if they have none (`<SP/>`).
///
/// # Errors
///
/// Returns [`VlError::Markup`] if the transcription is not well-formed.
pub fn parse_transcription(bytes: &[u8]) -> Result<String> {
    let text = decode(bytes);
    let doc = Document::parse(&text)?;
    let lines: Vec<String> = doc
        .root()
        .descendants()
        .filter(|n| n.local_name().as_deref() == Some("textline"))
        .map(|line| {
            line.elements()
                .map(|token| token.attr("content").unwrap_or(" "))
                .collect::<String>()
        })
        .collect();
    Ok(lines.join("\n"))
}
