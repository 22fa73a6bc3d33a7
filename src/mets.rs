//! METS catalog documents and their logical section tree.
//!
//! A catalog response wraps one METS container. Its logical structural map
//! (`<mets:structMap TYPE="LOGICAL">`) nests `<mets:div>` divisions, each of
//! which becomes a [`Section`]. While building the tree every section is
//! resolved against the rest of the document:
//!
//! - `DMDID` points at the section's `<mets:dmdSec>` holding MODS metadata
//! - `<mets:fptr FILEID>` points at entries of the `DOWNLOAD` file group
//! - `<mets:mptr>` points at another catalog document (a child or parent item)
//!
//! The markup tree only lives while [`MetsDocument::new`] runs. Everything the
//! domain objects read later (sections with their metadata, header set specs,
//! file entries, physical pages) is extracted into owned values up front.
//!
//! # Examples
//!
//! ```
//! use visual_library::mets::MetsDocument;
//!
//! let xml = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/">
//!   <mets:structMap TYPE="LOGICAL">
//!     <mets:div ID="log10688403" TYPE="periodical" LABEL="Decheniana"/>
//!   </mets:structMap>
//! </mets:mets>"#;
//!
//! let mets = MetsDocument::parse(xml)?;
//! let section = mets.section_by_id("10688403").unwrap();
//! assert_eq!(section.label.as_deref(), Some("Decheniana"));
//! # Ok::<(), visual_library::VlError>(())
//! ```

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use crate::dom::{decode, Document, Node};
use crate::error::{Result, VlError};
use crate::file::{FileEntry, FileResource, URL_LOCATION_TYPE};
use crate::metadata::ModsRecord;
use crate::page::{physical_pages, PageEntry};

/// Division types that take part in the logical section tree.
pub const SECTION_TYPES: [&str; 7] = [
    "periodical",
    "volume",
    "issue",
    "article",
    "section",
    "document",
    "illustration",
];

/// Prefix of logical division ids (`log` + external id).
pub const LOGICAL_ID_PREFIX: &str = "log";

const STRUCT_MAP: &str = "mets:structmap";
const DIV: &str = "mets:div";
const LOGICAL_MAP_TYPE: &str = "LOGICAL";
const DOWNLOAD_GROUP_USE: &str = "DOWNLOAD";

/// Reference from a section to another catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePointer {
    /// `LOCTYPE` of the pointer; only `URL` can be followed.
    pub location_type: Option<String>,
    /// Target of the pointer.
    pub href: Option<String>,
}

impl ResourcePointer {
    fn from_node(node: Node<'_>) -> Self {
        ResourcePointer {
            location_type: node.attr("loctype").map(str::to_string),
            href: node.attr("xlink:href").map(str::to_string),
        }
    }

    /// The target URL, if this is a followable `URL` pointer.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self.location_type.as_deref() {
            Some(URL_LOCATION_TYPE) => self.href.as_deref(),
            _ => None,
        }
    }
}

/// One division of the logical structural map.
#[derive(Debug, Clone)]
pub struct Section {
    /// Division id including its prefix (`log10771471`).
    pub id: String,
    /// Division type (`periodical`, `volume`, ...), lower-cased.
    pub division_type: String,
    /// Id of the descriptive metadata block (`DMDID`).
    pub metadata_ref: Option<String>,
    /// Display label.
    pub label: Option<String>,
    /// Display/sort order.
    pub order: Option<String>,
    /// Language codes declared in the metadata block.
    pub languages: IndexSet<String>,
    /// Downloadable files attached to this division.
    pub files: Vec<FileResource>,
    /// Pointers to externally hosted documents, in document order.
    pub resource_pointers: Vec<ResourcePointer>,
    /// Contents of the `<mets:dmdSec>` block, if the reference resolved.
    pub metadata: Option<ModsRecord>,
    /// Nested divisions of an allowed type.
    pub children: Vec<Section>,
    file_ids: Vec<String>,
}

impl Section {
    fn build(div: Node<'_>, doc: &Document<'_>) -> Section {
        let metadata_ref = div.attr("dmdid").map(str::to_string);
        let metadata = metadata_ref
            .as_deref()
            .and_then(|r| r.split_whitespace().next())
            .and_then(|r| doc.find("mets:dmdsec", &[("id", r)]))
            .map(ModsRecord::from_node);

        Section {
            id: div.attr("id").unwrap_or_default().to_string(),
            division_type: div.attr("type").unwrap_or_default().to_ascii_lowercase(),
            label: div.attr("label").map(str::to_string),
            order: div.attr("order").map(str::to_string),
            languages: metadata
                .as_ref()
                .map(|m| m.languages.clone())
                .unwrap_or_default(),
            files: Vec::new(),
            resource_pointers: div
                .children_named("mets:mptr", &[])
                .into_iter()
                .map(ResourcePointer::from_node)
                .collect(),
            metadata,
            children: section_divs(div)
                .map(|child| Section::build(child, doc))
                .collect(),
            file_ids: div
                .children_named("mets:fptr", &[])
                .iter()
                .filter_map(|f| f.attr("fileid"))
                .map(str::to_string)
                .collect(),
            metadata_ref,
        }
    }

    /// External id, i.e. [`Section::id`] without its `log` prefix.
    #[must_use]
    pub fn external_id(&self) -> &str {
        self.id.strip_prefix(LOGICAL_ID_PREFIX).unwrap_or(&self.id)
    }

    /// First followable `URL` resource pointer.
    #[must_use]
    pub fn url_pointer(&self) -> Option<&str> {
        self.resource_pointers.iter().find_map(ResourcePointer::url)
    }

    /// Whether the label equals or contains `label`.
    #[must_use]
    pub fn label_contains(&self, label: &str) -> bool {
        self.label.as_deref().is_some_and(|l| l.contains(label))
    }

    /// Find the section labelled `label`, starting at `self`.
    ///
    /// An exact label match on `self` returns `self`; otherwise the first
    /// immediate child whose label contains `label` is returned.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<&Section> {
        if self.label.as_deref() == Some(label) {
            return Some(self);
        }
        self.children.iter().find(|c| c.label_contains(label))
    }

    fn attach_files(&mut self, group: Node<'_>) -> Result<()> {
        for file_id in &self.file_ids {
            debug!("Processing file pointer: {file_id}");
            match group.find("mets:file", &[("id", file_id.as_str())]) {
                Some(node) => {
                    let mut file = FileResource::from_node(node)?;
                    file.languages.clone_from(&self.languages);
                    self.files.push(file);
                },
                None => debug!("No file node found with id \"{file_id}\". Skipping!"),
            }
        }
        for child in &mut self.children {
            child.attach_files(group)?;
        }
        Ok(())
    }
}

fn section_divs<'a>(parent: Node<'a>) -> impl Iterator<Item = Node<'a>> + 'a {
    parent.elements().filter(|n| {
        n.matches(DIV, &[])
            && n.attr("type")
                .is_some_and(|t| SECTION_TYPES.iter().any(|s| s.eq_ignore_ascii_case(t)))
    })
}

/// A parsed catalog document with its resolved logical section tree.
#[derive(Debug, Clone)]
pub struct MetsDocument {
    sections: Vec<Section>,
    set_specs: Vec<String>,
    request_identifier: Option<String>,
    teaser_image_url: Option<String>,
    files: HashMap<String, FileEntry>,
    pages: Vec<PageEntry>,
}

impl MetsDocument {
    /// Build the section tree of a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::MissingStructMap`] if the document has no logical
    /// structural map, and [`VlError::UnsupportedLocation`] if an attached
    /// file uses a location type other than `URL`.
    pub fn new(document: &Document<'_>) -> Result<Self> {
        let struct_map = document
            .find(STRUCT_MAP, &[("type", LOGICAL_MAP_TYPE)])
            .ok_or_else(|| {
                VlError::MissingStructMap(format!(
                    "unexpected document with root element <{}>",
                    document.root_element_name()
                ))
            })?;
        let mut sections: Vec<Section> = section_divs(struct_map)
            .map(|div| Section::build(div, document))
            .collect();

        match document.find("mets:filegrp", &[("use", DOWNLOAD_GROUP_USE)]) {
            Some(group) => {
                for section in &mut sections {
                    section.attach_files(group)?;
                }
            },
            None => debug!("No file group with USE=\"{DOWNLOAD_GROUP_USE}\" in document"),
        }

        let mut files = HashMap::new();
        for node in document.find_all("mets:file", &[]) {
            let entry = FileEntry::from_node(node);
            files.entry(entry.id.clone()).or_insert(entry);
        }

        Ok(MetsDocument {
            sections,
            set_specs: document
                .find("header", &[])
                .map(|header| {
                    header
                        .find_all("setspec", &[])
                        .iter()
                        .map(|spec| spec.text().trim().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            request_identifier: document
                .find("request", &[])
                .and_then(|r| r.attr("identifier"))
                .map(str::to_string),
            teaser_image_url: document
                .find("mets:filegrp", &[("use", "TEASER")])
                .and_then(|group| group.find("mets:flocat", &[("loctype", URL_LOCATION_TYPE)]))
                .and_then(|location| location.attr("xlink:href"))
                .map(str::to_string),
            files,
            pages: physical_pages(document),
        })
    }

    /// Parse markup and build the section tree.
    ///
    /// # Errors
    ///
    /// See [`Document::parse`] and [`MetsDocument::new`].
    pub fn parse(xml: &str) -> Result<Self> {
        Self::new(&Document::parse(xml)?)
    }

    /// Decode and parse raw response bytes.
    ///
    /// # Errors
    ///
    /// See [`Document::parse`] and [`MetsDocument::new`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&decode(bytes))
    }

    /// Top-level sections of the logical structural map.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The outermost division (usually the periodical).
    #[must_use]
    pub fn root_section(&self) -> Option<&Section> {
        self.sections.first()
    }

    /// Depth-first search for the section of an external id.
    #[must_use]
    pub fn section_by_id(&self, external_id: &str) -> Option<&Section> {
        self.section_path(external_id)
            .and_then(|path| path.last().copied())
    }

    /// Chain of sections from the outermost division down to the section of
    /// `external_id`, both included.
    #[must_use]
    pub fn section_path(&self, external_id: &str) -> Option<Vec<&Section>> {
        let wanted = format!("{LOGICAL_ID_PREFIX}{external_id}");
        let mut path = Vec::new();
        self.sections
            .iter()
            .any(|s| search_path(s, &wanted, &mut path))
            .then_some(path)
    }

    /// Chain of first children from the outermost division down to the
    /// innermost division this document describes.
    #[must_use]
    pub fn first_child_chain(&self) -> Vec<&Section> {
        let mut chain = Vec::new();
        let mut current = self.sections.first();
        while let Some(section) = current {
            chain.push(section);
            current = section.children.first();
        }
        chain
    }

    /// Section path of `external_id`, or the first-child chain if the id does
    /// not occur in this document.
    #[must_use]
    pub fn own_section_path(&self, external_id: &str) -> Vec<&Section> {
        self.section_path(external_id)
            .unwrap_or_else(|| self.first_child_chain())
    }

    /// Structural parent of the section of `external_id`.
    #[must_use]
    pub fn parent_section(&self, external_id: &str) -> Option<&Section> {
        let path = self.section_path(external_id)?;
        path.len().checked_sub(2).map(|i| path[i])
    }

    /// Value of the OAI `<request identifier="...">` marker of a stored response.
    #[must_use]
    pub fn request_identifier(&self) -> Option<&str> {
        self.request_identifier.as_deref()
    }

    /// `<setSpec>` values of the OAI response header, in document order.
    #[must_use]
    pub fn set_specs(&self) -> &[String] {
        &self.set_specs
    }

    /// `href` of the first URL location in the `TEASER` file group.
    #[must_use]
    pub fn teaser_image_url(&self) -> Option<&str> {
        self.teaser_image_url.as_deref()
    }

    /// Any `<mets:file>` of the document by id.
    #[must_use]
    pub fn file(&self, id: &str) -> Option<&FileEntry> {
        self.files.get(id)
    }

    /// Pages of the physical structural map, in document order.
    #[must_use]
    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }
}

fn search_path<'a>(section: &'a Section, wanted: &str, path: &mut Vec<&'a Section>) -> bool {
    path.push(section);
    if section.id == wanted || section.children.iter().any(|c| search_path(c, wanted, path)) {
        return true;
    }
    path.pop();
    false
}
