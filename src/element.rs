//! Journals, volumes, issues and articles.
//!
//! An [`ExportElement`] is built from one catalog document and one external
//! id. Its descriptive metadata is extracted eagerly at construction; the
//! related elements are resolved on first access and cached:
//!
//! - children (volumes, issues, articles) by following the resource pointers
//!   of the item's subsections
//! - the parent by following the resource pointer of the enclosing section
//! - the full text by downloading the transcription of every page
//!
//! Children reference the element that resolved them weakly. Once that owner
//! is dropped, the parent is fetched again through the enclosing section's
//! resource pointer, at most once per child.
//!
//! # Examples
//!
//! ```no_run
//! use visual_library::VisualLibrary;
//!
//! let library = VisualLibrary::new();
//! let journal = library.fetch_by_id("10688403")?;
//! for volume in journal.volumes()? {
//!     println!("{:?} {:?}", volume.label(), volume.publication_date());
//! }
//! # Ok::<(), visual_library::VlError>(())
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::classify::ElementKind;
use crate::error::Result;
use crate::file::FileResource;
use crate::metadata::{
    journal_id, journal_label, Author, LocalizedText, ModsRecord, PageRange, Publisher, Titles,
};
use crate::mets::{MetsDocument, Section};
use crate::page::{pages_of, Page};
use crate::resolver::Resolver;

/// Fields only articles carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetail {
    /// Authors and contributors in document order.
    pub authors: Vec<Author>,
    /// First and last page.
    pub page_range: Option<PageRange>,
    /// DOI; not published by the catalog yet.
    pub doi: Option<String>,
}

/// Eagerly extracted metadata of one section.
#[derive(Debug, Default)]
struct Extracted {
    titles: Titles,
    keywords: Vec<String>,
    publication_date: Option<String>,
    publishers: Vec<Publisher>,
    number: Option<String>,
    volume_number: Option<String>,
    issue_number: Option<String>,
    license: Option<String>,
    authors: Vec<Author>,
    page_range: Option<PageRange>,
}

impl Extracted {
    fn new(m: &ModsRecord, kind: ElementKind) -> Self {
        let article = kind == ElementKind::Article;
        Extracted {
            titles: m.titles.clone(),
            keywords: m.keywords.clone(),
            publication_date: m.publication_date(kind.is_year_only()),
            publishers: m.publishers.clone(),
            number: match kind {
                ElementKind::Volume => m.part_number.clone(),
                ElementKind::Issue => m.part_issue_number.clone(),
                ElementKind::Journal | ElementKind::Article => None,
            },
            volume_number: m.volume_number.clone(),
            issue_number: m.issue_number.clone(),
            license: m.license.clone(),
            authors: if article { m.authors.clone() } else { Vec::new() },
            page_range: if article { m.page_range.clone() } else { None },
        }
    }
}

/// A classified catalog item with its metadata.
pub struct ExportElement {
    id: String,
    kind: ElementKind,
    mets: Rc<MetsDocument>,
    resolver: Rc<Resolver>,
    this: Weak<ExportElement>,
    section: Option<Section>,
    parent_pointer: Option<String>,

    titles: Titles,
    languages: Vec<String>,
    keywords: Vec<String>,
    publication_date: Option<String>,
    publishers: Vec<Publisher>,
    journal_label: Option<String>,
    journal_id: Option<String>,
    number: Option<String>,
    volume_number: Option<String>,
    issue_number: Option<String>,
    license: Option<String>,
    teaser_image_url: Option<String>,
    article: Option<ArticleDetail>,

    owner: Option<Weak<ExportElement>>,
    fetched_parent: OnceCell<Option<Rc<ExportElement>>>,
    children: OnceCell<Vec<Rc<ExportElement>>>,
    full_text: OnceCell<String>,
}

impl ExportElement {
    pub(crate) fn new(
        resolver: Rc<Resolver>,
        id: &str,
        kind: ElementKind,
        mets: Rc<MetsDocument>,
        parent: Option<Weak<ExportElement>>,
    ) -> Rc<Self> {
        let path = mets.own_section_path(id);
        let section = path.last().map(|s| (*s).clone());
        let parent_pointer = path
            .len()
            .checked_sub(2)
            .and_then(|i| path[i].url_pointer())
            .map(str::to_string);
        let languages = section
            .as_ref()
            .map(|s| s.languages.clone())
            .unwrap_or_default();

        let extracted = section
            .as_ref()
            .and_then(|s| s.metadata.as_ref())
            .map(|m| Extracted::new(m, kind))
            .unwrap_or_default();

        Rc::new_cyclic(|this| ExportElement {
            id: id.to_string(),
            kind,
            this: this.clone(),
            section,
            parent_pointer,
            titles: extracted.titles,
            languages: languages.into_iter().collect(),
            keywords: extracted.keywords,
            publication_date: extracted.publication_date,
            publishers: extracted.publishers,
            journal_label: journal_label(&mets),
            journal_id: journal_id(&mets),
            number: extracted.number,
            volume_number: extracted.volume_number,
            issue_number: extracted.issue_number,
            license: extracted.license,
            teaser_image_url: mets.teaser_image_url().map(str::to_string),
            article: (kind == ElementKind::Article).then(|| ArticleDetail {
                authors: extracted.authors,
                page_range: extracted.page_range,
                doi: None,
            }),
            owner: parent,
            fetched_parent: OnceCell::new(),
            children: OnceCell::new(),
            full_text: OnceCell::new(),
            resolver,
            mets,
        })
    }

    /// External id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Domain type.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Document this element was built from.
    #[must_use]
    pub fn document(&self) -> &Rc<MetsDocument> {
        &self.mets
    }

    /// Logical section of this element.
    #[must_use]
    pub fn section(&self) -> Option<&Section> {
        self.section.as_ref()
    }

    /// Display label of the section.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.section.as_ref().and_then(|s| s.label.as_deref())
    }

    /// Display/sort order of the section.
    #[must_use]
    pub fn order(&self) -> Option<&str> {
        self.section.as_ref().and_then(|s| s.order.as_deref())
    }

    /// Title, either plain or keyed by language.
    #[must_use]
    pub fn title(&self) -> Option<&LocalizedText> {
        self.titles.title.as_ref()
    }

    /// Subtitle, either plain or keyed by language.
    #[must_use]
    pub fn subtitle(&self) -> Option<&LocalizedText> {
        self.titles.subtitle.as_ref()
    }

    /// Non-sort title prefix.
    #[must_use]
    pub fn non_sort(&self) -> Option<&LocalizedText> {
        self.titles.non_sort.as_ref()
    }

    /// Language codes in document order.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Subject keywords in document order.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Year (`1937`) or, for journals, possibly a duration (`1937-1954`).
    #[must_use]
    pub fn publication_date(&self) -> Option<&str> {
        self.publication_date.as_deref()
    }

    /// Publishers in document order.
    #[must_use]
    pub fn publishers(&self) -> &[Publisher] {
        &self.publishers
    }

    /// `title: subtitle` of the outermost division of the document.
    #[must_use]
    pub fn journal_label(&self) -> Option<&str> {
        self.journal_label.as_deref()
    }

    /// Id of the outermost division of the document.
    #[must_use]
    pub fn journal_id(&self) -> Option<&str> {
        self.journal_id.as_deref()
    }

    /// Volume or issue number, depending on the kind.
    #[must_use]
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    /// Number of the `volume` detail of the metadata.
    #[must_use]
    pub fn volume_number(&self) -> Option<&str> {
        self.volume_number.as_deref()
    }

    /// Number of the `issue` detail of the metadata.
    #[must_use]
    pub fn issue_number(&self) -> Option<&str> {
        self.issue_number.as_deref()
    }

    /// License URI.
    #[must_use]
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// URL of the teaser thumbnail.
    #[must_use]
    pub fn teaser_image_url(&self) -> Option<&str> {
        self.teaser_image_url.as_deref()
    }

    /// Downloadable files of the section.
    #[must_use]
    pub fn files(&self) -> &[FileResource] {
        self.section.as_ref().map(|s| s.files.as_slice()).unwrap_or(&[])
    }

    /// Browsing URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.resolver.config().item_url(&self.id)
    }

    /// PDF download URL; journals have none.
    #[must_use]
    pub fn pdf_url(&self) -> Option<String> {
        (self.kind != ElementKind::Journal).then(|| self.resolver.config().pdf_url(&self.id))
    }

    /// Article fields, for articles only.
    #[must_use]
    pub fn article(&self) -> Option<&ArticleDetail> {
        self.article.as_ref()
    }

    /// Authors of an article; empty for other kinds.
    #[must_use]
    pub fn authors(&self) -> &[Author] {
        self.article.as_ref().map(|a| a.authors.as_slice()).unwrap_or(&[])
    }

    /// Page range of an article.
    #[must_use]
    pub fn page_range(&self) -> Option<&PageRange> {
        self.article.as_ref().and_then(|a| a.page_range.as_ref())
    }

    /// DOI of an article.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.article.as_ref().and_then(|a| a.doi.as_deref())
    }

    /// The enclosing element, resolved on first access.
    ///
    /// An element resolved as someone's child returns that element while it
    /// is alive. Otherwise, including after the owner was dropped, the
    /// resource pointer of the enclosing section is followed once and the
    /// result is kept by this element. Without such a pointer there is no
    /// parent.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors; a failed resolution is retried on the next call.
    pub fn parent(&self) -> Result<Option<Rc<ExportElement>>> {
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            return Ok(Some(owner));
        }
        if let Some(parent) = self.fetched_parent.get() {
            return Ok(parent.clone());
        }

        let resolved = match &self.parent_pointer {
            Some(url) => self.resolver.resolve_pointer(url, None)?,
            None => None,
        };
        Ok(self.fetched_parent.get_or_init(|| resolved).clone())
    }

    /// All resolved child elements in document order, resolved once.
    ///
    /// Subsections without resource pointers are searched for nested
    /// pointers. Targets that are no catalog data are left out.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors; nothing is cached in that case.
    pub fn children(&self) -> Result<&[Rc<ExportElement>]> {
        if let Some(children) = self.children.get() {
            return Ok(children);
        }

        let mut children = Vec::new();
        if self.kind != ElementKind::Article {
            if let Some(section) = &self.section {
                for child in &section.children {
                    self.resolve_section(child, &mut children)?;
                }
            }
        }
        Ok(self.children.get_or_init(|| children))
    }

    fn resolve_section(&self, section: &Section, out: &mut Vec<Rc<ExportElement>>) -> Result<()> {
        let urls: Vec<&str> = section.resource_pointers.iter().filter_map(|p| p.url()).collect();
        if urls.is_empty() {
            for child in &section.children {
                self.resolve_section(child, out)?;
            }
            return Ok(());
        }
        for url in urls {
            if let Some(element) = self.resolver.resolve_pointer(url, Some(self.this.clone()))? {
                out.push(element);
            }
        }
        Ok(())
    }

    fn children_where(&self, keep: impl Fn(ElementKind) -> bool) -> Result<Vec<Rc<ExportElement>>> {
        Ok(self
            .children()?
            .iter()
            .filter(|c| keep(c.kind))
            .cloned()
            .collect())
    }

    /// Volumes of a journal.
    ///
    /// # Errors
    ///
    /// See [`ExportElement::children`].
    pub fn volumes(&self) -> Result<Vec<Rc<ExportElement>>> {
        match self.kind {
            ElementKind::Journal => self.children_where(|k| k != ElementKind::Article),
            _ => Ok(Vec::new()),
        }
    }

    /// Issues of a volume.
    ///
    /// # Errors
    ///
    /// See [`ExportElement::children`].
    pub fn issues(&self) -> Result<Vec<Rc<ExportElement>>> {
        match self.kind {
            ElementKind::Volume => self.children_where(|k| k != ElementKind::Article),
            _ => Ok(Vec::new()),
        }
    }

    /// Articles of a journal or volume; every child of an issue.
    ///
    /// # Errors
    ///
    /// See [`ExportElement::children`].
    pub fn articles(&self) -> Result<Vec<Rc<ExportElement>>> {
        match self.kind {
            ElementKind::Journal | ElementKind::Volume => {
                self.children_where(|k| k == ElementKind::Article)
            },
            ElementKind::Issue => self.children_where(|_| true),
            ElementKind::Article => Ok(Vec::new()),
        }
    }

    /// Volumes then articles of a journal, issues then articles of a volume,
    /// articles of an issue.
    ///
    /// # Errors
    ///
    /// See [`ExportElement::children`].
    pub fn elements(&self) -> Result<Vec<Rc<ExportElement>>> {
        let mut elements = match self.kind {
            ElementKind::Journal => self.volumes()?,
            ElementKind::Volume => self.issues()?,
            ElementKind::Issue | ElementKind::Article => Vec::new(),
        };
        elements.extend(self.articles()?);
        Ok(elements)
    }

    /// Pages of the physical structural map, rebuilt on every call.
    #[must_use]
    pub fn pages(&self) -> Vec<Page> {
        pages_of(&self.mets, self.resolver.fetcher())
    }

    /// Transcribed text of all pages joined by newlines, downloaded once.
    ///
    /// # Errors
    ///
    /// Propagates resource and download errors; nothing is cached in that case.
    pub fn full_text(&self) -> Result<&str> {
        if let Some(text) = self.full_text.get() {
            return Ok(text);
        }
        let texts = self
            .pages()
            .iter()
            .map(|page| page.full_text().map(str::to_string))
            .collect::<Result<Vec<String>>>()?;
        Ok(self.full_text.get_or_init(|| texts.join("\n")))
    }
}

impl fmt::Debug for ExportElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportElement")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label())
            .field("title", &self.titles.title)
            .finish_non_exhaustive()
    }
}
