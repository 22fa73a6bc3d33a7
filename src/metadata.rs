//! MODS descriptive metadata extraction.
//!
//! Each section of a catalog document may reference a `<mets:dmdSec>` block
//! holding a MODS record. [`MetadataExtractor`] reads the fields the domain
//! objects need out of such a block and normalizes the inconsistent values
//! found in real records: whitespace in titles, stray characters around
//! years, translated title variants and the like.
//!
//! Elements nested in `<mods:relatedItem>` describe *other* items (the host
//! periodical, a series) and are never read as the section's own metadata.

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dom::Node;
use crate::mets::MetsDocument;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref NON_DIGITS: Regex = Regex::new(r"\D").unwrap();
    static ref DURATION: Regex = Regex::new(r"^\d{4}-(\d{4})?").unwrap();
    static ref YEAR: Regex = Regex::new(r"\D*\d{4}\D*").unwrap();
    static ref METADATA_ID: Regex = Regex::new(r"md(\d+)").unwrap();
}

/// MARC relator code of authors.
pub const AUTHOR_ROLE: &str = "aut";
/// MARC relator code of contributors, treated like authors.
pub const CONTRIBUTOR_ROLE: &str = "ctb";
/// MARC relator code of publishers.
pub const PUBLISHER_ROLE: &str = "pbl";

const GERMAN: &str = "ger";
const ENGLISH: &str = "eng";
/// ISO 639-2 code keying the untranslated title of a record without language.
pub const UNDETERMINED: &str = "und";
const RELATED_ITEM: &str = "mods:relateditem";
const USE_AND_REPRODUCTION: &str = "use and reproduction";

/// Collapse every run of whitespace into one space and trim the ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Drop every character that is not a decimal digit.
///
/// # Examples
///
/// ```
/// use visual_library::metadata::normalize_numeric;
///
/// assert_eq!(normalize_numeric("107 (1953)"), "1071953");
/// assert_eq!(normalize_numeric("1. Lieferung"), "1");
/// ```
#[must_use]
pub fn normalize_numeric(text: &str) -> String {
    NON_DIGITS.replace_all(text, "").into_owned()
}

/// Numeric id embedded in a metadata reference (`md10688403` gives `10688403`).
#[must_use]
pub fn metadata_id(reference: &str) -> Option<String> {
    METADATA_ID
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Find a publication date in free text.
///
/// A leading duration (`1937-1954`, or open-ended `1937-`) is returned as
/// written unless `year_only` is set. Otherwise the first four-digit year is
/// returned with any surrounding characters stripped.
#[must_use]
pub fn parse_publication_date(text: &str, year_only: bool) -> Option<String> {
    let text = text.trim();
    if !year_only {
        if let Some(m) = DURATION.find(text) {
            return Some(m.as_str().to_string());
        }
    }
    YEAR.find(text)
        .map(|m| normalize_numeric(m.as_str()))
        .filter(|year| !year.is_empty())
}

/// Language codes declared in a metadata block, in document order.
///
/// Only `<mods:languageTerm>` elements without a `type` or with
/// `type="code"` are taken.
#[must_use]
pub fn extract_languages(metadata: Node<'_>) -> IndexSet<String> {
    MetadataExtractor::new(metadata)
        .own_elements("mods:languageterm")
        .filter(|term| term.attr("type").map_or(true, |t| t.eq_ignore_ascii_case("code")))
        .filter(|term| term.parent_element().is_some_and(|p| p.matches("mods:language", &[])))
        .map(|term| term.text().trim().to_string())
        .filter(|code| !code.is_empty())
        .collect()
}

/// A title that is either a plain string or a set of translations.
///
/// Translations are keyed by ISO 639-2 code. When the record declares no
/// language, the untranslated value is keyed [`UNDETERMINED`] (`und`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocalizedText {
    /// Single-language value.
    Plain(String),
    /// Values keyed by language code; a language may lack a value.
    Translated(IndexMap<String, Option<String>>),
}

impl LocalizedText {
    /// The plain value, if this is not a translated map.
    #[must_use]
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Self::Plain(text) => Some(text),
            Self::Translated(_) => None,
        }
    }

    /// The value for `language`.
    ///
    /// A plain value is returned for any language.
    #[must_use]
    pub fn get(&self, language: &str) -> Option<&str> {
        match self {
            Self::Plain(text) => Some(text),
            Self::Translated(map) => map.get(language).and_then(Option::as_deref),
        }
    }

    /// The plain value or the first translation that has one.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        match self {
            Self::Plain(text) => Some(text),
            Self::Translated(map) => map.values().find_map(Option::as_deref),
        }
    }
}

/// Title, subtitle and non-sort prefix of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Titles {
    /// Main title including a non-sort prefix.
    pub title: Option<LocalizedText>,
    /// Subtitle.
    pub subtitle: Option<LocalizedText>,
    /// Non-sort prefix (`Der`, `The`), kept separately.
    pub non_sort: Option<LocalizedText>,
}

#[derive(Debug, Default)]
struct TitleParts {
    title: Option<String>,
    subtitle: Option<String>,
    non_sort: Option<String>,
}

impl TitleParts {
    fn from_node(title_info: Node<'_>) -> Self {
        let non_sort = title_info.find_text("mods:nonsort", &[]);
        let title = title_info.find_text("mods:title", &[]).map(|title| match &non_sort {
            Some(prefix) => format!("{prefix} {title}"),
            None => title,
        });
        TitleParts {
            title,
            subtitle: title_info.find_text("mods:subtitle", &[]),
            non_sort,
        }
    }
}

/// A person credited as author or contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    /// Given name; the display form when no given name part exists.
    pub given_name: String,
    /// Family name, empty if absent.
    pub family_name: String,
    /// Terms of address (`Dr.`, `Prof.`).
    pub title: Option<String>,
}

/// A publishing organisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Publisher {
    /// Display name.
    pub name: String,
    /// Authority record URI, empty if absent.
    pub uri: String,
}

/// First and last page of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageRange {
    /// First page.
    pub start: String,
    /// Last page; equals `start` for single pages and is empty for free-text lists.
    pub end: String,
}

/// Reads the fields of one MODS metadata block.
#[derive(Debug, Clone, Copy)]
pub struct MetadataExtractor<'a> {
    metadata: Node<'a>,
}

impl<'a> MetadataExtractor<'a> {
    /// Wrap a metadata block (usually a `<mets:dmdSec>`).
    #[must_use]
    pub fn new(metadata: Node<'a>) -> Self {
        Self { metadata }
    }

    /// Descendants named `name` that belong to the block's own record.
    fn own_elements(&self, name: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
        let root = self.metadata;
        root.descendants()
            .filter(move |n| n.matches(name, &[]))
            .filter(move |n| !inside_related_item(*n, root))
    }

    fn first_own(&self, name: &'a str) -> Option<Node<'a>> {
        self.own_elements(name).next()
    }

    /// Title, subtitle and non-sort prefix.
    ///
    /// When the record carries a `type="translated"` title block the values
    /// become maps keyed by language: the primary block is keyed by the first
    /// declared language (`und` if there is none), the translation by `eng`
    /// if that language is `ger` and by `ger` otherwise.
    #[must_use]
    pub fn titles(&self, languages: &IndexSet<String>) -> Titles {
        let (translated, original): (Vec<Node<'a>>, Vec<Node<'a>>) = self
            .own_elements("mods:titleinfo")
            .partition(|n| n.attr("type") == Some("translated"));

        let primary = original.first().map_or_else(TitleParts::default, |n| TitleParts::from_node(*n));

        let Some(translation) = translated.first().map(|n| TitleParts::from_node(*n)) else {
            return Titles {
                title: primary.title.map(LocalizedText::Plain),
                subtitle: primary.subtitle.map(LocalizedText::Plain),
                non_sort: primary.non_sort.map(LocalizedText::Plain),
            };
        };

        let primary_language = languages.first().map_or(UNDETERMINED, String::as_str);
        let translated_language = if primary_language == GERMAN { ENGLISH } else { GERMAN };
        if primary_language != ENGLISH && primary_language != GERMAN {
            warn!(
                "Assuming translation language \"{translated_language}\" for primary language \"{primary_language}\""
            );
        }

        let pair = |a: Option<String>, b: Option<String>| {
            if a.is_none() && b.is_none() {
                return None;
            }
            let mut map = IndexMap::new();
            map.insert(primary_language.to_string(), a);
            map.insert(translated_language.to_string(), b);
            Some(LocalizedText::Translated(map))
        };

        Titles {
            title: pair(primary.title, translation.title),
            subtitle: pair(primary.subtitle, translation.subtitle),
            non_sort: pair(primary.non_sort, translation.non_sort),
        }
    }

    /// Publication date as year (`1937`) or duration (`1937-1954`, `1937-`).
    ///
    /// Candidates are the children of `<mods:originInfo>`; records without
    /// one fall back to `<mods:part>`. The first candidate yielding a date wins.
    #[must_use]
    pub fn publication_date(&self, year_only: bool) -> Option<String> {
        first_publication_date(&self.date_candidates(), year_only)
    }

    /// Texts that may hold the publication date, most specific first.
    #[must_use]
    pub fn date_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<Node<'a>> = self
            .own_elements("mods:origininfo")
            .flat_map(|info| info.elements())
            .collect();
        if candidates.is_empty() {
            debug!("No origin info found, falling back to part elements");
            candidates = self.own_elements("mods:part").collect();
        }
        candidates.iter().map(Node::text).collect()
    }

    /// Persons with the author or contributor role, in document order.
    #[must_use]
    pub fn authors(&self) -> Vec<Author> {
        self.names_with_roles(&[AUTHOR_ROLE, CONTRIBUTOR_ROLE])
            .map(|name| {
                let display = name.find_text("mods:displayform", &[]);
                let given = name.find_text("mods:namepart", &[("type", "given")]);
                Author {
                    given_name: given.or(display).unwrap_or_default(),
                    family_name: name
                        .find_text("mods:namepart", &[("type", "family")])
                        .unwrap_or_default(),
                    title: name.find_text("mods:namepart", &[("type", "termsOfAddress")]),
                }
            })
            .collect()
    }

    /// Whether a person with the author role and a page extent are present.
    #[must_use]
    pub fn has_authored_pages(&self) -> bool {
        self.names_with_roles(&[AUTHOR_ROLE]).next().is_some()
            && self.page_extent().is_some()
    }

    /// Organisations with the publisher role.
    #[must_use]
    pub fn publishers(&self) -> Vec<Publisher> {
        self.names_with_roles(&[PUBLISHER_ROLE])
            .map(|name| Publisher {
                name: name
                    .find_text("mods:displayform", &[])
                    .or_else(|| name.find_text("mods:namepart", &[]))
                    .unwrap_or_default(),
                uri: name.attr("valueuri").unwrap_or_default().to_string(),
            })
            .collect()
    }

    fn names_with_roles<'r>(&self, roles: &'r [&'r str]) -> impl Iterator<Item = Node<'a>> + 'r
    where
        'a: 'r,
    {
        self.own_elements("mods:name").filter(move |name| {
            name.find_all("mods:roleterm", &[("authority", "marcrelator")])
                .iter()
                .any(|role| {
                    let code = role.text();
                    roles.iter().any(|r| *r == code.trim())
                })
        })
    }

    /// Subject terms in document order.
    #[must_use]
    pub fn keywords(&self) -> Vec<String> {
        self.own_elements("mods:subject")
            .map(|subject| normalize_whitespace(&subject.text()))
            .filter(|keyword| !keyword.is_empty())
            .collect()
    }

    /// `<mods:number>` of the first `<mods:detail>` in `<mods:part>` matching `attrs`.
    #[must_use]
    pub fn part_number(&self, attrs: &[(&str, &str)]) -> Option<String> {
        self.first_own("mods:part")?
            .find("mods:detail", attrs)?
            .find_text("mods:number", &[])
    }

    /// Number of the first own `<mods:detail type="...">`.
    #[must_use]
    pub fn detail_number(&self, detail_type: &str) -> Option<String> {
        self.own_elements("mods:detail")
            .find(|d| d.attr("type") == Some(detail_type))?
            .find_text("mods:number", &[])
    }

    fn page_extent(&self) -> Option<Node<'a>> {
        self.own_elements("mods:extent")
            .find(|e| e.attr("unit") == Some("pages"))
    }

    /// Page range from `<mods:extent unit="pages">`.
    #[must_use]
    pub fn page_range(&self) -> Option<PageRange> {
        let extent = self.page_extent()?;
        if let Some(start) = extent.find_text("mods:start", &[]) {
            let end = extent.find_text("mods:end", &[]).unwrap_or_else(|| start.clone());
            return Some(PageRange { start, end });
        }
        extent.find_text("mods:list", &[]).map(|start| PageRange {
            start,
            end: String::new(),
        })
    }

    /// License URI from `<mods:accessCondition>`.
    #[must_use]
    pub fn license(&self) -> Option<String> {
        let conditions: Vec<Node<'a>> = self.own_elements("mods:accesscondition").collect();
        conditions
            .iter()
            .filter(|c| c.attr("type") == Some(USE_AND_REPRODUCTION))
            .chain(conditions.iter())
            .find_map(|c| license_uri(*c))
    }
}

fn first_publication_date(candidates: &[String], year_only: bool) -> Option<String> {
    candidates
        .iter()
        .find_map(|c| parse_publication_date(c, year_only))
}

/// Everything read from one metadata block, extracted while the document is
/// parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModsRecord {
    /// Declared language codes in document order.
    pub languages: IndexSet<String>,
    /// Title, subtitle and non-sort prefix.
    pub titles: Titles,
    /// Subject terms.
    pub keywords: Vec<String>,
    /// Organisations with the publisher role.
    pub publishers: Vec<Publisher>,
    /// Persons with the author or contributor role.
    pub authors: Vec<Author>,
    /// Page range of the extent in pages.
    pub page_range: Option<PageRange>,
    /// An author and a page extent are both present.
    pub has_authored_pages: bool,
    /// Number of the first detail of the first `<mods:part>`.
    pub part_number: Option<String>,
    /// Number of the first `issue` detail of the first `<mods:part>`.
    pub part_issue_number: Option<String>,
    /// Number of the first `volume` detail.
    pub volume_number: Option<String>,
    /// Number of the first `issue` detail.
    pub issue_number: Option<String>,
    /// License URI.
    pub license: Option<String>,
    date_candidates: Vec<String>,
}

impl ModsRecord {
    /// Extract a metadata block (usually a `<mets:dmdSec>`).
    #[must_use]
    pub fn from_node(metadata: Node<'_>) -> Self {
        let m = MetadataExtractor::new(metadata);
        let languages = extract_languages(metadata);
        ModsRecord {
            titles: m.titles(&languages),
            keywords: m.keywords(),
            publishers: m.publishers(),
            authors: m.authors(),
            page_range: m.page_range(),
            has_authored_pages: m.has_authored_pages(),
            part_number: m.part_number(&[]),
            part_issue_number: m.part_number(&[("type", "issue")]),
            volume_number: m.detail_number("volume"),
            issue_number: m.detail_number("issue"),
            license: m.license(),
            date_candidates: m.date_candidates(),
            languages,
        }
    }

    /// Publication date as year or duration; see
    /// [`MetadataExtractor::publication_date`].
    #[must_use]
    pub fn publication_date(&self, year_only: bool) -> Option<String> {
        first_publication_date(&self.date_candidates, year_only)
    }
}

fn license_uri(condition: Node<'_>) -> Option<String> {
    if let Some(href) = condition.attr("xlink:href") {
        return Some(href.trim().to_string());
    }
    let text = condition.text();
    let text = text.trim();
    text.starts_with("http").then(|| text.to_string())
}

fn inside_related_item(node: Node<'_>, root: Node<'_>) -> bool {
    let mut current = node.parent_element();
    while let Some(n) = current {
        if n == root {
            return false;
        }
        if n.matches(RELATED_ITEM, &[]) {
            return true;
        }
        current = n.parent_element();
    }
    false
}

/// Label of the outermost division: `title: subtitle`, whitespace-normalized.
#[must_use]
pub fn journal_label(mets: &MetsDocument) -> Option<String> {
    let titles = &mets.root_section()?.metadata.as_ref()?.titles;
    let title = titles.title.as_ref().and_then(LocalizedText::primary)?;
    let label = match titles.subtitle.as_ref().and_then(LocalizedText::primary) {
        Some(subtitle) => format!("{title}: {subtitle}"),
        None => title.to_string(),
    };
    Some(normalize_whitespace(&label))
}

/// Numeric id of the outermost division, taken from its metadata reference.
#[must_use]
pub fn journal_id(mets: &MetsDocument) -> Option<String> {
    mets.root_section()?
        .metadata_ref
        .as_deref()
        .and_then(metadata_id)
}
