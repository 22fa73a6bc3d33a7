//! Name-based queries over a parsed XML tree.
//!
//! Catalog responses are navigated by tag name, attribute filters and parent
//! links. [`Document`] wraps a [`roxmltree`] tree and [`Node`] adds the lookups
//! the rest of the crate needs on top of it.
//!
//! Names are written with the conventional prefix (`mets:div`, `mods:title`,
//! `xlink:href`) and compared case-insensitively. A known prefix selects the
//! namespace, whatever prefix the document itself binds to it; an unprefixed
//! element name matches in any namespace. Attribute values and text keep their
//! case.
//!
//! # Examples
//!
//! ```
//! use visual_library::dom::Document;
//!
//! let xml = r#"<mets:div xmlns:mets="http://www.loc.gov/METS/" TYPE="volume" ID="log1">
//!   <mets:mptr LOCTYPE="URL"/>
//! </mets:div>"#;
//! let doc = Document::parse(xml)?;
//! let div = doc.find("mets:div", &[("type", "volume")]).unwrap();
//! assert_eq!(div.attr("ID"), Some("log1"));
//! assert!(div.find_child("mets:mptr", &[("loctype", "URL")]).is_some());
//! # Ok::<(), visual_library::VlError>(())
//! ```

use std::borrow::Cow;

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use roxmltree::ParsingOptions;
use tracing::debug;

use crate::error::{Result, VlError};

lazy_static! {
    static ref XML_DECLARATION: Regex =
        Regex::new(r#"^\s*<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap();
}

/// Namespaces addressed by prefix in queries.
const NAMESPACES: [(&str, &str); 4] = [
    ("mets", "http://www.loc.gov/METS/"),
    ("mods", "http://www.loc.gov/mods/v3"),
    ("xlink", "http://www.w3.org/1999/xlink"),
    ("xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

/// Decode raw response bytes to text.
///
/// A byte order mark wins, then the `encoding` of the XML declaration;
/// without either the bytes are read as UTF-8. Malformed sequences become
/// replacement characters.
#[must_use]
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let declared = XML_DECLARATION
        .captures(bytes)
        .and_then(|c| c.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or(encoding_rs::UTF_8);
    if encoding != encoding_rs::UTF_8 {
        debug!("Decoding response as {}", encoding.name());
    }
    let (text, _, _) = encoding.decode(bytes);
    text
}

/// A parsed markup document borrowing its source text.
#[derive(Debug)]
pub struct Document<'input> {
    tree: roxmltree::Document<'input>,
}

impl<'input> Document<'input> {
    /// Parse an XML string.
    ///
    /// Namespace prefixes must be declared. A document type declaration is
    /// accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::Markup`] if the text is not well-formed.
    pub fn parse(xml: &'input str) -> Result<Self> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| VlError::Markup(e.to_string()))?;
        Ok(Document { tree })
    }

    /// The document node, parent of the top-level element.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        Node(self.tree.root())
    }

    /// First element (document order) matching `name` and `attrs`.
    #[must_use]
    pub fn find(&self, name: &str, attrs: &[(&str, &str)]) -> Option<Node<'_>> {
        self.root().find(name, attrs)
    }

    /// All elements (document order) matching `name` and `attrs`.
    #[must_use]
    pub fn find_all(&self, name: &str, attrs: &[(&str, &str)]) -> Vec<Node<'_>> {
        self.root().find_all(name, attrs)
    }

    /// Lower-cased local name of the top-level element, for diagnostics.
    #[must_use]
    pub fn root_element_name(&self) -> String {
        self.tree.root_element().tag_name().name().to_ascii_lowercase()
    }
}

/// A borrowed handle to one node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<'a>(roxmltree::Node<'a, 'a>);

/// Split `prefix:local` into the namespace of a known prefix and the local
/// name. An unknown prefix leaves the namespace open.
fn split_name(name: &str) -> (Option<&'static str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => {
            let namespace = NAMESPACES
                .iter()
                .find(|(p, _)| p.eq_ignore_ascii_case(prefix))
                .map(|(_, uri)| *uri);
            (namespace, local)
        },
        None => (None, name),
    }
}

impl<'a> Node<'a> {
    /// Lower-cased local name, `None` for anything but elements.
    #[must_use]
    pub fn local_name(&self) -> Option<String> {
        self.0
            .is_element()
            .then(|| self.0.tag_name().name().to_ascii_lowercase())
    }

    /// Whether this node is an element.
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.0.is_element()
    }

    /// Attribute value by (case-insensitive) name.
    ///
    /// An unprefixed name only matches attributes outside any namespace.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&'a str> {
        let (namespace, local) = split_name(key);
        let prefixed = key.contains(':');
        self.0
            .attributes()
            .find(|a| {
                a.name().eq_ignore_ascii_case(local)
                    && match (prefixed, namespace) {
                        (false, _) => a.namespace().is_none(),
                        (true, Some(uri)) => a.namespace() == Some(uri),
                        (true, None) => true,
                    }
            })
            .map(|a| a.value())
    }

    /// Concatenated text of this node and all of its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        self.0
            .descendants()
            .filter(roxmltree::Node::is_text)
            .filter_map(|n| n.text())
            .collect()
    }

    /// Parent element; `None` for the top-level element.
    #[must_use]
    pub fn parent_element(&self) -> Option<Node<'a>> {
        self.0.parent_element().map(Node)
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.0.children().filter(roxmltree::Node::is_element).map(Node)
    }

    /// Descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.0
            .descendants()
            .skip(1)
            .filter(roxmltree::Node::is_element)
            .map(Node)
    }

    /// Whether this element has the given name and carries every attribute pair.
    #[must_use]
    pub fn matches(&self, name: &str, attrs: &[(&str, &str)]) -> bool {
        if !self.0.is_element() {
            return false;
        }
        let (namespace, local) = split_name(name);
        let tag = self.0.tag_name();
        tag.name().eq_ignore_ascii_case(local)
            && namespace.map_or(true, |uri| tag.namespace() == Some(uri))
            && attrs.iter().all(|(k, v)| self.attr(k) == Some(*v))
    }

    /// First descendant element matching `name` and `attrs`.
    #[must_use]
    pub fn find(&self, name: &str, attrs: &[(&str, &str)]) -> Option<Node<'a>> {
        self.descendants().find(|n| n.matches(name, attrs))
    }

    /// All descendant elements matching `name` and `attrs`.
    #[must_use]
    pub fn find_all(&self, name: &str, attrs: &[(&str, &str)]) -> Vec<Node<'a>> {
        self.descendants().filter(|n| n.matches(name, attrs)).collect()
    }

    /// First direct child element matching `name` and `attrs`.
    #[must_use]
    pub fn find_child(&self, name: &str, attrs: &[(&str, &str)]) -> Option<Node<'a>> {
        self.elements().find(|n| n.matches(name, attrs))
    }

    /// Direct child elements matching `name` and `attrs`.
    #[must_use]
    pub fn children_named(&self, name: &str, attrs: &[(&str, &str)]) -> Vec<Node<'a>> {
        self.elements().filter(|n| n.matches(name, attrs)).collect()
    }

    /// Trimmed text of the first descendant matching `name`, if non-empty.
    #[must_use]
    pub fn find_text(&self, name: &str, attrs: &[(&str, &str)]) -> Option<String> {
        self.find(name, attrs)
            .map(|n| n.text().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}
