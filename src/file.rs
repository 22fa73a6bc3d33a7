//! Downloadable files referenced from a METS file section.
//!
//! A [`FileResource`] describes one `<mets:file>` entry: its MIME type, size,
//! timestamps and the URL it can be downloaded from. The content itself is
//! never fetched while parsing; callers trigger the download explicitly with
//! [`FileResource::download`].

use std::cell::OnceCell;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use indexmap::IndexSet;
use tracing::debug;

use crate::dom::Node;
use crate::error::{Result, VlError};
use crate::fetch::Fetcher;

/// Timestamp layouts of the `CREATED` attribute, tried in order.
const CREATED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// The only supported `LOCTYPE` of a file location.
pub const URL_LOCATION_TYPE: &str = "URL";

/// One file of a METS file group.
#[derive(Debug, Clone, Default)]
pub struct FileResource {
    /// File id inside the METS document (e.g. `PDF_10773126`).
    pub id: String,
    /// Download name derived from the id (`pdf_10773126.pdf`).
    pub name: Option<String>,
    /// MIME type declared for the file.
    pub mime_type: Option<String>,
    /// Size in bytes; `0` when absent or not a number.
    pub size: u64,
    /// Upload timestamp.
    pub date_uploaded: Option<NaiveDateTime>,
    /// Modification timestamp (the catalog only publishes one).
    pub date_modified: Option<NaiveDateTime>,
    /// Languages of the section owning the file.
    pub languages: IndexSet<String>,
    /// Absolute download URL.
    pub url: Option<String>,
    data: OnceCell<Vec<u8>>,
}

/// A `<mets:file>` element as written in the document, before its location
/// is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    /// File id (`ID`).
    pub id: String,
    /// `MIMETYPE` attribute.
    pub mime_type: Option<String>,
    /// Raw `SIZE` attribute.
    pub size: Option<String>,
    /// Raw `CREATED` attribute.
    pub created: Option<String>,
    /// `LOCTYPE` and `xlink:href` of every `<mets:FLocat>`, in document order.
    pub locations: Vec<(Option<String>, Option<String>)>,
}

impl FileEntry {
    /// Read a `<mets:file>` element.
    #[must_use]
    pub fn from_node(node: Node<'_>) -> Self {
        FileEntry {
            id: node.attr("id").unwrap_or_default().to_string(),
            mime_type: node.attr("mimetype").map(str::to_string),
            size: node.attr("size").map(str::to_string),
            created: node.attr("created").map(str::to_string),
            locations: node
                .find_all("mets:flocat", &[])
                .iter()
                .map(|l| {
                    (
                        l.attr("loctype").map(str::to_string),
                        l.attr("xlink:href").map(str::to_string),
                    )
                })
                .collect(),
        }
    }

    /// Turn the entry into a downloadable resource.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::UnsupportedLocation`] if a location uses a
    /// `LOCTYPE` other than `URL`.
    pub fn resource(&self) -> Result<FileResource> {
        let mut url = None;
        for (location_type, href) in &self.locations {
            match location_type.as_deref() {
                Some(URL_LOCATION_TYPE) => {
                    if url.is_none() {
                        url.clone_from(href);
                    }
                },
                other => {
                    return Err(VlError::UnsupportedLocation(format!(
                        "{} in file {}",
                        other.unwrap_or("<none>"),
                        self.id
                    )))
                },
            }
        }

        let created = self.created.as_deref().and_then(parse_timestamp);
        Ok(FileResource {
            id: self.id.clone(),
            name: (!self.id.is_empty()).then(|| format!("{}.pdf", self.id.to_lowercase())),
            mime_type: self.mime_type.clone(),
            size: self
                .size
                .as_deref()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0),
            date_uploaded: created,
            date_modified: created,
            languages: IndexSet::new(),
            url,
            data: OnceCell::new(),
        })
    }
}

impl FileResource {
    /// Read a `<mets:file>` element.
    ///
    /// # Errors
    ///
    /// See [`FileEntry::resource`].
    pub fn from_node(node: Node<'_>) -> Result<Self> {
        FileEntry::from_node(node).resource()
    }

    /// Attach already known content, e.g. for offline processing.
    #[must_use]
    pub fn with_data(self, data: Vec<u8>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(data);
        Self { data: cell, ..self }
    }

    /// Content, if it has been downloaded.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.get().map(Vec::as_slice)
    }

    /// Download the content once; later calls return the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VlError::FileNotFound`] if the file has no URL, or the
    /// fetcher's error if the download fails.
    pub fn download(&self, fetcher: &dyn Fetcher) -> Result<&[u8]> {
        if let Some(data) = self.data.get() {
            return Ok(data.as_slice());
        }
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| VlError::FileNotFound(format!("no download URL for file {}", self.id)))?;
        debug!("Downloading data from URL: {url}");
        let bytes = fetcher.fetch(url)?;
        Ok(self.data.get_or_init(|| bytes).as_slice())
    }

    /// Content in standard base64, downloading it first if necessary.
    ///
    /// # Errors
    ///
    /// Propagates download errors.
    pub fn data_in_base64(&self, fetcher: &dyn Fetcher) -> Result<String> {
        Ok(STANDARD.encode(self.download(fetcher)?))
    }

    /// Length of the base64 encoded content, downloading it first if necessary.
    ///
    /// # Errors
    ///
    /// Propagates download errors.
    pub fn size_in_base64(&self, fetcher: &dyn Fetcher) -> Result<usize> {
        let len = self.download(fetcher)?.len();
        Ok((len + 2) / 3 * 4)
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    CREATED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use std::cell::Cell;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Ok(b"This is a test pdf file content.".to_vec())
        }
    }

    const PDF_FILE: &str = r#"<mets:file xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink" ID="PDF_10773126" MIMETYPE="application/pdf" SIZE="1634097" CREATED="2020-06-08T08:31:04.180Z">
        <mets:FLocat LOCTYPE="URL" xlink:href="https://example.org/download/pdf/10773126"/>
    </mets:file>"#;

    fn file_from(xml: &str) -> Result<FileResource> {
        let doc = Document::parse(xml)?;
        FileResource::from_node(doc.find("mets:file", &[]).unwrap())
    }

    #[test]
    fn test_file_attributes() {
        let file = file_from(PDF_FILE).unwrap();
        assert_eq!(file.name.as_deref(), Some("pdf_10773126.pdf"));
        assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.size, 1_634_097);
        assert_eq!(
            file.date_uploaded.unwrap().date(),
            chrono::NaiveDate::from_ymd_opt(2020, 6, 8).unwrap()
        );
        assert_eq!(file.date_uploaded, file.date_modified);
        assert_eq!(
            file.url.as_deref(),
            Some("https://example.org/download/pdf/10773126")
        );
        assert!(file.data().is_none());
    }

    #[test]
    fn test_invalid_size_defaults_to_zero() {
        let file = file_from(r#"<mets:file xmlns:mets="http://www.loc.gov/METS/" ID="X" SIZE="big"/>"#).unwrap();
        assert_eq!(file.size, 0);
        assert!(file.date_uploaded.is_none());
        assert!(file.url.is_none());
    }

    #[test]
    fn test_unsupported_location_type() {
        let err = file_from(
            r#"<mets:file xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink" ID="X">
                 <mets:FLocat LOCTYPE="HANDLE" xlink:href="hdl:1"/>
               </mets:file>"#,
        )
        .unwrap_err();
        assert!(matches!(err, VlError::UnsupportedLocation(_)));
    }

    #[test]
    fn test_download_happens_once() {
        let file = file_from(PDF_FILE).unwrap();
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        file.download(&fetcher).unwrap();
        file.download(&fetcher).unwrap();
        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(file.data(), Some(&b"This is a test pdf file content."[..]));
    }

    #[test]
    fn test_base64_encoding() {
        let file = file_from(PDF_FILE).unwrap();
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        assert_eq!(
            file.data_in_base64(&fetcher).unwrap(),
            "VGhpcyBpcyBhIHRlc3QgcGRmIGZpbGUgY29udGVudC4="
        );
        assert_eq!(file.size_in_base64(&fetcher).unwrap(), 44);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_preloaded_data_skips_download() {
        let file = FileResource::default().with_data(b"abc".to_vec());
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        assert_eq!(file.data_in_base64(&fetcher).unwrap(), "YWJj");
        assert_eq!(fetcher.calls.get(), 0);
    }
}
