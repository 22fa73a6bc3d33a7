//! Common test helpers shared across the test suite.
//!
//! [`CatalogFetcher`] serves stored OAI responses for the Decheniana journal
//! (10688403), its volume 95 A (10771471) and the article 10902187, plus
//! generated records for their siblings. Every request is counted so tests
//! can assert how often the network would have been hit.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use visual_library::{ClientConfig, Fetcher, Result, VisualLibrary, VlError};

pub const JOURNAL_ID: &str = "10688403";
pub const VOLUME_ID: &str = "10771471";
pub const ARTICLE_ID: &str = "10902187";
pub const ISSUE_ID: &str = "4497496";

pub const JOURNAL_XML: &str = include_str!("../data/journal-oai-response.xml");
pub const VOLUME_XML: &str = include_str!("../data/volume-oai-response.xml");
pub const ARTICLE_XML: &str = include_str!("../data/article-oai-response.xml");
pub const ISSUE_WITHOUT_PAGES_XML: &str = include_str!("../data/issue-without-pages-oai-response.xml");
pub const HEADER_HINT_XML: &str = include_str!("../data/header-hint-oai-response.xml");
pub const ALTO_XML: &str = include_str!("../data/alto-9660757.xml");

/// Volumes of the journal in structural map order.
pub const VOLUMES: [(&str, &str); 6] = [
    ("10771471", "95 A (1937)"),
    ("10773125", "95 B (1937)"),
    ("10774839", "96 (1938)"),
    ("10776203", "97 A (1938)"),
    ("10777851", "98 (1939)"),
    ("10779342", "99 A (1940)"),
];

/// Articles of volume 95 A in structural map order.
pub const ARTICLES: [(&str, &str); 7] = [
    ("10902181", "Vorwort"),
    ("10902183", "Beiträge zur Flora des Siebengebirges"),
    ("10902185", "Über die Vogelwelt der Wahner Heide"),
    ("10902187", "Diluvialer Gehängeschutt südlich von Bonn"),
    ("10902189", "Zur Geologie des Drachenfels"),
    ("10902191", "Vereinsnachrichten"),
    ("10902193", "Mitgliederverzeichnis"),
];

/// Pages of the article 10902187.
pub const PAGE_IDS: [&str; 5] = ["9660757", "9660758", "9660759", "9660760", "9660761"];

/// Plain text of the stored transcription.
pub const PAGE_TEXT: &str = "Oberhalb größerer Blöcke hat sich der Schutt ge-\n\
    staut, übereinander liegen mehrere Lagen\n\
    von Gehängelehm (Fig. 2).\n\
    283";

/// In-memory transport keyed by URL.
#[derive(Debug, Default)]
pub struct CatalogFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl CatalogFetcher {
    /// Empty transport; every request fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport serving the whole Decheniana fixture set.
    pub fn decheniana() -> Self {
        let mut fetcher = Self::new();
        fetcher.serve_record(JOURNAL_ID, JOURNAL_XML);
        for (id, label) in VOLUMES {
            if id == VOLUME_ID {
                fetcher.serve_record(id, VOLUME_XML);
            } else {
                fetcher.serve_record(id, &volume_record(id, label));
            }
        }
        for (id, label) in ARTICLES {
            if id == ARTICLE_ID {
                fetcher.serve_record(id, ARTICLE_XML);
            } else {
                fetcher.serve_record(id, &article_record(id, label));
            }
        }
        for page in PAGE_IDS {
            fetcher.serve(&alto_url(page), ALTO_XML);
        }
        fetcher.serve_record(ISSUE_ID, ISSUE_WITHOUT_PAGES_XML);
        fetcher
    }

    pub fn serve(&mut self, url: &str, body: &str) {
        self.responses.insert(url.to_string(), body.as_bytes().to_vec());
    }

    pub fn serve_record(&mut self, id: &str, body: &str) {
        self.serve(&oai_url(id), body);
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Number of requests made for `url`.
    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Fetcher for CatalogFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| VlError::Http(format!("404 Not Found: {url}")))
    }
}

/// Library over the Decheniana fixtures, with a handle on the transport.
pub fn decheniana() -> (VisualLibrary, Rc<CatalogFetcher>) {
    let fetcher = Rc::new(CatalogFetcher::decheniana());
    let library = VisualLibrary::with_fetcher(ClientConfig::default(), Rc::clone(&fetcher));
    (library, fetcher)
}

pub fn oai_url(id: &str) -> String {
    ClientConfig::default().oai_url(id)
}

pub fn alto_url(page_id: &str) -> String {
    format!("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/fulltext/alto/{page_id}")
}

fn escaped_oai_url(id: &str) -> String {
    oai_url(id).replace('&', "&amp;")
}

fn record(id: &str, set_spec: &str, mets: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <request verb="GetRecord" metadataPrefix="mets" identifier="{id}">https://sammlungen.ub.uni-frankfurt.de/oai/</request>
  <GetRecord><record>
    <header><identifier>oai:sammlungen.ub.uni-frankfurt.de:{id}</identifier><setSpec>{set_spec}</setSpec></header>
    <metadata>
      <mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink">
        <mets:dmdSec ID="md{JOURNAL_ID}"><mets:mdWrap MDTYPE="MODS"><mets:xmlData><mods:mods>
          <mods:titleInfo><mods:title>Decheniana</mods:title></mods:titleInfo>
        </mods:mods></mets:xmlData></mets:mdWrap></mets:dmdSec>
        {mets}
      </mets:mets>
    </metadata>
  </record></GetRecord>
</OAI-PMH>"#
    )
}

/// Minimal volume record without articles.
pub fn volume_record(id: &str, label: &str) -> String {
    let year = label
        .rsplit('(')
        .next()
        .unwrap_or_default()
        .trim_end_matches(')');
    record(
        id,
        "journal_volume",
        &format!(
            r#"<mets:dmdSec ID="md{id}"><mets:mdWrap MDTYPE="MODS"><mets:xmlData><mods:mods>
          <mods:originInfo><mods:dateIssued>{year}</mods:dateIssued></mods:originInfo>
        </mods:mods></mets:xmlData></mets:mdWrap></mets:dmdSec>
        <mets:structMap TYPE="LOGICAL">
          <mets:div ID="log{JOURNAL_ID}" DMDID="md{JOURNAL_ID}" TYPE="periodical" LABEL="Decheniana">
            <mets:mptr LOCTYPE="URL" xlink:href="{journal}"/>
            <mets:div ID="log{id}" DMDID="md{id}" TYPE="volume" LABEL="{label}"/>
          </mets:div>
        </mets:structMap>"#,
            journal = escaped_oai_url(JOURNAL_ID),
        ),
    )
}

/// Minimal article record with one PDF file.
pub fn article_record(id: &str, label: &str) -> String {
    record(
        id,
        "article",
        &format!(
            r#"<mets:dmdSec ID="md{id}"><mets:mdWrap MDTYPE="MODS"><mets:xmlData><mods:mods>
          <mods:titleInfo><mods:title>{label}</mods:title></mods:titleInfo>
          <mods:originInfo><mods:dateIssued>1937</mods:dateIssued></mods:originInfo>
        </mods:mods></mets:xmlData></mets:mdWrap></mets:dmdSec>
        <mets:fileSec><mets:fileGrp USE="DOWNLOAD">
          <mets:file ID="PDF_{id}" MIMETYPE="application/pdf" SIZE="204800">
            <mets:FLocat LOCTYPE="URL" xlink:href="https://sammlungen.ub.uni-frankfurt.de/biodiv/download/pdf/{id}"/>
          </mets:file>
        </mets:fileGrp></mets:fileSec>
        <mets:structMap TYPE="LOGICAL">
          <mets:div ID="log{JOURNAL_ID}" DMDID="md{JOURNAL_ID}" TYPE="periodical" LABEL="Decheniana">
            <mets:div ID="log{VOLUME_ID}" TYPE="volume" LABEL="95 A (1937)">
              <mets:mptr LOCTYPE="URL" xlink:href="{volume}"/>
              <mets:div ID="log{id}" DMDID="md{id}" TYPE="article" LABEL="{label}">
                <mets:fptr FILEID="PDF_{id}"/>
              </mets:div>
            </mets:div>
          </mets:div>
        </mets:structMap>"#,
            volume = escaped_oai_url(VOLUME_ID),
        ),
    )
}
