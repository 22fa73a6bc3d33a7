//! End-to-end tests for articles, their pages and transcriptions.

mod common;

use std::io::Write;
use std::rc::Rc;

use common::{
    alto_url, decheniana, oai_url, CatalogFetcher, ARTICLE_ID, ARTICLE_XML, ISSUE_ID, JOURNAL_ID,
    PAGE_IDS, PAGE_TEXT, VOLUME_ID,
};
use serde_json::json;
use visual_library::{
    Author, ClientConfig, ElementKind, LocalizedText, MetsDocument, PageRange, VisualLibrary,
    VlError,
};

#[test]
fn test_article_metadata() {
    let (library, fetcher) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    assert_eq!(article.kind(), ElementKind::Article);
    assert_eq!(article.label(), Some("Diluvialer Gehängeschutt südlich von Bonn"));
    assert_eq!(
        article.title().and_then(LocalizedText::as_plain),
        Some("Diluvialer Gehängeschutt südlich von Bonn")
    );
    assert_eq!(
        article.subtitle().and_then(LocalizedText::as_plain),
        Some("mit 3 Textfiguren")
    );
    assert_eq!(
        article.authors().to_vec(),
        vec![Author {
            given_name: "Max".to_string(),
            family_name: "Richter".to_string(),
            title: None,
        }]
    );
    assert_eq!(
        article.page_range(),
        Some(&PageRange {
            start: "283".to_string(),
            end: "287".to_string(),
        })
    );
    assert_eq!(article.publication_date(), Some("1937"));
    assert_eq!(article.languages().to_vec(), vec!["ger".to_string()]);
    assert_eq!(
        article.keywords().to_vec(),
        vec!["Gehängeschutt".to_string(), "Bonn".to_string()]
    );
    assert_eq!(article.volume_number(), Some("95 A"));
    assert_eq!(article.issue_number(), None);
    assert_eq!(article.number(), None);
    assert_eq!(article.doi(), None);
    assert_eq!(article.license(), Some("https://rightsstatements.org/vocab/InC/1.0/"));
    assert_eq!(article.journal_id(), Some(JOURNAL_ID));
    assert_eq!(
        article.teaser_image_url(),
        Some("https://sammlungen.ub.uni-frankfurt.de/download/webcache/304/9660757")
    );

    let files = article.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].size, 412_356);
    assert_eq!(
        files[0].url.as_deref(),
        Some("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/pdf/10902187")
    );
    assert!(article.children().unwrap().is_empty());
    assert!(article.elements().unwrap().is_empty());
    assert_eq!(fetcher.request_count(), 1);
}

#[test]
fn test_article_parent_is_its_volume() {
    let (library, fetcher) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    let volume = article.parent().unwrap().unwrap();
    assert_eq!(volume.kind(), ElementKind::Volume);
    assert_eq!(volume.id(), VOLUME_ID);
    assert_eq!(volume.label(), Some("95 A (1937)"));
    assert!(Rc::ptr_eq(&volume, &article.parent().unwrap().unwrap()));
    assert_eq!(fetcher.requests_for(&oai_url(VOLUME_ID)), 1);
    assert_eq!(fetcher.request_count(), 2);
}

#[test]
fn test_article_pages() {
    let (library, fetcher) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    let pages = article.pages();
    assert_eq!(pages.len(), PAGE_IDS.len());
    let ids: Vec<&str> = pages.iter().map(|p| p.id()).collect();
    assert_eq!(ids, PAGE_IDS.to_vec());
    assert_eq!(pages[0].label(), Some("Seite 283"));
    assert_eq!(pages[4].label(), Some("Seite 287"));
    assert_eq!(pages[4].order(), Some("57"));

    let page = &pages[0];
    let thumbnail = page.thumbnail().unwrap().unwrap();
    assert_eq!(thumbnail.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(
        thumbnail.url.as_deref(),
        Some("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/webcache/128/9660757")
    );
    assert_eq!(
        page.image_min_resolution().unwrap().unwrap().url.as_deref(),
        Some("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/webcache/504/9660757")
    );
    assert_eq!(
        page.image_default_resolution().unwrap().unwrap().url.as_deref(),
        Some("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/webcache/1000/9660757")
    );
    assert_eq!(
        page.image_max_resolution().unwrap().unwrap().url.as_deref(),
        Some("https://sammlungen.ub.uni-frankfurt.de/biodiv/download/webcache/0/9660757")
    );
    let transcription = page.transcription().unwrap().unwrap();
    assert_eq!(transcription.mime_type.as_deref(), Some("text/xml"));
    assert_eq!(transcription.url.as_deref(), Some(alto_url("9660757").as_str()));

    // resolving resources never downloads anything
    assert_eq!(fetcher.request_count(), 1);
}

#[test]
fn test_page_full_text() {
    let (library, fetcher) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();
    let pages = article.pages();

    assert_eq!(pages[2].full_text().unwrap(), PAGE_TEXT);
    assert_eq!(pages[2].full_text().unwrap(), PAGE_TEXT);
    assert_eq!(fetcher.requests_for(&alto_url("9660759")), 1);
}

#[test]
fn test_article_full_text() {
    let (library, fetcher) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    let expected = vec![PAGE_TEXT; PAGE_IDS.len()].join("\n");
    let text = article.full_text().unwrap();
    assert_eq!(text, expected);
    assert_eq!(text.chars().count(), 599);
    assert_eq!(fetcher.request_count(), 1 + PAGE_IDS.len());

    assert_eq!(article.full_text().unwrap(), expected);
    assert_eq!(fetcher.request_count(), 1 + PAGE_IDS.len());
}

#[test]
fn test_full_text_failure_is_not_cached() {
    let mut fetcher = CatalogFetcher::new();
    fetcher.serve_record(ARTICLE_ID, ARTICLE_XML);
    let fetcher = Rc::new(fetcher);
    let library = VisualLibrary::with_fetcher(ClientConfig::default(), Rc::clone(&fetcher));
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    assert!(matches!(article.full_text(), Err(VlError::Http(_))));
    let after_first = fetcher.request_count();
    assert!(article.full_text().is_err());
    assert!(fetcher.request_count() > after_first);
}

#[test]
fn test_item_without_physical_map_has_no_pages() {
    let (library, fetcher) = decheniana();
    let issue = library.fetch_by_id(ISSUE_ID).unwrap();

    assert_eq!(issue.kind(), ElementKind::Issue);
    assert_eq!(issue.label(), Some("Heft 2"));
    assert_eq!(issue.number(), Some("2"));
    assert_eq!(issue.publication_date(), Some("1938"));
    assert!(issue.pages().is_empty());
    assert_eq!(issue.full_text().unwrap(), "");
    assert!(issue.parent().unwrap().is_none());
    assert!(issue.articles().unwrap().is_empty());
    assert_eq!(fetcher.request_count(), 1);
}

#[test]
fn test_fetch_page_with_known_article() {
    let (library, fetcher) = decheniana();

    let page = library
        .fetch_page_by_id("9660759", Some(ARTICLE_ID))
        .unwrap()
        .unwrap();
    assert_eq!(page.id(), "9660759");
    assert_eq!(page.vl_id(), "9660759");
    assert_eq!(page.label(), Some("Seite 285"));

    let prefixed = library
        .fetch_page_by_id("phys9660759", Some(ARTICLE_ID))
        .unwrap()
        .unwrap();
    assert_eq!(prefixed.id(), page.id());

    assert!(library
        .fetch_page_by_id("1234567", Some(ARTICLE_ID))
        .unwrap()
        .is_none());
    assert_eq!(fetcher.request_count(), 3);
}

#[test]
fn test_fetch_page_through_item_page() {
    let mut fetcher = CatalogFetcher::decheniana();
    fetcher.serve(
        "https://sammlungen.ub.uni-frankfurt.de/9660761",
        r#"<!DOCTYPE html>
<html><head><title>Seite 287</title></head>
<body>
  <div id="navPath">
    <a href="/">Sammlungen</a> &gt;
    <a href="/10688403">Decheniana</a> &gt;
    <a href="/10771471">95 A (1937)</a> &gt;
    <a href="/10902187">Diluvialer Gehängeschutt
      südlich von Bonn</a>
  </div>
  <div id="titleinfo">
    <h1><a href="https://sammlungen.ub.uni-frankfurt.de/10688403">Decheniana</a></h1>
  </div>
</body></html>"#,
    );
    let fetcher = Rc::new(fetcher);
    let library = VisualLibrary::with_fetcher(ClientConfig::default(), Rc::clone(&fetcher));

    let page = library.fetch_page_by_id("9660761", None).unwrap().unwrap();
    assert_eq!(page.label(), Some("Seite 287"));
    assert_eq!(fetcher.requests_for(&oai_url(JOURNAL_ID)), 1);
    assert_eq!(fetcher.requests_for(&oai_url(VOLUME_ID)), 1);
    assert_eq!(fetcher.requests_for(&oai_url(ARTICLE_ID)), 1);
}

#[test]
fn test_item_page_without_title_link() {
    let mut fetcher = CatalogFetcher::decheniana();
    fetcher.serve(
        "https://sammlungen.ub.uni-frankfurt.de/9660761",
        "<html><body><div id=\"navPath\"><a href=\"/\">Sammlungen</a></div></body></html>",
    );
    let library = VisualLibrary::with_fetcher(ClientConfig::default(), fetcher);
    let err = library.fetch_page_by_id("9660761", None).unwrap_err();
    assert!(matches!(err, VlError::InvalidFormat(_)));
}

#[test]
fn test_fetch_from_local_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(ARTICLE_XML.as_bytes()).unwrap();

    let fetcher = Rc::new(CatalogFetcher::new());
    let library = VisualLibrary::with_fetcher(ClientConfig::default(), Rc::clone(&fetcher));
    let article = library.fetch_from_local_file(file.path()).unwrap();

    assert_eq!(article.id(), ARTICLE_ID);
    assert_eq!(article.kind(), ElementKind::Article);
    assert_eq!(article.pages().len(), PAGE_IDS.len());
    assert_eq!(fetcher.request_count(), 0);
}

#[test]
fn test_fetch_from_parsed_document() {
    let (library, fetcher) = decheniana();
    let mets = MetsDocument::parse(ARTICLE_XML).unwrap();
    assert_eq!(mets.request_identifier(), Some(ARTICLE_ID));

    let article = library.fetch_from_document(ARTICLE_ID, mets).unwrap();
    assert_eq!(article.page_range().map(|r| r.end.as_str()), Some("287"));
    assert_eq!(fetcher.request_count(), 0);
}

#[test]
fn test_metadata_serializes_to_json() {
    let (library, _) = decheniana();
    let article = library.fetch_by_id(ARTICLE_ID).unwrap();

    assert_eq!(serde_json::to_value(article.kind()).unwrap(), json!("Article"));
    assert_eq!(
        serde_json::to_value(article.title()).unwrap(),
        json!("Diluvialer Gehängeschutt südlich von Bonn")
    );
    assert_eq!(
        serde_json::to_value(article.authors()).unwrap(),
        json!([{ "given_name": "Max", "family_name": "Richter", "title": null }])
    );
    assert_eq!(
        serde_json::to_value(article.page_range()).unwrap(),
        json!({ "start": "283", "end": "287" })
    );
}
