#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Visual Library client
//!
//! A read-only client and object mapper for METS/MODS catalogs served over
//! OAI-PMH by Visual Library installations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use visual_library::VisualLibrary;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let library = VisualLibrary::new();
//! let journal = library.fetch_by_id("10688403")?;
//! println!("{:?}", journal.journal_label());
//!
//! for volume in journal.volumes()? {
//!     for article in volume.articles()? {
//!         println!("{:?} {:?}", article.title(), article.page_range());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`library`]: entry point ([`VisualLibrary`])
//! - [`element`]: journals, volumes, issues and articles ([`ExportElement`])
//! - [`page`]: pages, page images and transcriptions
//! - [`mets`]: section tree of a catalog document
//! - [`metadata`]: MODS metadata extraction and normalization
//! - [`classify`]: domain type classification
//! - [`resolver`]: cross-document reference resolution
//! - [`file`]: downloadable files
//! - [`dom`]: queryable markup tree
//! - [`fetch`]: transport
//! - [`config`]: client configuration
//! - [`error`]: error types and result type

pub mod classify;
pub mod config;
pub mod dom;
pub mod element;
pub mod error;
pub mod fetch;
pub mod file;
pub mod library;
pub mod metadata;
pub mod mets;
pub mod page;
pub mod resolver;

pub use classify::{classify, ClassificationStrategy, ElementKind};
pub use config::{ClientConfig, ResponseFormat};
pub use element::{ArticleDetail, ExportElement};
pub use error::{Result, VlError};
pub use fetch::{Fetcher, HttpFetcher};
pub use file::FileResource;
pub use library::VisualLibrary;
pub use metadata::{normalize_numeric, Author, LocalizedText, PageRange, Publisher};
pub use mets::{MetsDocument, ResourcePointer, Section};
pub use page::{Page, ResourceRole};
pub use resolver::Resolver;
