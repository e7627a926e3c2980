#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,

    // for MSRV
    clippy::uninlined_format_args,
    clippy::missing_const_for_fn,
)]

//! EPUB ingestion library
//! lib to extract the metadata, table of contents and chapters of an epub
//!
//! The pipeline opens the zip container, parses the OPF package document
//! and the navigation document, and walks the spine to produce the
//! chapters, keeping their (X)HTML untouched.
//!
//! # Examples
//!
//! ## Parsing an epub held in memory
//!
//! ```no_run
//! use epub_ingest::doc::{parse_epub, ParseOptions};
//!
//! let bytes = std::fs::read("book.epub").unwrap();
//! let options = ParseOptions::with_fallback("Catalog title", "Catalog author");
//! let doc = parse_epub(&bytes, &options).unwrap();
//!
//! assert!(!doc.chapters.is_empty());
//! assert_eq!(0, doc.current_chapter);
//! for chapter in &doc.chapters {
//!     println!("{}: {} words", chapter.title, chapter.word_count);
//! }
//! ```
//!
//! ## Step by step
//!
//! ```no_run
//! use epub_ingest::doc::EpubDoc;
//!
//! let mut doc = EpubDoc::new("book.epub").unwrap();
//! println!("{:?}", doc.metadata().title);
//! println!("{} spine items", doc.package.spine.len());
//! for entry in &doc.toc {
//!     println!("{} -> {}", entry.title, entry.path.display());
//! }
//! let chapters = doc.chapters();
//! ```
//!
//! ## Plain text
//!
//! Chapter content is raw markup. Converting it to text is a separate step:
//!
//! ```
//! use epub_ingest::text::html_to_text;
//!
//! assert_eq!("Hello world", html_to_text("<p>Hello <b>world</b></p>"));
//! ```

mod xmlutils;

pub mod archive;
pub mod content;
pub mod doc;
pub mod nav;
pub mod package;
pub mod text;

pub use doc::{parse_epub, DocError, EpubDoc, ParseOptions, ParsedDocument};
