//! Manages the epub doc.
//!
//! Opens the archive, parses the package and navigation documents and
//! assembles them into a [`ParsedDocument`].

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::archive::{ArchiveError, EpubArchive};
use crate::content::{self, Chapter};
use crate::nav::{self, TocEntry};
use crate::package::{Package, PackageMetadata};

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Archive Error: {0}")]
    ArchiveError(#[from] ArchiveError),
    #[error("Invalid EPub: {0}")]
    InvalidEpub(String),
}

/// Caller supplied settings of a parse.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ParseOptions {
    /// used when the package has no `dc:title`
    pub fallback_title: String,
    /// used when the package has no `dc:creator`
    pub fallback_author: String,
    /// reading speed for [`ParsedDocument::estimated_reading_time`]
    pub words_per_minute: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            fallback_title: String::from("Unknown Title"),
            fallback_author: String::from("Unknown Author"),
            words_per_minute: 200,
        }
    }
}

impl ParseOptions {
    /// Options with the book title and author known by the caller.
    pub fn with_fallback<T: Into<String>, A: Into<String>>(title: T, author: A) -> Self {
        Self {
            fallback_title: title.into(),
            fallback_author: author.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn words_per_minute(mut self, wpm: usize) -> Self {
        self.words_per_minute = wpm;
        self
    }
}

/// The result of parsing an epub.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ParsedDocument {
    pub title: String,
    pub author: String,
    /// never empty
    pub chapters: Vec<Chapter>,
    /// reading position, always 0 here, owned by the caller afterwards
    pub current_chapter: usize,
    pub toc: Vec<TocEntry>,
    pub metadata: PackageMetadata,
    pub word_count: usize,
    /// minutes, rounded up
    pub estimated_reading_time: usize,
}

/// Struct to control the epub document
#[derive(Clone, Debug)]
pub struct EpubDoc<R: Read + Seek> {
    /// the zip archive
    archive: EpubArchive<R>,

    /// the package document
    pub package: Package,

    /// table of content, from the toc.ncx or the navigation document
    pub toc: Vec<TocEntry>,
}

impl EpubDoc<BufReader<File>> {
    /// Opens the epub file in `path`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use epub_ingest::doc::EpubDoc;
    ///
    /// let doc = EpubDoc::new("book.epub");
    /// assert!(doc.is_ok());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the epub is broken or if the file doesn't
    /// exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DocError> {
        Self::from_archive(EpubArchive::new(path)?)
    }
}

impl<'a> EpubDoc<Cursor<&'a [u8]>> {
    /// Opens the epub held in `bytes`.
    ///
    /// # Errors
    ///
    /// See [`EpubDoc::from_reader`].
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, DocError> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> EpubDoc<R> {
    /// Opens the epub contained in `reader` and parses its package and
    /// navigation documents.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::ArchiveError`] if `reader` isn't a zip archive and
    /// [`DocError::InvalidEpub`] if the container file or the package
    /// document are missing.
    pub fn from_reader(reader: R) -> Result<Self, DocError> {
        Self::from_archive(EpubArchive::from_reader(reader)?)
    }

    /// Parses the package and navigation documents of an opened archive.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::InvalidEpub`] if the container file or the package
    /// document are missing.
    pub fn from_archive(mut archive: EpubArchive<R>) -> Result<Self, DocError> {
        let package = Package::parse(&mut archive)?;
        let toc = nav::read_toc(&mut archive, &package);
        debug!(toc = toc.len(), "read navigation");

        Ok(Self {
            archive,
            package,
            toc,
        })
    }

    /// Returns the package metadata.
    pub fn metadata(&self) -> &PackageMetadata {
        &self.package.metadata
    }

    /// Returns the chapters in reading order. See [`content::assemble`].
    pub fn chapters(&mut self) -> Vec<Chapter> {
        content::assemble(&mut self.archive, &self.package, &self.toc)
    }

    /// Returns the cover image content.
    ///
    /// Returns [`None`] if the epub has no cover image or it can't be read.
    pub fn get_cover(&mut self) -> Option<Vec<u8>> {
        let path = self.package.cover_path.as_ref()?;
        self.archive.get_entry(path).ok()
    }

    /// Returns the resource content by full path in the epub archive
    ///
    /// Returns [`None`] if the path doesn't exist in the epub
    pub fn get_resource_by_path<P: AsRef<Path>>(&mut self, path: P) -> Option<Vec<u8>> {
        self.archive.get_entry(path).ok()
    }

    /// Assembles the chapters and builds the final document.
    pub fn into_document(mut self, options: &ParseOptions) -> ParsedDocument {
        let chapters = self.chapters();
        let word_count = chapters.iter().map(|c| c.word_count).sum();
        let metadata = self.package.metadata;

        ParsedDocument {
            title: metadata
                .title
                .clone()
                .unwrap_or_else(|| options.fallback_title.clone()),
            author: metadata
                .author
                .clone()
                .unwrap_or_else(|| options.fallback_author.clone()),
            chapters,
            current_chapter: 0,
            toc: self.toc,
            metadata,
            word_count,
            estimated_reading_time: reading_time(word_count, options.words_per_minute),
        }
    }
}

/// Parses the epub held in `bytes`.
///
/// # Errors
///
/// Returns [`DocError::ArchiveError`] if `bytes` isn't a zip archive and
/// [`DocError::InvalidEpub`] if it isn't a structurally valid epub.
pub fn parse_epub(bytes: &[u8], options: &ParseOptions) -> Result<ParsedDocument, DocError> {
    let doc = EpubDoc::from_bytes(bytes)?;
    Ok(doc.into_document(options))
}

fn reading_time(words: usize, wpm: usize) -> usize {
    words.div_ceil(wpm.max(1))
}
