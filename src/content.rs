//! Builds the ordered chapter list from the spine.
//!
//! Chapters are emitted in spine order with their markup untouched. When
//! the spine yields nothing, every (X)HTML manifest item is used instead,
//! and as a last resort a single placeholder chapter is returned, so the
//! list is never empty.

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::archive::EpubArchive;
use crate::nav::{flatten_toc, TocEntry};
use crate::package::{ManifestItem, Package};
use crate::text;

pub const PLACEHOLDER_ID: &str = "content";
pub const PLACEHOLDER_TITLE: &str = "Content";
pub const PLACEHOLDER_BODY: &str =
    "<html><body><p>No readable content was found in this book.</p></body></html>";

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-6](?:\s[^>]*)?>(.*?)</h[1-6]\s*>").expect("valid regex")
});

/// A readable section of the book.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Chapter {
    /// the manifest item id
    pub id: String,
    pub title: String,
    /// raw (X)HTML, as stored in the archive
    pub content: String,
    /// full path in the archive, empty for the placeholder chapter
    pub path: PathBuf,
    pub word_count: usize,
}

/// Walks the spine of `package` and reads every chapter.
///
/// Dangling spine references and unreadable files are skipped. Titles come
/// from the toc when it points to the chapter file, then from the first
/// heading of the chapter, and are otherwise numbered.
pub fn assemble<R: Read + Seek>(
    archive: &mut EpubArchive<R>,
    package: &Package,
    toc: &[TocEntry],
) -> Vec<Chapter> {
    let toc = flatten_toc(toc);
    let mut chapters = Vec::new();
    let mut emitted = HashSet::new();

    for idref in &package.spine {
        let Some(item) = package.manifest_item(idref) else {
            warn!(%idref, "spine item not found in the manifest");
            continue;
        };
        if !emitted.insert(idref.as_str()) {
            debug!(%idref, "spine item repeated, already emitted");
            continue;
        }
        let Some((path, content)) = read_item(archive, package, item) else {
            continue;
        };

        let title = toc_title(&toc, &path)
            .or_else(|| extract_heading(&content))
            .unwrap_or_else(|| format!("Chapter {}", chapters.len() + 1));
        chapters.push(new_chapter(item, title, content, path));
    }

    if chapters.is_empty() {
        warn!("no chapter found through the spine, scanning the manifest");
        chapters = scan_manifest(archive, package);
    }

    if chapters.is_empty() {
        warn!("no readable content, emitting a placeholder chapter");
        chapters.push(placeholder());
    }

    debug!(chapters = chapters.len(), "assembled chapters");
    chapters
}

fn scan_manifest<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    for item in &package.manifest {
        if let Some((path, content)) = read_item(archive, package, item) {
            let title = format!("Content {}", chapters.len() + 1);
            chapters.push(new_chapter(item, title, content, path));
        }
    }
    chapters
}

fn read_item<R: Read + Seek>(
    archive: &mut EpubArchive<R>,
    package: &Package,
    item: &ManifestItem,
) -> Option<(PathBuf, String)> {
    let path = package.resolve(&item.href);
    match archive.get_entry_as_str(&path) {
        Ok(content) => Some((path, content)),
        Err(e) => {
            warn!(id = %item.id, path = %path.display(), error = %e, "chapter not readable");
            None
        }
    }
}

fn new_chapter(item: &ManifestItem, title: String, content: String, path: PathBuf) -> Chapter {
    Chapter {
        id: item.id.clone(),
        title,
        word_count: text::count_words(&content),
        content,
        path,
    }
}

fn toc_title(toc: &[TocEntry], path: &Path) -> Option<String> {
    toc.iter()
        .find(|entry| entry.path == *path)
        .map(|entry| entry.title.clone())
}

/// The chapter emitted when a book has no readable content at all.
pub fn placeholder() -> Chapter {
    Chapter {
        id: PLACEHOLDER_ID.into(),
        title: PLACEHOLDER_TITLE.into(),
        content: PLACEHOLDER_BODY.into(),
        path: PathBuf::new(),
        word_count: 0,
    }
}

/// Returns the text of the first non-empty `<h1>`..`<h6>` of `html`.
///
/// # Examples
///
/// ```
/// use epub_ingest::content::extract_heading;
///
/// let html = r#"<body><h2 class="title">The <em>First</em>
///     Day</h2><h1>Later</h1></body>"#;
/// assert_eq!(Some("The First Day".to_string()), extract_heading(html));
/// assert_eq!(None, extract_heading("<p>no heading</p><h3> </h3>"));
/// ```
pub fn extract_heading(html: &str) -> Option<String> {
    HEADING
        .captures_iter(html)
        .map(|caps| {
            text::html_to_text(&caps[1])
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|title| !title.is_empty())
}
