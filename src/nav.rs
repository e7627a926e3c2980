//! Table of contents extraction.
//!
//! The NCX declared in the manifest is preferred; epubs without one fall
//! back to the EPUB 3 navigation document. A missing or unreadable
//! navigation file never fails the parse, the toc is just empty.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::EpubArchive;
use crate::package::{resolve_href, Package};
use crate::xmlutils::{self, XMLError, XMLNode};

/// A navigation point in a table of content
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// the title of this entry
    pub title: String,
    /// the target as written in the navigation document
    pub src: String,
    /// the target resource full path in the archive, without fragment
    pub path: PathBuf,
    /// nested entries
    pub children: Vec<TocEntry>,
}

type NavParser = fn(&[u8], &Path) -> Result<Vec<TocEntry>, XMLError>;

/// Reads the navigation document declared by `package`.
///
/// Returns an empty list when the epub has no navigation document or when
/// it can't be read.
pub fn read_toc<R: Read + Seek>(archive: &mut EpubArchive<R>, package: &Package) -> Vec<TocEntry> {
    let md = &package.metadata;
    let (href, parse) = match (&md.toc_ref, &md.nav_ref) {
        (Some(ncx), _) => (ncx, parse_ncx as NavParser),
        (None, Some(nav)) => (nav, parse_nav as NavParser),
        (None, None) => {
            debug!("no navigation document declared");
            return vec![];
        }
    };

    let path = package.resolve(href);
    let content = match archive.get_entry(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "navigation document not readable");
            return vec![];
        }
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    match parse(&content, base) {
        Ok(toc) => toc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed navigation document");
            vec![]
        }
    }
}

/// Parses an NCX document. `base` is the directory containing it.
///
/// # Errors
///
/// Returns an error if `content` isn't well formed xml.
pub fn parse_ncx(content: &[u8], base: &Path) -> Result<Vec<TocEntry>, XMLError> {
    let root = xmlutils::XMLReader::parse(content)?;
    let root = root.borrow();
    let toc = match root.find("navMap") {
        Some(map) => get_navpoints(&map.borrow(), base),
        None => get_navpoints(&root, base),
    };
    Ok(toc)
}

/// Recursively extract all navpoints from a node.
fn get_navpoints(parent: &XMLNode, base: &Path) -> Vec<TocEntry> {
    let mut navpoints = Vec::new();

    for nav in parent.children_named("navPoint") {
        let item = nav.borrow();
        let title = item
            .children_named("navLabel")
            .first()
            .and_then(|l| l.borrow().find("text"))
            .and_then(|t| t.borrow().text_content());
        let src = item
            .children_named("content")
            .first()
            .and_then(|c| c.borrow().get_attr("src"));

        push_entry(&mut navpoints, title, src, base, get_navpoints(&item, base));
    }

    navpoints
}

/// Parses an EPUB 3 navigation document. `base` is the directory
/// containing it.
///
/// The `<nav epub:type="toc">` is used, or the first `<nav>` if none is
/// typed.
///
/// # Errors
///
/// Returns an error if `content` isn't well formed xml.
pub fn parse_nav(content: &[u8], base: &Path) -> Result<Vec<TocEntry>, XMLError> {
    let root = xmlutils::XMLReader::parse(content)?;
    let root = root.borrow();
    let navs = root.find_all("nav");
    let nav = navs
        .iter()
        .find(|n| {
            n.borrow()
                .get_attr("type")
                .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"))
        })
        .or_else(|| navs.first());

    let toc = nav
        .and_then(|n| n.borrow().find("ol"))
        .map(|ol| get_list_items(&ol.borrow(), base))
        .unwrap_or_default();
    Ok(toc)
}

fn get_list_items(list: &XMLNode, base: &Path) -> Vec<TocEntry> {
    let mut entries = Vec::new();

    for li in list.children_named("li") {
        let li = li.borrow();
        let anchor = li
            .children
            .iter()
            .find(|c| matches!(c.borrow().local_name(), "a" | "span"));
        let title = anchor.and_then(|a| a.borrow().text_content());
        let src = anchor.and_then(|a| a.borrow().get_attr("href"));
        let children = li
            .children_named("ol")
            .first()
            .map(|ol| get_list_items(&ol.borrow(), base))
            .unwrap_or_default();

        push_entry(&mut entries, title, src, base, children);
    }

    entries
}

// Entries lacking a label or a target are dropped, their children are
// kept at the same level.
fn push_entry(
    entries: &mut Vec<TocEntry>,
    title: Option<String>,
    src: Option<String>,
    base: &Path,
    mut children: Vec<TocEntry>,
) {
    match (title, src.filter(|s| !s.trim().is_empty())) {
        (Some(title), Some(src)) => entries.push(TocEntry {
            title,
            path: resolve_href(base, &src),
            src,
            children,
        }),
        (title, _) => {
            debug!(?title, "skipping incomplete navigation entry");
            entries.append(&mut children);
        }
    }
}

/// Flattens a toc hierarchy in document order. The returned entries have
/// no children.
pub fn flatten_toc(toc: &[TocEntry]) -> Vec<TocEntry> {
    let mut flat = Vec::new();
    for entry in toc {
        flat.push(TocEntry {
            title: entry.title.clone(),
            src: entry.src.clone(),
            path: entry.path.clone(),
            children: vec![],
        });
        flat.append(&mut flatten_toc(&entry.children));
    }
    flat
}
