//! Parses the OPF package document: metadata, manifest and spine.
//!
//! The package document is located through `META-INF/container.xml` and
//! parsed into an element tree, so items are recognised whatever the order
//! or quoting of their attributes.

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::EpubArchive;
use crate::doc::DocError;
use crate::xmlutils::{self, XMLNode};

pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub const HTML_MEDIA_TYPE: &str = "text/html";
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// Scalar metadata declared in the OPF `<metadata>` block.
///
/// Every field is optional, an epub lacking some of them is still valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PackageMetadata {
    pub title: Option<String>,
    /// the first `dc:creator`
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
    pub subjects: Vec<String>,
    /// href of the NCX manifest item, relative to the OPF
    pub toc_ref: Option<String>,
    /// href of the EPUB 3 navigation document, relative to the OPF
    pub nav_ref: Option<String>,
    /// manifest id of the cover image
    pub cover_id: Option<String>,
}

/// An (X)HTML manifest entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ManifestItem {
    pub id: String,
    /// href as declared, relative to the OPF
    pub href: String,
    pub media_type: String,
}

/// The parsed package document.
#[derive(Clone, Debug, Default)]
pub struct Package {
    /// root file full path
    pub opf_path: PathBuf,
    /// root file base path, every manifest href is relative to it
    pub base_path: PathBuf,
    pub metadata: PackageMetadata,
    /// (X)HTML items only, in manifest order
    pub manifest: Vec<ManifestItem>,
    /// reading order, as manifest ids
    pub spine: Vec<String>,
    /// full path of the cover image, if any
    pub cover_path: Option<PathBuf>,
}

impl Package {
    /// Locates the package document through `META-INF/container.xml` and
    /// parses it.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::InvalidEpub`] if the container file, its rootfile
    /// reference or the OPF itself is missing or malformed.
    pub fn parse<R: Read + Seek>(archive: &mut EpubArchive<R>) -> Result<Self, DocError> {
        let container = archive
            .get_container_file()
            .map_err(|_| DocError::InvalidEpub("missing container.xml".into()))?;
        let opf_path = get_root_file(&container)?;
        debug!(opf = %opf_path.display(), "found package document");

        let opf = archive
            .get_entry(&opf_path)
            .map_err(|_| DocError::InvalidEpub("missing OPF file".into()))?;
        Self::from_opf(opf_path, &opf)
    }

    /// Parses the OPF `content` found at `opf_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::InvalidEpub`] if `content` isn't well formed xml.
    pub fn from_opf<P: Into<PathBuf>>(opf_path: P, content: &[u8]) -> Result<Self, DocError> {
        let opf_path = opf_path.into();
        let base_path = opf_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let root = xmlutils::XMLReader::parse(content)
            .map_err(|e| DocError::InvalidEpub(format!("malformed OPF: {e}")))?;
        let root = root.borrow();

        let mut package = Self {
            opf_path,
            base_path,
            ..Self::default()
        };

        if let Some(metadata) = root.find("metadata") {
            package.fill_metadata(&metadata.borrow());
        }
        if let Some(manifest) = root.find("manifest") {
            package.fill_manifest(&manifest.borrow());
        }
        if let Some(spine) = root.find("spine") {
            package.spine = spine
                .borrow()
                .find_all("itemref")
                .iter()
                .filter_map(|r| r.borrow().get_attr("idref"))
                .collect();
        }

        debug!(
            manifest = package.manifest.len(),
            spine = package.spine.len(),
            "parsed package document"
        );
        Ok(package)
    }

    /// Returns the manifest item with this `id`.
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Resolves an href relative to the OPF into a full archive path.
    pub fn resolve(&self, href: &str) -> PathBuf {
        resolve_href(&self.base_path, href)
    }

    fn fill_metadata(&mut self, node: &XMLNode) {
        let first = |tag: &str| {
            node.find_all(tag)
                .iter()
                .find_map(|n| n.borrow().text_content())
        };

        let md = &mut self.metadata;
        md.title = first("title");
        md.author = first("creator");
        md.description = first("description");
        md.language = first("language");
        md.identifier = first("identifier");
        md.publisher = first("publisher");
        md.date = first("date");
        md.rights = first("rights");
        md.subjects = node
            .find_all("subject")
            .iter()
            .filter_map(|n| n.borrow().text_content())
            .collect();
        md.cover_id = node.find_all("meta").iter().find_map(|m| {
            let m = m.borrow();
            match m.get_attr("name") {
                Some(name) if name == "cover" => m.get_attr("content"),
                _ => None,
            }
        });
    }

    fn fill_manifest(&mut self, node: &XMLNode) {
        let mut seen = HashSet::new();
        let mut cover_href = None;
        let mut images = vec![];

        for item in node.find_all("item") {
            let item = item.borrow();
            let Some(href) = item.get_attr("href") else {
                warn!("manifest item without href");
                continue;
            };
            let id = item.get_attr("id");
            if let Some(id) = &id {
                if !seen.insert(id.clone()) {
                    debug!(%id, "duplicated manifest id, keeping the first one");
                    continue;
                }
            }

            let media_type = item
                .get_attr("media-type")
                .map(|m| m.trim().to_ascii_lowercase())
                .unwrap_or_default();
            if media_type == NCX_MEDIA_TYPE {
                self.metadata.toc_ref.get_or_insert(href);
                continue;
            }
            let Some(id) = id else {
                warn!(%href, "manifest item without id");
                continue;
            };

            let properties = item.get_attr("properties").unwrap_or_default();
            let has_property = |p: &str| properties.split_whitespace().any(|x| x == p);

            if has_property("cover-image") && self.metadata.cover_id.is_none() {
                self.metadata.cover_id = Some(id.clone());
            }
            if self.metadata.cover_id.as_deref() == Some(id.as_str()) {
                cover_href = Some(href.clone());
            }

            if media_type.starts_with("image/") {
                images.push((id, href));
            } else if is_html(&media_type) {
                if has_property("nav") {
                    self.metadata.nav_ref.get_or_insert_with(|| href.clone());
                }
                self.manifest.push(ManifestItem {
                    id,
                    href,
                    media_type,
                });
            }
        }

        if cover_href.is_none() {
            if let Some((id, href)) = guess_cover(images) {
                debug!(%href, "no declared cover, using an image");
                self.metadata.cover_id = Some(id);
                cover_href = Some(href);
            }
        }
        self.cover_path = cover_href.map(|href| self.resolve(&href));
    }
}

/// The first image whose file name contains "cover", or the first image.
fn guess_cover(images: Vec<(String, String)>) -> Option<(String, String)> {
    let is_cover = |href: &str| {
        let name = href.rsplit('/').next().unwrap_or(href);
        name.to_ascii_lowercase().contains("cover")
    };
    let i = images.iter().position(|(_, href)| is_cover(href)).unwrap_or(0);
    images.into_iter().nth(i)
}

/// Returns `true` for the media types the content assembler reads.
pub fn is_html(media_type: &str) -> bool {
    let media_type = media_type.trim();
    media_type.eq_ignore_ascii_case(XHTML_MEDIA_TYPE)
        || media_type.eq_ignore_ascii_case(HTML_MEDIA_TYPE)
}

/// Reads the `full-path` of the first `<rootfile>` in `container.xml`.
///
/// # Errors
///
/// Returns [`DocError::InvalidEpub`] if `container` isn't well formed xml
/// or there's no rootfile reference.
pub fn get_root_file(container: &[u8]) -> Result<PathBuf, DocError> {
    let missing = || DocError::InvalidEpub("missing rootfile reference".into());

    let root = xmlutils::XMLReader::parse(container)
        .map_err(|e| DocError::InvalidEpub(format!("malformed container.xml: {e}")))?;
    let el = root.borrow();
    let element = el.find("rootfile").ok_or_else(missing)?;
    let attr = element
        .borrow()
        .get_attr("full-path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(missing)?;

    Ok(PathBuf::from(attr.trim()))
}

/// Resolves `href` against the directory `base`, the way relative urls
/// are resolved inside the archive.
///
/// The fragment and query are dropped, `.` and `..` segments are
/// normalized and a leading `/` is relative to the archive root.
///
/// # Examples
///
/// ```
/// use epub_ingest::package::resolve_href;
/// use std::path::Path;
///
/// let p = resolve_href(Path::new("OEBPS/Text"), "../Images/cover.png#top");
/// assert_eq!(Path::new("OEBPS/Images/cover.png"), p);
///
/// let p = resolve_href(Path::new(""), "./chapter1.xhtml");
/// assert_eq!(Path::new("chapter1.xhtml"), p);
/// ```
pub fn resolve_href(base: &Path, href: &str) -> PathBuf {
    let href = href.split(['#', '?']).next().unwrap_or_default().trim();
    let mut cpath = base.to_path_buf();

    for p in Path::new(href).components() {
        match p {
            Component::RootDir => cpath = PathBuf::new(),
            Component::ParentDir => {
                cpath.pop();
            }
            Component::Normal(s) => cpath.push(s),
            Component::CurDir | Component::Prefix(_) => {}
        }
    }

    cpath
}
