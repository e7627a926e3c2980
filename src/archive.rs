//! Manages the zip component part of the epub doc.
//!
//! Provides lookup of archive entries by their internal `/`-separated path
//! and decoding of their content as text.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O Error: {0}")]
    IO(#[from] io::Error),
    #[error("Zip Error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Entry is not valid text: {path}")]
    Encoding { path: String },
}

/// Epub archive struct. Here it's stored the file path and the list of
/// files in the zip archive.
#[derive(Clone, Debug)]
pub struct EpubArchive<R: Read + Seek> {
    zip: zip::ZipArchive<R>,
    pub path: PathBuf,
    pub files: Vec<String>,
}

impl EpubArchive<BufReader<File>> {
    /// Opens the epub file in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip is broken or if the file doesn't
    /// exists.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = Self::from_reader(BufReader::new(file))?;
        archive.path = path.to_path_buf();
        Ok(archive)
    }
}

impl<'a> EpubArchive<Cursor<&'a [u8]>> {
    /// Opens an epub held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Zip`] if `bytes` is not a zip container.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ArchiveError> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    /// Opens the epub contained in `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip is broken.
    pub fn from_reader(reader: R) -> Result<Self, ArchiveError> {
        let zip = zip::ZipArchive::new(reader)?;
        let files = zip.file_names().map(String::from).collect();

        Ok(Self {
            zip,
            path: PathBuf::new(),
            files,
        })
    }

    /// Returns `true` if an entry named `name` exists, either literally or
    /// once percent-decoded.
    pub fn contains<P: AsRef<Path>>(&self, name: P) -> bool {
        self.entry_name(name.as_ref()).is_some()
    }

    /// Returns the content of the file by the `name` as `Vec<u8>`.
    ///
    /// Hrefs inside the package are urls, so a percent-encoded `name` is
    /// looked up decoded when the literal name is not in the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't exists in the zip archive.
    pub fn get_entry<P: AsRef<Path>>(&mut self, name: P) -> Result<Vec<u8>, ArchiveError> {
        let name = self
            .entry_name(name.as_ref())
            .ok_or(zip::result::ZipError::FileNotFound)?;

        let mut entry: Vec<u8> = vec![];
        let mut zipfile = self.zip.by_name(&name)?;
        zipfile.read_to_end(&mut entry)?;
        Ok(entry)
    }

    /// Returns the content of the file by the `name` as `String`.
    ///
    /// UTF-8 (with or without BOM) and BOM-marked UTF-16 are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the name doesn't exists in the zip archive or if
    /// the content isn't decodable text.
    pub fn get_entry_as_str<P: AsRef<Path>>(&mut self, name: P) -> Result<String, ArchiveError> {
        let name = name.as_ref();
        let content = self.get_entry(name)?;
        decode_text(content).ok_or_else(|| ArchiveError::Encoding {
            path: zip_name(name),
        })
    }

    /// Returns the content of container file "META-INF/container.xml".
    ///
    /// # Errors
    ///
    /// Returns an error if the epub doesn't have the container file.
    pub fn get_container_file(&mut self) -> Result<Vec<u8>, ArchiveError> {
        self.get_entry("META-INF/container.xml")
    }

    fn entry_name(&self, name: &Path) -> Option<String> {
        let name = zip_name(name);
        if self.files.iter().any(|f| *f == name) {
            return Some(name);
        }

        let decoded = percent_decode_str(&name).decode_utf8().ok()?;
        self.files.iter().find(|f| **f == decoded).cloned()
    }
}

// Zip entries always use unix separators, whatever the host platform.
fn zip_name(name: &Path) -> String {
    let name = name.to_string_lossy();
    if cfg!(windows) {
        name.replace('\\', "/")
    } else {
        name.into_owned()
    }
}

fn decode_text(content: Vec<u8>) -> Option<String> {
    match content.as_slice() {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8(rest.to_vec()).ok(),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8(content).ok(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
