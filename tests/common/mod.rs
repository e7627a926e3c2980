#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const XHTML: &str = "application/xhtml+xml";

/// Writes epub archives in memory.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![("mimetype".into(), b"application/epub+zip".to_vec())],
        }
    }

    pub fn file<C: AsRef<[u8]>>(mut self, name: &str, content: C) -> Self {
        self.entries.push((name.into(), content.as_ref().to_vec()));
        self
    }

    pub fn container(self, opf_path: &str) -> Self {
        self.file("META-INF/container.xml", container(opf_path))
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in self.entries {
            zip.start_file(name, options).unwrap();
            zip.write_all(&content).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

pub fn container(opf_path: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{opf_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

pub fn opf(metadata: &str, manifest: &str, spine: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    {metadata}
  </metadata>
  <manifest>
    {manifest}
  </manifest>
  <spine toc="ncx">
    {spine}
  </spine>
</package>"#
    )
}

pub fn item(id: &str, href: &str, media_type: &str) -> String {
    format!(r#"<item id="{id}" href="{href}" media-type="{media_type}"/>"#)
}

pub fn itemref(idref: &str) -> String {
    format!(r#"<itemref idref="{idref}"/>"#)
}

pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Page</title></head>
<body>{body}</body></html>"#
    )
}

/// A two chapter book under `OEBPS/`, with an NCX.
pub fn sample_book() -> Vec<u8> {
    let metadata = r#"<dc:title>Todo es mío</dc:title>
        <dc:creator opf:role="aut">Ana Autora</dc:creator>
        <dc:language>es</dc:language>
        <dc:identifier id="uid">urn:isbn:9780000000001</dc:identifier>"#;
    let manifest = [
        item("ncx", "toc.ncx", "application/x-dtbncx+xml"),
        item("style", "Styles/style.css", "text/css"),
        item("ch1", "Text/chapter1.xhtml", XHTML),
        item("ch2", "Text/chapter2.xhtml", XHTML),
    ]
    .concat();
    let spine = [itemref("ch1"), itemref("ch2")].concat();

    EpubBuilder::new()
        .container("OEBPS/content.opf")
        .file("OEBPS/content.opf", opf(metadata, &manifest, &spine))
        .file("OEBPS/toc.ncx", ncx(&[("Chapter One", "Text/chapter1.xhtml")]))
        .file("OEBPS/Styles/style.css", "body { margin: 0 }")
        .file(
            "OEBPS/Text/chapter1.xhtml",
            xhtml("<h1>Intro</h1><p>Once upon a time.</p>"),
        )
        .file("OEBPS/Text/chapter2.xhtml", xhtml("<p>The end.</p>"))
        .build()
}

/// A flat NCX with one navPoint per `(label, src)`.
pub fn ncx(points: &[(&str, &str)]) -> String {
    let nav_points: String = points
        .iter()
        .enumerate()
        .map(|(i, (label, src))| {
            format!(
                r#"<navPoint id="np{i}" playOrder="{i}"><navLabel><text>{label}</text></navLabel><content src="{src}"/></navPoint>"#
            )
        })
        .collect();
    ncx_with_map(&nav_points)
}

pub fn ncx_with_map(nav_map: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="uid"/></head>
  <docTitle><text>Book</text></docTitle>
  <navMap>{nav_map}</navMap>
</ncx>"#
    )
}
