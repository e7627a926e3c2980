mod common;

use std::path::Path;

use epub_ingest::doc::{parse_epub, EpubDoc, ParseOptions};
use epub_ingest::nav::{flatten_toc, parse_nav, parse_ncx};

use common::{item, itemref, ncx, ncx_with_map, opf, xhtml, EpubBuilder, XHTML};

const NESTED_MAP: &str = r#"
<navPoint id="p1" playOrder="1">
  <navLabel><text>Part One</text></navLabel>
  <content src="Text/part1.xhtml"/>
  <navPoint id="s1" playOrder="2">
    <navLabel><text>Section  A</text></navLabel>
    <content src="Text/part1.xhtml#a"/>
  </navPoint>
  <navPoint id="s2" playOrder="3">
    <navLabel><text>Section B</text></navLabel>
    <content src="Text/part1.xhtml#b"/>
  </navPoint>
</navPoint>
<navPoint id="p2" playOrder="4">
  <navLabel><text>Part Two</text></navLabel>
  <content src="Text/part2.xhtml"/>
</navPoint>"#;

#[test]
fn ncx_hierarchy() {
    let toc = parse_ncx(ncx_with_map(NESTED_MAP).as_bytes(), Path::new("OEBPS")).unwrap();

    assert_eq!(2, toc.len());
    assert_eq!("Part One", toc[0].title);
    assert_eq!("Text/part1.xhtml", toc[0].src);
    assert_eq!(Path::new("OEBPS/Text/part1.xhtml"), toc[0].path);
    assert_eq!(2, toc[0].children.len());
    assert_eq!("Section A", toc[0].children[0].title);
    assert_eq!("Text/part1.xhtml#a", toc[0].children[0].src);
    assert_eq!(Path::new("OEBPS/Text/part1.xhtml"), toc[0].children[0].path);
    assert_eq!("Part Two", toc[1].title);
    assert!(toc[1].children.is_empty());
}

#[test]
fn ncx_flatten() {
    let toc = parse_ncx(ncx_with_map(NESTED_MAP).as_bytes(), Path::new("")).unwrap();
    let flat = flatten_toc(&toc);

    let titles: Vec<_> = flat.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(vec!["Part One", "Section A", "Section B", "Part Two"], titles);
    assert!(flat.iter().all(|e| e.children.is_empty()));
}

#[test]
fn ncx_malformed_navpoints() {
    let map = r#"
<navPoint id="nolabel"><content src="a.xhtml"/>
  <navPoint id="child"><navLabel><text>Kept child</text></navLabel><content src="a.xhtml#c"/></navPoint>
</navPoint>
<navPoint id="nosrc"><navLabel><text>No target</text></navLabel></navPoint>
<navPoint id="emptysrc"><navLabel><text>Empty target</text></navLabel><content src=""/></navPoint>
<navPoint id="ok"><navLabel><text>Valid</text></navLabel><content src="b.xhtml"/></navPoint>"#;
    let toc = parse_ncx(ncx_with_map(map).as_bytes(), Path::new("")).unwrap();

    let titles: Vec<_> = toc.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(vec!["Kept child", "Valid"], titles);
}

#[test]
fn nav_document() {
    let nav = r##"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Navigation</title></head>
<body>
  <nav epub:type="landmarks"><ol><li><a href="Text/cover.xhtml">Cover</a></li></ol></nav>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="Text/ch1.xhtml">One <em>Beginning</em></a>
        <ol><li><a href="Text/ch1.xhtml#s1">One A</a></li></ol>
      </li>
      <li><span>Appendices</span>
        <ol><li><a href="Text/ch2.xhtml">Two</a></li></ol>
      </li>
    </ol>
  </nav>
</body>
</html>"##;
    let toc = parse_nav(nav.as_bytes(), Path::new("OEBPS")).unwrap();

    assert_eq!(2, toc.len());
    assert_eq!("One Beginning", toc[0].title);
    assert_eq!(Path::new("OEBPS/Text/ch1.xhtml"), toc[0].path);
    assert_eq!("One A", toc[0].children[0].title);
    assert_eq!("Two", toc[1].title);
}

#[test]
fn epub_without_ncx() {
    let manifest = item("ch1", "ch1.xhtml", XHTML);
    let bytes = EpubBuilder::new()
        .container("content.opf")
        .file("content.opf", opf("", &manifest, &itemref("ch1")))
        .file("ch1.xhtml", xhtml("<p>text</p>"))
        .build();

    let doc = parse_epub(&bytes, &ParseOptions::default()).unwrap();
    assert!(doc.toc.is_empty());
    assert_eq!(1, doc.chapters.len());
}

#[test]
fn epub_unreadable_ncx() {
    let manifest = [
        item("ncx", "toc.ncx", "application/x-dtbncx+xml"),
        item("ch1", "ch1.xhtml", XHTML),
    ]
    .concat();
    let missing = EpubBuilder::new()
        .container("content.opf")
        .file("content.opf", opf("", &manifest, &itemref("ch1")))
        .file("ch1.xhtml", xhtml("<p>text</p>"))
        .build();
    let broken = EpubBuilder::new()
        .container("content.opf")
        .file("content.opf", opf("", &manifest, &itemref("ch1")))
        .file("toc.ncx", "<ncx><navMap></ncx>")
        .file("ch1.xhtml", xhtml("<p>text</p>"))
        .build();

    for bytes in [missing, broken] {
        let doc = EpubDoc::from_bytes(&bytes).unwrap();
        assert!(doc.toc.is_empty());
        let doc = doc.into_document(&ParseOptions::default());
        assert_eq!(1, doc.chapters.len());
    }
}

#[test]
fn epub3_nav_fallback() {
    let manifest = [
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#
            .to_string(),
        item("ch1", "Text/ch1.xhtml", XHTML),
    ]
    .concat();
    let nav = xhtml(
        r#"<nav xmlns:epub="http://www.idpf.org/2007/ops" epub:type="toc"><ol><li><a href="Text/ch1.xhtml">Opening</a></li></ol></nav>"#,
    );
    let bytes = EpubBuilder::new()
        .container("OPS/package.opf")
        .file("OPS/package.opf", opf("", &manifest, &itemref("ch1")))
        .file("OPS/nav.xhtml", nav)
        .file("OPS/Text/ch1.xhtml", xhtml("<h1>Heading</h1>"))
        .build();

    let doc = parse_epub(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!(1, doc.toc.len());
    assert_eq!(Path::new("OPS/Text/ch1.xhtml"), doc.toc[0].path);
    assert_eq!("Opening", doc.chapters[0].title);
}

#[test]
fn toc_title_precedence() {
    let manifest = [
        item("ncx", "toc.ncx", "application/x-dtbncx+xml"),
        item("ch1", "Text/ch1.xhtml", XHTML),
        item("ch2", "Text/ch2.xhtml", XHTML),
    ]
    .concat();
    let spine = [itemref("ch1"), itemref("ch2")].concat();
    let bytes = EpubBuilder::new()
        .container("OEBPS/content.opf")
        .file("OEBPS/content.opf", opf("", &manifest, &spine))
        .file(
            "OEBPS/toc.ncx",
            ncx(&[("From the toc", "Text/ch1.xhtml#start")]),
        )
        .file("OEBPS/Text/ch1.xhtml", xhtml("<h1>From the heading</h1>"))
        .file("OEBPS/Text/ch2.xhtml", xhtml("<h2>Second heading</h2>"))
        .build();

    let doc = parse_epub(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!("From the toc", doc.chapters[0].title);
    assert_eq!("Second heading", doc.chapters[1].title);
}

#[test]
fn ncx_html_entities() {
    let manifest = [
        item("ncx", "toc.ncx", "application/x-dtbncx+xml"),
        item("ch1", "ch1.xhtml", XHTML),
    ]
    .concat();
    let bytes = EpubBuilder::new()
        .container("content.opf")
        .file("content.opf", opf("", &manifest, &itemref("ch1")))
        .file("toc.ncx", ncx(&[("Caf&eacute; &amp; Bar&rsquo;s", "ch1.xhtml")]))
        .file("ch1.xhtml", xhtml("<h1>Heading</h1>"))
        .build();

    let doc = parse_epub(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!(1, doc.toc.len());
    assert_eq!("Café & Bar\u{2019}s", doc.toc[0].title);
    assert_eq!("Café & Bar\u{2019}s", doc.chapters[0].title);
}
