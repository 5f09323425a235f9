//! Shared in-memory EPUB fixtures for integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture Book</dc:title>
    <dc:creator>Alice Author</dc:creator>
    <dc:creator>Bob Writer</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="id">urn:uuid:4660ff75-02d9-4e6b-ad3c-5c0e2d41e397</dc:identifier>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="cover-img" href="images/cover.jpg" media-type="image/jpeg"/>
    <item id="font" href="fonts/serif.woff2" media-type="font/woff2"/>
    <item id="data" href="extra/data.bin" media-type="application/octet-stream"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ghost"/>
    <itemref idref="css"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const TOC_NCX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:depth" content="2"/></head>
  <docTitle><text>Fixture Book</text></docTitle>
  <navMap>
    <navPoint id="p1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="text/ch1.xhtml"/>
      <navPoint id="p2" playOrder="2">
        <navLabel><text>Section 1.1</text></navLabel>
        <content src="text/ch1.xhtml#s1"/>
      </navPoint>
    </navPoint>
    <navPoint id="p3" playOrder="3">
      <navLabel><text>Chapter 2</text></navLabel>
      <content src="text/ch2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub const NAV_XHTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Navigation</title></head>
<body>
<nav epub:type="toc">
  <ol>
    <li><a href="text/ch1.xhtml">Chapter 1</a>
      <ol>
        <li><a href="text/ch1.xhtml#s1">Section 1.1</a></li>
      </ol>
    </li>
    <li><a href="text/ch2.xhtml">Chapter 2</a></li>
  </ol>
</nav>
<nav epub:type="landmarks">
  <ol>
    <li><a epub:type="bodymatter" href="text/ch1.xhtml">Start of Content</a></li>
  </ol>
</nav>
</body>
</html>"#;

pub const CH1_XHTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter 1</title></head>
<body><h1 id="s1">Chapter 1</h1><p>It was a dark and stormy night.</p></body>
</html>"#;

pub const CH2_XHTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter 2</title></head>
<body><h1>Chapter 2</h1><p>A café on a naïve corner.</p></body>
</html>"#;

pub const STYLE_CSS: &str = "body { font-family: serif; margin: 1em; }";

pub const COVER_JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF-fixture-cover-bytes\xFF\xD9";

pub const FONT_WOFF2: &[u8] = b"wOF2-fixture-font-bytes";

pub const DATA_BIN: &[u8] = b"\x00\x01\x02\x03-fixture-binary-data";

/// All entries of the canonical fixture book, in archive order.
pub fn default_entries() -> Vec<(String, Vec<u8>)> {
    vec![
        ("mimetype".into(), b"application/epub+zip".to_vec()),
        ("META-INF/container.xml".into(), CONTAINER_XML.into()),
        ("OEBPS/content.opf".into(), CONTENT_OPF.into()),
        ("OEBPS/text/ch1.xhtml".into(), CH1_XHTML.into()),
        ("OEBPS/text/ch2.xhtml".into(), CH2_XHTML.into()),
        ("OEBPS/style.css".into(), STYLE_CSS.into()),
        ("OEBPS/images/cover.jpg".into(), COVER_JPEG.to_vec()),
        ("OEBPS/fonts/serif.woff2".into(), FONT_WOFF2.to_vec()),
        ("OEBPS/extra/data.bin".into(), DATA_BIN.to_vec()),
        ("OEBPS/toc.ncx".into(), TOC_NCX.into()),
        ("OEBPS/nav.xhtml".into(), NAV_XHTML.into()),
    ]
}

/// Zip up entries into an EPUB byte buffer. The mimetype entry and
/// `data.bin` are stored uncompressed so both stream kinds get exercised;
/// everything else is deflated.
pub fn build(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        let method = if name == "mimetype" || name.ends_with(".bin") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The canonical fixture book.
pub fn fixture() -> Vec<u8> {
    build(&default_entries())
}

/// The fixture with one archive entry removed.
pub fn fixture_without(name: &str) -> Vec<u8> {
    let entries: Vec<_> = default_entries()
        .into_iter()
        .filter(|(n, _)| n != name)
        .collect();
    build(&entries)
}

/// The fixture with one entry's bytes replaced.
pub fn fixture_with(name: &str, data: impl Into<Vec<u8>>) -> Vec<u8> {
    let mut entries = default_entries();
    let data = data.into();
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = data,
        None => entries.push((name.to_string(), data)),
    }
    build(&entries)
}
