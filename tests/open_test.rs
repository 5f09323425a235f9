//! Lazy open behaviors: schema contents, on-demand reads, and handle
//! lifetime semantics.

mod common;

use std::io::Read;

use vellum::{Error, open_book, open_book_from_bytes};

#[test]
fn open_parses_schema() {
    let book_ref = open_book_from_bytes(common::fixture()).expect("open failed");

    assert_eq!(book_ref.title(), "Fixture Book");
    assert_eq!(book_ref.authors(), ["Alice Author", "Bob Writer"]);

    let schema = book_ref.schema();
    assert_eq!(schema.content_dir, "OEBPS");
    assert_eq!(schema.package.manifest.len(), 8);
    assert_eq!(schema.package.spine.toc_id.as_deref(), Some("ncx"));
    assert_eq!(schema.package.metadata.language, "en");
    assert_eq!(
        schema.package.metadata.meta_content("cover"),
        Some("cover-img")
    );
}

#[test]
fn index_classifies_manifest_entries() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    let index = book_ref.content();

    // ch1, ch2, and the nav document are HTML.
    assert_eq!(index.html.len(), 3);
    assert_eq!(index.css.len(), 1);
    assert_eq!(index.images.len(), 1);
    assert_eq!(index.fonts.len(), 1);
    // NCX and data.bin are unclassified.
    assert_eq!(index.other.len(), 2);
    assert_eq!(index.all.len(), 8);
    assert!(index.all.contains_key("OEBPS/extra/data.bin"));
}

#[test]
fn reading_order_keeps_only_html_spine_entries() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();

    // Spine is ch1, ghost (unknown id), css (not HTML), ch2.
    let order = book_ref.reading_order();
    assert_eq!(order.len(), 2);
    assert_eq!(order[0].path(), "OEBPS/text/ch1.xhtml");
    assert_eq!(order[1].path(), "OEBPS/text/ch2.xhtml");
}

#[test]
fn text_read_matches_archive_entry_exactly() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    let order = book_ref.reading_order();

    assert_eq!(order[0].read_text().unwrap(), common::CH1_XHTML);
    assert_eq!(order[1].read_text().unwrap(), common::CH2_XHTML);
}

#[test]
fn byte_read_matches_declared_length_and_content() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();

    let cover = book_ref.resource("OEBPS/images/cover.jpg").unwrap();
    let bytes = cover.read_bytes().unwrap();
    assert_eq!(bytes, common::COVER_JPEG);

    // Stored (uncompressed) entries read back identically too.
    let data = book_ref.resource("OEBPS/extra/data.bin").unwrap();
    assert_eq!(data.read_bytes().unwrap(), common::DATA_BIN);
}

#[test]
fn streams_are_independent_and_uncached() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    let ch1 = book_ref.resource("OEBPS/text/ch1.xhtml").unwrap();

    let mut a = ch1.open_stream().unwrap();
    let mut b = ch1.open_stream().unwrap();

    let mut buf_a = Vec::new();
    let mut buf_b = Vec::new();
    a.read_to_end(&mut buf_a).unwrap();
    b.read_to_end(&mut buf_b).unwrap();

    assert_eq!(buf_a, common::CH1_XHTML.as_bytes());
    assert_eq!(buf_b, common::CH1_XHTML.as_bytes());
    // Repeated whole reads agree with the streams.
    assert_eq!(ch1.read_bytes().unwrap(), buf_a);
}

#[test]
fn close_invalidates_outstanding_refs() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    let ch1 = book_ref.resource("OEBPS/text/ch1.xhtml").unwrap();
    let mut stream = ch1.open_stream().unwrap();

    book_ref.close();

    assert!(matches!(ch1.read_bytes(), Err(Error::Disposed)));
    assert!(matches!(ch1.read_text(), Err(Error::Disposed)));
    assert!(matches!(ch1.open_stream(), Err(Error::Disposed)));
    // A stream opened before the close refuses further reads as well.
    let mut buf = [0u8; 16];
    assert!(stream.read(&mut buf).is_err());
}

#[test]
fn drop_invalidates_outstanding_refs() {
    let ch1 = {
        let book_ref = open_book_from_bytes(common::fixture()).unwrap();
        book_ref.resource("OEBPS/text/ch1.xhtml").unwrap()
    };
    assert!(matches!(ch1.read_bytes(), Err(Error::Disposed)));
}

#[test]
fn reads_are_local_failures() {
    // Manifest references ch2 but the archive entry is gone: the open
    // still succeeds and only reads of that entry fail.
    let data = common::fixture_without("OEBPS/text/ch2.xhtml");
    let book_ref = open_book_from_bytes(data).unwrap();

    let order = book_ref.reading_order();
    assert_eq!(order.len(), 2);
    assert!(matches!(order[1].read_bytes(), Err(Error::NotFound(_))));
    // Other reads are unaffected, before and after the failure.
    assert_eq!(order[0].read_text().unwrap(), common::CH1_XHTML);
}

#[test]
fn missing_container_fails_with_format_error() {
    let data = common::fixture_without("META-INF/container.xml");
    assert!(matches!(
        open_book_from_bytes(data),
        Err(Error::Format(_))
    ));
}

#[test]
fn missing_package_document_fails_with_format_error() {
    let data = common::fixture_without("OEBPS/content.opf");
    assert!(matches!(
        open_book_from_bytes(data),
        Err(Error::Format(_))
    ));
}

#[test]
fn package_without_spine_fails() {
    let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
  <metadata></metadata>
  <manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/></manifest>
</package>"#;
    let data = common::fixture_with("OEBPS/content.opf", opf);
    assert!(matches!(
        open_book_from_bytes(data),
        Err(Error::Format(_))
    ));
}

#[test]
fn unknown_resource_path_is_not_found() {
    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    assert!(matches!(
        book_ref.resource("OEBPS/nope.xhtml"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn open_from_file_path() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&common::fixture()).unwrap();
    file.flush().unwrap();

    let book_ref = open_book(file.path()).expect("open from path failed");
    assert_eq!(book_ref.title(), "Fixture Book");
    let order = book_ref.reading_order();
    assert_eq!(order[0].read_text().unwrap(), common::CH1_XHTML);
}

#[test]
fn concurrent_reads_of_distinct_and_same_entries() {
    use std::thread;

    let book_ref = open_book_from_bytes(common::fixture()).unwrap();
    let ch1 = book_ref.resource("OEBPS/text/ch1.xhtml").unwrap();
    let ch2 = book_ref.resource("OEBPS/text/ch2.xhtml").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let content_ref = if i % 2 == 0 { ch1.clone() } else { ch2.clone() };
            thread::spawn(move || content_ref.read_text().unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let text = handle.join().unwrap();
        let expected = if i % 2 == 0 {
            common::CH1_XHTML
        } else {
            common::CH2_XHTML
        };
        assert_eq!(text, expected);
    }
}
