//! Package document (OPF) parsing: metadata, manifest, spine.

use log::warn;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::schema::{ManifestItem, MetaEntry, Metadata, Package, Spine};
use crate::util::{join, local_name, resolve_entity};

/// Parse the package document. Manifest hrefs are resolved against
/// `content_dir` and normalized, so every href stored in the result is a
/// ready-to-use archive path.
pub fn parse_package(content: &str, content_dir: &str) -> Result<Package> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = Metadata::default();
    let mut manifest: Vec<ManifestItem> = Vec::new();
    let mut spine = Spine::default();
    let mut saw_manifest = false;
    let mut saw_spine = false;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                    | b"description" | b"subject" | b"date" | b"rights" => {
                        if in_metadata {
                            current_element = Some(String::from_utf8_lossy(local).to_string());
                            buf_text.clear();
                        }
                    }
                    b"manifest" => saw_manifest = true,
                    b"spine" => {
                        saw_spine = true;
                        if let Some(toc) = attr_value(&e, b"toc")? {
                            spine.toc_id = Some(toc);
                        }
                    }
                    b"meta" | b"item" | b"itemref" => {
                        handle_container_child(
                            local,
                            &e,
                            in_metadata,
                            content_dir,
                            &mut metadata,
                            &mut manifest,
                            &mut spine,
                        )?;
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"manifest" => saw_manifest = true,
                    b"spine" => {
                        saw_spine = true;
                        if let Some(toc) = attr_value(&e, b"toc")? {
                            spine.toc_id = Some(toc);
                        }
                    }
                    b"meta" | b"item" | b"itemref" => {
                        handle_container_child(
                            local,
                            &e,
                            in_metadata,
                            content_dir,
                            &mut metadata,
                            &mut manifest,
                            &mut spine,
                        )?;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element {
                    match elem.as_str() {
                        "title" => metadata.titles.push(buf_text.clone()),
                        "creator" => metadata.creators.push(buf_text.clone()),
                        "language" => metadata.language = buf_text.clone(),
                        "identifier" if metadata.identifier.is_empty() => {
                            metadata.identifier = buf_text.clone()
                        }
                        "publisher" => metadata.publisher = Some(buf_text.clone()),
                        "description" => metadata.description = Some(buf_text.clone()),
                        "subject" => metadata.subjects.push(buf_text.clone()),
                        "date" => metadata.date = Some(buf_text.clone()),
                        "rights" => metadata.rights = Some(buf_text.clone()),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !saw_manifest {
        return Err(Error::Format("package document has no manifest".into()));
    }
    if !saw_spine {
        return Err(Error::Format("package document has no spine".into()));
    }

    Ok(Package {
        metadata,
        manifest,
        spine,
    })
}

/// Shared handling for elements that appear both self-closed and with
/// children: `meta`, `item`, `itemref`.
fn handle_container_child(
    local: &[u8],
    e: &BytesStart,
    in_metadata: bool,
    content_dir: &str,
    metadata: &mut Metadata,
    manifest: &mut Vec<ManifestItem>,
    spine: &mut Spine,
) -> Result<()> {
    match local {
        b"meta" => {
            // EPUB 3 `<meta property="...">` elements carry no name/content
            // pair and are not collected.
            if in_metadata
                && let (Some(name), Some(content)) =
                    (attr_value(e, b"name")?, attr_value(e, b"content")?)
            {
                metadata.meta.push(MetaEntry { name, content });
            }
        }
        b"item" => {
            if let Some(item) = parse_manifest_item(e, content_dir)? {
                if let Some(existing) = manifest.iter_mut().find(|other| other.id == item.id) {
                    warn!("duplicate manifest id \"{}\", keeping last", item.id);
                    *existing = item;
                } else {
                    manifest.push(item);
                }
            }
        }
        b"itemref" => {
            if let Some(idref) = attr_value(e, b"idref")? {
                spine.item_refs.push(idref);
            }
        }
        _ => {}
    }
    Ok(())
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

fn parse_manifest_item(e: &BytesStart, content_dir: &str) -> Result<Option<ManifestItem>> {
    let mut id = String::new();
    let mut href = String::new();
    let mut media_type = String::new();
    let mut properties: Option<String> = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => id = String::from_utf8(attr.value.to_vec())?,
            b"href" => href = String::from_utf8(attr.value.to_vec())?,
            b"media-type" => media_type = String::from_utf8(attr.value.to_vec())?,
            b"properties" => properties = Some(String::from_utf8(attr.value.to_vec())?),
            _ => {}
        }
    }

    if id.is_empty() {
        return Ok(None);
    }

    Ok(Some(ManifestItem {
        id,
        href: join(content_dir, &href),
        media_type,
        properties,
    }))
}
