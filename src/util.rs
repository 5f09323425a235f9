//! Shared text-decoding, XML, and archive-path helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// Tries UTF-8 first (BOM handled by encoding_rs), then the hint encoding
/// (usually from the `<?xml encoding="..."?>` declaration), then falls back
/// to Windows-1252, which is common in old ebooks.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an XML declaration, if one is present
/// near the start of the document.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&head[..e.valid_up_to()]).ok()?,
    };

    let decl_start = head.find("<?xml")?;
    let decl = &head[decl_start..head[decl_start..].find("?>")? + decl_start];
    let attr = decl.find("encoding")?;
    let rest = decl[attr + "encoding".len()..].trim_start().strip_prefix('=')?;
    let rest = rest.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    Some(&value[..end])
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
pub fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

// ----------------------------------------------------------------------------
// Archive paths
// ----------------------------------------------------------------------------
//
// Archive entry names always use forward slashes. Manifest hrefs are resolved
// against the package document's directory and normalized before they are
// used as map keys.

/// Directory part of an archive path ("" for top-level entries).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Resolve `href` against `base` into a normalized archive path:
/// forward slashes only, `.` and `..` segments collapsed, no empty segments.
pub fn join(base: &str, href: &str) -> String {
    let href = href.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for seg in base.split('/').chain(href.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            seg => segments.push(seg),
        }
    }
    segments.join("/")
}

/// The path part of an href, with any `#fragment` removed.
/// The fragment itself stays verbatim in the raw link.
pub fn strip_fragment(href: &str) -> &str {
    match href.find('#') {
        Some(i) => &href[..i],
        None => href,
    }
}
