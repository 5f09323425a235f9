//! Navigation document parsing: EPUB 2 NCX and EPUB 3 nav documents,
//! reconciled into one [`NavigationItem`] forest.
//!
//! Both parsers are tolerant about links: an href that does not resolve
//! into the content index leaves the item's target unset (navigation
//! documents routinely point at in-page anchors or external resources).
//! Structural problems, malformed XML or nesting past the depth cap, abort
//! the open.

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::schema::index::ContentIndex;
use crate::schema::{NavKind, NavigationItem};
use crate::util::{join, local_name, resolve_entity, strip_fragment};

/// Maximum nesting depth accepted from a navigation document. The formats
/// allow unbounded nesting; adversarially deep documents must not overflow
/// the stack.
pub const MAX_NAV_DEPTH: usize = 64;

struct PartialItem {
    title: Option<String>,
    href: Option<String>,
    children: Vec<NavigationItem>,
}

impl PartialItem {
    fn new() -> Self {
        Self {
            title: None,
            href: None,
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.title {
            Some(existing) => existing.push_str(text),
            None => self.title = Some(text.to_string()),
        }
    }

    fn finish(
        self,
        kind: NavKind,
        content_dir: &str,
        index: &ContentIndex,
    ) -> Option<NavigationItem> {
        let title = self.title?;
        let target = self
            .href
            .as_deref()
            .and_then(|href| resolve_target(href, content_dir, index));
        Some(NavigationItem {
            kind,
            title,
            link: self.href,
            target,
            children: self.children,
        })
    }
}

/// Resolve a navigation link against the content index: strip the
/// fragment, resolve against the content directory, and look the result up
/// in the combined map.
fn resolve_target(href: &str, content_dir: &str, index: &ContentIndex) -> Option<String> {
    let path = strip_fragment(href);
    if path.is_empty() {
        return None;
    }
    let resolved = join(content_dir, path);
    match index.get(&resolved) {
        Some(entry) => Some(entry.path.clone()),
        None => {
            debug!("navigation link \"{}\" does not resolve into the manifest", href);
            None
        }
    }
}

fn push_with_depth_check(stack: &mut Vec<PartialItem>) -> Result<()> {
    if stack.len() >= MAX_NAV_DEPTH {
        return Err(Error::Format(format!(
            "navigation document nested deeper than {} levels",
            MAX_NAV_DEPTH
        )));
    }
    stack.push(PartialItem::new());
    Ok(())
}

fn attach(item: NavigationItem, stack: &mut [PartialItem], roots: &mut Vec<NavigationItem>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(item),
        None => roots.push(item),
    }
}

// ----------------------------------------------------------------------------
// EPUB 2: NCX
// ----------------------------------------------------------------------------

/// Parse an NCX document: `navMap`/`navPoint` (table of contents) and
/// `pageList`/`pageTarget` (page list), in document order.
pub fn parse_ncx(content: &str, content_dir: &str, index: &ContentIndex) -> Result<Vec<NavigationItem>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut out: Vec<NavigationItem> = Vec::new();
    let mut roots: Vec<NavigationItem> = Vec::new();
    let mut stack: Vec<PartialItem> = Vec::new();
    let mut section: Option<NavKind> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navMap" => section = Some(NavKind::Toc),
                b"pageList" => section = Some(NavKind::PageList),
                b"navPoint" | b"pageTarget" if section.is_some() => {
                    push_with_depth_check(&mut stack)?;
                }
                b"text" if section.is_some() => in_text = true,
                b"content" if section.is_some() => {
                    record_src(&e, &mut stack)?;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" && section.is_some() {
                    record_src(&e, &mut stack)?;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(item) = stack.last_mut() {
                    item.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(item) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        item.push_text(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" | b"pageTarget" => {
                    if let Some(kind) = section
                        && let Some(partial) = stack.pop()
                        && let Some(item) = partial.finish(kind, content_dir, index)
                    {
                        attach(item, &mut stack, &mut roots);
                    }
                }
                b"navMap" | b"pageList" => {
                    out.append(&mut roots);
                    stack.clear();
                    section = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(out)
}

fn record_src(e: &BytesStart, stack: &mut [PartialItem]) -> Result<()> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"src"
            && let Some(item) = stack.last_mut()
            && item.href.is_none()
        {
            item.href = Some(String::from_utf8(attr.value.to_vec())?);
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// EPUB 3: nav document
// ----------------------------------------------------------------------------

/// Parse an EPUB 3 XHTML navigation document. Each `<nav>` section tagged
/// `epub:type="toc"`, `"page-list"`, or `"landmarks"` contributes its
/// `ol`/`li`/`a` structure to the forest in document order.
pub fn parse_nav_doc(
    content: &str,
    content_dir: &str,
    index: &ContentIndex,
) -> Result<Vec<NavigationItem>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut out: Vec<NavigationItem> = Vec::new();
    let mut roots: Vec<NavigationItem> = Vec::new();
    let mut stack: Vec<PartialItem> = Vec::new();
    let mut section: Option<NavKind> = None;
    let mut in_label = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"nav" => section = nav_section_kind(&e),
                b"li" if section.is_some() => push_with_depth_check(&mut stack)?,
                b"a" if section.is_some() => {
                    record_href(&e, &mut stack)?;
                    if !stack.is_empty() {
                        in_label = true;
                    }
                }
                b"span" if section.is_some() && !stack.is_empty() => in_label = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"a" && section.is_some() {
                    record_href(&e, &mut stack)?;
                }
            }
            Ok(Event::Text(e)) => {
                if in_label && let Some(item) = stack.last_mut() {
                    item.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_label && let Some(item) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        item.push_text(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"a" | b"span" => in_label = false,
                b"li" => {
                    if let Some(kind) = section
                        && let Some(partial) = stack.pop()
                        && let Some(item) = partial.finish(kind, content_dir, index)
                    {
                        attach(item, &mut stack, &mut roots);
                    }
                }
                b"nav" if section.is_some() => {
                    out.append(&mut roots);
                    stack.clear();
                    section = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(out)
}

fn nav_section_kind(e: &BytesStart) -> Option<NavKind> {
    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == b"epub:type" || key.ends_with(b":type") {
            let value = String::from_utf8_lossy(attr.value.as_ref()).into_owned();
            return value.split_ascii_whitespace().find_map(|token| match token {
                "toc" => Some(NavKind::Toc),
                "page-list" => Some(NavKind::PageList),
                "landmarks" => Some(NavKind::Landmarks),
                _ => None,
            });
        }
    }
    None
}

fn record_href(e: &BytesStart, stack: &mut [PartialItem]) -> Result<()> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"href"
            && let Some(item) = stack.last_mut()
            && item.href.is_none()
        {
            item.href = Some(String::from_utf8(attr.value.to_vec())?);
        }
    }
    Ok(())
}
