//! Content classification and path-keyed lookup maps.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::schema::{ContentKind, Package};

/// One classified manifest entry.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    /// Normalized archive path (the map key).
    pub path: String,
    pub kind: ContentKind,
    pub media_type: String,
}

/// Manifest entries classified by content kind, keyed by normalized
/// archive path, plus the spine-derived reading order.
///
/// Built in a single pass over the manifest; purely structural, no archive
/// access.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    pub html: BTreeMap<String, ContentEntry>,
    pub css: BTreeMap<String, ContentEntry>,
    pub images: BTreeMap<String, ContentEntry>,
    pub fonts: BTreeMap<String, ContentEntry>,
    /// Entries whose media type matches none of the four kinds.
    pub other: BTreeMap<String, ContentEntry>,
    /// Every manifest entry, classified or not.
    pub all: BTreeMap<String, ContentEntry>,
    /// Spine entries that resolve into the HTML map, in spine order.
    pub reading_order: Vec<String>,
}

impl ContentIndex {
    pub fn build(package: &Package) -> Self {
        let mut index = ContentIndex::default();

        for item in &package.manifest {
            let kind = ContentKind::from_media_type(&item.media_type);
            let entry = ContentEntry {
                path: item.href.clone(),
                kind,
                media_type: item.media_type.clone(),
            };

            let map = match kind {
                ContentKind::Html => &mut index.html,
                ContentKind::Css => &mut index.css,
                ContentKind::Image => &mut index.images,
                ContentKind::Font => &mut index.fonts,
                ContentKind::Other => &mut index.other,
            };
            map.insert(item.href.clone(), entry.clone());
            index.all.insert(item.href.clone(), entry);
        }

        for idref in &package.spine.item_refs {
            match package.item_by_id(idref) {
                Some(item) if index.html.contains_key(&item.href) => {
                    index.reading_order.push(item.href.clone());
                }
                Some(item) => {
                    debug!("spine entry \"{}\" is not HTML content ({})", idref, item.media_type);
                }
                None => {
                    warn!("spine references unknown manifest id \"{}\", skipping", idref);
                }
            }
        }

        index
    }

    /// Look up any manifest entry by normalized path.
    pub fn get(&self, path: &str) -> Option<&ContentEntry> {
        self.all.get(path)
    }
}
