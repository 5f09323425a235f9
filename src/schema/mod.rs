//! Parsed EPUB structure: package document, content classification, and
//! the unified navigation tree.
//!
//! A [`Schema`] is built once when a book is opened and never mutated
//! afterwards. All paths stored here are archive-relative, forward-slash
//! normalized, and already resolved against the package document's
//! directory.

pub mod container;
pub mod index;
pub mod navigation;
pub mod package;

pub use index::{ContentEntry, ContentIndex};

/// Everything parsed out of the container at open time.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Directory of the package document; all relative hrefs resolve
    /// against this ("" when the package sits at the archive root).
    pub content_dir: String,
    pub package: Package,
    /// Navigation tree from the EPUB 2 NCX document, if one was found.
    pub legacy_nav: Option<Vec<NavigationItem>>,
    /// Navigation tree from the EPUB 3 nav document, if one was found.
    pub modern_nav: Option<Vec<NavigationItem>>,
}

/// The package document: metadata, manifest, and spine.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub metadata: Metadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Spine,
}

impl Package {
    /// Look up a manifest item by id (exact match).
    pub fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }
}

/// Dublin Core metadata plus free-form `meta` name/content pairs.
///
/// Titles, creators, subjects, and meta pairs keep document order and are
/// never deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub titles: Vec<String>,
    pub creators: Vec<String>,
    /// `<meta name="..." content="..."/>` pairs, verbatim.
    pub meta: Vec<MetaEntry>,
    pub language: String,
    pub identifier: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
}

impl Metadata {
    /// The primary title (first declared), or "" when none is declared.
    pub fn title(&self) -> &str {
        self.titles.first().map(String::as_str).unwrap_or("")
    }

    /// Content of the first `meta` pair with the given name
    /// (case-insensitive), e.g. the `cover` manifest-id declaration.
    pub fn meta_content(&self, name: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.content.as_str())
    }
}

/// A single `<meta name="..." content="..."/>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub name: String,
    pub content: String,
}

/// One manifest `<item>`.
#[derive(Debug, Clone)]
pub struct ManifestItem {
    /// Unique id within the manifest.
    pub id: String,
    /// Archive-relative path, already resolved and normalized.
    pub href: String,
    pub media_type: String,
    /// Space-separated property flags (e.g. "nav", "cover-image").
    pub properties: Option<String>,
}

impl ManifestItem {
    /// Whether the space-separated properties contain the given flag.
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == property))
    }
}

/// The spine: ordered manifest-id references defining linear reading order.
#[derive(Debug, Clone, Default)]
pub struct Spine {
    /// The `toc` attribute: manifest id of the EPUB 2 NCX document.
    pub toc_id: Option<String>,
    /// `idref` values in document order.
    pub item_refs: Vec<String>,
}

/// Content classification derived from a manifest item's media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Image,
    Font,
    Other,
}

impl ContentKind {
    /// Classify a declared media type.
    pub fn from_media_type(media_type: &str) -> Self {
        let mt = media_type.trim();
        if mt.eq_ignore_ascii_case("text/html") || mt.eq_ignore_ascii_case("application/xhtml+xml")
        {
            ContentKind::Html
        } else if mt.eq_ignore_ascii_case("text/css") {
            ContentKind::Css
        } else if starts_with_ignore_case(mt, "image/") {
            ContentKind::Image
        } else if is_font_media_type(mt) {
            ContentKind::Font
        } else {
            ContentKind::Other
        }
    }

    /// Whether content of this kind is read as text rather than bytes.
    pub fn is_text(self) -> bool {
        matches!(self, ContentKind::Html | ContentKind::Css)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn is_font_media_type(media_type: &str) -> bool {
    const FONT_TYPES: &[&str] = &[
        "application/vnd.ms-opentype",
        "application/font-woff",
        "application/x-font-ttf",
        "application/x-font-truetype",
        "application/x-font-opentype",
    ];
    starts_with_ignore_case(media_type, "font/")
        || FONT_TYPES.iter().any(|t| media_type.eq_ignore_ascii_case(t))
}

/// Which navigation section an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKind {
    /// Primary table of contents.
    Toc,
    PageList,
    Landmarks,
}

/// A node in the navigation forest. The same shape serves both the legacy
/// NCX and the modern nav document.
#[derive(Debug, Clone)]
pub struct NavigationItem {
    pub kind: NavKind,
    pub title: String,
    /// The link exactly as written in the source document, fragment
    /// included. `None` for heading entries without a link.
    pub link: Option<String>,
    /// Normalized archive path this item resolves to within the content
    /// index, or `None` when the link points outside the manifest (in-page
    /// anchors, external resources).
    pub target: Option<String>,
    pub children: Vec<NavigationItem>,
}
