//! The fully materialized, archive-independent book snapshot.
//!
//! [`materialize`] drains every lazy reference into owned content; after
//! it returns, the archive handle is gone and the [`Book`] lives an
//! ordinary value lifetime.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::reader::BookRef;
use crate::schema::{NavigationItem, Schema};

/// A fully read book. Holds no reference to the source archive.
#[derive(Debug, Clone)]
pub struct Book {
    pub schema: Schema,
    /// The primary title, "" when the package declares none.
    pub title: String,
    pub authors: Vec<String>,
    pub content: Content,
    /// Raw cover image bytes, when the package declares a cover.
    pub cover: Option<Vec<u8>>,
    /// Paths into `content.html`, in spine order.
    pub reading_order: Vec<String>,
    /// The unified navigation forest (modern tree when present, else
    /// legacy). Item targets are paths into `content.all`.
    pub navigation: Vec<NavigationItem>,
}

/// Owned content, keyed by normalized archive path like the lazy index.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub html: BTreeMap<String, TextContent>,
    pub css: BTreeMap<String, TextContent>,
    pub images: BTreeMap<String, BinaryContent>,
    pub fonts: BTreeMap<String, BinaryContent>,
    /// Every manifest entry; unclassified ones are read as bytes.
    pub all: BTreeMap<String, ContentFile>,
}

/// A decoded text content file (HTML or CSS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextContent {
    pub path: String,
    pub media_type: String,
    pub content: String,
}

/// A raw binary content file (images, fonts, everything unclassified).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryContent {
    pub path: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

/// Either flavor of owned content file, as stored in the combined map.
#[derive(Debug, Clone)]
pub enum ContentFile {
    Text(TextContent),
    Binary(BinaryContent),
}

impl ContentFile {
    pub fn path(&self) -> &str {
        match self {
            ContentFile::Text(f) => &f.path,
            ContentFile::Binary(f) => &f.path,
        }
    }

    pub fn media_type(&self) -> &str {
        match self {
            ContentFile::Text(f) => &f.media_type,
            ContentFile::Binary(f) => &f.media_type,
        }
    }
}

/// Open a book and read all of its content into memory. The archive is
/// released before this returns.
pub fn read_book<P: AsRef<Path>>(path: P) -> Result<Book> {
    crate::reader::open_book(path)?.materialize()
}

/// Like [`read_book`], from an in-memory buffer.
pub fn read_book_from_bytes(data: Vec<u8>) -> Result<Book> {
    crate::reader::open_book_from_bytes(data)?.materialize()
}

pub(crate) fn materialize(book_ref: BookRef) -> Result<Book> {
    let mut content = Content::default();

    for (path, entry) in &book_ref.content().html {
        let file = TextContent {
            path: path.clone(),
            media_type: entry.media_type.clone(),
            content: book_ref.resource(path)?.read_text()?,
        };
        content.all.insert(path.clone(), ContentFile::Text(file.clone()));
        content.html.insert(path.clone(), file);
    }
    for (path, entry) in &book_ref.content().css {
        let file = TextContent {
            path: path.clone(),
            media_type: entry.media_type.clone(),
            content: book_ref.resource(path)?.read_text()?,
        };
        content.all.insert(path.clone(), ContentFile::Text(file.clone()));
        content.css.insert(path.clone(), file);
    }
    for (path, entry) in &book_ref.content().images {
        let file = read_binary(&book_ref, path, &entry.media_type)?;
        content.all.insert(path.clone(), ContentFile::Binary(file.clone()));
        content.images.insert(path.clone(), file);
    }
    for (path, entry) in &book_ref.content().fonts {
        let file = read_binary(&book_ref, path, &entry.media_type)?;
        content.all.insert(path.clone(), ContentFile::Binary(file.clone()));
        content.fonts.insert(path.clone(), file);
    }
    // Remaining combined-map entries (the unclassified ones) as bytes.
    for (path, entry) in &book_ref.content().all {
        if !content.all.contains_key(path) {
            let file = read_binary(&book_ref, path, &entry.media_type)?;
            content.all.insert(path.clone(), ContentFile::Binary(file));
        }
    }

    let cover = book_ref.read_cover()?;
    let title = book_ref.title().to_string();
    let authors = book_ref.authors().to_vec();
    // The materialized reading order and navigation resolve to the same
    // normalized paths the lazy model produced; those paths now key into
    // the owned maps above.
    let navigation = book_ref.navigation().to_vec();

    let (archive, schema, index) = book_ref.into_parts();
    drop(archive);

    Ok(Book {
        schema,
        title,
        authors,
        content,
        cover,
        reading_order: index.reading_order,
        navigation,
    })
}

fn read_binary(book_ref: &BookRef, path: &str, media_type: &str) -> Result<BinaryContent> {
    Ok(BinaryContent {
        path: path.to_string(),
        media_type: media_type.to_string(),
        content: book_ref.resource(path)?.read_bytes()?,
    })
}
