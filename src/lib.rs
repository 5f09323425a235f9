//! # vellum
//!
//! A lazy and eager EPUB 2/3 reading library.
//!
//! ## Two access models
//!
//! - [`open_book`] parses the container and returns a [`BookRef`]: the
//!   archive stays open and content is read on demand through
//!   [`ContentRef`]s. Dropping or closing the handle invalidates every
//!   outstanding reference.
//! - [`read_book`] reads everything up front and returns a [`Book`]: an
//!   owned snapshot with no archive association.
//!
//! Both models expose the same values: metadata, classified content maps,
//! spine-derived reading order, cover image, and a unified navigation tree
//! reconciled from the EPUB 2 NCX and EPUB 3 nav document formats.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vellum::{open_book, read_book};
//!
//! // Eager: everything in memory, archive released.
//! let book = read_book("path/to/book.epub")?;
//! println!("Title: {}", book.title);
//! for path in &book.reading_order {
//!     println!("{}: {} bytes", path, book.content.html[path].content.len());
//! }
//!
//! // Lazy: read individual files on demand.
//! let book_ref = open_book("path/to/book.epub")?;
//! for chapter in book_ref.reading_order() {
//!     let text = chapter.read_text()?;
//!     println!("{}: {} chars", chapter.path(), text.len());
//! }
//! # Ok::<(), vellum::Error>(())
//! ```

pub mod book;
pub mod error;
pub mod io;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod reader;
pub mod schema;
pub(crate) mod util;

pub use book::{BinaryContent, Book, Content, ContentFile, TextContent, read_book, read_book_from_bytes};
pub use error::{Error, Result};
pub use reader::{BookRef, ContentRef, ContentStream, open_book, open_book_from_bytes};
pub use schema::{
    ContentEntry, ContentIndex, ContentKind, ManifestItem, MetaEntry, Metadata, NavKind,
    NavigationItem, Package, Schema, Spine,
};
