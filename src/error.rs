//! Error types for vellum operations.

use thiserror::Error;

/// Errors that can occur while opening or reading an EPUB.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Malformed or structurally incomplete container/package/navigation data.
    #[error("Invalid EPUB: {0}")]
    Format(String),

    /// A referenced content path is absent from the archive.
    #[error("File not found in archive: {0}")]
    NotFound(String),

    /// An entry's declared uncompressed size exceeds the in-memory cap.
    #[error("File \"{path}\" is too large to buffer ({size} bytes)")]
    TooLarge { path: String, size: u64 },

    /// A lazy content reference was used after its book handle was closed.
    #[error("book handle has been closed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, Error>;
