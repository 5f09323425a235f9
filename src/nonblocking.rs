//! Non-blocking variants of the entry points and content reads.
//!
//! These are thin `spawn_blocking` adapters over the blocking core; no
//! parsing or resolution logic lives here. The underlying operations only
//! block on archive I/O and XML loads, so there is nothing to gain from
//! finer-grained async.

use std::path::Path;

use crate::book::Book;
use crate::error::{Error, Result};
use crate::reader::{BookRef, ContentRef};

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Non-blocking [`open_book`](crate::open_book).
pub async fn open_book<P: AsRef<Path>>(path: P) -> Result<BookRef> {
    let path = path.as_ref().to_path_buf();
    run_blocking(move || crate::reader::open_book(path)).await
}

/// Non-blocking [`open_book_from_bytes`](crate::open_book_from_bytes).
pub async fn open_book_from_bytes(data: Vec<u8>) -> Result<BookRef> {
    run_blocking(move || crate::reader::open_book_from_bytes(data)).await
}

/// Non-blocking [`read_book`](crate::read_book).
pub async fn read_book<P: AsRef<Path>>(path: P) -> Result<Book> {
    let path = path.as_ref().to_path_buf();
    run_blocking(move || crate::book::read_book(path)).await
}

/// Non-blocking [`read_book_from_bytes`](crate::read_book_from_bytes).
pub async fn read_book_from_bytes(data: Vec<u8>) -> Result<Book> {
    run_blocking(move || crate::book::read_book_from_bytes(data)).await
}

/// Non-blocking materialization of an already-open book.
pub async fn materialize(book_ref: BookRef) -> Result<Book> {
    run_blocking(move || book_ref.materialize()).await
}

impl ContentRef {
    /// Non-blocking [`read_bytes`](ContentRef::read_bytes).
    pub async fn read_bytes_async(&self) -> Result<Vec<u8>> {
        let this = self.clone();
        run_blocking(move || this.read_bytes()).await
    }

    /// Non-blocking [`read_text`](ContentRef::read_text).
    pub async fn read_text_async(&self) -> Result<String> {
        let this = self.clone();
        run_blocking(move || this.read_text()).await
    }
}
