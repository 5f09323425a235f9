//! Lazy, archive-backed access: opening a book, the [`BookRef`] handle,
//! and on-demand content reads.
//!
//! The archive is scanned once at open time; after that every read works
//! through a cached entry-location index over a random-access
//! [`ByteSource`], so each read or stream owns its own cursor and
//! decompressor. The handle is the sole owner of the archive state;
//! [`ContentRef`]s hold a weak association and refuse to read once the
//! handle is gone.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Take};
use std::path::Path;
use std::sync::{Arc, Weak};

use flate2::read::DeflateDecoder;
use log::{debug, warn};
use zip::ZipArchive;

use crate::book::Book;
use crate::error::{Error, Result};
use crate::io::{ByteSource, FileSource, MemorySource, SourceCursor};
use crate::schema::container::{self, CONTAINER_PATH};
use crate::schema::index::{ContentEntry, ContentIndex};
use crate::schema::{ContentKind, NavigationItem, Schema, navigation, package};
use crate::util;

/// Largest entry that may be buffered in memory by `read_bytes`/`read_text`.
/// Streams are exempt.
pub const MAX_ENTRY_SIZE: u64 = i32::MAX as u64;

/// Open a book lazily from a file on disk. The returned handle owns the
/// archive; content is read on demand through [`ContentRef`]s.
pub fn open_book<P: AsRef<Path>>(path: P) -> Result<BookRef> {
    let file = File::open(path)?;
    let source: Arc<dyn ByteSource> = Arc::new(FileSource::new(file)?);
    open_from_source(source)
}

/// Open a book lazily from an in-memory buffer.
pub fn open_book_from_bytes(data: Vec<u8>) -> Result<BookRef> {
    open_from_source(Arc::new(MemorySource::new(data)))
}

fn open_from_source(source: Arc<dyn ByteSource>) -> Result<BookRef> {
    // The archive state is owned locally until the schema is complete, so
    // any parse failure releases it before the error propagates.
    let archive = ArchiveState::scan(source)?;
    let (schema, index) = build_schema(&archive)?;
    debug!(
        "opened \"{}\": {} manifest entries, {} reading-order entries",
        schema.package.metadata.title(),
        index.all.len(),
        index.reading_order.len()
    );
    Ok(BookRef {
        archive: Arc::new(archive),
        schema,
        index,
    })
}

// ----------------------------------------------------------------------------
// Archive state
// ----------------------------------------------------------------------------

struct EntryLocation {
    data_offset: u64,
    compressed_size: u64,
    /// Declared uncompressed size.
    size: u64,
    /// 0 = stored, 8 = deflate, anything else unsupported.
    method: u16,
}

/// The open archive: random-access source plus cached entry locations from
/// the central directory.
pub(crate) struct ArchiveState {
    source: Arc<dyn ByteSource>,
    entries: HashMap<String, EntryLocation>,
}

impl ArchiveState {
    fn scan(source: Arc<dyn ByteSource>) -> Result<Self> {
        let cursor = SourceCursor::new(source.clone());
        let mut archive = ZipArchive::new(cursor)?;

        let mut entries = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            entries.insert(
                file.name().to_string(),
                EntryLocation {
                    data_offset: file.data_start(),
                    compressed_size: file.compressed_size(),
                    size: file.size(),
                    method: match file.compression() {
                        zip::CompressionMethod::Stored => 0,
                        zip::CompressionMethod::Deflated => 8,
                        _ => u16::MAX,
                    },
                },
            );
        }

        Ok(Self { source, entries })
    }

    /// Look up an entry, falling back to the percent-decoded path for
    /// packages whose hrefs are encoded but whose archive names are not.
    fn locate(&self, path: &str) -> Option<&EntryLocation> {
        self.entries.get(path).or_else(|| {
            let decoded = percent_encoding::percent_decode_str(path)
                .decode_utf8()
                .ok()?;
            self.entries.get(decoded.as_ref())
        })
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let location = self
            .locate(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        self.read_location(path, location)
    }

    fn read_location(&self, path: &str, location: &EntryLocation) -> Result<Vec<u8>> {
        let mut stream = self.entry_stream(path, location)?;
        let mut out = Vec::with_capacity(location.size.min(MAX_ENTRY_SIZE) as usize);
        stream.read_to_end(&mut out)?;
        if out.len() as u64 != location.size {
            warn!(
                "entry \"{}\" decompressed to {} bytes, expected {}",
                path,
                out.len(),
                location.size
            );
        }
        Ok(out)
    }

    fn entry_stream(&self, path: &str, location: &EntryLocation) -> Result<StreamKind> {
        let cursor = SourceCursor::starting_at(self.source.clone(), location.data_offset)
            .take(location.compressed_size);
        match location.method {
            0 => Ok(StreamKind::Stored(cursor)),
            8 => Ok(StreamKind::Deflated(DeflateDecoder::new(cursor))),
            method => Err(Error::Format(format!(
                "unsupported compression method {} for \"{}\"",
                method, path
            ))),
        }
    }
}

// ----------------------------------------------------------------------------
// Schema construction
// ----------------------------------------------------------------------------

fn build_schema(archive: &ArchiveState) -> Result<(Schema, ContentIndex)> {
    let container_bytes = match archive.read(CONTAINER_PATH) {
        Err(Error::NotFound(_)) => {
            return Err(Error::Format(format!(
                "{} not found in archive",
                CONTAINER_PATH
            )));
        }
        other => other?,
    };
    let root_path = container::root_file_path(&container_bytes)?;
    let content_dir = util::parent_dir(&root_path).to_string();

    let package_bytes = match archive.read(&root_path) {
        Err(Error::NotFound(_)) => {
            return Err(Error::Format(format!(
                "package document \"{}\" not found in archive",
                root_path
            )));
        }
        other => other?,
    };
    let package = package::parse_package(&decode(&package_bytes), &content_dir)?;
    let index = ContentIndex::build(&package);

    // Legacy NCX, located through the spine's toc attribute. A missing or
    // unreadable document is tolerated; a malformed one aborts the open.
    let legacy_nav = match &package.spine.toc_id {
        Some(toc_id) => match package.item_by_id(toc_id) {
            Some(item) => match archive.read(&item.href) {
                Ok(bytes) => Some(navigation::parse_ncx(&decode(&bytes), &content_dir, &index)?),
                Err(_) => {
                    warn!("NCX document \"{}\" could not be read", item.href);
                    None
                }
            },
            None => {
                warn!("spine toc attribute references unknown manifest id \"{}\"", toc_id);
                None
            }
        },
        None => None,
    };

    // Modern nav document, located through the manifest nav property.
    let modern_nav = match package.manifest.iter().find(|item| item.has_property("nav")) {
        Some(item) => match archive.read(&item.href) {
            Ok(bytes) => Some(navigation::parse_nav_doc(&decode(&bytes), &content_dir, &index)?),
            Err(_) => {
                warn!("nav document \"{}\" could not be read", item.href);
                None
            }
        },
        None => None,
    };

    let schema = Schema {
        content_dir,
        package,
        legacy_nav,
        modern_nav,
    };
    Ok((schema, index))
}

fn decode(bytes: &[u8]) -> String {
    let hint = util::extract_xml_encoding(bytes);
    util::decode_text(bytes, hint).into_owned()
}

// ----------------------------------------------------------------------------
// BookRef
// ----------------------------------------------------------------------------

/// A lazily opened book. Holds the archive open; dropping (or [`close`])
/// releases it and invalidates every outstanding [`ContentRef`].
///
/// [`close`]: BookRef::close
pub struct BookRef {
    archive: Arc<ArchiveState>,
    schema: Schema,
    index: ContentIndex,
}

impl BookRef {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The content index: manifest entries classified by kind.
    pub fn content(&self) -> &ContentIndex {
        &self.index
    }

    /// The primary title, or "" when the package declares none.
    pub fn title(&self) -> &str {
        self.schema.package.metadata.title()
    }

    pub fn authors(&self) -> &[String] {
        &self.schema.package.metadata.creators
    }

    /// A lazy reference to the manifest entry at `path` (a normalized
    /// archive path, as found in the content index).
    pub fn resource(&self, path: &str) -> Result<ContentRef> {
        let entry = self
            .index
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        Ok(self.content_ref(entry))
    }

    /// Lazy references to the spine's HTML entries, in reading order.
    pub fn reading_order(&self) -> Vec<ContentRef> {
        self.index
            .reading_order
            .iter()
            .filter_map(|path| self.index.html.get(path))
            .map(|entry| self.content_ref(entry))
            .collect()
    }

    /// The unified navigation forest: the modern tree when present,
    /// otherwise the legacy tree, otherwise empty.
    pub fn navigation(&self) -> &[NavigationItem] {
        self.schema
            .modern_nav
            .as_deref()
            .or(self.schema.legacy_nav.as_deref())
            .unwrap_or(&[])
    }

    /// Resolve and read the cover image: a `meta` pair named `cover`
    /// (case-insensitive) gives a manifest id, whose href must be in the
    /// Image map. Any missing link in that chain yields `Ok(None)`.
    pub fn read_cover(&self) -> Result<Option<Vec<u8>>> {
        let metadata = &self.schema.package.metadata;
        let Some(cover_id) = metadata.meta_content("cover") else {
            return Ok(None);
        };
        if cover_id.is_empty() {
            return Ok(None);
        }
        let Some(item) = self
            .schema
            .package
            .manifest
            .iter()
            .find(|item| item.id.eq_ignore_ascii_case(cover_id))
        else {
            return Ok(None);
        };
        let Some(entry) = self.index.images.get(&item.href) else {
            return Ok(None);
        };
        self.content_ref(entry).read_bytes().map(Some)
    }

    /// Read everything into an archive-independent [`Book`], then release
    /// the archive.
    pub fn materialize(self) -> Result<Book> {
        crate::book::materialize(self)
    }

    /// Release the archive. Outstanding [`ContentRef`]s fail with
    /// [`Error::Disposed`] from here on. Dropping the handle has the same
    /// effect.
    pub fn close(self) {}

    fn content_ref(&self, entry: &ContentEntry) -> ContentRef {
        ContentRef {
            path: entry.path.clone(),
            kind: entry.kind,
            media_type: entry.media_type.clone(),
            archive: Arc::downgrade(&self.archive),
        }
    }

    pub(crate) fn into_parts(self) -> (Arc<ArchiveState>, Schema, ContentIndex) {
        (self.archive, self.schema, self.index)
    }
}

// ----------------------------------------------------------------------------
// ContentRef
// ----------------------------------------------------------------------------

/// A lazy reference to one content file. Cheap to clone; does not own the
/// archive and stops working once the owning [`BookRef`] is gone.
#[derive(Clone)]
pub struct ContentRef {
    path: String,
    kind: ContentKind,
    media_type: String,
    archive: Weak<ArchiveState>,
}

impl ContentRef {
    /// Normalized archive path of this content file.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Read the complete decompressed bytes. The length equals the entry's
    /// declared uncompressed size.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let archive = self.archive()?;
        let location = self.locate(&archive)?;
        if location.size > MAX_ENTRY_SIZE {
            return Err(Error::TooLarge {
                path: self.path.clone(),
                size: location.size,
            });
        }
        archive.read_location(&self.path, location)
    }

    /// Read and decode the complete text content.
    pub fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(decode(&bytes))
    }

    /// Open an independent decompression stream over this entry. Not
    /// subject to the in-memory size cap; each call gets its own stream,
    /// so concurrent reads of the same entry are fine.
    pub fn open_stream(&self) -> Result<ContentStream> {
        let archive = self.archive()?;
        let location = self.locate(&archive)?;
        let inner = archive.entry_stream(&self.path, location)?;
        Ok(ContentStream {
            owner: self.archive.clone(),
            inner,
        })
    }

    fn archive(&self) -> Result<Arc<ArchiveState>> {
        self.archive.upgrade().ok_or(Error::Disposed)
    }

    fn locate<'a>(&self, archive: &'a ArchiveState) -> Result<&'a EntryLocation> {
        if self.path.is_empty() {
            return Err(Error::Format("content file has an empty path".into()));
        }
        archive
            .locate(&self.path)
            .ok_or_else(|| Error::NotFound(self.path.clone()))
    }
}

/// An owned decompression stream over a single archive entry. Reads fail
/// once the owning [`BookRef`] has been closed.
pub struct ContentStream {
    owner: Weak<ArchiveState>,
    inner: StreamKind,
}

enum StreamKind {
    Stored(Take<SourceCursor>),
    Deflated(DeflateDecoder<Take<SourceCursor>>),
}

impl Read for StreamKind {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamKind::Stored(r) => r.read(buf),
            StreamKind::Deflated(r) => r.read(buf),
        }
    }
}

impl Read for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.owner.upgrade().is_none() {
            return Err(io::Error::other(Error::Disposed));
        }
        self.inner.read(buf)
    }
}
