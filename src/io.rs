//! Random-access byte sources backing an open archive.
//!
//! Every entry read or stream gets its own [`SourceCursor`], so reads of
//! different entries (or repeated reads of the same entry) never share
//! stream state.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A thread-safe, random-access source of bytes.
pub trait ByteSource: Send + Sync {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Returns true if the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `buf` with the bytes starting at `offset`.
    /// Must not rely on or modify any internal cursor position.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// A [`ByteSource`] backed by a local file.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

#[cfg(unix)]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt; // pread
        self.file.read_exact_at(buf, offset)
    }
}

#[cfg(windows)]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        let mut filled = 0;
        while filled < buf.len() {
            let read = self.file.seek_read(&mut buf[filled..], offset + filled as u64)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "not enough data",
                ));
            }
            filled += read;
        }
        Ok(())
    }
}

#[cfg(all(not(unix), not(windows)))]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

/// An in-memory [`ByteSource`].
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&s| s <= self.data.len())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "offset beyond end of data")
            })?;
        let end = start
            .checked_add(buf.len())
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "not enough data"))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

/// Wraps an `Arc<dyn ByteSource>` into a stateful `Read + Seek` stream.
/// Cloning yields an independent cursor over the same source.
#[derive(Clone)]
pub struct SourceCursor {
    source: Arc<dyn ByteSource>,
    position: u64,
}

impl SourceCursor {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn starting_at(source: Arc<dyn ByteSource>, position: u64) -> Self {
        Self { source, position }
    }
}

impl Read for SourceCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total = self.source.len();
        if self.position >= total {
            return Ok(0);
        }
        let want = (total - self.position).min(buf.len() as u64) as usize;
        self.source.read_at(self.position, &mut buf[..want])?;
        self.position += want as u64;
        Ok(want)
    }
}

impl Seek for SourceCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let total = self.source.len() as i64;
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => total + p,
            SeekFrom::Current(p) => self.position as i64 + p,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }
        self.position = new_pos as u64;
        Ok(self.position)
    }
}
