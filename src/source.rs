//! `ByteSource`: the trait the slice engine (C6) is generic over, realizing
//! §9's "replace inheritance with a trait" design note. One implementation
//! reads directly from a plain file; the other serves reads through the
//! gzip access-point index (C2).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;
use crate::gzindex::GzipIndex;

/// A byte-addressable source of the decompressed record stream.
pub trait ByteSource {
    /// Read exactly `len` bytes starting at uncompressed offset `offset`.
    fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Total size of the decompressed stream, if already known.
    fn uncompressed_size(&self) -> Option<u64>;
}

/// A plain, uncompressed file.
pub struct PlainFile {
    file: File,
}

impl PlainFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(PlainFile {
            file: File::open(path)?,
        })
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl ByteSource for PlainFile {
    fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn uncompressed_size(&self) -> Option<u64> {
        None
    }
}

/// A gzip file served through a [`GzipIndex`] (C2).
pub struct GzipIndexed {
    file: File,
    pub index: GzipIndex,
    pub auto_build: bool,
}

impl GzipIndexed {
    pub fn new(file: File, index: GzipIndex, auto_build: bool) -> Self {
        GzipIndexed {
            file,
            index,
            auto_build,
        }
    }
}

impl ByteSource for GzipIndexed {
    fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.index
            .read_at(&mut self.file, offset, len, self.auto_build)
    }

    fn uncompressed_size(&self) -> Option<u64> {
        if self.index.uncompressed_size > 0 {
            Some(self.index.uncompressed_size)
        } else {
            None
        }
    }
}
