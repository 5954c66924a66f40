//! Access point type and the on-disk serialization format (§4.2, §6).

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, ErrorKind, Result};

/// Default deflate history window size (§3: `W`).
pub const DEFAULT_WINDOW_SIZE: u32 = 32 * 1024;
/// Default uncompressed spacing between checkpoints (§3: `S`).
pub const DEFAULT_SPACING: u32 = 1024 * 1024;

const MAGIC: &[u8; 5] = b"GZIDX";
const VERSION: u8 = 1;

/// A single deflate-stream checkpoint (§3 "Gzip access point").
#[derive(Debug, Clone)]
pub struct AccessPoint {
    pub cmp_offset: u64,
    pub uncmp_offset: u64,
    /// 0..=7; if non-zero the checkpoint is mid-byte (§4.2).
    pub bits: u8,
    /// Exactly `window_size` bytes of preceding uncompressed data. `None`
    /// only for the very first point (`uncmp_offset == 0`).
    pub window: Option<Box<[u8]>>,
}

/// The full checkpoint table for one compressed file (§3, §4.2).
#[derive(Debug, Clone)]
pub struct GzipIndex {
    pub points: Vec<AccessPoint>,
    pub spacing: u32,
    pub window_size: u32,
    /// Size of the compressed file this index was built against, used to
    /// validate a re-imported index (`IndexFileMismatch`).
    pub compressed_size: u64,
    /// 0 if unknown (fully known only once the build has reached EOF).
    pub uncompressed_size: u64,
}

impl GzipIndex {
    pub fn new(compressed_size: u64, window_size: u32, spacing: u32) -> Self {
        GzipIndex {
            points: Vec::new(),
            spacing,
            window_size,
            compressed_size,
            uncompressed_size: 0,
        }
    }

    /// Binary search for the point with the greatest `uncmp_offset <= u`.
    pub fn point_before(&self, u: u64) -> Option<&AccessPoint> {
        match self.points.binary_search_by_key(&u, |p| p.uncmp_offset) {
            Ok(i) => Some(&self.points[i]),
            Err(0) => None,
            Err(i) => Some(&self.points[i - 1]),
        }
    }

    /// The uncompressed extent currently covered by this index, i.e. the
    /// `uncmp_offset` of the last recorded point (not necessarily EOF).
    pub fn covered_extent(&self) -> u64 {
        self.points.last().map(|p| p.uncmp_offset).unwrap_or(0)
    }

    /// §4.2 serialization format: 32-byte header, then N offset rows, then
    /// N*window_size bytes of window data (only for points with a window).
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(MAGIC)?;
        w.write_u8(VERSION)?;
        w.write_u8(0)?; // reserved
        w.write_u64::<LittleEndian>(self.compressed_size)?;
        w.write_u64::<LittleEndian>(self.uncompressed_size)?;
        w.write_u32::<LittleEndian>(self.spacing)?;
        w.write_u32::<LittleEndian>(self.window_size)?;
        w.write_u32::<LittleEndian>(self.points.len() as u32)?;

        for p in &self.points {
            w.write_u64::<LittleEndian>(p.cmp_offset)?;
            w.write_u64::<LittleEndian>(p.uncmp_offset)?;
            w.write_u8(p.bits)?;
            w.write_u8(if p.window.is_some() { 1 } else { 0 })?;
        }
        for p in &self.points {
            if let Some(win) = &p.window {
                w.write_all(win)?;
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 5];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::new(ErrorKind::UnknownIndexFormat));
        }
        let version = r.read_u8()?;
        if version != VERSION {
            return Err(Error::new(ErrorKind::UnsupportedIndexVersion(version)));
        }
        let _reserved = r.read_u8()?;
        let compressed_size = r.read_u64::<LittleEndian>()?;
        let uncompressed_size = r.read_u64::<LittleEndian>()?;
        let spacing = r.read_u32::<LittleEndian>()?;
        let window_size = r.read_u32::<LittleEndian>()?;
        if window_size < DEFAULT_WINDOW_SIZE || spacing <= window_size {
            return Err(Error::new(ErrorKind::UnknownIndexFormat));
        }
        let npoints = r.read_u32::<LittleEndian>()? as usize;

        struct Row {
            cmp_offset: u64,
            uncmp_offset: u64,
            bits: u8,
            has_window: bool,
        }
        let mut rows = Vec::with_capacity(npoints);
        for _ in 0..npoints {
            let cmp_offset = r.read_u64::<LittleEndian>()?;
            let uncmp_offset = r.read_u64::<LittleEndian>()?;
            let bits = r.read_u8()?;
            let has_window = r.read_u8()? != 0;
            rows.push(Row {
                cmp_offset,
                uncmp_offset,
                bits,
                has_window,
            });
        }
        let mut points = Vec::with_capacity(npoints);
        for row in rows {
            let window = if row.has_window {
                let mut buf = vec![0u8; window_size as usize];
                r.read_exact(&mut buf)?;
                Some(buf.into_boxed_slice())
            } else {
                None
            };
            points.push(AccessPoint {
                cmp_offset: row.cmp_offset,
                uncmp_offset: row.uncmp_offset,
                bits: row.bits,
                window,
            });
        }
        Ok(GzipIndex {
            points,
            spacing,
            window_size,
            compressed_size,
            uncompressed_size,
        })
    }

    /// Validates an imported index against the file it is claimed to
    /// belong to (§4.2 "Validation on import").
    pub fn validate_against(&self, actual_compressed_size: u64) -> Result<()> {
        if self.compressed_size != actual_compressed_size {
            return Err(Error::new(ErrorKind::IndexFileMismatch));
        }
        Ok(())
    }
}
