//! Slice/fetch engine (C6, §4.6): maps a biological coordinate onto a byte
//! range in the (possibly gzip-indexed) underlying stream, serves it through
//! the window cache (C7), and applies strand/case transforms.

use crate::cache::WindowCache;
use crate::catalog::{FastaRow, FastqRow};
use crate::error::{Error, ErrorKind, Result};
use crate::seqops::{self, Strand};
use crate::source::ByteSource;

/// Owns the open byte source and the single window-cache slot for one
/// [`crate::Fastx`] instance.
pub struct Engine {
    source: Box<dyn ByteSource>,
    cache: WindowCache,
    uppercase: bool,
}

fn strip_newlines(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .copied()
        .filter(|&b| b != b'\n' && b != b'\r')
        .collect()
}

impl Engine {
    pub fn new(source: Box<dyn ByteSource>, uppercase: bool) -> Self {
        Engine {
            source,
            cache: WindowCache::new(),
            uppercase,
        }
    }

    /// `fetch(name, start, end, strand)` over a FASTA record (§4.6 steps 1-5).
    pub fn fetch_fasta(
        &mut self,
        row: &FastaRow,
        start: u64,
        end: u64,
        strand: Strand,
    ) -> Result<Vec<u8>> {
        if start < 1 || end < start || end > row.seq_length {
            return Err(Error::new(ErrorKind::InvalidCoordinates(
                start,
                end,
                row.seq_length,
            )));
        }
        let mut bytes = self.read_fasta_window(row, start, end)?;
        if self.uppercase {
            bytes.make_ascii_uppercase();
        }
        if strand == Strand::Reverse {
            seqops::reverse_complement(&mut bytes);
            // the returned buffer was mutated in place; the cached copy must
            // not be handed out again as if it were forward-strand (§4.7).
            self.cache.invalidate();
        }
        Ok(bytes)
    }

    /// Step 2-4 of §4.6: compute the byte range, read it (via cache or
    /// source), strip line terminators, and narrow to `[start, end]` for
    /// non-normalized records.
    fn read_fasta_window(&mut self, row: &FastaRow, start: u64, end: u64) -> Result<Vec<u8>> {
        if let Some(cached) = self.cache.get(row.id, start, end) {
            return Ok(cached);
        }
        if row.normalized {
            let inner = row.line_length - row.end_length;
            let s_l = (start - 1) / inner;
            let e_l = (end - 1) / inner;
            let offset = row.offset + (start - 1) + s_l * row.end_length;
            let len = (end - start + 1) + (e_l - s_l) * row.end_length;
            let raw = self.source.read_range(offset, len as usize)?;
            let stripped = strip_newlines(&raw);
            self.cache.set(row.id, start, end, stripped.clone());
            Ok(stripped)
        } else {
            // whole record, stripped and cached once; then narrowed in memory.
            if let Some(cached) = self.cache.get(row.id, 1, row.seq_length) {
                let lo = (start - 1) as usize;
                let hi = end as usize;
                return Ok(cached[lo..hi].to_vec());
            }
            let raw = self.source.read_range(row.offset, row.byte_length as usize)?;
            let stripped = strip_newlines(&raw);
            self.cache.set(row.id, 1, row.seq_length, stripped.clone());
            let lo = (start - 1) as usize;
            let hi = end as usize;
            Ok(stripped[lo..hi].to_vec())
        }
    }

    pub fn fastq_seq(&mut self, row: &FastqRow) -> Result<Vec<u8>> {
        let mut bytes = self.source.read_range(row.seq_offset, row.read_length as usize)?;
        if self.uppercase {
            bytes.make_ascii_uppercase();
        }
        Ok(bytes)
    }

    pub fn fastq_qual(&mut self, row: &FastqRow) -> Result<Vec<u8>> {
        self.source.read_range(row.qual_offset, row.read_length as usize)
    }

    /// `description: read desc_length bytes from seq_offset - desc_length - 1` (§4.6).
    pub fn fastq_description(&mut self, row: &FastqRow) -> Result<Vec<u8>> {
        let start = row.seq_offset.saturating_sub(row.desc_length + 1);
        self.source.read_range(start, row.desc_length as usize)
    }

    /// `raw: read (qual_offset + read_length) - (seq_offset - desc_length - 1) + 1` (§4.6).
    pub fn fastq_raw(&mut self, row: &FastqRow) -> Result<Vec<u8>> {
        let start = row.seq_offset.saturating_sub(row.desc_length + 1);
        let len = (row.qual_offset + row.read_length - start + 1) as usize;
        self.source.read_range(start, len)
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    pub fn source_mut(&mut self) -> &mut dyn ByteSource {
        self.source.as_mut()
    }
}
