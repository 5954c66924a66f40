//! FASTA record handle (§6 "Record exposes…"). Borrows the owning instance
//! so that every read goes through its engine and its single window cache.

use crate::catalog::FastaRow;
use crate::error::Result;
use crate::index::Fastx;
use crate::seqops::{self, Composition, Strand};

pub struct Record<'f> {
    fastx: &'f mut Fastx,
    row: FastaRow,
}

impl<'f> Record<'f> {
    pub(crate) fn new(fastx: &'f mut Fastx, row: FastaRow) -> Self {
        Record { fastx, row }
    }

    pub fn id(&self) -> i64 {
        self.row.id
    }

    pub fn name(&self) -> &str {
        &self.row.name
    }

    pub fn seq_length(&self) -> u64 {
        self.row.seq_length
    }

    /// Bytes in the header line after `>` (name and comment together).
    pub fn description(&mut self) -> Result<Vec<u8>> {
        let start = self.row.offset - self.row.desc_length - self.row.end_length.max(1);
        self.fastx
            .engine
            .source_mut()
            .read_range(start, self.row.desc_length as usize)
    }

    /// The whole record as it sits in the file: header line plus sequence
    /// lines, line terminators included.
    pub fn raw(&mut self) -> Result<Vec<u8>> {
        let start = self.row.offset - self.row.desc_length - 1 - self.row.end_length.max(1);
        let len = (self.row.offset + self.row.byte_length - start) as usize;
        self.fastx.engine.source_mut().read_range(start, len)
    }

    /// Full, stripped, case-normalized sequence (§8 invariant 1).
    pub fn seq(&mut self) -> Result<Vec<u8>> {
        self.fastx
            .engine
            .fetch_fasta(&self.row, 1, self.row.seq_length, Strand::Forward)
    }

    /// `[start, end]` (1-based inclusive) slice on the given strand.
    pub fn slice(&mut self, start: u64, end: u64, strand: Strand) -> Result<Vec<u8>> {
        self.fastx.engine.fetch_fasta(&self.row, start, end, strand)
    }

    pub fn reverse(&mut self) -> Result<Vec<u8>> {
        let mut s = self.seq()?;
        seqops::reverse(&mut s);
        Ok(s)
    }

    pub fn complement(&mut self) -> Result<Vec<u8>> {
        let mut s = self.seq()?;
        seqops::complement(&mut s);
        Ok(s)
    }

    /// Reverse-complement of the full sequence (§9 glossary "antisense").
    pub fn antisense(&mut self) -> Result<Vec<u8>> {
        self.fastx
            .engine
            .fetch_fasta(&self.row, 1, self.row.seq_length, Strand::Reverse)
    }

    pub fn search(&mut self, pattern: &[u8], strand: Strand) -> Result<Option<u64>> {
        let seq = self.seq()?;
        Ok(seqops::search(&seq, pattern, strand))
    }

    /// `(g+c)/(a+c+g+t) * 100`, taken directly from the catalog's per-base
    /// counts rather than re-scanning the sequence (§4.9).
    pub fn gc_content(&self) -> f64 {
        let counts = self.base_counts();
        counts.gc_content()
    }

    pub fn gc_skew(&self) -> f64 {
        self.base_counts().gc_skew()
    }

    pub fn composition(&mut self) -> Result<Composition> {
        let seq = self.seq()?;
        Ok(seqops::composition(&seq))
    }

    fn base_counts(&self) -> seqops::BaseCounts {
        seqops::BaseCounts {
            a: self.row.a,
            c: self.row.c,
            g: self.row.g,
            t: self.row.t,
            n: self.row.n,
        }
    }
}
