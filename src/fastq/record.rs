//! FASTQ record handle (§6, §4.6 "FASTQ read").

use crate::catalog::FastqRow;
use crate::error::Result;
use crate::index::Fastx;

pub struct Record<'f> {
    fastx: &'f mut Fastx,
    row: FastqRow,
}

impl<'f> Record<'f> {
    pub(crate) fn new(fastx: &'f mut Fastx, row: FastqRow) -> Self {
        Record { fastx, row }
    }

    pub fn id(&self) -> i64 {
        self.row.id
    }

    pub fn name(&self) -> &str {
        &self.row.name
    }

    pub fn read_length(&self) -> u64 {
        self.row.read_length
    }

    pub fn seq(&mut self) -> Result<Vec<u8>> {
        self.fastx.engine.fastq_seq(&self.row)
    }

    pub fn qual(&mut self) -> Result<Vec<u8>> {
        self.fastx.engine.fastq_qual(&self.row)
    }

    pub fn description(&mut self) -> Result<Vec<u8>> {
        self.fastx.engine.fastq_description(&self.row)
    }

    pub fn raw(&mut self) -> Result<Vec<u8>> {
        self.fastx.engine.fastq_raw(&self.row)
    }

    /// Quality bytes mapped to integer Phred scores by subtracting the
    /// instance's `phred` offset (default 33 if unset, §4.6 "quali").
    pub fn quali(&mut self) -> Result<Vec<i32>> {
        let offset = self.fastx.phred.unwrap_or(33) as i32;
        let qual = self.qual()?;
        Ok(qual.iter().map(|&b| b as i32 - offset).collect())
    }
}
