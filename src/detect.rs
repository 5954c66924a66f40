//! Format detection (§6 "Detection"): gzip magic bytes, and FASTA vs. FASTQ
//! by inspecting the first non-empty character after any gzip header.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(file: &mut File) -> Result<bool> {
    let mut magic = [0u8; 2];
    file.seek(SeekFrom::Start(0))?;
    let n = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(n == 2 && magic == GZIP_MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Fasta,
    Fastq,
}

/// Peeks at the first non-whitespace byte of a decompressed stream to tell
/// FASTA (`>`) from FASTQ (`@`).
pub fn detect_format<R: Read>(mut reader: R) -> Result<FileFormat> {
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Err(crate::error::Error::new(
                crate::error::ErrorKind::MalformedFasta,
            ));
        }
        match byte[0] {
            b'>' => return Ok(FileFormat::Fasta),
            b'@' => return Ok(FileFormat::Fastq),
            b'\n' | b'\r' | b' ' | b'\t' => continue,
            _ => {
                return Err(crate::error::Error::new(
                    crate::error::ErrorKind::MalformedFasta,
                ))
            }
        }
    }
}
