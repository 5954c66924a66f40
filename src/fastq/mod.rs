//! FASTQ support: the single-pass indexer (C5, §4.5), the per-record
//! handle (§6), and quality-encoding detection (§4.11).

pub mod indexer;
pub mod quality;
pub mod record;

pub use quality::{detect_encodings, infer_phred, QualityEncoding};
pub use record::Record;
