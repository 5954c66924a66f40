//! FASTA support: the single-pass indexer (C4, §4.4) and the per-record
//! handle (§6) built over it.

pub mod indexer;
pub mod record;

pub use record::Record;
