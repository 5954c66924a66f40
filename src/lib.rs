//! `fastx-index` is a random-access library for FASTA and FASTQ sequence
//! files. Input may be plaintext or gzip-compressed. Opening a file builds
//! (or loads) a side-car catalog once; afterwards, queries of the form
//! "record by name", "record by ordinal position", or "bases `s..e` of
//! record R, optionally reverse-complemented" run in O(1) amortized time
//! without holding the file in memory or re-scanning it.
//!
//! ```no_run
//! use fastx_index::{Fastx, Strand};
//!
//! let mut fx = Fastx::open("seqs.fasta.gz").unwrap();
//! println!("{} records, {} bp total", fx.count().unwrap(), fx.size().unwrap());
//! let seq = fx.fetch("chr1", 1000, 1200, Strand::Reverse).unwrap();
//! ```
//!
//! # Module map
//!
//! * [`scanner`] — buffered byte scanner used by the indexers.
//! * [`gzindex`] — the gzip access-point ("zran"-style) index.
//! * [`catalog`] — the persistent per-record metadata store.
//! * [`fasta`] / [`fastq`] — single-pass indexers for each format.
//! * [`engine`] — maps biological coordinates to byte ranges and serves reads.
//! * [`cache`] — the one-entry decoded-window cache.
//! * [`view`] — ordered/filterable projections over the catalog.
//! * [`seqops`] — reverse/complement/search/composition over decoded bytes.
//!
//! # Non-goals
//!
//! This crate does not write sequence files, edit records in place, join
//! multiple files, or perform alignment/variant calling. It targets a
//! single process reading one catalog at a time; for parallelism, open
//! multiple instances rather than sharing one across threads.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod fasta;
pub mod fastq;
pub mod gzindex;
pub mod scanner;
pub mod seqops;
pub mod source;
pub mod view;

mod detect;
mod index;

pub use error::{Error, ErrorKind, Result};
pub use index::{Fastx, Key, OpenOptions, Record};
pub use seqops::{Composition, Strand};
