//! The top-level instance type (§6 "Caller API surface"), realizing §9's
//! "no global state" note: `Fastx` owns its file handle, its catalog
//! connection and its engine; nothing in this crate is process-global.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::catalog::{BaseStats, Catalog, Kind};
use crate::detect::{self, FileFormat};
use crate::engine::Engine;
use crate::error::{Error, ErrorKind, Result};
use crate::fasta;
use crate::fastq;
use crate::fastq::quality;
use crate::gzindex::GzipIndex;
use crate::scanner::Scanner;
use crate::seqops::{BaseCounts, Composition};
use crate::source::{ByteSource, GzipIndexed, PlainFile};
use crate::view::View;

/// Open-time configuration (§6 `Open(path, options)`, expanded per
/// `SPEC_FULL.md`'s Configuration section).
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub uppercase: bool,
    pub build_index: bool,
    pub phred: Option<u8>,
    pub window_size: u32,
    pub spacing: u32,
    pub scanner_buf_size: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            uppercase: true,
            build_index: true,
            phred: None,
            window_size: crate::gzindex::DEFAULT_WINDOW_SIZE,
            spacing: crate::gzindex::DEFAULT_SPACING,
            scanner_buf_size: crate::scanner::DEFAULT_BUF_SIZE,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uppercase(mut self, v: bool) -> Self {
        self.uppercase = v;
        self
    }

    pub fn build_index(mut self, v: bool) -> Self {
        self.build_index = v;
        self
    }

    pub fn phred(mut self, v: u8) -> Self {
        self.phred = Some(v);
        self
    }

    pub fn window_size(mut self, v: u32) -> Self {
        self.window_size = v;
        self
    }

    pub fn spacing(mut self, v: u32) -> Self {
        self.spacing = v;
        self
    }

    pub fn scanner_buf_size(mut self, v: usize) -> Self {
        self.scanner_buf_size = v;
        self
    }

    pub fn open(self, path: impl AsRef<Path>) -> Result<Fastx> {
        Fastx::open_with(path, self)
    }
}

/// §9 "Type-erased containers and dynamic subscript dispatch": `get(Key)`
/// replaces separate by-name/by-position accessors.
#[derive(Debug, Clone, Copy)]
pub enum Key<'a> {
    Id(i64),
    Name(&'a str),
}

fn key_desc(key: Key) -> String {
    match key {
        Key::Id(id) => id.to_string(),
        Key::Name(n) => n.to_string(),
    }
}

/// A FASTA or FASTQ record handle, borrowed from the owning [`Fastx`].
pub enum Record<'f> {
    Fasta(fasta::Record<'f>),
    Fastq(fastq::Record<'f>),
}

impl<'f> Record<'f> {
    pub fn name(&self) -> &str {
        match self {
            Record::Fasta(r) => r.name(),
            Record::Fastq(r) => r.name(),
        }
    }

    pub fn description(&mut self) -> Result<Vec<u8>> {
        match self {
            Record::Fasta(r) => r.description(),
            Record::Fastq(r) => r.description(),
        }
    }

    pub fn raw(&mut self) -> Result<Vec<u8>> {
        match self {
            Record::Fasta(r) => r.raw(),
            Record::Fastq(r) => r.raw(),
        }
    }

    pub fn seq(&mut self) -> Result<Vec<u8>> {
        match self {
            Record::Fasta(r) => r.seq(),
            Record::Fastq(r) => r.seq(),
        }
    }

    pub fn as_fasta(&mut self) -> Option<&mut fasta::Record<'f>> {
        match self {
            Record::Fasta(r) => Some(r),
            Record::Fastq(_) => None,
        }
    }

    pub fn as_fastq(&mut self) -> Option<&mut fastq::Record<'f>> {
        match self {
            Record::Fastq(r) => Some(r),
            Record::Fasta(_) => None,
        }
    }
}

/// One decoded entry yielded by [`RecordIter`] (§4.6 "Record iteration"):
/// walked straight off the scanner in file order, without consulting the
/// catalog.
pub enum Entry {
    Fasta {
        name: String,
        description: String,
        seq: Vec<u8>,
    },
    Fastq {
        name: String,
        description: String,
        seq: Vec<u8>,
        qual: Vec<u8>,
    },
}

pub struct RecordIter {
    scanner: Scanner<Box<dyn Read>>,
    kind: Kind,
    uppercase: bool,
    done: bool,
    pending_fasta: Option<(String, String, Vec<u8>)>,
}

impl Iterator for RecordIter {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.kind {
            Kind::Fasta => self.next_fasta(),
            Kind::Fastq => self.next_fastq(),
        }
    }
}

impl RecordIter {
    fn next_fasta(&mut self) -> Option<Result<Entry>> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.scanner.read_line() {
                Ok(Some(l)) => l,
                Ok(None) => {
                    self.done = true;
                    return self.pending_fasta.take().map(|(name, description, mut seq)| {
                        if self.uppercase {
                            seq.make_ascii_uppercase();
                        }
                        Ok(Entry::Fasta {
                            name,
                            description,
                            seq,
                        })
                    });
                }
                Err(e) => return Some(Err(e.into())),
            };
            if line.first() == Some(&b'>') {
                let body = &line[1..];
                let end = body
                    .iter()
                    .position(|&b| b == b' ' || b == b'\t')
                    .unwrap_or(body.len());
                let name = String::from_utf8_lossy(&body[..end]).into_owned();
                let description = String::from_utf8_lossy(body).into_owned();
                let finished = self.pending_fasta.replace((name, description, Vec::new()));
                if let Some((name, description, mut seq)) = finished {
                    if self.uppercase {
                        seq.make_ascii_uppercase();
                    }
                    return Some(Ok(Entry::Fasta {
                        name,
                        description,
                        seq,
                    }));
                }
            } else if let Some((_, _, seq)) = self.pending_fasta.as_mut() {
                seq.extend_from_slice(&line);
            } else {
                return Some(Err(Error::new(ErrorKind::MalformedFasta)));
            }
        }
    }

    fn next_fastq(&mut self) -> Option<Result<Entry>> {
        if self.done {
            return None;
        }
        let header = match self.scanner.read_line() {
            Ok(Some(l)) => l,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => return Some(Err(e.into())),
        };
        if header.first() != Some(&b'@') {
            return Some(Err(Error::new(ErrorKind::MalformedFasta)));
        }
        let body = &header[1..];
        let end = body
            .iter()
            .position(|&b| b == b' ' || b == b'\t')
            .unwrap_or(body.len());
        let name = String::from_utf8_lossy(&body[..end]).into_owned();
        let description = String::from_utf8_lossy(body).into_owned();

        let seq = match self.scanner.read_line() {
            Ok(Some(l)) => l,
            _ => return Some(Err(Error::new(ErrorKind::MalformedFasta))),
        };
        let plus = match self.scanner.read_line() {
            Ok(Some(l)) => l,
            _ => return Some(Err(Error::new(ErrorKind::MalformedFasta))),
        };
        if plus.first() != Some(&b'+') {
            return Some(Err(Error::new(ErrorKind::MalformedFasta)));
        }
        let qual = match self.scanner.read_line() {
            Ok(Some(l)) => l,
            _ => return Some(Err(Error::new(ErrorKind::MalformedFasta))),
        };
        if qual.len() != seq.len() {
            return Some(Err(Error::new(ErrorKind::MalformedFasta)));
        }
        let mut seq = seq;
        if self.uppercase {
            seq.make_ascii_uppercase();
        }
        Some(Ok(Entry::Fastq {
            name,
            description,
            seq,
            qual,
        }))
    }
}

/// The library instance (§6). Owns the sequence file, the catalog, and the
/// slice engine. Not re-entrant: concurrent calls on the same instance are
/// disallowed (§5) — enforced here simply by requiring `&mut self`.
pub struct Fastx {
    path: PathBuf,
    kind: Kind,
    gzip: bool,
    uppercase: bool,
    pub(crate) phred: Option<u8>,
    catalog: Catalog,
    pub(crate) engine: Engine,
}

impl Fastx {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, OpenOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, opts: OpenOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let gzip = detect::is_gzip(&mut file)?;
        let compressed_size = file.metadata()?.len();

        let kind = detect_kind(&path, &mut file, gzip)?;
        let sidecar = Catalog::sidecar_path(&path, kind);
        let catalog_exists = sidecar.exists();

        let mut catalog = if catalog_exists {
            Catalog::open_ro(&sidecar, kind)?
        } else {
            if !opts.build_index {
                return Err(Error::new(ErrorKind::NotFound(format!(
                    "no catalog at {}",
                    sidecar.display()
                ))));
            }
            let mut catalog = Catalog::open_rw(&sidecar, kind)?;
            catalog.begin_build()?;
            let reader: Box<dyn Read> = if gzip {
                Box::new(flate2::read::MultiGzDecoder::new(File::open(&path)?))
            } else {
                Box::new(File::open(&path)?)
            };
            match kind {
                Kind::Fasta => {
                    fasta::indexer::build(reader, &mut catalog)?;
                }
                Kind::Fastq => {
                    fastq::indexer::build(reader, &mut catalog)?;
                }
            }
            if gzip {
                let mut raw = File::open(&path)?;
                let gzindex = GzipIndex::build(&mut raw, compressed_size, opts.window_size, opts.spacing)?;
                let mut blob = Vec::new();
                gzindex.write_to(&mut blob)?;
                catalog.store_gzindex(&blob)?;
            }
            log::debug!("built catalog at {}", sidecar.display());
            catalog
        };

        if !catalog_exists {
            log::debug!("catalog ready, reopening read-only");
        }
        // Reopen read-only so the instance never holds a write lock past
        // the build transaction (§4.3, §5).
        drop(catalog);
        catalog = Catalog::open_ro(&sidecar, kind)?;

        let source: Box<dyn ByteSource> = if gzip {
            let blob = catalog.load_gzindex()?.ok_or_else(|| {
                Error::new(ErrorKind::UnknownIndexFormat)
            })?;
            let gzindex = GzipIndex::read_from(&blob[..])?;
            gzindex.validate_against(compressed_size)?;
            Box::new(GzipIndexed::new(File::open(&path)?, gzindex, opts.build_index))
        } else {
            Box::new(PlainFile::open(&path)?)
        };

        let engine = Engine::new(source, opts.uppercase);

        Ok(Fastx {
            path,
            kind,
            gzip,
            uppercase: opts.uppercase,
            phred: opts.phred,
            catalog,
            engine,
        })
    }

    pub fn count(&self) -> Result<u64> {
        self.catalog.meta_count()
    }

    pub fn size(&self) -> Result<u64> {
        self.catalog.meta_total_length()
    }

    /// `(g+c)/(a+c+g+t) * 100` over the whole file (§4.9).
    pub fn gc_content(&mut self) -> Result<f64> {
        Ok(self.base_totals()?.gc_content())
    }

    pub fn composition(&mut self) -> Result<Composition> {
        let mut hist = [0u64; 26];
        for entry in self.iter()? {
            let seq = match entry? {
                Entry::Fasta { seq, .. } => seq,
                Entry::Fastq { seq, .. } => seq,
            };
            let c = crate::seqops::composition(&seq);
            for i in 0..26 {
                hist[i] += c[i];
            }
        }
        Ok(hist)
    }

    fn base_totals(&mut self) -> Result<BaseCounts> {
        match self.kind {
            Kind::Fasta => {
                let t = self.catalog.fasta_totals()?;
                Ok(BaseCounts {
                    a: t.a,
                    c: t.c,
                    g: t.g,
                    t: t.t,
                    n: t.n,
                })
            }
            Kind::Fastq => {
                let stats = self.ensure_fastq_stats()?;
                Ok(BaseCounts {
                    a: stats.a,
                    c: stats.c,
                    g: stats.g,
                    t: stats.t,
                    n: stats.n,
                })
            }
        }
    }

    /// Runs the lazy second pass over a FASTQ file computing base
    /// composition and quality-encoding statistics (§4.5, §4.11), caching
    /// the result in the catalog.
    fn ensure_fastq_stats(&mut self) -> Result<BaseStats> {
        if let Some(stats) = self.catalog.load_base_stats()? {
            return Ok(stats);
        }
        let mut counts = BaseCounts::default();
        let mut min_qs = u8::MAX;
        let mut max_qs = 0u8;
        for entry in self.iter()? {
            if let Entry::Fastq { seq, qual, .. } = entry? {
                for &b in &seq {
                    counts.update(b);
                }
                for &q in &qual {
                    min_qs = min_qs.min(q);
                    max_qs = max_qs.max(q);
                }
            }
        }
        let stats = BaseStats {
            a: counts.a,
            c: counts.c,
            g: counts.g,
            t: counts.t,
            n: counts.n,
        };
        self.catalog.store_base_stats(stats)?;
        let phred = quality::infer_phred(min_qs, max_qs);
        self.catalog.store_qual_stats(crate::catalog::QualStats {
            min_qs,
            max_qs,
            phred,
        })?;
        Ok(stats)
    }

    pub fn get(&mut self, key: Key) -> Result<Record<'_>> {
        if let Key::Id(id) = key {
            self.check_id_in_range(id)?;
        }
        match self.kind {
            Kind::Fasta => {
                let row = match key {
                    Key::Id(id) => self.catalog.fasta_by_id(id)?,
                    Key::Name(name) => self.catalog.fasta_by_name(name)?,
                }
                .ok_or_else(|| Error::new(ErrorKind::NotFound(key_desc(key))))?;
                Ok(Record::Fasta(fasta::Record::new(self, row)))
            }
            Kind::Fastq => {
                let row = match key {
                    Key::Id(id) => self.catalog.fastq_by_id(id)?,
                    Key::Name(name) => self.catalog.fastq_by_name(name)?,
                }
                .ok_or_else(|| Error::new(ErrorKind::NotFound(key_desc(key))))?;
                Ok(Record::Fastq(fastq::Record::new(self, row)))
            }
        }
    }

    /// §7: positional access (`Key::Id`) out of `[1, count]` raises
    /// `IndexOutOfRange` rather than the name-lookup `NotFound`.
    fn check_id_in_range(&self, id: i64) -> Result<()> {
        let count = self.catalog.meta_count()?;
        if id < 1 || id as u64 > count {
            return Err(Error::new(ErrorKind::IndexOutOfRange(id.max(0) as u64, count)));
        }
        Ok(())
    }

    /// `fetch(name, start, end, strand)` (§6), FASTA only.
    pub fn fetch(
        &mut self,
        name: &str,
        start: u64,
        end: u64,
        strand: crate::seqops::Strand,
    ) -> Result<Vec<u8>> {
        if self.kind != Kind::Fasta {
            return Err(Error::new(ErrorKind::NotFound(
                "fetch() is only supported for FASTA instances".to_string(),
            )));
        }
        let row = self
            .catalog
            .fasta_by_name(name)?
            .ok_or_else(|| Error::new(ErrorKind::NotFound(name.to_string())))?;
        self.engine.fetch_fasta(&row, start, end, strand)
    }

    /// Catalog query view (C8, §4.8).
    pub fn keys(&self) -> View<'_> {
        View::new(&self.catalog)
    }

    /// Record iteration (§4.6): a fresh pass over the file in file order,
    /// bypassing the catalog entirely.
    pub fn iter(&self) -> Result<RecordIter> {
        let file = File::open(&self.path)?;
        let reader: Box<dyn Read> = if self.gzip {
            Box::new(flate2::read::MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(RecordIter {
            scanner: Scanner::new(reader),
            kind: self.kind,
            uppercase: self.uppercase,
            done: false,
            pending_fasta: None,
        })
    }
}

fn detect_kind(path: &Path, file: &mut File, gzip: bool) -> Result<Kind> {
    if Catalog::exists(path, Kind::Fasta) {
        return Ok(Kind::Fasta);
    }
    if Catalog::exists(path, Kind::Fastq) {
        return Ok(Kind::Fastq);
    }
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(0))?;
    let format = if gzip {
        detect::detect_format(flate2::read::GzDecoder::new(&mut *file))?
    } else {
        detect::detect_format(&mut *file)?
    };
    file.seek(SeekFrom::Start(0))?;
    Ok(match format {
        FileFormat::Fasta => Kind::Fasta,
        FileFormat::Fastq => Kind::Fastq,
    })
}
