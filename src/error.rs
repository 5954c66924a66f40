use std::fmt;
use std::io;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A parsing, lookup or I/O error produced by this crate.
///
/// Boxed like the teacher's `fasta::Error`/`fastq::Error`, so that `Error`
/// itself stays a single pointer wide.
#[derive(Debug)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn into_kind(self) -> ErrorKind {
        *self.kind
    }
}

/// The error taxonomy of `spec.md` §7.
#[derive(Debug)]
pub enum ErrorKind {
    /// No record with the given name exists in the catalog.
    NotFound(String),
    /// Positional access out of the `[0, n)` range.
    IndexOutOfRange(u64, u64),
    /// `fetch()` was asked for a range that cannot exist in the record.
    InvalidCoordinates(u64, u64, u64),
    /// The FASTA state machine saw something it didn't expect.
    MalformedFasta,
    /// The FASTQ state machine saw something it didn't expect, at this line.
    MalformedFastq(u64),
    /// Low-level I/O failure, surfaced unchanged.
    Io(io::Error),
    /// `inflate` returned a non-recoverable zlib error.
    CorruptStream(i32),
    /// EOF was reached inside a record or in the middle of a deflate block.
    Truncated,
    /// The gzip trailer CRC32/ISIZE did not match the decompressed data.
    ChecksumMismatch,
    /// A gzip seek landed past the index extent and auto-build is disabled.
    IndexNotCovered,
    /// The catalog's recorded compressed size doesn't match the input file.
    IndexFileMismatch,
    /// The serialized gzip index has an unrecognized magic.
    UnknownIndexFormat,
    /// The serialized gzip index has a version newer than this crate understands.
    UnsupportedIndexVersion(u8),
    /// Catalog (SQLite) failure.
    Sqlite(rusqlite::Error),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::NotFound(name) => write!(f, "no record named '{}'", name),
            ErrorKind::IndexOutOfRange(i, n) => {
                write!(f, "position {} is out of range (catalog has {} records)", i, n)
            }
            ErrorKind::InvalidCoordinates(start, end, len) => write!(
                f,
                "invalid coordinates {}..{} for a record of length {}",
                start, end, len
            ),
            ErrorKind::MalformedFasta => write!(f, "malformed FASTA input"),
            ErrorKind::MalformedFastq(line) => {
                write!(f, "malformed FASTQ input at line {}", line)
            }
            ErrorKind::Io(e) => write!(f, "I/O error: {}", e),
            ErrorKind::CorruptStream(code) => {
                write!(f, "corrupt deflate stream (zlib returned {})", code)
            }
            ErrorKind::Truncated => write!(f, "truncated compressed stream"),
            ErrorKind::ChecksumMismatch => write!(f, "gzip trailer CRC/ISIZE mismatch"),
            ErrorKind::IndexNotCovered => {
                write!(f, "requested offset is past the gzip index extent")
            }
            ErrorKind::IndexFileMismatch => {
                write!(f, "catalog's compressed size does not match the input file")
            }
            ErrorKind::UnknownIndexFormat => write!(f, "unrecognized gzip index magic"),
            ErrorKind::UnsupportedIndexVersion(v) => {
                write!(f, "unsupported gzip index format version {}", v)
            }
            ErrorKind::Sqlite(e) => write!(f, "catalog error: {}", e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::new(ErrorKind::Io(e))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Error {
        Error::new(ErrorKind::Sqlite(e))
    }
}
