//! Buffered byte scanner (C1) used by the indexers and by FASTQ streaming
//! iteration. Wraps `buffer_redux::BufReader`, the same crate the teacher
//! uses in `core::bufreader`, over any `Read` source (a plain file or a
//! gzip-indexed source).

use std::io::{self, BufRead, Read};

use buffer_redux::BufReader as RawBufReader;

/// Default read-ahead buffer size (§4.1, §5: configurable, default 16 KiB).
pub const DEFAULT_BUF_SIZE: usize = 16 * 1024;

/// How a [`Scanner::get_until`] call should recognize the end of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// A line terminator: LF, with a trailing CR stripped. Byte accounting
    /// still counts the CR.
    Line,
    Space,
    Tab,
    Byte(u8),
}

impl Delimiter {
    #[inline]
    fn matches(self, b: u8) -> bool {
        match self {
            Delimiter::Line => b == b'\n',
            Delimiter::Space => b == b' ',
            Delimiter::Tab => b == b'\t',
            Delimiter::Byte(d) => b == d,
        }
    }
}

/// A bounded read-ahead scanner over a byte source.
///
/// Not thread-safe; one instance is owned per live file handle, matching
/// §4.1 and §5's single-threaded-per-handle model.
pub struct Scanner<R> {
    inner: RawBufReader<R>,
    /// Running count of bytes consumed from the underlying source.
    offset: u64,
}

impl<R: Read> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUF_SIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Scanner {
            inner: RawBufReader::with_capacity(capacity, reader),
            offset: 0,
        }
    }

    /// Current byte offset into the underlying stream.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Returns the next byte, or `None` at EOF.
    pub fn get_char(&mut self) -> io::Result<Option<u8>> {
        let buf = self.inner.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let b = buf[0];
        self.inner.consume(1);
        self.offset += 1;
        Ok(Some(b))
    }

    /// Reads bytes up to (but not including) the next occurrence of `delim`
    /// into `out`. The delimiter byte itself is consumed and not appended.
    /// If `append` is false, `out` is cleared first. Returns `true` if a
    /// delimiter was found, `false` if EOF was reached first (in which case
    /// any trailing bytes read are still appended).
    pub fn get_until(&mut self, delim: Delimiter, out: &mut Vec<u8>, append: bool) -> io::Result<bool> {
        if !append {
            out.clear();
        }
        loop {
            let (found, consumed) = {
                let buf = self.inner.fill_buf()?;
                if buf.is_empty() {
                    return Ok(false);
                }
                match buf.iter().position(|&b| delim.matches(b)) {
                    Some(pos) => {
                        out.extend_from_slice(&buf[..pos]);
                        (true, pos + 1)
                    }
                    None => {
                        out.extend_from_slice(buf);
                        (false, buf.len())
                    }
                }
            };
            self.inner.consume(consumed);
            self.offset += consumed as u64;
            if found {
                if delim == Delimiter::Line {
                    if let Some(&b'\r') = out.last() {
                        out.pop();
                    }
                }
                return Ok(true);
            }
        }
    }

    /// Convenience: reads a full line (per [`Delimiter::Line`] semantics)
    /// into a fresh buffer.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let found = self.get_until(Delimiter::Line, &mut buf, false)?;
        if !found && buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(buf))
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lf_and_crlf_lines() {
        let data = b"abc\ndef\r\nghi".to_vec();
        let mut s = Scanner::new(Cursor::new(data));
        assert_eq!(s.read_line().unwrap().unwrap(), b"abc");
        assert_eq!(s.read_line().unwrap().unwrap(), b"def");
        assert_eq!(s.read_line().unwrap().unwrap(), b"ghi");
        assert_eq!(s.read_line().unwrap(), None);
    }

    #[test]
    fn tracks_byte_offset_including_cr() {
        let mut s = Scanner::new(Cursor::new(b"ab\r\ncd".to_vec()));
        s.read_line().unwrap();
        assert_eq!(s.tell(), 4);
    }

    #[test]
    fn get_until_space() {
        let mut s = Scanner::new(Cursor::new(b"name desc\n".to_vec()));
        let mut buf = Vec::new();
        assert!(s.get_until(Delimiter::Space, &mut buf, false).unwrap());
        assert_eq!(buf, b"name");
    }
}
