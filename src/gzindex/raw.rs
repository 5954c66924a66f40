//! Thin, unsafe wrapper around raw zlib `inflate`, used instead of the safe
//! `flate2::Decompress` surface because §4.2 of the spec requires
//! `Z_BLOCK`-based block-boundary stops, `inflatePrime` for sub-byte
//! resume, and `inflateSetDictionary` for the history window. None of these
//! are exposed by `flate2`'s safe API. Grounded call-for-call on
//! `_zran_init_zlib_inflate`/`_zran_inflate` in `original_source/src/zran.c`.

use std::io;
use std::mem;
use std::os::raw::{c_int, c_void};
use std::ptr;

use libz_sys as zlib;

/// zlib's `zalloc`/`zfree` accept `Z_NULL` to request the library's built-in
/// allocator, but `z_stream`'s Rust binding types those fields as plain
/// (non-nullable) `fn` pointers, so the struct can't be built by zeroing.
/// These hand the allocation straight to the global Rust allocator instead,
/// the same trick `flate2`'s `ffi::c::StreamWrapper` uses.
mod allocator {
    use std::alloc::{self, Layout};
    use std::os::raw::c_void;

    const ALIGN: usize = std::mem::align_of::<usize>();

    fn align_up(size: usize, align: usize) -> usize {
        (size + align - 1) & !(align - 1)
    }

    pub extern "C" fn zalloc(_opaque: *mut c_void, items: u32, size: u32) -> *mut c_void {
        let size = match (items as usize)
            .checked_mul(size as usize)
            .map(|n| align_up(n, ALIGN))
            .and_then(|n| n.checked_add(std::mem::size_of::<usize>()))
        {
            Some(n) => n,
            None => return std::ptr::null_mut(),
        };
        let layout = match Layout::from_size_align(size, ALIGN) {
            Ok(l) => l,
            Err(_) => return std::ptr::null_mut(),
        };
        unsafe {
            let raw = alloc::alloc(layout);
            if raw.is_null() {
                return std::ptr::null_mut();
            }
            (raw as *mut usize).write(size);
            raw.add(std::mem::size_of::<usize>()) as *mut c_void
        }
    }

    pub extern "C" fn zfree(_opaque: *mut c_void, address: *mut c_void) {
        unsafe {
            let header = (address as *mut usize).offset(-1);
            let size = *header;
            let layout = Layout::from_size_align_unchecked(size, ALIGN);
            alloc::dealloc(header as *mut u8, layout)
        }
    }
}

/// Tagged result of a single inflate step, mirroring `ZRAN_INFLATE_*`.
#[derive(Debug, PartialEq, Eq)]
pub enum InflateStatus {
    /// Made progress; keep calling.
    Ok,
    /// Hit a deflate block boundary (only returned when `stop_at_block` was set).
    BlockBoundary,
    /// The output buffer is full.
    OutputFull,
    /// `Z_STREAM_END`: end of this gzip member.
    StreamEnd,
}

/// A raw (non-owning) zlib inflate stream.
///
/// `z_stream` is heap-allocated and pinned behind a `Box`: zlib's internal
/// inflate state stores a pointer back to the `z_stream` it was initialized
/// with (`state->strm`), so the struct can never move after
/// `inflateInit2_` runs. Holding it inline here (as `Inflater` itself gets
/// moved around by value through `stream_build`'s `match`/return paths)
/// would leave that back-pointer dangling and inflate's first consistency
/// check would reject the stream with `Z_STREAM_ERROR`.
pub struct Inflater {
    strm: Box<zlib::z_stream>,
    /// true if inflateInit2 was called with automatic gzip/zlib header
    /// detection (32+15), false for a raw (no-header) stream used on resume.
    raw: bool,
}

fn check(code: c_int) -> io::Result<c_int> {
    if code < 0 {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("zlib error {}", code),
        ))
    } else {
        Ok(code)
    }
}

impl Inflater {
    /// New inflater expecting a gzip header (window bits 15 + 32 enables
    /// automatic zlib/gzip header detection, matching `_zran_find_next_stream`'s
    /// re-init after a concatenated member boundary).
    pub fn new_gzip() -> io::Result<Self> {
        Self::init(15 + 32, false)
    }

    /// New inflater for raw deflate data (no header), used when resuming
    /// from a stored access point with a preset dictionary.
    pub fn new_raw() -> io::Result<Self> {
        Self::init(-15, true)
    }

    fn init(window_bits: c_int, raw: bool) -> io::Result<Self> {
        let mut strm = Box::new(zlib::z_stream {
            next_in: ptr::null_mut(),
            avail_in: 0,
            total_in: 0,
            next_out: ptr::null_mut(),
            avail_out: 0,
            total_out: 0,
            msg: ptr::null_mut(),
            state: ptr::null_mut(),
            zalloc: allocator::zalloc,
            zfree: allocator::zfree,
            opaque: ptr::null_mut() as *mut c_void,
            data_type: 0,
            adler: 0,
            reserved: 0,
        });
        unsafe {
            let version = zlib::zlibVersion();
            let ret = zlib::inflateInit2_(
                strm.as_mut(),
                window_bits,
                version,
                mem::size_of::<zlib::z_stream>() as c_int,
            );
            check(ret)?;
        }
        Ok(Inflater { strm, raw })
    }

    /// Prime the stream with `bits` leftover bits from the previous byte,
    /// as `_zran_init_zlib_inflate` does for a checkpoint whose `bits > 0`.
    pub fn prime(&mut self, bits: u8, value: u8) -> io::Result<()> {
        if bits == 0 {
            return Ok(());
        }
        unsafe {
            check(zlib::inflatePrime(
                self.strm.as_mut(),
                bits as c_int,
                (value as c_int) >> (8 - bits as c_int),
            ))?;
        }
        Ok(())
    }

    /// Install the deflate history dictionary (the access point's window).
    pub fn set_dictionary(&mut self, window: &[u8]) -> io::Result<()> {
        unsafe {
            check(zlib::inflateSetDictionary(
                self.strm.as_mut(),
                window.as_ptr(),
                window.len() as zlib::uInt,
            ))?;
        }
        Ok(())
    }

    /// Feed `input` and decompress into `output`. Returns the status plus
    /// how many input/output bytes were actually consumed/produced. If
    /// `stop_at_block`, inflate is invoked with `Z_BLOCK` so it returns as
    /// soon as it reaches a deflate block boundary.
    pub fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        stop_at_block: bool,
    ) -> crate::error::Result<(InflateStatus, usize, usize)> {
        self.strm.next_in = input.as_ptr() as *mut u8;
        self.strm.avail_in = input.len() as zlib::uInt;
        self.strm.next_out = output.as_mut_ptr();
        self.strm.avail_out = output.len() as zlib::uInt;

        let flush = if stop_at_block {
            zlib::Z_BLOCK
        } else {
            zlib::Z_NO_FLUSH
        };

        let ret = unsafe { zlib::inflate(self.strm.as_mut(), flush) };

        let consumed = input.len() - self.strm.avail_in as usize;
        let produced = output.len() - self.strm.avail_out as usize;

        if ret == zlib::Z_BUF_ERROR {
            // Transient: no progress possible with current input/output.
            return Ok((InflateStatus::OutputFull, consumed, produced));
        }
        if ret == zlib::Z_STREAM_END {
            return Ok((InflateStatus::StreamEnd, consumed, produced));
        }
        if ret == zlib::Z_DATA_ERROR {
            // In gzip-header mode, Z_DATA_ERROR on trailer consumption means
            // the CRC32/ISIZE check failed; any other case is corruption.
            if !self.raw {
                return Err(crate::error::Error::new(
                    crate::error::ErrorKind::ChecksumMismatch,
                ));
            }
            return Err(crate::error::Error::new(
                crate::error::ErrorKind::CorruptStream(ret),
            ));
        }
        if ret < 0 {
            return Err(crate::error::Error::new(
                crate::error::ErrorKind::CorruptStream(ret),
            ));
        }

        // After Z_BLOCK, zlib signals a block boundary via data_type's high
        // bits: bit 7 set, bit 6 clear (see zlib.h and zran.c).
        if stop_at_block && (self.strm.data_type & 0x80) != 0 && (self.strm.data_type & 0x40) == 0 {
            return Ok((InflateStatus::BlockBoundary, consumed, produced));
        }
        if self.strm.avail_out == 0 {
            return Ok((InflateStatus::OutputFull, consumed, produced));
        }
        Ok((InflateStatus::Ok, consumed, produced))
    }

    /// Number of unused bits in the last consumed input byte (0..=7).
    /// Valid immediately after a `BlockBoundary` result.
    pub fn unused_bits(&self) -> u8 {
        (self.strm.data_type & 0x7) as u8
    }
}

impl Drop for Inflater {
    fn drop(&mut self) {
        unsafe {
            zlib::inflateEnd(self.strm.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gzip_header_round_trip_through_owned_inflater() {
        // Regression test for the dangling `state->strm` back-pointer bug:
        // `Inflater::init` must build `z_stream` so that moving the
        // returned `Inflater` by value (as `new_gzip()` does, returning
        // `Self`) doesn't invalidate zlib's internal state.
        let plain: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&plain).unwrap();
        let data = enc.finish().unwrap();

        let mut inf = Inflater::new_gzip().unwrap();
        let mut out = vec![0u8; 65536];
        let (status, consumed, _produced) = inf.step(&data, &mut out, true).unwrap();
        assert_eq!(status, InflateStatus::BlockBoundary);
        assert!(consumed > 0);
    }
}
