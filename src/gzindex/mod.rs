//! Gzip random-access layer (C2, §4.2). Builds and consumes a table of
//! deflate-stream checkpoints ("access points") so that an arbitrary
//! uncompressed byte range can be read without decompressing from the
//! start of the file.

mod point;
mod raw;

pub use point::{AccessPoint, GzipIndex, DEFAULT_SPACING, DEFAULT_WINDOW_SIZE};
use raw::{InflateStatus, Inflater};

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, ErrorKind, Result};


/// A ring buffer tracking exactly the last `window_size` uncompressed bytes
/// produced, used to snapshot the deflate history dictionary at a
/// checkpoint (§4.2).
struct RingWindow {
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
}

impl RingWindow {
    fn new(size: usize) -> Self {
        RingWindow {
            buf: vec![0u8; size],
            pos: 0,
            filled: 0,
        }
    }

    fn push(&mut self, data: &[u8]) {
        let size = self.buf.len();
        if size == 0 {
            return;
        }
        if data.len() >= size {
            self.buf.copy_from_slice(&data[data.len() - size..]);
            self.pos = 0;
            self.filled = size;
            return;
        }
        for &b in data {
            self.buf[self.pos] = b;
            self.pos = (self.pos + 1) % size;
        }
        self.filled = (self.filled + data.len()).min(size);
    }

    fn snapshot(&self) -> Box<[u8]> {
        let size = self.buf.len();
        let mut out = vec![0u8; size];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.buf[(self.pos + i) % size];
        }
        out.into_boxed_slice()
    }
}

/// Result of one streaming build/expand pass: the new access points found,
/// the uncompressed offset reached, and whether true EOF was hit.
struct BuildOutcome {
    new_points: Vec<AccessPoint>,
    uncmp_offset: u64,
    eof: bool,
}

/// Core streaming routine shared by `build` (from scratch) and `expand`
/// (resume from the last known point). Grounded on `_zran_expand_index` /
/// `_zran_inflate` / `_zran_find_next_stream` in `original_source/src/zran.c`.
fn stream_build<F: Read + Seek>(
    file: &mut F,
    resume: Option<&AccessPoint>,
    window_size: u32,
    spacing: u32,
    until: Option<u64>,
) -> Result<BuildOutcome> {
    let w = window_size as usize;
    let mut ring = RingWindow::new(w);

    let mut cmp_offset: u64;
    let mut uncmp_offset: u64;
    let mut inflater: Inflater;

    match resume {
        None => {
            file.seek(SeekFrom::Start(0))?;
            cmp_offset = 0;
            uncmp_offset = 0;
            inflater = Inflater::new_gzip()?;
        }
        Some(p) => {
            let seek_loc = p.cmp_offset - u64::from(p.bits > 0);
            file.seek(SeekFrom::Start(seek_loc))?;
            cmp_offset = seek_loc;
            uncmp_offset = p.uncmp_offset;
            inflater = Inflater::new_raw()?;
            if p.bits > 0 {
                let mut b = [0u8; 1];
                file.read_exact(&mut b)?;
                cmp_offset += 1;
                inflater.prime(p.bits, b[0])?;
            }
            if let Some(win) = &p.window {
                inflater.set_dictionary(win)?;
                ring.push(win);
            }
        }
    }

    let mut new_points = Vec::new();
    let mut last_point_uncmp = uncmp_offset;

    if resume.is_none() {
        new_points.push(AccessPoint {
            cmp_offset: 0,
            uncmp_offset: 0,
            bits: 0,
            window: None,
        });
    }

    let mut in_buf = vec![0u8; 64 * 1024];
    let mut in_len = 0usize;
    let mut in_pos = 0usize;
    let mut out_buf = vec![0u8; 64 * 1024];
    let mut eof = false;

    loop {
        if in_pos >= in_len {
            in_len = file.read(&mut in_buf)?;
            in_pos = 0;
            if in_len == 0 {
                eof = true;
                break;
            }
        }

        let (status, consumed, produced) =
            inflater.step(&in_buf[in_pos..in_len], &mut out_buf, true)?;
        cmp_offset += consumed as u64;
        in_pos += consumed;
        uncmp_offset += produced as u64;
        if produced > 0 {
            ring.push(&out_buf[..produced]);
        }

        match status {
            InflateStatus::Ok | InflateStatus::OutputFull => {}
            InflateStatus::BlockBoundary => {
                if uncmp_offset - last_point_uncmp >= u64::from(spacing) {
                    let bits = inflater.unused_bits();
                    let window = Some(ring.snapshot());
                    new_points.push(AccessPoint {
                        cmp_offset,
                        uncmp_offset,
                        bits,
                        window,
                    });
                    last_point_uncmp = uncmp_offset;
                }
                if let Some(target) = until {
                    if uncmp_offset >= target && !new_points.is_empty() {
                        break;
                    }
                }
            }
            InflateStatus::StreamEnd => {
                if in_pos >= in_len {
                    let carry = in_len - in_pos;
                    if carry > 0 {
                        in_buf.copy_within(in_pos..in_len, 0);
                    }
                    let n = file.read(&mut in_buf[carry..])?;
                    in_len = carry + n;
                    in_pos = 0;
                    if n == 0 {
                        eof = true;
                        break;
                    }
                }
                // Scan for the next gzip member's magic bytes, counting
                // any inter-member padding toward cmp_offset.
                let mut found = false;
                loop {
                    while in_pos + 1 < in_len {
                        if in_buf[in_pos] == 0x1f && in_buf[in_pos + 1] == 0x8b {
                            found = true;
                            break;
                        }
                        in_pos += 1;
                        cmp_offset += 1;
                    }
                    if found {
                        break;
                    }
                    let carry = in_len - in_pos;
                    if carry > 0 {
                        in_buf.copy_within(in_pos..in_len, 0);
                    }
                    let n = file.read(&mut in_buf[carry..])?;
                    in_len = carry + n;
                    in_pos = 0;
                    if n == 0 {
                        eof = true;
                        break;
                    }
                }
                if eof {
                    break;
                }
                inflater = Inflater::new_gzip()?;
            }
        }
    }

    if eof && (new_points.is_empty() || uncmp_offset != last_point_uncmp) {
        new_points.push(AccessPoint {
            cmp_offset,
            uncmp_offset,
            bits: 0,
            window: if uncmp_offset == 0 {
                None
            } else {
                Some(ring.snapshot())
            },
        });
    }

    Ok(BuildOutcome {
        new_points,
        uncmp_offset,
        eof,
    })
}

impl GzipIndex {
    /// Build a full index from scratch (§4.2 "Build").
    pub fn build<F: Read + Seek>(
        file: &mut F,
        compressed_size: u64,
        window_size: u32,
        spacing: u32,
    ) -> Result<GzipIndex> {
        if spacing <= window_size {
            return Err(Error::new(ErrorKind::UnknownIndexFormat));
        }
        let mut index = GzipIndex::new(compressed_size, window_size, spacing);
        let outcome = stream_build(file, None, window_size, spacing, None)?;
        index.points = outcome.new_points;
        index.uncompressed_size = outcome.uncmp_offset;
        log::debug!(
            "built gzip index: {} points, {} uncompressed bytes",
            index.points.len(),
            index.uncompressed_size
        );
        Ok(index)
    }

    /// Incrementally extend the index at least past `until` (uncompressed
    /// offset), per §4.2 "Auto-build vs. fixed". Returns `true` if EOF was
    /// reached during expansion (in which case `uncompressed_size` becomes
    /// exact).
    pub fn expand<F: Read + Seek>(&mut self, file: &mut F, until: u64) -> Result<bool> {
        if self.covered_extent() >= until {
            return Ok(false);
        }
        let last = self
            .points
            .last()
            .expect("index always has at least the zero point after build")
            .clone();
        let outcome = stream_build(file, Some(&last), self.window_size, self.spacing, Some(until))?;
        self.points.extend(outcome.new_points);
        if outcome.eof {
            self.uncompressed_size = outcome.uncmp_offset;
        }
        log::debug!(
            "expanded gzip index to {} points (extent now {})",
            self.points.len(),
            self.covered_extent()
        );
        Ok(outcome.eof)
    }

    /// Estimate how far to build in auto-build mode, from the observed
    /// compression ratio of the last point (or 2.0 if none).
    pub fn estimate_offset_for(&self, compressed_target: u64) -> u64 {
        let ratio = match self.points.last() {
            Some(p) if p.cmp_offset > 0 => p.uncmp_offset as f64 / p.cmp_offset as f64,
            _ => 2.0,
        };
        (compressed_target as f64 * ratio) as u64
    }

    /// Read `len` uncompressed bytes starting at uncompressed offset `u`
    /// (§4.2 "Seek-and-read"). `auto_build` controls whether a request past
    /// the current extent triggers incremental expansion; without it,
    /// `IndexNotCovered` is returned.
    pub fn read_at<F: Read + Seek>(
        &mut self,
        file: &mut F,
        u: u64,
        len: usize,
        auto_build: bool,
    ) -> Result<Vec<u8>> {
        if u + len as u64 > self.covered_extent() {
            if auto_build {
                let target_cmp = self.compressed_size.max(1);
                let est = self.estimate_offset_for(target_cmp).max(u + len as u64);
                loop {
                    let reached_eof = self.expand(file, est)?;
                    if self.covered_extent() >= u + len as u64 || reached_eof {
                        break;
                    }
                }
                if u + len as u64 > self.covered_extent() && self.uncompressed_size != 0 {
                    return Err(Error::new(ErrorKind::IndexNotCovered));
                }
            } else {
                return Err(Error::new(ErrorKind::IndexNotCovered));
            }
        }

        let point = self
            .point_before(u)
            .ok_or_else(|| Error::new(ErrorKind::IndexNotCovered))?
            .clone();

        let seek_loc = point.cmp_offset - u64::from(point.bits > 0);
        file.seek(SeekFrom::Start(seek_loc))?;

        let mut inflater = if point.uncmp_offset == 0 {
            Inflater::new_gzip()?
        } else {
            let mut inf = Inflater::new_raw()?;
            if point.bits > 0 {
                let mut b = [0u8; 1];
                file.read_exact(&mut b)?;
                inf.prime(point.bits, b[0])?;
            }
            if let Some(win) = &point.window {
                inf.set_dictionary(win)?;
            }
            inf
        };

        let discard = (u - point.uncmp_offset) as usize;
        let mut out = Vec::with_capacity(len);
        let mut skip_remaining = discard;
        let mut in_buf = vec![0u8; 64 * 1024];
        let mut in_len = 0usize;
        let mut in_pos = 0usize;
        let mut scratch = vec![0u8; 64 * 1024];

        while out.len() < len {
            if in_pos >= in_len {
                in_len = file.read(&mut in_buf)?;
                in_pos = 0;
                if in_len == 0 {
                    return Err(Error::new(ErrorKind::Truncated));
                }
            }

            let want = if skip_remaining > 0 {
                scratch.len().min(skip_remaining)
            } else {
                scratch.len().min(len - out.len())
            };
            let (status, consumed, produced) =
                inflater.step(&in_buf[in_pos..in_len], &mut scratch[..want], false)?;
            in_pos += consumed;
            if skip_remaining > 0 {
                let used = produced.min(skip_remaining);
                skip_remaining -= used;
                if produced > used {
                    out.extend_from_slice(&scratch[used..produced]);
                }
            } else {
                out.extend_from_slice(&scratch[..produced]);
            }

            if status == InflateStatus::StreamEnd && out.len() < len {
                // A fetch that crosses a concatenated member's boundary: scan
                // forward for the next member's magic bytes, same as stream_build,
                // and resume decompression from there.
                let mut found = false;
                loop {
                    while in_pos + 1 < in_len {
                        if in_buf[in_pos] == 0x1f && in_buf[in_pos + 1] == 0x8b {
                            found = true;
                            break;
                        }
                        in_pos += 1;
                    }
                    if found {
                        break;
                    }
                    let carry = in_len - in_pos;
                    if carry > 0 {
                        in_buf.copy_within(in_pos..in_len, 0);
                    }
                    let n = file.read(&mut in_buf[carry..])?;
                    in_len = carry + n;
                    in_pos = 0;
                    if n == 0 {
                        break;
                    }
                }
                if !found {
                    return Err(Error::new(ErrorKind::Truncated));
                }
                inflater = Inflater::new_gzip()?;
            } else if consumed == 0 && produced == 0 {
                // No progress with the current buffer; force a refill.
                in_pos = in_len;
            }
        }
        out.truncate(len);
        Ok(out)
    }
}
