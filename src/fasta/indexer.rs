//! FASTA indexer (C4, §4.4, §4.10). A single pass over the decompressed
//! stream driving the `HEADER_START -> SEQ_LINE_START -> SEQ_LINE` state
//! machine, grounded on `_pyfastx_build_index` in `original_source/src/fasta.c`:
//! the same `bad_line`/`line_length` geometry tracking, the same
//! "last line is exempt from the bad_line check" rule, and the same
//! ASCII-uppercase base classification.

use std::io::Read;

use crate::catalog::{Catalog, FastaRow};
use crate::error::{Error, ErrorKind, Result};
use crate::scanner::Scanner;
use crate::seqops::BaseCounts;

struct Building {
    id: i64,
    name: String,
    desc_length: u64,
    offset: u64,
    seq_length: u64,
    line_length: u64,
    end_length: u64,
    bad_line: u32,
    counts: BaseCounts,
    /// Geometry of the most recently read sequence line, not yet checked
    /// against `line_length` because it might turn out to be the record's
    /// last line (which is exempt, per §4.4/§8 invariant 7: only the last
    /// line may differ in length for a record to still be normalized).
    pending_geom: Option<u64>,
    end_offset: u64,
}

impl Building {
    fn new(id: i64, name: String, desc_length: u64, offset: u64) -> Self {
        Building {
            id,
            name,
            desc_length,
            offset,
            seq_length: 0,
            line_length: 0,
            end_length: 0,
            bad_line: 0,
            counts: BaseCounts::default(),
            pending_geom: None,
            end_offset: offset,
        }
    }

    /// Folds in one sequence line; `line_with_term` is the full on-disk
    /// length of the line including its terminator.
    fn push_line(&mut self, line: &[u8], line_with_term: u64) {
        // The previous line is now confirmed non-terminal; check its
        // geometry. The line currently being read might still turn out to
        // be the record's last line, which is exempt (§4.4), so its own
        // check is deferred until (if) a line after it arrives.
        if let Some(prev) = self.pending_geom.take() {
            if prev != self.line_length {
                self.bad_line += 1;
            }
        }
        self.seq_length += line.len() as u64;
        for &b in line {
            self.counts.update(b);
        }
        if self.line_length == 0 {
            self.line_length = line_with_term;
        }
        self.pending_geom = Some(line_with_term);
    }

    fn observe_terminator(&mut self, term_len: u64) {
        if term_len > 0 {
            self.end_length = term_len;
        }
    }

    fn finish(self, end_offset: u64) -> FastaRow {
        // No `.max(1)` fallback here: a record whose only data line lacks a
        // terminator (last line of a file with no trailing newline) never
        // calls `observe_terminator` with a nonzero `term_len`, so
        // `end_length` legitimately stays 0. Forcing it to 1 would make
        // `line_length - end_length` in the engine's normalized-record
        // arithmetic overcount bases per line and read past EOF. Any record
        // with an actual terminator sets `end_length` correctly above.
        FastaRow {
            id: self.id,
            name: self.name,
            offset: self.offset,
            byte_length: end_offset - self.offset,
            seq_length: self.seq_length,
            line_length: self.line_length,
            end_length: self.end_length,
            normalized: self.bad_line == 0,
            desc_length: self.desc_length,
            a: self.counts.a,
            c: self.counts.c,
            g: self.counts.g,
            t: self.counts.t,
            n: self.counts.n,
        }
    }
}

fn parse_name(header_body: &[u8]) -> String {
    let end = header_body
        .iter()
        .position(|&b| b == b' ' || b == b'\t')
        .unwrap_or(header_body.len());
    String::from_utf8_lossy(&header_body[..end]).into_owned()
}

/// Runs the full single-pass build over `reader`, inserting one row per
/// record into `catalog` and committing the build transaction. Returns the
/// record count and total base count for `meta` (§4.3/§8 invariant 4).
pub fn build<R: Read>(reader: R, catalog: &mut Catalog) -> Result<(u64, u64)> {
    let mut scanner = Scanner::new(reader);
    let mut current: Option<Building> = None;
    let mut next_id: i64 = 1;
    let mut total_records: u64 = 0;
    let mut total_length: u64 = 0;

    loop {
        let start_off = scanner.tell();
        let line = match scanner.read_line()? {
            None => break,
            Some(l) => l,
        };
        let end_off = scanner.tell();
        let term_len = (end_off - start_off) - line.len() as u64;

        if line.first() == Some(&b'>') {
            if let Some(building) = current.take() {
                total_length += building.seq_length;
                let row = building.finish(start_off);
                catalog.insert_fasta(&row)?;
                total_records += 1;
            }
            let name = parse_name(&line[1..]);
            let desc_length = (line.len() - 1) as u64;
            current = Some(Building::new(next_id, name, desc_length, end_off));
            next_id += 1;
        } else {
            let building = current
                .as_mut()
                .ok_or_else(|| Error::new(ErrorKind::MalformedFasta))?;
            building.push_line(&line, line.len() as u64 + term_len);
            building.observe_terminator(term_len);
            building.end_offset = end_off;
        }
    }

    if let Some(building) = current.take() {
        let end_offset = building.end_offset;
        total_length += building.seq_length;
        let row = building.finish(end_offset);
        catalog.insert_fasta(&row)?;
        total_records += 1;
    }

    catalog.commit_build(total_records, total_length)?;
    Ok((total_records, total_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Kind};
    use std::io::Cursor;

    fn build_in_memory(data: &[u8]) -> (Catalog, u64, u64) {
        let mut catalog = Catalog::open_rw(":memory:", Kind::Fasta).unwrap();
        catalog.begin_build().unwrap();
        let (n, total) = build(Cursor::new(data), &mut catalog).unwrap();
        (catalog, n, total)
    }

    #[test]
    fn s1_two_records_lf() {
        let (catalog, n, total) = build_in_memory(b">a\nACGT\n>b\nNNN\n");
        assert_eq!(n, 2);
        assert_eq!(total, 7);
        let a = catalog.fasta_by_name("a").unwrap().unwrap();
        assert_eq!(a.seq_length, 4);
        assert!(a.normalized);
        let b = catalog.fasta_by_name("b").unwrap().unwrap();
        assert_eq!(b.seq_length, 3);
    }

    #[test]
    fn s2_multiline_crlf_geometry() {
        let (catalog, _, _) = build_in_memory(b">chr1\r\nACGTACGT\r\nACGT\r\n");
        let row = catalog.fasta_by_name("chr1").unwrap().unwrap();
        assert_eq!(row.line_length, 10);
        assert_eq!(row.end_length, 2);
        assert_eq!(row.seq_length, 12);
        assert!(row.normalized);
    }

    #[test]
    fn s5_irregular_lines_not_normalized() {
        // Two interior lines (not the last) disagree with the established
        // line_length, so bad_line=2 and normalized=(bad_line<=1) is false.
        let (catalog, _, _) = build_in_memory(b">x\nACGT\nAC\nGA\nACGTACGT\n");
        let row = catalog.fasta_by_name("x").unwrap().unwrap();
        assert!(!row.normalized);
    }

    #[test]
    fn single_interior_irregular_line_is_not_normalized() {
        // One non-conforming interior line is still an interior length
        // change, which §8 invariant 7 marks as not normalized even though
        // only a single line disagrees.
        let (catalog, _, _) = build_in_memory(b">x\nACGT\nAC\nACGTACGT\n");
        let row = catalog.fasta_by_name("x").unwrap().unwrap();
        assert!(!row.normalized);
    }

    #[test]
    fn header_with_comment_sets_desc_length() {
        let (catalog, _, _) = build_in_memory(b">r1 some comment\nACGT\n");
        let row = catalog.fasta_by_name("r1").unwrap().unwrap();
        assert_eq!(row.desc_length, "r1 some comment".len() as u64);
    }

    #[test]
    fn single_line_no_trailing_newline_has_zero_end_length() {
        let (catalog, n, total) = build_in_memory(b">s\nACGTACGT");
        assert_eq!(n, 1);
        assert_eq!(total, 8);
        let row = catalog.fasta_by_name("s").unwrap().unwrap();
        assert_eq!(row.seq_length, 8);
        assert_eq!(row.end_length, 0);
        assert!(row.normalized);
    }
}
