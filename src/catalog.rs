//! Catalog store (C3, §3, §4.3): the persistent per-record metadata table,
//! keyed by ordinal id and by name. Backed by SQLite (`rusqlite`), which is
//! the one embedded relational engine in the Rust ecosystem satisfying
//! §4.3's contract (parameterized queries, one transactional writer, many
//! readers, on-disk persistence) without a hand-rolled file format.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// One row of the `seq` table (§3 "Record (FASTA)").
#[derive(Debug, Clone)]
pub struct FastaRow {
    pub id: i64,
    pub name: String,
    pub offset: u64,
    pub byte_length: u64,
    pub seq_length: u64,
    pub line_length: u64,
    pub end_length: u64,
    pub normalized: bool,
    pub desc_length: u64,
    pub a: u64,
    pub c: u64,
    pub g: u64,
    pub t: u64,
    pub n: u64,
}

/// One row of the `read` table (§3 "Record (FASTQ)").
#[derive(Debug, Clone)]
pub struct FastqRow {
    pub id: i64,
    pub name: String,
    pub desc_length: u64,
    pub read_length: u64,
    pub seq_offset: u64,
    pub qual_offset: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualStats {
    pub min_qs: u8,
    pub max_qs: u8,
    pub phred: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaseStats {
    pub a: u64,
    pub c: u64,
    pub g: u64,
    pub t: u64,
    pub n: u64,
}

/// What kind of sequence file this catalog indexes, determining which
/// record table (`seq` or `read`) is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Fasta,
    Fastq,
}

pub struct Catalog {
    conn: Connection,
    pub kind: Kind,
}

impl Catalog {
    /// Opens (or creates) the catalog file beside the sequence file, with
    /// the `<input>.db` / `<input>.fxi` naming convention of §6.
    pub fn sidecar_path(input: impl AsRef<Path>, kind: Kind) -> std::path::PathBuf {
        let ext = match kind {
            Kind::Fasta => "db",
            Kind::Fastq => "fxi",
        };
        let mut p = input.as_ref().as_os_str().to_owned();
        p.push(".");
        p.push(ext);
        std::path::PathBuf::from(p)
    }

    pub fn exists(input: impl AsRef<Path>, kind: Kind) -> bool {
        Self::sidecar_path(input, kind).exists()
    }

    pub fn open_rw(path: impl AsRef<Path>, kind: Kind) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Catalog { conn, kind })
    }

    pub fn open_ro(path: impl AsRef<Path>, kind: Kind) -> Result<Self> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Catalog { conn, kind })
    }

    /// Creates the schema (§3) and starts the single build transaction,
    /// with synchronous writes disabled, per §4.3.
    pub fn begin_build(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA synchronous = OFF;
             CREATE TABLE IF NOT EXISTS seq (
                 id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 offset INTEGER NOT NULL,
                 blen INTEGER NOT NULL,
                 slen INTEGER NOT NULL,
                 llen INTEGER NOT NULL,
                 elen INTEGER NOT NULL,
                 norm INTEGER NOT NULL,
                 dlen INTEGER NOT NULL,
                 a INTEGER NOT NULL,
                 c INTEGER NOT NULL,
                 g INTEGER NOT NULL,
                 t INTEGER NOT NULL,
                 n INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS read (
                 id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 dlen INTEGER NOT NULL,
                 rlen INTEGER NOT NULL,
                 soff INTEGER NOT NULL,
                 qoff INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS meta (
                 count INTEGER NOT NULL,
                 total_length INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS gzindex (blob BLOB);
             CREATE TABLE IF NOT EXISTS qual (min_qs INTEGER, max_qs INTEGER, phred INTEGER);
             CREATE TABLE IF NOT EXISTS base (a INTEGER, c INTEGER, g INTEGER, t INTEGER, n INTEGER);
             BEGIN TRANSACTION;",
        )?;
        Ok(())
    }

    pub fn insert_fasta(&self, row: &FastaRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO seq (id, name, offset, blen, slen, llen, elen, norm, dlen, a, c, g, t, n)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                row.id,
                row.name,
                row.offset as i64,
                row.byte_length as i64,
                row.seq_length as i64,
                row.line_length as i64,
                row.end_length as i64,
                row.normalized as i64,
                row.desc_length as i64,
                row.a as i64,
                row.c as i64,
                row.g as i64,
                row.t as i64,
                row.n as i64,
            ],
        )?;
        Ok(())
    }

    pub fn insert_fastq(&self, row: &FastqRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO read (id, name, dlen, rlen, soff, qoff) VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                row.id,
                row.name,
                row.desc_length as i64,
                row.read_length as i64,
                row.seq_offset as i64,
                row.qual_offset as i64,
            ],
        )?;
        Ok(())
    }

    /// Commits the build transaction, creates the `name` index, and writes
    /// `meta` (§4.3: "on commit, indexes on `name` are created").
    pub fn commit_build(&mut self, count: u64, total_length: u64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meta (count, total_length) VALUES (?1, ?2)",
            params![count as i64, total_length as i64],
        )?;
        self.conn.execute_batch(
            "COMMIT;
             CREATE INDEX IF NOT EXISTS seq_name_idx ON seq(name);
             CREATE INDEX IF NOT EXISTS read_name_idx ON read(name);",
        )?;
        log::debug!(
            "catalog build committed: {} records, {} total bases",
            count,
            total_length
        );
        Ok(())
    }

    pub fn store_gzindex(&self, blob: &[u8]) -> Result<()> {
        self.conn
            .execute("DELETE FROM gzindex", [])?;
        self.conn
            .execute("INSERT INTO gzindex (blob) VALUES (?1)", params![blob])?;
        Ok(())
    }

    pub fn load_gzindex(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row("SELECT blob FROM gzindex LIMIT 1", [], |r| r.get(0))
            .optional()?)
    }

    pub fn meta_count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT count FROM meta LIMIT 1", [], |r| {
                r.get::<_, i64>(0)
            })
            .optional()?
            .unwrap_or(0) as u64)
    }

    pub fn meta_total_length(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT total_length FROM meta LIMIT 1", [], |r| {
                r.get::<_, i64>(0)
            })
            .optional()?
            .unwrap_or(0) as u64)
    }

    pub fn fasta_by_id(&self, id: i64) -> Result<Option<FastaRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, offset, blen, slen, llen, elen, norm, dlen, a, c, g, t, n
                 FROM seq WHERE id = ?1",
                params![id],
                fasta_row_from,
            )
            .optional()?)
    }

    pub fn fasta_by_name(&self, name: &str) -> Result<Option<FastaRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, offset, blen, slen, llen, elen, norm, dlen, a, c, g, t, n
                 FROM seq WHERE name = ?1",
                params![name],
                fasta_row_from,
            )
            .optional()?)
    }

    pub fn fastq_by_id(&self, id: i64) -> Result<Option<FastqRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, dlen, rlen, soff, qoff FROM read WHERE id = ?1",
                params![id],
                fastq_row_from,
            )
            .optional()?)
    }

    pub fn fastq_by_name(&self, name: &str) -> Result<Option<FastqRow>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, dlen, rlen, soff, qoff FROM read WHERE name = ?1",
                params![name],
                fastq_row_from,
            )
            .optional()?)
    }

    /// Runs a caller-built `SELECT ... FROM seq WHERE <cond> ORDER BY <ord> LIMIT 1 OFFSET n`
    /// for the catalog query view (C8, §4.8). `where_sql`/`order_sql` are
    /// built from a closed, server-side vocabulary in [`crate::view`] — never
    /// from raw user text — condition values are always bound via
    /// `where_params`, so this does not admit SQL injection.
    pub fn fasta_view_row(
        &self,
        where_sql: &str,
        where_params: &[&dyn rusqlite::ToSql],
        order_sql: &str,
        offset: u64,
    ) -> Result<Option<FastaRow>> {
        let sql = format!(
            "SELECT id, name, offset, blen, slen, llen, elen, norm, dlen, a, c, g, t, n
             FROM seq {} {} LIMIT 1 OFFSET ?",
            where_sql, order_sql
        );
        let mut all_params: Vec<&dyn rusqlite::ToSql> = where_params.to_vec();
        let offset = offset as i64;
        all_params.push(&offset);
        Ok(self
            .conn
            .query_row(&sql, all_params.as_slice(), fasta_row_from)
            .optional()?)
    }

    pub fn fasta_view_count(&self, where_sql: &str, where_params: &[&dyn rusqlite::ToSql]) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM seq {}", where_sql);
        Ok(self
            .conn
            .query_row(&sql, where_params, |r| r.get::<_, i64>(0))? as u64)
    }

    /// Aggregate per-base totals across every FASTA record, used for
    /// whole-file `gc_content`/`composition` without a re-scan.
    pub fn fasta_totals(&self) -> Result<BaseStats> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(a),0), COALESCE(SUM(c),0), COALESCE(SUM(g),0),
                    COALESCE(SUM(t),0), COALESCE(SUM(n),0) FROM seq",
            [],
            |r| {
                Ok(BaseStats {
                    a: r.get::<_, i64>(0)? as u64,
                    c: r.get::<_, i64>(1)? as u64,
                    g: r.get::<_, i64>(2)? as u64,
                    t: r.get::<_, i64>(3)? as u64,
                    n: r.get::<_, i64>(4)? as u64,
                })
            },
        )?)
    }

    pub fn store_qual_stats(&self, s: QualStats) -> Result<()> {
        self.conn.execute("DELETE FROM qual", [])?;
        self.conn.execute(
            "INSERT INTO qual (min_qs, max_qs, phred) VALUES (?1, ?2, ?3)",
            params![s.min_qs as i64, s.max_qs as i64, s.phred.map(|p| p as i64)],
        )?;
        Ok(())
    }

    pub fn load_qual_stats(&self) -> Result<Option<QualStats>> {
        Ok(self
            .conn
            .query_row("SELECT min_qs, max_qs, phred FROM qual LIMIT 1", [], |r| {
                Ok(QualStats {
                    min_qs: r.get::<_, i64>(0)? as u8,
                    max_qs: r.get::<_, i64>(1)? as u8,
                    phred: r.get::<_, Option<i64>>(2)?.map(|v| v as u8),
                })
            })
            .optional()?)
    }

    pub fn store_base_stats(&self, s: BaseStats) -> Result<()> {
        self.conn.execute("DELETE FROM base", [])?;
        self.conn.execute(
            "INSERT INTO base (a, c, g, t, n) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.a as i64, s.c as i64, s.g as i64, s.t as i64, s.n as i64],
        )?;
        Ok(())
    }

    pub fn load_base_stats(&self) -> Result<Option<BaseStats>> {
        Ok(self
            .conn
            .query_row("SELECT a, c, g, t, n FROM base LIMIT 1", [], |r| {
                Ok(BaseStats {
                    a: r.get::<_, i64>(0)? as u64,
                    c: r.get::<_, i64>(1)? as u64,
                    g: r.get::<_, i64>(2)? as u64,
                    t: r.get::<_, i64>(3)? as u64,
                    n: r.get::<_, i64>(4)? as u64,
                })
            })
            .optional()?)
    }
}

fn fasta_row_from(r: &rusqlite::Row) -> rusqlite::Result<FastaRow> {
    Ok(FastaRow {
        id: r.get(0)?,
        name: r.get(1)?,
        offset: r.get::<_, i64>(2)? as u64,
        byte_length: r.get::<_, i64>(3)? as u64,
        seq_length: r.get::<_, i64>(4)? as u64,
        line_length: r.get::<_, i64>(5)? as u64,
        end_length: r.get::<_, i64>(6)? as u64,
        normalized: r.get::<_, i64>(7)? != 0,
        desc_length: r.get::<_, i64>(8)? as u64,
        a: r.get::<_, i64>(9)? as u64,
        c: r.get::<_, i64>(10)? as u64,
        g: r.get::<_, i64>(11)? as u64,
        t: r.get::<_, i64>(12)? as u64,
        n: r.get::<_, i64>(13)? as u64,
    })
}

fn fastq_row_from(r: &rusqlite::Row) -> rusqlite::Result<FastqRow> {
    Ok(FastqRow {
        id: r.get(0)?,
        name: r.get(1)?,
        desc_length: r.get::<_, i64>(2)? as u64,
        read_length: r.get::<_, i64>(3)? as u64,
        seq_offset: r.get::<_, i64>(4)? as u64,
        qual_offset: r.get::<_, i64>(5)? as u64,
    })
}
