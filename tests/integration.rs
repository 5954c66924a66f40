//! Black-box scenarios S1-S7 (spec.md §8), built against real temp files.

use std::io::Write;

use fastx_index::{ErrorKind, Fastx, Key, OpenOptions, Strand};
use tempfile::tempdir;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents).unwrap();
    path
}

/// S1 - small FASTA, two records, LF endings.
#[test]
fn s1_small_fasta_lf() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "s1.fasta", b">a\nACGT\n>b\nNNN\n");
    let mut fx = Fastx::open(&path).unwrap();

    assert_eq!(fx.count().unwrap(), 2);
    assert_eq!(fx.size().unwrap(), 7);

    let fwd = fx.fetch("a", 1, 4, Strand::Forward).unwrap();
    assert_eq!(fwd, b"ACGT");
    let rev = fx.fetch("a", 1, 4, Strand::Reverse).unwrap();
    assert_eq!(rev, b"ACGT"); // palindrome

    let nn = fx.fetch("b", 2, 3, Strand::Forward).unwrap();
    assert_eq!(nn, b"NN");

    let mut rec = fx.get(Key::Name("a")).unwrap();
    assert_eq!(rec.as_fasta().unwrap().gc_content(), 50.0);
}

/// §7: out-of-range positional access raises `IndexOutOfRange`, not
/// `NotFound` (which is reserved for name lookups).
#[test]
fn get_by_out_of_range_id_is_index_out_of_range() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "s1b.fasta", b">a\nACGT\n>b\nNNN\n");
    let mut fx = Fastx::open(&path).unwrap();

    let err = match fx.get(Key::Id(0)) {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange(0, 2)));

    let err = match fx.get(Key::Id(3)) {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange(3, 2)));

    let err = match fx.get(Key::Name("nope")) {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
}

/// Single-record FASTA with no trailing newline on the last (only) line.
#[test]
fn fetch_single_line_record_without_trailing_newline() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "no_trailing_newline.fasta", b">s\nACGTACGT");
    let mut fx = Fastx::open(&path).unwrap();

    assert_eq!(fx.count().unwrap(), 1);
    let whole = fx.fetch("s", 1, 8, Strand::Forward).unwrap();
    assert_eq!(whole, b"ACGTACGT");
}

/// S2 - multi-line FASTA, CRLF.
#[test]
fn s2_multiline_fasta_crlf() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "s2.fasta", b">chr1\r\nACGTACGT\r\nACGT\r\n");
    let mut fx = Fastx::open(&path).unwrap();

    let slice = fx.fetch("chr1", 5, 10, Strand::Forward).unwrap();
    assert_eq!(slice, b"ACGTAC");
}

/// S3 - FASTQ, two reads.
#[test]
fn s3_fastq_two_reads() {
    let dir = tempdir().unwrap();
    let path = write_file(
        &dir,
        "s3.fastq",
        b"@r1 comment\nACGT\n+\nIIII\n@r2\nNNN\n+\n!!!\n",
    );
    let mut fx = Fastx::open(&path).unwrap();
    assert_eq!(fx.count().unwrap(), 2);

    let mut rec = fx.get(Key::Name("r1")).unwrap();
    let r = rec.as_fastq().unwrap();
    assert_eq!(r.seq().unwrap(), b"ACGT");
    assert_eq!(r.qual().unwrap(), b"IIII");
    assert_eq!(r.quali().unwrap(), vec![40, 40, 40, 40]);
    assert_eq!(r.description().unwrap(), b"r1 comment");
}

/// S4 - gzip round-trip: indexed reads must match plain decompression for
/// many random (offset, length) pairs.
#[test]
fn s4_gzip_round_trip_random_reads() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let dir = tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    // A modestly sized synthetic FASTA (not 100 MiB, to keep CI fast) with
    // enough bulk to exercise multiple gzip access points.
    let mut plain = Vec::new();
    plain.extend_from_slice(b">synthetic\n");
    let bases = b"ACGT";
    let mut body = Vec::new();
    for _ in 0..400_000 {
        body.push(bases[rng.gen_range(0..4)]);
    }
    for chunk in body.chunks(70) {
        plain.extend_from_slice(chunk);
        plain.push(b'\n');
    }

    let gz_path = dir.path().join("s4.fasta.gz");
    {
        let f = std::fs::File::create(&gz_path).unwrap();
        let mut enc = GzEncoder::new(f, Compression::default());
        enc.write_all(&plain).unwrap();
        enc.finish().unwrap();
    }

    let mut fx = Fastx::open_with(
        &gz_path,
        OpenOptions::new().window_size(32 * 1024).spacing(64 * 1024),
    )
    .unwrap();

    let full = fx.fetch("synthetic", 1, body.len() as u64, Strand::Forward).unwrap();
    assert_eq!(full, body);

    for _ in 0..200 {
        let start = rng.gen_range(1..=body.len() as u64);
        let max_len = (body.len() as u64 - start + 1).min(4096);
        let len = rng.gen_range(1..=max_len);
        let end = start + len - 1;
        let got = fx.fetch("synthetic", start, end, Strand::Forward).unwrap();
        let want = &body[(start - 1) as usize..end as usize];
        assert_eq!(got, want, "mismatch at start={start} end={end}");
    }
}

/// S5 - non-normalized FASTA (irregular interior line lengths): substring
/// fetches must agree with the naive, fully-stripped reference.
#[test]
fn s5_non_normalized_fasta() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "s5.fasta", b">x\nACGT\nAC\nGA\nACGTACGT\n");
    let mut fx = Fastx::open(&path).unwrap();

    let whole = fx.fetch("x", 1, 16, Strand::Forward).unwrap();
    assert_eq!(whole, b"ACGTACGAACGTACGT");

    for a in 1..=16u64 {
        for b in a..=16u64 {
            let got = fx.fetch("x", a, b, Strand::Forward).unwrap();
            let want = &whole[(a - 1) as usize..b as usize];
            assert_eq!(got, want, "slice [{a},{b}]");
        }
    }
}

/// S6 - filter & sort on the catalog view.
#[test]
fn s6_filter_and_sort_view() {
    use fastx_index::view::{Condition, Cmp, SortKey};

    let dir = tempdir().unwrap();
    let mut contents = Vec::new();
    let mut lengths = Vec::new();
    for i in 0..200 {
        let len = 100 + (i * 37) % 9900;
        lengths.push(len);
        contents.extend_from_slice(format!(">r{i}\n").as_bytes());
        contents.extend(std::iter::repeat_n(b'A', len as usize));
        contents.push(b'\n');
    }
    let path = write_file(&dir, "s6.fasta", &contents);
    let fx = Fastx::open(&path).unwrap();

    let expected_count = lengths.iter().filter(|&&l| l > 5000).count() as u64;
    let view = fx
        .keys()
        .filter(Condition::Length(Cmp::Gt, 5000))
        .sort(SortKey::Length, true);
    assert_eq!(view.len().unwrap(), expected_count);

    let longest = view.get(0).unwrap().unwrap();
    let max_len = *lengths.iter().filter(|&&l| l > 5000).max().unwrap();
    assert_eq!(longest.seq_length, max_len);
}

/// S7 - normalization detection: a fixed line length (plus a shorter last
/// line) is normalized; an interior length change is not.
#[test]
fn s7_normalization_detection() {
    let dir = tempdir().unwrap();
    let regular = write_file(&dir, "regular.fasta", b">r\nAAAA\nAAAA\nAA\n");
    let irregular = write_file(&dir, "irregular.fasta", b">r\nAAAA\nAA\nAAAAAAAA\n");

    let fx_regular = Fastx::open(&regular).unwrap();
    let row = fx_regular.keys().get(0).unwrap().unwrap();
    assert!(row.normalized);

    let fx_irregular = Fastx::open(&irregular).unwrap();
    let row = fx_irregular.keys().get(0).unwrap().unwrap();
    assert!(!row.normalized);
}

/// §8 invariant 6: exporting and re-importing a gzip index yields
/// byte-identical serialization and identical read behavior.
#[test]
fn gzip_index_export_import_round_trip() {
    use fastx_index::gzindex::GzipIndex;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempdir().unwrap();
    let plain: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let gz_path = dir.path().join("blob.gz");
    {
        let f = std::fs::File::create(&gz_path).unwrap();
        let mut enc = GzEncoder::new(f, Compression::default());
        enc.write_all(&plain).unwrap();
        enc.finish().unwrap();
    }

    let mut file = std::fs::File::open(&gz_path).unwrap();
    let compressed_size = file.metadata().unwrap().len();
    let index = GzipIndex::build(&mut file, compressed_size, 32 * 1024, 64 * 1024).unwrap();

    let mut blob = Vec::new();
    index.write_to(&mut blob).unwrap();
    let reimported = GzipIndex::read_from(&blob[..]).unwrap();

    let mut blob2 = Vec::new();
    reimported.write_to(&mut blob2).unwrap();
    assert_eq!(blob, blob2);

    let mut reimported = reimported;
    let got = reimported.read_at(&mut file, 1000, 500, false).unwrap();
    assert_eq!(&got[..], &plain[1000..1500]);
}

/// §8 invariant 5: a read spanning a concatenated gzip member boundary
/// succeeds, not just one that stays inside a single member.
#[test]
fn gzip_read_at_crosses_concatenated_member_boundary() {
    use fastx_index::gzindex::GzipIndex;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempdir().unwrap();
    let first: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let second: Vec<u8> = (0..50_000u32).map(|i| ((i + 37) % 251) as u8).collect();
    let mut plain = first.clone();
    plain.extend_from_slice(&second);

    let gz_path = dir.path().join("members.gz");
    {
        let mut bytes = Vec::new();
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&first).unwrap();
        bytes.extend(enc.finish().unwrap());
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&second).unwrap();
        bytes.extend(enc.finish().unwrap());
        std::fs::write(&gz_path, &bytes).unwrap();
    }

    let mut file = std::fs::File::open(&gz_path).unwrap();
    let compressed_size = file.metadata().unwrap().len();
    let mut index = GzipIndex::build(&mut file, compressed_size, 32 * 1024, 64 * 1024).unwrap();

    // This range straddles the boundary between the two members.
    let start = first.len() as u64 - 100;
    let got = index.read_at(&mut file, start, 200, false).unwrap();
    assert_eq!(&got[..], &plain[start as usize..start as usize + 200]);
}
