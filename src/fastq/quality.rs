//! Quality-encoding detection (§4.11/§6): classifies the observed
//! min/max quality bytes of a FASTQ file against the canonical platform
//! ranges. Multiple labels may apply; callers get all matches rather than
//! a single guess (§9 open question).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityEncoding {
    Sanger,
    Illumina18,
    Solexa,
    Illumina13,
    Illumina15,
}

/// All platform labels consistent with the observed `[min, max]` quality
/// byte range.
pub fn detect_encodings(min_qs: u8, max_qs: u8) -> Vec<QualityEncoding> {
    let mut out = Vec::new();
    if (33..=73).contains(&min_qs) && (33..=73).contains(&max_qs) {
        out.push(QualityEncoding::Sanger);
    }
    if (33..=74).contains(&min_qs) && (33..=74).contains(&max_qs) {
        out.push(QualityEncoding::Illumina18);
    }
    if (59..=104).contains(&min_qs) && (59..=104).contains(&max_qs) {
        out.push(QualityEncoding::Solexa);
    }
    if (64..=104).contains(&min_qs) && (64..=104).contains(&max_qs) {
        out.push(QualityEncoding::Illumina13);
    }
    if (66..=104).contains(&min_qs) && (66..=104).contains(&max_qs) {
        out.push(QualityEncoding::Illumina15);
    }
    out
}

/// `64` if `max_qs > 74`, `33` if `min_qs < 59`, else undetermined (§6).
pub fn infer_phred(min_qs: u8, max_qs: u8) -> Option<u8> {
    if max_qs > 74 {
        Some(64)
    } else if min_qs < 59 {
        Some(33)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanger_range() {
        // S3: qualities 'I' (0x49 = 73) only -> min=max=73
        let labels = detect_encodings(73, 73);
        assert!(labels.contains(&QualityEncoding::Sanger));
        assert!(labels.contains(&QualityEncoding::Illumina18));
        assert_eq!(infer_phred(73, 73), None);
    }

    #[test]
    fn low_byte_forces_phred_33() {
        // '!' = 33
        assert_eq!(infer_phred(33, 73), Some(33));
    }

    #[test]
    fn high_byte_forces_phred_64() {
        assert_eq!(infer_phred(64, 104), Some(64));
    }
}
