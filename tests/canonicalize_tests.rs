use duplex_barcodes::{
    canonicalize, BarcodeError, Canonicalizer, CanonicalizerConfig, MalformedReason, Orientation,
    ReadPairRecord,
};

fn pair(name1: &str, seq1: &str, qual1: &str, name2: &str, seq2: &str, qual2: &str) -> ReadPairRecord {
    ReadPairRecord::from_mates(
        [name1.into(), seq1.into(), "+".into(), qual1.into()],
        [name2.into(), seq2.into(), "+".into(), qual2.into()],
    )
}

fn default_canonicalizer() -> Canonicalizer {
    Canonicalizer::new(CanonicalizerConfig::default()).unwrap()
}

fn malformed_reason(result: Result<Option<duplex_barcodes::CanonicalRecord>, BarcodeError>) -> (u64, MalformedReason) {
    match result {
        Err(BarcodeError::MalformedRecord { record, reason }) => (record, reason),
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
}

#[test]
fn test_end_to_end_example() {
    let record = pair(
        "@r1", "ACGTACGTACGTGGGGGAAAA", "IIIIIIIIIIIIIIIIIIIII",
        "@r2", "TTTTACGTACGTGGGGGCCCC", "IIIIIIIIIIIIIIIIIIIII",
    );
    let out = default_canonicalizer().process(&record, 1).unwrap().unwrap();
    assert_eq!(out.barcode, b"ACGTACGTACGTTTTTACGTACGT");
    assert_eq!(out.orientation, Orientation::AB);
    assert_eq!(out.mate1.name, b"r1");
    assert_eq!(out.mate1.sequence, b"AAAA");
    assert_eq!(out.mate1.quality, b"IIII");
    assert_eq!(out.mate2.name, b"r2");
    assert_eq!(out.mate2.sequence, b"CCCC");
    assert_eq!(out.mate2.quality, b"IIII");
    assert_eq!(
        out.to_line(),
        b"ACGTACGTACGTTTTTACGTACGT\tab\tr1\tAAAA\tIIII\tr2\tCCCC\tIIII".to_vec()
    );
}

#[test]
fn test_barcode_is_symmetric_under_mate_swap() {
    let tags: [&[u8]; 4] = [b"AAAACCCCGGGG", b"AAAACCCCGGGT", b"TTTTTTTTTTTT", b"CAGTCAGTCAGT"];
    for a in tags {
        for b in tags {
            let forward = canonicalize(a, b);
            let swapped = canonicalize(b, a);
            assert_eq!(forward.sequence, swapped.sequence);
            if a == b {
                assert_eq!(forward.orientation, Orientation::BA);
                assert_eq!(swapped.orientation, Orientation::BA);
            } else {
                assert_ne!(forward.orientation, swapped.orientation);
            }
        }
    }
}

#[test]
fn test_equal_tags_break_tie_as_ba() {
    let barcode = canonicalize(b"GATTACAGATTA", b"GATTACAGATTA");
    assert_eq!(barcode.orientation, Orientation::BA);
    assert_eq!(barcode.sequence, b"GATTACAGATTAGATTACAGATTA");
}

#[test]
fn test_beta_first_when_alpha_sorts_later() {
    let barcode = canonicalize(b"TTTT", b"AAAA");
    assert_eq!(barcode.orientation, Orientation::BA);
    assert_eq!(barcode.sequence, b"AAAATTTT");
}

#[test]
fn test_sequence_and_quality_trimmed_by_same_offset() {
    let config = CanonicalizerConfig { tag_len: 3, invariant_len: 2 };
    let canonicalizer = Canonicalizer::new(config).unwrap();
    let record = pair("@a", "ACGTTGCATG", "0123456789", "@b", "CCCAAGGGGGGG", "abcdefghijkl");
    let out = canonicalizer.process(&record, 1).unwrap().unwrap();

    assert_eq!(out.mate1.sequence.len(), 10 - 5);
    assert_eq!(out.mate1.quality.len(), 10 - 5);
    assert_eq!(out.mate1.sequence, b"GCATG");
    assert_eq!(out.mate1.quality, b"56789");
    assert_eq!(out.mate2.sequence, b"GGGGGGG");
    assert_eq!(out.mate2.quality, b"fghijkl");
}

#[test]
fn test_length_guard_boundary() {
    let canonicalizer = default_canonicalizer();
    let exact = "A".repeat(17);
    let one_more = "A".repeat(18);
    let long = "C".repeat(30);

    let dropped = pair("@a", &exact, &exact, "@b", &long, &long);
    assert_eq!(canonicalizer.process(&dropped, 1).unwrap(), None);

    let dropped_mate2 = pair("@a", &long, &long, "@b", &exact, &exact);
    assert_eq!(canonicalizer.process(&dropped_mate2, 1).unwrap(), None);

    let kept = pair("@a", &one_more, &one_more, "@b", &long, &long);
    let out = canonicalizer.process(&kept, 1).unwrap().unwrap();
    assert_eq!(out.mate1.sequence, b"A");
    assert_eq!(out.mate1.quality, b"A");
}

#[test]
fn test_empty_field_is_malformed() {
    let canonicalizer = default_canonicalizer();
    let mut record = pair("@a", "ACGT", "IIII", "@b", "ACGT", "IIII");
    record.plus2.clear();
    let (line, reason) = malformed_reason(canonicalizer.process(&record, 42));
    assert_eq!(line, 42);
    assert_eq!(reason, MalformedReason::EmptyField { field: 6 });
}

#[test]
fn test_empty_field_checked_before_length_guard() {
    // too short to be retained, but the missing quality is still fatal
    let canonicalizer = default_canonicalizer();
    let record = pair("@a", "AC", "", "@b", "AC", "II");
    let (_, reason) = malformed_reason(canonicalizer.process(&record, 1));
    assert_eq!(reason, MalformedReason::EmptyField { field: 7 });
}

#[test]
fn test_missing_name_marker() {
    let canonicalizer = default_canonicalizer();
    let record = pair("@a", "ACGT", "IIII", "b", "ACGT", "IIII");
    let (_, reason) = malformed_reason(canonicalizer.process(&record, 3));
    assert_eq!(reason, MalformedReason::MissingNameMarker { mate: 2 });
}

#[test]
fn test_missing_plus_marker() {
    let canonicalizer = default_canonicalizer();
    let mut record = pair("@a", "ACGT", "IIII", "@b", "ACGT", "IIII");
    record.plus1 = b"-".to_vec();
    let (_, reason) = malformed_reason(canonicalizer.process(&record, 3));
    assert_eq!(reason, MalformedReason::MissingPlusMarker { mate: 1 });
}

#[test]
fn test_plus_line_may_repeat_name() {
    let canonicalizer = default_canonicalizer();
    let seq = "ACGTACGTACGTGGGGGAAAA";
    let mut record = pair("@r1 1:N:0", seq, seq, "@r2 2:N:0", seq, seq);
    record.plus1 = b"+r1 1:N:0".to_vec();
    let out = canonicalizer.process(&record, 1).unwrap().unwrap();
    assert_eq!(out.mate1.name, b"r1 1:N:0");
    assert_eq!(out.orientation, Orientation::BA);
}
