// canonicalizer.rs - 校验读段对、提取并规范化条形码、裁剪 tag 与 spacer
//
// Each read pair is handled on its own: validate the eight fields, take the
// first `tag_len` bases of each mate as the two barcode halves, join them in
// canonical order, then cut the tag plus the invariant spacer off both
// sequence and quality of each mate.

use crate::barcode::canonicalize;
use crate::errors::{BarcodeError, MalformedReason, Result};
use crate::record::{CanonicalRecord, ReadPairRecord, TrimmedMate};

pub const DEFAULT_TAG_LEN: usize = 12;
pub const DEFAULT_INVARIANT_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalizerConfig {
    /// Length of each barcode half.
    pub tag_len: usize,
    /// Length of the fixed spacer after the barcode.
    pub invariant_len: usize,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        CanonicalizerConfig {
            tag_len: DEFAULT_TAG_LEN,
            invariant_len: DEFAULT_INVARIANT_LEN,
        }
    }
}

impl CanonicalizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tag_len == 0 {
            return Err(BarcodeError::InvalidParameter {
                parameter: "tag-len".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.tag_len.checked_add(self.invariant_len).is_none() {
            return Err(BarcodeError::InvalidParameter {
                parameter: "invariant-len".to_string(),
                reason: format!(
                    "tag length plus spacer length overflows ({} + {})",
                    self.tag_len, self.invariant_len
                ),
            });
        }
        Ok(())
    }

    /// Number of leading bases removed from every sequence and quality string.
    pub fn trim_offset(&self) -> usize {
        self.tag_len + self.invariant_len
    }
}

/// Outcome of processing one read pair, for callers that keep statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Retained(CanonicalRecord),
    TooShort,
}

#[derive(Debug, Clone)]
pub struct Canonicalizer {
    config: CanonicalizerConfig,
}

impl Canonicalizer {
    pub fn new(config: CanonicalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Canonicalizer { config })
    }

    pub fn config(&self) -> &CanonicalizerConfig {
        &self.config
    }

    /// Process one read pair.
    ///
    /// `record_number` is the 1-based position of the pair in the input and is
    /// only used for diagnostics. Returns `Ok(None)` when either sequence is
    /// too short to hold a tag, the spacer and at least one more base.
    pub fn process(
        &self,
        record: &ReadPairRecord,
        record_number: u64,
    ) -> Result<Option<CanonicalRecord>> {
        match self.classify(record, record_number)? {
            Outcome::Retained(canonical) => Ok(Some(canonical)),
            Outcome::TooShort => Ok(None),
        }
    }

    pub fn classify(&self, record: &ReadPairRecord, record_number: u64) -> Result<Outcome> {
        validate(record, record_number)?;

        let offset = self.config.trim_offset();
        if record.seq1.len() <= offset || record.seq2.len() <= offset {
            return Ok(Outcome::TooShort);
        }

        let tag_len = self.config.tag_len;
        let barcode = canonicalize(&record.seq1[..tag_len], &record.seq2[..tag_len]);

        Ok(Outcome::Retained(CanonicalRecord {
            barcode: barcode.sequence,
            orientation: barcode.orientation,
            mate1: trim_mate(&record.name1, &record.seq1, &record.qual1, offset),
            mate2: trim_mate(&record.name2, &record.seq2, &record.qual2, offset),
        }))
    }
}

fn validate(record: &ReadPairRecord, record_number: u64) -> Result<()> {
    if let Some(index) = record.fields().iter().position(|field| field.is_empty()) {
        return Err(BarcodeError::malformed(
            record_number,
            MalformedReason::EmptyField { field: index + 1 },
        ));
    }

    for (mate, name) in [(1, &record.name1), (2, &record.name2)] {
        if !name.starts_with(b"@") {
            return Err(BarcodeError::malformed(
                record_number,
                MalformedReason::MissingNameMarker { mate },
            ));
        }
    }

    for (mate, plus) in [(1, &record.plus1), (2, &record.plus2)] {
        if !plus.starts_with(b"+") {
            return Err(BarcodeError::malformed(
                record_number,
                MalformedReason::MissingPlusMarker { mate },
            ));
        }
    }

    Ok(())
}

// sequence 与 quality 必须使用同一个偏移量裁剪
fn trim_mate(name: &[u8], seq: &[u8], qual: &[u8], offset: usize) -> TrimmedMate {
    TrimmedMate {
        name: name[1..].to_vec(),
        sequence: seq[offset..].to_vec(),
        quality: qual.get(offset..).unwrap_or_default().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CanonicalizerConfig::default();
        assert_eq!(config.tag_len, 12);
        assert_eq!(config.invariant_len, 5);
        assert_eq!(config.trim_offset(), 17);
    }

    #[test]
    fn test_zero_tag_len_is_rejected() {
        let config = CanonicalizerConfig { tag_len: 0, invariant_len: 5 };
        assert!(matches!(
            Canonicalizer::new(config),
            Err(BarcodeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_overflowing_trim_offset_is_rejected() {
        let config = CanonicalizerConfig { tag_len: usize::MAX, invariant_len: 1 };
        match Canonicalizer::new(config) {
            Err(BarcodeError::InvalidParameter { parameter, reason }) => {
                assert_eq!(parameter, "invariant-len");
                assert!(reason.contains("overflows"));
            }
            other => panic!("unexpected result {other:?}"),
        }

        let at_limit = CanonicalizerConfig { tag_len: usize::MAX - 5, invariant_len: 5 };
        assert!(at_limit.validate().is_ok());
        assert_eq!(at_limit.trim_offset(), usize::MAX);
    }

    #[test]
    fn test_zero_invariant_len_is_allowed() {
        let config = CanonicalizerConfig { tag_len: 2, invariant_len: 0 };
        let canonicalizer = Canonicalizer::new(config).unwrap();
        let record = ReadPairRecord::from_mates(
            [b"@a".to_vec(), b"CCG".to_vec(), b"+".to_vec(), b"123".to_vec()],
            [b"@b".to_vec(), b"AAT".to_vec(), b"+".to_vec(), b"456".to_vec()],
        );
        let out = canonicalizer.process(&record, 1).unwrap().unwrap();
        assert_eq!(out.barcode, b"AACC");
        assert_eq!(out.mate1.sequence, b"G");
        assert_eq!(out.mate1.quality, b"3");
        assert_eq!(out.mate2.sequence, b"T");
        assert_eq!(out.mate2.quality, b"6");
    }

    #[test]
    fn test_short_quality_trims_to_empty() {
        let config = CanonicalizerConfig { tag_len: 2, invariant_len: 1 };
        let canonicalizer = Canonicalizer::new(config).unwrap();
        let record = ReadPairRecord::from_mates(
            [b"@a".to_vec(), b"ACGT".to_vec(), b"+".to_vec(), b"I".to_vec()],
            [b"@b".to_vec(), b"ACGT".to_vec(), b"+".to_vec(), b"IIII".to_vec()],
        );
        let out = canonicalizer.process(&record, 1).unwrap().unwrap();
        assert!(out.mate1.quality.is_empty());
        assert_eq!(out.mate2.quality, b"I");
    }
}
