// record.rs - 读段对记录与输出记录

use crate::barcode::Orientation;

/// One read pair as produced by the assembler: the four FASTQ lines of each
/// mate, interleaved as `name1, name2, seq1, seq2, plus1, plus2, qual1, qual2`.
///
/// Fields hold the raw lines without their terminators. Nothing is validated
/// here; a truncated input shows up as empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPairRecord {
    pub name1: Vec<u8>,
    pub name2: Vec<u8>,
    pub seq1: Vec<u8>,
    pub seq2: Vec<u8>,
    pub plus1: Vec<u8>,
    pub plus2: Vec<u8>,
    pub qual1: Vec<u8>,
    pub qual2: Vec<u8>,
}

impl ReadPairRecord {
    /// Build a record from the two mates' 4-line cycles.
    pub fn from_mates(mate1: [Vec<u8>; 4], mate2: [Vec<u8>; 4]) -> Self {
        let [name1, seq1, plus1, qual1] = mate1;
        let [name2, seq2, plus2, qual2] = mate2;
        ReadPairRecord {
            name1,
            name2,
            seq1,
            seq2,
            plus1,
            plus2,
            qual1,
            qual2,
        }
    }

    /// The eight fields in interleaved order.
    pub fn fields(&self) -> [&[u8]; 8] {
        [
            &self.name1,
            &self.name2,
            &self.seq1,
            &self.seq2,
            &self.plus1,
            &self.plus2,
            &self.qual1,
            &self.qual2,
        ]
    }
}

/// One mate after the barcode and spacer have been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedMate {
    /// Read name without the leading `@`.
    pub name: Vec<u8>,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

/// Output of the canonicalizer for one retained read pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub barcode: Vec<u8>,
    pub orientation: Orientation,
    pub mate1: TrimmedMate,
    pub mate2: TrimmedMate,
}

impl CanonicalRecord {
    /// 直接写入到buffer：一行，制表符分隔，以换行结尾
    pub fn write_tsv(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.barcode);
        buffer.push(b'\t');
        buffer.extend_from_slice(self.orientation.as_str().as_bytes());
        for mate in [&self.mate1, &self.mate2] {
            buffer.push(b'\t');
            buffer.extend_from_slice(&mate.name);
            buffer.push(b'\t');
            buffer.extend_from_slice(&mate.sequence);
            buffer.push(b'\t');
            buffer.extend_from_slice(&mate.quality);
        }
        buffer.push(b'\n');
    }

    /// The serialized line without its trailing newline.
    pub fn to_line(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.write_tsv(&mut buffer);
        buffer.pop();
        buffer
    }
}
