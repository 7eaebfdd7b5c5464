// barcode.rs - 双链条形码的规范化

use std::fmt;

/// Which read contributed the lexicographically earlier tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// The tag from read 1 (alpha) sorts strictly before the tag from read 2 (beta).
    AB,
    /// Beta sorts before alpha, or the two tags are equal.
    BA,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::AB => "ab",
            Orientation::BA => "ba",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A duplex barcode: both tags joined in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    pub sequence: Vec<u8>,
    pub orientation: Orientation,
}

/// 将两个 tag 组合为与读段方向无关的条形码
///
/// Tags are compared byte by byte. When `alpha < beta` the barcode is
/// `alpha + beta` with orientation `ab`; otherwise (equal tags included)
/// it is `beta + alpha` with orientation `ba`.
pub fn canonicalize(alpha: &[u8], beta: &[u8]) -> Barcode {
    let (first, second, orientation) = if alpha < beta {
        (alpha, beta, Orientation::AB)
    } else {
        (beta, alpha, Orientation::BA)
    };

    let mut sequence = Vec::with_capacity(first.len() + second.len());
    sequence.extend_from_slice(first);
    sequence.extend_from_slice(second);

    Barcode { sequence, orientation }
}
