// errors.rs - 错误类型

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for barcode operations
pub type Result<T> = std::result::Result<T, BarcodeError>;

/// Names of the eight interleaved fields, in input order.
pub const FIELD_NAMES: [&str; 8] = [
    "name1", "name2", "seq1", "seq2", "plus1", "plus2", "qual1", "qual2",
];

/// Why a read pair was rejected as structurally broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A required field is empty. `field` is 1-based in the interleaved order.
    EmptyField { field: usize },
    /// The name line of `mate` (1 or 2) does not start with `@`.
    MissingNameMarker { mate: u8 },
    /// The separator line of `mate` (1 or 2) does not start with `+`.
    MissingPlusMarker { mate: u8 },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::EmptyField { field } => {
                let name = field
                    .checked_sub(1)
                    .and_then(|i| FIELD_NAMES.get(i))
                    .copied()
                    .unwrap_or("?");
                write!(f, "field {field} ({name}) is empty")
            }
            MalformedReason::MissingNameMarker { mate } => {
                write!(f, "name of read {mate} does not start with '@'")
            }
            MalformedReason::MissingPlusMarker { mate } => {
                write!(f, "separator line of read {mate} does not start with '+'")
            }
        }
    }
}

/// Error type for barcode extraction
#[derive(Error, Debug)]
pub enum BarcodeError {
    /// A read pair failed structural validation. Always fatal.
    #[error("Malformed read pair on line {record}: {reason}")]
    MalformedRecord { record: u64, reason: MalformedReason },

    /// Invalid configuration value
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// I/O failure on an input or output file
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BarcodeError {
    pub fn malformed(record: u64, reason: MalformedReason) -> Self {
        BarcodeError::MalformedRecord { record, reason }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BarcodeError::Io { path: path.into(), source }
    }
}
