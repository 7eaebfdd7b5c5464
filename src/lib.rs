// lib.rs - 库入口

pub mod assembler;
pub mod barcode;
pub mod canonicalizer;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod sorter;

pub use assembler::{open_reader, PairedFastqReader};
pub use barcode::{canonicalize, Barcode, Orientation};
pub use canonicalizer::{Canonicalizer, CanonicalizerConfig, Outcome};
pub use errors::{BarcodeError, MalformedReason};
pub use output::OutputWriter;
pub use pipeline::{run_pipeline, PipelineOptions, PipelineStats};
pub use record::{CanonicalRecord, ReadPairRecord, TrimmedMate};
pub use sorter::LineSorter;
