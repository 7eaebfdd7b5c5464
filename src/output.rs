// output.rs - 输出写入：标准输出、普通文件或 gzip 文件

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errors::{BarcodeError, Result};

const OUTPUT_BUFFER_SIZE: usize = 4 << 20;

/// Buffered output sink. Call [`OutputWriter::finish`] when done: it
/// flushes everything and, for gzip, writes the trailer, reporting any error
/// that dropping the writer would swallow.
pub enum OutputWriter {
    Plain(BufWriter<Box<dyn Write>>),
    Gzip(BufWriter<GzEncoder<Box<dyn Write>>>),
}

impl OutputWriter {
    /// Standard output when `path` is `None`; a `.gz` suffix selects gzip.
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(OutputWriter::plain(Box::new(io::stdout().lock())));
        };
        let file = File::create(path).map_err(|e| BarcodeError::io(path, e))?;

        if path.extension().and_then(|s| s.to_str()) == Some("gz") {
            Ok(OutputWriter::gzip(Box::new(file)))
        } else {
            Ok(OutputWriter::plain(Box::new(file)))
        }
    }

    pub fn plain(inner: Box<dyn Write>) -> Self {
        OutputWriter::Plain(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, inner))
    }

    pub fn gzip(inner: Box<dyn Write>) -> Self {
        // 更低压缩等级：level 1 速度优先
        let encoder = GzEncoder::new(inner, Compression::new(1));
        OutputWriter::Gzip(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, encoder))
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                let mut inner = encoder.finish()?;
                inner.flush()
            }
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(writer) => writer.flush(),
        }
    }
}
