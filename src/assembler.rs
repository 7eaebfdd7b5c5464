// assembler.rs - 将两个 FASTQ 文件按 4 行一组交错为读段对

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::errors::{BarcodeError, Result};
use crate::record::ReadPairRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn is_gzipped(path: &Path) -> std::io::Result<bool> {
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        return Ok(true);
    }
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    Ok(n == 2 && magic == GZIP_MAGIC)
}

/// Open a plain or gzip-compressed file for buffered reading.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let gzipped = is_gzipped(path).map_err(|e| BarcodeError::io(path, e))?;
    let file = File::open(path).map_err(|e| BarcodeError::io(path, e))?;

    if gzipped {
        let decoder = MultiGzDecoder::new(file);
        // 增加缓冲区到2MB
        Ok(Box::new(BufReader::with_capacity(2 << 20, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(2 << 20, file)))
    }
}

struct MateReader {
    source: PathBuf,
    inner: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
}

impl MateReader {
    /// Read one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| BarcodeError::io(&self.source, e))?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }
        Ok(Some(self.buf.clone()))
    }

    /// Read the next 4-line cycle. Lines past the end of input come back
    /// empty; the flag reports whether any line was read at all.
    fn read_cycle(&mut self) -> Result<([Vec<u8>; 4], bool)> {
        let mut cycle: [Vec<u8>; 4] = Default::default();
        let mut any = false;
        for slot in cycle.iter_mut() {
            match self.read_line()? {
                Some(line) => {
                    *slot = line;
                    any = true;
                }
                None => break,
            }
        }
        Ok((cycle, any))
    }
}

/// Walks two FASTQ streams in lockstep, yielding one [`ReadPairRecord`] per
/// read pair.
///
/// No validation happens here. If the files differ in length, the shorter
/// one contributes empty fields, which the canonicalizer rejects.
pub struct PairedFastqReader {
    mate1: MateReader,
    mate2: MateReader,
    records_read: u64,
    finished: bool,
}

impl PairedFastqReader {
    pub fn open(path1: &Path, path2: &Path) -> Result<Self> {
        let r1 = open_reader(path1)?;
        let r2 = open_reader(path2)?;
        Ok(Self::from_readers(path1, r1, path2, r2))
    }

    /// Build from already opened readers. The paths are only used in error messages.
    pub fn from_readers(
        source1: impl Into<PathBuf>,
        reader1: Box<dyn BufRead + Send>,
        source2: impl Into<PathBuf>,
        reader2: Box<dyn BufRead + Send>,
    ) -> Self {
        PairedFastqReader {
            mate1: MateReader { source: source1.into(), inner: reader1, buf: Vec::new() },
            mate2: MateReader { source: source2.into(), inner: reader2, buf: Vec::new() },
            records_read: 0,
            finished: false,
        }
    }

    /// Number of read pairs handed out so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn read_pair(&mut self) -> Result<Option<ReadPairRecord>> {
        if self.finished {
            return Ok(None);
        }
        let (cycle1, any1) = self.mate1.read_cycle()?;
        let (cycle2, any2) = self.mate2.read_cycle()?;
        if !any1 && !any2 {
            self.finished = true;
            return Ok(None);
        }
        self.records_read += 1;
        Ok(Some(ReadPairRecord::from_mates(cycle1, cycle2)))
    }

    /// Read up to `batch_size` pairs. An empty batch means end of input.
    pub fn next_batch(&mut self, batch_size: usize) -> Result<Vec<ReadPairRecord>> {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match self.read_pair()? {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        Ok(batch)
    }
}

impl Iterator for PairedFastqReader {
    type Item = Result<ReadPairRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_pair() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
