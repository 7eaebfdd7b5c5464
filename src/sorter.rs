// sorter.rs - 按整行字典序排序，使相同条形码的记录相邻；超出内存上限时溢写到临时文件

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use tempfile::TempDir;

use crate::record::CanonicalRecord;

/// Default memory limit for buffered lines (512 MB).
pub const DEFAULT_SORT_MEMORY: usize = 512 * 1024 * 1024;

/// Buffer size for reading chunk files during merge.
const MERGE_BUFFER_SIZE: usize = 64 * 1024;

/// Per-line bookkeeping cost on top of the line bytes.
const LINE_OVERHEAD: usize = std::mem::size_of::<Vec<u8>>();

/// Collects serialized output lines and writes them in byte-lexicographic
/// order of the full line. Since the barcode is the first column, records
/// sharing a barcode end up adjacent.
///
/// Lines are buffered until `memory_limit` bytes are in use, then sorted and
/// written to a gzip chunk in a temporary directory. `finish` merges all
/// chunks with the lines still in memory.
#[derive(Debug)]
pub struct LineSorter {
    lines: Vec<Vec<u8>>,
    memory_used: usize,
    memory_limit: usize,
    temp_base: Option<PathBuf>,
    spill_dir: Option<TempDir>,
    chunks: Vec<PathBuf>,
    total: usize,
}

impl Default for LineSorter {
    fn default() -> Self {
        LineSorter {
            lines: Vec::new(),
            memory_used: 0,
            memory_limit: DEFAULT_SORT_MEMORY,
            temp_base: None,
            spill_dir: None,
            chunks: Vec::new(),
            total: 0,
        }
    }
}

impl LineSorter {
    pub fn new() -> Self {
        LineSorter::default()
    }

    /// Bytes of buffered lines allowed before a chunk is written to disk.
    pub fn memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Directory in which the temporary chunk directory is created.
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_base = Some(path);
        self
    }

    pub fn push(&mut self, record: &CanonicalRecord) -> io::Result<()> {
        let line = record.to_line();
        self.memory_used += line.len() + LINE_OVERHEAD;
        self.lines.push(line);
        self.total += 1;
        if self.memory_used >= self.memory_limit {
            self.spill()?;
        }
        Ok(())
    }

    pub fn extend<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a CanonicalRecord>,
    ) -> io::Result<()> {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Number of lines pushed so far, in memory or on disk.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of chunks written to disk so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn create_spill_dir(&self) -> io::Result<TempDir> {
        let dir = match &self.temp_base {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                TempDir::new_in(base)?
            }
            None => TempDir::new()?,
        };
        debug!("Spilling sorted chunks to {}", dir.path().display());
        Ok(dir)
    }

    fn spill(&mut self) -> io::Result<()> {
        if self.lines.is_empty() {
            return Ok(());
        }
        let dir = match self.spill_dir.take() {
            Some(dir) => dir,
            None => self.create_spill_dir()?,
        };
        let path = dir.path().join(format!("chunk_{:05}.tsv.gz", self.chunks.len()));
        self.spill_dir = Some(dir);

        self.lines.sort_unstable();
        // 临时文件使用最快压缩等级
        let mut writer = BufWriter::new(GzEncoder::new(File::create(&path)?, Compression::new(1)));
        for line in &self.lines {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        writer.into_inner().map_err(|e| e.into_error())?.finish()?;

        debug!("Wrote chunk {} with {} lines", self.chunks.len(), self.lines.len());
        self.chunks.push(path);
        self.lines.clear();
        self.memory_used = 0;
        Ok(())
    }

    /// Sort and write every line, newline-terminated. Equal lines keep no
    /// particular relative order.
    pub fn finish<W: Write>(mut self, writer: &mut W) -> io::Result<usize> {
        if self.chunks.is_empty() {
            self.lines.sort_unstable();
            for line in &self.lines {
                writer.write_all(line)?;
                writer.write_all(b"\n")?;
            }
            return Ok(self.total);
        }

        self.spill()?;
        merge_chunks(&self.chunks, writer)?;
        Ok(self.total)
    }
}

struct ChunkReader {
    reader: BufReader<MultiGzDecoder<File>>,
}

impl ChunkReader {
    fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(ChunkReader {
            reader: BufReader::with_capacity(MERGE_BUFFER_SIZE, MultiGzDecoder::new(file)),
        })
    }

    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with(b"\n") {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// K-way merge of sorted chunk files.
fn merge_chunks<W: Write>(chunks: &[PathBuf], writer: &mut W) -> io::Result<()> {
    let mut readers = chunks
        .iter()
        .map(|path| ChunkReader::open(path))
        .collect::<io::Result<Vec<_>>>()?;

    let mut heap: BinaryHeap<Reverse<(Vec<u8>, usize)>> = BinaryHeap::with_capacity(readers.len());
    for (idx, reader) in readers.iter_mut().enumerate() {
        if let Some(line) = reader.next_line()? {
            heap.push(Reverse((line, idx)));
        }
    }

    while let Some(Reverse((line, idx))) = heap.pop() {
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
        if let Some(next) = readers[idx].next_line()? {
            heap.push(Reverse((next, idx)));
        }
    }

    Ok(())
}
