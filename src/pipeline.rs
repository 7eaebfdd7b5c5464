// pipeline.rs - 读取 -> 多线程规范化 -> 按输入顺序收集 -> 排序/输出

use std::collections::BTreeMap;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;

use crate::assembler::PairedFastqReader;
use crate::canonicalizer::{Canonicalizer, Outcome};
use crate::errors::{BarcodeError, Result as BarcodeResult};
use crate::record::{CanonicalRecord, ReadPairRecord};
use crate::sorter::{LineSorter, DEFAULT_SORT_MEMORY};

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Number of canonicalization worker threads.
    pub threads: usize,
    /// Read pairs per batch handed to a worker.
    pub batch_size: usize,
    /// Sort output by full line so records sharing a barcode are adjacent.
    /// When false, records are written in input order.
    pub sort: bool,
    /// Bytes of output lines held in memory before a sorted chunk is spilled.
    pub sort_memory: usize,
    /// Parent directory for spilled chunks (system temp dir when `None`).
    pub temp_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            sort: true,
            sort_memory: DEFAULT_SORT_MEMORY,
            temp_dir: None,
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> BarcodeResult<()> {
        for (parameter, value) in [
            ("threads", self.threads),
            ("batch-size", self.batch_size),
            ("sort-memory", self.sort_memory),
        ] {
            if value == 0 {
                return Err(BarcodeError::InvalidParameter {
                    parameter: parameter.to_string(),
                    reason: "must be >= 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Most batches that may be dispatched but not yet collected in order.
    pub fn max_in_flight(&self) -> usize {
        self.threads * 2
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub pairs_read: u64,
    pub pairs_retained: u64,
    /// Pairs dropped because a sequence was too short for tag and spacer.
    pub pairs_too_short: u64,
    /// Largest number of finished batches waiting for an earlier one.
    pub peak_pending_batches: usize,
}

struct Batch {
    index: u64,
    /// Record number of the first pair in the batch (1-based).
    first_record: u64,
    records: Vec<ReadPairRecord>,
}

struct ProcessedBatch {
    read: u64,
    too_short: u64,
    records: Vec<CanonicalRecord>,
}

fn process_batch(canonicalizer: &Canonicalizer, batch: Batch) -> BarcodeResult<ProcessedBatch> {
    let mut processed = ProcessedBatch {
        read: batch.records.len() as u64,
        too_short: 0,
        records: Vec::with_capacity(batch.records.len()),
    };

    for (offset, record) in batch.records.iter().enumerate() {
        match canonicalizer.classify(record, batch.first_record + offset as u64)? {
            Outcome::Retained(canonical) => processed.records.push(canonical),
            Outcome::TooShort => processed.too_short += 1,
        }
    }

    Ok(processed)
}

/// Where collected batches go: straight to the writer, or into the sorter.
enum Sink<'a, W: Write> {
    Stream { writer: &'a mut W, buffer: Vec<u8> },
    Sorted { writer: &'a mut W, sorter: LineSorter },
}

impl<W: Write> Sink<'_, W> {
    fn accept(&mut self, records: &[CanonicalRecord]) -> Result<()> {
        match self {
            Sink::Stream { writer, buffer } => {
                buffer.clear();
                for record in records {
                    record.write_tsv(buffer);
                }
                writer.write_all(buffer)?;
            }
            Sink::Sorted { sorter, .. } => sorter.extend(records)?,
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            Sink::Stream { writer, .. } => writer.flush()?,
            Sink::Sorted { writer, sorter } => {
                debug!(
                    "Sorting {} records by barcode ({} chunks on disk)",
                    sorter.len(),
                    sorter.chunk_count()
                );
                sorter.finish(writer)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

/// Run the read pairs through the canonicalizer and write the output.
///
/// Batches are processed in parallel but collected in input order. The
/// reader needs a permit per batch and the collector returns it once that
/// batch is written, so at most `max_in_flight` batches are outstanding.
/// The first batch (in input order) that fails validation ends the run:
/// nothing from it or any later batch is written, and the error is returned.
pub fn run_pipeline<W: Write>(
    mut pairs: PairedFastqReader,
    canonicalizer: &Canonicalizer,
    options: &PipelineOptions,
    writer: &mut W,
) -> Result<PipelineStats> {
    options.validate()?;

    let window = options.max_in_flight();
    let (batch_tx, batch_rx): (Sender<Batch>, Receiver<Batch>) = bounded(window);
    let (result_tx, result_rx): (
        Sender<(u64, Result<ProcessedBatch>)>,
        Receiver<(u64, Result<ProcessedBatch>)>,
    ) = bounded(window);
    let (permit_tx, permit_rx): (Sender<()>, Receiver<()>) = bounded(window);
    for _ in 0..window {
        permit_tx.send(())?;
    }
    let abort = Arc::new(AtomicBool::new(false));

    // Start reader thread
    let batch_size = options.batch_size;
    let reader_abort = Arc::clone(&abort);
    let reader_handle = thread::spawn(move || -> BarcodeResult<()> {
        let mut index = 0u64;
        while permit_rx.recv().is_ok() && !reader_abort.load(Ordering::Relaxed) {
            let first_record = pairs.records_read() + 1;
            let records = pairs.next_batch(batch_size)?;
            if records.is_empty() {
                break;
            }
            let batch = Batch { index, first_record, records };
            if batch_tx.send(batch).is_err() {
                break;
            }
            index += 1;
        }
        Ok(())
    });

    // Start processing threads
    let mut worker_handles = Vec::with_capacity(options.threads);
    for _ in 0..options.threads {
        let rx = batch_rx.clone();
        let tx = result_tx.clone();
        let canonicalizer = canonicalizer.clone();
        let worker_abort = Arc::clone(&abort);
        worker_handles.push(thread::spawn(move || {
            while let Ok(batch) = rx.recv() {
                let index = batch.index;
                // 处理 panic 也作为该批次的错误按顺序上报
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    process_batch(&canonicalizer, batch)
                }))
                .map_err(|_| anyhow!("Canonicalization worker panicked on batch {index}"))
                .and_then(|r| r.map_err(anyhow::Error::from));
                if result.is_err() {
                    worker_abort.store(true, Ordering::Relaxed);
                }
                if tx.send((index, result)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(batch_rx);
    drop(result_tx);

    let mut sink = if options.sort {
        let mut sorter = LineSorter::new().memory_limit(options.sort_memory);
        if let Some(dir) = &options.temp_dir {
            sorter = sorter.temp_dir(dir.clone());
        }
        Sink::Sorted { writer, sorter }
    } else {
        Sink::Stream { writer, buffer: Vec::with_capacity(1 << 20) }
    };
    let mut stats = PipelineStats::default();
    let mut pending: BTreeMap<u64, Result<ProcessedBatch>> = BTreeMap::new();
    let mut next_index = 0u64;
    let mut failure: Option<anyhow::Error> = None;

    'collect: while let Ok((index, result)) = result_rx.recv() {
        pending.insert(index, result);
        stats.peak_pending_batches = stats.peak_pending_batches.max(pending.len());
        while let Some(result) = pending.remove(&next_index) {
            next_index += 1;
            let processed = match result {
                Ok(processed) => processed,
                Err(e) => {
                    failure = Some(e);
                    break 'collect;
                }
            };
            stats.pairs_read += processed.read;
            stats.pairs_too_short += processed.too_short;
            stats.pairs_retained += processed.records.len() as u64;
            if let Err(e) = sink.accept(&processed.records) {
                failure = Some(e);
                break 'collect;
            }
            // 归还许可，读取线程可以继续
            let _ = permit_tx.send(());
            debug!("Processed {} read pairs", stats.pairs_read);
        }
    }

    // 通知读取与处理线程停止
    abort.store(true, Ordering::Relaxed);
    drop(permit_tx);
    drop(result_rx);

    let reader_result = reader_handle
        .join()
        .map_err(|_| anyhow!("FASTQ reader thread panicked"))?;
    for handle in worker_handles {
        handle.join().map_err(|_| anyhow!("Canonicalization worker thread panicked"))?;
    }

    if let Some(e) = failure {
        return Err(e);
    }
    reader_result?;
    if !pending.is_empty() {
        return Err(anyhow!("Pipeline ended with {} uncollected batches", pending.len()));
    }

    sink.finish()?;
    Ok(stats)
}
