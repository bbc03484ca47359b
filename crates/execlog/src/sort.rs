//! Stable sorting of the record stream
//!
//! Execution concurrency makes natural write order non-deterministic, so a
//! sorted log is keyed by each record's canonical identity (its primary
//! output). The sort is stable: records that tie on the key keep their
//! relative write order, which makes repeated runs of the same build
//! byte-identical and diffable.
//!
//! Small logs sort in memory. Beyond a configured record threshold the
//! sorter partitions the stream into sorted runs spilled to scratch files
//! and k-way merges them, breaking key ties by run index so stability holds
//! for arbitrarily large logs.

use crate::frame::{read_frame, write_frame};
use crate::record::SpawnRecord;
use crate::{Error, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Default number of records held in memory before spilling to disk.
pub const DEFAULT_SPILL_THRESHOLD: usize = 100_000;

/// Stable record-stream sorter with an external merge fallback.
#[derive(Debug, Clone)]
pub struct Sorter {
    spill_threshold: usize,
    scratch_dir: PathBuf,
}

impl Sorter {
    /// Create a sorter that spills runs to `scratch_dir` once more than
    /// `spill_threshold` records are buffered.
    #[must_use]
    pub fn new(spill_threshold: usize, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            // A zero threshold would spill one-record runs forever.
            spill_threshold: spill_threshold.max(1),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Read every record from `reader`, sort stably by
    /// [`SpawnRecord::sort_key`], and feed the sorted stream to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates read corruption, scratch-file I/O failures, and sink
    /// errors. Scratch files are unlinked by the OS when dropped.
    pub fn sort(
        &self,
        reader: &mut impl Read,
        mut sink: impl FnMut(&SpawnRecord) -> Result<()>,
    ) -> Result<()> {
        let mut buffer: Vec<SpawnRecord> = Vec::new();
        let mut runs: Vec<BufReader<std::fs::File>> = Vec::new();

        while let Some(record) = read_frame(reader)? {
            buffer.push(record);
            if buffer.len() >= self.spill_threshold {
                runs.push(self.spill_run(&mut buffer)?);
            }
        }

        if runs.is_empty() {
            // Vec::sort_by is stable, so ties keep write order.
            buffer.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
            for record in &buffer {
                sink(record)?;
            }
            return Ok(());
        }

        if !buffer.is_empty() {
            runs.push(self.spill_run(&mut buffer)?);
        }
        merge_runs(runs, sink)
    }

    fn spill_run(&self, buffer: &mut Vec<SpawnRecord>) -> Result<BufReader<std::fs::File>> {
        buffer.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        let file = tempfile::tempfile_in(&self.scratch_dir)
            .map_err(|e| Error::io(e, &self.scratch_dir, "create scratch file"))?;
        let mut writer = BufWriter::new(file);
        for record in buffer.drain(..) {
            write_frame(&mut writer, &record)?;
        }
        writer
            .flush()
            .map_err(|e| Error::io_no_path(e, "flush scratch file"))?;
        let mut file = writer
            .into_inner()
            .map_err(|e| Error::io_no_path(e.into_error(), "flush scratch file"))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io_no_path(e, "rewind scratch file"))?;
        Ok(BufReader::new(file))
    }
}

/// One head-of-run entry in the merge heap. Ordered by key, then run index,
/// so ties between runs resolve to the earlier run and stability holds.
struct HeapEntry {
    key: String,
    run: usize,
    record: SpawnRecord,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.run == other.run
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.run.cmp(&other.run))
    }
}

fn merge_runs(
    mut runs: Vec<BufReader<std::fs::File>>,
    mut sink: impl FnMut(&SpawnRecord) -> Result<()>,
) -> Result<()> {
    let mut heap = BinaryHeap::new();
    for (run, reader) in runs.iter_mut().enumerate() {
        if let Some(record) = read_frame(reader)? {
            heap.push(Reverse(HeapEntry {
                key: record.sort_key().to_string(),
                run,
                record,
            }));
        }
    }
    while let Some(Reverse(entry)) = heap.pop() {
        sink(&entry.record)?;
        if let Some(record) = read_frame(&mut runs[entry.run])? {
            heap.push(Reverse(HeapEntry {
                key: record.sort_key().to_string(),
                run: entry.run,
                record,
            }));
        }
    }
    Ok(())
}
