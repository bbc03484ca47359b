//! Asynchronous raw-stream writer
//!
//! Spawn completion handlers run on the hot path of the scheduler, so the
//! log must never force slow disk I/O there. Records are serialized on the
//! calling thread and handed to a single background task that owns the
//! output file exclusively; that hand-off is the sole synchronization
//! boundary, so concurrent producers interleave whole frames in arrival
//! order and output never tears.

use crate::frame::encode_frame;
use crate::record::SpawnRecord;
use crate::{Error, Result};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Writes length-delimited records to a file from a dedicated tokio task.
///
/// `write` is non-blocking beyond the channel hand-off; queue growth is
/// bounded in practice because records are far smaller and faster to produce
/// than the spawns they describe. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct AsyncRecordWriter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    task: JoinHandle<Result<()>>,
}

impl AsyncRecordWriter {
    /// Open the output file and start the background writer task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::create(path).map_err(|e| Error::io(e, path, "create"))?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let path = path.to_path_buf();

        let task = tokio::spawn(async move {
            let mut writer = BufWriter::new(tokio::fs::File::from_std(file));
            while let Some(frame) = rx.recv().await {
                writer
                    .write_all(&frame)
                    .await
                    .map_err(|e| Error::io(e, &path, "write"))?;
            }
            writer
                .flush()
                .await
                .map_err(|e| Error::io(e, &path, "flush"))?;
            Ok(())
        });

        Ok(Self { tx, task })
    }

    /// Queue a record for writing.
    ///
    /// Strictly ordered with respect to the calling thread's own submissions;
    /// submissions from different threads interleave in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the record cannot be encoded, or
    /// [`Error::WriterClosed`] if the background task has shut down (e.g.
    /// after an earlier I/O failure, which `close` reports).
    pub fn write(&self, record: &SpawnRecord) -> Result<()> {
        let frame = encode_frame(record)?;
        self.tx.send(frame).map_err(|_| Error::WriterClosed)
    }

    /// Flush all pending writes and release the file.
    ///
    /// Blocks until every queued record is durably written. Single-shot;
    /// callers must quiesce producers first.
    ///
    /// # Errors
    ///
    /// Surfaces any deferred write or flush error from the background task.
    pub async fn close(self) -> Result<()> {
        drop(self.tx);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::writer(e.to_string())),
        }
    }
}
