//! Top-level spawn log context
//!
//! Ties the record builder, the asynchronous raw writer, and the
//! post-processor together behind the two calls the execution engine makes:
//! `log_spawn` per completed spawn and `close` once everything has finished.

use crate::builder::build_record;
use crate::digest::HashFunction;
use crate::postprocess::{Encoding, convert, remove_raw};
use crate::sort::{DEFAULT_SPILL_THRESHOLD, Sorter};
use crate::spawn::{InputMetadataProvider, PlatformResolver, Spawn, SpawnResult};
use crate::writer::AsyncRecordWriter;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Construction-time options for a [`SpawnLog`].
#[derive(Debug, Clone)]
pub struct SpawnLogConfig {
    /// Final log destination
    pub output_path: PathBuf,
    /// Scratch path for the raw stream when conversion is required
    pub temp_path: PathBuf,
    /// Final encoding
    pub encoding: Encoding,
    /// Whether to reorder records deterministically at close
    pub sorted: bool,
    /// Base directory input/output paths are expressed relative to
    pub exec_root: PathBuf,
    /// Hash algorithm for content digests
    pub hash_function: HashFunction,
    /// Records held in memory before the sorter spills to disk
    pub sort_spill_threshold: usize,
}

impl SpawnLogConfig {
    /// Config with the default encoding (unsorted binary) and hash function.
    #[must_use]
    pub fn new(
        output_path: impl Into<PathBuf>,
        temp_path: impl Into<PathBuf>,
        exec_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            temp_path: temp_path.into(),
            encoding: Encoding::default(),
            sorted: false,
            exec_root: exec_root.into(),
            hash_function: HashFunction::default(),
            sort_spill_threshold: DEFAULT_SPILL_THRESHOLD,
        }
    }
}

/// Records executed spawns into a durable log.
///
/// `log_spawn` may be called from any number of concurrent execution
/// threads; record construction runs on the calling thread and the write is
/// handed to a single background task. `close` is single-shot and must only
/// be called after all producers have quiesced.
pub struct SpawnLog {
    config: SpawnLogConfig,
    writer: AsyncRecordWriter,
    /// Set when the raw stream targets the temp path and must be re-encoded
    /// at close. Unsorted binary writes straight to the output path.
    needs_conversion: bool,
    platform_resolver: Option<Box<dyn PlatformResolver>>,
}

impl SpawnLog {
    /// Open the log and start the background writer.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the raw stream file cannot be created.
    pub fn open(config: SpawnLogConfig) -> Result<Self> {
        let needs_conversion = config.encoding != Encoding::Binary || config.sorted;
        let raw_target = if needs_conversion {
            // Write the raw form to the temp path, convert after execution.
            &config.temp_path
        } else {
            // The unsorted binary form is the final output; write directly.
            &config.output_path
        };
        let writer = AsyncRecordWriter::open(raw_target)?;
        Ok(Self {
            config,
            writer,
            needs_conversion,
            platform_resolver: None,
        })
    }

    /// Attach an execution-platform resolver.
    #[must_use]
    pub fn with_platform_resolver(mut self, resolver: Box<dyn PlatformResolver>) -> Self {
        self.platform_resolver = Some(resolver);
        self
    }

    /// Record one executed spawn. Safe to call concurrently.
    ///
    /// Per-entry digesting failures are logged and omitted; this call fails
    /// only when the record cannot be queued for writing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::WriterClosed`] if the background writer has shut
    /// down, or a serialization error for an unencodable record.
    pub fn log_spawn(
        &self,
        spawn: &Spawn,
        provider: &dyn InputMetadataProvider,
        timeout: Duration,
        result: &SpawnResult,
    ) -> Result<()> {
        let platform = self
            .platform_resolver
            .as_ref()
            .and_then(|r| r.resolve(spawn));
        let record = build_record(
            spawn,
            timeout,
            result,
            provider,
            platform,
            &self.config.exec_root,
            self.config.hash_function,
        );
        let _span = tracing::debug_span!("log_spawn.write").entered();
        self.writer.write(&record)
    }

    /// Finish writing the log and perform any required post-processing.
    ///
    /// Flushes the raw stream, then, when conversion is required, re-encodes
    /// it into the final destination and deletes the temp file best-effort.
    ///
    /// # Errors
    ///
    /// Surfaces deferred raw-stream write failures and any finalize I/O or
    /// corruption error. Temp-file deletion failures are swallowed.
    pub async fn close(self) -> Result<()> {
        self.writer.close().await?;

        if !self.needs_conversion {
            return Ok(());
        }

        let scratch_dir = self
            .config
            .temp_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let sorter = Sorter::new(self.config.sort_spill_threshold, scratch_dir);
        let converted = convert(
            &self.config.temp_path,
            &self.config.output_path,
            self.config.encoding,
            self.config.sorted,
            &sorter,
        );
        remove_raw(&self.config.temp_path);
        converted
    }
}

impl std::fmt::Debug for SpawnLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnLog")
            .field("config", &self.config)
            .field("needs_conversion", &self.needs_conversion)
            .finish_non_exhaustive()
    }
}
