//! Execution-log recording for build engines
//!
//! Durably records one structured entry per executed spawn: its command,
//! environment, content-addressed inputs and outputs, platform, exit status,
//! and timing metrics. The log is consumed by external tooling for build
//! auditing, reproducibility comparison, and remote-cache debugging.
//!
//! # Overview
//!
//! For each completed spawn the engine calls [`SpawnLog::log_spawn`]. The
//! record is assembled on the calling thread (digesting inputs via cached
//! metadata where possible, expanding directories into canonically ordered
//! file lists) and handed to a single background writer task, so the
//! execution hot path never blocks on disk I/O. After execution finishes,
//! [`SpawnLog::close`] flushes the raw stream and, when requested,
//! re-encodes it into newline-delimited JSON and/or deterministically
//! reorders it with a stable, externally spillable sort.
//!
//! # Example
//!
//! ```no_run
//! use execlog::{NoMetadata, Spawn, SpawnLog, SpawnLogConfig, SpawnResult};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> execlog::Result<()> {
//! let config = SpawnLogConfig::new("exec.log", "exec.log.tmp", "/work");
//! let log = SpawnLog::open(config)?;
//! log.log_spawn(
//!     &Spawn::default(),
//!     &NoMetadata,
//!     Duration::ZERO,
//!     &SpawnResult::default(),
//! )?;
//! log.close().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod digest;
mod error;
pub mod frame;
mod log;
mod postprocess;
mod record;
mod sort;
mod spawn;
mod tree;
mod writer;

pub use builder::build_record;
pub use digest::{HashFunction, compute_digest};
pub use error::{Error, Result};
pub use log::{SpawnLog, SpawnLogConfig};
pub use postprocess::{Encoding, convert};
pub use record::{
    Digest, EnvVar, FileRecord, Platform, PlatformProperty, SpawnMetrics, SpawnRecord,
};
pub use sort::{DEFAULT_SPILL_THRESHOLD, Sorter};
pub use spawn::{
    InputKind, InputMetadata, InputMetadataProvider, NoMetadata, PlatformResolver, Spawn,
    SpawnInput, SpawnResult, SpawnStatus,
};
pub use tree::expand_directory;
pub use writer::AsyncRecordWriter;
