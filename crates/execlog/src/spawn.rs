//! Engine-facing spawn descriptor and result types
//!
//! These are the narrow interfaces through which the execution engine hands
//! completed spawns to the log. The engine owns scheduling and execution;
//! this crate only observes.

use crate::Result;
use crate::record::{Digest, Platform, SpawnMetrics};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// How the content of a spawn input is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// A regular file on disk under the execution root
    File,
    /// An input whose content lives in memory and has no on-disk form
    Virtual(Vec<u8>),
    /// A placeholder input with no meaningful content; skipped when logging
    EmptyPlaceholder,
    /// A file that belongs to an expanded directory artifact
    TreeMember {
        /// Exec path of the owning directory artifact
        parent: PathBuf,
    },
}

/// One declared input of a spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnInput {
    /// Path relative to the execution root
    pub exec_path: PathBuf,
    /// How the input's content is materialized
    pub kind: InputKind,
}

impl SpawnInput {
    /// A regular file input.
    #[must_use]
    pub fn file(exec_path: impl Into<PathBuf>) -> Self {
        Self {
            exec_path: exec_path.into(),
            kind: InputKind::File,
        }
    }

    /// An in-memory input with the given content.
    #[must_use]
    pub fn virtual_input(exec_path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            exec_path: exec_path.into(),
            kind: InputKind::Virtual(content.into()),
        }
    }
}

/// A sandboxed process invocation with declared inputs and outputs.
#[derive(Debug, Clone, Default)]
pub struct Spawn {
    /// Command line, order-significant
    pub arguments: Vec<String>,
    /// Environment mapping; serialized sorted by name
    pub environment: BTreeMap<String, String>,
    /// Inputs keyed by exec path, pre-sorted by construction
    pub inputs: BTreeMap<PathBuf, SpawnInput>,
    /// Exec paths of inputs that are build-tool dependencies
    pub tool_inputs: BTreeSet<PathBuf>,
    /// Declared output paths, whether or not they are produced
    pub listed_outputs: Vec<PathBuf>,
    /// Action mnemonic
    pub mnemonic: String,
    /// Label of the owning target, if known
    pub target_label: Option<String>,
    /// Whether the spawn may execute remotely
    pub remotable: bool,
    /// Whether the spawn result may be cached
    pub cacheable: bool,
    /// Whether the spawn result may be cached remotely
    pub remote_cacheable: bool,
}

impl Spawn {
    /// Whether the input, or its owning directory artifact, is in the
    /// declared tool set.
    #[must_use]
    pub fn is_tool(&self, input: &SpawnInput) -> bool {
        if self.tool_inputs.contains(&input.exec_path) {
            return true;
        }
        if let InputKind::TreeMember { parent } = &input.kind {
            return self.tool_inputs.contains(parent);
        }
        false
    }
}

/// Terminal status of a spawn execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpawnStatus {
    /// The spawn ran and exited successfully
    #[default]
    Success,
    /// The spawn ran and exited with a non-zero code
    NonZeroExit,
    /// The spawn exceeded its timeout
    Timeout,
    /// The spawn was killed for exceeding its memory limit
    OutOfMemory,
    /// The spawn could not be executed at all
    ExecutionFailed,
    /// The build was interrupted while the spawn was running
    Interrupted,
}

impl SpawnStatus {
    /// Wire string form of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::NonZeroExit => "NON_ZERO_EXIT",
            Self::Timeout => "TIMEOUT",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::ExecutionFailed => "EXECUTION_FAILED",
            Self::Interrupted => "INTERRUPTED",
        }
    }
}

impl std::fmt::Display for SpawnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one spawn execution, supplied by the engine.
#[derive(Debug, Clone, Default)]
pub struct SpawnResult {
    /// Terminal status
    pub status: SpawnStatus,
    /// Process exit code
    pub exit_code: i32,
    /// Whether the result came from a cache
    pub cache_hit: bool,
    /// Name of the runner that executed the spawn
    pub runner: String,
    /// Digest of the action, if the runner computed one
    pub digest: Option<Digest>,
    /// Timing and resource metrics
    pub metrics: SpawnMetrics,
}

/// Cached file metadata as recorded by earlier pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMetadata {
    /// Raw digest bytes of the file content
    pub digest: Vec<u8>,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Side-effect-free source of cached file digests.
///
/// Lookup failures are treated as cache misses by callers; a cold cache is
/// expected, not an error.
pub trait InputMetadataProvider: Send + Sync {
    /// Look up cached metadata for the file at the given exec path.
    ///
    /// # Errors
    ///
    /// May fail for untracked paths; callers fall back to hashing.
    fn lookup(&self, exec_path: &Path) -> Result<Option<InputMetadata>>;
}

/// A provider with no cached metadata; every lookup is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl InputMetadataProvider for NoMetadata {
    fn lookup(&self, _exec_path: &Path) -> Result<Option<InputMetadata>> {
        Ok(None)
    }
}

/// Resolves the execution platform for a spawn, if any.
pub trait PlatformResolver: Send + Sync {
    /// Platform properties for the given spawn, or `None` when unknown.
    fn resolve(&self, spawn: &Spawn) -> Option<Platform>;
}
