//! Wire-level record types for the execution log
//!
//! One [`SpawnRecord`] is written per executed spawn. Serialization follows a
//! "default means absent" rule: zero-valued numbers, `false` booleans, empty
//! strings, and empty lists are omitted from the encoded form, so the wire
//! size stays proportional to the information content and absent fields
//! decode back to their defaults.

use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

/// A content digest: hash function name, hex-encoded hash, and blob size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// Name of the hash function, e.g. `SHA-256`
    pub hash_function_name: String,
    /// Hex-encoded hash of the content
    pub hash: String,
    /// Size of the content in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub size_bytes: u64,
}

/// One file referenced by a spawn, as an input or an actual output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the execution root, or absolute if outside it
    pub path: String,
    /// Content digest; absent if digesting failed and the entry was kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    /// Whether this input is part of the spawn's declared tool set.
    /// Only meaningful for inputs.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_tool: bool,
}

/// A single environment variable of a spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

/// A name/value property of the execution platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProperty {
    /// Property name
    pub name: String,
    /// Property value
    pub value: String,
}

/// The execution platform a spawn ran on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Ordered platform properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PlatformProperty>,
}

/// Timing and resource metrics for one spawn.
///
/// Every field is emitted only when non-zero; absence means "zero", not
/// "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnMetrics {
    /// Total time from scheduling to completion, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_time_millis: u64,
    /// Time spent parsing the command, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub parse_time_millis: u64,
    /// Time spent on the network, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub network_time_millis: u64,
    /// Time spent fetching remote outputs, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub fetch_time_millis: u64,
    /// Time spent queued for execution, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub queue_time_millis: u64,
    /// Time spent setting up the sandbox, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub setup_time_millis: u64,
    /// Time spent uploading outputs, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub upload_time_millis: u64,
    /// Wall time of the process itself, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub execution_wall_time_millis: u64,
    /// Time spent processing outputs, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub process_outputs_time_millis: u64,
    /// Time spent on retries, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub retry_time_millis: u64,
    /// Effective execution time limit, in milliseconds
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub time_limit_millis: u64,
    /// Total size of the inputs, in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub input_bytes: u64,
    /// Number of input files
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub input_files: u64,
    /// Estimated peak memory usage, in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub memory_estimate_bytes: u64,
    /// Input size limit, in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub input_bytes_limit: u64,
    /// Input file count limit
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub input_files_limit: u64,
    /// Output size limit, in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub output_bytes_limit: u64,
    /// Output file count limit
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub output_files_limit: u64,
    /// Memory limit, in bytes
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub memory_bytes_limit: u64,
}

impl SpawnMetrics {
    /// Whether every metric is zero (the record omits the bundle entirely).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One structured log entry describing an executed spawn.
///
/// Immutable once built; field order mirrors the on-the-wire layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Command line, order-significant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_args: Vec<String>,
    /// Environment variables, sorted by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvVar>,
    /// Execution platform, if resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Resolved inputs, sorted by path; directories expanded to members
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<FileRecord>,
    /// Declared output paths, sorted, regardless of existence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listed_outputs: Vec<String>,
    /// Whether the spawn may execute remotely
    #[serde(default, skip_serializing_if = "is_false")]
    pub remotable: bool,
    /// Whether the spawn result may be cached
    #[serde(default, skip_serializing_if = "is_false")]
    pub cacheable: bool,
    /// Timeout the spawn ran under, in milliseconds; zero is omitted
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub timeout_millis: u64,
    /// Action mnemonic, e.g. `CppCompile`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mnemonic: String,
    /// Outputs that exist after execution, sorted by path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actual_outputs: Vec<FileRecord>,
    /// Name of the runner that executed the spawn
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runner: String,
    /// Whether the result came from a cache
    #[serde(default, skip_serializing_if = "is_false")]
    pub cache_hit: bool,
    /// Status string; absent on success
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Process exit code; zero is omitted
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub exit_code: i32,
    /// Whether the spawn result may be cached remotely
    #[serde(default, skip_serializing_if = "is_false")]
    pub remote_cacheable: bool,
    /// Label of the target that owns the spawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    /// Digest of the action, if computed by the runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    /// Timing and resource metrics; omitted when all-zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SpawnMetrics>,
}

impl SpawnRecord {
    /// Canonical per-record identity used as the stable sort key: the primary
    /// listed output, falling back to the first actual output path.
    #[must_use]
    pub fn sort_key(&self) -> &str {
        if let Some(first) = self.listed_outputs.first() {
            return first;
        }
        if let Some(first) = self.actual_outputs.first() {
            return &first.path;
        }
        ""
    }
}
