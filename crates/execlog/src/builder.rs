//! Per-spawn record assembly
//!
//! Builds one [`SpawnRecord`] from a completed spawn and its result. Runs
//! entirely on the calling execution thread; digesting and tree expansion
//! are the I/O-bound part of the hot path, so per-entry failures are
//! swallowed with a warning rather than aborting the whole record. The
//! build itself has already recorded its own pass/fail independently.

use crate::digest::{HashFunction, compute_digest};
use crate::record::{EnvVar, FileRecord, Platform, SpawnRecord};
use crate::spawn::{InputKind, InputMetadataProvider, Spawn, SpawnResult, SpawnStatus};
use crate::tree::expand_directory;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Assemble the log record for one executed spawn.
///
/// Inputs and outputs are digested as a side effect. A digesting failure for
/// a single entry omits that entry and keeps the record; non-existent
/// declared outputs appear only in `listed_outputs`.
#[must_use]
pub fn build_record(
    spawn: &Spawn,
    timeout: Duration,
    result: &SpawnResult,
    provider: &dyn InputMetadataProvider,
    platform: Option<Platform>,
    exec_root: &Path,
    hash_function: HashFunction,
) -> SpawnRecord {
    let mut record = SpawnRecord {
        command_args: spawn.arguments.clone(),
        environment_variables: spawn
            .environment
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
        platform,
        ..Default::default()
    };

    {
        let _span = tracing::debug_span!("log_spawn.inputs").entered();
        for input in spawn.inputs.values() {
            match &input.kind {
                InputKind::EmptyPlaceholder => {}
                InputKind::Virtual(_) => {
                    // Never touches the filesystem.
                    match compute_digest(Some(input), &input.exec_path, None, hash_function) {
                        Ok(digest) => record.inputs.push(FileRecord {
                            path: input.exec_path.to_string_lossy().into_owned(),
                            digest: Some(digest),
                            is_tool: spawn.is_tool(input),
                        }),
                        Err(e) => {
                            tracing::warn!(path = %input.exec_path.display(), error = %e, "Error computing spawn inputs");
                        }
                    }
                }
                InputKind::File | InputKind::TreeMember { .. } => {
                    let abs = exec_root.join(&input.exec_path);
                    if abs.is_dir() {
                        let is_tool = spawn.tool_inputs.contains(&input.exec_path);
                        for mut file in
                            expand_directory(&abs, exec_root, Some(provider), hash_function)
                        {
                            file.is_tool = is_tool;
                            record.inputs.push(file);
                        }
                        continue;
                    }
                    match compute_digest(Some(input), &abs, Some(provider), hash_function) {
                        Ok(digest) => record.inputs.push(FileRecord {
                            path: input.exec_path.to_string_lossy().into_owned(),
                            digest: Some(digest),
                            is_tool: spawn.is_tool(input),
                        }),
                        Err(e) => {
                            tracing::warn!(path = %input.exec_path.display(), error = %e, "Error computing spawn inputs");
                        }
                    }
                }
            }
        }
    }

    {
        let _span = tracing::debug_span!("log_spawn.outputs").entered();
        // Declared outputs reflect intent; existence is checked afterwards.
        // Sorted but not deduplicated: a repeated declaration is preserved.
        let mut listed: Vec<String> = spawn
            .listed_outputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        listed.sort();
        record.listed_outputs = listed;
        let declared: BTreeSet<_> = spawn.listed_outputs.iter().collect();
        for output in declared {
            let abs = exec_root.join(output);
            if !abs.exists() {
                continue;
            }
            if abs.is_dir() {
                record
                    .actual_outputs
                    .extend(expand_directory(&abs, exec_root, Some(provider), hash_function));
                continue;
            }
            let path = abs
                .strip_prefix(exec_root)
                .unwrap_or(&abs)
                .to_string_lossy()
                .into_owned();
            match compute_digest(None, &abs, Some(provider), hash_function) {
                Ok(digest) => record.actual_outputs.push(FileRecord {
                    path,
                    digest: Some(digest),
                    is_tool: false,
                }),
                Err(e) => {
                    tracing::warn!(path = %abs.display(), error = %e, "Error computing spawn output properties");
                }
            }
        }
    }

    if result.status != SpawnStatus::Success {
        record.status = result.status.as_str().to_string();
    }
    record.timeout_millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    record.remotable = spawn.remotable;
    record.cacheable = spawn.cacheable;
    record.remote_cacheable = spawn.remote_cacheable;
    record.exit_code = result.exit_code;
    record.cache_hit = result.cache_hit;
    record.runner = result.runner.clone();
    record.digest = result.digest.clone();
    record.mnemonic = spawn.mnemonic.clone();
    record.target_label = spawn.target_label.clone();
    if !result.metrics.is_empty() {
        record.metrics = Some(result.metrics.clone());
    }

    record
}
