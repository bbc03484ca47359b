//! End-to-end tests for the spawn log pipeline: build records from real
//! files, stream them through the async writer, and finalize into each
//! encoding and ordering mode.

use execlog::{
    Encoding, NoMetadata, Platform, PlatformProperty, PlatformResolver, Spawn, SpawnInput,
    SpawnLog, SpawnLogConfig, SpawnRecord, SpawnResult, SpawnStatus, frame,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn read_binary_log(path: &Path) -> Vec<SpawnRecord> {
    let mut reader = BufReader::new(fs::File::open(path).unwrap());
    let mut records = Vec::new();
    while let Some(record) = frame::read_frame(&mut reader).unwrap() {
        records.push(record);
    }
    records
}

/// A spawn compiling one source file into one output.
fn compile_spawn(root: &Path, name: &str) -> Spawn {
    let src = format!("src/{name}.c");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join(&src), format!("int {name};")).unwrap();
    Spawn {
        arguments: vec!["cc".into(), "-c".into(), src.clone()],
        environment: BTreeMap::from([("PATH".to_string(), "/usr/bin".to_string())]),
        inputs: BTreeMap::from([(PathBuf::from(&src), SpawnInput::file(&src))]),
        listed_outputs: vec![PathBuf::from(format!("obj/{name}.o"))],
        mnemonic: "CppCompile".into(),
        remotable: true,
        cacheable: true,
        ..Default::default()
    }
}

fn success() -> SpawnResult {
    SpawnResult {
        runner: "local".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn unsorted_binary_fast_path_emits_raw_frames_verbatim() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");
    let temp = root.join("exec.log.tmp");

    let log = SpawnLog::open(SpawnLogConfig::new(&output, &temp, root)).unwrap();
    log.log_spawn(&compile_spawn(root, "a"), &NoMetadata, Duration::ZERO, &success())
        .unwrap();
    log.log_spawn(&compile_spawn(root, "b"), &NoMetadata, Duration::ZERO, &success())
        .unwrap();
    log.close().await.unwrap();

    // No conversion ran: the temp path was never used and the output bytes
    // are exactly the concatenated raw frames, in write order.
    assert!(!temp.exists());
    let records = read_binary_log(&output);
    assert_eq!(records.len(), 2);
    let mut expected = Vec::new();
    for record in &records {
        expected.extend_from_slice(&frame::encode_frame(record).unwrap());
    }
    assert_eq!(fs::read(&output).unwrap(), expected);
}

#[tokio::test]
async fn records_capture_inputs_outputs_and_result() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");

    let mut spawn = compile_spawn(root, "main");
    spawn.tool_inputs = BTreeSet::from([PathBuf::from("src/main.c")]);
    fs::create_dir_all(root.join("obj")).unwrap();
    fs::write(root.join("obj/main.o"), b"object code").unwrap();

    let result = SpawnResult {
        status: SpawnStatus::NonZeroExit,
        exit_code: 1,
        runner: "linux-sandbox".into(),
        ..Default::default()
    };

    let log = SpawnLog::open(SpawnLogConfig::new(&output, root.join("t"), root)).unwrap();
    log.log_spawn(&spawn, &NoMetadata, Duration::from_secs(30), &result)
        .unwrap();
    log.close().await.unwrap();

    let records = read_binary_log(&output);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.command_args, vec!["cc", "-c", "src/main.c"]);
    assert_eq!(record.inputs.len(), 1);
    assert!(record.inputs[0].is_tool);
    assert!(record.inputs[0].digest.is_some());
    assert_eq!(record.listed_outputs, vec!["obj/main.o"]);
    assert_eq!(record.actual_outputs.len(), 1);
    assert_eq!(record.actual_outputs[0].path, "obj/main.o");
    assert_eq!(record.status, "NON_ZERO_EXIT");
    assert_eq!(record.exit_code, 1);
    assert_eq!(record.timeout_millis, 30_000);
    assert_eq!(record.runner, "linux-sandbox");
}

#[tokio::test]
async fn sorted_finalize_is_deterministic_across_write_orders() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let spawns: Vec<Spawn> = ["delta", "alpha", "echo", "bravo"]
        .iter()
        .map(|name| compile_spawn(root, name))
        .collect();

    let mut outputs = Vec::new();
    for (run, order) in [[0usize, 1, 2, 3], [3, 2, 1, 0]].iter().enumerate() {
        let output = root.join(format!("run{run}.log"));
        let mut config =
            SpawnLogConfig::new(&output, root.join(format!("run{run}.tmp")), root);
        config.sorted = true;
        let log = SpawnLog::open(config).unwrap();
        for &i in order {
            log.log_spawn(&spawns[i], &NoMetadata, Duration::ZERO, &success())
                .unwrap();
        }
        log.close().await.unwrap();
        outputs.push(fs::read(&output).unwrap());
    }

    // Byte-identical despite opposite write orders.
    assert_eq!(outputs[0], outputs[1]);
    let keys: Vec<String> = read_binary_log(&root.join("run0.log"))
        .iter()
        .map(|r| r.sort_key().to_string())
        .collect();
    assert_eq!(
        keys,
        vec!["obj/alpha.o", "obj/bravo.o", "obj/delta.o", "obj/echo.o"]
    );
}

#[tokio::test]
async fn tied_sort_keys_preserve_write_order() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");

    let mut config = SpawnLogConfig::new(&output, root.join("exec.tmp"), root);
    config.sorted = true;
    let log = SpawnLog::open(config).unwrap();

    // Retried attempts with the identical single output.
    for attempt in 1..=3 {
        let mut spawn = compile_spawn(root, "retry");
        spawn.mnemonic = format!("Attempt{attempt}");
        log.log_spawn(&spawn, &NoMetadata, Duration::ZERO, &success())
            .unwrap();
    }
    log.close().await.unwrap();

    let mnemonics: Vec<String> = read_binary_log(&output)
        .into_iter()
        .map(|r| r.mnemonic)
        .collect();
    assert_eq!(mnemonics, vec!["Attempt1", "Attempt2", "Attempt3"]);
}

#[tokio::test]
async fn json_encoding_is_line_oriented_and_sorted() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.json");

    let mut config = SpawnLogConfig::new(&output, root.join("exec.tmp"), root);
    config.encoding = Encoding::Json;
    config.sorted = true;
    let log = SpawnLog::open(config).unwrap();
    for name in ["zz", "aa"] {
        log.log_spawn(&compile_spawn(root, name), &NoMetadata, Duration::ZERO, &success())
            .unwrap();
    }
    log.close().await.unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let records: Vec<SpawnRecord> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sort_key(), "obj/aa.o");
    assert_eq!(records[1].sort_key(), "obj/zz.o");
    assert!(!root.join("exec.tmp").exists());
}

#[tokio::test]
async fn concurrent_producers_log_without_loss() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");

    let log = Arc::new(SpawnLog::open(SpawnLogConfig::new(&output, root.join("t"), root)).unwrap());
    let spawns: Vec<Spawn> = (0..8)
        .map(|n| compile_spawn(root, &format!("unit{n}")))
        .collect();

    let mut handles = Vec::new();
    for spawn in spawns {
        let log = Arc::clone(&log);
        handles.push(std::thread::spawn(move || {
            log.log_spawn(&spawn, &NoMetadata, Duration::ZERO, &success())
                .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let log = Arc::into_inner(log).unwrap();
    log.close().await.unwrap();

    assert_eq!(read_binary_log(&output).len(), 8);
}

#[tokio::test]
async fn platform_resolver_is_recorded() {
    struct FixedPlatform;
    impl PlatformResolver for FixedPlatform {
        fn resolve(&self, _spawn: &Spawn) -> Option<Platform> {
            Some(Platform {
                properties: vec![PlatformProperty {
                    name: "OSFamily".into(),
                    value: "Linux".into(),
                }],
            })
        }
    }

    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");
    let log = SpawnLog::open(SpawnLogConfig::new(&output, root.join("t"), root))
        .unwrap()
        .with_platform_resolver(Box::new(FixedPlatform));
    log.log_spawn(&compile_spawn(root, "p"), &NoMetadata, Duration::ZERO, &success())
        .unwrap();
    log.close().await.unwrap();

    let records = read_binary_log(&output);
    let platform = records[0].platform.as_ref().unwrap();
    assert_eq!(platform.properties[0].name, "OSFamily");
    assert_eq!(platform.properties[0].value, "Linux");
}

#[tokio::test]
async fn external_sort_survives_a_tiny_spill_threshold() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let output = root.join("exec.log");

    let mut config = SpawnLogConfig::new(&output, root.join("exec.tmp"), root);
    config.sorted = true;
    config.sort_spill_threshold = 2;
    let log = SpawnLog::open(config).unwrap();
    for name in ["gamma", "alpha", "beta", "zeta", "delta"] {
        log.log_spawn(&compile_spawn(root, name), &NoMetadata, Duration::ZERO, &success())
            .unwrap();
    }
    log.close().await.unwrap();

    let keys: Vec<String> = read_binary_log(&output)
        .iter()
        .map(|r| r.sort_key().to_string())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 5);
}
