//! Raw-stream post-processing
//!
//! After execution completes the raw length-delimited stream is consumed
//! once and re-emitted in the requested encoding, optionally sorted. When
//! the requested form already equals the raw form no conversion runs at all
//! and the raw file is the final output.

use crate::frame::{read_frame, write_frame};
use crate::record::SpawnRecord;
use crate::sort::Sorter;
use crate::{Error, Result};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Final log encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Length-delimited binary frames; machine-efficient and streamable
    #[default]
    Binary,
    /// Newline-delimited JSON; one self-describing record per line
    Json,
}

/// Re-encode the raw stream at `raw_path` into `output_path`.
///
/// # Errors
///
/// Reading the raw stream (including corruption), sorting, and writing the
/// target are all fatal. The caller deletes the raw file afterwards
/// regardless of the outcome.
pub fn convert(
    raw_path: &Path,
    output_path: &Path,
    encoding: Encoding,
    sorted: bool,
    sorter: &Sorter,
) -> Result<()> {
    let raw = std::fs::File::open(raw_path).map_err(|e| Error::io(e, raw_path, "open"))?;
    let mut reader = BufReader::new(raw);
    let out =
        std::fs::File::create(output_path).map_err(|e| Error::io(e, output_path, "create"))?;
    let mut writer = BufWriter::new(out);

    {
        let mut emit = |record: &SpawnRecord| -> Result<()> {
            match encoding {
                Encoding::Binary => write_frame(&mut writer, record),
                Encoding::Json => {
                    // Compact JSON escapes embedded newlines, so a record
                    // can never span lines.
                    serde_json::to_writer(&mut writer, record)
                        .map_err(|e| Error::serialization(e.to_string()))?;
                    writer
                        .write_all(b"\n")
                        .map_err(|e| Error::io(e, output_path, "write"))
                }
            }
        };
        if sorted {
            sorter.sort(&mut reader, &mut emit)?;
        } else {
            while let Some(record) = read_frame(&mut reader)? {
                emit(&record)?;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| Error::io(e, output_path, "flush"))
}

/// Delete the raw temporary stream, best-effort.
///
/// The failed finalize is the reportable error, not the cleanup, so deletion
/// failures are logged and swallowed.
pub(crate) fn remove_raw(raw_path: &Path) {
    if let Err(e) = std::fs::remove_file(raw_path) {
        tracing::warn!(path = %raw_path.display(), error = %e, "Failed to delete temporary execution log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::DEFAULT_SPILL_THRESHOLD;
    use tempfile::TempDir;

    fn record(key: &str, mnemonic: &str) -> SpawnRecord {
        SpawnRecord {
            listed_outputs: vec![key.to_string()],
            mnemonic: mnemonic.to_string(),
            ..Default::default()
        }
    }

    fn write_raw(path: &Path, records: &[SpawnRecord]) {
        let mut buf = Vec::new();
        for r in records {
            write_frame(&mut buf, r).unwrap();
        }
        std::fs::write(path, buf).unwrap();
    }

    fn sorter(tmp: &TempDir) -> Sorter {
        Sorter::new(DEFAULT_SPILL_THRESHOLD, tmp.path())
    }

    #[test]
    fn binary_conversion_preserves_write_order_when_unsorted() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out");
        write_raw(&raw, &[record("b", "B"), record("a", "A")]);

        convert(&raw, &out, Encoding::Binary, false, &sorter(&tmp)).unwrap();

        let mut reader = BufReader::new(std::fs::File::open(&out).unwrap());
        assert_eq!(read_frame(&mut reader).unwrap().unwrap().mnemonic, "B");
        assert_eq!(read_frame(&mut reader).unwrap().unwrap().mnemonic, "A");
        assert!(read_frame(&mut reader).unwrap().is_none());
    }

    #[test]
    fn json_conversion_emits_one_record_per_line() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out.json");
        write_raw(&raw, &[record("a", "A"), record("b", "B")]);

        convert(&raw, &out, Encoding::Json, false, &sorter(&tmp)).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let decoded: SpawnRecord = serde_json::from_str(line).unwrap();
            assert!(!decoded.mnemonic.is_empty());
        }
    }

    #[test]
    fn json_record_with_embedded_newlines_stays_on_one_line() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out.json");
        let mut multiline = record("a", "A");
        multiline.command_args = vec!["echo".to_string(), "line1\nline2".to_string()];
        write_raw(&raw, &[multiline, record("b", "B")]);

        convert(&raw, &out, Encoding::Json, false, &sorter(&tmp)).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let decoded: SpawnRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded.command_args, vec!["echo", "line1\nline2"]);
    }

    #[test]
    fn sorted_conversion_orders_by_primary_output() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out");
        write_raw(&raw, &[record("c", "C"), record("a", "A"), record("b", "B")]);

        convert(&raw, &out, Encoding::Binary, true, &sorter(&tmp)).unwrap();

        let mut reader = BufReader::new(std::fs::File::open(&out).unwrap());
        let mut mnemonics = Vec::new();
        while let Some(r) = read_frame(&mut reader).unwrap() {
            mnemonics.push(r.mnemonic);
        }
        assert_eq!(mnemonics, vec!["A", "B", "C"]);
    }

    #[test]
    fn corrupt_raw_stream_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out");
        std::fs::write(&raw, [0u8, 0, 0]).unwrap();

        let err = convert(&raw, &out, Encoding::Json, false, &sorter(&tmp)).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[test]
    fn missing_raw_stream_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let raw = tmp.path().join("missing");
        let out = tmp.path().join("out");
        let err = convert(&raw, &out, Encoding::Binary, false, &sorter(&tmp)).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn remove_raw_swallows_missing_file() {
        let tmp = TempDir::new().unwrap();
        remove_raw(&tmp.path().join("never-existed"));
    }
}
