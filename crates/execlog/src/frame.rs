//! Length-delimited framing for the raw record stream
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. The raw
//! stream is append-friendly and streamable; there are no separators between
//! frames. A truncated header or payload means the log cannot be trusted, so
//! decoding fails hard rather than salvaging a prefix.

use crate::record::SpawnRecord;
use crate::{Error, Result};
use std::io::{Read, Write};

/// Upper bound on a single frame payload. A length above this is treated as
/// corruption rather than attempted as an allocation.
const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

/// Serialize a record into one length-prefixed frame.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the record cannot be encoded.
pub fn encode_frame(record: &SpawnRecord) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(record).map_err(|e| Error::serialization(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::serialization("record exceeds maximum frame length"))?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write a record to the writer as one frame.
///
/// # Errors
///
/// Returns serialization or I/O errors.
pub fn write_frame(writer: &mut impl Write, record: &SpawnRecord) -> Result<()> {
    let frame = encode_frame(record)?;
    writer
        .write_all(&frame)
        .map_err(|e| Error::io_no_path(e, "write"))
}

/// Read the next record from the reader.
///
/// Returns `Ok(None)` at a clean end of stream.
///
/// # Errors
///
/// Returns [`Error::Corrupt`] for a truncated header or payload, or an
/// unparseable record; [`Error::Io`] for other read failures.
pub fn read_frame(reader: &mut impl Read) -> Result<Option<SpawnRecord>> {
    let mut len_buf = [0u8; 4];
    match read_or_eof(reader, &mut len_buf)? {
        ReadOutcome::Eof => return Ok(None),
        ReadOutcome::Truncated => {
            return Err(Error::corrupt("truncated frame header"));
        }
        ReadOutcome::Full => {}
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(Error::corrupt(format!("frame length {len} exceeds limit")));
    }
    let mut payload = vec![0u8; len as usize];
    match read_or_eof(reader, &mut payload)? {
        ReadOutcome::Full => {}
        ReadOutcome::Eof | ReadOutcome::Truncated => {
            return Err(Error::corrupt("truncated frame payload"));
        }
    }
    let record = serde_json::from_slice(&payload)
        .map_err(|e| Error::corrupt(format!("unparseable record: {e}")))?;
    Ok(Some(record))
}

enum ReadOutcome {
    /// The buffer was filled completely
    Full,
    /// The stream ended before the first byte
    Eof,
    /// The stream ended mid-buffer
    Truncated,
}

fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .map_err(|e| Error::io_no_path(e, "read"))?;
        if n == 0 {
            if filled == 0 {
                return Ok(ReadOutcome::Eof);
            }
            return Ok(ReadOutcome::Truncated);
        }
        filled += n;
    }
    Ok(ReadOutcome::Full)
}
