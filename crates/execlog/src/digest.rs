//! Cache-aware content digest computation
//!
//! Digests prefer cached metadata over manual hashing: metadata caches are
//! populated as a side effect of earlier pipeline stages and are far cheaper
//! than rehashing. Falling back to the filesystem keeps the result correct
//! when the cache is cold.

use crate::record::Digest;
use crate::spawn::{InputKind, InputMetadataProvider, SpawnInput};
use crate::{Error, Result};
use sha2::{Digest as _, Sha256, Sha512};
use std::fs;
use std::io::Read;
use std::path::Path;

/// The hash algorithm used for content digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashFunction {
    /// SHA-256 (the default)
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl HashFunction {
    /// String form recorded in every [`Digest`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Hash an in-memory buffer, returning the hex-encoded digest.
    #[must_use]
    pub fn hash_bytes(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }

    /// Stream-hash a reader, returning the hex-encoded digest and the number
    /// of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the reader.
    pub fn hash_reader(self, reader: &mut impl Read) -> std::io::Result<(String, u64)> {
        match self {
            Self::Sha256 => hash_reader_inner::<Sha256>(reader),
            Self::Sha512 => hash_reader_inner::<Sha512>(reader),
        }
    }
}

impl std::fmt::Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn hash_reader_inner<D: sha2::Digest>(reader: &mut impl Read) -> std::io::Result<(String, u64)> {
    let mut hasher = D::new();
    let mut buf = [0u8; 1024 * 64];
    let mut total: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), total))
}

/// Compute the content digest of an input or a bare path.
///
/// Resolution order:
/// 1. A virtual input is hashed from its in-memory content; this path never
///    touches the filesystem.
/// 2. Cached metadata from the provider is used verbatim when present.
///    Provider failures are treated as cache misses, not errors.
/// 3. The file is statted for its size and stream-hashed from disk.
///
/// # Errors
///
/// Returns [`Error::Io`] if the path cannot be statted or read in step 3.
pub fn compute_digest(
    input: Option<&SpawnInput>,
    path: &Path,
    provider: Option<&dyn InputMetadataProvider>,
    hash_function: HashFunction,
) -> Result<Digest> {
    if let Some(input) = input
        && let InputKind::Virtual(content) = &input.kind
    {
        return Ok(Digest {
            hash_function_name: hash_function.name().to_string(),
            hash: hash_function.hash_bytes(content),
            size_bytes: content.len() as u64,
        });
    }

    // Cache misses are expected; any provider failure falls through.
    if let Some(provider) = provider
        && let Ok(Some(metadata)) = provider.lookup(path)
    {
        return Ok(Digest {
            hash_function_name: hash_function.name().to_string(),
            hash: hex::encode(&metadata.digest),
            size_bytes: metadata.size_bytes,
        });
    }

    let size_bytes = fs::metadata(path)
        .map_err(|e| Error::io(e, path, "stat"))?
        .len();
    let mut file = fs::File::open(path).map_err(|e| Error::io(e, path, "open"))?;
    let (hash, _) = hash_function
        .hash_reader(&mut file)
        .map_err(|e| Error::io(e, path, "read"))?;
    tracing::trace!(path = %path.display(), size = size_bytes, "Hashed file");

    Ok(Digest {
        hash_function_name: hash_function.name().to_string(),
        hash,
        size_bytes,
    })
}
