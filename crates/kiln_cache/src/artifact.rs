//! Compiled artifact encoding.
//!
//! Every artifact starts with a fixed 12-byte header: a little-endian `u32`
//! flag word (bit 0 = compressed) followed by a little-endian `u64` holding
//! the decompressed payload size. The payload is either the raw compiled
//! bytes or a single LZ4 block.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Payloads larger than this many bytes are considered for compression.
pub const COMPRESSION_THRESHOLD: usize = 4096;

/// Header flag marking an LZ4-compressed payload.
pub const FLAG_COMPRESSED: u32 = 1;

/// Encoded size of [`ArtifactHeader`].
pub const HEADER_SIZE: usize = 12;

/// Upper bound on the LZ4 block expansion ratio, used to reject headers that
/// claim an impossible decompressed size before allocating for it.
const MAX_LZ4_RATIO: u64 = 255;

/// Header prepended to every cached artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Flag word; see [`FLAG_COMPRESSED`].
    pub flags: u32,

    /// Size of the payload once decompressed.
    pub decompressed_size: u64,
}

impl ArtifactHeader {
    /// Returns `true` if the payload following this header is compressed.
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Encodes the header into its fixed-width on-disk form.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serde::encode_to_vec(self, header_config()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })
    }

    /// Decodes a header from the start of `raw`.
    ///
    /// Returns `None` if `raw` is shorter than [`HEADER_SIZE`].
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < HEADER_SIZE {
            return None;
        }
        bincode::serde::decode_from_slice(&raw[..HEADER_SIZE], header_config())
            .ok()
            .map(|(header, _)| header)
    }
}

fn header_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Applies the artifact compression policy.
///
/// Compression goes through a single scratch buffer guarded by a mutex, so
/// large compressions from several workers are serialized while small
/// payloads never touch the lock.
pub struct Compressor {
    threshold: usize,
    scratch: Mutex<Vec<u8>>,
}

impl Compressor {
    /// Creates a compressor that considers payloads larger than `threshold`.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            scratch: Mutex::new(Vec::new()),
        }
    }

    /// Returns the compression threshold in bytes.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Encodes `data` as a complete artifact (header + payload).
    ///
    /// The compressed form is kept only when it is smaller than three
    /// quarters of the original; otherwise the raw bytes are stored.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        let mut header = ArtifactHeader {
            flags: 0,
            decompressed_size: data.len() as u64,
        };

        if data.len() > self.threshold {
            let mut scratch = self.scratch.lock().unwrap_or_else(PoisonError::into_inner);
            scratch.resize(lz4_flex::block::get_maximum_output_size(data.len()), 0);
            match lz4_flex::block::compress_into(data, &mut scratch) {
                Ok(size) if size < data.len() / 4 * 3 => {
                    header.flags |= FLAG_COMPRESSED;
                    return Ok(assemble(&header.encode()?, &scratch[..size]));
                }
                Ok(size) => {
                    tracing::trace!(
                        original = data.len(),
                        compressed = size,
                        "Compression saves too little; storing raw"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not compress artifact; storing raw");
                }
            }
        }

        Ok(assemble(&header.encode()?, data))
    }

    /// Decodes a complete artifact read from `path`, returning the payload.
    pub fn decode(raw: &[u8], path: &Path) -> Result<Vec<u8>, CacheError> {
        let header = ArtifactHeader::decode(raw).ok_or_else(|| CacheError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("expected {HEADER_SIZE} header bytes, found {}", raw.len()),
        })?;
        let payload = &raw[HEADER_SIZE..];

        if !header.is_compressed() {
            if payload.len() as u64 != header.decompressed_size {
                return Err(CacheError::CorruptPayload {
                    path: path.to_path_buf(),
                    reason: format!(
                        "raw payload is {} bytes, header says {}",
                        payload.len(),
                        header.decompressed_size
                    ),
                });
            }
            return Ok(payload.to_vec());
        }

        if header.decompressed_size > (payload.len() as u64 + 16) * MAX_LZ4_RATIO {
            return Err(CacheError::InvalidHeader {
                path: path.to_path_buf(),
                reason: format!(
                    "decompressed size {} impossible for {} compressed bytes",
                    header.decompressed_size,
                    payload.len()
                ),
            });
        }
        let size = usize::try_from(header.decompressed_size).map_err(|e| {
            CacheError::InvalidHeader {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        let out = lz4_flex::block::decompress(payload, size).map_err(|e| {
            CacheError::CorruptPayload {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        if out.len() != size {
            return Err(CacheError::CorruptPayload {
                path: path.to_path_buf(),
                reason: format!("decompressed {} bytes, header says {size}", out.len()),
            });
        }
        Ok(out)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(COMPRESSION_THRESHOLD)
    }
}

fn assemble(header: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(header.len() + payload.len());
    output.extend_from_slice(header);
    output.extend_from_slice(payload);
    output
}
