//! Binary persistence of rule tables.
//!
//! A persisted [`RuleTable`] lets incremental builds start from the rules of
//! the previous run. The format is a 32-byte fixed header followed by a
//! bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"ATOM"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Hash version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! Both the format version and the hash version must match. A table written
//! with a different class-name hash would hand out names that no longer
//! agree with freshly generated ones, so it is rejected with
//! [`DeserializeError::IncompatibleVersion`] rather than trusted. Decoding
//! additionally regenerates every rule and rejects the blob on any mismatch.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::RuleTable;
use crate::types::Declaration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"ATOM";
const FORMAT_VERSION: u16 = 1;
const HASH_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`RuleTable`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule table: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`RuleTable`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a stylebake rule cache: invalid magic bytes")]
    BadMagic,

    #[error("incompatible {what} version: blob is v{blob}, this build supports v{supported}")]
    IncompatibleVersion {
        what: &'static str,
        blob: u16,
        supported: u16,
    },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized shape
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedTable {
    metadata: TableMetadata,
    entries: Vec<SerializedEntry>,
    compression: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableMetadata {
    rule_count: usize,
    compression_digest: [u8; 32],
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedEntry {
    declaration: Declaration,
    class_name: String,
    css: String,
}

fn compression_pairs(map: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    pairs.sort();
    pairs
}

fn compression_digest(pairs: &[(String, String)]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for (long, short) in pairs {
        hasher.update(long.as_bytes());
        hasher.update(&[0]);
        hasher.update(short.as_bytes());
        hasher.update(&[0]);
    }
    *hasher.finalize().as_bytes()
}

fn table_to_serialized(table: &RuleTable) -> SerializedTable {
    let compression = compression_pairs(table.compression());
    let entries: Vec<SerializedEntry> = table
        .declarations()
        .zip(table.rules())
        .map(|(declaration, rule)| SerializedEntry {
            declaration: declaration.clone(),
            class_name: rule.class_name.clone(),
            css: rule.css.clone(),
        })
        .collect();
    SerializedTable {
        metadata: TableMetadata {
            rule_count: entries.len(),
            compression_digest: compression_digest(&compression),
        },
        entries,
        compression,
    }
}

fn serialized_to_table(ser: SerializedTable) -> Result<RuleTable, DeserializeError> {
    validate(&ser)?;
    let mut table = RuleTable::new().with_compression(ser.compression.into_iter().collect());
    for entry in ser.entries {
        let rule = table
            .intern(&entry.declaration)
            .map_err(|e| DeserializeError::Validation(e.to_string()))?;
        if rule.class_name != entry.class_name || rule.css != entry.css {
            return Err(DeserializeError::Validation(format!(
                "stored rule for class '{}' does not match its declaration",
                entry.class_name
            )));
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedTable) -> Result<(), DeserializeError> {
    if ser.metadata.rule_count != ser.entries.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} rules but payload has {}",
            ser.metadata.rule_count,
            ser.entries.len()
        )));
    }
    if ser.metadata.compression_digest != compression_digest(&ser.compression) {
        return Err(DeserializeError::Validation(
            "compression map does not match its digest".to_owned(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&HASH_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

struct Header {
    format_version: u16,
    hash_version: u16,
    payload_len: u32,
    hash: [u8; 16],
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<Header, DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok(Header {
        format_version: u16::from_le_bytes([bytes[4], bytes[5]]),
        hash_version: u16::from_le_bytes([bytes[6], bytes[7]]),
        // bytes[8..12] is flags (reserved)
        payload_len: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        hash,
    })
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(table: &RuleTable) -> Result<Vec<u8>, SerializeError> {
    let serialized = table_to_serialized(table);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<RuleTable, DeserializeError> {
    let header = read_header(bytes)?;

    if header.format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            what: "format",
            blob: header.format_version,
            supported: FORMAT_VERSION,
        });
    }
    if header.hash_version != HASH_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            what: "hash",
            blob: header.hash_version,
            supported: HASH_VERSION,
        });
    }

    let payload_end = HEADER_SIZE + header.payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: header.payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    if blake3::hash(payload).as_bytes()[..16] != header.hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedTable, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_table(serialized)
}

impl RuleTable {
    /// Encodes the table in the binary cache format.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        encode(self)
    }

    /// Decodes a table written by [`to_bytes`](Self::to_bytes), regenerating
    /// and checking every rule.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`] on a corrupt, foreign or stale blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        decode(bytes)
    }

    /// # Errors
    ///
    /// Returns [`SerializeError`] if encoding or writing fails.
    pub fn to_binary_file(&self, path: impl AsRef<Path>) -> Result<(), SerializeError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeserializeError`] if reading or decoding fails.
    pub fn from_binary_file(path: impl AsRef<Path>) -> Result<Self, DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
