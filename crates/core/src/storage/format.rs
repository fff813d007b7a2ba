use sha2::{Digest, Sha256};

use crate::errors::CoreError;

/// Magic bytes identifying a persisted balance snapshot envelope.
pub const MAGIC: &[u8; 4] = b"TKBS";

/// Current envelope format version.
pub const CURRENT_VERSION: u16 = 1;

/// Header size in bytes:
/// magic(4) + version(2) + payload_len(8) + sha256(32) = 46
pub const HEADER_SIZE: usize = 46;

/// Envelope header read from persisted bytes.
#[derive(Debug)]
pub struct EnvelopeHeader {
    pub version: u16,
    pub payload_len: u64,
    pub digest: [u8; 32],
}

/// Wrap a serialized snapshot in a versioned, checksummed envelope.
///
/// Layout:
/// ```text
/// [TKBS: 4B] [version: 2B LE] [payload_len: 8B LE] [sha256(payload): 32B]
/// [payload: variable]
/// ```
pub fn write_envelope(version: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&Sha256::digest(payload));
    buf.extend_from_slice(payload);

    buf
}

/// Parse and verify an envelope.
/// Returns the header and the payload slice.
pub fn read_envelope(data: &[u8]) -> Result<(EnvelopeHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidCacheFormat(
            "Data too small to be a balance snapshot envelope".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidCacheFormat(
            "Invalid magic bytes, not a balance snapshot envelope".into(),
        ));
    }

    let mut offset = 4;

    let version = u16::from_le_bytes([data[offset], data[offset + 1]]);
    offset += 2;

    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let payload_len = u64::from_le_bytes(data[offset..offset + 8].try_into().map_err(|_| {
        CoreError::InvalidCacheFormat("Failed to read payload length".into())
    })?);
    offset += 8;

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&data[offset..offset + 32]);
    offset += 32;

    let available = (data.len() - offset) as u64;
    if available != payload_len {
        return Err(CoreError::InvalidCacheFormat(format!(
            "Payload length mismatch: header says {payload_len} bytes, found {available}"
        )));
    }

    let payload = &data[offset..];
    if Sha256::digest(payload)[..] != digest[..] {
        return Err(CoreError::InvalidCacheFormat("Payload checksum mismatch".into()));
    }

    let header = EnvelopeHeader {
        version,
        payload_len,
        digest,
    };

    Ok((header, payload))
}
