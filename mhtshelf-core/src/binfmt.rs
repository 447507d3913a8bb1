//! Small headered bincode container: 4-byte magic, little-endian u32
//! version, then the payload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

const HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("file is shorter than its header")]
    Truncated,
    #[error("unexpected magic {0:?}")]
    Magic([u8; 4]),
    #[error("unsupported version {0}")]
    Version(u32),
    #[error("payload: {0}")]
    Payload(#[from] bincode::Error),
}

pub fn encode<T: Serialize>(magic: [u8; 4], version: u32, payload: &T) -> Result<Vec<u8>, FormatError> {
    let body = bincode::serialize(payload)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Reads the header and returns the stored version with the payload bytes.
pub fn split_header(bytes: &[u8], magic: [u8; 4]) -> Result<(u32, &[u8]), FormatError> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::Truncated);
    }
    let mut found = [0u8; 4];
    found.copy_from_slice(&bytes[0..4]);
    if found != magic {
        return Err(FormatError::Magic(found));
    }
    let mut ver = [0u8; 4];
    ver.copy_from_slice(&bytes[4..8]);
    Ok((u32::from_le_bytes(ver), &bytes[HEADER_LEN..]))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8], magic: [u8; 4], version: u32) -> Result<T, FormatError> {
    let (found, body) = split_header(bytes, magic)?;
    if found != version {
        return Err(FormatError::Version(found));
    }
    Ok(bincode::deserialize(body)?)
}
