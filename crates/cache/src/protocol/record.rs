//! Structured records carried in frame bodies
//!
//! ```text
//! proto_id: u16 BE | key_len: u32 BE | key: [u8; key_len] | payload: [u8; *]
//! ```
//!
//! A record travels as the body of a frame with type [`RECORD_FRAME_TYPE`];
//! a batch is the concatenation of its records' frames.

use super::frame::{length_field, FrameReader, FRAME_HEADER_LEN};
use crate::errors::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Frame type used for record bodies
pub const RECORD_FRAME_TYPE: u16 = 0;

/// Bytes in a record header (proto id + key length)
pub const RECORD_HEADER_LEN: usize = 6;

/// A keyed, typed payload stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "id")]
    pub proto_id: u16,
    #[serde(rename = "ukey")]
    pub key: String,
    #[serde(rename = "data")]
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(proto_id: u16, key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            proto_id,
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// Size of the encoded body, without the enclosing frame header
    pub fn body_len(&self) -> usize {
        RECORD_HEADER_LEN + self.key.len() + self.payload.len()
    }

    /// Size of the record once framed
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_LEN + self.body_len()
    }

    pub fn encode_body(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.body_len());
        self.encode_body_into(&mut buf)?;
        Ok(buf)
    }

    fn encode_body_into(&self, buf: &mut Vec<u8>) -> Result<()> {
        let key_len = length_field("record key", self.key.len())?;
        buf.extend_from_slice(&self.proto_id.to_be_bytes());
        buf.extend_from_slice(&key_len);
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(())
    }

    /// Decode a record body
    ///
    /// The key may not reach the end of the body, so a record always carries
    /// at least one payload byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        if body.len() < RECORD_HEADER_LEN {
            return Err(CacheError::too_short(
                "record",
                RECORD_HEADER_LEN,
                body.len(),
            ));
        }

        let proto_id = u16::from_be_bytes([body[0], body[1]]);
        let key_len = u32::from_be_bytes([body[2], body[3], body[4], body[5]]) as usize;
        let key_end = RECORD_HEADER_LEN.saturating_add(key_len);
        if key_end >= body.len() {
            return Err(CacheError::key_length_overflow(key_len, body.len()));
        }

        let key = std::str::from_utf8(&body[RECORD_HEADER_LEN..key_end]).map_err(|e| {
            CacheError::invalid_key(
                String::from_utf8_lossy(&body[RECORD_HEADER_LEN..key_end]),
                e.to_string(),
            )
        })?;

        Ok(Self::new(proto_id, key, &body[key_end..]))
    }

    /// Encode this record as one frame
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.frame_len());
        self.write_frame(&mut buf)?;
        Ok(buf)
    }

    fn write_frame(&self, buf: &mut Vec<u8>) -> Result<()> {
        // the body length bounds the key length, so the body never fails half written
        let body_len = length_field("record body", self.body_len())?;
        buf.extend_from_slice(&RECORD_FRAME_TYPE.to_be_bytes());
        buf.extend_from_slice(&body_len);
        self.encode_body_into(buf)
    }
}

/// Encode records as concatenated frames, in input order
pub fn serialize(records: &[Record]) -> Result<Vec<u8>> {
    let total = records.iter().map(Record::frame_len).sum();
    let mut buf = Vec::with_capacity(total);
    for record in records {
        record.write_frame(&mut buf)?;
    }
    Ok(buf)
}

/// Decode every complete frame in `bytes` into a record
///
/// A truncated trailing frame ends the scan; a complete frame whose body is
/// not a valid record fails the whole call.
pub fn deserialize(bytes: &[u8]) -> Result<Vec<Record>> {
    FrameReader::new(bytes)
        .map(|frame| Record::decode_body(frame.body))
        .collect()
}
