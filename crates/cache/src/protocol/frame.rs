//! Length-prefixed binary frames
//!
//! ```text
//! type: u16 BE | length: u32 BE | body: [u8; length]
//! ```

use crate::errors::{CacheError, Result};

/// Bytes in a frame header (type + length)
pub const FRAME_HEADER_LEN: usize = 6;

const TYPE_LEN: usize = 2;

/// A frame owning its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u16,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(frame_type: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            frame_type,
            body: body.into(),
        }
    }

    /// Encoded size: header plus body
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.body.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_frame(self.frame_type, &self.body)
    }

    /// Decode exactly one frame; trailing or missing body bytes are an error
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (frame_type, declared) = read_header(bytes)
            .ok_or_else(|| CacheError::too_short("frame", FRAME_HEADER_LEN, bytes.len()))?;

        let body = &bytes[FRAME_HEADER_LEN..];
        if declared != body.len() {
            return Err(CacheError::length_mismatch(declared, body.len()));
        }

        Ok(Self::new(frame_type, body))
    }
}

/// Encode a frame without taking ownership of the body
pub fn encode_frame(frame_type: u16, body: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    encode_frame_into(&mut buf, frame_type, body)?;
    Ok(buf)
}

/// Append an encoded frame to `buf`; `buf` is untouched on error
pub fn encode_frame_into(buf: &mut Vec<u8>, frame_type: u16, body: &[u8]) -> Result<()> {
    let len = length_field("frame body", body.len())?;
    buf.extend_from_slice(&frame_type.to_be_bytes());
    buf.extend_from_slice(&len);
    buf.extend_from_slice(body);
    Ok(())
}

/// Big-endian `u32` length prefix for `len` bytes of `field`
pub(crate) fn length_field(field: &'static str, len: usize) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| CacheError::field_too_large(field, len))
}

fn read_header(bytes: &[u8]) -> Option<(u16, usize)> {
    if bytes.len() < FRAME_HEADER_LEN {
        return None;
    }
    let frame_type = u16::from_be_bytes([bytes[0], bytes[1]]);
    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[TYPE_LEN..FRAME_HEADER_LEN]);
    Some((frame_type, u32::from_be_bytes(len) as usize))
}

/// A frame borrowed from a larger buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
    pub frame_type: u16,
    pub body: &'a [u8],
}

impl FrameRef<'_> {
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.frame_type, self.body)
    }
}

/// Sequential scan over concatenated frames
///
/// Stops at the end of the input, or silently at a header or body cut short,
/// which is what a partially overwritten tail looks like.
#[derive(Debug, Clone)]
pub struct FrameReader<'a> {
    remaining: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    /// Bytes not yet consumed by a complete frame
    pub fn remaining(&self) -> &'a [u8] {
        self.remaining
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = FrameRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (frame_type, declared) = read_header(self.remaining)?;
        let end = FRAME_HEADER_LEN.checked_add(declared)?;
        if end > self.remaining.len() {
            return None;
        }

        let body = &self.remaining[FRAME_HEADER_LEN..end];
        self.remaining = &self.remaining[end..];
        Some(FrameRef { frame_type, body })
    }
}
