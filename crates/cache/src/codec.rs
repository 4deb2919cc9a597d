//! Pluggable (de)serialization strategies for the cache facade
//!
//! A codec turns a value into the bytes stored in a region and turns the
//! unread bytes of a region back into values. Stored bytes are always a run of
//! frames, so a consumer can pick up whatever complete frames a producer has
//! published so far.

use crate::errors::{CacheError, Result, SerializationOp};
use crate::protocol::{self, encode_frame_into, FrameReader, Record};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Frame type used by [`JsonCodec`]
pub const JSON_FRAME_TYPE: u16 = 1;

/// Frame type used by [`BincodeCodec`]
pub const BINCODE_FRAME_TYPE: u16 = 2;

/// A serialization strategy bound to a cache
pub trait Codec {
    /// What `set` and `rewrite` accept
    type Value: ?Sized;
    /// What `get` returns for the whole unread content
    type Output;

    fn serialize(&self, value: &Self::Value) -> Result<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Output>;

    /// Leading bytes of `bytes` that `deserialize` fully consumes
    ///
    /// Only this prefix is acknowledged when values are taken from a region.
    fn complete_len(&self, bytes: &[u8]) -> usize {
        bytes.len()
    }
}

/// Length of the complete frames at the start of `bytes`
fn framed_len(bytes: &[u8]) -> usize {
    let mut reader = FrameReader::new(bytes);
    reader.by_ref().for_each(drop);
    bytes.len() - reader.remaining().len()
}

/// Batches of [`Record`]s in the record wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl Codec for RecordCodec {
    type Value = [Record];
    type Output = Vec<Record>;

    fn serialize(&self, records: &[Record]) -> Result<Vec<u8>> {
        protocol::serialize(records)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Record>> {
        protocol::deserialize(bytes)
    }

    fn complete_len(&self, bytes: &[u8]) -> usize {
        framed_len(bytes)
    }
}

/// Untouched bytes; no framing is added or expected
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Value = [u8];
    type Output = Vec<u8>;

    fn serialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Any serde type as JSON, one frame per value
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Value = [T];
    type Output = Vec<T>;

    fn serialize(&self, values: &[T]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for value in values {
            let body = serde_json::to_vec(value)
                .map_err(|e| CacheError::serialization("json", SerializationOp::Encode, e))?;
            encode_frame_into(&mut buf, JSON_FRAME_TYPE, &body)?;
        }
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<T>> {
        FrameReader::new(bytes)
            .map(|frame| Ok(serde_json::from_slice(frame.body)?))
            .collect()
    }

    fn complete_len(&self, bytes: &[u8]) -> usize {
        framed_len(bytes)
    }
}

/// Any serde type as bincode, one frame per value
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec for BincodeCodec<T> {
    type Value = [T];
    type Output = Vec<T>;

    fn serialize(&self, values: &[T]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for value in values {
            let body = bincode::serialize(value)
                .map_err(|e| CacheError::serialization("bincode", SerializationOp::Encode, e))?;
            encode_frame_into(&mut buf, BINCODE_FRAME_TYPE, &body)?;
        }
        Ok(buf)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<T>> {
        FrameReader::new(bytes)
            .map(|frame| Ok(bincode::deserialize(frame.body)?))
            .collect()
    }

    fn complete_len(&self, bytes: &[u8]) -> usize {
        framed_len(bytes)
    }
}

/// A codec built from a pair of closures
pub struct FnCodec<V: ?Sized, O, S, D> {
    serialize: S,
    deserialize: D,
    _marker: PhantomData<fn(&V) -> O>,
}

impl<V, O, S, D> FnCodec<V, O, S, D>
where
    V: ?Sized,
    S: Fn(&V) -> Result<Vec<u8>>,
    D: Fn(&[u8]) -> Result<O>,
{
    pub fn new(serialize: S, deserialize: D) -> Self {
        Self {
            serialize,
            deserialize,
            _marker: PhantomData,
        }
    }
}

impl<V, O, S, D> Codec for FnCodec<V, O, S, D>
where
    V: ?Sized,
    S: Fn(&V) -> Result<Vec<u8>>,
    D: Fn(&[u8]) -> Result<O>,
{
    type Value = V;
    type Output = O;

    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        (self.serialize)(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<O> {
        (self.deserialize)(bytes)
    }
}
