//! Basic cache operation tests

use crate::codec::{BincodeCodec, JsonCodec, RawCodec};
use crate::config::RegionConfig;
use crate::core::Cache;
use crate::errors::{CacheError, Result};
use crate::protocol::Record;
use crate::storage::SharedRegion;
use tempfile::TempDir;

fn records() -> Vec<Record> {
    vec![
        Record::new(1, "alpha", b"one".to_vec()),
        Record::new(2, "beta", b"two".to_vec()),
    ]
}

#[test]
fn test_basic_operations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 256)?;

    cache.set(&records())?;
    assert_eq!(cache.get()?, records());
    // get leaves content in place
    assert_eq!(cache.get()?, records());

    cache.set(&[Record::new(3, "gamma", b"three".to_vec())])?;
    assert_eq!(cache.get()?.len(), 3);

    cache.rewrite(&records()[..1])?;
    assert_eq!(cache.get()?, records()[..1].to_vec());

    cache.clear()?;
    assert!(cache.get()?.is_empty());
    Ok(())
}

#[test]
fn test_take_acknowledges_what_it_returns() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 256)?;

    cache.set(&records())?;
    assert_eq!(cache.take()?, records());
    assert!(cache.take()?.is_empty());

    let stats = cache.stats();
    let active = &stats.blocks[stats.active_block];
    assert_eq!(active.used, 0);
    assert_eq!(active.read_index, active.write_index);
    Ok(())
}

#[test]
fn test_take_keeps_partial_trailing_frame() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 256)?;

    let first = Record::new(1, "complete", b"x".to_vec());
    let second = Record::new(2, "pending", b"y".to_vec()).to_frame()?;
    let split = second.len() / 2;

    cache.set(std::slice::from_ref(&first))?;
    cache.region().save(&second[..split])?;

    assert_eq!(cache.take()?, vec![first]);
    assert_eq!(cache.region().get(), second[..split].to_vec());

    cache.region().save(&second[split..])?;
    assert_eq!(cache.take()?, vec![Record::new(2, "pending", b"y".to_vec())]);
    assert!(cache.region().get().is_empty());
    Ok(())
}

#[test]
fn test_failed_decode_releases_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 64)?;

    // a complete frame whose body is too short to be a record
    cache.region().save(&[0, 0, 0, 0, 0, 2, 0xAA, 0xBB])?;
    assert!(matches!(cache.take(), Err(CacheError::TooShort { .. })));
    assert_eq!(cache.region().get().len(), 8);
    Ok(())
}

#[test]
fn test_errors_propagate_unchanged() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 16)?;

    let big = Record::new(1, "key", vec![0u8; 32]);
    assert!(matches!(
        cache.set(std::slice::from_ref(&big)),
        Err(CacheError::OutOfCapacity { .. })
    ));
    assert!(matches!(
        cache.rewrite(std::slice::from_ref(&big)),
        Err(CacheError::OutOfCapacity { .. })
    ));
    Ok(())
}

#[test]
fn test_json_and_bincode_codecs() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let config = RegionConfig::builder()
        .with_path(temp_dir.path().join("json.mmap"))
        .with_block_capacity(128)
        .build();
    let json = Cache::open_with_codec(&config, JsonCodec::<(String, u32)>::new())?;
    json.set(&[("a".to_string(), 1), ("b".to_string(), 2)])?;
    assert_eq!(json.take()?, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

    let region = SharedRegion::open(temp_dir.path().join("bincode.mmap"), 128)?;
    let bincode = Cache::with_codec(region, BincodeCodec::<Vec<u16>>::new());
    bincode.rewrite(&[vec![1, 2, 3]])?;
    assert_eq!(bincode.get()?, vec![vec![1, 2, 3]]);
    Ok(())
}

#[test]
fn test_clones_share_one_region() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let region = SharedRegion::open(temp_dir.path().join("region.mmap"), 64)?;
    let producer = Cache::with_codec(region, RawCodec);
    let consumer = producer.clone();

    let handle = std::thread::spawn(move || producer.set(b"from thread"));
    handle.join().expect("producer thread panicked")?;

    assert_eq!(consumer.take()?, b"from thread");
    assert!(consumer.get()?.is_empty());
    Ok(())
}
