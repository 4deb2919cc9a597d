//! End-to-end behaviour of a region and the record cache on top of it

use shmring_cache::protocol::{deserialize, Record};
use shmring_cache::storage::file_len;
use shmring_cache::{Cache, CacheError, Result, SharedRegion};
use tempfile::TempDir;

#[test]
fn test_set_then_get_returns_the_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 64)?;

    let record = Record::new(1, "a", vec![0x01, 0x02]);
    cache.set(std::slice::from_ref(&record))?;

    assert_eq!(cache.get()?, vec![record]);
    Ok(())
}

#[test]
fn test_save_exactly_free_capacity_then_one_more_byte() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 64)?;
    region.save(b"warm-up")?;

    let free = region.stats().blocks[region.active_index()].free;
    region.save(&vec![0xAB; free])?;

    match region.save(&[0x00]) {
        Err(CacheError::OutOfCapacity {
            requested_bytes: 1,
            available_bytes: 0,
            ..
        }) => {}
        other => panic!("expected OutOfCapacity, got {other:?}"),
    }
    assert_eq!(region.get().len(), 63);
    Ok(())
}

#[test]
fn test_batch_keeps_order_through_the_region() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 256)?;

    let batch = vec![
        Record::new(10, "first", b"1".to_vec()),
        Record::new(20, "second", b"22".to_vec()),
        Record::new(30, "third", b"333".to_vec()),
    ];
    cache.set(&batch)?;

    let raw = cache.region().get();
    assert_eq!(deserialize(&raw)?, batch);
    assert_eq!(cache.get()?, batch);
    Ok(())
}

#[test]
fn test_shrinking_below_unread_bytes_fails_and_leaves_file_alone() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("region.mmap");

    {
        let mut region = SharedRegion::open(&path, 64)?;
        region.save(&[7u8; 40])?;
    }

    match SharedRegion::open(&path, 32) {
        Err(CacheError::CapacityTooSmallForExistingData {
            existing_bytes: 40,
            requested_capacity: 32,
            ..
        }) => {}
        other => panic!("expected CapacityTooSmallForExistingData, got {other:?}"),
    }

    assert_eq!(std::fs::metadata(&path)?.len(), file_len(64));
    let region = SharedRegion::open(&path, 64)?;
    assert_eq!(region.get(), vec![7u8; 40]);
    Ok(())
}

#[test]
fn test_oversized_rewrite_leaves_content_untouched() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache = Cache::open(temp_dir.path().join("region.mmap"), 64)?;

    let before = vec![Record::new(1, "keep", b"me".to_vec())];
    cache.set(&before)?;
    let active = cache.region().active_index();

    let huge = vec![Record::new(2, "huge", vec![0u8; 100])];
    assert!(matches!(
        cache.rewrite(&huge),
        Err(CacheError::OutOfCapacity { .. })
    ));

    assert_eq!(cache.get()?, before);
    assert_eq!(cache.region().active_index(), active);
    Ok(())
}

#[test]
fn test_rewrite_replaces_content_and_flips_block() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 32)?;

    region.save(b"old content")?;
    region.rewrite(b"new")?;
    assert_eq!(region.get(), b"new");
    assert_eq!(region.active_index(), 1);

    let stats = region.stats();
    assert_eq!(stats.blocks[0].used, 0);
    assert_eq!(stats.blocks[1].used, 3);

    region.rewrite(b"")?;
    assert!(region.get().is_empty());
    assert_eq!(region.active_index(), 0);
    Ok(())
}

#[test]
fn test_reads_stay_empty_after_wraparound() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 16)?;

    for round in 0u8..10 {
        region.save(&[round; 11])?;
        let snapshot = region.snapshot();
        assert_eq!(snapshot.bytes, vec![round; 11]);
        region.release(snapshot.end)?;
        assert!(region.get().is_empty());
        assert!(region.get().is_empty());
    }
    Ok(())
}
