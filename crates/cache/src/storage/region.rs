//! Handle on a mapped, double-buffered region file
//!
//! The region is the only place that knows there are two blocks. Producers
//! append to the active block with `save` and replace everything with
//! `rewrite`, which fills the inactive block and then swaps the active index
//! with a single compare-and-swap on the mapped header word.
//!
//! That word counts flips. A snapshot remembers the count it was read under,
//! so acknowledging it after any number of rewrites is refused even when the
//! same block became active again.

use super::block::RingBlock;
use super::layout::{
    block_of, block_offset, cursors_offset, file_len, validate_capacity, Cursors, HeaderSnapshot,
    ACTIVE_INDEX_OFFSET, BLOCK_COUNT, CAPACITY_OFFSET, HEADER_SIZE,
};
use super::migration::MigrationPlan;
use crate::config::{RegionConfig, SyncPolicy};
use crate::errors::{CacheError, Result};
use memmap2::{MmapMut, MmapOptions};
use serde::Serialize;
use shmring_utils::file_lock::{is_contended, FileLock};
use shmring_utils::tracing::region_span;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, info, warn};

/// Bytes read from the active block, with what is needed to acknowledge them
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionSnapshot {
    pub bytes: Vec<u8>,
    /// Read cursor the bytes start at
    pub start: usize,
    /// Write cursor observed by the read
    pub end: usize,
    /// Block the bytes came from
    pub block: usize,
    /// Flip counter the bytes were read under
    pub generation: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    pub read_index: usize,
    pub write_index: usize,
    pub used: usize,
    pub free: usize,
}

/// Point-in-time view of a region's header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionStats {
    pub path: PathBuf,
    pub block_capacity: u64,
    pub file_len: u64,
    pub active_block: usize,
    /// Flip counter; advances once per rewrite
    pub generation: i32,
    pub sync: SyncPolicy,
    pub blocks: [BlockStats; BLOCK_COUNT],
}

/// An open region file: its advisory lock, its mapping and the views over it
pub struct SharedRegion {
    path: PathBuf,
    capacity: usize,
    sync: SyncPolicy,
    base: NonNull<u8>,
    // dropped before the lock so the file is unmapped while still locked
    mmap: MmapMut,
    lock: FileLock,
}

// SAFETY: `base` points into the mapping owned by `mmap`, which moves with the
// handle. Shared access only touches atomics and read-only byte views.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl RegionSnapshot {
    /// Cursor just past the first `consumed` bytes of the snapshot
    pub fn position_after(&self, consumed: usize, block_capacity: u64) -> usize {
        if consumed >= self.bytes.len() {
            return self.end;
        }
        ((self.start as u64 + consumed as u64) % block_capacity) as usize
    }
}

impl SharedRegion {
    /// Open or create the region at `path` with `block_capacity` bytes per block
    pub fn open(path: impl AsRef<Path>, block_capacity: u64) -> Result<Self> {
        let config = RegionConfig::builder()
            .with_path(path.as_ref())
            .with_block_capacity(block_capacity)
            .build();
        Self::open_with_config(&config)
    }

    /// Open or create a region, migrating it when the stored capacity differs
    ///
    /// With `adopt_stored_capacity` set, an existing region keeps the capacity
    /// it was created with and `block_capacity` only sizes new files.
    ///
    /// Creating or migrating needs the file to itself: when another handle is
    /// live the open fails with `ExclusiveAccessRequired` and the file is left
    /// as it was.
    pub fn open_with_config(config: &RegionConfig) -> Result<Self> {
        let capacity = validate_capacity(config.block_capacity)?;
        let path = config.path.as_path();
        let span = region_span(path, config.block_capacity);
        let _entered = span.enter();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(parent, "create region directory", e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| CacheError::io(path, "open region file", e))?;

        let lock = FileLock::try_acquire(file).map_err(|e| {
            if is_contended(&e) {
                warn!("region is locked exclusively by another handle");
                CacheError::region_busy(path)
            } else {
                CacheError::io(path, "lock region file", e)
            }
        })?;

        let actual_len = lock
            .file()
            .metadata()
            .map_err(|e| CacheError::io(path, "stat region file", e))?
            .len();

        let existing = if actual_len >= HEADER_SIZE as u64 {
            let mmap = map(lock.file(), path)?;
            HeaderSnapshot::parse(&mmap[..])
                .filter(|header| !header.is_uninitialised())
                .map(|header| (header, mmap))
        } else {
            None
        };

        let mut region = match existing {
            None => Self::create(config, capacity, lock)?,
            Some((header, mmap)) => {
                header.validate(path, actual_len)?;
                let target = if config.adopt_stored_capacity {
                    debug!(
                        stored_capacity = header.block_capacity,
                        "keeping stored block capacity"
                    );
                    header.block_capacity
                } else {
                    config.block_capacity
                };
                let target_capacity = validate_capacity(target)?;

                if target == header.block_capacity && actual_len == file_len(target) {
                    Self::from_mapping(config, target_capacity, lock, mmap)?
                } else {
                    if header.resize_pending(actual_len) {
                        warn!(
                            stored_capacity = header.block_capacity,
                            file_len = actual_len,
                            "completing an interrupted resize"
                        );
                    }
                    Self::migrate(config, target_capacity, lock, &header, mmap)?
                }
            }
        };

        region
            .lock
            .downgrade()
            .map_err(|e| CacheError::io(path, "downgrade region lock", e))?;
        debug!(active_block = region.active_index(), "opened shared region");
        Ok(region)
    }

    fn create(config: &RegionConfig, capacity: usize, lock: FileLock) -> Result<Self> {
        let path = config.path.as_path();
        if !lock.is_exclusive() {
            warn!("cannot initialise a region another handle has open");
            return Err(CacheError::exclusive_access_required(path, "initialise"));
        }

        let len = file_len(capacity as u64);
        lock.file()
            .set_len(len)
            .map_err(|e| CacheError::io(path, "size region file", e))?;
        let mmap = map(lock.file(), path)?;

        let mut region = Self::from_mapping(config, capacity, lock, mmap)?;
        region.reset_header();
        region.flush_to_disk()?;
        info!(file_len = len, "created shared region");
        Ok(region)
    }

    fn migrate(
        config: &RegionConfig,
        capacity: usize,
        lock: FileLock,
        header: &HeaderSnapshot,
        mmap: MmapMut,
    ) -> Result<Self> {
        let path = config.path.as_path();
        if !lock.is_exclusive() {
            warn!(
                stored_capacity = header.block_capacity,
                "cannot migrate a region another handle has open"
            );
            return Err(CacheError::exclusive_access_required(path, "migrate"));
        }

        let plan = match MigrationPlan::prepare(header, &mmap[..], capacity as u64) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(stored_capacity = header.block_capacity, "migration rejected: {e}");
                return Err(e);
            }
        };

        // Grow before the new header is written and shrink only after it is
        // on disk: a resize cut short leaves the last written layout intact
        // at the start of a longer file, which the next open completes.
        let target_len = file_len(capacity as u64);
        let mmap = if target_len > mmap.len() as u64 {
            drop(mmap);
            lock.file()
                .set_len(target_len)
                .map_err(|e| CacheError::io(path, "grow region file", e))?;
            map(lock.file(), path)?
        } else {
            mmap
        };

        // TODO: stage the carried bytes so a failure between the header reset
        // and the save below cannot lose them
        let mut region = Self::from_mapping(config, capacity, lock, mmap)?;
        region.reset_header();
        region.writer(0).save(&plan.carried)?;
        region.flush_to_disk()?;

        if region.mmap.len() as u64 > target_len {
            region = region.truncate(target_len)?;
        }

        info!(
            from_capacity = plan.from_capacity,
            to_capacity = plan.to_capacity,
            carried_bytes = plan.carried.len(),
            "migrated shared region"
        );
        Ok(region)
    }

    fn from_mapping(
        config: &RegionConfig,
        capacity: usize,
        lock: FileLock,
        mut mmap: MmapMut,
    ) -> Result<Self> {
        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| CacheError::corruption(&config.path, "mapping is empty"))?;
        Ok(Self {
            path: config.path.clone(),
            capacity,
            sync: config.sync,
            base,
            mmap,
            lock,
        })
    }

    /// Drop the mapping, cut the file to `len` and map it again
    fn truncate(self, len: u64) -> Result<Self> {
        let Self {
            path,
            capacity,
            sync,
            mmap,
            lock,
            ..
        } = self;
        drop(mmap);
        lock.file()
            .set_len(len)
            .map_err(|e| CacheError::io(&path, "shrink region file", e))?;

        let mut mmap = map(lock.file(), &path)?;
        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| CacheError::corruption(&path, "mapping is empty"))?;
        Ok(Self {
            path,
            capacity,
            sync,
            base,
            mmap,
            lock,
        })
    }

    /// Persist the capacity, activate block 0 and empty both blocks
    fn reset_header(&mut self) {
        let capacity = (self.capacity as u64).to_ne_bytes();
        // SAFETY: the capacity word lies inside the header and is not viewed
        // as an atomic; it is written unaligned like the file format says
        unsafe {
            std::ptr::copy_nonoverlapping(
                capacity.as_ptr(),
                self.base.as_ptr().add(CAPACITY_OFFSET),
                capacity.len(),
            );
        }
        self.active_word().store(0, Ordering::Release);
        for block in 0..BLOCK_COUNT {
            self.block(block).flush();
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_capacity(&self) -> u64 {
        self.capacity as u64
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync
    }

    /// Index of the block currently receiving saves and serving reads
    pub fn active_index(&self) -> usize {
        block_of(self.generation())
    }

    /// Flip counter of the header; changes on every rewrite
    pub fn generation(&self) -> i32 {
        self.active_word().load(Ordering::Acquire)
    }

    /// Append `bytes` to the active block
    pub fn save(&mut self, bytes: &[u8]) -> Result<()> {
        let active = self.active_index();
        if let Err(e) = self.writer(active).save(bytes) {
            warn!(block = active, requested = bytes.len(), "save rejected: {e}");
            return Err(e);
        }
        debug!(block = active, bytes = bytes.len(), "saved");

        if self.sync.syncs_saves() {
            self.flush_to_disk()?;
        }
        Ok(())
    }

    /// Copy of the unread bytes of the active block
    pub fn get(&self) -> Vec<u8> {
        self.snapshot().bytes
    }

    /// Read the active block, remembering where the read ended
    ///
    /// A read that races with a rewrite or an append is repeated, so the bytes
    /// always come from one published state of one block.
    pub fn snapshot(&self) -> RegionSnapshot {
        loop {
            let generation = self.generation();
            let active = block_of(generation);
            let cursors = self.cursors(active);
            let before = cursors.raw();
            let snapshot = self.block(active).snapshot();
            if cursors.raw() == before && self.generation() == generation {
                return RegionSnapshot {
                    bytes: snapshot.bytes,
                    start: snapshot.start,
                    end: snapshot.end,
                    block: active,
                    generation,
                };
            }
        }
    }

    /// Advance the active block's read cursor to `end`
    pub fn release(&self, end: usize) -> Result<()> {
        self.block(self.active_index()).release(end)?;
        if self.sync.syncs_saves() {
            self.flush_to_disk()?;
        }
        Ok(())
    }

    /// Acknowledge a snapshot, unless the region moved on since it was taken
    ///
    /// Nothing is released after any rewrite, or when the read cursor was
    /// moved by another consumer. Returns whether the cursor advanced.
    pub fn release_snapshot(&self, snapshot: &RegionSnapshot) -> Result<bool> {
        if snapshot.end >= self.capacity {
            return Err(CacheError::invalid_release_index(
                snapshot.end,
                self.capacity,
            ));
        }

        if self.generation() != snapshot.generation {
            debug!(
                block = snapshot.block,
                generation = snapshot.generation,
                "snapshot block was rewritten; nothing to release"
            );
            return Ok(false);
        }

        let cursors = self.cursors(snapshot.block);
        if !cursors.advance_read(snapshot.start, snapshot.end) {
            debug!(
                block = snapshot.block,
                "read cursor moved since the snapshot; nothing to release"
            );
            return Ok(false);
        }

        // a rewrite between the check and the swap flushed this block
        if self.generation() != snapshot.generation {
            cursors.advance_read(snapshot.end, snapshot.start);
            debug!(block = snapshot.block, "rewrite raced the release; undone");
            return Ok(false);
        }

        if self.sync.syncs_saves() {
            self.flush_to_disk()?;
        }
        Ok(true)
    }

    /// Replace the whole content of the region with `bytes`
    ///
    /// Readers see either the previous content or `bytes`. When `bytes` does
    /// not fit, the active block is left untouched.
    pub fn rewrite(&mut self, bytes: &[u8]) -> Result<()> {
        let current = self.generation();
        let active = block_of(current);
        let inactive = 1 - active;

        {
            let mut target = self.writer(inactive);
            target.flush();
            if let Err(e) = target.save(bytes) {
                warn!(block = inactive, requested = bytes.len(), "rewrite rejected: {e}");
                return Err(e);
            }
        }

        self.active_word()
            .compare_exchange(
                current,
                current.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|found| CacheError::concurrency_conflict("rewrite", current, found))?;

        self.block(active).flush();
        debug!(from = active, to = inactive, bytes = bytes.len(), "rewrote region");

        if self.sync.syncs_rewrites() {
            self.flush_to_disk()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> RegionStats {
        let blocks = [0, 1].map(|index| {
            let block = self.block(index);
            BlockStats {
                read_index: block.read_index(),
                write_index: block.write_index(),
                used: block.len(),
                free: block.free_capacity(),
            }
        });

        RegionStats {
            path: self.path.clone(),
            block_capacity: self.block_capacity(),
            file_len: file_len(self.block_capacity()),
            active_block: self.active_index(),
            generation: self.generation(),
            sync: self.sync,
            blocks,
        }
    }

    /// Write dirty mapped pages back to the file
    pub fn flush_to_disk(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| CacheError::io(&self.path, "flush region", e))
    }

    fn active_word(&self) -> &AtomicI32 {
        // SAFETY: offset 0 of a page-aligned mapping that lives as long as self
        unsafe { &*self.base.as_ptr().add(ACTIVE_INDEX_OFFSET).cast::<AtomicI32>() }
    }

    fn cursors(&self, block: usize) -> &Cursors {
        // SAFETY: cursor pairs are 4-byte aligned header words inside the mapping
        unsafe { &*self.base.as_ptr().add(cursors_offset(block)).cast::<Cursors>() }
    }

    fn block(&self, block: usize) -> RingBlock<'_, &[u8]> {
        // SAFETY: the block lies inside the mapping; in-process writes go
        // through `writer`, which needs `&mut self`
        let data = unsafe {
            std::slice::from_raw_parts(
                self.base.as_ptr().add(block_offset(block, self.capacity)),
                self.capacity,
            )
        };
        RingBlock::new(self.cursors(block), data)
    }

    fn writer(&mut self, block: usize) -> RingBlock<'_, &mut [u8]> {
        // SAFETY: as for `block`, and `&mut self` rules out other in-process views
        let data = unsafe {
            std::slice::from_raw_parts_mut(
                self.base.as_ptr().add(block_offset(block, self.capacity)),
                self.capacity,
            )
        };
        RingBlock::new(self.cursors(block), data)
    }
}

impl std::fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegion")
            .field("path", &self.path)
            .field("block_capacity", &self.capacity)
            .field("active_block", &self.active_index())
            .field("lock", &self.lock.mode())
            .finish()
    }
}

fn map(file: &File, path: &Path) -> Result<MmapMut> {
    // SAFETY: every handle maps the file under an advisory lock and only
    // resizes it while holding that lock exclusively
    unsafe { MmapOptions::new().map_mut(file) }
        .map_err(|e| CacheError::io(path, "map region file", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_sized_file_with_empty_blocks() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("region.mmap");

        let region = SharedRegion::open(&path, 64)?;
        assert_eq!(std::fs::metadata(&path)?.len(), file_len(64));
        assert_eq!(region.active_index(), 0);
        assert!(region.get().is_empty());

        let stats = region.stats();
        assert_eq!(stats.block_capacity, 64);
        assert_eq!(stats.blocks[0].free, 63);
        assert_eq!(stats.blocks[1].used, 0);
        Ok(())
    }

    #[test]
    fn test_header_is_written_in_native_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("region.mmap");

        let mut region = SharedRegion::open(&path, 32)?;
        region.save(b"abc")?;
        region.rewrite(b"xy")?;
        region.flush_to_disk()?;

        let bytes = std::fs::read(&path)?;
        let header = HeaderSnapshot::parse(&bytes).unwrap();
        assert_eq!(header.active_word, 1);
        assert_eq!(header.active_block(), 1);
        assert_eq!(header.block_capacity, 32);
        assert_eq!(header.cursors, [(0, 0), (0, 2)]);
        let block1 = block_offset(1, 32);
        assert_eq!(&bytes[block1..block1 + 2], b"xy");
        Ok(())
    }

    #[test]
    fn test_release_snapshot_skips_rewritten_block() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 32)?;

        region.save(b"old")?;
        let snapshot = region.snapshot();
        region.rewrite(b"new")?;

        assert!(!region.release_snapshot(&snapshot)?);
        assert_eq!(region.get(), b"new");

        let snapshot = region.snapshot();
        assert!(region.release_snapshot(&snapshot)?);
        assert!(region.get().is_empty());
        Ok(())
    }

    #[test]
    fn test_release_snapshot_skips_block_rewritten_twice() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 32)?;

        region.save(b"hello")?;
        let snapshot = region.snapshot();
        region.rewrite(b"interim")?;
        region.rewrite(b"fresh unread content")?;
        assert_eq!(region.active_index(), snapshot.block);

        assert!(!region.release_snapshot(&snapshot)?);
        assert_eq!(region.get(), b"fresh unread content");
        Ok(())
    }

    #[test]
    fn test_release_snapshot_needs_unmoved_read_cursor() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 32)?;

        region.save(b"once")?;
        let first = region.snapshot();
        let second = region.snapshot();
        assert!(region.release_snapshot(&first)?);
        region.save(b"more")?;

        assert!(!region.release_snapshot(&second)?);
        assert_eq!(region.get(), b"more");
        Ok(())
    }

    #[test]
    fn test_rewrite_advances_flip_counter() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut region = SharedRegion::open(temp_dir.path().join("region.mmap"), 32)?;

        for round in 1..=3 {
            region.rewrite(b"x")?;
            assert_eq!(region.generation(), round);
        }
        assert_eq!(region.active_index(), 1);
        assert_eq!(region.stats().generation, 3);
        Ok(())
    }

    #[test]
    fn test_invalid_capacity_is_rejected_before_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("region.mmap");
        assert!(matches!(
            SharedRegion::open(&path, 1),
            Err(CacheError::InvalidCapacity { requested: 1, .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_sync_always_flushes_after_save() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = RegionConfig::builder()
            .with_path(temp_dir.path().join("region.mmap"))
            .with_block_capacity(16)
            .with_sync(SyncPolicy::Always)
            .build();
        let mut region = SharedRegion::open_with_config(&config)?;
        region.save(b"durable")?;
        assert_eq!(region.sync_policy(), SyncPolicy::Always);

        let bytes = std::fs::read(&config.path)?;
        let block0 = block_offset(0, 16);
        assert_eq!(&bytes[block0..block0 + 7], b"durable");
        Ok(())
    }
}
