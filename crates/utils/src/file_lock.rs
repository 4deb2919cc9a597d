//! Advisory locking for files shared between processes

use fs2::FileExt;
use std::fs::File;
use std::io;

/// How a [`FileLock`] currently holds its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// No other handle holds a lock on the file
    Exclusive,
    /// Other handles may hold shared locks alongside this one
    Shared,
}

/// An advisory lock held on an open file for as long as this value lives
///
/// Acquisition never blocks: it prefers an exclusive lock, settles for a
/// shared one when another handle is already live, and fails with
/// [`io::ErrorKind::WouldBlock`] when someone else holds the file exclusively.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    mode: LockMode,
}

impl FileLock {
    /// Lock `file`, exclusively if possible and shared otherwise
    pub fn try_acquire(file: File) -> io::Result<Self> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                file,
                mode: LockMode::Exclusive,
            }),
            Err(e) if is_contended(&e) => {
                file.try_lock_shared()?;
                Ok(Self {
                    file,
                    mode: LockMode::Shared,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Lock `file` in shared mode only
    pub fn try_acquire_shared(file: File) -> io::Result<Self> {
        file.try_lock_shared()?;
        Ok(Self {
            file,
            mode: LockMode::Shared,
        })
    }

    /// Convert an exclusive lock into a shared one so peers can open the file
    pub fn downgrade(&mut self) -> io::Result<()> {
        if self.mode == LockMode::Exclusive {
            self.file.try_lock_shared()?;
            self.mode = LockMode::Shared;
        }
        Ok(())
    }

    /// Current lock mode
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Whether this handle may reshape the file
    pub fn is_exclusive(&self) -> bool {
        self.mode == LockMode::Exclusive
    }

    /// The locked file
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Whether a lock error means another handle holds a conflicting lock
pub fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
