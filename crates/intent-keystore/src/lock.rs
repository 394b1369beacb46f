//! Interprocess advisory locking for the key store file, with a bounded
//! wait rather than an indefinite block.

use crate::error::KeyStoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A held file lock, released on drop.
pub struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Acquires an exclusive lock on `<path>.lock`, polling until `timeout`
/// elapses.
pub fn acquire(path: &Path, timeout: Duration) -> Result<FileLock, KeyStoreError> {
    let lock_path = lock_path_for(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| KeyStoreError::Io {
            path: lock_path.display().to_string(),
            source: e,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(FileLock { file }),
            Err(_) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
            Err(_) => return Err(KeyStoreError::LockTimeout(timeout)),
        }
    }
}

fn lock_path_for(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".lock");
    std::path::PathBuf::from(os)
}
