//! Cross-process locks guarding single-flight DID registration.
//!
//! Selected via `INTENT_LOCK_STRATEGY` (`file`, the default, or `redis`).
//! Every acquired guard releases on drop so a panic or early return can
//! never leave the lock held.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const REDIS_LOCK_TTL_MS: usize = 30_000;

pub trait RegistrationLock: Send + Sync {
    /// Attempts to acquire the lock for `did` within `timeout`, returning
    /// `None` if it could not be acquired in time (the caller proceeds
    /// without the lock, degraded but never deadlocked).
    fn try_acquire(&self, did: &str, timeout: Duration) -> Option<Box<dyn RegistrationLockGuard>>;
}

pub trait RegistrationLockGuard: Send {}

/// `file`: a single OS advisory lock file shared by every DID on this
/// machine, at `<user_data_dir>/intentlayer/did.reg.lock`.
pub struct FileRegistrationLock {
    path: PathBuf,
}

impl Default for FileRegistrationLock {
    fn default() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("intentlayer");
        Self {
            path: dir.join("did.reg.lock"),
        }
    }
}

struct FileLockGuard {
    _file: File,
}

impl RegistrationLockGuard for FileLockGuard {}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._file);
    }
}

impl RegistrationLock for FileRegistrationLock {
    fn try_acquire(&self, _did: &str, timeout: Duration) -> Option<Box<dyn RegistrationLockGuard>> {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .ok()?;

        let deadline = Instant::now() + timeout;
        loop {
            if file.try_lock_exclusive().is_ok() {
                return Some(Box::new(FileLockGuard { _file: file }));
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// `redis`: `SET intent:did:lock:<did> NX PX 30000`, polling on failure
/// up to the caller's timeout, mirroring a `BLPOP`-style blocking wait
/// without requiring a list-based fallback key.
pub struct RedisRegistrationLock {
    client: redis::Client,
}

impl RedisRegistrationLock {
    pub fn connect(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

struct RedisLockGuard {
    client: redis::Client,
    key: String,
}

impl RegistrationLockGuard for RedisLockGuard {}

impl Drop for RedisLockGuard {
    fn drop(&mut self) {
        if let Ok(mut conn) = self.client.get_connection() {
            let _: Result<(), _> = redis::cmd("DEL").arg(&self.key).query(&mut conn);
        }
    }
}

impl RegistrationLock for RedisRegistrationLock {
    fn try_acquire(&self, did: &str, timeout: Duration) -> Option<Box<dyn RegistrationLockGuard>> {
        let key = format!("intent:did:lock:{did}");
        let mut conn = self.client.get_connection().ok()?;

        let deadline = Instant::now() + timeout;
        loop {
            let acquired: bool = redis::cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("NX")
                .arg("PX")
                .arg(REDIS_LOCK_TTL_MS)
                .query(&mut conn)
                .map(|v: Option<String>| v.is_some())
                .unwrap_or(false);

            if acquired {
                return Some(Box::new(RedisLockGuard {
                    client: self.client.clone(),
                    key,
                }));
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Builds the configured lock strategy from `INTENT_LOCK_STRATEGY` /
/// `INTENT_REDIS_URL`. Returned as an `Arc` so callers can hand it to
/// `spawn_blocking` without cloning the underlying lock state.
pub fn from_env() -> Arc<dyn RegistrationLock> {
    match std::env::var("INTENT_LOCK_STRATEGY").as_deref() {
        Ok("redis") => {
            let url = std::env::var("INTENT_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1".into());
            match RedisRegistrationLock::connect(&url) {
                Ok(lock) => Arc::new(lock),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to connect to redis lock backend, falling back to file lock");
                    Arc::new(FileRegistrationLock::default())
                }
            }
        }
        _ => Arc::new(FileRegistrationLock::default()),
    }
}
