//! File-backed cache for API responses.
//!
//! Each entry lives in `{dir}/{hash}.json` where `hash` is the FNV-1a digest of
//! the logical request key. Entries expire by file modification time and are
//! never deleted; a stale file stays until the next write replaces it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CacheConfig;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Cache lookup and storage failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry has been written for this key.
    #[error("No cache entry at {}", .0.display())]
    NotFound(PathBuf),

    /// Entry exists but is older than the configured expiry.
    #[error("Cache entry {} has expired ({age_days} days old)", .path.display())]
    Expired { path: PathBuf, age_days: i64 },

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// True for the two outcomes that simply mean "fetch it live".
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired { .. })
    }
}

/// 32-bit FNV-1a over the UTF-16 code units of `input`, as 8 lowercase hex digits.
pub fn hash(input: &str) -> String {
    let digest = input.encode_utf16().fold(FNV_OFFSET_BASIS, |hval, unit| {
        (hval ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    });
    format!("{:08x}", digest)
}

/// Hash-keyed JSON cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
    expire_days: i64,
}

impl ContentCache {
    /// Create a cache in `dir` whose entries stay valid for `expire_days` whole days.
    pub fn new(dir: impl Into<PathBuf>, expire_days: i64) -> Self {
        Self {
            dir: dir.into(),
            expire_days,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.resolved_dir(), config.expire)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `hash`.
    pub fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }

    /// Read a cached payload.
    ///
    /// Fails with [`CacheError::NotFound`] if nothing was written, or
    /// [`CacheError::Expired`] if the file is more than `expire_days` whole days
    /// old. An entry exactly `expire_days` old is still served.
    pub async fn read<T: DeserializeOwned>(&self, hash: &str) -> Result<T, CacheError> {
        let path = self.entry_path(hash);
        let age_days = match age_in_days(&path).await {
            Ok(age) => age,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::NotFound(path)),
            Err(e) => return Err(e.into()),
        };

        if age_days > self.expire_days {
            return Err(CacheError::Expired { path, age_days });
        }

        let contents = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Write `data` under `hash` and hand it back.
    pub async fn write<T: Serialize>(&self, hash: &str, data: T) -> Result<T, CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.entry_path(hash);
        let contents = serde_json::to_vec_pretty(&data)?;
        tokio::fs::write(&path, contents).await?;
        debug!("Cached {}", path.display());
        Ok(data)
    }
}

/// Whole days since the file was last modified, truncated toward zero.
async fn age_in_days(path: &Path) -> std::io::Result<i64> {
    let modified = tokio::fs::metadata(path).await?.modified()?;
    let modified: DateTime<Utc> = modified.into();
    Ok((Utc::now() - modified).num_days())
}
