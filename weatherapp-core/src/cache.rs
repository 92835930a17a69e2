//! Content-addressed page cache on disk.
//!
//! One file per URL, named by the URL's fingerprint. The file's modification
//! time is the only staleness signal.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tracing::debug;

use crate::error::WeatherError;

/// Stable storage key for a URL: lowercase hex SHA-256 of its bytes.
pub fn fingerprint(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// A cached page as seen on disk.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(fingerprint(url))
    }

    fn is_fresh(&self, stored_at: SystemTime, now: SystemTime) -> bool {
        // A clock that went backwards counts as fresh.
        now.duration_since(stored_at)
            .map(|age| age < self.ttl)
            .unwrap_or(true)
    }

    /// Cached bytes for `url`, if an entry exists and is younger than the TTL.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>, WeatherError> {
        self.get_at(url, SystemTime::now())
    }

    /// Like [`get`](Self::get), judging freshness against `now`.
    pub fn get_at(&self, url: &str, now: SystemTime) -> Result<Option<Vec<u8>>, WeatherError> {
        let path = self.entry_path(url);
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WeatherError::io(&path, e)),
        };
        // An empty page is never worth serving.
        if meta.len() == 0 {
            return Ok(None);
        }
        let stored_at = meta.modified().map_err(|e| WeatherError::io(&path, e))?;

        if !self.is_fresh(stored_at, now) {
            debug!(url, "cache entry expired");
            return Ok(None);
        }

        fs::read(&path)
            .map(Some)
            .map_err(|e| WeatherError::io(&path, e))
    }

    /// Write (or overwrite) the entry for `url`, creating the directory if absent.
    pub fn put(&self, url: &str, bytes: &[u8]) -> Result<(), WeatherError> {
        fs::create_dir_all(&self.dir).map_err(|e| WeatherError::io(&self.dir, e))?;
        let path = self.entry_path(url);
        fs::write(&path, bytes).map_err(|e| WeatherError::io(&path, e))
    }

    /// All entries currently on disk. A missing directory means no entries.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, WeatherError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WeatherError::io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| WeatherError::io(&self.dir, e))?;
            let path = item.path();
            let meta = item.metadata().map_err(|e| WeatherError::io(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let mtime = meta.modified().map_err(|e| WeatherError::io(&path, e))?;
            entries.push(CacheEntry {
                key: item.file_name().to_string_lossy().into_owned(),
                path,
                stored_at: DateTime::<Utc>::from(mtime),
            });
        }
        Ok(entries)
    }

    /// Delete every entry older than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> Result<usize, WeatherError> {
        self.sweep_at(SystemTime::now())
    }

    pub fn sweep_at(&self, now: SystemTime) -> Result<usize, WeatherError> {
        let mut removed = 0;
        for entry in self.entries()? {
            if self.is_fresh(entry.stored_at.into(), now) {
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => removed += 1,
                // Another process got there first.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(WeatherError::io(&entry.path, e)),
            }
        }
        if removed > 0 {
            debug!(removed, "swept stale cache entries");
        }
        Ok(removed)
    }

    /// Remove the whole cache directory. Returns the number of entries it held.
    pub fn clear(&self) -> Result<usize, WeatherError> {
        let count = self.entries()?.len();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(WeatherError::io(&self.dir, e)),
        }
    }
}
