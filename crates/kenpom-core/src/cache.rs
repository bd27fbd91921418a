//! Durable on-disk cache for upstream responses.
//!
//! One JSON file per [`CacheKey`] under the cache directory. Entries are
//! written to a temporary file in the same directory and renamed over the
//! target, so readers observe either the previous entry or the new one.
//! Every cache failure degrades to a miss.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::request::ApiRequest;

/// Default time-to-live for cached responses (6 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

const ENTRY_EXTENSION: &str = "json";

/// Defines how a single request interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present;
    /// otherwise, fetch from the network and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry,
    /// and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

/// SHA-256 hex digest of a request's endpoint and name-sorted parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &ApiRequest) -> Self {
        Self::from_canonical(&request.canonical())
    }

    pub fn from_canonical(canonical: &str) -> Self {
        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached response body with its storage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    key: CacheKey,
    #[serde(with = "time::serde::rfc3339")]
    stored_at: OffsetDateTime,
    ttl_ms: u64,
    payload: String,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: impl Into<String>, stored_at: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            key,
            stored_at,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            payload: payload.into(),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }

    pub const fn stored_at(&self) -> OffsetDateTime {
        self.stored_at
    }

    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Expired once `now - stored_at > ttl`. A stored-at in the future cannot be trusted.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        let elapsed = now - self.stored_at;
        elapsed.is_negative() || elapsed.unsigned_abs() > self.ttl()
    }
}

/// Counts reported by [`ResponseCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub unreadable: usize,
    pub bytes: u64,
}

/// File-backed response cache.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: Option<PathBuf>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(root: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            root: Some(root.into()),
            default_ttl,
        }
    }

    pub fn with_default_ttl(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_TTL)
    }

    /// A cache that never stores anything and always misses.
    pub fn disabled() -> Self {
        Self {
            root: None,
            default_ttl: Duration::ZERO,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn path_for(&self, key: &CacheKey) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{}.{ENTRY_EXTENSION}", key.as_str())))
    }

    /// Returns the live entry for `key`, or `None` on any kind of miss.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, OffsetDateTime::now_utc())
    }

    pub fn get_at(&self, key: &CacheKey, now: OffsetDateTime) -> Option<CacheEntry> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    debug!(key = %key, %error, "cache entry unreadable; treating as miss");
                }
                return None;
            }
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(error) => {
                debug!(key = %key, %error, "cache entry corrupt; treating as miss");
                return None;
            }
        };

        if entry.key != *key {
            debug!(key = %key, stored = %entry.key, "cache entry key mismatch; treating as miss");
            return None;
        }

        if entry.is_expired_at(now) {
            debug!(key = %key, "cache entry expired");
            return None;
        }

        Some(entry)
    }

    /// Stores `payload` under `key`. Failures are logged and reported as `false`.
    pub fn put(&self, key: &CacheKey, payload: &str, ttl: Option<Duration>) -> bool {
        self.put_at(key, payload, ttl, OffsetDateTime::now_utc())
    }

    pub fn put_at(
        &self,
        key: &CacheKey,
        payload: &str,
        ttl: Option<Duration>,
        stored_at: OffsetDateTime,
    ) -> bool {
        let (Some(root), Some(path)) = (self.root.as_deref(), self.path_for(key)) else {
            return false;
        };

        let entry = CacheEntry::new(
            key.clone(),
            payload,
            stored_at,
            ttl.unwrap_or(self.default_ttl),
        );

        match write_atomically(root, &path, &entry) {
            Ok(()) => true,
            Err(error) => {
                warn!(key = %key, %error, "failed to write cache entry");
                false
            }
        }
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.path_for(key)
            .map(|path| fs::remove_file(path).is_ok())
            .unwrap_or(false)
    }

    /// Deletes every cache entry file; returns how many were removed.
    pub fn clear(&self) -> usize {
        self.entry_paths()
            .into_iter()
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        let now = OffsetDateTime::now_utc();
        let mut stats = CacheStats::default();

        for path in self.entry_paths() {
            let Ok(bytes) = fs::read(&path) else {
                stats.unreadable += 1;
                continue;
            };
            stats.bytes += bytes.len() as u64;

            match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => {
                    stats.entries += 1;
                    if entry.is_expired_at(now) {
                        stats.expired += 1;
                    }
                }
                Err(_) => stats.unreadable += 1,
            }
        }

        stats
    }

    fn entry_paths(&self) -> Vec<PathBuf> {
        let Some(root) = self.root.as_deref() else {
            return Vec::new();
        };
        let Ok(read_dir) = fs::read_dir(root) else {
            return Vec::new();
        };

        read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
            })
            .collect()
    }
}

fn write_atomically(root: &Path, path: &Path, entry: &CacheEntry) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let bytes = serde_json::to_vec(entry)?;

    let mut temp = NamedTempFile::new_in(root)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Endpoint;
    use tempfile::tempdir;

    fn key(name: &str) -> CacheKey {
        CacheKey::from_canonical(name)
    }

    #[test]
    fn test_cache_store_basic_operations() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));

        assert!(cache.get(&key("k1")).is_none());

        assert!(cache.put(&key("k1"), "[1]", None));
        assert_eq!(cache.get(&key("k1")).map(CacheEntry::into_payload), Some(String::from("[1]")));

        assert!(cache.put(&key("k1"), "[2]", None));
        assert_eq!(cache.get(&key("k1")).map(CacheEntry::into_payload), Some(String::from("[2]")));
    }

    #[test]
    fn key_ignores_parameter_insertion_order() {
        let a = ApiRequest::builder(Endpoint::Archive)
            .param("d", "2024-03-14")
            .param("team_id", 73)
            .param("c", "ACC")
            .build()
            .expect("valid");
        let b = ApiRequest::builder(Endpoint::Archive)
            .param("c", "ACC")
            .param("team_id", 73)
            .param("d", "2024-03-14")
            .build()
            .expect("valid");

        let key = CacheKey::for_request(&a);
        assert_eq!(key, CacheKey::for_request(&b));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn values_containing_separators_do_not_collide_with_extra_parameters() {
        let smuggled = ApiRequest::builder(Endpoint::Ratings)
            .param("c", "A&team_id=1")
            .param("y", 2024)
            .build()
            .expect("valid");
        let separate = ApiRequest::builder(Endpoint::Ratings)
            .param("c", "A")
            .param("team_id", 1)
            .param("y", 2024)
            .build()
            .expect("valid");

        assert_ne!(
            CacheKey::for_request(&smuggled),
            CacheKey::for_request(&separate)
        );
    }

    #[test]
    fn distinct_endpoints_never_share_a_key() {
        let four_factors = ApiRequest::builder(Endpoint::FourFactors).param("y", 2024).build();
        let height = ApiRequest::builder(Endpoint::Height).param("y", 2024).build();

        assert_ne!(
            CacheKey::for_request(&four_factors.expect("valid")),
            CacheKey::for_request(&height.expect("valid"))
        );
    }

    #[test]
    fn expired_entries_are_misses() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));
        let stored_at = OffsetDateTime::now_utc();

        cache.put_at(&key("k"), "[]", Some(Duration::from_secs(10)), stored_at);

        assert!(cache.get_at(&key("k"), stored_at + time::Duration::seconds(10)).is_some());
        assert!(cache.get_at(&key("k"), stored_at + time::Duration::seconds(11)).is_none());
    }

    #[test]
    fn entries_stored_in_the_future_are_misses() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));
        let now = OffsetDateTime::now_utc();

        cache.put_at(&key("k"), "[]", None, now + time::Duration::hours(1));
        assert!(cache.get_at(&key("k"), now).is_none());
    }

    #[test]
    fn truncated_file_is_a_miss_and_is_overwritten() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));
        let k = key("k");

        cache.put(&k, "[1,2,3]", None);
        let path = cache.path_for(&k).expect("enabled");
        let bytes = fs::read(&path).expect("written");
        fs::write(&path, &bytes[..bytes.len() / 2]).expect("truncate");

        assert!(cache.get(&k).is_none());

        assert!(cache.put(&k, "[4]", None));
        assert_eq!(cache.get(&k).map(CacheEntry::into_payload), Some(String::from("[4]")));
    }

    #[test]
    fn entry_under_wrong_file_name_is_a_miss() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));

        cache.put(&key("a"), "[]", None);
        let from = cache.path_for(&key("a")).expect("enabled");
        let to = cache.path_for(&key("b")).expect("enabled");
        fs::copy(from, to).expect("copy");

        assert!(cache.get(&key("b")).is_none());
    }

    #[test]
    fn put_leaves_no_temporary_files_behind() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));

        for index in 0..5 {
            cache.put(&key(&format!("k{index}")), "[]", None);
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.iter().all(|name| name.ends_with(".json")));
    }

    #[test]
    fn unwritable_root_is_swallowed() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").expect("write");
        let cache = ResponseCache::new(&file, Duration::from_secs(60));

        assert!(!cache.put(&key("k"), "[]", None));
        assert!(cache.get(&key("k")).is_none());
    }

    #[test]
    fn clear_and_stats_cover_all_entries() {
        let dir = tempdir().expect("tempdir");
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(60));
        let long_ago = OffsetDateTime::now_utc() - time::Duration::days(1);

        cache.put(&key("fresh"), "[1]", None);
        cache.put_at(&key("stale"), "[2]", None, long_ago);
        fs::write(dir.path().join("broken.json"), "{").expect("write");

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.unreadable, 1);
        assert!(stats.bytes > 0);

        assert_eq!(cache.clear(), 3);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_cache_disabled() {
        let cache = ResponseCache::disabled();

        assert!(cache.is_disabled());
        assert!(!cache.put(&key("k"), "[]", None));
        assert!(cache.get(&key("k")).is_none());
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_cache_mode_default() {
        let mode: CacheMode = Default::default();
        assert_eq!(mode, CacheMode::Use);
        assert!(!CacheMode::Refresh.reads());
        assert!(CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.writes());
    }
}
