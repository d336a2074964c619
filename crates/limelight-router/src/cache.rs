//! Durable client-side route cache.
//!
//! Two string-keyed entries, no expiry. The records are advisory caches
//! of re-derivable state, not sources of truth: concurrent routing flows
//! may race on them and last-writer-wins is acceptable.

use limelight_proto::CachedTunnelRef;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Key for the JSON-serialized cached tunnel reference.
pub const TUNNEL_DEF_KEY: &str = "tunnel-def";

/// Key for the last provisioned worker ingress hostname.
pub const WORKER_HOSTNAME_KEY: &str = "worker-hostname";

/// String-keyed advisory cache.
pub trait RouteCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory cache for tests and single-shot flows.
#[derive(Default)]
pub struct MemoryRouteCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryRouteCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteCache for MemoryRouteCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// JSON-file-backed cache: one flat string map, rewritten on each
/// mutation. Persistence is best effort; a write failure costs a
/// re-derivation on the next routing attempt, nothing more.
pub struct FileRouteCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileRouteCache {
    /// Load the cache at `path`, starting empty when the file is missing
    /// or unreadable.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "route cache unreadable; starting empty");
                HashMap::new()
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(error) => return Err(error),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let raw = match serde_json::to_string_pretty(entries) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "route cache serialization failed");
                return;
            }
        };
        if let Err(error) = std::fs::write(&self.path, raw) {
            warn!(path = %self.path.display(), %error, "route cache write failed");
        }
    }
}

impl RouteCache for FileRouteCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.persist(&entries);
    }
}

/// Read and decode the cached tunnel reference. Undecodable records are
/// dropped as if absent.
pub fn cached_tunnel_ref(cache: &dyn RouteCache) -> Option<CachedTunnelRef> {
    let raw = cache.get(TUNNEL_DEF_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(reference) => Some(reference),
        Err(error) => {
            warn!(%error, "dropping undecodable cached tunnel reference");
            cache.remove(TUNNEL_DEF_KEY);
            None
        }
    }
}

/// Persist a tunnel reference for the next routing attempt.
pub fn store_tunnel_ref(cache: &dyn RouteCache, reference: &CachedTunnelRef) {
    match serde_json::to_string(reference) {
        Ok(raw) => cache.set(TUNNEL_DEF_KEY, &raw),
        Err(error) => warn!(%error, "could not serialize tunnel reference"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ref() -> CachedTunnelRef {
        CachedTunnelRef {
            tunnel_id: "tnl-9".to_string(),
            name: "quiet-lake".to_string(),
            cluster_id: "usw2".to_string(),
            port: 8000,
            host_token: None,
        }
    }

    #[test]
    fn memory_cache_round_trips_entries() {
        let cache = MemoryRouteCache::new();
        cache.set(WORKER_HOSTNAME_KEY, "w7.example");
        assert_eq!(
            cache.get(WORKER_HOSTNAME_KEY).as_deref(),
            Some("w7.example")
        );
        cache.remove(WORKER_HOSTNAME_KEY);
        assert!(cache.get(WORKER_HOSTNAME_KEY).is_none());
    }

    #[test]
    fn tunnel_ref_round_trips_through_cache() {
        let cache = MemoryRouteCache::new();
        store_tunnel_ref(&cache, &sample_ref());
        assert_eq!(cached_tunnel_ref(&cache), Some(sample_ref()));
    }

    #[test]
    fn undecodable_tunnel_ref_is_dropped() {
        let cache = MemoryRouteCache::new();
        cache.set(TUNNEL_DEF_KEY, "{not json");
        assert!(cached_tunnel_ref(&cache).is_none());
        // the bad record is gone, not re-surfaced
        assert!(cache.get(TUNNEL_DEF_KEY).is_none());
    }

    #[test]
    fn file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route-cache.json");

        let cache = FileRouteCache::open(&path).unwrap();
        store_tunnel_ref(&cache, &sample_ref());
        cache.set(WORKER_HOSTNAME_KEY, "w7.example");
        drop(cache);

        let reopened = FileRouteCache::open(&path).unwrap();
        assert_eq!(cached_tunnel_ref(&reopened), Some(sample_ref()));
        assert_eq!(
            reopened.get(WORKER_HOSTNAME_KEY).as_deref(),
            Some("w7.example")
        );
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileRouteCache::open(dir.path().join("absent.json")).unwrap();
        assert!(cache.get(TUNNEL_DEF_KEY).is_none());
    }
}
