// src/trending/cache.rs
//! Location-grid TTL cache for trending results.
//!
//! Keys are coarse cells (`0.05°` lat/lon, `10 km` radius bands) so nearby
//! callers share one computation. Expiry is lazy: an expired entry is
//! dropped by the lookup that finds it. TTL is absolute (no refresh on read).
//!
//! Every `invalidate_all` bumps a generation counter; a computation that
//! started before the bump stores its result with [`LocationGridCache::put_if_current`]
//! and is discarded instead of resurrecting pre-invalidation data.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::geo::GeoPoint;
use crate::models::TrendingResult;

pub const CELL_DEGREES: f64 = 0.05;
pub const RADIUS_BAND_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridKey {
    pub lat_cell: i64,
    pub lon_cell: i64,
    pub radius_band: i64,
}

impl GridKey {
    pub fn new(lat: f64, lon: f64, radius_km: f64) -> Self {
        Self {
            lat_cell: (lat / CELL_DEGREES).floor() as i64,
            lon_cell: (lon / CELL_DEGREES).floor() as i64,
            radius_band: (radius_km / RADIUS_BAND_KM).floor() as i64,
        }
    }
}

/// One computed trending list plus where and when it came from.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub results: Arc<Vec<TrendingResult>>,
    pub center: GeoPoint,
    pub radius_km: f64,
    pub cached_at: DateTime<Utc>,
    created: Instant,
}

impl CacheEntry {
    pub fn new(results: Vec<TrendingResult>, center: GeoPoint, radius_km: f64) -> Self {
        Self {
            results: Arc::new(results),
            center,
            radius_km,
            cached_at: Utc::now(),
            created: Instant::now(),
        }
    }

    /// `"lat,lon"` with four decimals, as reported to clients.
    pub fn location_label(&self) -> String {
        format!("{:.4},{:.4}", self.center.lat, self.center.lon)
    }

    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) < ttl
    }
}

/// Thread-safe grid cache shared by every request in the process.
#[derive(Debug)]
pub struct LocationGridCache {
    ttl: Duration,
    entries: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<GridKey, CacheEntry>,
    generation: u64,
}

impl LocationGridCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Current invalidation generation; pair with [`Self::put_if_current`].
    pub fn generation(&self) -> u64 {
        self.entries
            .read()
            .expect("trending cache lock poisoned")
            .generation
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any. Evicts it when expired.
    pub fn get(&self, key: &GridKey) -> Option<CacheEntry> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &GridKey, now: Instant) -> Option<CacheEntry> {
        {
            let guard = self.entries.read().expect("trending cache lock poisoned");
            match guard.map.get(key) {
                Some(e) if e.is_fresh(now, self.ttl) => return Some(e.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: re-check under the write lock, a concurrent put may have refreshed it.
        let mut guard = self.entries.write().expect("trending cache lock poisoned");
        if let Some(e) = guard.map.get(key) {
            if e.is_fresh(now, self.ttl) {
                return Some(e.clone());
            }
            guard.map.remove(key);
        }
        None
    }

    /// Unconditional overwrite.
    pub fn put(&self, key: GridKey, entry: CacheEntry) {
        self.entries
            .write()
            .expect("trending cache lock poisoned")
            .map
            .insert(key, entry);
    }

    /// Overwrite only if no invalidation happened since `generation` was read.
    /// Returns whether the entry was stored.
    pub fn put_if_current(&self, key: GridKey, entry: CacheEntry, generation: u64) -> bool {
        let mut guard = self.entries.write().expect("trending cache lock poisoned");
        if guard.generation != generation {
            return false;
        }
        guard.map.insert(key, entry);
        true
    }

    pub fn invalidate_all(&self) {
        let mut guard = self.entries.write().expect("trending cache lock poisoned");
        guard.map.clear();
        guard.generation += 1;
    }

    /// Number of stored entries, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("trending cache lock poisoned")
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CacheEntry {
        CacheEntry::new(Vec::new(), GeoPoint::new(37.7749, -122.4194), 50.0)
    }

    #[test]
    fn nearby_points_share_a_cell() {
        let a = GridKey::new(37.7749, -122.4194, 50.0);
        let b = GridKey::new(37.7800, -122.4160, 55.0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_radius_band_is_a_different_key() {
        let a = GridKey::new(37.7749, -122.4194, 50.0);
        let b = GridKey::new(37.7749, -122.4194, 60.0);
        assert_ne!(a, b);
    }

    #[test]
    fn negative_coordinates_floor_not_truncate() {
        let k = GridKey::new(-0.01, -0.01, 5.0);
        assert_eq!((k.lat_cell, k.lon_cell, k.radius_band), (-1, -1, 0));
    }

    #[test]
    fn hit_then_expired_eviction() {
        let cache = LocationGridCache::new(Duration::from_secs(60));
        let key = GridKey::new(1.0, 1.0, 10.0);
        cache.put(key, entry());

        assert!(cache.get(&key).is_some());

        let later = Instant::now() + Duration::from_secs(61);
        assert!(cache.get_at(&key, later).is_none());
        assert_eq!(cache.len(), 0, "expired entry should be evicted on lookup");
    }

    #[test]
    fn invalidate_clears_everything() {
        let cache = LocationGridCache::new(Duration::from_secs(60));
        cache.put(GridKey::new(1.0, 1.0, 10.0), entry());
        cache.put(GridKey::new(2.0, 2.0, 10.0), entry());
        assert_eq!(cache.len(), 2);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = LocationGridCache::new(Duration::ZERO);
        let key = GridKey::new(1.0, 1.0, 10.0);
        cache.put(key, entry());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn put_after_invalidation_is_discarded() {
        let cache = LocationGridCache::new(Duration::from_secs(60));
        let key = GridKey::new(1.0, 1.0, 10.0);
        let gen = cache.generation();

        // an event lands while the computation is in flight
        cache.invalidate_all();

        assert!(!cache.put_if_current(key, entry(), gen));
        assert!(cache.get(&key).is_none());

        assert!(cache.put_if_current(key, entry(), cache.generation()));
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn concurrent_put_get_invalidate() {
        let cache = Arc::new(LocationGridCache::new(Duration::from_secs(60)));
        let keys: Vec<GridKey> = (0..8).map(|i| GridKey::new(i as f64 * 0.05, 0.0, 10.0)).collect();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                let keys = keys.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = keys[(t + i) % keys.len()];
                        match i % 3 {
                            0 => cache.put(key, entry()),
                            1 => {
                                let gen = cache.generation();
                                cache.put_if_current(key, entry(), gen);
                            }
                            _ => {
                                let _ = cache.get(&key);
                            }
                        }
                        if t == 0 && i % 50 == 0 {
                            cache.invalidate_all();
                        }
                        assert!(cache.len() <= keys.len());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker thread panicked");
        }

        assert!(cache.len() <= keys.len());
        assert!(cache.generation() >= 10);
        cache.invalidate_all();
        assert!(cache.is_empty());
        for k in &keys {
            assert!(cache.get(k).is_none(), "lookup after invalidation must miss");
        }
    }

    #[test]
    fn location_label_format() {
        assert_eq!(entry().location_label(), "37.7749,-122.4194");
    }
}
