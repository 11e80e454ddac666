//! Process-lifetime snapshot cache keyed on (location, window).
//!
//! Only successful fetches are cached. A cached snapshot is byte-for-byte the
//! one a fresh fetch returned, so estimates and audit hashes are unaffected.
//! The cache is bounded; once full, the oldest entry is evicted.

use std::collections::{HashMap, VecDeque};

use feluda_core::entities::{AnalysisWindow, EnvironmentalSnapshot};
use feluda_core::geo::GeoPoint;
use tokio::sync::Mutex;

use crate::{EnvironmentalSource, error::EnvError};

/// Coordinates are bucketed to 1e-5° (about 1 m).
const COORD_SCALE: f64 = 1e5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_e5: i64,
    lon_e5: i64,
    start: i64,
    end: i64,
}

impl CacheKey {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(location: GeoPoint, window: &AnalysisWindow) -> Self {
        Self {
            lat_e5: (location.lat * COORD_SCALE).round() as i64,
            lon_e5: (location.lon * COORD_SCALE).round() as i64,
            start: window.start.timestamp(),
            end: window.end.timestamp(),
        }
    }
}

/// Entries plus their insertion order, oldest first.
#[derive(Default)]
struct Entries {
    snapshots: HashMap<CacheKey, EnvironmentalSnapshot>,
    order: VecDeque<CacheKey>,
}

impl Entries {
    fn insert(&mut self, key: CacheKey, snapshot: EnvironmentalSnapshot, capacity: usize) {
        if self.snapshots.insert(key, snapshot).is_none() {
            self.order.push_back(key);
        }
        while self.snapshots.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.snapshots.remove(&oldest);
        }
    }
}

pub struct CachedSource<S> {
    inner: S,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl<S> CachedSource<S> {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    /// Hold at most `capacity` snapshots. A capacity of zero caches nothing.
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Same interface, no caching.
    pub fn passthrough(inner: S) -> Self {
        Self::with_capacity(inner, 0)
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.snapshots.is_empty()
    }
}

impl<S: EnvironmentalSource> EnvironmentalSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_snapshot(
        &self,
        location: GeoPoint,
        window: AnalysisWindow,
    ) -> Result<EnvironmentalSnapshot, EnvError> {
        if self.capacity == 0 {
            return self.inner.fetch_snapshot(location, window).await;
        }

        let key = CacheKey::new(location, &window);
        if let Some(hit) = self.entries.lock().await.snapshots.get(&key) {
            tracing::debug!(provider = self.inner.name(), "environmental snapshot cache hit");
            return Ok(hit.clone());
        }

        // Lock is not held across the fetch; concurrent misses may both fetch.
        let snapshot = self.inner.fetch_snapshot(location, window).await?;
        self.entries
            .lock()
            .await
            .insert(key, snapshot.clone(), self.capacity);
        Ok(snapshot)
    }
}
