use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::client::FetchError;
use super::types::{Coordinates, UnitSystem};

/// Cache identity of a coordinate pair: exact bit equality, no rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl From<Coordinates> for CoordKey {
    fn from(coords: Coordinates) -> Self {
        Self {
            lat_bits: coords.lat.to_bits(),
            lon_bits: coords.lon.to_bits(),
        }
    }
}

/// Key for resources whose payload depends on the unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeatherKey {
    pub coords: CoordKey,
    pub unit: UnitSystem,
}

impl WeatherKey {
    pub fn new(coords: Coordinates, unit: UnitSystem) -> Self {
        Self {
            coords: coords.into(),
            unit,
        }
    }
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

struct Slot<V> {
    state: tokio::sync::Mutex<Option<Entry<V>>>,
}

/// Keyed single-flight cache. Each key owns one slot whose async mutex
/// serializes check-freshness, fetch, and store: a second caller arriving
/// while a fetch is in flight waits on the mutex and then reads the stored
/// value instead of issuing its own request.
pub struct QueryCache<K, V> {
    stale_after: Duration,
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value when it is younger than the staleness
    /// window, otherwise runs `fetch` and stores the result. `refresh`
    /// bypasses the freshness check but still coalesces with concurrent
    /// callers for the same key.
    pub async fn get_with<F, Fut>(&self, key: K, refresh: bool, fetch: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let slot = {
            let mut slots = self.slots.lock().expect("cache mutex poisoned");
            Arc::clone(slots.entry(key).or_insert_with(|| {
                Arc::new(Slot {
                    state: tokio::sync::Mutex::new(None),
                })
            }))
        };

        let mut state = slot.state.lock().await;

        if !refresh {
            if let Some(entry) = state.as_ref() {
                if entry.fetched_at.elapsed() < self.stale_after {
                    return Ok(entry.value.clone());
                }
            }
        }

        let value = fetch().await?;
        *state = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drops the entry for `key`. The next caller re-fetches.
    pub fn invalidate(&self, key: &K) {
        self.slots
            .lock()
            .expect("cache mutex poisoned")
            .remove(key);
    }

    /// Removes entries past their staleness window. Slots with a fetch in
    /// flight are left for the next sweep.
    pub fn evict_expired(&self) {
        let mut slots = self.slots.lock().expect("cache mutex poisoned");
        slots.retain(|_, slot| match slot.state.try_lock() {
            Ok(state) => match state.as_ref() {
                Some(entry) => entry.fetched_at.elapsed() < self.stale_after,
                None => false,
            },
            Err(_) => true,
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().expect("cache mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(lat: f64, lon: f64) -> CoordKey {
        Coordinates::new(lat, lon).into()
    }

    #[tokio::test]
    async fn second_fetch_within_window_is_served_from_cache() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for _ in 0..2 {
            let value = cache
                .get_with(key(40.7, -74.0), false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_is_refetched() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = || {
            cache.get_with(key(1.0, 2.0), false, move || async move {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
        };

        assert_eq!(fetch().await.unwrap(), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fetch().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_forces_refetch_of_fresh_entry() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = |refresh| {
            cache.get_with(key(1.0, 2.0), refresh, move || async move {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
        };

        assert_eq!(fetch(false).await.unwrap(), 0);
        assert_eq!(fetch(true).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache: Arc<QueryCache<CoordKey, u32>> =
            Arc::new(QueryCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_with(key(40.7, -74.0), false, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(99)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let err = cache
            .get_with(key(1.0, 1.0), false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Provider {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            })
            .await;
        assert!(err.is_err());

        let value = cache
            .get_with(key(1.0, 1.0), false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(5)
            })
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_drops_the_entry() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = || {
            cache.get_with(key(1.0, 2.0), false, move || async move {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
        };

        assert_eq!(fetch().await.unwrap(), 0);
        cache.invalidate(&key(1.0, 2.0));
        assert_eq!(fetch().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn evict_expired_sweeps_only_stale_entries() {
        let cache: QueryCache<CoordKey, u32> = QueryCache::new(Duration::from_millis(30));

        cache
            .get_with(key(1.0, 1.0), false, || async { Ok(1) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache
            .get_with(key(2.0, 2.0), false, || async { Ok(2) })
            .await
            .unwrap();

        cache.evict_expired();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn coordinate_keys_compare_numerically_without_rounding() {
        assert_eq!(key(40.7, -74.0), key(40.7, -74.0));
        assert_ne!(key(40.7, -74.0), key(40.700001, -74.0));
        assert_ne!(key(40.7, -74.0), key(40.7, -74.000001));
    }
}
