//! Per-process caches of search outcomes and transit route details.
//!
//! Outcomes are keyed by the canonical request signature together with the
//! catalog generation they were computed against, so a run that straddles
//! a facility reload can never be served for the reloaded catalog. A reload
//! also clears the whole cache.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache as MokaCache;

use crate::domain::{LatLng, TransitOptions};
use crate::planner::{SearchKey, SearchOutcome};
use crate::routing::TransitRoute;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for complete outcomes. `None` keeps them for the process lifetime.
    pub ttl: Option<Duration>,

    /// TTL for outcomes built from partial upstream answers or an
    /// approximate origin.
    pub degraded_ttl: Duration,

    /// TTL for transit route details.
    pub route_ttl: Duration,

    /// Maximum number of cached entries, per cache.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_degraded_ttl(mut self, ttl: Duration) -> Self {
        self.degraded_ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            degraded_ttl: Duration::from_secs(5 * 60),
            route_ttl: Duration::from_secs(10 * 60),
            max_capacity: 500,
        }
    }
}

type OutcomeKey = (u64, SearchKey);

/// Per-entry lifetime: degraded outcomes expire early.
struct OutcomeExpiry {
    ttl: Option<Duration>,
    degraded_ttl: Duration,
}

impl Expiry<OutcomeKey, Arc<SearchOutcome>> for OutcomeExpiry {
    fn expire_after_create(
        &self,
        _key: &OutcomeKey,
        value: &Arc<SearchOutcome>,
        _created_at: Instant,
    ) -> Option<Duration> {
        if value.is_degraded() {
            Some(self.ttl.map_or(self.degraded_ttl, |ttl| ttl.min(self.degraded_ttl)))
        } else {
            self.ttl
        }
    }
}

/// Identity of one transit route lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    origin: (u64, u64),
    destination: (u64, u64),
    options: TransitOptions,
}

impl RouteKey {
    pub fn new(origin: LatLng, destination: LatLng, options: TransitOptions) -> Self {
        let bits = |p: LatLng| (p.lat().to_bits(), p.lng().to_bits());
        Self {
            origin: bits(origin),
            destination: bits(destination),
            options,
        }
    }
}

/// Cache for completed search outcomes.
pub struct SearchCache {
    outcomes: MokaCache<OutcomeKey, Arc<SearchOutcome>>,
    routes: MokaCache<RouteKey, Arc<TransitRoute>>,
}

impl SearchCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let outcomes = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(OutcomeExpiry {
                ttl: config.ttl,
                degraded_ttl: config.degraded_ttl,
            })
            .build();

        let routes = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.route_ttl)
            .build();

        Self { outcomes, routes }
    }

    /// Cached outcome for `key` computed against catalog generation `catalog`.
    pub async fn get(&self, catalog: u64, key: &SearchKey) -> Option<Arc<SearchOutcome>> {
        self.outcomes.get(&(catalog, key.clone())).await
    }

    pub async fn insert(&self, catalog: u64, key: SearchKey, outcome: Arc<SearchOutcome>) {
        self.outcomes.insert((catalog, key), outcome).await;
    }

    /// Return the cached outcome, or run `init` once for all concurrent
    /// callers with the same key. Nothing is stored when `init` fails.
    pub async fn try_get_with<F, E>(
        &self,
        catalog: u64,
        key: SearchKey,
        init: F,
    ) -> Result<Arc<SearchOutcome>, Arc<E>>
    where
        F: Future<Output = Result<Arc<SearchOutcome>, E>>,
        E: Send + Sync + 'static,
    {
        self.outcomes.try_get_with((catalog, key), init).await
    }

    pub async fn route(&self, key: &RouteKey) -> Option<Arc<TransitRoute>> {
        self.routes.get(key).await
    }

    pub async fn insert_route(&self, key: RouteKey, route: Arc<TransitRoute>) {
        self.routes.insert(key, route).await;
    }

    /// Number of cached outcomes (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.outcomes.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.outcomes.invalidate_all();
        self.routes.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SpecialtyFilterMode, TravelMode};
    use crate::planner::{Funnel, MatchStatus, RefineStats};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(address: &str) -> SearchKey {
        SearchKey {
            address: address.to_string(),
            mode: TravelMode::Walk,
            max_minutes: 15,
            specialties: BTreeSet::new(),
            filter_mode: SpecialtyFilterMode::Any,
        }
    }

    fn outcome(address: &str) -> Arc<SearchOutcome> {
        Arc::new(SearchOutcome {
            key: key(address),
            origin: LatLng::new(35.0, 139.0).unwrap(),
            approximate_origin: false,
            radius_km: 1.3,
            results: Vec::new(),
            status: MatchStatus::NoNearbyFacilities,
            funnel: Funnel::default(),
            stats: RefineStats::default(),
        })
    }

    fn degraded(address: &str) -> Arc<SearchOutcome> {
        let mut outcome = (*outcome(address)).clone();
        outcome.stats.batches_failed = 1;
        Arc::new(outcome)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = SearchCache::new(&CacheConfig::default());
        assert!(cache.get(0, &key("a")).await.is_none());

        cache.insert(0, key("a"), outcome("a")).await;
        let hit = cache.get(0, &key("a")).await.unwrap();
        assert_eq!(hit.key.address, "a");
        assert!(cache.get(0, &key("b")).await.is_none());
    }

    #[tokio::test]
    async fn catalog_generation_is_part_of_the_key() {
        let cache = SearchCache::new(&CacheConfig::default());
        cache.insert(0, key("a"), outcome("a")).await;

        assert!(cache.get(0, &key("a")).await.is_some());
        assert!(cache.get(1, &key("a")).await.is_none());
    }

    #[tokio::test]
    async fn try_get_with_runs_init_once() {
        let cache = SearchCache::new(&CacheConfig::default());
        let runs = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .try_get_with(0, key("a"), async {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>(outcome("a"))
                })
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_init_is_not_stored() {
        let cache = SearchCache::new(&CacheConfig::default());

        let result = cache
            .try_get_with(0, key("a"), async {
                Err::<Arc<SearchOutcome>, _>(std::io::Error::other("boom"))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.get(0, &key("a")).await.is_none());
    }

    #[tokio::test]
    async fn degraded_outcomes_expire_early() {
        let config = CacheConfig::default().with_degraded_ttl(Duration::from_millis(50));
        let cache = SearchCache::new(&config);

        cache.insert(0, key("partial"), degraded("partial")).await;
        cache.insert(0, key("complete"), outcome("complete")).await;
        assert!(cache.get(0, &key("partial")).await.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.get(0, &key("partial")).await.is_none());
        assert!(cache.get(0, &key("complete")).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let cache = SearchCache::new(&CacheConfig::default());
        cache.insert(0, key("a"), outcome("a")).await;
        let route_key = RouteKey::new(
            LatLng::new(35.0, 139.0).unwrap(),
            LatLng::new(35.1, 139.1).unwrap(),
            TransitOptions::default(),
        );
        cache
            .insert_route(route_key.clone(), Arc::new(TransitRoute::default()))
            .await;

        cache.invalidate_all();
        assert!(cache.get(0, &key("a")).await.is_none());
        assert!(cache.route(&route_key).await.is_none());
    }
}
