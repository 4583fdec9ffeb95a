//! Search pipeline orchestration.
//!
//! A [`SearchSession`] owns everything one application instance needs to
//! answer searches: the facility catalog, the upstream providers, the result
//! cache, and the result view of the most recent search.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, RouteKey, SearchCache};
use crate::domain::{LatLng, SpecialtyCode, SpecialtyFilterMode, TransitOptions, TravelMode};
use crate::geocode::{GeocodeError, Geocoder};
use crate::repository::{CatalogSnapshot, FacilityCatalog, IngestReport, RepositoryError};
use crate::routing::TransitRoute;
use crate::spatial::IndexStats;

use super::config::SearchConfig;
use super::estimate::estimate_radius_km;
use super::filter::filter_by_specialty;
use super::rank::{Page, ResultView, SortKey};
use super::refine::{RefineStats, Refiner, TravelTimeProvider};
use super::result::{ReachabilityResult, TravelEstimate};

/// Largest accepted time budget, in minutes.
pub const MAX_MINUTES: u32 = 24 * 60;

/// Error from a search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Invalid search request
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// Origin address could not be resolved
    #[error("geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    /// A newer search started before this one finished
    #[error("superseded by a newer search")]
    Superseded,

    /// Paging or sorting with no completed search
    #[error("no search results available")]
    NoActiveSearch,
}

/// Request for facility search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text origin address.
    pub address: String,

    pub mode: TravelMode,

    /// Travel-time budget in minutes.
    pub max_minutes: u32,

    #[serde(default)]
    pub specialties: BTreeSet<SpecialtyCode>,

    #[serde(default)]
    pub filter_mode: SpecialtyFilterMode,
}

impl SearchRequest {
    /// Create a new search request with no specialty selection.
    pub fn new(address: impl Into<String>, mode: TravelMode, max_minutes: u32) -> Self {
        Self {
            address: address.into(),
            mode,
            max_minutes,
            specialties: BTreeSet::new(),
            filter_mode: SpecialtyFilterMode::default(),
        }
    }

    pub fn with_specialties(
        mut self,
        specialties: BTreeSet<SpecialtyCode>,
        filter_mode: SpecialtyFilterMode,
    ) -> Self {
        self.specialties = specialties;
        self.filter_mode = filter_mode;
        self
    }

    /// Validate the search request.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.address.trim().is_empty() {
            return Err(SearchError::InvalidRequest(
                "origin address is empty".to_string(),
            ));
        }

        if self.max_minutes == 0 || self.max_minutes > MAX_MINUTES {
            return Err(SearchError::InvalidRequest(format!(
                "time budget must be between 1 and {MAX_MINUTES} minutes"
            )));
        }

        self.mode
            .validate()
            .map_err(|e| SearchError::InvalidRequest(e.to_string()))
    }

    /// The request signature used as the result cache key.
    pub fn key(&self) -> SearchKey {
        SearchKey {
            address: self.address.trim().to_string(),
            mode: self.mode,
            max_minutes: self.max_minutes,
            specialties: self.specialties.clone(),
            filter_mode: self.filter_mode,
        }
    }
}

/// Canonical request signature.
///
/// Specialties are held in a sorted set, so selection order never produces
/// a distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchKey {
    pub address: String,
    pub mode: TravelMode,
    pub max_minutes: u32,
    pub specialties: BTreeSet<SpecialtyCode>,
    pub filter_mode: SpecialtyFilterMode,
}

impl SearchKey {
    /// Canonical serialized form.
    pub fn canonical(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Why a search ended the way it did. Empty outcomes are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    /// Nothing within the estimated radius.
    NoNearbyFacilities,
    /// Facilities nearby, but none with the selected specialties.
    NoSpecialtyMatch,
    /// Candidates were refined, none within the time budget.
    NoneWithinBudget,
    /// Transit refinement was abandoned before anything qualified.
    ModeUnreliable,
}

/// Candidate counts surviving each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Funnel {
    pub nearby: usize,
    pub after_specialty: usize,
    pub queried: usize,
}

/// A completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub key: SearchKey,
    pub origin: LatLng,
    /// The origin is the configured fallback, not the geocoded address.
    pub approximate_origin: bool,
    pub radius_km: f64,
    /// Reachable facilities, ascending by primary duration.
    pub results: Vec<ReachabilityResult>,
    pub status: MatchStatus,
    pub funnel: Funnel,
    pub stats: RefineStats,
}

impl SearchOutcome {
    /// Built from partial upstream answers or an approximate origin.
    ///
    /// Degraded outcomes are still cached, with a shorter lifetime.
    pub fn is_degraded(&self) -> bool {
        self.approximate_origin || self.stats.is_degraded()
    }

    pub fn mode_unreliable(&self) -> bool {
        self.stats.transit_aborted
    }
}

/// Facility search for one application instance.
pub struct SearchSession<P, G> {
    provider: P,
    geocoder: G,
    catalog: FacilityCatalog,
    cache: SearchCache,
    config: SearchConfig,
    generation: AtomicU64,
    view: Mutex<Option<ResultView>>,
}

impl<P, G> SearchSession<P, G>
where
    P: TravelTimeProvider + Sync,
    G: Geocoder + Sync,
{
    pub fn new(
        provider: P,
        geocoder: G,
        catalog: FacilityCatalog,
        cache_config: &CacheConfig,
        config: SearchConfig,
    ) -> Self {
        Self {
            provider,
            geocoder,
            catalog,
            cache: SearchCache::new(cache_config),
            config,
            generation: AtomicU64::new(0),
            view: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn catalog(&self) -> &FacilityCatalog {
        &self.catalog
    }

    /// Run a search and make it the current result view.
    ///
    /// Identical requests are answered from the cache without touching the
    /// travel-time provider. Returns the first page of results. If a newer
    /// search starts before this one finishes, this one returns
    /// [`SearchError::Superseded`] and the view is left to the newer one.
    pub async fn search(&self, request: &SearchRequest) -> Result<Page, SearchError> {
        request.validate()?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let key = request.key();

        let snapshot = self.catalog.snapshot().await;
        let catalog = snapshot.generation;

        let outcome = match self.cache.get(catalog, &key).await {
            Some(hit) => {
                debug!(address = %key.address, "Search cache hit");
                hit
            }
            None => self.run_coalesced(request, key, snapshot).await?,
        };

        let mut view = self.view.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            info!(generation, "Search superseded, discarding results");
            return Err(SearchError::Superseded);
        }

        let mut fresh = ResultView::new(outcome, self.config.page_size);
        let page = fresh.reveal_next();
        *view = Some(fresh);

        Ok(page)
    }

    /// Reveal the next page of the current search.
    pub async fn more(&self) -> Result<Page, SearchError> {
        let mut view = self.view.lock().await;
        let view = view.as_mut().ok_or(SearchError::NoActiveSearch)?;
        Ok(view.reveal_next())
    }

    /// Re-sort the current results and reveal the first page again.
    pub async fn resort(&self, sort: SortKey) -> Result<Page, SearchError> {
        let mut view = self.view.lock().await;
        let view = view.as_mut().ok_or(SearchError::NoActiveSearch)?;
        view.resort(sort);
        Ok(view.reveal_next())
    }

    /// Reload the facility set and drop every cached outcome.
    pub async fn reload_facilities(&self) -> Result<IngestReport, RepositoryError> {
        let report = self.catalog.refresh().await?;
        self.cache.invalidate_all();
        info!(
            valid = report.valid,
            invalid = report.invalid(),
            "Facilities reloaded, search cache cleared"
        );
        Ok(report)
    }

    /// Transit route details for each item of `page`, in item order.
    ///
    /// Only TRANSIT searches get details, and only for results that were
    /// routed by transit. Lookups run concurrently and the provider bounds
    /// how many are in flight. A failed lookup leaves its item without
    /// details and is not cached.
    pub async fn route_details(&self, page: &Page) -> Vec<Option<Arc<TransitRoute>>> {
        let TravelMode::Transit(options) = page.outcome.key.mode else {
            return vec![None; page.items.len()];
        };
        let origin = page.outcome.origin;

        let lookups = page.items.iter().map(|item| async move {
            match item.estimate {
                TravelEstimate::Direct { .. } => {
                    self.route_detail(origin, item.facility.location, options).await
                }
                _ => None,
            }
        });

        join_all(lookups).await
    }

    async fn route_detail(
        &self,
        origin: LatLng,
        destination: LatLng,
        options: TransitOptions,
    ) -> Option<Arc<TransitRoute>> {
        let key = RouteKey::new(origin, destination, options);
        if let Some(hit) = self.cache.route(&key).await {
            return Some(hit);
        }

        let lookup = self.provider.transit_route(origin, destination, options);
        match tokio::time::timeout(self.config.call_timeout, lookup).await {
            Ok(Ok(Some(route))) => {
                let route = Arc::new(route);
                self.cache.insert_route(key, route.clone()).await;
                Some(route)
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                warn!(destination = %destination, error = %e, "Transit route lookup failed");
                None
            }
            Err(_) => {
                warn!(destination = %destination, "Transit route lookup timed out");
                None
            }
        }
    }

    pub async fn index_stats(&self) -> IndexStats {
        self.catalog.snapshot().await.index.stats()
    }

    /// Refine through the cache so concurrent identical requests share one
    /// run.
    async fn run_coalesced(
        &self,
        request: &SearchRequest,
        key: SearchKey,
        snapshot: Arc<CatalogSnapshot>,
    ) -> Result<Arc<SearchOutcome>, SearchError> {
        let catalog = snapshot.generation;
        debug!(
            key = %key.canonical().unwrap_or_default(),
            catalog,
            "Search cache miss"
        );

        let init = async {
            let outcome = self.run(request, key.clone(), &snapshot).await?;
            if outcome.is_degraded() {
                debug!(address = %key.address, "Caching degraded outcome briefly");
            }
            Ok::<_, SearchError>(Arc::new(outcome))
        };

        self.cache
            .try_get_with(catalog, key.clone(), init)
            .await
            .map_err(|e| (*e).clone())
    }

    /// The pipeline proper: geocode, radius, index, specialty, refine.
    async fn run(
        &self,
        request: &SearchRequest,
        key: SearchKey,
        snapshot: &CatalogSnapshot,
    ) -> Result<SearchOutcome, SearchError> {
        let (origin, approximate_origin) = self.resolve_origin(&key.address).await?;

        let radius_km = estimate_radius_km(request.max_minutes, request.mode.kind());

        let nearby = snapshot.index.find_nearby(&origin, radius_km);
        let nearby_count = nearby.len();

        let candidates = filter_by_specialty(nearby, &request.specialties, request.filter_mode);
        let after_specialty = candidates.len();

        debug!(
            origin = %origin,
            radius_km,
            nearby = nearby_count,
            after_specialty,
            "Candidates selected"
        );

        let (results, stats, status) = if nearby_count == 0 {
            (Vec::new(), RefineStats::default(), MatchStatus::NoNearbyFacilities)
        } else if after_specialty == 0 {
            (Vec::new(), RefineStats::default(), MatchStatus::NoSpecialtyMatch)
        } else {
            let refinement = Refiner::new(&self.provider, &self.config)
                .refine(origin, candidates, &request.mode, request.max_minutes)
                .await;

            let status = if !refinement.results.is_empty() {
                MatchStatus::Found
            } else if refinement.stats.transit_aborted {
                MatchStatus::ModeUnreliable
            } else {
                MatchStatus::NoneWithinBudget
            };

            (refinement.results, refinement.stats, status)
        };

        Ok(SearchOutcome {
            funnel: Funnel {
                nearby: nearby_count,
                after_specialty,
                queried: stats.queried,
            },
            key,
            origin,
            approximate_origin,
            radius_km,
            results,
            status,
            stats,
        })
    }

    /// Geocode the origin, falling back to the configured point only when
    /// the provider itself failed.
    async fn resolve_origin(&self, address: &str) -> Result<(LatLng, bool), SearchError> {
        match self.geocoder.geocode(address).await {
            Ok(point) => Ok((point, false)),
            Err(e) if e.is_upstream_failure() => match self.config.fallback_origin {
                Some(fallback) => {
                    warn!(
                        error = %e,
                        fallback = %fallback,
                        "Geocoding failed, using fallback origin"
                    );
                    Ok((fallback, true))
                }
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }
}
