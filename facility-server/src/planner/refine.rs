//! Reachability refinement against a travel-time provider.
//!
//! Candidates arrive sorted by straight-line distance. The refiner caps them
//! to the nearest N, splits them into batches no larger than the provider's
//! per-call limit, and queries real travel times one batch at a time. A
//! failed call costs only the destinations it carried; refinement itself
//! never fails.

use std::future::Future;
use std::time::Duration;

use futures::future::join;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{DriveOptions, LatLng, TransitOptions, TravelMode};
use crate::routing::{
    ElementOutcome, MatrixQuery, QueryMode, RoutingError, TransitRoute, TravelLeg,
};
use crate::spatial::Nearby;

use super::config::SearchConfig;
use super::result::{ReachabilityResult, TravelEstimate};

/// Trait for providing travel times.
///
/// This abstraction allows the refiner to be tested with mock data.
pub trait TravelTimeProvider {
    /// Travel times from one origin to each destination, in request order.
    fn travel_times(
        &self,
        query: &MatrixQuery<'_>,
    ) -> impl Future<Output = Result<Vec<ElementOutcome>, RoutingError>> + Send;

    /// Step-by-step transit route, for providers that can give one.
    fn transit_route(
        &self,
        _origin: LatLng,
        _destination: LatLng,
        _options: TransitOptions,
    ) -> impl Future<Output = Result<Option<TransitRoute>, RoutingError>> + Send {
        async { Ok(None) }
    }
}

/// Counters describing how refinement went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefineStats {
    /// Candidates handed to the refiner, before the cap.
    pub candidates_in: usize,
    /// Candidates kept by the cap.
    pub queried: usize,
    /// Upstream calls issued.
    pub calls: usize,
    pub batches: usize,
    /// Batches with no usable answer at all.
    pub batches_failed: usize,
    /// Failed calls that did not sink their batch: one DRIVE variant, or a
    /// walking fallback.
    pub partial_failures: usize,
    /// Destinations the provider had no route for.
    pub destinations_failed: usize,
    /// Results obtained from the walking fallback.
    pub fallbacks: usize,
    /// Transit refinement stopped early after consecutive failures.
    pub transit_aborted: bool,
}

impl RefineStats {
    /// Whether some upstream calls failed, so the results may be incomplete.
    pub fn is_degraded(&self) -> bool {
        self.batches_failed > 0 || self.partial_failures > 0 || self.transit_aborted
    }
}

/// Refinement output: results sorted by primary duration, plus stats.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub results: Vec<ReachabilityResult>,
    pub stats: RefineStats,
}

/// Inserts a fixed delay before every call but the first.
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Answer from one DRIVE variant of a batch.
enum Variant {
    Skipped,
    Failed,
    Answered(Vec<ElementOutcome>),
}

impl Variant {
    fn leg(&self, index: usize) -> Option<TravelLeg> {
        match self {
            Variant::Answered(outcomes) => outcomes.get(index).and_then(|o| o.leg().cloned()),
            Variant::Skipped | Variant::Failed => None,
        }
    }
}

/// Batched travel-time refinement for one search.
pub struct Refiner<'a, P> {
    provider: &'a P,
    config: &'a SearchConfig,
}

impl<'a, P: TravelTimeProvider + Sync> Refiner<'a, P> {
    pub fn new(provider: &'a P, config: &'a SearchConfig) -> Self {
        Self { provider, config }
    }

    /// Keep the candidates reachable within `max_minutes`, sorted ascending
    /// by primary duration (ties keep straight-line order).
    pub async fn refine(
        &self,
        origin: LatLng,
        mut candidates: Vec<Nearby>,
        mode: &TravelMode,
        max_minutes: u32,
    ) -> Refinement {
        let budget_secs = u64::from(max_minutes) * 60;
        let mut stats = RefineStats {
            candidates_in: candidates.len(),
            ..RefineStats::default()
        };

        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        candidates.truncate(self.config.candidate_cap(mode.kind()));
        stats.queried = candidates.len();

        if candidates.len() < stats.candidates_in {
            debug!(
                candidates = stats.candidates_in,
                kept = stats.queried,
                "Capped candidates to nearest"
            );
        }

        let mut pacer = Pacer::new(self.config.pacing_for(mode.kind()));

        let mut results = match mode {
            TravelMode::Drive(options) => {
                let options = *options;
                self.refine_drive(origin, &candidates, options, budget_secs, &mut pacer, &mut stats)
                    .await
            }
            TravelMode::Transit(options) => {
                let options = *options;
                let (pacer, stats) = (&mut pacer, &mut stats);
                self.refine_transit(origin, &candidates, options, budget_secs, pacer, stats)
                    .await
            }
            TravelMode::Walk => {
                let (pacer, stats) = (&mut pacer, &mut stats);
                self.refine_direct(origin, &candidates, QueryMode::Walk, budget_secs, pacer, stats)
                    .await
            }
            TravelMode::Bicycle => {
                let mode = QueryMode::Bicycle;
                let (pacer, stats) = (&mut pacer, &mut stats);
                self.refine_direct(origin, &candidates, mode, budget_secs, pacer, stats)
                    .await
            }
        };

        results.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

        info!(
            mode = %mode.kind(),
            queried = stats.queried,
            reachable = results.len(),
            calls = stats.calls,
            batches_failed = stats.batches_failed,
            fallbacks = stats.fallbacks,
            transit_aborted = stats.transit_aborted,
            "Refinement complete"
        );

        Refinement { results, stats }
    }

    /// One upstream call, bounded by the configured timeout.
    async fn call(&self, query: &MatrixQuery<'_>) -> Result<Vec<ElementOutcome>, RoutingError> {
        let pending = self.provider.travel_times(query);
        let outcomes = tokio::time::timeout(self.config.call_timeout, pending)
            .await
            .map_err(|_| RoutingError::Timeout)??;

        if outcomes.len() != query.destinations.len() {
            return Err(RoutingError::MalformedResponse(format!(
                "expected {} outcomes, got {}",
                query.destinations.len(),
                outcomes.len()
            )));
        }

        Ok(outcomes)
    }

    async fn drive_variant(
        &self,
        enabled: bool,
        origin: LatLng,
        destinations: &[LatLng],
        avoid_highways: bool,
    ) -> Variant {
        if !enabled {
            return Variant::Skipped;
        }

        let query = MatrixQuery {
            origin,
            destinations,
            mode: QueryMode::Drive { avoid_highways },
        };

        match self.call(&query).await {
            Ok(outcomes) => Variant::Answered(outcomes),
            Err(e) => {
                warn!(avoid_highways, error = %e, "Drive variant failed");
                Variant::Failed
            }
        }
    }

    async fn refine_drive(
        &self,
        origin: LatLng,
        candidates: &[Nearby],
        options: DriveOptions,
        budget_secs: u64,
        pacer: &mut Pacer,
        stats: &mut RefineStats,
    ) -> Vec<ReachabilityResult> {
        let mut results = Vec::new();

        let batch_size = self.config.effective_batch_size();

        for (batch_idx, batch) in candidates.chunks(batch_size).enumerate() {
            pacer.wait().await;
            stats.batches += 1;
            stats.calls +=
                usize::from(options.with_highways) + usize::from(options.without_highways);

            let destinations: Vec<LatLng> = batch.iter().map(|n| n.facility.location).collect();

            let (with, without) = join(
                self.drive_variant(options.with_highways, origin, &destinations, false),
                self.drive_variant(options.without_highways, origin, &destinations, true),
            )
            .await;

            let answered = [&with, &without]
                .iter()
                .filter(|v| matches!(v, Variant::Answered(_)))
                .count();
            let failed = [&with, &without]
                .iter()
                .filter(|v| matches!(v, Variant::Failed))
                .count();

            if answered == 0 {
                stats.batches_failed += 1;
                warn!(
                    batch = batch_idx,
                    size = batch.len(),
                    "Drive batch failed, skipping"
                );
                continue;
            }
            stats.partial_failures += failed;

            for (i, nearby) in batch.iter().enumerate() {
                let with_highways = with.leg(i);
                let without_highways = without.leg(i);

                if with_highways.is_none() && without_highways.is_none() {
                    stats.destinations_failed += 1;
                    continue;
                }

                let qualifies = [&with_highways, &without_highways]
                    .into_iter()
                    .flatten()
                    .any(|leg| leg.within(budget_secs));

                if qualifies {
                    results.push(ReachabilityResult {
                        facility: nearby.facility.clone(),
                        straight_line_km: nearby.distance_km,
                        estimate: TravelEstimate::Drive {
                            with_highways,
                            without_highways,
                        },
                    });
                }
            }
        }

        results
    }

    async fn refine_direct(
        &self,
        origin: LatLng,
        candidates: &[Nearby],
        mode: QueryMode,
        budget_secs: u64,
        pacer: &mut Pacer,
        stats: &mut RefineStats,
    ) -> Vec<ReachabilityResult> {
        let mut results = Vec::new();

        let batch_size = self.config.effective_batch_size();

        for (batch_idx, batch) in candidates.chunks(batch_size).enumerate() {
            pacer.wait().await;
            stats.batches += 1;
            stats.calls += 1;

            let destinations: Vec<LatLng> = batch.iter().map(|n| n.facility.location).collect();
            let query = MatrixQuery {
                origin,
                destinations: &destinations,
                mode,
            };

            let outcomes = match self.call(&query).await {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    stats.batches_failed += 1;
                    warn!(
                        batch = batch_idx,
                        size = batch.len(),
                        error = %e,
                        "Batch failed, skipping"
                    );
                    continue;
                }
            };

            for (nearby, outcome) in batch.iter().zip(outcomes) {
                match outcome.into_leg() {
                    Some(leg) if leg.within(budget_secs) => results.push(ReachabilityResult {
                        facility: nearby.facility.clone(),
                        straight_line_km: nearby.distance_km,
                        estimate: TravelEstimate::Direct { leg },
                    }),
                    Some(_) => {}
                    None => stats.destinations_failed += 1,
                }
            }
        }

        results
    }

    async fn refine_transit(
        &self,
        origin: LatLng,
        candidates: &[Nearby],
        options: TransitOptions,
        budget_secs: u64,
        pacer: &mut Pacer,
        stats: &mut RefineStats,
    ) -> Vec<ReachabilityResult> {
        let mut results = Vec::new();
        let mut consecutive_failures = 0usize;

        let batch_size = self.config.effective_batch_size();

        for (batch_idx, batch) in candidates.chunks(batch_size).enumerate() {
            if stats.transit_aborted {
                break;
            }

            pacer.wait().await;
            stats.batches += 1;
            stats.calls += 1;

            let destinations: Vec<LatLng> = batch.iter().map(|n| n.facility.location).collect();
            let query = MatrixQuery {
                origin,
                destinations: &destinations,
                mode: QueryMode::Transit(options),
            };

            let mut unrouted: Vec<&Nearby> = Vec::new();

            match self.call(&query).await {
                Ok(outcomes) => {
                    for (nearby, outcome) in batch.iter().zip(outcomes) {
                        match outcome.into_leg() {
                            Some(leg) => {
                                consecutive_failures = 0;
                                if leg.within(budget_secs) {
                                    results.push(ReachabilityResult {
                                        facility: nearby.facility.clone(),
                                        straight_line_km: nearby.distance_km,
                                        estimate: TravelEstimate::Direct { leg },
                                    });
                                }
                            }
                            None => {
                                consecutive_failures += 1;
                                stats.destinations_failed += 1;
                                unrouted.push(nearby);
                            }
                        }
                    }
                }
                Err(e) => {
                    // One failure for the call, not one per destination it carried.
                    stats.batches_failed += 1;
                    consecutive_failures += 1;
                    warn!(
                        batch = batch_idx,
                        size = batch.len(),
                        error = %e,
                        "Transit batch failed, skipping"
                    );
                }
            }

            if !unrouted.is_empty() {
                pacer.wait().await;
                self.walking_fallback(origin, &unrouted, budget_secs, stats, &mut results)
                    .await;
            }

            if consecutive_failures >= self.config.transit_failure_threshold {
                stats.transit_aborted = true;
                warn!(
                    consecutive_failures,
                    remaining = candidates.len().saturating_sub((batch_idx + 1) * batch_size),
                    "Transit routing unreliable, abandoning remaining batches"
                );
            }
        }

        results
    }

    /// Query walking times for destinations transit could not route.
    async fn walking_fallback(
        &self,
        origin: LatLng,
        unrouted: &[&Nearby],
        budget_secs: u64,
        stats: &mut RefineStats,
        results: &mut Vec<ReachabilityResult>,
    ) {
        stats.calls += 1;

        let destinations: Vec<LatLng> = unrouted.iter().map(|n| n.facility.location).collect();
        let query = MatrixQuery {
            origin,
            destinations: &destinations,
            mode: QueryMode::Walk,
        };

        let outcomes = match self.call(&query).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                stats.partial_failures += 1;
                warn!(size = unrouted.len(), error = %e, "Walking fallback failed");
                return;
            }
        };

        for (nearby, outcome) in unrouted.iter().zip(outcomes) {
            if let Some(leg) = outcome.into_leg().filter(|leg| leg.within(budget_secs)) {
                stats.fallbacks += 1;
                results.push(ReachabilityResult {
                    facility: nearby.facility.clone(),
                    straight_line_km: nearby.distance_km,
                    estimate: TravelEstimate::WalkingFallback { leg },
                });
            }
        }

        debug!(
            unrouted = unrouted.len(),
            fallbacks = stats.fallbacks,
            "Walking fallback complete"
        );
    }
}
