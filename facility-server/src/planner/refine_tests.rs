//! Unit tests for batched reachability refinement.

use super::*;
use crate::domain::{DriveOptions, Facility, LatLng, TransitOptions, TravelMode};
use crate::routing::{ElementOutcome, MatrixQuery, QueryMode, RoutingError, TravelLeg};
use crate::spatial::Nearby;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Answer = Result<Vec<ElementOutcome>, RoutingError>;

/// One recorded upstream call.
#[derive(Debug, Clone)]
struct Call {
    mode: QueryMode,
    destinations: Vec<LatLng>,
}

/// Mock travel-time provider driven by a closure over (query, call index).
struct MockProvider {
    respond: Box<dyn Fn(&MatrixQuery<'_>, usize) -> Answer + Send + Sync>,
    slow_call: Option<(usize, Duration)>,
    calls: Mutex<Vec<Call>>,
}

impl MockProvider {
    fn new<F>(respond: F) -> Self
    where
        F: Fn(&MatrixQuery<'_>, usize) -> Answer + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            slow_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_slow_call(mut self, index: usize, delay: Duration) -> Self {
        self.slow_call = Some((index, delay));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl TravelTimeProvider for MockProvider {
    async fn travel_times(&self, query: &MatrixQuery<'_>) -> Answer {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                mode: query.mode,
                destinations: query.destinations.to_vec(),
            });
            calls.len() - 1
        };

        if let Some((slow, delay)) = self.slow_call {
            if slow == index {
                tokio::time::sleep(delay).await;
            }
        }

        (self.respond)(query, index)
    }
}

fn origin() -> LatLng {
    LatLng::new(35.0, 139.0).unwrap()
}

/// Candidate `i` sits `(i + 1) * 0.001` degrees north of the origin.
fn candidate(name: &str, i: usize) -> Nearby {
    let location = LatLng::new(35.0 + (i + 1) as f64 * 0.001, 139.0).unwrap();
    Nearby {
        distance_km: origin().distance_km(&location),
        facility: Arc::new(Facility::new(name, "addr", BTreeSet::new(), location)),
    }
}

fn candidates(n: usize) -> Vec<Nearby> {
    (0..n).map(|i| candidate(&format!("F{i}"), i)).collect()
}

fn route(secs: u64) -> ElementOutcome {
    ElementOutcome::Route(TravelLeg {
        duration_secs: secs,
        duration_text: format!("{} mins", secs / 60),
        distance_meters: secs * 10,
        distance_text: format!("{:.1} km", secs as f64 / 100.0),
    })
}

fn no_route() -> ElementOutcome {
    ElementOutcome::NoRoute {
        status: "ZERO_RESULTS".to_string(),
    }
}

fn api_error() -> RoutingError {
    RoutingError::Api {
        status: "UNKNOWN_ERROR".to_string(),
        message: "provider down".to_string(),
    }
}

fn config() -> SearchConfig {
    SearchConfig::default().with_pacing(Duration::ZERO, Duration::ZERO)
}

/// Inverse of `candidate`: which candidate a destination is.
fn index_of(destination: &LatLng) -> usize {
    ((destination.lat() - 35.0) / 0.001).round() as usize - 1
}

/// Answer each destination with `f(candidate index, mode)`.
fn per_destination(
    q: &MatrixQuery<'_>,
    f: impl Fn(usize, &QueryMode) -> ElementOutcome,
) -> Answer {
    Ok(q.destinations
        .iter()
        .map(|d| f(index_of(d), &q.mode))
        .collect())
}

fn names(results: &[ReachabilityResult]) -> Vec<&str> {
    results.iter().map(|r| r.facility.name.as_str()).collect()
}

#[tokio::test]
async fn walk_keeps_within_budget_sorted_by_duration() {
    let near = candidate("Near", 0);
    let mid = candidate("Mid", 1);
    let far = candidate("Far", 2);

    // Far is reached fastest; Mid is over budget.
    let provider = MockProvider::new(|q, _| {
        per_destination(q, |i, _| match i {
            0 => route(480),
            1 => route(700),
            _ => route(300),
        })
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), vec![near, mid, far], &TravelMode::Walk, 10)
        .await;

    assert_eq!(names(&refinement.results), vec!["Far", "Near"]);
    assert_eq!(refinement.stats.calls, 1);
    assert!(!refinement.stats.is_degraded());
    assert!(matches!(provider.calls()[0].mode, QueryMode::Walk));
}

#[tokio::test]
async fn bicycle_uses_bicycle_queries() {
    let provider = MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(60)).collect()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(3), &TravelMode::Bicycle, 5)
        .await;

    assert_eq!(refinement.results.len(), 3);
    assert!(matches!(provider.calls()[0].mode, QueryMode::Bicycle));
}

#[tokio::test]
async fn drive_highway_only_facility_is_included() {
    let highway_only = candidate("HighwayOnly", 0);
    let local_only = candidate("LocalOnly", 1);
    let neither = candidate("Neither", 2);

    let provider = MockProvider::new(|q, _| {
        per_destination(q, |i, mode| {
            let highways = matches!(
                mode,
                QueryMode::Drive {
                    avoid_highways: false
                }
            );
            match (i, highways) {
                (0, true) => route(20 * 60),
                (0, false) => route(40 * 60),
                (1, true) => route(35 * 60),
                (1, false) => route(25 * 60),
                _ => route(45 * 60),
            }
        })
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            vec![highway_only, local_only, neither],
            &TravelMode::Drive(DriveOptions::default()),
            30,
        )
        .await;

    assert_eq!(names(&refinement.results), vec!["HighwayOnly", "LocalOnly"]);
    assert_eq!(refinement.results[0].sort_key(), 1200.0);
    // Ranked by the with-highways duration even though only the other
    // variant was within budget.
    assert_eq!(refinement.results[1].sort_key(), 2100.0);
    assert_eq!(refinement.stats.calls, 2);
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn drive_variant_failure_is_partial() {
    let provider = MockProvider::new(|q, _| match q.mode {
        QueryMode::Drive {
            avoid_highways: true,
        } => Err(api_error()),
        _ => Ok(q.destinations.iter().map(|_| route(600)).collect()),
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(3),
            &TravelMode::Drive(DriveOptions::default()),
            15,
        )
        .await;

    assert_eq!(refinement.results.len(), 3);
    assert_eq!(refinement.stats.batches_failed, 0);
    assert_eq!(refinement.stats.partial_failures, 1);
    assert!(refinement.stats.is_degraded());

    match &refinement.results[0].estimate {
        TravelEstimate::Drive {
            with_highways,
            without_highways,
        } => {
            assert!(with_highways.is_some());
            assert!(without_highways.is_none());
        }
        other => panic!("unexpected estimate: {other:?}"),
    }
}

#[tokio::test]
async fn drive_missing_with_highways_sorts_last() {
    let provider = MockProvider::new(|q, _| match q.mode {
        QueryMode::Drive {
            avoid_highways: false,
        } => Err(api_error()),
        _ => Ok(q.destinations.iter().map(|_| route(600)).collect()),
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(2),
            &TravelMode::Drive(DriveOptions::default()),
            15,
        )
        .await;

    assert_eq!(names(&refinement.results), vec!["F0", "F1"]);
    assert!(refinement.results.iter().all(|r| r.sort_key().is_infinite()));
    assert_eq!(refinement.results[0].distance_text(), Some("6.0 km"));
}

#[tokio::test]
async fn drive_both_variants_failing_skips_batch() {
    let provider = MockProvider::new(|_, _| Err(api_error()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(5),
            &TravelMode::Drive(DriveOptions::default()),
            60,
        )
        .await;

    assert!(refinement.results.is_empty());
    assert_eq!(refinement.stats.batches_failed, 1);
}

#[tokio::test]
async fn drive_single_variant_issues_one_call_per_batch() {
    let provider = MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(60)).collect()));

    let options = DriveOptions {
        with_highways: false,
        without_highways: true,
    };
    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(30), &TravelMode::Drive(options), 10)
        .await;

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| matches!(
        c.mode,
        QueryMode::Drive {
            avoid_highways: true
        }
    )));
    assert_eq!(refinement.results.len(), 30);
}

#[tokio::test]
async fn transit_falls_back_to_walking() {
    let by_train = candidate("ByTrain", 0);
    let walkable = candidate("Walkable", 1);
    let stranded = candidate("Stranded", 2);

    let provider = MockProvider::new(|q, _| {
        per_destination(q, |i, mode| {
            let transit = matches!(mode, QueryMode::Transit(_));
            match (i, transit) {
                (0, true) => route(900),
                (0, false) => route(3000),
                (1, true) => no_route(),
                (1, false) => route(1200),
                (_, true) => no_route(),
                (_, false) => route(5000),
            }
        })
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            vec![by_train, walkable.clone(), stranded.clone()],
            &TravelMode::Transit(TransitOptions::default()),
            30,
        )
        .await;

    assert_eq!(names(&refinement.results), vec!["ByTrain", "Walkable"]);
    assert!(!refinement.results[0].is_fallback());
    assert!(refinement.results[1].is_fallback());
    assert_eq!(refinement.stats.fallbacks, 1);
    assert!(!refinement.stats.transit_aborted);

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0].mode, QueryMode::Transit(_)));
    assert!(matches!(calls[1].mode, QueryMode::Walk));
    assert_eq!(
        calls[1].destinations,
        vec![walkable.facility.location, stranded.facility.location]
    );
}

#[tokio::test]
async fn cap_sends_only_nearest() {
    let provider = MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(60)).collect()));

    let mut input = candidates(1500);
    input.reverse();

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), input, &TravelMode::Walk, 5)
        .await;

    assert_eq!(refinement.stats.candidates_in, 1500);
    assert_eq!(refinement.stats.queried, 200);
    assert_eq!(refinement.results.len(), 200);
    assert_eq!(provider.calls().len(), 8);

    let expected: BTreeSet<String> = (0..200).map(|i| format!("F{i}")).collect();
    let got: BTreeSet<String> = refinement
        .results
        .iter()
        .map(|r| r.facility.name.clone())
        .collect();
    assert_eq!(got, expected);

    assert!(
        provider
            .calls()
            .iter()
            .all(|c| c.destinations.len() <= crate::routing::MAX_DESTINATIONS_PER_CALL)
    );
}

#[tokio::test]
async fn transit_cap_is_lower() {
    let provider = MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(60)).collect()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(300),
            &TravelMode::Transit(TransitOptions::default()),
            5,
        )
        .await;

    assert_eq!(refinement.stats.queried, 100);
    assert_eq!(refinement.results.len(), 100);
    assert_eq!(provider.calls().len(), 4);
}

#[tokio::test]
async fn failed_batch_is_skipped() {
    let provider = MockProvider::new(|q, index| {
        if index == 1 {
            Err(api_error())
        } else {
            Ok(q.destinations.iter().map(|_| route(60)).collect())
        }
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(75), &TravelMode::Walk, 5)
        .await;

    assert_eq!(refinement.stats.batches, 3);
    assert_eq!(refinement.stats.batches_failed, 1);
    assert_eq!(refinement.results.len(), 50);

    let names: BTreeSet<String> = refinement
        .results
        .iter()
        .map(|r| r.facility.name.clone())
        .collect();
    let expected: BTreeSet<String> = (0..25)
        .chain(50..75)
        .map(|i| format!("F{i}"))
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn slow_call_times_out_as_failed_batch() {
    let provider = MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(60)).collect()))
        .with_slow_call(0, Duration::from_millis(500));

    let config = config().with_call_timeout(Duration::from_millis(20));
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(50), &TravelMode::Walk, 5)
        .await;

    assert_eq!(refinement.stats.batches_failed, 1);
    assert_eq!(refinement.results.len(), 25);
    assert_eq!(refinement.results[0].facility.name, "F25");
}

#[tokio::test]
async fn short_answer_is_a_failed_batch() {
    let provider = MockProvider::new(|_, _| Ok(vec![route(60)]));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(3), &TravelMode::Walk, 5)
        .await;

    assert!(refinement.results.is_empty());
    assert_eq!(refinement.stats.batches_failed, 1);
}

#[tokio::test]
async fn transit_aborts_after_consecutive_failures() {
    let provider =
        MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| no_route()).collect()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(100),
            &TravelMode::Transit(TransitOptions::default()),
            30,
        )
        .await;

    assert!(refinement.results.is_empty());
    assert!(refinement.stats.transit_aborted);
    assert!(refinement.stats.is_degraded());

    // One transit batch and its walking fallback; the other three batches
    // are never sent.
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0].mode, QueryMode::Transit(_)));
    assert!(matches!(calls[1].mode, QueryMode::Walk));
}

#[tokio::test]
async fn failed_transit_batch_counts_once() {
    // A whole batch failing is one failure, well under the threshold.
    let provider = MockProvider::new(|q, index| {
        if index == 0 {
            Err(api_error())
        } else {
            Ok(q.destinations.iter().map(|_| route(600)).collect())
        }
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(75),
            &TravelMode::Transit(TransitOptions::default()),
            30,
        )
        .await;

    assert!(!refinement.stats.transit_aborted);
    assert_eq!(refinement.stats.batches, 3);
    assert_eq!(refinement.stats.batches_failed, 1);
    assert_eq!(refinement.results.len(), 50);
    assert_eq!(refinement.results[0].facility.name, "F25");
}

#[tokio::test]
async fn consecutive_failed_transit_batches_abort() {
    let provider = MockProvider::new(|_, _| Err(api_error()));

    let config = config().with_transit_failure_threshold(2);
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(100),
            &TravelMode::Transit(TransitOptions::default()),
            30,
        )
        .await;

    assert!(refinement.stats.transit_aborted);
    assert_eq!(refinement.stats.batches_failed, 2);
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn scattered_transit_failures_do_not_abort() {
    // Every other destination is unrouted, so no run reaches the threshold.
    let provider = MockProvider::new(|q, _| match q.mode {
        QueryMode::Transit(_) => Ok(q
            .destinations
            .iter()
            .enumerate()
            .map(|(i, _)| if i % 2 == 0 { no_route() } else { route(600) })
            .collect()),
        _ => Ok(q.destinations.iter().map(|_| route(6000)).collect()),
    });

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(
            origin(),
            candidates(60),
            &TravelMode::Transit(TransitOptions::default()),
            30,
        )
        .await;

    assert!(!refinement.stats.transit_aborted);
    assert_eq!(refinement.stats.batches, 3);
    // Odd positions in batches of 25, 25 and 10.
    assert_eq!(refinement.results.len(), 12 + 12 + 5);
    assert_eq!(refinement.stats.fallbacks, 0);
}

#[tokio::test]
async fn empty_candidates_make_no_calls() {
    let provider = MockProvider::new(|_, _| Err(api_error()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), Vec::new(), &TravelMode::Walk, 5)
        .await;

    assert!(refinement.results.is_empty());
    assert!(provider.calls().is_empty());
    assert!(!refinement.stats.is_degraded());
}

#[tokio::test]
async fn equal_durations_keep_straight_line_order() {
    let provider =
        MockProvider::new(|q, _| Ok(q.destinations.iter().map(|_| route(120)).collect()));

    let config = config();
    let refinement = Refiner::new(&provider, &config)
        .refine(origin(), candidates(5), &TravelMode::Walk, 5)
        .await;

    assert_eq!(names(&refinement.results), vec!["F0", "F1", "F2", "F3", "F4"]);
}
