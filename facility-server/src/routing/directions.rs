//! Transit route details from the directions API.
//!
//! The matrix API only answers "how long". For transit results the UI also
//! shows how: which lines, which stops, how much walking in between. That
//! comes from one directions call per facility, reduced to the first leg of
//! the first route.

use serde::{Deserialize, Serialize};

use super::convert::check_status;
use super::error::RoutingError;
use super::types::TextValue;

/// Top-level directions response.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,

    #[serde(default)]
    pub error_message: Option<String>,

    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
}

/// One origin-to-destination leg. A route without waypoints has exactly one.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsLeg {
    pub duration: Option<TextValue>,
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub steps: Vec<DirectionsStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsStep {
    /// `WALKING`, `TRANSIT`, ...
    pub travel_mode: String,
    pub duration: Option<TextValue>,
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub transit_details: Option<TransitDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitDetails {
    pub departure_stop: Option<NamedStop>,
    pub arrival_stop: Option<NamedStop>,
    pub line: Option<TransitLine>,
    #[serde(default)]
    pub num_stops: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedStop {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitLine {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    pub vehicle: Option<TransitVehicle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitVehicle {
    pub name: String,
}

/// Step-by-step breakdown of one transit journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitRoute {
    pub duration_secs: u64,
    pub duration_text: String,
    pub distance_meters: u64,
    pub distance_text: String,
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteStep {
    pub travel_mode: String,
    pub duration_secs: u64,
    pub duration_text: String,
    pub distance_meters: u64,
    pub distance_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitStep>,
}

/// The ride part of a transit step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitStep {
    pub line: String,
    pub vehicle: String,
    pub departure_stop: String,
    pub arrival_stop: String,
    pub num_stops: u32,
}

/// Reduce a directions response to its first leg.
///
/// `ZERO_RESULTS` and `NOT_FOUND` mean there is no route, which is an
/// answer. Other non-OK statuses fail the call.
pub fn convert_route(response: DirectionsResponse) -> Result<Option<TransitRoute>, RoutingError> {
    if matches!(response.status.as_str(), "ZERO_RESULTS" | "NOT_FOUND") {
        return Ok(None);
    }
    check_status(&response.status, response.error_message.as_deref())?;

    let Some(leg) = response
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.legs.into_iter().next())
    else {
        return Ok(None);
    };

    let (duration_secs, duration_text) = split(leg.duration);
    let (distance_meters, distance_text) = split(leg.distance);

    Ok(Some(TransitRoute {
        duration_secs,
        duration_text,
        distance_meters,
        distance_text,
        steps: leg.steps.into_iter().map(convert_step).collect(),
    }))
}

fn convert_step(step: DirectionsStep) -> RouteStep {
    let (duration_secs, duration_text) = split(step.duration);
    let (distance_meters, distance_text) = split(step.distance);

    let transit = step.transit_details.map(|details| {
        let (line, vehicle) = match details.line {
            Some(line) => (
                line.name.or(line.short_name).unwrap_or_default(),
                line.vehicle.map(|v| v.name).unwrap_or_default(),
            ),
            None => Default::default(),
        };
        TransitStep {
            line,
            vehicle,
            departure_stop: details.departure_stop.map(|s| s.name).unwrap_or_default(),
            arrival_stop: details.arrival_stop.map(|s| s.name).unwrap_or_default(),
            num_stops: details.num_stops,
        }
    });

    RouteStep {
        travel_mode: step.travel_mode,
        duration_secs,
        duration_text,
        distance_meters,
        distance_text,
        transit,
    }
}

fn split(value: Option<TextValue>) -> (u64, String) {
    value.map_or_else(Default::default, |v| (v.value, v.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DirectionsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn converts_first_leg_with_transit_steps() {
        let response = parse(
            r#"{
                "status": "OK",
                "routes": [{
                    "legs": [{
                        "duration": {"text": "25分", "value": 1500},
                        "distance": {"text": "8.1 km", "value": 8100},
                        "steps": [
                            {
                                "travel_mode": "WALKING",
                                "duration": {"text": "5分", "value": 300},
                                "distance": {"text": "0.4 km", "value": 400}
                            },
                            {
                                "travel_mode": "TRANSIT",
                                "duration": {"text": "20分", "value": 1200},
                                "distance": {"text": "7.7 km", "value": 7700},
                                "transit_details": {
                                    "departure_stop": {"name": "東京"},
                                    "arrival_stop": {"name": "品川"},
                                    "line": {"short_name": "JY", "vehicle": {"name": "電車"}},
                                    "num_stops": 5
                                }
                            }
                        ]
                    }]
                }]
            }"#,
        );

        let route = convert_route(response).unwrap().unwrap();
        assert_eq!(route.duration_secs, 1500);
        assert_eq!(route.distance_text, "8.1 km");
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[0].travel_mode, "WALKING");
        assert!(route.steps[0].transit.is_none());

        let ride = route.steps[1].transit.as_ref().unwrap();
        assert_eq!(ride.line, "JY");
        assert_eq!(ride.vehicle, "電車");
        assert_eq!(ride.departure_stop, "東京");
        assert_eq!(ride.arrival_stop, "品川");
        assert_eq!(ride.num_stops, 5);
    }

    #[test]
    fn no_route_is_an_answer() {
        for status in ["ZERO_RESULTS", "NOT_FOUND"] {
            let json = format!(r#"{{"status": "{status}", "routes": []}}"#);
            assert_eq!(convert_route(parse(&json)).unwrap(), None);
        }
        assert_eq!(
            convert_route(parse(r#"{"status": "OK", "routes": []}"#)).unwrap(),
            None
        );
    }

    #[test]
    fn request_failures_are_errors() {
        let denied = parse(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#);
        assert!(matches!(convert_route(denied), Err(RoutingError::Unauthorized)));

        let quota = parse(r#"{"status": "OVER_QUERY_LIMIT"}"#);
        assert!(matches!(convert_route(quota), Err(RoutingError::RateLimited)));
    }
}
