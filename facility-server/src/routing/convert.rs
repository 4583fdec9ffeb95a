//! Conversion from matrix DTOs to per-destination outcomes.

use super::error::RoutingError;
use super::query::{ElementOutcome, TravelLeg};
use super::types::{DistanceMatrixResponse, MatrixElement};

/// Convert a matrix response for one origin into outcomes in request order.
///
/// A non-OK top-level status fails the whole call. A response with no rows
/// is treated as "no route" for every destination. An element count that
/// does not match `expected` is malformed, since outcomes could no longer be
/// matched to destinations.
pub fn convert_matrix(
    response: DistanceMatrixResponse,
    expected: usize,
) -> Result<Vec<ElementOutcome>, RoutingError> {
    check_status(&response.status, response.error_message.as_deref())?;

    let Some(row) = response.rows.into_iter().next() else {
        return Ok(vec![
            ElementOutcome::NoRoute {
                status: "NO_ROWS".to_string(),
            };
            expected
        ]);
    };

    if row.elements.len() != expected {
        return Err(RoutingError::MalformedResponse(format!(
            "expected {expected} elements, got {}",
            row.elements.len()
        )));
    }

    Ok(row.elements.into_iter().map(convert_element).collect())
}

/// Map a top-level status to an error, if it is one.
pub(super) fn check_status(status: &str, message: Option<&str>) -> Result<(), RoutingError> {
    match status {
        "OK" => Ok(()),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(RoutingError::RateLimited),
        "REQUEST_DENIED" => Err(RoutingError::Unauthorized),
        other => Err(RoutingError::Api {
            status: other.to_string(),
            message: message.unwrap_or_default().to_string(),
        }),
    }
}

fn convert_element(element: MatrixElement) -> ElementOutcome {
    if element.status != "OK" {
        return ElementOutcome::NoRoute {
            status: element.status,
        };
    }

    match (element.duration, element.distance) {
        (Some(duration), Some(distance)) => ElementOutcome::Route(TravelLeg {
            duration_secs: duration.value,
            duration_text: duration.text,
            distance_meters: distance.value,
            distance_text: distance.text,
        }),
        _ => ElementOutcome::NoRoute {
            status: "INCOMPLETE".to_string(),
        },
    }
}
