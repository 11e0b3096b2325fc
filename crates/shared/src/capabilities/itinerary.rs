use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const FALLBACK_INTEREST: &str = "sightseeing";
pub const MIN_TRIP_DAYS: u32 = 1;
pub const MAX_TRIP_DAYS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanTripRequest {
    /// City or region the traveller is visiting.
    #[schemars(length(min = 1))]
    pub destination: String,
    /// Trip length in days.
    #[schemars(range(min = 1, max = 30))]
    pub days: u32,
    /// Interests in priority order, e.g. ["history", "food"].
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub morning: String,
    pub afternoon: String,
    pub evening: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub destination: String,
    pub days: u32,
    pub itinerary: IndexMap<String, DayPlan>,
}

// Morning takes the first interest, afternoon the second (or the morning one),
// evening the last. An empty list falls back to sightseeing everywhere.
pub fn plan_trip(request: &PlanTripRequest) -> TripPlan {
    let morning_interest = request
        .interests
        .first()
        .map(String::as_str)
        .unwrap_or(FALLBACK_INTEREST);
    let afternoon_interest = request
        .interests
        .get(1)
        .map(String::as_str)
        .unwrap_or(morning_interest);
    let evening_interest = request
        .interests
        .last()
        .map(String::as_str)
        .unwrap_or(FALLBACK_INTEREST);

    let itinerary = (1..=request.days)
        .map(|day| {
            (
                format!("Day {day}"),
                DayPlan {
                    morning: format!(
                        "Explore {} in the morning, focusing on {morning_interest}.",
                        request.destination
                    ),
                    afternoon: format!(
                        "Visit local attractions related to {afternoon_interest}."
                    ),
                    evening: format!(
                        "Dine at a recommended place or relax with a local activity tied to {evening_interest}."
                    ),
                },
            )
        })
        .collect::<IndexMap<_, _>>();

    TripPlan {
        destination: request.destination.clone(),
        days: request.days,
        itinerary,
    }
}
