use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocalEventsRequest {
    /// City to list events for.
    #[schemars(length(min = 1))]
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEvents {
    pub city: String,
    pub events: Vec<String>,
}

pub fn get_local_events(request: &LocalEventsRequest) -> LocalEvents {
    let city = request.city.as_str();
    LocalEvents {
        city: city.to_string(),
        events: vec![
            format!("Food Festival in {city}"),
            format!("Live music concert in central {city}"),
            format!("Open-air art market this weekend in {city}"),
        ],
    }
}
