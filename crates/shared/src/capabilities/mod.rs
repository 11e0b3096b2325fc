use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod esim;
mod events;
mod itinerary;
mod region;
mod safety;
mod schema;
mod translation;

pub use esim::{EsimOptions, EsimOptionsRequest, EsimPlan, get_esim_options};
pub use events::{LocalEvents, LocalEventsRequest, get_local_events};
pub use itinerary::{
    DayPlan, FALLBACK_INTEREST, MAX_TRIP_DAYS, MIN_TRIP_DAYS, PlanTripRequest, TripPlan, plan_trip,
};
pub use region::Region;
pub use safety::{EmergencyNumbers, SafetyInfo, SafetyInfoRequest, get_safety_info};
pub use translation::{Translation, TranslationRequest, get_translation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    PlanTrip,
    GetEsimOptions,
    GetSafetyInfo,
    GetTranslation,
    GetLocalEvents,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Self::PlanTrip,
        Self::GetEsimOptions,
        Self::GetSafetyInfo,
        Self::GetTranslation,
        Self::GetLocalEvents,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::PlanTrip => "plan_trip",
            Self::GetEsimOptions => "get_esim_options",
            Self::GetSafetyInfo => "get_safety_info",
            Self::GetTranslation => "get_translation",
            Self::GetLocalEvents => "get_local_events",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.name() == name)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::PlanTrip => {
                "Creates a travel itinerary based on city, number of days, and interests."
            }
            Self::GetEsimOptions => "Returns eSIM plan options based on country and device type.",
            Self::GetSafetyInfo => {
                "Provides emergency numbers and local safety tips for a given country."
            }
            Self::GetTranslation => "Translates a phrase into the selected target language.",
            Self::GetLocalEvents => "Returns popular local events happening in a city.",
        }
    }

    /// JSON Schema of the arguments object, as shown to a reasoning backend.
    pub fn parameters_schema(self) -> Value {
        schema::parameters_schema(self)
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("argument schema for {capability:?} failed to compile: {message}")]
    SchemaCompile {
        capability: Capability,
        message: String,
    },
    #[error("capability response could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn invoke(name: &str, args: &Value) -> Result<Value, CapabilityError> {
    let capability = Capability::from_name(name)
        .ok_or_else(|| CapabilityError::UnknownCapability(name.to_string()))?;
    invoke_capability(capability, args)
}

pub fn invoke_capability(capability: Capability, args: &Value) -> Result<Value, CapabilityError> {
    match capability {
        Capability::PlanTrip => encode(plan_trip(&parse_request(capability, args)?)),
        Capability::GetEsimOptions => encode(get_esim_options(&parse_request(capability, args)?)),
        Capability::GetSafetyInfo => encode(get_safety_info(&parse_request(capability, args)?)),
        Capability::GetTranslation => encode(get_translation(&parse_request(capability, args)?)),
        Capability::GetLocalEvents => encode(get_local_events(&parse_request(capability, args)?)),
    }
}

pub fn parse_request<T>(capability: Capability, args: &Value) -> Result<T, CapabilityError>
where
    T: DeserializeOwned,
{
    schema::validate_args(capability, args)?;
    serde_json::from_value(schema::integral_numbers_as_integers(args)).map_err(|err| {
        CapabilityError::Validation {
            field: schema::BODY_FIELD.to_string(),
            message: err.to_string(),
        }
    })
}

fn encode<T: Serialize>(response: T) -> Result<Value, CapabilityError> {
    Ok(serde_json::to_value(response)?)
}
