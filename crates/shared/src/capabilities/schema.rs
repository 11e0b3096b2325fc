use std::sync::LazyLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{JSONSchema, ValidationError};
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use super::{
    Capability, CapabilityError, EsimOptionsRequest, LocalEventsRequest, PlanTripRequest,
    SafetyInfoRequest, TranslationRequest,
};

pub(super) const BODY_FIELD: &str = "body";

pub(super) fn parameters_schema(capability: Capability) -> Value {
    let root: RootSchema = match capability {
        Capability::PlanTrip => schema_for!(PlanTripRequest),
        Capability::GetEsimOptions => schema_for!(EsimOptionsRequest),
        Capability::GetSafetyInfo => schema_for!(SafetyInfoRequest),
        Capability::GetTranslation => schema_for!(TranslationRequest),
        Capability::GetLocalEvents => schema_for!(LocalEventsRequest),
    };

    let mut schema =
        serde_json::to_value(root).expect("capability argument schema should be serializable");
    if let Value::Object(entries) = &mut schema {
        entries.remove("$schema");
        entries.remove("title");
    }
    schema
}

pub(super) fn validate_args(capability: Capability, args: &Value) -> Result<(), CapabilityError> {
    if !args.is_object() {
        return Err(CapabilityError::Validation {
            field: BODY_FIELD.to_string(),
            message: "arguments must be a JSON object".to_string(),
        });
    }

    let validator = validator_for_capability(capability)?;
    if let Err(mut errors) = validator.validate(args)
        && let Some(first) = errors.next()
    {
        return Err(field_error(&first));
    }

    Ok(())
}

/// JSON Schema treats `3.0` as an integer while serde does not, so integral
/// floats that passed validation are rewritten before typed deserialization.
pub(super) fn integral_numbers_as_integers(args: &Value) -> Value {
    match args {
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), integral_numbers_as_integers(value)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(integral_numbers_as_integers).collect())
        }
        Value::Number(number) if !number.is_i64() && !number.is_u64() => number
            .as_f64()
            .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= u32::MAX as f64)
            .map(|value| Value::from(value as u64))
            .unwrap_or_else(|| args.clone()),
        _ => args.clone(),
    }
}

static PLAN_TRIP_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile(Capability::PlanTrip));

static ESIM_OPTIONS_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile(Capability::GetEsimOptions));

static SAFETY_INFO_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile(Capability::GetSafetyInfo));

static TRANSLATION_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile(Capability::GetTranslation));

static LOCAL_EVENTS_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile(Capability::GetLocalEvents));

fn compile(capability: Capability) -> Result<JSONSchema, String> {
    JSONSchema::compile(&parameters_schema(capability)).map_err(|err| err.to_string())
}

fn validator_for_capability(
    capability: Capability,
) -> Result<&'static JSONSchema, CapabilityError> {
    let validator_result = match capability {
        Capability::PlanTrip => &*PLAN_TRIP_VALIDATOR,
        Capability::GetEsimOptions => &*ESIM_OPTIONS_VALIDATOR,
        Capability::GetSafetyInfo => &*SAFETY_INFO_VALIDATOR,
        Capability::GetTranslation => &*TRANSLATION_VALIDATOR,
        Capability::GetLocalEvents => &*LOCAL_EVENTS_VALIDATOR,
    };

    validator_result
        .as_ref()
        .map_err(|message| CapabilityError::SchemaCompile {
            capability,
            message: message.clone(),
        })
}

fn field_error(error: &ValidationError<'_>) -> CapabilityError {
    let field = match &error.kind {
        ValidationErrorKind::Required { property } => property
            .as_str()
            .map(ToString::to_string)
            .unwrap_or_else(|| property.to_string()),
        _ => field_from_pointer(&error.instance_path.to_string()),
    };

    CapabilityError::Validation {
        field,
        message: error.to_string(),
    }
}

fn field_from_pointer(pointer: &str) -> String {
    pointer
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(BODY_FIELD)
        .to_string()
}
