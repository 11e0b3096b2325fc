use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::region::normalize_country;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SafetyInfoRequest {
    /// Destination country name or ISO code.
    #[schemars(length(min = 1))]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyNumbers {
    pub police: String,
    pub ambulance: String,
    pub fire: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyInfo {
    pub country: String,
    pub emergency_numbers: EmergencyNumbers,
    pub tips: String,
}

const FALLBACK_NUMBERS: (&str, &str, &str) = ("112", "113", "114");

// (country names and codes, police, ambulance, fire)
const EMERGENCY_TABLE: &[(&[&str], &str, &str, &str)] = &[
    (
        &["united states", "united states of america", "usa", "us", "canada", "ca", "mexico", "mx"],
        "911",
        "911",
        "911",
    ),
    (
        &["united kingdom", "uk", "gb", "great britain", "england", "scotland", "wales"],
        "999",
        "999",
        "999",
    ),
    (&["ireland", "ie"], "112", "112", "112"),
    (&["france", "fr"], "17", "15", "18"),
    (&["germany", "de", "austria", "at"], "110", "112", "112"),
    (&["italy", "it"], "112", "118", "115"),
    (&["spain", "es", "portugal", "pt", "greece", "gr", "netherlands", "nl"], "112", "112", "112"),
    (&["turkey", "turkiye", "tr"], "112", "112", "112"),
    (&["japan", "jp"], "110", "119", "119"),
    (&["south korea", "korea", "kr"], "112", "119", "119"),
    (&["china", "cn"], "110", "120", "119"),
    (&["india", "in"], "100", "102", "101"),
    (&["thailand", "th"], "191", "1669", "199"),
    (&["australia", "au"], "000", "000", "000"),
    (&["new zealand", "nz"], "111", "111", "111"),
    (&["brazil", "br"], "190", "192", "193"),
    (&["united arab emirates", "uae", "ae"], "999", "998", "997"),
    (&["south africa", "za"], "10111", "10177", "10177"),
];

pub fn get_safety_info(request: &SafetyInfoRequest) -> SafetyInfo {
    SafetyInfo {
        country: request.country.clone(),
        emergency_numbers: emergency_numbers_for(&request.country),
        tips: format!(
            "Be aware of local customs and keep emergency contacts saved while traveling in {}.",
            request.country
        ),
    }
}

fn emergency_numbers_for(country: &str) -> EmergencyNumbers {
    let key = normalize_country(country);
    let (police, ambulance, fire) = EMERGENCY_TABLE
        .iter()
        .find(|(names, ..)| names.contains(&key.as_str()))
        .map(|(_, police, ambulance, fire)| (*police, *ambulance, *fire))
        .unwrap_or(FALLBACK_NUMBERS);

    EmergencyNumbers {
        police: police.to_string(),
        ambulance: ambulance.to_string(),
        fire: fire.to_string(),
    }
}
