use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Region;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EsimOptionsRequest {
    /// Destination country name or ISO code.
    #[schemars(length(min = 1))]
    pub country: String,
    /// Handset model, e.g. "iPhone 15".
    #[schemars(length(min = 1))]
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsimPlan {
    pub name: String,
    pub data: String,
    pub price: String,
    pub validity_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsimOptions {
    pub country: String,
    pub device: String,
    pub region: Region,
    pub plans: Vec<EsimPlan>,
}

struct PlanTier {
    name: &'static str,
    data: &'static str,
    validity_days: u32,
}

const PLAN_TIERS: [PlanTier; 3] = [
    PlanTier {
        name: "Basic Plan",
        data: "1GB",
        validity_days: 7,
    },
    PlanTier {
        name: "Standard Plan",
        data: "3GB",
        validity_days: 15,
    },
    PlanTier {
        name: "Unlimited Plan",
        data: "∞",
        validity_days: 30,
    },
];

// USD per tier, in PLAN_TIERS order.
const fn regional_prices(region: Region) -> [u32; 3] {
    match region {
        Region::Europe => [4, 9, 19],
        Region::Asia => [5, 11, 22],
        Region::NorthAmerica => [6, 13, 25],
        Region::LatinAmerica => [7, 14, 27],
        Region::MiddleEast => [8, 16, 30],
        Region::Africa => [9, 18, 32],
        Region::Oceania => [6, 12, 24],
        Region::Global => [5, 10, 20],
    }
}

pub fn get_esim_options(request: &EsimOptionsRequest) -> EsimOptions {
    let region = Region::classify(&request.country);
    let prices = regional_prices(region);

    let plans = PLAN_TIERS
        .iter()
        .zip(prices)
        .map(|(tier, price)| EsimPlan {
            name: tier.name.to_string(),
            data: tier.data.to_string(),
            price: format!("${price}"),
            validity_days: tier.validity_days,
        })
        .collect();

    EsimOptions {
        country: request.country.clone(),
        device: request.device.clone(),
        region,
        plans,
    }
}
