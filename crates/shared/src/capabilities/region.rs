use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Europe,
    Asia,
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "Latin America")]
    LatinAmerica,
    #[serde(rename = "Middle East")]
    MiddleEast,
    Africa,
    Oceania,
    Global,
}

const EUROPE: &[&str] = &[
    "france", "fr", "germany", "de", "italy", "it", "spain", "es", "portugal", "pt",
    "united kingdom", "uk", "gb", "great britain", "england", "scotland", "wales", "ireland",
    "ie", "netherlands", "nl", "belgium", "be", "switzerland", "ch", "austria", "at", "greece",
    "gr", "sweden", "se", "norway", "no", "denmark", "dk", "finland", "fi", "poland", "pl",
    "czech republic", "czechia", "cz", "hungary", "hu", "croatia", "hr", "iceland", "is",
    "turkey", "turkiye", "tr",
];

const ASIA: &[&str] = &[
    "japan", "jp", "china", "cn", "south korea", "korea", "kr", "thailand", "th", "vietnam",
    "vn", "singapore", "sg", "malaysia", "my", "indonesia", "id", "philippines", "ph", "india",
    "in", "taiwan", "tw", "hong kong", "hk", "cambodia", "kh", "nepal", "np", "sri lanka", "lk",
];

const NORTH_AMERICA: &[&str] = &[
    "united states",
    "united states of america",
    "usa",
    "us",
    "america",
    "canada",
    "ca",
    "mexico",
    "mx",
];

const LATIN_AMERICA: &[&str] = &[
    "brazil", "br", "argentina", "ar", "chile", "cl", "peru", "pe", "colombia", "co",
    "costa rica", "cr", "cuba", "cu", "ecuador", "ec", "uruguay", "uy",
];

const MIDDLE_EAST: &[&str] = &[
    "united arab emirates",
    "uae",
    "ae",
    "saudi arabia",
    "sa",
    "qatar",
    "qa",
    "israel",
    "il",
    "jordan",
    "jo",
    "oman",
    "om",
];

const AFRICA: &[&str] = &[
    "egypt",
    "eg",
    "morocco",
    "ma",
    "south africa",
    "za",
    "kenya",
    "ke",
    "tanzania",
    "tz",
    "nigeria",
    "ng",
    "ghana",
    "gh",
];

const OCEANIA: &[&str] = &["australia", "au", "new zealand", "nz", "fiji", "fj"];

const REGION_TABLE: &[(Region, &[&str])] = &[
    (Region::Europe, EUROPE),
    (Region::Asia, ASIA),
    (Region::NorthAmerica, NORTH_AMERICA),
    (Region::LatinAmerica, LATIN_AMERICA),
    (Region::MiddleEast, MIDDLE_EAST),
    (Region::Africa, AFRICA),
    (Region::Oceania, OCEANIA),
];

impl Region {
    pub fn classify(country: &str) -> Self {
        let key = normalize_country(country);
        REGION_TABLE
            .iter()
            .find(|(_, names)| names.contains(&key.as_str()))
            .map(|(region, _)| *region)
            .unwrap_or(Self::Global)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Europe => "Europe",
            Self::Asia => "Asia",
            Self::NorthAmerica => "North America",
            Self::LatinAmerica => "Latin America",
            Self::MiddleEast => "Middle East",
            Self::Africa => "Africa",
            Self::Oceania => "Oceania",
            Self::Global => "Global",
        }
    }
}

pub(super) fn normalize_country(country: &str) -> String {
    country
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
