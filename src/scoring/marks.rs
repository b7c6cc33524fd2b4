// src/scoring/marks.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lowest final speed (WPM) that still earns marks.
pub const QUALIFYING_SPEED: f64 = 30.0;

/// Upper bound (inclusive) of each scoring band and the marks it earns.
/// Anything faster than the last bound earns [`TOP_MARKS`].
const BANDS: [(f64, u8); 5] = [(30.0, 10), (35.0, 12), (40.0, 15), (45.0, 18), (50.0, 21)];

pub const TOP_MARKS: u8 = 25;

/// How the final speed is prepared before the band lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierRounding {
    /// Drop the fractional part first: 30.9 WPM scores like 30 WPM.
    #[default]
    Truncate,
    /// Compare the raw speed; each band is closed on its upper bound.
    Exact,
}

impl FromStr for TierRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown marks rounding '{other}'")),
        }
    }
}

/// Discrete marks awarded for a final speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarksTier {
    Disqualify,
    Marks(u8),
}

impl MarksTier {
    pub fn for_speed(final_speed_wpm: f64, rounding: TierRounding) -> Self {
        let speed = match rounding {
            TierRounding::Truncate => final_speed_wpm.trunc(),
            TierRounding::Exact => final_speed_wpm,
        };

        if speed.is_nan() || speed < QUALIFYING_SPEED {
            return MarksTier::Disqualify;
        }

        BANDS
            .iter()
            .find(|(upper, _)| speed <= *upper)
            .map(|&(_, marks)| MarksTier::Marks(marks))
            .unwrap_or(MarksTier::Marks(TOP_MARKS))
    }

    pub fn is_disqualified(&self) -> bool {
        matches!(self, MarksTier::Disqualify)
    }

    /// True if either rounding policy awards this tier for `final_speed_wpm`.
    /// Used to check stored records, whose policy is not recorded.
    pub fn fits(&self, final_speed_wpm: f64) -> bool {
        [TierRounding::Truncate, TierRounding::Exact]
            .into_iter()
            .any(|rounding| MarksTier::for_speed(final_speed_wpm, rounding) == *self)
    }
}

impl fmt::Display for MarksTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarksTier::Disqualify => f.write_str("Disqualify"),
            MarksTier::Marks(marks) => write!(f, "{marks}"),
        }
    }
}

impl FromStr for MarksTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("disqualify") {
            return Ok(MarksTier::Disqualify);
        }
        // spreadsheets sometimes widen integer columns to "12.0"
        let digits = s.strip_suffix(".0").unwrap_or(s);
        match digits.parse::<u8>() {
            Ok(marks) if marks == TOP_MARKS || BANDS.iter().any(|&(_, m)| m == marks) => {
                Ok(MarksTier::Marks(marks))
            }
            _ => Err(format!("invalid marks value '{s}'")),
        }
    }
}

impl Serialize for MarksTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MarksTier::Disqualify => serializer.serialize_str("Disqualify"),
            MarksTier::Marks(marks) => serializer.serialize_u8(*marks),
        }
    }
}

impl<'de> Deserialize<'de> for MarksTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(marks) => marks.to_string().parse::<MarksTier>(),
            Raw::Text(text) => text.parse::<MarksTier>(),
        }
        .map_err(serde::de::Error::custom)
    }
}
