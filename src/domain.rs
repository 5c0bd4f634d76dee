//! Typed records shared by the store, the calibration engine and the handlers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Meal category written with every food log row.
pub const MEAL_CATEGORY: &str = "Meal";

/// Profile factor above which the UI tells the user a buffer is being added.
const BUFFER_NOTICE_THRESHOLD: f64 = 1.05;

/// Identifier of a household member.
///
/// Stores the normalized text form, so `42`, `42.0` and `" 42"` all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for UserId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for UserId {
    fn from(raw: i64) -> Self {
        Self(raw.to_string())
    }
}

impl From<u64> for UserId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl From<f64> for UserId {
    fn from(raw: f64) -> Self {
        if raw.is_finite() && raw.fract() == 0.0 && raw.abs() < i64::MAX as f64 {
            Self((raw as i64).to_string())
        } else {
            Self(raw.to_string())
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => UserId::from(s),
            Raw::Signed(n) => UserId::from(n),
            Raw::Unsigned(n) => UserId::from(n),
            Raw::Float(n) => UserId::from(n),
        })
    }
}

/// Returned when a stored or submitted label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownLabel {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(UnknownLabel::new("gender", s)),
        }
    }
}

/// Activity level used to scale BMR into TDEE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "Sedentary")]
    Sedentary,
    #[serde(rename = "Lightly Active")]
    LightlyActive,
    #[serde(rename = "Moderately Active")]
    ModeratelyActive,
    #[serde(rename = "Very Active")]
    VeryActive,
}

impl ActivityLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary",
            ActivityLevel::LightlyActive => "Lightly Active",
            ActivityLevel::ModeratelyActive => "Moderately Active",
            ActivityLevel::VeryActive => "Very Active",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "lightly active" => Ok(ActivityLevel::LightlyActive),
            "moderately active" => Ok(ActivityLevel::ModeratelyActive),
            "very active" => Ok(ActivityLevel::VeryActive),
            _ => Err(UnknownLabel::new("activity level", s)),
        }
    }
}

/// How a meal was described to the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    Text,
    Image,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Text => "Text",
            InputMode::Image => "Image",
        }
    }
}

impl FromStr for InputMode {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(InputMode::Text),
            "image" => Ok(InputMode::Image),
            _ => Err(UnknownLabel::new("input mode", s)),
        }
    }
}

/// When the meal was eaten, relative to logging it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOffset {
    #[default]
    JustNow,
    ThirtyMinutesAgo,
    OneHourAgo,
}

impl TimeOffset {
    pub fn label(&self) -> &'static str {
        match self {
            TimeOffset::JustNow => "Just now",
            TimeOffset::ThirtyMinutesAgo => "30 mins ago",
            TimeOffset::OneHourAgo => "1 hr ago",
        }
    }
}

impl FromStr for TimeOffset {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "just now" => Ok(TimeOffset::JustNow),
            "30 mins ago" | "30 min ago" => Ok(TimeOffset::ThirtyMinutesAgo),
            "1 hr ago" => Ok(TimeOffset::OneHourAgo),
            _ => Err(UnknownLabel::new("time offset", s)),
        }
    }
}

impl Serialize for TimeOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TimeOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub tdee: i64,
    pub inflation_factor: f64,
}

impl UserProfile {
    /// Percentage added on top of AI estimates, when large enough to mention.
    ///
    /// Factors carry two decimals, so the percentage is taken in whole cents
    /// and rounded. Truncating `(f - 1) * 100` instead would show 41 for 1.42.
    pub fn buffer_percent(&self) -> Option<u32> {
        if self.inflation_factor > BUFFER_NOTICE_THRESHOLD {
            Some(((self.inflation_factor * 100.0).round() as u32).saturating_sub(100))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub user_id: UserId,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLogEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    #[serde(with = "iso_date")]
    pub log_date: Date,
    pub user_id: UserId,
    pub category: String,
    pub mode: InputMode,
    pub food_name: String,
    pub raw_calories: i64,
    pub adjusted_calories: i64,
    pub flag: String,
    pub offset: TimeOffset,
}

/// Calories written to the food log: the raw estimate scaled by the factor
/// in effect right now, truncated toward zero.
pub fn adjusted_calories(raw_calories: i64, inflation_factor: f64) -> i64 {
    (raw_calories as f64 * inflation_factor) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_normalizes_numeric_and_text_forms() {
        assert_eq!(UserId::from(42_i64), UserId::from("42"));
        assert_eq!(UserId::from(42_u64), UserId::from(" 42 "));
        assert_eq!(UserId::from(42.0_f64), UserId::from("42"));
        assert_ne!(UserId::from(42.5_f64), UserId::from("42"));
        assert_eq!(UserId::from("Mom").as_str(), "Mom");
    }

    #[test]
    fn user_id_deserializes_from_string_or_number() {
        let a: UserId = serde_json::from_str("\"7\"").unwrap();
        let b: UserId = serde_json::from_str("7").unwrap();
        let c: UserId = serde_json::from_str("7.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"7\"");
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(
            "moderately active".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::ModeratelyActive
        );
        assert_eq!("IMAGE".parse::<InputMode>().unwrap(), InputMode::Image);
        assert_eq!(
            "30 min ago".parse::<TimeOffset>().unwrap(),
            TimeOffset::ThirtyMinutesAgo
        );
        let err = "couch potato".parse::<ActivityLevel>().unwrap_err();
        assert_eq!(err.kind, "activity level");
    }

    #[test]
    fn activity_level_serializes_as_label() {
        let json = serde_json::to_string(&ActivityLevel::VeryActive).unwrap();
        assert_eq!(json, "\"Very Active\"");
        let back: ActivityLevel = serde_json::from_str("\"Lightly Active\"").unwrap();
        assert_eq!(back, ActivityLevel::LightlyActive);
    }

    #[test]
    fn adjusted_calories_truncates() {
        assert_eq!(adjusted_calories(450, 1.0), 450);
        assert_eq!(adjusted_calories(500, 1.25), 625);
        assert_eq!(adjusted_calories(333, 1.1), 366);
        assert_eq!(adjusted_calories(400, 0.8), 320);
    }

    #[test]
    fn buffer_percent_only_above_threshold() {
        let mut profile = UserProfile {
            user_id: UserId::from("Dad"),
            age: 50,
            gender: Gender::Male,
            height_cm: 170.0,
            weight_kg: 80.0,
            activity_level: ActivityLevel::Sedentary,
            tdee: 2000,
            inflation_factor: 1.0,
        };
        assert_eq!(profile.buffer_percent(), None);
        profile.inflation_factor = 1.05;
        assert_eq!(profile.buffer_percent(), None);
        profile.inflation_factor = 1.25;
        assert_eq!(profile.buffer_percent(), Some(25));
        profile.inflation_factor = 1.42;
        assert_eq!(profile.buffer_percent(), Some(42));
    }
}
