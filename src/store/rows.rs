use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use super::{StoreError, FOOD_TABLE, PROFILES_TABLE, WEIGHTS_TABLE};
use crate::domain::{FoodLogEntry, UserId, UserProfile, WeightSample};

/// `user_profiles` row as stored.
#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub age: i32,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub activity: String,
    pub tdee: i64,
    pub inflation_factor: f64,
}

/// `weight_logs` row as stored.
#[derive(Debug, FromRow)]
pub struct WeightRow {
    pub date: Date,
    pub user_id: String,
    pub weight_kg: f64,
}

/// `food_logs` row as stored.
#[derive(Debug, FromRow)]
pub struct FoodRow {
    pub logged_at: OffsetDateTime,
    pub log_date: Date,
    pub user_id: String,
    pub category: String,
    pub mode: String,
    pub food_name: String,
    pub raw_cals: i64,
    pub final_cals: i64,
    pub flag: String,
    pub time_offset: String,
}

fn finite(table: &'static str, column: &str, value: f64) -> Result<f64, StoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StoreError::malformed(table, format!("{column} is not a number")))
    }
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = StoreError;

    fn try_from(r: ProfileRow) -> Result<Self, Self::Error> {
        let t = PROFILES_TABLE;
        Ok(Self {
            user_id: UserId::from(r.user_id),
            age: u32::try_from(r.age)
                .map_err(|_| StoreError::malformed(t, format!("negative age {}", r.age)))?,
            gender: r.gender.parse().map_err(|e| StoreError::malformed(t, e))?,
            height_cm: finite(t, "height", r.height)?,
            weight_kg: finite(t, "weight", r.weight)?,
            activity_level: r.activity.parse().map_err(|e| StoreError::malformed(t, e))?,
            tdee: r.tdee,
            inflation_factor: finite(t, "inflation_factor", r.inflation_factor)?,
        })
    }
}

impl TryFrom<WeightRow> for WeightSample {
    type Error = StoreError;

    fn try_from(r: WeightRow) -> Result<Self, Self::Error> {
        Ok(Self {
            date: r.date,
            user_id: UserId::from(r.user_id),
            weight_kg: finite(WEIGHTS_TABLE, "weight_kg", r.weight_kg)?,
        })
    }
}

impl TryFrom<FoodRow> for FoodLogEntry {
    type Error = StoreError;

    fn try_from(r: FoodRow) -> Result<Self, Self::Error> {
        let t = FOOD_TABLE;
        Ok(Self {
            logged_at: r.logged_at,
            log_date: r.log_date,
            user_id: UserId::from(r.user_id),
            category: r.category,
            mode: r.mode.parse().map_err(|e| StoreError::malformed(t, e))?,
            food_name: r.food_name,
            raw_calories: r.raw_cals,
            adjusted_calories: r.final_cals,
            flag: r.flag,
            offset: r.time_offset.parse().map_err(|e| StoreError::malformed(t, e))?,
        })
    }
}
