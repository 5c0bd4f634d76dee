//! Total Daily Energy Expenditure from physical attributes.
//!
//! BMR uses the Mifflin-St Jeor equation; the activity multiplier comes from
//! a fixed table.

use crate::domain::{ActivityLevel, Gender};

/// Multiplier used when the activity level is missing or unrecognized.
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.2;

/// Activity multiplier for a known level, or the sedentary default.
pub fn activity_multiplier(level: Option<ActivityLevel>) -> f64 {
    match level {
        Some(ActivityLevel::Sedentary) => 1.2,
        Some(ActivityLevel::LightlyActive) => 1.375,
        Some(ActivityLevel::ModeratelyActive) => 1.55,
        Some(ActivityLevel::VeryActive) => 1.725,
        None => DEFAULT_ACTIVITY_MULTIPLIER,
    }
}

/// Basal metabolic rate in kcal/day (Mifflin-St Jeor).
pub fn basal_metabolic_rate(age: u32, gender: Gender, height_cm: f64, weight_kg: f64) -> f64 {
    let base = (10.0 * weight_kg) + (6.25 * height_cm) - (5.0 * f64::from(age));
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

/// TDEE in kcal/day, truncated toward zero.
///
/// Inputs are assumed to be validated by the caller.
pub fn calculate_tdee(
    age: u32,
    gender: Gender,
    height_cm: f64,
    weight_kg: f64,
    activity_level: Option<ActivityLevel>,
) -> i64 {
    let bmr = basal_metabolic_rate(age, gender, height_cm, weight_kg);
    (bmr * activity_multiplier(activity_level)) as i64
}
