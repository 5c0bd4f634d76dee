use serde::{Deserialize, Serialize};

use crate::domain::{adjusted_calories, InputMode, TimeOffset};
use crate::session::PendingMeal;

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub description: String,
    #[serde(default)]
    pub offset: TimeOffset,
}

/// Estimate shown for review before it is saved.
#[derive(Debug, Serialize)]
pub struct PendingMealView {
    pub food_name: String,
    pub raw_calories: i64,
    pub flag: String,
    pub mode: InputMode,
    pub offset: TimeOffset,
    pub inflation_factor: f64,
    /// What would be logged if saved now.
    pub projected_calories: i64,
}

impl PendingMealView {
    pub fn new(pending: &PendingMeal, inflation_factor: f64) -> Self {
        Self {
            food_name: pending.estimate.food_name.clone(),
            raw_calories: pending.estimate.calories,
            flag: pending.estimate.flag.clone(),
            mode: pending.mode,
            offset: pending.offset,
            inflation_factor,
            projected_calories: adjusted_calories(pending.estimate.calories, inflation_factor),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}
