//! Inflation factor calibration from weight trend versus reported intake.
//!
//! Fits a line to the user's weigh-ins, converts the slope into an implied
//! daily surplus or deficit, and compares the implied intake with the average
//! logged calories. The result is a bounded multiplier for future estimates.

use serde::Serialize;
use time::Date;
use tracing::debug;

use super::regression::fit_line;
use crate::domain::{FoodLogEntry, UserId, WeightSample};

/// Energy equivalent of one kilogram of body mass (kcal).
pub const KCAL_PER_KG: f64 = 7700.0;

/// Minimum weigh-ins for a trend fit.
pub const MIN_WEIGH_INS: usize = 5;

pub const MIN_INFLATION_FACTOR: f64 = 0.8;
pub const MAX_INFLATION_FACTOR: f64 = 1.5;

/// Factor returned whenever calibration cannot run.
pub const NEUTRAL_INFLATION_FACTOR: f64 = 1.0;

/// Message paired with the neutral factor.
pub const INSUFFICIENT_DATA: &str = "insufficient data";

/// Why a calibration run fell back to the neutral factor.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum CalibrationError {
    #[error("no weigh-ins logged")]
    NoWeightData,

    #[error("no meals logged")]
    NoFoodData,

    #[error("need {required} weigh-ins, found {available}")]
    TooFewWeighIns { available: usize, required: usize },

    #[error("weigh-ins do not span more than one day")]
    DegenerateFit,

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Outcome of a calibration run. Never an error: failures become `Fallback`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationResult {
    Calibrated {
        inflation_factor: f64,
        slope_kg_per_day: f64,
    },
    Fallback {
        reason: CalibrationError,
    },
}

impl CalibrationResult {
    pub fn inflation_factor(&self) -> f64 {
        match self {
            CalibrationResult::Calibrated {
                inflation_factor, ..
            } => *inflation_factor,
            CalibrationResult::Fallback { .. } => NEUTRAL_INFLATION_FACTOR,
        }
    }

    /// Diagnostic line shown next to the factor.
    pub fn message(&self) -> String {
        match self {
            CalibrationResult::Calibrated {
                slope_kg_per_day, ..
            } => format!("Slope: {slope_kg_per_day:.3} kg/day"),
            CalibrationResult::Fallback { .. } => INSUFFICIENT_DATA.to_string(),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationResult::Calibrated { .. })
    }
}

impl From<CalibrationError> for CalibrationResult {
    fn from(reason: CalibrationError) -> Self {
        CalibrationResult::Fallback { reason }
    }
}

/// Recomputes the inflation factor for `user_id`.
///
/// Samples belonging to other users are ignored. Any failure yields the
/// neutral factor with an "insufficient data" message.
pub fn run_calibration(
    user_id: &UserId,
    weight_samples: &[WeightSample],
    food_entries: &[FoodLogEntry],
    current_tdee: i64,
) -> CalibrationResult {
    match calibrate(user_id, weight_samples, food_entries, current_tdee) {
        Ok(result) => result,
        Err(reason) => {
            debug!(user_id = %user_id, %reason, "calibration fell back to neutral factor");
            reason.into()
        }
    }
}

fn calibrate(
    user_id: &UserId,
    weight_samples: &[WeightSample],
    food_entries: &[FoodLogEntry],
    current_tdee: i64,
) -> Result<CalibrationResult, CalibrationError> {
    let weights: Vec<&WeightSample> = weight_samples
        .iter()
        .filter(|w| &w.user_id == user_id)
        .collect();
    let foods: Vec<&FoodLogEntry> = food_entries
        .iter()
        .filter(|f| &f.user_id == user_id)
        .collect();

    if weights.is_empty() {
        return Err(CalibrationError::NoWeightData);
    }
    if foods.is_empty() {
        return Err(CalibrationError::NoFoodData);
    }
    if weights.len() < MIN_WEIGH_INS {
        return Err(CalibrationError::TooFewWeighIns {
            available: weights.len(),
            required: MIN_WEIGH_INS,
        });
    }

    let points = day_indexed(&weights);
    let fit = fit_line(&points)?;
    let slope = fit.slope;

    let avg_reported = foods
        .iter()
        .map(|f| f.adjusted_calories as f64)
        .sum::<f64>()
        / foods.len() as f64;

    // Logged calories are already inflated; the loop calibrates against its
    // own previous adjustments.
    let expected_intake = slope.mul_add(KCAL_PER_KG, current_tdee as f64);

    let raw_factor = if avg_reported > 0.0 {
        expected_intake / avg_reported
    } else {
        NEUTRAL_INFLATION_FACTOR
    };
    if !raw_factor.is_finite() {
        return Err(CalibrationError::NonFinite("inflation factor"));
    }

    let inflation_factor =
        round_to_cents(raw_factor.clamp(MIN_INFLATION_FACTOR, MAX_INFLATION_FACTOR));

    debug!(
        user_id = %user_id,
        weigh_ins = weights.len(),
        meals = foods.len(),
        slope,
        intercept = fit.intercept,
        avg_reported,
        expected_intake,
        raw_factor,
        inflation_factor,
        "calibration computed"
    );

    Ok(CalibrationResult::Calibrated {
        inflation_factor,
        slope_kg_per_day: slope,
    })
}

/// (days since earliest weigh-in, weight) pairs.
fn day_indexed(weights: &[&WeightSample]) -> Vec<(f64, f64)> {
    let Some(earliest) = weights.iter().map(|w| w.date).min() else {
        return Vec::new();
    };
    weights
        .iter()
        .map(|w| (day_index(earliest, w.date) as f64, w.weight_kg))
        .collect()
}

fn day_index(earliest: Date, date: Date) -> i64 {
    (date - earliest).whole_days()
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
