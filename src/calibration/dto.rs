use serde::Serialize;

use super::engine::CalibrationResult;
use super::services::Recalibration;

#[derive(Debug, Serialize)]
pub struct CalibrationResponse {
    pub inflation_factor: f64,
    pub message: String,
    pub previous_factor: f64,
    pub persisted: bool,
    pub detail: CalibrationResult,
}

impl CalibrationResponse {
    pub fn new(outcome: Recalibration, previous_factor: f64) -> Self {
        Self {
            inflation_factor: outcome.result.inflation_factor(),
            message: outcome.result.message(),
            previous_factor,
            persisted: outcome.persisted,
            detail: outcome.result,
        }
    }
}
