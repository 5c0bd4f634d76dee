use serde::Deserialize;

pub const MIN_WEIGHT_KG: f64 = 40.0;
pub const MAX_WEIGHT_KG: f64 = 150.0;

#[derive(Debug, Deserialize)]
pub struct LogWeightRequest {
    pub weight_kg: f64,
}

impl LogWeightRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&self.weight_kg) {
            return Err(format!(
                "weight must be between {MIN_WEIGHT_KG} and {MAX_WEIGHT_KG} kg"
            ));
        }
        Ok(())
    }
}
