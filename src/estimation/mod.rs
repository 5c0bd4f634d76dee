//! Calorie estimation by an external AI model.
//!
//! The model's reply is untrusted text of the form
//! `food name | calories | flag`; only the calorie field is validated.

pub mod gemini;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::domain::InputMode;

pub use gemini::GeminiEstimator;

/// Flag recorded when the model does not return one.
pub const NO_FLAG: &str = "None";

/// Meal description sent to the estimator.
#[derive(Debug, Clone)]
pub enum MealInput {
    Text(String),
    Image { bytes: Bytes, mime_type: String },
}

impl MealInput {
    pub fn mode(&self) -> InputMode {
        match self {
            MealInput::Text(_) => InputMode::Text,
            MealInput::Image { .. } => InputMode::Image,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MealInput::Text(text) => text.trim().is_empty(),
            MealInput::Image { bytes, .. } => bytes.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealEstimate {
    pub food_name: String,
    pub calories: i64,
    pub flag: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    #[error("estimation request failed: {0}")]
    Http(reqwest::Error),

    #[error("estimation service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("estimation service returned no text")]
    EmptyResponse,

    #[error("expected 'food | calories | flag', got {0:?}")]
    MissingFields(String),

    #[error("calories must be a whole number, got {0:?}")]
    InvalidCalories(String),
}

impl From<reqwest::Error> for EstimationError {
    fn from(e: reqwest::Error) -> Self {
        EstimationError::Http(e.without_url())
    }
}

#[async_trait]
pub trait MealEstimator: Send + Sync {
    async fn estimate(&self, input: MealInput) -> Result<MealEstimate, EstimationError>;
}

/// Instruction sent ahead of the meal description.
pub fn instruction(cuisine: &str) -> String {
    format!("Analyze meal. Assume {cuisine}. Return: 'Food Name | Calories (int) | Flag'")
}

/// Parses a `food | calories | flag` reply. Extra fields are ignored.
pub fn parse_estimate(reply: &str) -> Result<MealEstimate, EstimationError> {
    let parts: Vec<&str> = reply.split('|').map(str::trim).collect();
    if parts.len() < 2 {
        return Err(EstimationError::MissingFields(reply.trim().to_string()));
    }

    let calories = parts[1]
        .parse::<i64>()
        .map_err(|_| EstimationError::InvalidCalories(parts[1].to_string()))?;

    Ok(MealEstimate {
        food_name: parts[0].to_string(),
        calories,
        flag: parts.get(2).map_or(NO_FLAG, |f| *f).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_fields() {
        let est = parse_estimate(" Rajma Chawal | 520 | high carb \n").unwrap();
        assert_eq!(
            est,
            MealEstimate {
                food_name: "Rajma Chawal".into(),
                calories: 520,
                flag: "high carb".into(),
            }
        );
    }

    #[test]
    fn missing_flag_defaults_to_none() {
        let est = parse_estimate("Poha | 300").unwrap();
        assert_eq!(est.flag, "None");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let est = parse_estimate("Idli | 150 | low fat | steamed").unwrap();
        assert_eq!(est.calories, 150);
        assert_eq!(est.flag, "low fat");
    }

    #[test]
    fn single_field_is_an_error() {
        let err = parse_estimate("I cannot see any food in this picture").unwrap_err();
        assert!(matches!(err, EstimationError::MissingFields(_)));
    }

    #[test]
    fn non_integer_calories_is_an_error() {
        for reply in ["Samosa | ~250 | fried", "Samosa | 250 kcal", "Samosa | 250.5 | x"] {
            let err = parse_estimate(reply).unwrap_err();
            assert!(matches!(err, EstimationError::InvalidCalories(_)), "{reply}");
        }
    }

    #[test]
    fn instruction_names_cuisine() {
        assert_eq!(
            instruction("Indian Home Cooking"),
            "Analyze meal. Assume Indian Home Cooking. Return: 'Food Name | Calories (int) | Flag'"
        );
    }

    #[test]
    fn input_mode_and_emptiness() {
        assert_eq!(MealInput::Text("dal".into()).mode(), InputMode::Text);
        assert!(MealInput::Text("   ".into()).is_empty());
        let image = MealInput::Image {
            bytes: Bytes::new(),
            mime_type: "image/jpeg".into(),
        };
        assert_eq!(image.mode(), InputMode::Image);
        assert!(image.is_empty());
    }
}
