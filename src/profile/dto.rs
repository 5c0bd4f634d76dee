use serde::{Deserialize, Serialize};

use crate::domain::{ActivityLevel, Gender, UserId, UserProfile};

/// One-time setup form.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
}

impl CreateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(10..=90).contains(&self.age) {
            return Err("age must be between 10 and 90".into());
        }
        if !(100.0..=220.0).contains(&self.height_cm) {
            return Err("height must be between 100 and 220 cm".into());
        }
        if !(40.0..=150.0).contains(&self.weight_kg) {
            return Err("weight must be between 40 and 150 kg".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_id: UserId,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub tdee: i64,
    pub inflation_factor: f64,
    /// Present when the factor adds a noticeable buffer to estimates.
    pub buffer_percent: Option<u32>,
}

impl From<UserProfile> for ProfileView {
    fn from(p: UserProfile) -> Self {
        Self {
            buffer_percent: p.buffer_percent(),
            user_id: p.user_id,
            age: p.age,
            gender: p.gender,
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            activity_level: p.activity_level,
            tdee: p.tdee,
            inflation_factor: p.inflation_factor,
        }
    }
}
