use crate::{
    domain::{UserId, UserProfile},
    store::{LogStore, StoreError},
    tdee::calculate_tdee,
};

use super::dto::CreateProfileRequest;

/// Factor every new profile starts with.
pub const INITIAL_INFLATION_FACTOR: f64 = 1.0;

pub fn build_profile(user_id: UserId, req: &CreateProfileRequest) -> UserProfile {
    let tdee = calculate_tdee(
        req.age,
        req.gender,
        req.height_cm,
        req.weight_kg,
        Some(req.activity_level),
    );
    UserProfile {
        user_id,
        age: req.age,
        gender: req.gender,
        height_cm: req.height_cm,
        weight_kg: req.weight_kg,
        activity_level: req.activity_level,
        tdee,
        inflation_factor: INITIAL_INFLATION_FACTOR,
    }
}

pub async fn create_profile(
    store: &dyn LogStore,
    user_id: UserId,
    req: &CreateProfileRequest,
) -> Result<UserProfile, StoreError> {
    let profile = build_profile(user_id, req);
    store.insert_profile(&profile).await?;
    Ok(profile)
}
