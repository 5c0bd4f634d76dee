use tracing::{info, instrument, warn};

use super::engine::{run_calibration, CalibrationResult};
use crate::domain::UserProfile;
use crate::store::LogStore;

/// A calibration run and whether its factor reached the profile row.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalibration {
    pub result: CalibrationResult,
    pub persisted: bool,
}

/// Runs calibration over everything stored for the profile's user and
/// writes a calibrated factor back. Store failures never escape: a failed
/// read falls back to the neutral factor, a failed write reports
/// `persisted: false`.
#[instrument(skip(store, profile), fields(user_id = %profile.user_id))]
pub async fn recalibrate(store: &dyn LogStore, profile: &UserProfile) -> Recalibration {
    let user_id = &profile.user_id;

    let (weights, foods) = match tokio::try_join!(store.weights_for(user_id), store.food_for(user_id)) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "could not load logs for calibration");
            (Vec::new(), Vec::new())
        }
    };

    let result = run_calibration(user_id, &weights, &foods, profile.tdee);
    if !result.is_calibrated() {
        return Recalibration {
            result,
            persisted: false,
        };
    }

    let factor = result.inflation_factor();
    let persisted = match store.update_inflation_factor(user_id, factor).await {
        Ok(()) => {
            info!(previous = profile.inflation_factor, factor, "inflation factor updated");
            true
        }
        Err(e) => {
            warn!(error = %e, factor, "could not save inflation factor");
            false
        }
    };

    Recalibration { result, persisted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::engine::CalibrationError;
    use crate::domain::{
        ActivityLevel, FoodLogEntry, Gender, InputMode, TimeOffset, UserId, WeightSample,
    };
    use crate::store::MemoryStore;
    use time::macros::{date, datetime};
    use time::Duration;

    fn profile() -> UserProfile {
        UserProfile {
            user_id: UserId::from("Dad"),
            age: 55,
            gender: Gender::Male,
            height_cm: 175.0,
            weight_kg: 80.0,
            activity_level: ActivityLevel::Sedentary,
            tdee: 2000,
            inflation_factor: 1.0,
        }
    }

    async fn seed(store: &MemoryStore, weigh_ins: usize) {
        store.insert_profile(&profile()).await.unwrap();
        seed_logs(store, weigh_ins).await;
    }

    async fn seed_logs(store: &MemoryStore, weigh_ins: usize) {
        let start = date!(2024-05-01);
        for day in 0..weigh_ins {
            store
                .append_weight(&WeightSample {
                    date: start + Duration::days(day as i64),
                    user_id: UserId::from("Dad"),
                    weight_kg: 80.0 - 0.01 * day as f64,
                })
                .await
                .unwrap();
        }
        store
            .append_food(&FoodLogEntry {
                logged_at: datetime!(2024-05-01 12:00 UTC),
                log_date: start,
                user_id: UserId::from("Dad"),
                category: "Meal".into(),
                mode: InputMode::Text,
                food_name: "Rajma Chawal".into(),
                raw_calories: 1500,
                adjusted_calories: 1500,
                flag: "None".into(),
                offset: TimeOffset::JustNow,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn calibrated_factor_is_written_back() {
        let store = MemoryStore::new();
        seed(&store, 6).await;

        let outcome = recalibrate(&store, &profile()).await;

        // slope -0.01 kg/day: 2000 - 77 = 1923 expected, 1923 / 1500 = 1.282
        assert!(outcome.persisted);
        assert_eq!(outcome.result.inflation_factor(), 1.28);
        let stored = store
            .find_profile(&UserId::from("Dad"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.inflation_factor, 1.28);
    }

    #[tokio::test]
    async fn fallback_leaves_profile_untouched() {
        let store = MemoryStore::new();
        seed(&store, 3).await;

        let outcome = recalibrate(&store, &profile()).await;

        assert!(!outcome.persisted);
        assert_eq!(
            outcome.result,
            CalibrationResult::Fallback {
                reason: CalibrationError::TooFewWeighIns {
                    available: 3,
                    required: 5
                }
            }
        );
        let stored = store
            .find_profile(&UserId::from("Dad"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.inflation_factor, 1.0);
    }

    #[tokio::test]
    async fn missing_profile_row_reports_not_persisted() {
        let store = MemoryStore::new();
        seed_logs(&store, 6).await;

        let outcome = recalibrate(&store, &profile()).await;

        assert!(outcome.result.is_calibrated());
        assert!(!outcome.persisted);
    }

    #[tokio::test]
    async fn other_users_logs_are_ignored() {
        let store = MemoryStore::new();
        seed(&store, 6).await;
        let mut guest = profile();
        guest.user_id = UserId::from("Guest");

        let outcome = recalibrate(&store, &guest).await;

        assert_eq!(
            outcome.result,
            CalibrationResult::Fallback {
                reason: CalibrationError::NoWeightData
            }
        );
        assert!(!outcome.persisted);
    }
}
