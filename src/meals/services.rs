use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::{adjusted_calories, FoodLogEntry, TimeOffset, UserId, MEAL_CATEGORY};
use crate::estimation::{EstimationError, MealEstimator, MealInput};
use crate::session::{PendingMeal, Session};
use crate::store::{LogStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("input needed")]
    EmptyInput,

    #[error("AI Error: {0}")]
    Estimation(#[from] EstimationError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("no meal waiting for review")]
    NothingPending,

    #[error("profile setup required")]
    ProfileRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Estimates a meal and parks it in the session for review.
///
/// A failed estimate leaves nothing pending.
pub async fn analyze(
    estimator: &dyn MealEstimator,
    session: &mut Session,
    input: MealInput,
    offset: TimeOffset,
) -> Result<PendingMeal, AnalyzeError> {
    session.reset_stage();
    if input.is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }

    let mode = input.mode();
    let estimate = estimator.estimate(input).await.map_err(|e| {
        warn!(error = %e, user_id = %session.user_id, "meal estimation failed");
        e
    })?;

    let pending = PendingMeal {
        estimate,
        mode,
        offset,
    };
    debug!(
        user_id = %session.user_id,
        food = %pending.estimate.food_name,
        calories = pending.estimate.calories,
        "meal awaiting review"
    );
    session.begin_review(pending.clone());
    Ok(pending)
}

/// Food log row for a reviewed meal, using the factor in effect right now.
pub fn build_entry(
    user_id: &UserId,
    pending: &PendingMeal,
    inflation_factor: f64,
    now: OffsetDateTime,
) -> FoodLogEntry {
    FoodLogEntry {
        logged_at: now,
        log_date: now.date(),
        user_id: user_id.clone(),
        category: MEAL_CATEGORY.to_string(),
        mode: pending.mode,
        food_name: pending.estimate.food_name.clone(),
        raw_calories: pending.estimate.calories,
        adjusted_calories: adjusted_calories(pending.estimate.calories, inflation_factor),
        flag: pending.estimate.flag.clone(),
        offset: pending.offset,
    }
}

/// Saves the pending meal with the factor currently stored for the user.
/// On a store failure the meal stays pending.
pub async fn confirm(
    store: &dyn LogStore,
    session: &mut Session,
    now: OffsetDateTime,
) -> Result<FoodLogEntry, ConfirmError> {
    // Another session may have recalibrated since this one cached the profile.
    let factor = session
        .refresh_profile(store)
        .await?
        .map(|p| p.inflation_factor)
        .ok_or(ConfirmError::ProfileRequired)?;
    let pending = session.pending().ok_or(ConfirmError::NothingPending)?;

    let entry = build_entry(&session.user_id, pending, factor, now);
    store.append_food(&entry).await?;

    session.reset_stage();
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityLevel, Gender, InputMode, UserProfile};
    use crate::estimation::{parse_estimate, MealEstimate};
    use crate::session::registry::{LogStage, SessionHandle};
    use crate::session::SessionRegistry;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use time::macros::datetime;
    use time::Duration;

    struct Reply(&'static str);

    #[async_trait]
    impl MealEstimator for Reply {
        async fn estimate(&self, _input: MealInput) -> Result<MealEstimate, EstimationError> {
            parse_estimate(self.0)
        }
    }

    fn profile(factor: f64) -> UserProfile {
        UserProfile {
            user_id: UserId::from("Mom"),
            age: 50,
            gender: Gender::Female,
            height_cm: 160.0,
            weight_kg: 70.0,
            activity_level: ActivityLevel::Sedentary,
            tdee: 1546,
            inflation_factor: factor,
        }
    }

    async fn session(factor: f64) -> SessionHandle {
        let registry = SessionRegistry::new(Duration::hours(1));
        let (_, handle) = registry
            .open(UserId::from("Mom"), Some(profile(factor)))
            .await;
        handle
    }

    #[tokio::test]
    async fn analyze_parks_estimate_for_review() {
        let handle = session(1.0).await;
        let mut s = handle.lock().await;

        let pending = analyze(
            &Reply("Aloo Paratha | 400 | high fat"),
            &mut s,
            MealInput::Text("two parathas".into()),
            TimeOffset::OneHourAgo,
        )
        .await
        .unwrap();

        assert_eq!(pending.estimate.calories, 400);
        assert_eq!(pending.mode, InputMode::Text);
        assert_eq!(s.stage, LogStage::Review(pending));
    }

    #[tokio::test]
    async fn analyze_rejects_empty_input() {
        let handle = session(1.0).await;
        let mut s = handle.lock().await;
        let err = analyze(&Reply("x | 1"), &mut s, MealInput::Text("  ".into()), TimeOffset::JustNow)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::EmptyInput));
    }

    #[tokio::test]
    async fn failed_estimate_discards_previous_pending() {
        let handle = session(1.0).await;
        let mut s = handle.lock().await;
        analyze(&Reply("Dal | 300 | None"), &mut s, MealInput::Text("dal".into()), TimeOffset::JustNow)
            .await
            .unwrap();

        let err = analyze(&Reply("Dal | lots | None"), &mut s, MealInput::Text("dal".into()), TimeOffset::JustNow)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Estimation(EstimationError::InvalidCalories(_))));
        assert!(s.pending().is_none());
    }

    #[test]
    fn entry_uses_factor_at_write_time() {
        let pending = PendingMeal {
            estimate: MealEstimate {
                food_name: "Biryani".into(),
                calories: 700,
                flag: "high fat".into(),
            },
            mode: InputMode::Image,
            offset: TimeOffset::ThirtyMinutesAgo,
        };
        let now = datetime!(2024-06-10 13:05:00 UTC);
        let entry = build_entry(&UserId::from("Mom"), &pending, 1.15, now);

        assert_eq!(entry.raw_calories, 700);
        assert_eq!(entry.adjusted_calories, (700.0 * 1.15) as i64);
        assert_eq!(entry.category, "Meal");
        assert_eq!(entry.log_date, now.date());
        assert_eq!(entry.offset, TimeOffset::ThirtyMinutesAgo);
    }

    #[tokio::test]
    async fn confirm_saves_and_later_factor_changes_do_not_rewrite() {
        let store = MemoryStore::new();
        store.insert_profile(&profile(1.2)).await.unwrap();
        let handle = session(1.2).await;
        let mut s = handle.lock().await;

        analyze(&Reply("Thali | 900 | None"), &mut s, MealInput::Text("thali".into()), TimeOffset::JustNow)
            .await
            .unwrap();
        let saved = confirm(&store, &mut s, datetime!(2024-06-10 20:00 UTC))
            .await
            .unwrap();
        assert_eq!(saved.adjusted_calories, 1080);
        assert!(s.pending().is_none());

        // Recalibration only touches the profile.
        store
            .update_inflation_factor(&UserId::from("Mom"), 0.8)
            .await
            .unwrap();
        let logged = store.food_for(&UserId::from("Mom")).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].adjusted_calories, 1080);
        assert_eq!(logged[0].raw_calories, 900);
    }

    #[tokio::test]
    async fn confirm_without_pending_meal_fails() {
        let store = MemoryStore::new();
        store.insert_profile(&profile(1.0)).await.unwrap();
        let handle = session(1.0).await;
        let mut s = handle.lock().await;
        let err = confirm(&store, &mut s, datetime!(2024-06-10 20:00 UTC))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::NothingPending));
    }

    #[tokio::test]
    async fn confirm_uses_stored_factor_over_stale_cache() {
        let store = MemoryStore::new();
        store.insert_profile(&profile(1.0)).await.unwrap();
        let handle = session(1.0).await;
        let mut s = handle.lock().await;

        analyze(&Reply("Dal Chawal | 450"), &mut s, MealInput::Text("dal".into()), TimeOffset::JustNow)
            .await
            .unwrap();
        // Recalibrated through another session.
        store
            .update_inflation_factor(&UserId::from("Mom"), 1.42)
            .await
            .unwrap();

        let saved = confirm(&store, &mut s, datetime!(2024-06-10 20:00 UTC))
            .await
            .unwrap();
        assert_eq!(saved.adjusted_calories, 639);
        assert_eq!(s.profile.as_ref().unwrap().inflation_factor, 1.42);
    }

    #[tokio::test]
    async fn confirm_without_stored_profile_fails() {
        let store = MemoryStore::new();
        let handle = session(1.0).await;
        let mut s = handle.lock().await;
        analyze(&Reply("Dal | 300"), &mut s, MealInput::Text("dal".into()), TimeOffset::JustNow)
            .await
            .unwrap();

        let err = confirm(&store, &mut s, datetime!(2024-06-10 20:00 UTC))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::ProfileRequired));
        assert!(s.pending().is_some());
    }
}
