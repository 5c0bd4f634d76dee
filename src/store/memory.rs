use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LogStore, StoreError};
use crate::domain::{FoodLogEntry, UserId, UserProfile, WeightSample};

#[derive(Default)]
struct Tables {
    profiles: Vec<UserProfile>,
    weights: Vec<WeightSample>,
    food: Vec<FoodLogEntry>,
}

/// Process-local store with the same semantics as the Postgres tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .find(|p| &p.user_id == user_id)
            .cloned())
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.profiles.iter().any(|p| p.user_id == profile.user_id) {
            return Err(StoreError::ProfileExists(profile.user_id.clone()));
        }
        tables.profiles.push(profile.clone());
        Ok(())
    }

    async fn update_inflation_factor(
        &self,
        user_id: &UserId,
        inflation_factor: f64,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| &p.user_id == user_id)
            .ok_or_else(|| StoreError::ProfileMissing(user_id.clone()))?;
        profile.inflation_factor = inflation_factor;
        Ok(())
    }

    async fn append_weight(&self, sample: &WeightSample) -> Result<(), StoreError> {
        self.tables.write().await.weights.push(sample.clone());
        Ok(())
    }

    async fn weights_for(&self, user_id: &UserId) -> Result<Vec<WeightSample>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .weights
            .iter()
            .filter(|w| &w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn append_food(&self, entry: &FoodLogEntry) -> Result<(), StoreError> {
        self.tables.write().await.food.push(entry.clone());
        Ok(())
    }

    async fn food_for(&self, user_id: &UserId) -> Result<Vec<FoodLogEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .food
            .iter()
            .filter(|f| &f.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityLevel, Gender};
    use time::macros::date;

    fn profile(user: &str) -> UserProfile {
        UserProfile {
            user_id: UserId::from(user),
            age: 40,
            gender: Gender::Male,
            height_cm: 175.0,
            weight_kg: 82.0,
            activity_level: ActivityLevel::Sedentary,
            tdee: 2100,
            inflation_factor: 1.0,
        }
    }

    #[tokio::test]
    async fn profile_insert_is_once_per_user() {
        let store = MemoryStore::new();
        store.insert_profile(&profile("Dad")).await.unwrap();

        let err = store.insert_profile(&profile(" Dad")).await.unwrap_err();
        assert!(matches!(err, StoreError::ProfileExists(_)));

        let found = store.find_profile(&UserId::from("Dad")).await.unwrap();
        assert_eq!(found.unwrap().tdee, 2100);
        assert!(store.find_profile(&UserId::from("Mom")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_factor_requires_profile() {
        let store = MemoryStore::new();
        let err = store
            .update_inflation_factor(&UserId::from("Mom"), 1.2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProfileMissing(_)));

        store.insert_profile(&profile("Mom")).await.unwrap();
        store
            .update_inflation_factor(&UserId::from("Mom"), 1.2)
            .await
            .unwrap();
        let found = store.find_profile(&UserId::from("Mom")).await.unwrap().unwrap();
        assert_eq!(found.inflation_factor, 1.2);
    }

    #[tokio::test]
    async fn weights_are_scoped_to_user_in_insertion_order() {
        let store = MemoryStore::new();
        for (user, kg) in [("7", 80.0), ("Mom", 60.0), ("7", 79.5)] {
            store
                .append_weight(&WeightSample {
                    date: date!(2024-05-01),
                    user_id: UserId::from(user),
                    weight_kg: kg,
                })
                .await
                .unwrap();
        }

        let mine = store.weights_for(&UserId::from(7_i64)).await.unwrap();
        let kgs: Vec<f64> = mine.iter().map(|w| w.weight_kg).collect();
        assert_eq!(kgs, vec![80.0, 79.5]);
    }
}
