//! Persistence for profiles, weigh-ins and food logs.
//!
//! Three append-only tables; the only in-place update is the profile's
//! inflation factor, written back by calibration.

#[cfg(test)]
pub mod memory;
pub mod pg;
mod rows;

use async_trait::async_trait;

use crate::domain::{FoodLogEntry, UserId, UserProfile, WeightSample};

#[cfg(test)]
pub use memory::MemoryStore;
pub use pg::PgStore;

pub const PROFILES_TABLE: &str = "user_profiles";
pub const WEIGHTS_TABLE: &str = "weight_logs";
pub const FOOD_TABLE: &str = "food_logs";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed row in {table}: {reason}")]
    MalformedRow { table: &'static str, reason: String },

    #[error("profile already exists for {0}")]
    ProfileExists(UserId),

    #[error("no profile for {0}")]
    ProfileMissing(UserId),
}

impl StoreError {
    pub(crate) fn malformed(table: &'static str, reason: impl ToString) -> Self {
        StoreError::MalformedRow {
            table,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Inserts a new profile; fails with `ProfileExists` if the user has one.
    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn update_inflation_factor(
        &self,
        user_id: &UserId,
        inflation_factor: f64,
    ) -> Result<(), StoreError>;

    async fn append_weight(&self, sample: &WeightSample) -> Result<(), StoreError>;

    /// Weigh-ins for one user, oldest first.
    async fn weights_for(&self, user_id: &UserId) -> Result<Vec<WeightSample>, StoreError>;

    async fn append_food(&self, entry: &FoodLogEntry) -> Result<(), StoreError>;

    /// Food log entries for one user, oldest first.
    async fn food_for(&self, user_id: &UserId) -> Result<Vec<FoodLogEntry>, StoreError>;
}
