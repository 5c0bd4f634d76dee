use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::rows::{FoodRow, ProfileRow, WeightRow};
use super::{LogStore, StoreError};
use crate::domain::{FoodLogEntry, UserId, UserProfile, WeightSample};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn find_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, age, gender, height, weight, activity, tdee, inflation_factor
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, age, gender, height, weight, activity, tdee, inflation_factor)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(profile.age as i32)
        .bind(profile.gender.label())
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.activity_level.label())
        .bind(profile.tdee)
        .bind(profile.inflation_factor)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProfileExists(profile.user_id.clone()));
        }
        Ok(())
    }

    async fn update_inflation_factor(
        &self,
        user_id: &UserId,
        inflation_factor: f64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
               SET inflation_factor = $2
             WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(inflation_factor)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProfileMissing(user_id.clone()));
        }
        Ok(())
    }

    async fn append_weight(&self, sample: &WeightSample) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO weight_logs (date, user_id, weight_kg)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(sample.date)
        .bind(sample.user_id.as_str())
        .bind(sample.weight_kg)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn weights_for(&self, user_id: &UserId) -> Result<Vec<WeightSample>, StoreError> {
        let rows = sqlx::query_as::<_, WeightRow>(
            r#"
            SELECT date, user_id, weight_kg
              FROM weight_logs
             WHERE user_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(WeightSample::try_from).collect()
    }

    async fn append_food(&self, entry: &FoodLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO food_logs
                (logged_at, log_date, user_id, category, mode, food_name,
                 raw_cals, final_cals, flag, time_offset)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.logged_at)
        .bind(entry.log_date)
        .bind(entry.user_id.as_str())
        .bind(&entry.category)
        .bind(entry.mode.label())
        .bind(&entry.food_name)
        .bind(entry.raw_calories)
        .bind(entry.adjusted_calories)
        .bind(&entry.flag)
        .bind(entry.offset.label())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn food_for(&self, user_id: &UserId) -> Result<Vec<FoodLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, FoodRow>(
            r#"
            SELECT logged_at, log_date, user_id, category, mode, food_name,
                   raw_cals, final_cals, flag, time_offset
              FROM food_logs
             WHERE user_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FoodLogEntry::try_from).collect()
    }
}
