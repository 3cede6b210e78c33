//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the plan, usage, and history ports from the `core`
//! crate. It handles all interactions with the PostgreSQL database using
//! `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use studyforge_core::domain::{HistoryEntry, PlanTier, UsageSnapshot};
use studyforge_core::ports::{HistoryStore, PlanStore, PortError, PortResult, UsageStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter implementing the `PlanStore`, `UsageStore`, and
/// `HistoryStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UsageRecord {
    files_today: i32,
    files_month: i32,
    pages_month: i32,
    last_daily_reset: NaiveDate,
    last_monthly_reset: NaiveDate,
}

impl UsageRecord {
    fn to_domain(self) -> UsageSnapshot {
        UsageSnapshot {
            files_today: self.files_today.max(0) as u32,
            files_this_month: self.files_month.max(0) as u32,
            pages_this_month: self.pages_month.max(0) as u32,
            last_daily_reset: self.last_daily_reset,
            last_monthly_reset: self.last_monthly_reset,
        }
    }
}

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

#[async_trait]
impl PlanStore for DbAdapter {
    async fn plan_for(&self, user_id: Uuid) -> PortResult<PlanTier> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT plan FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Users without a row (or with an unknown tier) are free users.
        Ok(row
            .map(|(plan,)| PlanTier::from_str_or_free(&plan))
            .unwrap_or(PlanTier::Free))
    }
}

#[async_trait]
impl UsageStore for DbAdapter {
    async fn read_usage(&self, user_id: Uuid, today: NaiveDate) -> PortResult<UsageSnapshot> {
        let record: Option<UsageRecord> = sqlx::query_as(
            "SELECT files_today, files_month, pages_month, last_daily_reset, last_monthly_reset \
             FROM usage_counters WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record
            .map(UsageRecord::to_domain)
            .unwrap_or_else(|| UsageSnapshot::empty(today)))
    }

    // The rollover-check-increment sequence runs as one statement so two
    // simultaneous commits for the same user cannot both read a stale row.
    async fn commit_usage(&self, user_id: Uuid, pages: u32, today: NaiveDate) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_counters
                (user_id, files_today, files_month, pages_month, last_daily_reset, last_monthly_reset)
            VALUES ($1, 1, 1, $2, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                files_today = CASE
                    WHEN usage_counters.last_daily_reset < $3 THEN 1
                    ELSE usage_counters.files_today + 1
                END,
                files_month = CASE
                    WHEN date_trunc('month', usage_counters.last_monthly_reset)
                         < date_trunc('month', $3::date) THEN 1
                    ELSE usage_counters.files_month + 1
                END,
                pages_month = CASE
                    WHEN date_trunc('month', usage_counters.last_monthly_reset)
                         < date_trunc('month', $3::date) THEN $2
                    ELSE usage_counters.pages_month + $2
                END,
                last_daily_reset = GREATEST(usage_counters.last_daily_reset, $3),
                last_monthly_reset = CASE
                    WHEN date_trunc('month', usage_counters.last_monthly_reset)
                         < date_trunc('month', $3::date) THEN $3
                    ELSE usage_counters.last_monthly_reset
                END
            "#,
        )
        .bind(user_id)
        .bind(pages as i32)
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for DbAdapter {
    async fn append_history(&self, entry: HistoryEntry) -> PortResult<()> {
        let flashcards = serde_json::to_value(&entry.flashcards)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO processing_history
                (id, user_id, file_name, file_size_bytes, page_count, pages_processed,
                 summary, flashcards, model_used, extracted_chars, partial_processing)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(&entry.file_name)
        .bind(entry.file_size_bytes as i64)
        .bind(entry.page_count as i32)
        .bind(entry.pages_processed as i32)
        .bind(&entry.summary)
        .bind(flashcards)
        .bind(format!("{:?}", entry.model).to_lowercase())
        .bind(entry.extracted_chars as i64)
        .bind(entry.partial_processing)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
