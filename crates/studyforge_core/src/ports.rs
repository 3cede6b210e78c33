//! crates/studyforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the pipeline's collaborators.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the database, HTTP layer, and model API.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{HistoryEntry, PlanTier, ProcessingDirective, UsageSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for persistence-port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures from the generative-model API, classified once at the adapter so
/// the pipeline can map them onto the error taxonomy without re-inspecting
/// upstream messages.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Invalid or missing API credential. Fatal, configuration-level.
    #[error("model API authentication failed")]
    Auth,
    /// The upstream API rejected the request for rate reasons. Transient;
    /// an outer layer may retry, the pipeline itself does not.
    #[error("model API rate limit exceeded")]
    RateLimited,
    #[error("model API error: {0}")]
    Other(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Looks up the active subscription tier for an account.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn plan_for(&self, user_id: Uuid) -> PortResult<PlanTier>;
}

/// Reads and atomically advances per-user usage counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Returns the stored snapshot, or a zeroed one anchored at `today` for
    /// users with no usage row yet. Does not apply period rollover; callers
    /// roll the snapshot forward themselves.
    async fn read_usage(&self, user_id: Uuid, today: NaiveDate) -> PortResult<UsageSnapshot>;

    /// Atomically applies period rollover and then increments the daily file,
    /// monthly file, and monthly page counters. Must be safe under concurrent
    /// commits for the same user: the rollover-check-increment sequence is a
    /// single storage-level operation.
    async fn commit_usage(&self, user_id: Uuid, pages: u32, today: NaiveDate) -> PortResult<()>;
}

/// Appends a processing-history record. Failures are logged and swallowed by
/// the caller; history must never fail a processing request.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history(&self, entry: HistoryEntry) -> PortResult<()>;
}

/// Dispatches a prompt to the generative model and returns its raw text
/// reply. Implementations own model-id mapping and transport; the pipeline
/// owns the wall-clock timeout around the call.
#[async_trait]
pub trait StudyModelService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        directive: &ProcessingDirective,
    ) -> Result<String, ModelError>;
}
