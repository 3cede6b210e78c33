//! crates/studyforge_core/src/quota.rs
//!
//! The quota resolver: applies period rollover to usage snapshots, evaluates
//! a plan's caps, and commits consumption after a successful run. Resolution
//! is read-only; incrementing is a separate operation so a failed model call
//! never consumes quota.

use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use crate::domain::{Identity, PlanLimits, PlanTier, UsageSnapshot};
use crate::plans::{self, GUEST_FILES_PER_DAY};
use crate::ports::{PlanStore, PortResult, UsageStore};

/// The outcome of resolving an identity against its plan's limits.
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    pub plan: PlanTier,
    pub limits: &'static PlanLimits,
    pub usage: UsageSnapshot,
    pub can_process: bool,
    /// Minimum of the applicable daily/monthly remaining file counts;
    /// `None` when no file-count cap applies.
    pub remaining_files: Option<u32>,
    pub remaining_pages: u32,
    pub reasons: Vec<String>,
}

/// Rolls a stored snapshot forward to `today`: the daily counter resets when
/// the date advances past `last_daily_reset`, the monthly counters when the
/// month or year advances past `last_monthly_reset`.
pub fn roll_over(mut usage: UsageSnapshot, today: NaiveDate) -> UsageSnapshot {
    if today > usage.last_daily_reset {
        usage.files_today = 0;
        usage.last_daily_reset = today;
    }
    if today.month() != usage.last_monthly_reset.month()
        || today.year() != usage.last_monthly_reset.year()
    {
        usage.files_this_month = 0;
        usage.pages_this_month = 0;
        usage.last_monthly_reset = today;
    }
    usage
}

/// Evaluates a rolled-over snapshot against a plan's limits. All three cap
/// checks run independently, so `reasons` may contain multiple entries.
pub fn evaluate(plan: PlanTier, limits: &'static PlanLimits, usage: UsageSnapshot) -> QuotaStatus {
    let mut can_process = true;
    let mut remaining_files = None;
    let mut reasons = Vec::new();

    if let Some(cap) = limits.files_per_day {
        remaining_files = Some(cap.saturating_sub(usage.files_today));
        if usage.files_today >= cap {
            can_process = false;
            reasons.push(format!("Daily limit reached ({} files/day)", cap));
        }
    }

    if let Some(cap) = limits.files_per_month {
        let monthly_remaining = cap.saturating_sub(usage.files_this_month);
        remaining_files = Some(match remaining_files {
            Some(daily) => daily.min(monthly_remaining),
            None => monthly_remaining,
        });
        if usage.files_this_month >= cap {
            can_process = false;
            reasons.push(format!("Monthly file limit reached ({} files/month)", cap));
        }
    }

    let remaining_pages = limits.pages_per_month.saturating_sub(usage.pages_this_month);
    if usage.pages_this_month >= limits.pages_per_month {
        can_process = false;
        reasons.push(format!(
            "Monthly page limit reached ({} pages/month)",
            limits.pages_per_month
        ));
    }

    QuotaStatus {
        plan,
        limits,
        usage,
        can_process,
        remaining_files,
        remaining_pages,
        reasons,
    }
}

/// Resolves and commits quota over the plan/usage ports.
#[derive(Clone)]
pub struct QuotaService {
    plans: Arc<dyn PlanStore>,
    usage: Arc<dyn UsageStore>,
}

impl QuotaService {
    pub fn new(plans: Arc<dyn PlanStore>, usage: Arc<dyn UsageStore>) -> Self {
        Self { plans, usage }
    }

    /// Read-only quota resolution. Guests use a simpler scheme: a fixed
    /// daily file cap with the counter supplied by the client, no page
    /// metering, and the free tier's page ceiling.
    pub async fn resolve(&self, identity: Identity, today: NaiveDate) -> PortResult<QuotaStatus> {
        match identity {
            Identity::Guest { files_today } => {
                let limits = plans::limits(PlanTier::Free);
                let mut usage = UsageSnapshot::empty(today);
                usage.files_today = files_today;

                let can_process = files_today < GUEST_FILES_PER_DAY;
                let reasons = if can_process {
                    Vec::new()
                } else {
                    vec![format!(
                        "Daily limit reached ({} files/day)",
                        GUEST_FILES_PER_DAY
                    )]
                };
                Ok(QuotaStatus {
                    plan: PlanTier::Free,
                    limits,
                    usage,
                    can_process,
                    remaining_files: Some(GUEST_FILES_PER_DAY.saturating_sub(files_today)),
                    remaining_pages: limits.pages_per_month,
                    reasons,
                })
            }
            Identity::User(user_id) => {
                let plan = self.plans.plan_for(user_id).await?;
                let limits = plans::limits(plan);
                let stored = self.usage.read_usage(user_id, today).await?;
                Ok(evaluate(plan, limits, roll_over(stored, today)))
            }
        }
    }

    /// Commits consumption after a successful processing run. The store
    /// re-checks rollover and increments atomically, so this is safe even if
    /// the period advanced since `resolve`. At most one call per successful
    /// request is the caller's responsibility.
    pub async fn commit(&self, identity: Identity, pages: u32, today: NaiveDate) -> PortResult<()> {
        match identity {
            // Guest counters live client-side; nothing to persist.
            Identity::Guest { .. } => Ok(()),
            Identity::User(user_id) => self.usage.commit_usage(user_id, pages, today).await,
        }
    }
}
