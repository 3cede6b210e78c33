//! crates/studyforge_core/src/testutil.rs
//!
//! In-memory fakes for the core's ports, shared by the quota and pipeline
//! tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{HistoryEntry, PlanTier, ProcessingDirective, UsageSnapshot};
use crate::ports::{
    HistoryStore, ModelError, PlanStore, PortResult, StudyModelService, UsageStore,
};
use crate::quota::roll_over;

/// A fake plan/usage/history store backed by hash maps. `commit_usage`
/// mirrors the production adapter's contract: rollover and increment happen
/// under one lock.
#[derive(Default)]
pub struct InMemoryStore {
    plans: Mutex<HashMap<Uuid, PlanTier>>,
    usage: Mutex<HashMap<Uuid, UsageSnapshot>>,
    history: Mutex<Vec<HistoryEntry>>,
    pub fail_history: bool,
}

impl InMemoryStore {
    pub fn set_plan(&self, user_id: Uuid, tier: PlanTier) {
        self.plans.lock().unwrap().insert(user_id, tier);
    }

    pub fn set_usage(&self, user_id: Uuid, usage: UsageSnapshot) {
        self.usage.lock().unwrap().insert(user_id, usage);
    }

    pub fn snapshot(&self, user_id: Uuid) -> UsageSnapshot {
        *self.usage.lock().unwrap().get(&user_id).expect("no usage row")
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    pub fn last_history(&self) -> Option<HistoryEntry> {
        self.history.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PlanStore for InMemoryStore {
    async fn plan_for(&self, user_id: Uuid) -> PortResult<PlanTier> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(PlanTier::Free))
    }
}

#[async_trait]
impl UsageStore for InMemoryStore {
    async fn read_usage(&self, user_id: Uuid, today: NaiveDate) -> PortResult<UsageSnapshot> {
        Ok(self
            .usage
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UsageSnapshot::empty(today)))
    }

    async fn commit_usage(&self, user_id: Uuid, pages: u32, today: NaiveDate) -> PortResult<()> {
        let mut map = self.usage.lock().unwrap();
        let stored = map
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| UsageSnapshot::empty(today));
        let mut rolled = roll_over(stored, today);
        rolled.files_today += 1;
        rolled.files_this_month += 1;
        rolled.pages_this_month += pages;
        map.insert(user_id, rolled);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append_history(&self, entry: HistoryEntry) -> PortResult<()> {
        if self.fail_history {
            return Err(crate::ports::PortError::Unexpected(
                "history store down".to_string(),
            ));
        }
        self.history.lock().unwrap().push(entry);
        Ok(())
    }
}

/// A scripted model port. Captures every prompt it receives.
pub struct FakeModel {
    behavior: FakeBehavior,
    pub prompts: Mutex<Vec<String>>,
}

pub enum FakeBehavior {
    Reply(String),
    Auth,
    RateLimited,
    Slow(Duration, String),
}

impl FakeModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            behavior: FakeBehavior::Reply(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl StudyModelService for FakeModel {
    async fn generate(
        &self,
        prompt: &str,
        _directive: &ProcessingDirective,
    ) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.behavior {
            FakeBehavior::Reply(reply) => Ok(reply.clone()),
            FakeBehavior::Auth => Err(ModelError::Auth),
            FakeBehavior::RateLimited => Err(ModelError::RateLimited),
            FakeBehavior::Slow(delay, reply) => {
                tokio::time::sleep(*delay).await;
                Ok(reply.clone())
            }
        }
    }
}
