//! Storage collaborator for the merge engine.
//!
//! The engine only talks to storage through [`ErrorStore`], so the same
//! lookup-or-create logic runs against PostgreSQL in production and against
//! an in-memory store in tests. The store, not the engine, guarantees that a
//! grouping hash is created at most once.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{ErrorGroup, Event, NewErrorGroup, NewEvent};

pub use memory::MemoryErrorStore;
pub use postgres::PgErrorStore;

/// Result of trying to create a group together with its first event
#[derive(Debug)]
pub enum CreateOutcome {
    /// Both rows were written atomically
    Created { group: ErrorGroup, event: Event },
    /// Another writer already owns this grouping hash; nothing was written
    Conflict,
}

/// Grouping-aware storage operations used by the merge engine
#[async_trait]
pub trait ErrorStore: Send + Sync {
    /// Returns every group whose grouping hash equals `grouping_hash`
    async fn find_groups_by_hash(&self, grouping_hash: &str) -> AppResult<Vec<ErrorGroup>>;

    /// Inserts a group and its first event as one unit, stamping both
    /// `created_at` and `updated_at` with `now`
    async fn create_group_with_event(
        &self,
        group: &NewErrorGroup,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<CreateOutcome>;

    /// Starts a transaction for the append path
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;

    /// Events of a group, newest first
    async fn events_for_group(&self, group_id: i64) -> AppResult<Vec<Event>>;
}

/// Writes that must land together or not at all.
///
/// Nothing written through a transaction is visible to other readers until
/// [`StoreTransaction::commit`] succeeds.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn append_event_to_group(
        &mut self,
        group_id: i64,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<Event>;

    /// Advances `updated_at` to `now`; never moves it backwards
    async fn touch_group_updated_at(&mut self, group_id: i64, now: i64) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
