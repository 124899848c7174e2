use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::{ErrorGroup, Event, NewErrorGroup, NewEvent};
use crate::store::{CreateOutcome, ErrorStore, StoreTransaction};

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<i64, ErrorGroup>,
    events: Vec<Event>,
    next_group_id: i64,
    next_event_id: i64,
}

impl MemoryState {
    fn allocate_group_id(&mut self) -> i64 {
        self.next_group_id += 1;
        self.next_group_id
    }

    fn allocate_event_id(&mut self) -> i64 {
        self.next_event_id += 1;
        self.next_event_id
    }
}

/// In-process store with the same visibility rules as the database one.
///
/// Transactions stage their writes and apply them under a single lock on
/// commit. `fail_next_touch` makes the next `touch_group_updated_at` fail so
/// callers can observe rollback behavior.
#[derive(Debug, Clone, Default)]
pub struct MemoryErrorStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_touch: Arc<AtomicBool>,
}

impl MemoryErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `touch_group_updated_at` call return an error
    pub fn fail_next_touch(&self) {
        self.fail_next_touch.store(true, Ordering::SeqCst);
    }

    /// All committed groups, in creation order
    pub async fn groups(&self) -> Vec<ErrorGroup> {
        self.state.lock().await.groups.values().cloned().collect()
    }

    /// Inserts a group row directly, bypassing the uniqueness check.
    /// Only useful to reproduce stores that predate the unique constraint.
    pub async fn insert_raw_group(&self, group: &NewErrorGroup, now: i64) -> ErrorGroup {
        let mut state = self.state.lock().await;
        let id = state.allocate_group_id();
        let row = new_group_row(id, group, now);
        state.groups.insert(id, row.clone());
        row
    }
}

fn new_group_row(id: i64, group: &NewErrorGroup, now: i64) -> ErrorGroup {
    ErrorGroup {
        id,
        grouping_hash: group.grouping_hash.clone(),
        error_class: group.error_class.clone(),
        location: group.location.clone(),
        severity: group.severity.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn new_event_row(id: i64, group_id: i64, event: &NewEvent, now: i64) -> AppResult<Event> {
    Ok(Event {
        id,
        error_id: group_id,
        hostname: event.hostname.clone(),
        message: event.message.clone(),
        serialized_data: event.data.encode()?,
        created_at: now,
    })
}

#[async_trait]
impl ErrorStore for MemoryErrorStore {
    async fn find_groups_by_hash(&self, grouping_hash: &str) -> AppResult<Vec<ErrorGroup>> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .values()
            .filter(|g| g.grouping_hash == grouping_hash)
            .cloned()
            .collect())
    }

    async fn create_group_with_event(
        &self,
        group: &NewErrorGroup,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<CreateOutcome> {
        let mut state = self.state.lock().await;

        if state
            .groups
            .values()
            .any(|g| g.grouping_hash == group.grouping_hash)
        {
            return Ok(CreateOutcome::Conflict);
        }

        let group_id = state.allocate_group_id();
        let event_id = state.allocate_event_id();
        let event = new_event_row(event_id, group_id, event, now)?;
        let group = new_group_row(group_id, group, now);

        state.groups.insert(group_id, group.clone());
        state.events.push(event.clone());

        Ok(CreateOutcome::Created { group, event })
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            fail_next_touch: Arc::clone(&self.fail_next_touch),
            staged_events: Vec::new(),
            staged_touches: Vec::new(),
        }))
    }

    async fn events_for_group(&self, group_id: i64) -> AppResult<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| e.error_id == group_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(events)
    }
}

/// Staged writes of one append-path transaction
pub struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    fail_next_touch: Arc<AtomicBool>,
    staged_events: Vec<Event>,
    staged_touches: Vec<(i64, i64)>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn append_event_to_group(
        &mut self,
        group_id: i64,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<Event> {
        let mut state = self.state.lock().await;
        if !state.groups.contains_key(&group_id) {
            return Err(AppError::NotFound(format!("Error group {} not found", group_id)));
        }

        // Ids are consumed even if the transaction rolls back, like a sequence
        let event_id = state.allocate_event_id();
        let row = new_event_row(event_id, group_id, event, now)?;
        self.staged_events.push(row.clone());
        Ok(row)
    }

    async fn touch_group_updated_at(&mut self, group_id: i64, now: i64) -> AppResult<()> {
        if self.fail_next_touch.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal(format!(
                "Injected failure touching error group {}",
                group_id
            )));
        }

        let state = self.state.lock().await;
        if !state.groups.contains_key(&group_id) {
            return Err(AppError::NotFound(format!("Error group {} not found", group_id)));
        }

        self.staged_touches.push((group_id, now));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut state = self.state.lock().await;

        let referenced = self
            .staged_events
            .iter()
            .map(|e| e.error_id)
            .chain(self.staged_touches.iter().map(|(id, _)| *id));
        for group_id in referenced {
            if !state.groups.contains_key(&group_id) {
                return Err(AppError::NotFound(format!(
                    "Error group {} was deleted before commit",
                    group_id
                )));
            }
        }

        for (group_id, now) in &self.staged_touches {
            if let Some(group) = state.groups.get_mut(group_id) {
                group.updated_at = group.updated_at.max(*now);
            }
        }
        state.events.extend(self.staged_events.iter().cloned());

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
