//! Session waiting list with priority ordering and FIFO tie-breaks.
//!
//! Bounded: a fixed number of queued items plus a ring of processed
//! history. Positions are recomputed after every mutation so reads are
//! O(1).

use std::collections::VecDeque;
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{QueueItem, QueueItemStatus, SessionOptions};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
pub const DEFAULT_PRIORITY: u8 = 3;

struct QueueState {
    /// Kept sorted: highest priority first, then oldest request, then
    /// arrival sequence for full determinism.
    queued: Vec<(u64, QueueItem)>,
    history: VecDeque<QueueItem>,
    next_seq: u64,
}

/// Priority-ordered waiting list for session requests.
pub struct SessionQueue {
    capacity: usize,
    history_capacity: usize,
    state: Mutex<QueueState>,
}

impl SessionQueue {
    pub fn new(capacity: usize, history_capacity: usize) -> Self {
        Self {
            capacity,
            history_capacity,
            state: Mutex::new(QueueState {
                queued: Vec::new(),
                history: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    /// Add a request. Fails when the queue is full or the priority is out
    /// of range.
    pub fn enqueue(
        &self,
        project_id: Uuid,
        project_name: &str,
        priority: u8,
        options: SessionOptions,
    ) -> DomainResult<QueueItem> {
        if !(1..=5).contains(&priority) {
            return Err(DomainError::validation(format!(
                "priority {priority} out of range 1..5"
            )));
        }

        let mut state = self.state.lock().expect("queue mutex poisoned");
        if state.queued.len() >= self.capacity {
            return Err(DomainError::conflict(format!(
                "queue is full ({} items)",
                self.capacity
            )));
        }

        let mut item = QueueItem::new(project_id, project_name, priority);
        item.options = options;

        let seq = state.next_seq;
        state.next_seq += 1;
        state.queued.push((seq, item.clone()));
        Self::resort(&mut state);

        // Return the snapshot with its freshly computed position.
        let position = state
            .queued
            .iter()
            .find(|(s, _)| *s == seq)
            .map(|(_, i)| i.position)
            .unwrap_or(0);
        item.position = position;
        Ok(item)
    }

    /// Remove and return the best queued item: highest priority, oldest
    /// request on ties. Deterministic for any interleaving.
    pub fn dequeue(&self) -> Option<QueueItem> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        if state.queued.is_empty() {
            return None;
        }
        let (_, mut item) = state.queued.remove(0);
        item.status = QueueItemStatus::Running;
        item.position = 0;
        Self::push_history(&mut state, self.history_capacity, item.clone());
        Self::resort(&mut state);
        Some(item)
    }

    /// Cancel a queued item, moving it to history.
    pub fn cancel(&self, item_id: Uuid) -> DomainResult<QueueItem> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        let index = state
            .queued
            .iter()
            .position(|(_, item)| item.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("queue item {item_id}")))?;
        let (_, mut item) = state.queued.remove(index);
        item.status = QueueItemStatus::Cancelled;
        item.position = 0;
        Self::push_history(&mut state, self.history_capacity, item.clone());
        Self::resort(&mut state);
        Ok(item)
    }

    /// Mark a previously dequeued item completed in the history ring.
    pub fn mark_completed(&self, item_id: Uuid) {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        if let Some(item) = state.history.iter_mut().find(|i| i.id == item_id) {
            item.status = QueueItemStatus::Completed;
        }
    }

    /// Current queued items in dequeue order, positions filled in.
    pub fn snapshot(&self) -> Vec<QueueItem> {
        let state = self.state.lock().expect("queue mutex poisoned");
        state.queued.iter().map(|(_, item)| item.clone()).collect()
    }

    /// Processed history, most recent last.
    pub fn history(&self) -> Vec<QueueItem> {
        let state = self.state.lock().expect("queue mutex poisoned");
        state.history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue mutex poisoned").queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resort(state: &mut QueueState) {
        state.queued.sort_by(|(seq_a, a), (seq_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then(a.requested_at.cmp(&b.requested_at))
                .then(seq_a.cmp(seq_b))
        });
        for (index, (_, item)) in state.queued.iter_mut().enumerate() {
            item.position = index + 1;
        }
    }

    fn push_history(state: &mut QueueState, capacity: usize, item: QueueItem) {
        state.history.push_back(item);
        while state.history.len() > capacity {
            state.history.pop_front();
        }
    }
}

impl Default for SessionQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_HISTORY_CAPACITY)
    }
}
