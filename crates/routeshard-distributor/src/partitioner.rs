//! Task-space partitioner.
//!
//! Slices `[0, final_boundary)` into ranges of `chunk_size`, materializing at
//! most `batch_size` new ranges per refill. Ranges stay in the pending list
//! until a matching completion arrives; ranges held by a vanished worker are
//! returned to the pool by [`Partitioner::reconcile`].

use std::collections::HashSet;

use tracing::{debug, info};

use routeshard_core::{SpaceIndex, TaskRange, WorkerAddr};

/// Lazily generated, bounded queue of task ranges.
#[derive(Debug)]
pub struct Partitioner {
    cursor: SpaceIndex,
    final_boundary: SpaceIndex,
    chunk_size: SpaceIndex,
    batch_size: usize,
    callback_url: String,
    pending: Vec<TaskRange>,
}

impl Partitioner {
    /// Create an idle partitioner. Zero sizes are raised to one.
    pub fn new(chunk_size: u64, batch_size: usize, callback_url: impl Into<String>) -> Self {
        Self {
            cursor: SpaceIndex::zero(),
            final_boundary: SpaceIndex::zero(),
            chunk_size: SpaceIndex::from(chunk_size.max(1)),
            batch_size: batch_size.max(1),
            callback_url: callback_url.into(),
            pending: Vec::new(),
        }
    }

    /// Begin a fresh space ending at `final_boundary`.
    pub fn start(&mut self, final_boundary: SpaceIndex) {
        self.reset();
        info!(final_boundary = %final_boundary, "Partitioner started");
        self.final_boundary = final_boundary;
    }

    /// The first unassigned pending range, refilling if none is left.
    ///
    /// The range stays in the pending list.
    pub fn next_task(&mut self) -> Option<TaskRange> {
        self.next_index().map(|i| self.pending[i].clone())
    }

    /// Pick the next range and assign it to `worker` in one step.
    pub fn assign_next(&mut self, worker: WorkerAddr) -> Option<TaskRange> {
        let i = self.next_index()?;
        let range = &mut self.pending[i];
        range.assign(worker);
        Some(range.clone())
    }

    /// Clear the assignment of a pending range, if it is still pending.
    pub fn release(&mut self, range: &TaskRange) -> bool {
        match self.pending.iter_mut().find(|r| *r == range) {
            Some(r) => {
                r.unassign();
                true
            }
            None => false,
        }
    }

    /// Drop the pending range matching `range` by `(start, end)`.
    pub fn complete_task(&mut self, range: &TaskRange) -> bool {
        let before = self.pending.len();
        self.pending.retain(|r| r != range);
        let removed = self.pending.len() != before;
        if removed {
            debug!(range = %range, "Range completed");
        }
        removed
    }

    /// Return ranges held by workers not in `live` to the pool.
    ///
    /// Returns how many assignments were cleared.
    pub fn reconcile(&mut self, live: &HashSet<WorkerAddr>) -> usize {
        let mut cleared = 0;
        for range in &mut self.pending {
            let orphaned = matches!(&range.worker, Some(w) if !live.contains(w));
            if orphaned {
                info!(
                    range = %range,
                    worker = %range.worker.as_ref().map(|w| w.to_string()).unwrap_or_default(),
                    "Worker abandoned range"
                );
                range.unassign();
                cleared += 1;
            }
        }
        cleared
    }

    /// Cursor back to zero and the pending list emptied. An idle
    /// partitioner hands out nothing until the next [`Partitioner::start`].
    pub fn reset(&mut self) {
        self.cursor = SpaceIndex::zero();
        self.final_boundary = SpaceIndex::zero();
        self.pending.clear();
    }

    pub fn cursor(&self) -> &SpaceIndex {
        &self.cursor
    }

    pub fn final_boundary(&self) -> &SpaceIndex {
        &self.final_boundary
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn assigned_len(&self) -> usize {
        self.pending.iter().filter(|r| r.is_assigned()).count()
    }

    /// All ranges generated and none outstanding.
    pub fn is_drained(&self) -> bool {
        self.cursor == self.final_boundary && self.pending.is_empty()
    }

    fn next_index(&mut self) -> Option<usize> {
        if let Some(i) = self.first_unassigned() {
            return Some(i);
        }
        if self.cursor >= self.final_boundary {
            return None;
        }
        self.refill();
        self.first_unassigned()
    }

    fn first_unassigned(&self) -> Option<usize> {
        self.pending.iter().position(|r| !r.is_assigned())
    }

    fn refill(&mut self) {
        let mut generated = 0;
        while generated < self.batch_size && self.cursor < self.final_boundary {
            let end = self
                .cursor
                .advance_clipped(&self.chunk_size, &self.final_boundary);
            self.pending.push(TaskRange::new(
                self.cursor.clone(),
                end.clone(),
                self.callback_url.clone(),
            ));
            self.cursor = end;
            generated += 1;
        }
        debug!(generated, cursor = %self.cursor, "Generated ranges");
    }
}
