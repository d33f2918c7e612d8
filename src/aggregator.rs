//! Transaction log aggregator
//!
//! Buffers log entries by order ID as they arrive on the three topic streams
//! during the replay window. Subscribers append from their own threads; the
//! driver waits for replay parity (bounded by the configured timeout) and
//! then drains the whole buffer in one step. Entries arriving after the
//! drain are lost - replay is at-most-once by the bookmark contract.

use crate::core_types::OrderId;
use crate::log_entry::{LogSource, TransactionLogEntry};
use rustc_hash::FxHashMap;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::Duration;
use tracing::debug;

struct AggregatorInner {
    entries: FxHashMap<OrderId, Vec<TransactionLogEntry>>,
    pending_streams: HashSet<LogSource>,
}

/// Thread-safe per-order buffer for the replay window.
pub struct TransactionLogAggregator {
    inner: Mutex<AggregatorInner>,
    replay_done: Condvar,
}

impl TransactionLogAggregator {
    pub fn new() -> Self {
        let pending_streams = HashSet::from([
            LogSource::TicketHistory,
            LogSource::RecallToOms,
            LogSource::OmsToRecall,
        ]);
        Self {
            inner: Mutex::new(AggregatorInner {
                entries: FxHashMap::default(),
                pending_streams,
            }),
            replay_done: Condvar::new(),
        }
    }

    /// Append an entry in arrival order. No cross-order ordering is implied.
    pub fn append(&self, entry: TransactionLogEntry) {
        let mut inner = self.lock();
        inner
            .entries
            .entry(entry.order_id().to_string())
            .or_default()
            .push(entry);
    }

    /// Mark one stream as having reached bookmark parity.
    pub fn mark_replay_complete(&self, source: LogSource) {
        let mut inner = self.lock();
        if inner.pending_streams.remove(&source) {
            debug!(stream = source.label(), "replay stream reached parity");
        }
        if inner.pending_streams.is_empty() {
            self.replay_done.notify_all();
        }
    }

    /// Block until every stream reached parity or the timeout elapses.
    /// Returns whether parity was reached.
    pub fn wait_for_replay(&self, timeout: Duration) -> bool {
        let inner = self.lock();
        let (inner, _timed_out) = self
            .replay_done
            .wait_timeout_while(inner, timeout, |s| !s.pending_streams.is_empty())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.pending_streams.is_empty()
    }

    /// Take everything aggregated so far.
    pub fn drain(&self) -> FxHashMap<OrderId, Vec<TransactionLogEntry>> {
        std::mem::take(&mut self.lock().entries)
    }

    pub fn order_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AggregatorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TransactionLogAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// TESTS
// ============================================================
