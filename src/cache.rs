//! Thread-safe state cache
//!
//! Holds the authoritative ticket and order maps rebuilt by recovery. The
//! cache serves nothing until the one-shot `initialize` has run to
//! completion: readers either see the full replay result or an uninitialised
//! cache, never anything in between.

use crate::core_types::OrderId;
use crate::error::RecoveryError;
use crate::models::{RecallOrder, RecallTicket};
use dashmap::DashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct StateCache {
    tickets: DashMap<OrderId, RecallTicket>,
    orders: DashMap<OrderId, RecallOrder>,
    initialized: AtomicBool,
    // Serialises initialize(); concurrent callers observe one execution.
    init_gate: Mutex<()>,
}

impl StateCache {
    pub fn new() -> Self {
        Self {
            tickets: DashMap::new(),
            orders: DashMap::new(),
            initialized: AtomicBool::new(false),
            init_gate: Mutex::new(()),
        }
    }

    /// True only after `initialize` ran to completion.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// One-shot initialization. Runs `recover` under the gate; subsequent
    /// calls are no-ops. A failing `recover` leaves the cache uninitialised.
    pub fn initialize<F>(&self, recover: F) -> Result<(), RecoveryError>
    where
        F: FnOnce() -> Result<(), RecoveryError>,
    {
        let _gate = self
            .init_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.initialized.load(Ordering::Acquire) {
            debug!("cache already initialized, skipping");
            return Ok(());
        }

        recover()?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    pub fn update_recall_ticket(&self, id: impl Into<OrderId>, ticket: RecallTicket) {
        self.tickets.insert(id.into(), ticket);
    }

    pub fn update_order(&self, id: impl Into<OrderId>, order: RecallOrder) {
        self.orders.insert(id.into(), order);
    }

    /// Read a ticket; nothing is served before initialization.
    pub fn ticket(&self, id: &str) -> Option<RecallTicket> {
        if !self.is_initialized() {
            return None;
        }
        self.tickets.get(id).map(|t| t.clone())
    }

    /// Read an order; nothing is served before initialization.
    pub fn order(&self, id: &str) -> Option<RecallOrder> {
        if !self.is_initialized() {
            return None;
        }
        self.orders.get(id).map(|o| o.clone())
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// TESTS
// ============================================================
