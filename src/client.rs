//! Outbound messaging seam
//!
//! The broker client is an external collaborator; the core only needs a
//! publish call. [`dfd_request`] is the outbound transformer that renders the
//! compensating done-for-day message from a rebuilt order.

use crate::codec::NvfixFields;
use crate::models::{ExecutionReport, RecallOrder};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("publish to {topic} failed: {reason}")]
pub struct PublishError {
    pub topic: String,
    pub reason: String,
}

/// Minimal broker surface used by the recovery driver.
pub trait MessagingClient: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

// ============================================================
// DFD TRANSFORMER
// ============================================================

/// FIX exec-type token for a done-for-day event.
const EXEC_TYPE_DONE_FOR_DAY: char = '3';

/// Render the compensating done-for-day request for a rebuilt order.
pub fn dfd_request(order: &RecallOrder) -> String {
    let fill = order.fill_request.as_ref();
    let report = ExecutionReport {
        exec_id: Uuid::new_v4().to_string(),
        exec_type: EXEC_TYPE_DONE_FOR_DAY,
        cl_ord_id: order.order_id.clone(),
        orig_cl_ord_id: order.order_id.clone(),
        order_id: order.order_id.clone(),
        last_qty: 0,
        cum_qty: fill.map(|f| f.cum_qty).unwrap_or(0),
        leaves_qty: fill.map(|f| f.leaves_qty).unwrap_or(order.ord_qty),
        last_price: 0.0,
        avg_price: fill.map(|f| f.avg_price).unwrap_or(0.0),
        order_state: "DoneOfDay".into(),
        transact_time: None,
        sending_time: None,
        symbol: order.symbol.clone(),
        account: order.account.clone(),
        currency: order.currency.clone(),
        side: order.side.clone(),
    };
    report.to_nvfix()
}

// ============================================================
// RECORDING CLIENT (test double)
// ============================================================

/// Captures published messages instead of sending them. Used by tests and
/// by the replay runner's dry mode.
#[derive(Default)]
pub struct RecordingClient {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl MessagingClient for RecordingClient {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================
