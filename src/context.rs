//! Per-order recovery context
//!
//! Bundle built by the driver for one order: the ticket taken from the last
//! history entry, the split entry lists, and the comparator's scratch flags.
//! The rebuilt order is materialised lazily on first access and is stable
//! across repeated reads.

use crate::core_types::OrderId;
use crate::log_entry::TransactionLogEntry;
use crate::models::{RecallOrder, RecallTicket};
use crate::rebuild;
use once_cell::sync::OnceCell;

pub struct RecoveryContext {
    order_id: OrderId,
    ticket: Option<RecallTicket>,
    ticket_history_entries: Vec<TransactionLogEntry>,
    oms_entries: Vec<TransactionLogEntry>,
    rebuilt: OnceCell<Option<RecallOrder>>,
    /// Emit a compensating done-for-day publish after the cache update.
    pub needs_dfd_request: bool,
    /// Audit-only: the ticket's state was overwritten to match the order.
    pub force_ticket_state_update: bool,
}

impl RecoveryContext {
    /// Both lists must already be sorted by timestamp (stable on ties).
    /// The ticket is the payload of the latest history entry.
    pub fn new(
        order_id: impl Into<OrderId>,
        ticket_history_entries: Vec<TransactionLogEntry>,
        oms_entries: Vec<TransactionLogEntry>,
    ) -> Self {
        let ticket = ticket_history_entries
            .last()
            .and_then(|e| e.ticket())
            .cloned();
        Self {
            order_id: order_id.into(),
            ticket,
            ticket_history_entries,
            oms_entries,
            rebuilt: OnceCell::new(),
            needs_dfd_request: false,
            force_ticket_state_update: false,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn ticket(&self) -> Option<&RecallTicket> {
        self.ticket.as_ref()
    }

    /// Mutable ticket access for the comparator's state stamping.
    pub fn ticket_mut(&mut self) -> Option<&mut RecallTicket> {
        self.ticket.as_mut()
    }

    pub fn ticket_history_entries(&self) -> &[TransactionLogEntry] {
        &self.ticket_history_entries
    }

    pub fn oms_entries(&self) -> &[TransactionLogEntry] {
        &self.oms_entries
    }

    /// The rebuilt order, materialised on first access.
    pub fn rebuilt_order(&self) -> Option<&RecallOrder> {
        self.rebuilt
            .get_or_init(|| {
                let ticket = self.ticket.as_ref()?;
                rebuild::rebuild_order(ticket, &self.oms_entries)
            })
            .as_ref()
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_entry::{LogPayload, LogSource};
    use chrono::{TimeZone, Utc};

    fn history_entry(id: &str, state: &str, secs: u32) -> TransactionLogEntry {
        TransactionLogEntry::builder()
            .order_id(id)
            .source(LogSource::TicketHistory)
            .state(state)
            .timestamp(Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, secs).unwrap())
            .payload(LogPayload::Ticket(RecallTicket {
                id: id.into(),
                current_state: state.into(),
                recall_qty: 100,
                ..Default::default()
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_ticket_comes_from_latest_history_entry() {
        let ctx = RecoveryContext::new(
            "R-1",
            vec![
                history_entry("R-1", "Created", 1),
                history_entry("R-1", "PendingNew", 2),
            ],
            Vec::new(),
        );
        assert_eq!(ctx.ticket().unwrap().current_state, "PendingNew");
    }

    #[test]
    fn test_rebuilt_order_is_stable_across_reads() {
        let ctx = RecoveryContext::new(
            "R-1",
            vec![history_entry("R-1", "Created", 1)],
            Vec::new(),
        );
        let first = ctx.rebuilt_order().unwrap() as *const RecallOrder;
        let second = ctx.rebuilt_order().unwrap() as *const RecallOrder;
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_ticket_payload_means_no_rebuild() {
        let bare = TransactionLogEntry::builder()
            .order_id("R-1")
            .source(LogSource::TicketHistory)
            .state("Created")
            .timestamp(Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap())
            .build()
            .unwrap();
        let ctx = RecoveryContext::new("R-1", vec![bare], Vec::new());
        assert!(ctx.ticket().is_none());
        assert!(ctx.rebuilt_order().is_none());
    }
}
