//! Transaction log entries
//!
//! One entry per message observed on one of the three replay topics. Entries
//! are immutable once built; the builder enforces the identity fields the
//! recovery pipeline depends on.

use crate::core_types::{OrderId, Price, Qty};
use crate::models::{ExecutionReport, RecallOrder, RecallTicket};
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================
// SOURCE TOPIC
// ============================================================

/// Which of the three replay streams an entry came from.
///
/// Actual topic names are configuration; this is the internal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// Ticket history stream (`RECALL/TICKET/HISTORY` by default).
    TicketHistory,
    /// Outbound order stream (`RECALL/TO/OMS` by default).
    RecallToOms,
    /// Inbound execution-report stream (`OMS/TO/RECALL` by default).
    OmsToRecall,
}

impl LogSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TicketHistory => "ticket-history",
            Self::RecallToOms => "recall-to-oms",
            Self::OmsToRecall => "oms-to-recall",
        }
    }

    /// OMS streams feed the rebuilder; the history stream feeds the ticket.
    #[inline]
    pub fn is_oms(&self) -> bool {
        matches!(self, Self::RecallToOms | Self::OmsToRecall)
    }
}

// ============================================================
// PAYLOAD
// ============================================================

/// Typed message payload carried by an entry.
#[derive(Debug, Clone)]
pub enum LogPayload {
    Ticket(RecallTicket),
    Order(RecallOrder),
    ExecReport(ExecutionReport),
}

// ============================================================
// LOG ENTRY
// ============================================================

/// Immutable record of one replayed message.
///
/// The qty/price triple and the exec identity are denormalised out of the
/// payload at decode time so the driver can filter and count without
/// re-inspecting payloads.
#[derive(Debug, Clone)]
pub struct TransactionLogEntry {
    order_id: OrderId,
    source: LogSource,
    state: String,
    timestamp: DateTime<Utc>,
    payload: Option<LogPayload>,
    recall_qty: Qty,
    fill_qty: Qty,
    fill_price: Price,
    execution_id: Option<String>,
    exec_type: Option<char>,
}

impl TransactionLogEntry {
    pub fn builder() -> TransactionLogEntryBuilder {
        TransactionLogEntryBuilder::default()
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn source(&self) -> LogSource {
        self.source
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn recall_qty(&self) -> Qty {
        self.recall_qty
    }

    pub fn fill_qty(&self) -> Qty {
        self.fill_qty
    }

    pub fn fill_price(&self) -> Price {
        self.fill_price
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn exec_type(&self) -> Option<char> {
        self.exec_type
    }

    pub fn payload(&self) -> Option<&LogPayload> {
        self.payload.as_ref()
    }

    /// Ticket payload, absent when the entry carries something else.
    pub fn ticket(&self) -> Option<&RecallTicket> {
        match self.payload.as_ref() {
            Some(LogPayload::Ticket(t)) => Some(t),
            _ => None,
        }
    }

    /// Order payload, absent when the entry carries something else.
    pub fn order(&self) -> Option<&RecallOrder> {
        match self.payload.as_ref() {
            Some(LogPayload::Order(o)) => Some(o),
            _ => None,
        }
    }

    /// Execution-report payload, absent when the entry carries something else.
    pub fn exec_report(&self) -> Option<&ExecutionReport> {
        match self.payload.as_ref() {
            Some(LogPayload::ExecReport(r)) => Some(r),
            _ => None,
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryBuildError {
    #[error("log entry missing required field: {0}")]
    MissingField(&'static str),
}

/// Builder for [`TransactionLogEntry`].
///
/// `order_id`, `source`, `state` and `timestamp` are required; everything
/// else defaults to absent/zero.
#[derive(Debug, Default)]
pub struct TransactionLogEntryBuilder {
    order_id: Option<OrderId>,
    source: Option<LogSource>,
    state: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<LogPayload>,
    recall_qty: Qty,
    fill_qty: Qty,
    fill_price: Price,
    execution_id: Option<String>,
    exec_type: Option<char>,
}

impl TransactionLogEntryBuilder {
    pub fn order_id(mut self, order_id: impl Into<OrderId>) -> Self {
        let order_id = order_id.into();
        if !order_id.is_empty() {
            self.order_id = Some(order_id);
        }
        self
    }

    pub fn source(mut self, source: LogSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn payload(mut self, payload: LogPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn recall_qty(mut self, qty: Qty) -> Self {
        self.recall_qty = qty;
        self
    }

    pub fn fill_qty(mut self, qty: Qty) -> Self {
        self.fill_qty = qty;
        self
    }

    pub fn fill_price(mut self, price: Price) -> Self {
        self.fill_price = price;
        self
    }

    pub fn execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    pub fn exec_type(mut self, exec_type: char) -> Self {
        self.exec_type = Some(exec_type);
        self
    }

    pub fn build(self) -> Result<TransactionLogEntry, EntryBuildError> {
        Ok(TransactionLogEntry {
            order_id: self.order_id.ok_or(EntryBuildError::MissingField("order_id"))?,
            source: self.source.ok_or(EntryBuildError::MissingField("source"))?,
            state: self.state.ok_or(EntryBuildError::MissingField("state"))?,
            timestamp: self
                .timestamp
                .ok_or(EntryBuildError::MissingField("timestamp"))?,
            payload: self.payload,
            recall_qty: self.recall_qty,
            fill_qty: self.fill_qty,
            fill_price: self.fill_price,
            execution_id: self.execution_id,
            exec_type: self.exec_type,
        })
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecallTicket;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_builder_requires_identity_fields() {
        let err = TransactionLogEntry::builder()
            .source(LogSource::TicketHistory)
            .state("Created")
            .timestamp(ts())
            .build()
            .unwrap_err();
        assert_eq!(err, EntryBuildError::MissingField("order_id"));

        let err = TransactionLogEntry::builder()
            .order_id("R-1")
            .state("Created")
            .timestamp(ts())
            .build()
            .unwrap_err();
        assert_eq!(err, EntryBuildError::MissingField("source"));
    }

    #[test]
    fn test_empty_order_id_rejected() {
        let err = TransactionLogEntry::builder()
            .order_id("")
            .source(LogSource::TicketHistory)
            .state("Created")
            .timestamp(ts())
            .build()
            .unwrap_err();
        assert_eq!(err, EntryBuildError::MissingField("order_id"));
    }

    #[test]
    fn test_payload_accessor_type_mismatch_is_absence() {
        let entry = TransactionLogEntry::builder()
            .order_id("R-1")
            .source(LogSource::TicketHistory)
            .state("Created")
            .timestamp(ts())
            .payload(LogPayload::Ticket(RecallTicket {
                id: "R-1".into(),
                ..Default::default()
            }))
            .build()
            .unwrap();

        assert!(entry.ticket().is_some());
        assert!(entry.order().is_none());
        assert!(entry.exec_report().is_none());
    }

    #[test]
    fn test_entry_without_payload() {
        let entry = TransactionLogEntry::builder()
            .order_id("R-1")
            .source(LogSource::OmsToRecall)
            .state("Filled")
            .timestamp(ts())
            .build()
            .unwrap();
        assert!(entry.payload().is_none());
        assert!(entry.ticket().is_none());
    }
}
