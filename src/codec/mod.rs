//! Wire codecs
//!
//! Three shapes, selected per stream:
//! - JSON (ticket history)
//! - NVFIX, SOH-delimited `tag=value` (both OMS streams)
//! - hybrid, a JSON object with trailing SOH metadata (tolerated on history)
//!
//! [`decode_entry`] is the boundary between raw topic records and typed
//! [`TransactionLogEntry`] values; everything malformed surfaces as
//! [`CodecError::Parse`] carrying the original message.

pub mod hybrid;
pub mod nvfix;

use crate::log_entry::{LogPayload, LogSource, TransactionLogEntry};
use crate::models::{ExecutionReport, RecallOrder, RecallTicket};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use hybrid::{decode_hybrid, is_hybrid, parse_hybrid};
pub use nvfix::{NvfixFields, SOH, from_nvfix};

// ============================================================
// ERROR
// ============================================================

#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed wire payload. Keeps the original message for the audit log.
    #[error("failed to parse message: {reason}; original: {message}")]
    Parse { message: String, reason: String },
}

impl CodecError {
    pub fn parse(message: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            message: message.into(),
            reason: reason.to_string(),
        }
    }
}

/// Standard JSON decoding into the target type.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    serde_json::from_str(raw).map_err(|e| CodecError::parse(raw, e))
}

// ============================================================
// ENTRY DECODING
// ============================================================

/// Decode one raw topic record into a typed log entry.
///
/// The qty/price triple and the exec identity are denormalised out of the
/// payload here so the driver never re-parses messages.
pub fn decode_entry(
    source: LogSource,
    timestamp: DateTime<Utc>,
    raw: &str,
) -> Result<TransactionLogEntry, CodecError> {
    match source {
        LogSource::TicketHistory => {
            let ticket: RecallTicket = if is_hybrid(raw) {
                decode_hybrid(raw)?
            } else {
                decode_json(raw)?
            };
            ticket_entry(source, timestamp, ticket, raw)
        }
        LogSource::RecallToOms => {
            // The outbound stream interleaves orders and execution reports;
            // only reports carry an ExecType tag.
            if nvfix::has_tag(raw, "exectype") {
                let report: ExecutionReport = from_nvfix(raw)?;
                exec_entry(source, timestamp, report, raw)
            } else {
                let order: RecallOrder = from_nvfix(raw)?;
                order_entry(source, timestamp, order, raw)
            }
        }
        LogSource::OmsToRecall => {
            let report: ExecutionReport = from_nvfix(raw)?;
            exec_entry(source, timestamp, report, raw)
        }
    }
}

fn ticket_entry(
    source: LogSource,
    timestamp: DateTime<Utc>,
    ticket: RecallTicket,
    raw: &str,
) -> Result<TransactionLogEntry, CodecError> {
    TransactionLogEntry::builder()
        .order_id(ticket.id.clone())
        .source(source)
        .state(ticket.current_state.clone())
        .timestamp(timestamp)
        .recall_qty(ticket.recall_qty)
        .fill_qty(ticket.fill_qty)
        .fill_price(ticket.fill_price)
        .payload(LogPayload::Ticket(ticket))
        .build()
        .map_err(|e| CodecError::parse(raw, e))
}

fn order_entry(
    source: LogSource,
    timestamp: DateTime<Utc>,
    order: RecallOrder,
    raw: &str,
) -> Result<TransactionLogEntry, CodecError> {
    let fill_price = order
        .amend_request
        .as_ref()
        .map(|a| a.price)
        .unwrap_or_else(|| order.avg_price());
    TransactionLogEntry::builder()
        .order_id(order.order_id.clone())
        .source(source)
        .state(order.current_state.as_str())
        .timestamp(timestamp)
        .recall_qty(order.ord_qty)
        .fill_qty(order.cum_qty())
        .fill_price(fill_price)
        .payload(LogPayload::Order(order))
        .build()
        .map_err(|e| CodecError::parse(raw, e))
}

fn exec_entry(
    source: LogSource,
    timestamp: DateTime<Utc>,
    report: ExecutionReport,
    raw: &str,
) -> Result<TransactionLogEntry, CodecError> {
    TransactionLogEntry::builder()
        .order_id(report.order_id.clone())
        .source(source)
        .state(report.order_state.clone())
        .timestamp(timestamp)
        // ord qty identity: leaves == ordQty - cumQty
        .recall_qty(report.cum_qty + report.leaves_qty)
        .fill_qty(report.cum_qty)
        .fill_price(report.avg_price)
        .execution_id(report.exec_id.clone())
        .exec_type(report.exec_type)
        .payload(LogPayload::ExecReport(report))
        .build()
        .map_err(|e| CodecError::parse(raw, e))
}

// ============================================================
// TESTS
// ============================================================
