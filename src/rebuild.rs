//! Order rebuilder
//!
//! Synthesises the current order for a recall by folding its OMS log entries
//! chronologically over an order seeded from the ticket. The caller supplies
//! entries already sorted by timestamp (stable on ties).

use crate::log_entry::{LogPayload, LogSource, TransactionLogEntry};
use crate::models::{AmendRequest, ExecutionReport, OrderState, RecallOrder, RecallTicket};
use tracing::warn;
use uuid::Uuid;

/// Rebuild the order for `ticket` from its chronologically ordered OMS
/// entries. `None` means the ticket cannot seed an order; the caller treats
/// that as IGNORE.
pub fn rebuild_order(
    ticket: &RecallTicket,
    oms_entries: &[TransactionLogEntry],
) -> Option<RecallOrder> {
    let mut order = RecallOrder::from_ticket(ticket)?;
    order.current_state = OrderState::New;
    order.fill_request = None;

    // Recall quantity: the earliest OMS entry wins over the ticket.
    let recall_qty = oms_entries
        .first()
        .map(|e| e.recall_qty())
        .unwrap_or(ticket.recall_qty);
    order.ord_qty = recall_qty;
    if let Some(fill) = order.fill_request.as_mut() {
        fill.leaves_qty = recall_qty;
    }
    if let Some(amend) = order.amend_request.as_mut() {
        amend.order_qty = recall_qty;
    }

    for entry in oms_entries {
        apply_entry(&mut order, entry);
    }

    // leaves == ordQty - cumQty whenever a fill request exists.
    if let Some(fill) = order.fill_request.as_mut() {
        fill.leaves_qty = order.ord_qty.saturating_sub(fill.cum_qty);
    }

    Some(order)
}

fn apply_entry(order: &mut RecallOrder, entry: &TransactionLogEntry) {
    match entry.payload() {
        Some(LogPayload::Order(src)) => apply_order_payload(order, entry, src),
        Some(LogPayload::ExecReport(report)) => apply_exec_payload(order, entry, report),
        Some(LogPayload::Ticket(_)) | None => {
            warn!(
                order_id = entry.order_id(),
                source = entry.source().label(),
                "unexpected payload in OMS entry, skipping"
            );
        }
    }
}

// ============================================================
// ORDER PAYLOADS
// ============================================================

/// Decode an entry's state, carrying unknown values verbatim with a WARN.
fn wire_state(entry: &TransactionLogEntry) -> OrderState {
    let state = OrderState::from_wire(entry.state());
    if matches!(state, OrderState::Other(_)) {
        warn!(
            order_id = entry.order_id(),
            source = entry.source().label(),
            state = entry.state(),
            "state outside the known vocabulary, carrying verbatim"
        );
    }
    state
}

fn apply_order_payload(order: &mut RecallOrder, entry: &TransactionLogEntry, src: &RecallOrder) {
    let state = wire_state(entry);

    if matches!(state, OrderState::PendingReplace | OrderState::PendingCancel) {
        order.amend_request = Some(src.amend_request.clone().unwrap_or_else(|| AmendRequest {
            order_qty: entry.recall_qty(),
            price: entry.fill_price(),
            cl_ord_id: Uuid::new_v4().to_string(),
            orig_cl_ord_id: order.order_id.clone(),
        }));
    }

    // PendingFill/DoneOfDay on the outbound topic arrive as order echoes;
    // those states are owned by execution reports.
    let echoed_fill_state = entry.source() == LogSource::RecallToOms
        && matches!(state, OrderState::PendingFill | OrderState::DoneOfDay);
    if !echoed_fill_state {
        order.current_state = state;
    }
}

// ============================================================
// EXECUTION REPORT PAYLOADS
// ============================================================

fn apply_exec_payload(
    order: &mut RecallOrder,
    entry: &TransactionLogEntry,
    report: &ExecutionReport,
) {
    let state = wire_state(entry);

    let fill_event = matches!(
        (entry.source(), &state),
        (LogSource::RecallToOms, OrderState::PendingFill)
            | (LogSource::OmsToRecall, OrderState::Filled | OrderState::PartiallyFilled)
    );

    match entry.source() {
        LogSource::OmsToRecall => order.current_state = state,
        LogSource::RecallToOms => {
            if matches!(state, OrderState::PendingFill | OrderState::DoneOfDay) {
                order.current_state = state;
            }
        }
        LogSource::TicketHistory => {}
    }

    if !fill_event {
        return;
    }

    if order.fill_request.is_none() {
        order.fill_request = Some(report_with_order_defaults(report, order));
    } else if let Some(fill) = order.fill_request.as_mut() {
        absorb_fill(fill, report);
    }
}

/// Clone a report, defaulting blank identity fields from the order.
fn report_with_order_defaults(report: &ExecutionReport, order: &RecallOrder) -> ExecutionReport {
    let mut fill = report.clone();
    if fill.cl_ord_id.is_empty() {
        fill.cl_ord_id = order.order_id.clone();
    }
    if fill.orig_cl_ord_id.is_empty() {
        fill.orig_cl_ord_id = order.order_id.clone();
    }
    if fill.order_id.is_empty() {
        fill.order_id = order.order_id.clone();
    }
    if fill.currency.is_empty() {
        fill.currency = order.currency.clone();
    }
    if fill.side.is_empty() {
        fill.side = order.side.clone();
    }
    if fill.symbol.is_empty() {
        fill.symbol = order.symbol.clone();
    }
    fill
}

/// Monotonic-fill rule: later reports refine but never regress non-zero
/// quantities and prices.
fn absorb_fill(fill: &mut ExecutionReport, incoming: &ExecutionReport) {
    if incoming.last_qty > 0 {
        fill.last_qty = incoming.last_qty;
    }
    if incoming.cum_qty > 0 {
        fill.cum_qty = incoming.cum_qty;
    }
    fill.leaves_qty = incoming.leaves_qty;
    if incoming.last_price > 0.0 {
        fill.last_price = incoming.last_price;
    }
    if incoming.avg_price > 0.0 {
        fill.avg_price = incoming.avg_price;
    }
    if !incoming.exec_id.is_empty() {
        fill.exec_id = incoming.exec_id.clone();
    }
    fill.exec_type = incoming.exec_type;
    if !incoming.order_state.is_empty() {
        fill.order_state = incoming.order_state.clone();
    }
    if incoming.transact_time.is_some() {
        fill.transact_time = incoming.transact_time;
    }
    if incoming.sending_time.is_some() {
        fill.sending_time = incoming.sending_time;
    }
}

// ============================================================
// TESTS
// ============================================================
