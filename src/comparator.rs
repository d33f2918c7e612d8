//! Reconciliation comparator
//!
//! Decides, per order, whether the rebuilt state is consistent with the last
//! ticket-history state. The only mutation is stamping the ticket's
//! `current_state` in the two explicit mismatch branches; flags are written
//! to the context.

use crate::context::RecoveryContext;
use crate::models::OrderState;
use tracing::error;

/// Price tolerance for quantities-and-price matching.
const PRICE_EPSILON: f64 = 1e-4;

/// The three recovery actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconAction {
    /// Rebuilt state is authoritative; install it in the cache.
    Rebuild,
    /// Rebuilt state diverges; install it and republish the ticket.
    Republish,
    /// Nothing to reconcile.
    Ignore,
}

/// Ticket-state members of the pending set.
fn is_pending_ticket_state(state: &str) -> bool {
    matches!(
        state,
        "PendingNew" | "PendingReplace" | "PendingFill" | "PendingCancel"
    )
}

/// Ticket-state members of the final-fill-or-cancel set.
fn is_final_ticket_state(state: &str) -> bool {
    matches!(state, "Filled" | "PartiallyFilled" | "Canceled")
}

fn states_equivalent(order_state: &OrderState, ticket_state: &str) -> bool {
    if order_state.as_str() == ticket_state {
        return true;
    }
    // A freshly created ticket has no order-side counterpart yet.
    if *order_state == OrderState::New && ticket_state == "Created" {
        return true;
    }
    // Done-of-day is the order-side wrap-up of any terminal ticket state.
    if *order_state == OrderState::DoneOfDay && is_final_ticket_state(ticket_state) {
        return true;
    }
    false
}

/// Compare the rebuilt order against the ticket and decide the action.
pub fn compare(ctx: &mut RecoveryContext) -> ReconAction {
    let (order_state, ord_qty, cum_qty, avg_price) = match ctx.rebuilt_order() {
        Some(order) => (
            order.current_state.clone(),
            order.ord_qty,
            order.cum_qty(),
            order.avg_price(),
        ),
        None => return ReconAction::Ignore,
    };
    let Some(ticket) = ctx.ticket() else {
        return ReconAction::Ignore;
    };
    let ticket_state = ticket.current_state.clone();
    let (recall_qty, fill_qty, fill_price) = (ticket.recall_qty, ticket.fill_qty, ticket.fill_price);

    let both_final = order_state.is_final() && is_final_ticket_state(&ticket_state);

    if states_equivalent(&order_state, &ticket_state) {
        if both_final {
            ctx.needs_dfd_request = true;
        }
        return ReconAction::Rebuild;
    }

    if both_final {
        ctx.needs_dfd_request = true;
        return ReconAction::Rebuild;
    }

    if is_pending_ticket_state(&ticket_state) && order_state.as_str() != ticket_state {
        let quantities_match = ord_qty == recall_qty
            && cum_qty == fill_qty
            && (avg_price - fill_price).abs() < PRICE_EPSILON;

        // Order is authoritative either way: the ticket takes its state.
        if let Some(ticket) = ctx.ticket_mut() {
            ticket.current_state = order_state.as_str().to_string();
        }

        if quantities_match {
            ctx.force_ticket_state_update = true;
            error!(
                order_id = ctx.order_id(),
                order_state = order_state.as_str(),
                ticket_state = ticket_state.as_str(),
                "ticket state overwritten to match rebuilt order"
            );
            return ReconAction::Rebuild;
        }
        return ReconAction::Republish;
    }

    ReconAction::Republish
}

// ============================================================
// TESTS
// ============================================================
