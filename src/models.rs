//! Business objects for the recall workflow
//!
//! Tickets arrive on the history topic, orders and execution reports on the
//! two OMS topics. The recovery core reads most fields and mutates only a
//! ticket's `current_state` (REPUBLISH stamping, see the comparator).

use crate::core_types::{OrderId, Price, Qty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================
// ORDER STATE
// ============================================================

/// Order-state vocabulary.
///
/// The named variants are the states the reconciliation logic reasons about.
/// Anything else a message surfaces is carried verbatim in
/// [`OrderState::Other`] so the comparator's default handling stays
/// reachable for the order side too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderState {
    New,
    PendingNew,
    PendingReplace,
    PendingFill,
    PendingCancel,
    Filled,
    PartiallyFilled,
    Canceled,
    DoneOfDay,
    /// A state outside the known vocabulary, kept verbatim from the wire.
    Other(String),
}

impl OrderState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "New",
            Self::PendingNew => "PendingNew",
            Self::PendingReplace => "PendingReplace",
            Self::PendingFill => "PendingFill",
            Self::PendingCancel => "PendingCancel",
            Self::Filled => "Filled",
            Self::PartiallyFilled => "PartiallyFilled",
            Self::Canceled => "Canceled",
            Self::DoneOfDay => "DoneOfDay",
            Self::Other(state) => state,
        }
    }

    /// Decode a wire state string; unknown values are kept verbatim.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "New" => Self::New,
            "PendingNew" => Self::PendingNew,
            "PendingReplace" => Self::PendingReplace,
            "PendingFill" => Self::PendingFill,
            "PendingCancel" => Self::PendingCancel,
            "Filled" => Self::Filled,
            "PartiallyFilled" => Self::PartiallyFilled,
            "Canceled" => Self::Canceled,
            "DoneOfDay" => Self::DoneOfDay,
            other => Self::Other(other.to_string()),
        }
    }

    /// Member of the final-fill-or-cancel set.
    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Filled | Self::PartiallyFilled | Self::Canceled)
    }
}

impl From<String> for OrderState {
    fn from(s: String) -> Self {
        Self::from_wire(&s)
    }
}

impl From<OrderState> for String {
    fn from(state: OrderState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for OrderState {
    fn default() -> Self {
        Self::New
    }
}

// ============================================================
// RECALL TICKET
// ============================================================

/// Recall ticket as published on `RECALL/TICKET/HISTORY`.
///
/// `current_state` is an open vocabulary (the comparator recognises a closed
/// subset). The serde aliases accept the lower-cased keys produced by the
/// hybrid-codec SOH merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecallTicket {
    pub id: OrderId,
    #[serde(alias = "currentstate")]
    pub current_state: String,
    #[serde(alias = "recallqty")]
    pub recall_qty: Qty,
    #[serde(alias = "fillqty")]
    pub fill_qty: Qty,
    #[serde(alias = "fillprice")]
    pub fill_price: Price,
    #[serde(alias = "effectivedate")]
    pub effective_date: String,
    pub currency: String,
    pub ticker: String,
    pub fund: String,
}

impl Default for RecallTicket {
    fn default() -> Self {
        Self {
            id: String::new(),
            current_state: String::new(),
            recall_qty: 0,
            fill_qty: 0,
            fill_price: 0.0,
            effective_date: String::new(),
            currency: String::new(),
            ticker: String::new(),
            fund: String::new(),
        }
    }
}

// ============================================================
// AMEND REQUEST
// ============================================================

/// Pending replace/cancel request attached to an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmendRequest {
    pub order_qty: Qty,
    pub price: Price,
    pub cl_ord_id: String,
    pub orig_cl_ord_id: String,
}

// ============================================================
// EXECUTION REPORT
// ============================================================

/// Execution report exchanged with the OMS.
///
/// Identity fields may arrive blank on the wire and are then defaulted from
/// the owning order during rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionReport {
    pub exec_id: String,
    pub exec_type: char,
    pub cl_ord_id: String,
    pub orig_cl_ord_id: String,
    pub order_id: OrderId,
    pub last_qty: Qty,
    pub cum_qty: Qty,
    pub leaves_qty: Qty,
    pub last_price: Price,
    pub avg_price: Price,
    pub order_state: String,
    pub transact_time: Option<DateTime<Utc>>,
    pub sending_time: Option<DateTime<Utc>>,
    pub symbol: String,
    pub account: String,
    pub currency: String,
    pub side: String,
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self {
            exec_id: String::new(),
            exec_type: '0',
            cl_ord_id: String::new(),
            orig_cl_ord_id: String::new(),
            order_id: String::new(),
            last_qty: 0,
            cum_qty: 0,
            leaves_qty: 0,
            last_price: 0.0,
            avg_price: 0.0,
            order_state: String::new(),
            transact_time: None,
            sending_time: None,
            symbol: String::new(),
            account: String::new(),
            currency: String::new(),
            side: String::new(),
        }
    }
}

// ============================================================
// RECALL ORDER
// ============================================================

/// Order derived from a recall ticket.
///
/// `order_id` always equals the originating ticket's `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecallOrder {
    pub order_id: OrderId,
    pub current_state: OrderState,
    pub ord_qty: Qty,
    pub fill_request: Option<ExecutionReport>,
    pub amend_request: Option<AmendRequest>,
    pub symbol: String,
    pub account: String,
    pub currency: String,
    pub side: String,
}

impl Default for RecallOrder {
    fn default() -> Self {
        Self {
            order_id: String::new(),
            current_state: OrderState::New,
            ord_qty: 0,
            fill_request: None,
            amend_request: None,
            symbol: String::new(),
            account: String::new(),
            currency: String::new(),
            side: String::new(),
        }
    }
}

impl RecallOrder {
    /// Seed an order from a ticket. A ticket without an identity cannot
    /// produce an order.
    pub fn from_ticket(ticket: &RecallTicket) -> Option<Self> {
        if ticket.id.is_empty() {
            return None;
        }
        Some(Self {
            order_id: ticket.id.clone(),
            current_state: OrderState::New,
            ord_qty: ticket.recall_qty,
            fill_request: None,
            amend_request: None,
            symbol: ticket.ticker.clone(),
            account: ticket.fund.clone(),
            currency: ticket.currency.clone(),
            side: String::new(),
        })
    }

    /// Cumulative fill quantity, zero without a fill request.
    #[inline]
    pub fn cum_qty(&self) -> Qty {
        self.fill_request.as_ref().map(|f| f.cum_qty).unwrap_or(0)
    }

    /// Average fill price, zero without a fill request.
    #[inline]
    pub fn avg_price(&self) -> Price {
        self.fill_request.as_ref().map(|f| f.avg_price).unwrap_or(0.0)
    }
}

// ============================================================
// TESTS
// ============================================================
