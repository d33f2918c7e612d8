//! Shared aliases for the recall domain
//!
//! The recall wire speaks in string order identities, whole-unit quantities
//! and decimal prices. Naming those choices once keeps the rest of the crate
//! explicit about which number means what.

/// Order ID - stable string identity shared by a recall ticket and its
/// derived order.
///
/// # Constraints:
/// - **Immutable**: assigned by the ticketing system, never changes
/// - **Shared**: `order.order_id == ticket.id` for the whole lifecycle
pub type OrderId = String;

/// Quantity - integral number of units on the recall wire.
///
/// Fractional quantities do not occur in this workflow.
pub type Qty = u64;

/// Price - decimal price.
///
/// Prices are only ever compared with an epsilon (see the comparator),
/// never for exact equality.
pub type Price = f64;
