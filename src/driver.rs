//! Recovery driver
//!
//! Orchestrates the recovery pass: waits for replay parity, then per order
//! filters by bookmark, splits by source, sorts, rebuilds, compares and
//! executes the resulting action against the cache and the outbound client.
//! No per-order failure aborts the pass.

use crate::aggregator::TransactionLogAggregator;
use crate::cache::StateCache;
use crate::client::{self, MessagingClient};
use crate::comparator::{self, ReconAction};
use crate::config::RecoveryConfig;
use crate::context::RecoveryContext;
use crate::error::RecoveryError;
use crate::log_entry::TransactionLogEntry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ============================================================
// COUNTERS
// ============================================================

/// Operational summary of one recovery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryStats {
    pub processed: u64,
    pub rebuilt: u64,
    pub republished: u64,
    pub ignored: u64,
    pub errored: u64,
    pub discarded_history: u64,
    pub discarded_oms: u64,
}

enum Outcome {
    Rebuilt,
    Republished,
    Ignored,
}

// ============================================================
// DRIVER
// ============================================================

pub struct RecoveryDriver {
    config: RecoveryConfig,
    cache: Arc<StateCache>,
    client: Option<Arc<dyn MessagingClient>>,
    ticket_bookmark: Option<DateTime<Utc>>,
    oms_bookmark: Option<DateTime<Utc>>,
}

impl RecoveryDriver {
    pub fn new(
        config: RecoveryConfig,
        cache: Arc<StateCache>,
        client: Option<Arc<dyn MessagingClient>>,
    ) -> Self {
        Self {
            config,
            cache,
            client,
            ticket_bookmark: None,
            oms_bookmark: None,
        }
    }

    /// Install the replay bookmarks. The history stream filters on the
    /// ticket bookmark; both OMS streams share the OMS bookmark. `None`
    /// disables filtering for that stream.
    pub fn with_bookmarks(
        mut self,
        ticket_bookmark: Option<DateTime<Utc>>,
        oms_bookmark: Option<DateTime<Utc>>,
    ) -> Self {
        self.ticket_bookmark = ticket_bookmark;
        self.oms_bookmark = oms_bookmark;
        self
    }

    /// Run the full recovery pass and return the counters.
    pub fn run(&self, aggregator: &TransactionLogAggregator) -> RecoveryStats {
        if !aggregator.wait_for_replay(self.config.timeout()) {
            warn!(
                timeout_ms = self.config.timeout_ms,
                "replay parity not reached, proceeding with aggregated entries"
            );
        }

        let orders = aggregator.drain();
        let mut stats = RecoveryStats::default();

        for (order_id, entries) in orders {
            stats.processed += 1;
            match self.process_order(&order_id, entries, &mut stats) {
                Ok(Outcome::Rebuilt) => stats.rebuilt += 1,
                Ok(Outcome::Republished) => stats.republished += 1,
                Ok(Outcome::Ignored) => stats.ignored += 1,
                Err(err) => {
                    stats.errored += 1;
                    error!(%order_id, %err, "recovery failed for order");
                }
            }
        }

        info!(
            processed = stats.processed,
            rebuilt = stats.rebuilt,
            republished = stats.republished,
            ignored = stats.ignored,
            errored = stats.errored,
            discarded_history = stats.discarded_history,
            discarded_oms = stats.discarded_oms,
            cached_tickets = self.cache.ticket_count(),
            cached_orders = self.cache.order_count(),
            "recovery pass complete"
        );

        stats
    }

    // --------------------------------------------------------
    // Per-order pipeline
    // --------------------------------------------------------

    fn process_order(
        &self,
        order_id: &str,
        entries: Vec<TransactionLogEntry>,
        stats: &mut RecoveryStats,
    ) -> Result<Outcome, RecoveryError> {
        let mut history = Vec::new();
        let mut oms = Vec::new();

        for entry in entries {
            if entry.source().is_oms() {
                if Self::past_bookmark(&entry, self.oms_bookmark) {
                    stats.discarded_oms += 1;
                    continue;
                }
                oms.push(entry);
            } else {
                if Self::past_bookmark(&entry, self.ticket_bookmark) {
                    stats.discarded_history += 1;
                    continue;
                }
                history.push(entry);
            }
        }

        history.sort_by_key(|e| e.timestamp());
        oms.sort_by_key(|e| e.timestamp());

        if history.is_empty() {
            debug!(order_id, "no valid ticket history, skipping");
            return Ok(Outcome::Ignored);
        }

        let mut ctx = RecoveryContext::new(order_id, history, oms);
        let action = comparator::compare(&mut ctx);

        match action {
            ReconAction::Ignore => Ok(Outcome::Ignored),
            ReconAction::Rebuild => {
                self.install(&ctx)?;
                if ctx.needs_dfd_request {
                    self.publish_dfd(&ctx, stats);
                }
                if ctx.force_ticket_state_update {
                    // Audit trail for the overwrite decided by the comparator.
                    error!(
                        order_id,
                        order_state = ctx
                            .rebuilt_order()
                            .map(|o| o.current_state.as_str())
                            .unwrap_or(""),
                        ticket_state = ctx.ticket().map(|t| t.current_state.as_str()).unwrap_or(""),
                        "forced ticket state update during rebuild"
                    );
                }
                Ok(Outcome::Rebuilt)
            }
            ReconAction::Republish => {
                self.install(&ctx)?;
                self.republish_ticket(&ctx, stats);
                Ok(Outcome::Republished)
            }
        }
    }

    /// Strictly after the bookmark means the entry missed the replay window.
    fn past_bookmark(entry: &TransactionLogEntry, bookmark: Option<DateTime<Utc>>) -> bool {
        bookmark.is_some_and(|b| entry.timestamp() > b)
    }

    /// Install the ticket and the rebuilt order in the cache.
    fn install(&self, ctx: &RecoveryContext) -> Result<(), RecoveryError> {
        let ticket = ctx
            .ticket()
            .ok_or(RecoveryError::Rebuild("missing ticket".into()))?;
        let order = ctx
            .rebuilt_order()
            .ok_or(RecoveryError::Rebuild("missing rebuilt order".into()))?;
        self.cache
            .update_recall_ticket(ticket.id.clone(), ticket.clone());
        self.cache.update_order(ctx.order_id(), order.clone());
        Ok(())
    }

    // --------------------------------------------------------
    // Outbound publishes (logged and swallowed, never fatal)
    // --------------------------------------------------------

    fn publish_dfd(&self, ctx: &RecoveryContext, stats: &mut RecoveryStats) {
        let Some(client) = self.client.as_deref() else {
            warn!(order_id = ctx.order_id(), "no outbound client, skipping DFD request");
            return;
        };
        let Some(order) = ctx.rebuilt_order() else {
            return;
        };
        let payload = client::dfd_request(order);
        match client.publish(&self.config.dfd_request_topic, &payload) {
            Ok(()) => debug!(order_id = ctx.order_id(), "published DFD request"),
            Err(err) => {
                stats.errored += 1;
                error!(order_id = ctx.order_id(), %err, "DFD publish failed");
            }
        }
    }

    fn republish_ticket(&self, ctx: &RecoveryContext, stats: &mut RecoveryStats) {
        let Some(client) = self.client.as_deref() else {
            warn!(order_id = ctx.order_id(), "no outbound client, skipping ticket republish");
            return;
        };
        let Some(ticket) = ctx.ticket() else {
            return;
        };
        let payload = match serde_json::to_string(ticket) {
            Ok(payload) => payload,
            Err(err) => {
                stats.errored += 1;
                error!(order_id = ctx.order_id(), %err, "ticket serialisation failed");
                return;
            }
        };
        match client.publish(&self.config.recall_ticket_topic, &payload) {
            Ok(()) => debug!(order_id = ctx.order_id(), "republished ticket"),
            Err(err) => {
                stats.errored += 1;
                error!(order_id = ctx.order_id(), %err, "ticket republish failed");
            }
        }
    }
}

// ============================================================
// TESTS
// ============================================================
