//! End-to-end recovery scenarios
//!
//! Drives raw wire payloads through the codec, the aggregator, the driver
//! and the cache, asserting the reconciliation outcome and the outbound
//! publishes for each scenario.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use recall_recon::bookmark::parse_bookmark;
use recall_recon::codec::{SOH, decode_entry, from_nvfix};
use recall_recon::{
    ContextReadySignal, ExecutionReport, LogSource, MessagingClient, RecallTicket,
    RecordingClient, RecoveryConfig, RecoveryDriver, RecoveryStats, StateCache,
    TransactionLogAggregator,
};

// ============================================================
// HARNESS
// ============================================================

struct Harness {
    aggregator: TransactionLogAggregator,
    cache: Arc<StateCache>,
    client: Arc<RecordingClient>,
    config: RecoveryConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            aggregator: TransactionLogAggregator::new(),
            cache: Arc::new(StateCache::new()),
            client: Arc::new(RecordingClient::new()),
            config: RecoveryConfig {
                timeout_ms: 20,
                ..Default::default()
            },
        }
    }

    fn feed(&self, source: LogSource, timestamp: DateTime<Utc>, payload: &str) {
        let entry = decode_entry(source, timestamp, payload).expect("scenario payload decodes");
        self.aggregator.append(entry);
    }

    fn run(&self) -> RecoveryStats {
        self.run_with_bookmarks(None, None)
    }

    fn run_with_bookmarks(
        &self,
        ticket_bookmark: Option<DateTime<Utc>>,
        oms_bookmark: Option<DateTime<Utc>>,
    ) -> RecoveryStats {
        self.aggregator.mark_replay_complete(LogSource::TicketHistory);
        self.aggregator.mark_replay_complete(LogSource::RecallToOms);
        self.aggregator.mark_replay_complete(LogSource::OmsToRecall);

        let driver = RecoveryDriver::new(
            self.config.clone(),
            Arc::clone(&self.cache),
            Some(Arc::clone(&self.client) as Arc<dyn MessagingClient>),
        )
        .with_bookmarks(ticket_bookmark, oms_bookmark);

        let mut stats = RecoveryStats::default();
        let signal = ContextReadySignal::new(Arc::clone(&self.cache));
        signal.on_context_refreshed(|| {
            stats = driver.run(&self.aggregator);
            Ok(())
        });
        assert!(self.cache.is_initialized());
        stats
    }
}

fn ts(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, secs).unwrap()
}

fn ticket_json(id: &str, state: &str, recall_qty: u64, fill_qty: u64, fill_price: f64) -> String {
    format!(
        r#"{{"id":"{id}","currentState":"{state}","recallQty":{recall_qty},"fillQty":{fill_qty},"fillPrice":{fill_price},"ticker":"IBM","currency":"USD","fund":"F1"}}"#
    )
}

fn exec_report_nvfix(id: &str, state: &str, cum: u64, leaves: u64, avg: f64) -> String {
    format!(
        "ExecID=E-{id}-{cum}{SOH}ExecType=F{SOH}OrderID={id}{SOH}OrdStatus={state}{SOH}LastQty={cum}{SOH}CumQty={cum}{SOH}LeavesQty={leaves}{SOH}LastPx={avg}{SOH}AvgPx={avg}{SOH}"
    )
}

// ============================================================
// SEED SCENARIOS
// ============================================================

// Scenario 1: ticket Created, order rebuilds to New - plain rebuild.
#[test]
fn equivalent_new_created_rebuilds() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-1", "Created", 100, 0, 0.0),
    );

    let stats = harness.run();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.rebuilt, 1);
    assert_eq!(stats.republished, 0);
    assert_eq!(stats.ignored, 0);

    let order = harness.cache.order("R-1").expect("order cached");
    assert_eq!(order.current_state.as_str(), "New");
    assert!(harness.cache.ticket("R-1").is_some());
    assert!(harness.client.published().is_empty());
}

// Scenario 2: ticket Filled vs rebuilt Canceled - rebuild plus one DFD.
#[test]
fn final_mismatch_emits_dfd_once() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-2", "Filled", 100, 100, 10.0),
    );
    harness.feed(
        LogSource::OmsToRecall,
        ts(2),
        &exec_report_nvfix("R-2", "Canceled", 0, 100, 0.0),
    );

    let stats = harness.run();

    assert_eq!(stats.rebuilt, 1);
    let dfd = harness.client.published_to("RECALL/DFD/REQUEST");
    assert_eq!(dfd.len(), 1);

    let report: ExecutionReport = from_nvfix(&dfd[0]).expect("DFD payload is NVFIX");
    assert_eq!(report.order_id, "R-2");
    assert_eq!(report.exec_type, '3');
    assert_eq!(report.order_state, "DoneOfDay");
}

// Scenario 3: pending mismatch with matching quantities - forced rebuild.
#[test]
fn pending_mismatch_matching_quantities_forces_rebuild() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-3", "PendingFill", 100, 50, 10.0),
    );
    harness.feed(
        LogSource::OmsToRecall,
        ts(2),
        &exec_report_nvfix("R-3", "Filled", 50, 50, 10.00005),
    );

    let stats = harness.run();

    assert_eq!(stats.rebuilt, 1);
    assert_eq!(stats.republished, 0);
    // The ticket's state follows the order, without a republish.
    assert_eq!(harness.cache.ticket("R-3").unwrap().current_state, "Filled");
    assert!(harness.client.published().is_empty());
}

// Scenario 4: pending mismatch with differing quantities - republish.
#[test]
fn pending_mismatch_differing_quantities_republishes() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-4", "PendingFill", 100, 50, 10.0),
    );
    // cum+leaves = 200: the rebuilt order ends at twice the ticket quantity.
    harness.feed(
        LogSource::OmsToRecall,
        ts(2),
        &exec_report_nvfix("R-4", "Filled", 50, 150, 10.0),
    );

    let stats = harness.run();

    assert_eq!(stats.republished, 1);
    let republished = harness.client.published_to("RECALL/TICKET");
    assert_eq!(republished.len(), 1);
    // Downstream subscribers receive the overwritten state.
    let ticket: RecallTicket = serde_json::from_str(&republished[0]).unwrap();
    assert_eq!(ticket.current_state, "Filled");
    assert_eq!(harness.cache.ticket("R-4").unwrap().current_state, "Filled");
}

// Scenario 5: the only history entry sits past the bookmark - skipped.
#[test]
fn bookmark_discards_late_history() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        parse_bookmark("20250321T140000.0000000Z").unwrap(),
        &ticket_json("R-5", "Created", 100, 0, 0.0),
    );

    let bookmark = parse_bookmark("20250321T135900.0000000Z");
    let stats = harness.run_with_bookmarks(bookmark, None);

    assert_eq!(stats.discarded_history, 1);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.rebuilt, 0);
    assert!(harness.cache.ticket("R-5").is_none());
    assert!(harness.cache.order("R-5").is_none());
}

// Scenario 6: history entry whose payload is not a ticket - ignored, but
// initialization still completes.
#[test]
fn missing_ticket_payload_is_ignored() {
    let harness = Harness::new();
    let entry = recall_recon::TransactionLogEntry::builder()
        .order_id("R-6")
        .source(LogSource::TicketHistory)
        .state("Created")
        .timestamp(ts(1))
        .build()
        .unwrap();
    harness.aggregator.append(entry);

    let stats = harness.run();

    assert!(harness.cache.is_initialized());
    assert_eq!(stats.ignored, 1);
    assert!(harness.cache.ticket("R-6").is_none());
    assert!(harness.cache.order("R-6").is_none());
}

// ============================================================
// PIPELINE PROPERTIES
// ============================================================

// Fills arriving out of order on the wire reconcile identically: the driver
// sorts chronologically before the fold.
#[test]
fn fill_arrival_order_does_not_change_outcome() {
    let run_one = |reversed: bool| {
        let harness = Harness::new();
        harness.feed(
            LogSource::TicketHistory,
            ts(1),
            &ticket_json("R-7", "Filled", 100, 100, 10.2),
        );
        let early = exec_report_nvfix("R-7", "PartiallyFilled", 40, 60, 10.0);
        let late = exec_report_nvfix("R-7", "Filled", 100, 0, 10.2);
        if reversed {
            harness.feed(LogSource::OmsToRecall, ts(3), &late);
            harness.feed(LogSource::OmsToRecall, ts(2), &early);
        } else {
            harness.feed(LogSource::OmsToRecall, ts(2), &early);
            harness.feed(LogSource::OmsToRecall, ts(3), &late);
        }
        harness.run();
        harness.cache.order("R-7").expect("order cached")
    };

    let forward = run_one(false);
    let reverse = run_one(true);

    let f = forward.fill_request.expect("fill request");
    let r = reverse.fill_request.expect("fill request");
    assert_eq!(f.cum_qty, 100);
    assert_eq!(f.cum_qty, r.cum_qty);
    assert_eq!(f.leaves_qty, r.leaves_qty);
    assert_eq!(forward.current_state, reverse.current_state);
}

// A full lifecycle across all three streams: order placed, partially filled,
// then ticket catches up - the rebuilt order agrees with the ticket.
#[test]
fn mixed_stream_lifecycle_reconciles() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-8", "PendingNew", 100, 0, 0.0),
    );
    harness.feed(
        LogSource::RecallToOms,
        ts(2),
        &format!("OrderID=R-8{SOH}CurrentState=PendingNew{SOH}OrdQty=100{SOH}Symbol=IBM{SOH}"),
    );
    harness.feed(
        LogSource::TicketHistory,
        ts(3),
        &ticket_json("R-8", "PartiallyFilled", 100, 40, 10.0),
    );
    harness.feed(
        LogSource::OmsToRecall,
        ts(4),
        &exec_report_nvfix("R-8", "PartiallyFilled", 40, 60, 10.0),
    );

    let stats = harness.run();

    assert_eq!(stats.rebuilt, 1);
    let order = harness.cache.order("R-8").unwrap();
    assert_eq!(order.current_state.as_str(), "PartiallyFilled");
    assert_eq!(order.ord_qty, 100);
    let fill = order.fill_request.unwrap();
    assert_eq!(fill.cum_qty, 40);
    assert_eq!(fill.leaves_qty, 60);
    // Both sides final: the agreement still owes a DFD.
    assert_eq!(harness.client.published_to("RECALL/DFD/REQUEST").len(), 1);
}

// Hybrid-encoded history records decode like their JSON head plus metadata.
#[test]
fn hybrid_history_payload_reconciles() {
    let harness = Harness::new();
    let payload = format!(
        r#"{{"id":"R-9","currentState":"Created"}}{SOH}RecallQty=70{SOH}Fund=F9{SOH}"#
    );
    harness.feed(LogSource::TicketHistory, ts(1), &payload);

    let stats = harness.run();

    assert_eq!(stats.rebuilt, 1);
    let ticket = harness.cache.ticket("R-9").unwrap();
    assert_eq!(ticket.recall_qty, 70);
    assert_eq!(ticket.fund, "F9");
    assert_eq!(harness.cache.order("R-9").unwrap().ord_qty, 70);
}

// An order-side state outside the vocabulary is carried verbatim and falls
// through to the comparator's default REPUBLISH.
#[test]
fn unknown_order_state_falls_through_to_republish() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-12", "Created", 100, 0, 0.0),
    );
    harness.feed(
        LogSource::OmsToRecall,
        ts(2),
        &exec_report_nvfix("R-12", "Suspended", 0, 100, 0.0),
    );

    let stats = harness.run();

    assert_eq!(stats.republished, 1);
    assert_eq!(stats.rebuilt, 0);
    let order = harness.cache.order("R-12").expect("order cached");
    assert_eq!(order.current_state.as_str(), "Suspended");
    // The default branch republishes the ticket as-is.
    let republished = harness.client.published_to("RECALL/TICKET");
    assert_eq!(republished.len(), 1);
    let ticket: RecallTicket = serde_json::from_str(&republished[0]).unwrap();
    assert_eq!(ticket.current_state, "Created");
}

// One poisoned order must not keep the rest of the pass from completing.
#[test]
fn per_order_errors_do_not_abort_the_pass() {
    let harness = Harness::new();
    harness.feed(
        LogSource::TicketHistory,
        ts(1),
        &ticket_json("R-10", "Created", 100, 0, 0.0),
    );
    // History entry whose payload is absent: rebuild yields nothing.
    let bare = recall_recon::TransactionLogEntry::builder()
        .order_id("R-11")
        .source(LogSource::TicketHistory)
        .state("Created")
        .timestamp(ts(1))
        .build()
        .unwrap();
    harness.aggregator.append(bare);

    let stats = harness.run();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.rebuilt, 1);
    assert_eq!(stats.ignored, 1);
    assert!(harness.cache.order("R-10").is_some());
}
