//! recall_recon - Trade-Recall Recovery & Reconciliation Engine
//!
//! Rebuilds authoritative in-memory state (recall tickets and their derived
//! orders) from an append-only transaction log after a restart or topic
//! failover, and reconciles each rebuilt order against the last externally
//! observed ticket state.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (OrderId, Qty, Price)
//! - [`config`] - Topic names, replay timeout, logging options
//! - [`models`] - Ticket, order, execution report, amend request
//! - [`bookmark`] - Replay bookmark parsing
//! - [`log_entry`] - Immutable transaction-log entries and their builder
//! - [`codec`] - JSON, NVFIX and hybrid wire codecs
//! - [`aggregator`] - Per-order entry buffer for the replay window
//! - [`rebuild`] - Chronological order rebuild fold
//! - [`context`] - Per-order recovery bundle
//! - [`comparator`] - REBUILD / REPUBLISH / IGNORE decision
//! - [`driver`] - The recovery pass orchestrator
//! - [`cache`] - Initialization-gated state cache
//! - [`ready`] - Context-refreshed boundary hook
//! - [`client`] - Outbound messaging seam and DFD transformer

// Core types - must be first!
pub mod core_types;

// Configuration
pub mod config;

// Recovery components
pub mod aggregator;
pub mod bookmark;
pub mod cache;
pub mod client;
pub mod codec;
pub mod comparator;
pub mod context;
pub mod driver;
pub mod error;
pub mod log_entry;
pub mod logging;
pub mod models;
pub mod ready;
pub mod rebuild;

// Convenient re-exports at crate root
pub use aggregator::TransactionLogAggregator;
pub use cache::StateCache;
pub use client::{MessagingClient, PublishError, RecordingClient};
pub use comparator::ReconAction;
pub use config::{AppConfig, LogConfig, RecoveryConfig};
pub use context::RecoveryContext;
pub use core_types::{OrderId, Price, Qty};
pub use driver::{RecoveryDriver, RecoveryStats};
pub use error::RecoveryError;
pub use log_entry::{LogPayload, LogSource, TransactionLogEntry, TransactionLogEntryBuilder};
pub use models::{AmendRequest, ExecutionReport, OrderState, RecallOrder, RecallTicket};
pub use ready::ContextReadySignal;
