//! Recovery configuration
//!
//! Topic names and the replay timeout, loaded from YAML. Topic names are
//! opaque strings to the core; [`RecoveryConfig::source_for`] maps them to
//! the internal stream identity.

use crate::error::RecoveryError;
use crate::log_entry::LogSource;
use serde::Deserialize;
use std::time::Duration;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recovery: RecoveryConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, RecoveryError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| RecoveryError::Config(e.to_string()))
    }
}

/// Recovery pipeline options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Upper bound on the replay-parity wait, in milliseconds.
    pub timeout_ms: u64,
    /// Publish target for REPUBLISH actions.
    pub recall_ticket_topic: String,
    /// Ticket history stream.
    pub ticket_history_topic: String,
    /// Outbound order/exec-report stream.
    pub recall_to_oms_topic: String,
    /// Inbound exec-report stream.
    pub oms_to_recall_topic: String,
    /// Target for compensating done-for-day publishes.
    pub dfd_request_topic: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            recall_ticket_topic: "RECALL/TICKET".to_string(),
            ticket_history_topic: "RECALL/TICKET/HISTORY".to_string(),
            recall_to_oms_topic: "RECALL/TO/OMS".to_string(),
            oms_to_recall_topic: "OMS/TO/RECALL".to_string(),
            dfd_request_topic: "RECALL/DFD/REQUEST".to_string(),
        }
    }
}

impl RecoveryConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Map a configured topic name to its stream identity.
    pub fn source_for(&self, topic: &str) -> Option<LogSource> {
        if topic == self.ticket_history_topic {
            Some(LogSource::TicketHistory)
        } else if topic == self.recall_to_oms_topic {
            Some(LogSource::RecallToOms)
        } else if topic == self.oms_to_recall_topic {
            Some(LogSource::OmsToRecall)
        } else {
            None
        }
    }
}

/// Logging options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub log_dir: String,
    pub log_file: String,
    /// "never", "daily" or "hourly".
    pub rotation: String,
    pub log_level: String,
    pub use_json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_file: "recall_recon.log".to_string(),
            rotation: "daily".to_string(),
            log_level: "info".to_string(),
            use_json: false,
        }
    }
}

// ============================================================
// TESTS
// ============================================================
