//! Context-ready signal
//!
//! Boundary hook invoked once by the host when its context is refreshed.
//! Its sole duty is to drive cache initialization and log the decision.

use crate::cache::StateCache;
use crate::error::RecoveryError;
use std::sync::Arc;
use tracing::{error, info};

pub struct ContextReadySignal {
    cache: Arc<StateCache>,
}

impl ContextReadySignal {
    pub fn new(cache: Arc<StateCache>) -> Self {
        Self { cache }
    }

    /// Initialize the cache through `recover` unless already initialized.
    pub fn on_context_refreshed<F>(&self, recover: F)
    where
        F: FnOnce() -> Result<(), RecoveryError>,
    {
        if self.cache.is_initialized() {
            info!("context refreshed, cache already initialized, skipping recovery");
            return;
        }

        info!("context refreshed, running recovery initialization");
        match self.cache.initialize(recover) {
            Ok(()) => info!("recovery initialization complete, cache is serving"),
            Err(err) => {
                error!(%err, "recovery initialization failed, cache stays uninitialized");
            }
        }
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_signal_initializes_once() {
        let cache = Arc::new(StateCache::new());
        let signal = ContextReadySignal::new(Arc::clone(&cache));
        let runs = AtomicU32::new(0);

        signal.on_context_refreshed(|| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(cache.is_initialized());

        signal.on_context_refreshed(|| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_recovery_keeps_cache_closed() {
        let cache = Arc::new(StateCache::new());
        let signal = ContextReadySignal::new(Arc::clone(&cache));

        signal.on_context_refreshed(|| Err(RecoveryError::Config("broker down".into())));
        assert!(!cache.is_initialized());
    }
}
