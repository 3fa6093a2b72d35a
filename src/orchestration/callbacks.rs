//! # Callback Listener
//!
//! Receives backend progress reports from a channel and applies them to the runs.
//!
//! ```text
//! backend poller -> mpsc::Sender<JobCallback> -> CallbackListener -> RunEngine::apply_callback
//! ```
//!
//! Callbacks are applied one at a time in arrival order. A callback that cannot be
//! applied is logged and dropped; the listener keeps running until every sender is
//! gone.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::run_engine::RunEngine;
use super::types::{CallbackOutcome, JobCallback};

/// Totals reported when the listener stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackListenerStats {
    pub received: u64,
    pub transitioned: u64,
    pub details_updated: u64,
    pub ignored: u64,
    pub rejected: u64,
}

pub struct CallbackListener {
    receiver: mpsc::Receiver<JobCallback>,
    engine: Arc<RunEngine>,
    listener_id: String,
}

impl std::fmt::Debug for CallbackListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackListener")
            .field("listener_id", &self.listener_id)
            .finish()
    }
}

impl CallbackListener {
    pub fn new(receiver: mpsc::Receiver<JobCallback>, engine: Arc<RunEngine>) -> Self {
        Self {
            receiver,
            engine,
            listener_id: "callback-listener".to_string(),
        }
    }

    /// Listener together with the sender backends report through
    pub fn channel(engine: Arc<RunEngine>, capacity: usize) -> (mpsc::Sender<JobCallback>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self::new(receiver, engine))
    }

    pub fn with_listener_id(mut self, listener_id: impl Into<String>) -> Self {
        self.listener_id = listener_id.into();
        self
    }

    /// Apply callbacks until the channel is closed
    pub async fn run(mut self) -> CallbackListenerStats {
        info!(listener_id = %self.listener_id, "Callback listener starting");

        let mut stats = CallbackListenerStats::default();
        while let Some(callback) = self.receiver.recv().await {
            stats.received += 1;
            self.process_callback(callback, &mut stats);
        }

        info!(
            listener_id = %self.listener_id,
            received = stats.received,
            rejected = stats.rejected,
            "Callback listener stopped - channel closed"
        );
        stats
    }

    fn process_callback(&self, callback: JobCallback, stats: &mut CallbackListenerStats) {
        let step_id = callback.step_id;

        match self.engine.apply_callback(callback) {
            Ok(CallbackOutcome::Transitioned { .. }) => stats.transitioned += 1,
            Ok(CallbackOutcome::DetailsUpdated) => stats.details_updated += 1,
            Ok(CallbackOutcome::Ignored { reason }) => {
                debug!(listener_id = %self.listener_id, step_id, reason = %reason, "Callback ignored");
                stats.ignored += 1;
            }
            Err(err) => {
                error!(
                    listener_id = %self.listener_id,
                    step_id,
                    error = %err,
                    "Failed to apply callback"
                );
                stats.rejected += 1;
            }
        }
    }
}
