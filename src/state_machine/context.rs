//! # Transition Context
//!
//! Per-operation data passed to state machine transitions.
//!
//! A context carries the operation timestamp, the acting operator for the audit trail,
//! and an outbox of lifecycle events. Transitions are applied to a draft of the
//! aggregate; the events are only published once the caller commits that draft, so a
//! failed operation never announces a change that did not happen.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::events::EventPublisher;

#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub now: DateTime<Utc>,
    pub actor: Option<String>,
    pending_events: Vec<(String, Value)>,
}

impl TransitionContext {
    pub fn new() -> Self {
        Self {
            now: Utc::now(),
            actor: None,
            pending_events: Vec::new(),
        }
    }

    /// Context attributed to an operator
    pub fn with_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Self::new()
        }
    }

    /// Metadata stored with every transition applied under this context
    pub fn transition_metadata(&self) -> Option<Value> {
        self.actor.as_ref().map(|actor| json!({ "actor": actor }))
    }

    pub fn record_event(&mut self, name: impl Into<String>, context: Value) {
        self.pending_events.push((name.into(), context));
    }

    pub fn pending_events(&self) -> &[(String, Value)] {
        &self.pending_events
    }

    /// Child context for a draft: same timestamp and actor, empty outbox
    pub fn fork(&self) -> Self {
        Self {
            now: self.now,
            actor: self.actor.clone(),
            pending_events: Vec::new(),
        }
    }

    /// Take over the outbox of a committed draft
    pub fn absorb(&mut self, draft: TransitionContext) {
        self.pending_events.extend(draft.pending_events);
    }

    /// Publish and clear the outbox; call after the draft was committed
    pub fn flush(&mut self, publisher: &EventPublisher) {
        publisher.publish_all(self.pending_events.drain(..));
    }
}

impl Default for TransitionContext {
    fn default() -> Self {
        Self::new()
    }
}
