//! # Transition History
//!
//! Audit trail of state changes for runs and steps.
//!
//! Each aggregate keeps its own ordered list of transitions. The list is append-only:
//! `sort_key` numbers transitions chronologically and exactly one entry carries
//! `most_recent = true`, the one describing the current state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single state transition in an aggregate's lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub sort_key: u32,
    /// Previous state; `None` for the creation entry
    pub from_state: Option<String>,
    pub to_state: String,
    /// Serialized event that caused the transition
    pub event: String,
    pub most_recent: bool,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Ordered transition history owned by a run or a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionHistory {
    entries: Vec<StateTransition>,
}

impl TransitionHistory {
    /// History with a single creation entry
    pub fn starting_at(initial_state: impl Into<String>, at: DateTime<Utc>) -> Self {
        let mut history = Self::default();
        history.push(None, initial_state.into(), "\"Create\"".to_string(), None, at);
        history
    }

    pub fn push(
        &mut self,
        from_state: Option<String>,
        to_state: String,
        event: String,
        metadata: Option<Value>,
        at: DateTime<Utc>,
    ) {
        for entry in &mut self.entries {
            entry.most_recent = false;
        }

        let sort_key = self.entries.last().map_or(0, |entry| entry.sort_key + 1);
        self.entries.push(StateTransition {
            sort_key,
            from_state,
            to_state,
            event,
            most_recent: true,
            metadata,
            created_at: at,
        });
    }

    pub fn most_recent(&self) -> Option<&StateTransition> {
        self.entries.iter().rev().find(|entry| entry.most_recent)
    }

    pub fn entries(&self) -> &[StateTransition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
