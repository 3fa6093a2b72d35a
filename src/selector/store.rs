//! # Selector Store
//!
//! Append-only store of selector fragments.
//!
//! Writers never mutate a fragment's content: a change adds a successor and marks the
//! predecessor obsolete in the same critical section, so readers never observe two
//! live fragments for the same key. Every write bumps the store generation, which the
//! resolver uses to invalidate cached configurations.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

use super::search::{self, MatchingType, SearchHit, SelectorQuery};
use super::{SelectorError, SelectorResult};
use crate::constants::events;
use crate::events::EventPublisher;
use crate::logging::log_selector_operation;
use crate::models::{
    FragmentCategory, FragmentId, FragmentKey, NewSelectorFragment, RunContext, SelectorFragment,
};

/// Raised when a writer replaced a fragment other than the one it expected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictWarning {
    pub key: FragmentKey,
    /// The predecessor the submitter read
    pub expected: FragmentId,
    /// The live fragment actually displaced, `None` if the key had been invalidated
    pub displaced: Option<FragmentId>,
}

impl fmt::Display for ConflictWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.displaced {
            Some(displaced) => write!(
                f,
                "selector fragment {} was replaced concurrently; fragment {displaced} was overwritten",
                self.expected
            ),
            None => write!(
                f,
                "selector fragment {} was invalidated concurrently",
                self.expected
            ),
        }
    }
}

/// Result of adding a fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub fragment: SelectorFragment,
    /// Live fragment that became obsolete through this add
    pub replaced: Option<FragmentId>,
    pub conflict: Option<ConflictWarning>,
}

/// Consistent read of the fragments matching a context
#[derive(Debug, Clone)]
pub struct MatchingSnapshot {
    pub generation: u64,
    pub last_write_at: DateTime<Utc>,
    pub fragments: Vec<SelectorFragment>,
}

#[derive(Debug)]
struct StoreState {
    fragments: BTreeMap<FragmentId, SelectorFragment>,
    live: HashMap<FragmentKey, FragmentId>,
    generation: u64,
    last_write_at: DateTime<Utc>,
    next_id: FragmentId,
}

impl StoreState {
    fn live_fragments(&self) -> impl Iterator<Item = &SelectorFragment> {
        self.live.values().filter_map(|id| self.fragments.get(id))
    }

    fn record_write(&mut self, at: DateTime<Utc>) {
        self.generation += 1;
        // Keep write times monotonic so resolution timestamps never move backwards
        self.last_write_at = self.last_write_at.max(at);
    }
}

/// Thread-safe selector fragment store
#[derive(Debug)]
pub struct SelectorStore {
    state: RwLock<StoreState>,
    event_publisher: EventPublisher,
}

impl SelectorStore {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self {
            state: RwLock::new(StoreState {
                fragments: BTreeMap::new(),
                live: HashMap::new(),
                generation: 0,
                last_write_at: DateTime::<Utc>::MIN_UTC,
                next_id: 1,
            }),
            event_publisher,
        }
    }

    /// Current generation; changes on every successful write
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// All live fragments whose declared axes are each unset or equal to the context value
    pub fn fragments_matching(&self, context: &RunContext) -> Vec<SelectorFragment> {
        self.matching_snapshot(context).fragments
    }

    /// Matching fragments together with the generation they were read at
    pub fn matching_snapshot(&self, context: &RunContext) -> MatchingSnapshot {
        let state = self.state.read();
        let mut fragments: Vec<SelectorFragment> = state
            .live_fragments()
            .filter(|fragment| fragment.matches(context))
            .cloned()
            .collect();
        fragments.sort_by_key(|fragment| fragment.id);

        MatchingSnapshot {
            generation: state.generation,
            last_write_at: state.last_write_at,
            fragments,
        }
    }

    /// Insert a fragment, obsoleting the live fragment with the identical key
    pub fn add_fragment(&self, submission: NewSelectorFragment) -> SelectorResult<AddOutcome> {
        validate_submission(&submission)?;

        let now = Utc::now();
        let key = submission.key();

        let outcome = {
            let mut state = self.state.write();

            if let Some(existing) = state
                .live_fragments()
                .find(|fragment| fragment.name == submission.name && fragment.key() != key)
            {
                return Err(SelectorError::DuplicateName {
                    name: submission.name,
                    existing: existing.id,
                });
            }

            let id = state.next_id;
            state.next_id += 1;

            let displaced = state.live.get(&key).copied();
            let conflict = submission
                .expected_predecessor
                .filter(|expected| displaced != Some(*expected))
                .map(|expected| ConflictWarning {
                    key: key.clone(),
                    expected,
                    displaced,
                });

            if let Some(displaced_id) = displaced {
                if let Some(previous) = state.fragments.get_mut(&displaced_id) {
                    previous.obsoleted_at = Some(now);
                    previous.replaced_by = Some(id);
                }
            }

            let fragment = SelectorFragment {
                id,
                name: submission.name,
                category: submission.category,
                workflow: submission.workflow,
                axes: submission.axes,
                payload: submission.payload,
                created_at: now,
                obsoleted_at: None,
                replaced_by: None,
            };

            state.fragments.insert(id, fragment.clone());
            state.live.insert(key, id);
            state.record_write(now);

            AddOutcome {
                fragment,
                replaced: displaced,
                conflict,
            }
        };

        if let Some(conflict) = &outcome.conflict {
            warn!(
                fragment_id = outcome.fragment.id,
                expected = conflict.expected,
                displaced = ?conflict.displaced,
                "Concurrent selector modification, last writer wins"
            );
            self.event_publisher.publish(
                events::SELECTOR_CONFLICT,
                json!({
                    "fragment_id": outcome.fragment.id,
                    "expected": conflict.expected,
                    "displaced": conflict.displaced,
                }),
            );
        }

        log_selector_operation(
            "add",
            Some(outcome.fragment.id),
            Some(&outcome.fragment.name),
            "LIVE",
            outcome
                .replaced
                .map(|replaced| format!("replaced={replaced}"))
                .as_deref(),
        );
        self.event_publisher.publish(
            events::SELECTOR_ADDED,
            json!({
                "fragment_id": outcome.fragment.id,
                "name": outcome.fragment.name,
                "category": outcome.fragment.category,
                "workflow": outcome.fragment.workflow,
                "replaced": outcome.replaced,
            }),
        );

        Ok(outcome)
    }

    /// Replace a live fragment's payload, keeping its name, category and axes
    pub fn update_fragment(&self, id: FragmentId, payload: Value) -> SelectorResult<AddOutcome> {
        let current = self.get(id)?;
        if !current.is_live() {
            return Err(SelectorError::AlreadyObsolete(id));
        }

        let mut submission =
            NewSelectorFragment::new(current.name, current.category, current.workflow, payload)
                .replacing(id);
        submission.axes = current.axes;

        self.add_fragment(submission)
    }

    /// Mark a fragment obsolete without replacement
    pub fn invalidate(&self, id: FragmentId) -> SelectorResult<SelectorFragment> {
        self.invalidate_internal(id, false)
    }

    /// Invalidate a fragment even if it holds default values
    pub fn force_invalidate(&self, id: FragmentId) -> SelectorResult<SelectorFragment> {
        self.invalidate_internal(id, true)
    }

    fn invalidate_internal(&self, id: FragmentId, force: bool) -> SelectorResult<SelectorFragment> {
        let now = Utc::now();

        let invalidated = {
            let mut state = self.state.write();
            let fragment = state
                .fragments
                .get(&id)
                .ok_or(SelectorError::FragmentNotFound(id))?;

            if !fragment.is_live() {
                return Err(SelectorError::AlreadyObsolete(id));
            }
            if fragment.category == FragmentCategory::DefaultValues && !force {
                return Err(SelectorError::DefaultValuesRequireReplacement(id));
            }

            let key = fragment.key();
            state.live.remove(&key);

            let fragment = state
                .fragments
                .get_mut(&id)
                .ok_or(SelectorError::FragmentNotFound(id))?;
            fragment.obsoleted_at = Some(now);
            let invalidated = fragment.clone();

            state.record_write(now);
            invalidated
        };

        log_selector_operation(
            "invalidate",
            Some(id),
            Some(&invalidated.name),
            "OBSOLETE",
            force.then_some("forced"),
        );
        self.event_publisher.publish(
            events::SELECTOR_INVALIDATED,
            json!({
                "fragment_id": id,
                "name": invalidated.name,
                "forced": force,
            }),
        );

        Ok(invalidated)
    }

    /// Fetch a fragment by id, live or obsolete
    pub fn get(&self, id: FragmentId) -> SelectorResult<SelectorFragment> {
        self.state
            .read()
            .fragments
            .get(&id)
            .cloned()
            .ok_or(SelectorError::FragmentNotFound(id))
    }

    /// Every fragment ever stored for a key, oldest first
    pub fn history(&self, key: &FragmentKey) -> Vec<SelectorFragment> {
        let state = self.state.read();
        state
            .fragments
            .values()
            .filter(|fragment| fragment.key() == *key)
            .cloned()
            .collect()
    }

    /// Live fragments ordered by id
    pub fn live_fragments(&self) -> Vec<SelectorFragment> {
        let state = self.state.read();
        let mut fragments: Vec<SelectorFragment> = state.live_fragments().cloned().collect();
        fragments.sort_by_key(|fragment| fragment.id);
        fragments
    }

    pub fn live_count(&self) -> usize {
        self.state.read().live.len()
    }

    /// Search live fragments the way the configuration screen does
    pub fn search(&self, query: &SelectorQuery, matching: MatchingType) -> Vec<SearchHit> {
        let state = self.state.read();
        let hits = search::search(state.live_fragments(), query, matching);
        debug!(hits = hits.len(), matching = ?matching, "Selector search");
        hits
    }
}

impl Default for SelectorStore {
    fn default() -> Self {
        Self::new(EventPublisher::default())
    }
}

fn validate_submission(submission: &NewSelectorFragment) -> SelectorResult<()> {
    if submission.name.trim().is_empty() {
        return Err(SelectorError::validation("name", "must not be empty"));
    }
    if submission.workflow.trim().is_empty() {
        return Err(SelectorError::validation("workflow", "must not be empty"));
    }
    if let Some((axis, _)) = submission
        .axes
        .iter()
        .find(|(_, value)| value.trim().is_empty())
    {
        return Err(SelectorError::validation(
            axis.as_str(),
            "must not be empty; omit the axis for a wildcard",
        ));
    }
    if !submission.payload.is_object() {
        return Err(SelectorError::validation("payload", "must be a JSON object"));
    }

    Ok(())
}
