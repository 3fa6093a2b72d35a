//! # Run Overview Projection
//!
//! Read-only views over all runs for the operator screens: a per-workflow overview in
//! condensed (three buckets) or detailed (twelve substates) form, and a filtered,
//! paged run list.
//!
//! Every view is computed from run snapshots, so a view never blocks an operation on a
//! run for longer than the copy of that run takes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::run_repository::RunRepository;
use crate::models::{RunId, StepId, WorkflowRun};
use crate::registry::WorkflowRegistry;
use crate::state_machine::{RunState, StepState};

/// Top-level grouping of the overview columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverviewBucket {
    InputRequired,
    NotFinished,
    Finished,
}

impl fmt::Display for OverviewBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputRequired => write!(f, "Input required"),
            Self::NotFinished => write!(f, "Not finished"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Substate column of the detailed overview.
///
/// Mirrors the run states, with `RUNNING` split by the backend executing the active
/// step. Declaration order is the column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverviewState {
    WaitingForUser,
    Failed,
    Created,
    Pending,
    RunningOtp,
    RunningWes,
    Checking,
    Success,
    FailedFinal,
    Killed,
    Restarted,
    OmittedMissingPrecondition,
}

impl OverviewState {
    pub const ALL: [OverviewState; 12] = [
        Self::WaitingForUser,
        Self::Failed,
        Self::Created,
        Self::Pending,
        Self::RunningOtp,
        Self::RunningWes,
        Self::Checking,
        Self::Success,
        Self::FailedFinal,
        Self::Killed,
        Self::Restarted,
        Self::OmittedMissingPrecondition,
    ];

    /// Substate of a run
    pub fn of(run: &WorkflowRun) -> Self {
        match run.state {
            RunState::Created => Self::Created,
            RunState::Pending => Self::Pending,
            RunState::Running => {
                let on_wes = run
                    .current_steps()
                    .any(|step| step.state == StepState::RunningWes);
                if on_wes {
                    Self::RunningWes
                } else {
                    Self::RunningOtp
                }
            }
            RunState::Checking => Self::Checking,
            RunState::WaitingForUser => Self::WaitingForUser,
            RunState::Success => Self::Success,
            RunState::Failed => Self::Failed,
            RunState::FailedFinal => Self::FailedFinal,
            RunState::Killed => Self::Killed,
            RunState::Restarted => Self::Restarted,
            RunState::OmittedMissingPrecondition => Self::OmittedMissingPrecondition,
        }
    }

    pub fn bucket(&self) -> OverviewBucket {
        match self {
            Self::WaitingForUser | Self::Failed => OverviewBucket::InputRequired,
            Self::Created | Self::Pending | Self::RunningOtp | Self::RunningWes | Self::Checking => {
                OverviewBucket::NotFinished
            }
            Self::Success
            | Self::FailedFinal
            | Self::Killed
            | Self::Restarted
            | Self::OmittedMissingPrecondition => OverviewBucket::Finished,
        }
    }
}

impl fmt::Display for OverviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunningOtp => write!(f, "RUNNING_OTP"),
            Self::RunningWes => write!(f, "RUNNING_WES"),
            Self::Created => write!(f, "{}", RunState::Created),
            Self::Pending => write!(f, "{}", RunState::Pending),
            Self::Checking => write!(f, "{}", RunState::Checking),
            Self::WaitingForUser => write!(f, "{}", RunState::WaitingForUser),
            Self::Success => write!(f, "{}", RunState::Success),
            Self::Failed => write!(f, "{}", RunState::Failed),
            Self::FailedFinal => write!(f, "{}", RunState::FailedFinal),
            Self::Killed => write!(f, "{}", RunState::Killed),
            Self::Restarted => write!(f, "{}", RunState::Restarted),
            Self::OmittedMissingPrecondition => write!(f, "{}", RunState::OmittedMissingPrecondition),
        }
    }
}

/// Run selection shared by all views; empty sets select everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewFilter {
    #[serde(default)]
    pub workflows: BTreeSet<String>,
    #[serde(default)]
    pub states: BTreeSet<RunState>,
    /// Case-insensitive substring of the display or short name
    pub name: Option<String>,
}

impl OverviewFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflows.insert(workflow.into());
        self
    }

    pub fn with_state(mut self, state: RunState) -> Self {
        self.states.insert(state);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn matches(&self, run: &WorkflowRun) -> bool {
        self.matches_ignoring_state(run) && (self.states.is_empty() || self.states.contains(&run.state))
    }

    fn matches_ignoring_state(&self, run: &WorkflowRun) -> bool {
        if !self.workflows.is_empty() && !self.workflows.contains(&run.workflow) {
            return false;
        }

        match self.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            None => true,
            Some(name) => {
                let needle = name.to_lowercase();
                run.display_name.to_lowercase().contains(&needle)
                    || run.short_name.to_lowercase().contains(&needle)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondensedRow {
    pub workflow: String,
    pub priority: i32,
    pub enabled: bool,
    pub input_required: usize,
    pub not_finished: usize,
    pub finished: usize,
    pub last_run: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedRow {
    pub workflow: String,
    pub priority: i32,
    pub enabled: bool,
    /// Every substate is present, zero counts included
    pub counts: BTreeMap<OverviewState, usize>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl DetailedRow {
    pub fn count(&self, state: OverviewState) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn bucket_total(&self, bucket: OverviewBucket) -> usize {
        self.counts
            .iter()
            .filter(|(state, _)| state.bucket() == bucket)
            .map(|(_, count)| count)
            .sum()
    }

    fn condense(self) -> CondensedRow {
        CondensedRow {
            input_required: self.bucket_total(OverviewBucket::InputRequired),
            not_finished: self.bucket_total(OverviewBucket::NotFinished),
            finished: self.bucket_total(OverviewBucket::Finished),
            workflow: self.workflow,
            priority: self.priority,
            enabled: self.enabled,
            last_run: self.last_run,
            last_failure: self.last_failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListPage {
    pub offset: usize,
    pub limit: usize,
}

impl Default for RunListPage {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Header counters of the run list; they ignore the state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListCounts {
    pub all: usize,
    pub running: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub id: StepId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunListRow {
    pub id: RunId,
    pub state: RunState,
    pub comment: Option<String>,
    pub workflow: String,
    pub short_name: String,
    pub display_name: String,
    pub current_step: Option<String>,
    /// Target of the restart and failed-final actions; only set on failed runs
    pub failed_step_id: Option<StepId>,
    /// Current steps before the failed one, offered for recomputation
    pub previous_steps: Vec<StepSummary>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl RunListRow {
    fn from_run(run: &WorkflowRun) -> Self {
        let failed_step = if run.state == RunState::Failed {
            run.failed_step()
        } else {
            None
        };

        let previous_steps = failed_step
            .map(|failed| {
                run.current_steps()
                    .filter(|step| step.ordinal < failed.ordinal)
                    .map(|step| StepSummary {
                        id: step.id,
                        name: step.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: run.id,
            state: run.state,
            comment: run.comment.clone(),
            workflow: run.workflow.clone(),
            short_name: run.short_name.clone(),
            display_name: run.display_name.clone(),
            current_step: run.active_step().map(|step| step.name.clone()),
            failed_step_id: failed_step.map(|step| step.id),
            previous_steps,
            created_at: run.created_at,
            last_updated: run.last_updated,
            duration_seconds: run.duration().num_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunList {
    pub counts: RunListCounts,
    /// Rows matching the full filter before paging
    pub total: usize,
    pub rows: Vec<RunListRow>,
}

pub struct RunOverview {
    registry: Arc<WorkflowRegistry>,
    repository: Arc<RunRepository>,
}

impl RunOverview {
    pub fn new(registry: Arc<WorkflowRegistry>, repository: Arc<RunRepository>) -> Self {
        Self {
            registry,
            repository,
        }
    }

    /// One row per workflow with the input-required, not-finished and finished totals
    pub fn condensed_view(&self, filter: &OverviewFilter) -> Vec<CondensedRow> {
        self.detailed_view(filter)
            .into_iter()
            .map(DetailedRow::condense)
            .collect()
    }

    /// One row per workflow with a count for every substate.
    ///
    /// Rows follow the registry order: highest priority first, then by name.
    pub fn detailed_view(&self, filter: &OverviewFilter) -> Vec<DetailedRow> {
        let mut rows: Vec<DetailedRow> = self
            .registry
            .list()
            .into_iter()
            .filter(|workflow| filter.workflows.is_empty() || filter.workflows.contains(&workflow.name))
            .map(|workflow| DetailedRow {
                workflow: workflow.name,
                priority: workflow.priority,
                enabled: workflow.enabled,
                counts: OverviewState::ALL.iter().map(|state| (*state, 0)).collect(),
                last_run: None,
                last_failure: None,
            })
            .collect();

        let positions: BTreeMap<String, usize> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.workflow.clone(), index))
            .collect();

        for run in self.repository.snapshots() {
            if !filter.matches(&run) {
                continue;
            }
            let Some(row) = positions.get(&run.workflow).and_then(|index| rows.get_mut(*index))
            else {
                continue;
            };

            *row.counts.entry(OverviewState::of(&run)).or_default() += 1;
            row.last_run = row.last_run.max(Some(run.created_at));
            if matches!(run.state, RunState::Failed | RunState::FailedFinal) {
                row.last_failure = row.last_failure.max(run.ended_at);
            }
        }

        rows
    }

    /// Filtered run list, most recently updated first
    pub fn run_list(&self, filter: &OverviewFilter, page: RunListPage) -> RunList {
        let mut counts = RunListCounts::default();
        let mut selected: Vec<WorkflowRun> = Vec::new();

        for run in self.repository.snapshots() {
            if !filter.matches_ignoring_state(&run) {
                continue;
            }

            counts.all += 1;
            if run.state.is_active() {
                counts.running += 1;
            }
            if run.state == RunState::Failed {
                counts.failed += 1;
            }

            if filter.states.is_empty() || filter.states.contains(&run.state) {
                selected.push(run);
            }
        }

        selected.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then(b.id.cmp(&a.id))
        });

        let total = selected.len();
        let rows = selected
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .map(RunListRow::from_run)
            .collect();

        RunList {
            counts,
            total,
            rows,
        }
    }
}
