//! # Run Repository
//!
//! In-memory home of the run aggregates.
//!
//! Each run sits behind its own mutex, so operations on different runs never contend.
//! Mutations go through [`RunRepository::apply`], which works on a draft copy of the
//! run and commits it only when the whole operation succeeded.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::errors::{OrchestrationError, OrchestrationResult};
use crate::models::{ArtefactId, RunId, StepId, WorkflowRun};
use crate::state_machine::TransitionContext;

pub type RunHandle = Arc<Mutex<WorkflowRun>>;

#[derive(Debug)]
pub struct RunRepository {
    runs: DashMap<RunId, RunHandle>,
    step_index: DashMap<StepId, RunId>,
    next_run_id: AtomicI64,
    next_step_id: AtomicI64,
    next_artefact_id: AtomicI64,
}

impl RunRepository {
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
            step_index: DashMap::new(),
            next_run_id: AtomicI64::new(1),
            next_step_id: AtomicI64::new(1),
            next_artefact_id: AtomicI64::new(1),
        }
    }

    pub fn next_run_id(&self) -> RunId {
        self.next_run_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_step_id(&self) -> StepId {
        self.next_step_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_artefact_id(&self) -> ArtefactId {
        self.next_artefact_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Store a new run and index its steps
    pub fn insert(&self, run: WorkflowRun) {
        self.index_steps(&run);
        self.runs.insert(run.id, Arc::new(Mutex::new(run)));
    }

    pub fn handle(&self, run_id: RunId) -> OrchestrationResult<RunHandle> {
        self.runs
            .get(&run_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(OrchestrationError::RunNotFound(run_id))
    }

    pub fn run_id_for_step(&self, step_id: StepId) -> OrchestrationResult<RunId> {
        self.step_index
            .get(&step_id)
            .map(|entry| *entry.value())
            .ok_or(OrchestrationError::StepNotFound(step_id))
    }

    /// Copy of the current state of a run
    pub fn snapshot(&self, run_id: RunId) -> OrchestrationResult<WorkflowRun> {
        let handle = self.handle(run_id)?;
        let run = handle.lock();
        Ok(run.clone())
    }

    /// Copies of all runs, ordered by id
    pub fn snapshots(&self) -> Vec<WorkflowRun> {
        self.handles()
            .into_iter()
            .map(|handle| handle.lock().clone())
            .collect()
    }

    /// Handles of all runs, ordered by id. No run lock is taken.
    pub fn handles(&self) -> Vec<RunHandle> {
        let mut entries: Vec<(RunId, RunHandle)> = self
            .runs
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, handle)| handle).collect()
    }

    /// Run an operation against a draft of the run and commit it on success.
    ///
    /// Events recorded by the operation move into `context` only on commit; on error
    /// neither the run nor the context changes.
    pub fn apply<T>(
        &self,
        run_id: RunId,
        context: &mut TransitionContext,
        operation: impl FnOnce(&mut WorkflowRun, &mut TransitionContext) -> OrchestrationResult<T>,
    ) -> OrchestrationResult<T> {
        let handle = self.handle(run_id)?;
        let mut run = handle.lock();

        let mut draft = run.clone();
        let mut draft_context = context.fork();
        let result = operation(&mut draft, &mut draft_context)?;

        self.index_steps(&draft);
        *run = draft;
        context.absorb(draft_context);
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn index_steps(&self, run: &WorkflowRun) {
        for step in &run.steps {
            self.step_index.insert(step.id, run.id);
        }
    }
}

impl Default for RunRepository {
    fn default() -> Self {
        Self::new()
    }
}
