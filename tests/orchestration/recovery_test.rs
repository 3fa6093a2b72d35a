use serde_json::json;
use std::sync::Arc;

use workflow_core::models::{FragmentCategory, RunContext};
use workflow_core::orchestration::{OrchestrationError, RecoveryController};
use workflow_core::state_machine::{EntityRef, RunState, StepState};

use crate::common::{
    add_fragment, core_with_workflow, current_step_ids, failed_run, succeed, two_step_workflow,
    RecordingDispatcher, WGS,
};

#[tokio::test]
async fn test_restart_step_appends_successor_and_requeues_run() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, prepare, align) = failed_run(&core, WGS).await;

    let successor = core.recovery.restart_step(align).unwrap();

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Pending);
    assert_eq!(run.step(prepare).unwrap().state, StepState::Success);
    let restarted = run.step(align).unwrap();
    assert_eq!(restarted.state, StepState::Restarted);
    assert_eq!(restarted.restarted_by, Some(successor));
    let new_step = run.step(successor).unwrap();
    assert_eq!(new_step.state, StepState::Created);
    assert_eq!(new_step.restart_of, Some(align));
    assert_eq!(new_step.name, "align");
    assert_eq!(current_step_ids(&core, run_id), vec![prepare, successor]);

    let again = core.recovery.restart_step(align).unwrap_err();
    assert!(again.is_already_in_target_state());
    assert_eq!(again.successor(), Some(EntityRef::Step(successor)));
}

#[tokio::test]
async fn test_restart_from_an_unfinished_or_successful_step_is_illegal() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, prepare, _) = failed_run(&core, WGS).await;

    let err = core.recovery.restart_step(prepare).unwrap_err();
    assert!(err.is_illegal_transition());
    let err = core.recovery.restart_previous_step(prepare).unwrap_err();
    assert!(err.is_illegal_transition());

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Failed);
    assert_eq!(run.step(prepare).unwrap().state, StepState::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_restarts_of_one_step_create_one_successor() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, align) = failed_run(&core, WGS).await;
    let first = RecoveryController::new(Arc::clone(&core.engine));
    let second = RecoveryController::new(Arc::clone(&core.engine));

    let (first, second) = tokio::join!(
        tokio::task::spawn_blocking(move || first.restart_step(align)),
        tokio::task::spawn_blocking(move || second.restart_step(align)),
    );
    let results = [first.unwrap(), second.unwrap()];

    let successors: Vec<_> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
    assert_eq!(successors.len(), 1);
    let rejected = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .unwrap();
    assert!(rejected.is_already_in_target_state());
    assert_eq!(rejected.successor(), Some(EntityRef::Step(*successors[0])));

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.steps.len(), 3);
    assert_eq!(run.state, RunState::Pending);
}

#[tokio::test]
async fn test_operator_is_recorded_in_the_transition_history() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, align) = failed_run(&core, WGS).await;

    core.recovery.acting_as("alice").restart_step(align).unwrap();

    let run = core.engine.get_run(run_id).unwrap();
    let restarted = run.step(align).unwrap().transitions.most_recent().unwrap();
    assert_eq!(restarted.to_state, "RESTARTED");
    assert_eq!(restarted.metadata, Some(json!({"actor": "alice"})));
    let requeued = run.transitions.most_recent().unwrap();
    assert_eq!(requeued.to_state, "PENDING");
    assert_eq!(requeued.metadata, Some(json!({"actor": "alice"})));
}

#[tokio::test]
async fn test_restarted_step_runs_to_success() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, align) = failed_run(&core, WGS).await;
    let successor = core.recovery.restart_step(align).unwrap();

    let summary = core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    assert_eq!(summary.dispatched, vec![successor]);
    succeed(&core, successor);

    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::Success);
}

#[tokio::test]
async fn test_restart_previous_step_recomputes_both_steps() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, prepare, align) = failed_run(&core, WGS).await;

    let successors = core.recovery.restart_previous_step(align).unwrap();
    assert_eq!(successors.len(), 2);

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Pending);
    assert_eq!(run.step(prepare).unwrap().state, StepState::Restarted);
    assert_eq!(run.step(align).unwrap().state, StepState::Restarted);
    assert_eq!(run.step(successors[0]).unwrap().restart_of, Some(prepare));
    assert_eq!(run.step(successors[1]).unwrap().restart_of, Some(align));
    assert_eq!(current_step_ids(&core, run_id), successors);

    let summary = core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    assert_eq!(summary.dispatched, vec![successors[0]]);
}

#[tokio::test]
async fn test_restart_previous_step_needs_a_predecessor() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    core.engine
        .dispatch_ready(&RecordingDispatcher::rejecting("no slots"))
        .await;
    let prepare = current_step_ids(&core, run_id)[0];

    let err = core.recovery.restart_previous_step(prepare).unwrap_err();
    assert!(matches!(err, OrchestrationError::Validation(_)));
    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::Failed);
}

#[tokio::test]
async fn test_restart_failed_step_finds_the_failed_instance() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, align) = failed_run(&core, WGS).await;

    let successor = core.recovery.restart_failed_step(run_id).unwrap();

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.step(successor).unwrap().restart_of, Some(align));
    assert!(matches!(
        core.recovery.restart_failed_step(run_id).unwrap_err(),
        OrchestrationError::Validation(_)
    ));
}

#[tokio::test]
async fn test_restart_run_creates_a_linked_run_with_fresh_configuration() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, _) = failed_run(&core, WGS).await;
    add_fragment(&core, WGS, FragmentCategory::Generic, &[], json!({"threads": 16}));

    let new_run_id = core.recovery.restart_run(run_id).unwrap();

    let old_run = core.engine.get_run(run_id).unwrap();
    assert_eq!(old_run.state, RunState::Restarted);
    assert_eq!(old_run.restarted_as, Some(new_run_id));

    let new_run = core.engine.get_run(new_run_id).unwrap();
    assert_eq!(new_run.state, RunState::Pending);
    assert_eq!(new_run.restarted_from, Some(run_id));
    assert_eq!(new_run.context, old_run.context);
    assert!(new_run.steps.iter().all(|step| step.state == StepState::Created));
    assert_eq!(
        new_run.configuration.unwrap().value_at("threads"),
        Some(&json!(16))
    );

    let again = core.recovery.restart_run(run_id).unwrap_err();
    assert!(again.is_already_in_target_state());
    assert_eq!(again.successor(), Some(EntityRef::Run(new_run_id)));
    assert_eq!(core.repository.len(), 2);
}

#[tokio::test]
async fn test_restart_run_without_configuration_omits_the_new_run() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (run_id, _, _) = failed_run(&core, WGS).await;
    for fragment in core.selector_store.live_fragments() {
        core.selector_store.force_invalidate(fragment.id).unwrap();
    }

    let new_run_id = core.recovery.restart_run(run_id).unwrap();

    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::Restarted);
    let new_run = core.engine.get_run(new_run_id).unwrap();
    assert_eq!(new_run.state, RunState::OmittedMissingPrecondition);
    assert!(new_run.configuration.is_none());
    assert!(new_run
        .steps
        .iter()
        .all(|step| step.state == StepState::OmittedMissingPrecondition));

    let summary = core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    assert!(summary.is_empty());
}

#[tokio::test]
async fn test_restart_run_requires_a_failed_run() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let pending = core.engine.trigger(RunContext::new(WGS)).unwrap();
    assert!(core.recovery.restart_run(pending).unwrap_err().is_illegal_transition());

    let (failed, _, _) = failed_run(&core, WGS).await;
    core.recovery.mark_failed_final(failed).unwrap();
    assert!(core.recovery.restart_run(failed).unwrap_err().is_illegal_transition());
    assert_eq!(core.repository.len(), 2);
}

#[tokio::test]
async fn test_bulk_operations_report_per_item_results() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let (first_run, first_prepare, first_align) = failed_run(&core, WGS).await;
    let (second_run, _, _) = failed_run(&core, WGS).await;

    let results = core.recovery.restart_steps(&[first_align, first_prepare]);
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert_eq!(core.engine.get_run(first_run).unwrap().state, RunState::Pending);

    let results = core.recovery.mark_failed_final_bulk(&[first_run, second_run]);
    assert!(results[0].1.as_ref().unwrap_err().is_illegal_transition());
    assert_eq!(results[1].1.as_ref().unwrap(), &RunState::FailedFinal);
}
