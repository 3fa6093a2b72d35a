use serde_json::json;
use std::time::Duration;

use workflow_core::models::{
    ArtefactState, ExecutionTarget, FragmentCategory, NewArtefact, RunContext, SelectorAxis,
    StepKind, StepTemplate, Workflow,
};
use workflow_core::orchestration::{CallbackKind, CallbackOutcome, JobCallback, UserDecision};
use workflow_core::state_machine::{RunState, StepState};

use crate::common::{
    add_fragment, core_with_workflow, current_step_ids, fail, succeed, two_step_workflow,
    RecordingDispatcher, CELL_RANGER, WGS,
};

#[tokio::test]
async fn test_dispatch_hands_configuration_to_the_backend() {
    let core = core_with_workflow(two_step_workflow(CELL_RANGER));
    add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::BedFile,
        &[(SelectorAxis::Project, "P1")],
        json!({"bedFile": "p1.bed"}),
    );
    let run_id = core
        .engine
        .trigger(RunContext::new(CELL_RANGER).with_project("P1"))
        .unwrap();
    let dispatcher = RecordingDispatcher::new();

    let summary = core.engine.dispatch_ready(&dispatcher).await;

    let prepare = current_step_ids(&core, run_id)[0];
    assert_eq!(summary.dispatched, vec![prepare]);
    let requests = dispatcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].step_name, "prepare");
    assert_eq!(requests[0].target, ExecutionTarget::Otp);
    assert_eq!(requests[0].configuration, json!({"threads": 4}));
    assert_eq!(
        requests[0].related_configuration[&FragmentCategory::BedFile],
        json!({"bedFile": "p1.bed"})
    );

    let run = core.engine.get_run(run_id).unwrap();
    let step = run.step(prepare).unwrap();
    assert_eq!(step.detail.job_id, Some(format!("job-{prepare}")));

    // A running step is not handed out twice
    assert!(core.engine.dispatch_ready(&dispatcher).await.is_empty());
}

#[tokio::test]
async fn test_overlapping_passes_hand_a_step_out_once() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    let dispatcher = RecordingDispatcher::slow(Duration::from_millis(50));

    let (first, second) = tokio::join!(
        core.engine.dispatch_ready(&dispatcher),
        core.engine.dispatch_ready(&dispatcher),
    );

    let prepare = current_step_ids(&core, run_id)[0];
    let requested: Vec<_> = dispatcher.requests().iter().map(|request| request.step_id).collect();
    assert_eq!(requested, vec![prepare]);
    let mut dispatched = first.dispatched;
    dispatched.extend(second.dispatched);
    assert_eq!(dispatched, vec![prepare]);

    let run = core.engine.get_run(run_id).unwrap();
    let step = run.step(prepare).unwrap();
    assert_eq!(step.state, StepState::RunningOtp);
    assert_eq!(step.detail.dispatch_requested_at, None);
}

#[tokio::test]
async fn test_unacknowledged_dispatch_counts_towards_the_parallel_limit() {
    let core = core_with_workflow(two_step_workflow(WGS).with_max_parallel_runs(1));
    core.engine.trigger(RunContext::new(WGS).with_sample("S1")).unwrap();
    let second = core.engine.trigger(RunContext::new(WGS).with_sample("S2")).unwrap();
    let dispatcher = RecordingDispatcher::slow(Duration::from_millis(50));

    let (first_pass, second_pass) = tokio::join!(
        core.engine.dispatch_ready(&dispatcher),
        core.engine.dispatch_ready(&dispatcher),
    );

    assert_eq!(dispatcher.requests().len(), 1);
    assert_eq!(first_pass.dispatched.len() + second_pass.dispatched.len(), 1);
    assert!(second_pass.deferred.contains(&second));
}

#[tokio::test]
async fn test_planned_artefacts_follow_their_step() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let succeeding = core.engine.trigger(RunContext::new(WGS).with_sample("S1")).unwrap();
    let failing = core.engine.trigger(RunContext::new(WGS).with_sample("S2")).unwrap();
    let dispatcher = RecordingDispatcher::planning(vec![NewArtefact::new("BAM", "planned bam")]);

    core.engine.dispatch_ready(&dispatcher).await;
    let run = core.engine.get_run(succeeding).unwrap();
    assert_eq!(run.artefacts.len(), 1);
    assert_eq!(run.artefacts[0].state, ArtefactState::PlannedOrRunning);

    let prepare = current_step_ids(&core, succeeding)[0];
    core.engine
        .apply_callback(JobCallback::new(
            prepare,
            CallbackKind::Succeeded {
                artefacts: vec![NewArtefact::new("BAM", "sample S1 bam")],
                process_time: None,
            },
        ))
        .unwrap();
    let run = core.engine.get_run(succeeding).unwrap();
    assert_eq!(run.artefacts.len(), 1);
    assert_eq!(run.artefacts[0].state, ArtefactState::Success);
    assert_eq!(run.artefacts[0].display_name, "sample S1 bam");

    fail(&core, current_step_ids(&core, failing)[0], "disk full");
    let run = core.engine.get_run(failing).unwrap();
    assert_eq!(run.artefacts.len(), 1);
    assert_eq!(run.artefacts[0].state, ArtefactState::Failed);
}

#[tokio::test]
async fn test_omitted_step_lets_the_run_continue() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    let steps = current_step_ids(&core, run_id);

    assert_eq!(core.engine.omit_step(steps[0]).unwrap(), RunState::Pending);
    assert!(core.engine.omit_step(steps[0]).unwrap_err().is_already_in_target_state());

    let summary = core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    assert_eq!(summary.dispatched, vec![steps[1]]);
    assert!(core.engine.omit_step(steps[1]).unwrap_err().is_illegal_transition());

    succeed(&core, steps[1]);
    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.step(steps[0]).unwrap().state, StepState::Omitted);
    assert_eq!(run.state, RunState::Success);
}

#[tokio::test]
async fn test_rejected_dispatch_fails_step_and_run() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();

    let summary = core
        .engine
        .dispatch_ready(&RecordingDispatcher::rejecting("queue closed"))
        .await;

    let prepare = current_step_ids(&core, run_id)[0];
    assert_eq!(summary.failed, vec![prepare]);
    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Failed);
    let message = run.step(prepare).unwrap().detail.error_message.clone().unwrap();
    assert!(message.contains("queue closed"));
}

#[tokio::test]
async fn test_parallel_limit_defers_runs() {
    let core = core_with_workflow(two_step_workflow(WGS).with_max_parallel_runs(1));
    let first = core.engine.trigger(RunContext::new(WGS).with_sample("S1")).unwrap();
    let second = core.engine.trigger(RunContext::new(WGS).with_sample("S2")).unwrap();
    let dispatcher = RecordingDispatcher::new();

    let summary = core.engine.dispatch_ready(&dispatcher).await;
    assert_eq!(summary.dispatched.len(), 1);
    assert_eq!(summary.deferred, vec![second]);
    assert_eq!(core.engine.get_run(first).unwrap().state, RunState::Running);
    assert_eq!(core.engine.get_run(second).unwrap().state, RunState::Pending);

    succeed(&core, summary.dispatched[0]);
    let summary = core.engine.dispatch_ready(&dispatcher).await;
    assert_eq!(summary.dispatched.len(), 1);
    assert_eq!(summary.deferred, vec![second]);
}

#[tokio::test]
async fn test_higher_priority_workflow_is_dispatched_first() {
    let core = core_with_workflow(two_step_workflow(WGS));
    core.engine
        .register_workflow(two_step_workflow(CELL_RANGER).with_priority(10))
        .unwrap();
    add_fragment(&core, CELL_RANGER, FragmentCategory::DefaultValues, &[], json!({}));

    let wgs = core.engine.trigger(RunContext::new(WGS)).unwrap();
    let cell_ranger = core.engine.trigger(RunContext::new(CELL_RANGER)).unwrap();
    let dispatcher = RecordingDispatcher::new();

    core.engine.dispatch_ready(&dispatcher).await;

    let order: Vec<_> = dispatcher.requests().iter().map(|request| request.run_id).collect();
    assert_eq!(order, vec![cell_ranger, wgs]);
}

#[tokio::test]
async fn test_duplicate_and_late_callbacks_are_ignored() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    let prepare = current_step_ids(&core, run_id)[0];

    let queued = core
        .engine
        .apply_callback(JobCallback::new(
            prepare,
            CallbackKind::Queued {
                job_id: Some("cluster-42".to_string()),
                queue_time: Some(Duration::from_secs(30)),
            },
        ))
        .unwrap();
    assert_eq!(queued, CallbackOutcome::DetailsUpdated);

    let succeeded = JobCallback::new(
        prepare,
        CallbackKind::Succeeded {
            artefacts: vec![NewArtefact::new("BAM", "sample S1 bam")],
            process_time: Some(Duration::from_secs(600)),
        },
    );
    assert!(matches!(
        core.engine.apply_callback(succeeded.clone()).unwrap(),
        CallbackOutcome::Transitioned {
            step_state: StepState::Success,
            ..
        }
    ));
    assert!(matches!(
        core.engine.apply_callback(succeeded).unwrap(),
        CallbackOutcome::Ignored { .. }
    ));
    assert!(matches!(
        core.engine
            .apply_callback(JobCallback::new(
                prepare,
                CallbackKind::Failed {
                    message: "late".to_string()
                }
            ))
            .unwrap(),
        CallbackOutcome::Ignored { .. }
    ));

    let run = core.engine.get_run(run_id).unwrap();
    let step = run.step(prepare).unwrap();
    assert_eq!(step.state, StepState::Success);
    assert_eq!(step.detail.job_id.as_deref(), Some("cluster-42"));
    assert_eq!(step.detail.queue_time, Some(Duration::from_secs(30)));
    assert_eq!(step.detail.process_time, Some(Duration::from_secs(600)));
    assert_eq!(run.artefacts.len(), 1);
    assert_eq!(run.artefacts[0].produced_by_step, prepare);
}

#[tokio::test]
async fn test_user_decision_step_suspends_the_run() {
    let workflow = Workflow::new(
        WGS,
        vec![
            StepTemplate::new(
                "approve",
                StepKind::UserDecision {
                    prompt: "Release results?".to_string(),
                },
            ),
            StepTemplate::new("finalize", StepKind::Finalize),
        ],
    );
    let core = core_with_workflow(workflow);
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    let dispatcher = RecordingDispatcher::new();

    let summary = core.engine.dispatch_ready(&dispatcher).await;
    let approve = current_step_ids(&core, run_id)[0];
    assert_eq!(summary.awaiting_user, vec![approve]);
    assert!(dispatcher.requests().is_empty());
    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::WaitingForUser);

    assert_eq!(
        core.engine
            .resolve_user_decision(approve, UserDecision::Continue)
            .unwrap(),
        StepState::Success
    );
    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::Pending);
    assert!(core
        .engine
        .resolve_user_decision(approve, UserDecision::Continue)
        .unwrap_err()
        .is_illegal_transition());

    let summary = core.engine.dispatch_ready(&dispatcher).await;
    assert_eq!(summary.dispatched.len(), 1);
    assert_eq!(dispatcher.requests()[0].step_name, "finalize");
}

#[tokio::test]
async fn test_rejected_user_decision_fails_the_run() {
    let workflow = Workflow::new(
        WGS,
        vec![StepTemplate::new(
            "approve",
            StepKind::UserDecision {
                prompt: "Release results?".to_string(),
            },
        )],
    );
    let core = core_with_workflow(workflow);
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    let approve = current_step_ids(&core, run_id)[0];

    core.engine
        .resolve_user_decision(
            approve,
            UserDecision::Fail {
                reason: "coverage too low".to_string(),
            },
        )
        .unwrap();

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Failed);
    assert_eq!(
        run.step(approve).unwrap().detail.error_message.as_deref(),
        Some("coverage too low")
    );
}

#[tokio::test]
async fn test_killing_a_step_makes_the_run_restartable() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    let prepare = current_step_ids(&core, run_id)[0];

    assert_eq!(core.engine.kill_step(prepare).unwrap(), RunState::Failed);
    assert!(core.engine.kill_step(prepare).unwrap_err().is_already_in_target_state());

    let successor = core.recovery.restart_step(prepare).unwrap();
    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Pending);
    assert_eq!(run.step(successor).unwrap().restart_of, Some(prepare));
}

#[test]
fn test_comment_is_trimmed_and_cleared() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();

    core.engine
        .set_comment(run_id, Some("  waiting for lab  ".to_string()))
        .unwrap();
    assert_eq!(
        core.engine.get_run(run_id).unwrap().comment.as_deref(),
        Some("waiting for lab")
    );

    core.engine.set_comment(run_id, Some("   ".to_string())).unwrap();
    assert_eq!(core.engine.get_run(run_id).unwrap().comment, None);
}
