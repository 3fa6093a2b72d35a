use serde_json::json;

use workflow_core::constants::events;
use workflow_core::models::{FragmentCategory, RunContext, SelectorAxis, WorkflowSettingsUpdate};
use workflow_core::orchestration::OrchestrationError;
use workflow_core::registry::RegistryError;
use workflow_core::state_machine::{RunState, StepState};

use crate::common::{add_fragment, core, core_with_workflow, two_step_workflow, CELL_RANGER, WGS};

#[test]
fn test_trigger_without_configuration_creates_nothing() {
    let core = core();
    core.engine.register_workflow(two_step_workflow(CELL_RANGER)).unwrap();

    let err = core
        .engine
        .trigger(RunContext::new(CELL_RANGER).with_project("P1"))
        .unwrap_err();

    assert!(err.is_no_configuration_found());
    assert!(core.repository.is_empty());
}

#[test]
fn test_trigger_snapshots_configuration_and_enqueues() {
    let core = core_with_workflow(two_step_workflow(CELL_RANGER));
    let project = add_fragment(
        &core,
        CELL_RANGER,
        FragmentCategory::Generic,
        &[(SelectorAxis::Project, "P1")],
        json!({"expectedCells": 5000}),
    );
    let mut receiver = core.event_publisher.subscribe();

    let run_id = core
        .engine
        .trigger(RunContext::new(CELL_RANGER).with_project("P1").with_sample("S1"))
        .unwrap();

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(run.state, RunState::Pending);
    assert_eq!(run.workflow_version.as_deref(), Some("1.0"));
    assert_eq!(run.steps.len(), 2);
    assert!(run.steps.iter().all(|step| step.state == StepState::Created));

    let configuration = run.configuration.unwrap();
    assert_eq!(
        configuration.config_value,
        json!({"threads": 4, "expectedCells": 5000})
    );
    assert_eq!(configuration.provenance.last(), Some(&project));

    let created = receiver.try_recv().unwrap();
    assert_eq!(created.name, events::WORKFLOW_RUN_CREATED);
    assert_eq!(created.context["run_id"], json!(run_id));
}

#[test]
fn test_run_keeps_its_snapshot_after_fragment_changes() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();

    add_fragment(&core, WGS, FragmentCategory::Generic, &[], json!({"threads": 32}));

    let run = core.engine.get_run(run_id).unwrap();
    assert_eq!(
        run.configuration.unwrap().value_at("threads"),
        Some(&json!(4))
    );

    let later = core.engine.trigger(RunContext::new(WGS)).unwrap();
    let later = core.engine.get_run(later).unwrap();
    assert_eq!(
        later.configuration.unwrap().value_at("threads"),
        Some(&json!(32))
    );
}

#[test]
fn test_disabled_or_unknown_workflows_are_not_triggered() {
    let core = core_with_workflow(two_step_workflow(WGS));
    core.registry
        .update_settings(
            WGS,
            WorkflowSettingsUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let disabled = core.engine.trigger(RunContext::new(WGS)).unwrap_err();
    assert!(matches!(
        disabled,
        OrchestrationError::Registry(RegistryError::WorkflowDisabled(_))
    ));

    let unknown = core.engine.trigger(RunContext::new("Unknown")).unwrap_err();
    assert!(matches!(
        unknown,
        OrchestrationError::Registry(RegistryError::WorkflowNotFound(_))
    ));
    assert!(core.repository.is_empty());
}

#[test]
fn test_requested_version_must_exist() {
    let core = core_with_workflow(two_step_workflow(WGS));

    let err = core
        .engine
        .trigger(RunContext::new(WGS).with_workflow_version("9.9"))
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestrationError::Registry(RegistryError::UnknownVersion { .. })
    ));

    let run_id = core
        .engine
        .trigger(RunContext::new(WGS).with_workflow_version("1.0"))
        .unwrap();
    assert_eq!(
        core.engine.get_run(run_id).unwrap().workflow_version.as_deref(),
        Some("1.0")
    );
}
