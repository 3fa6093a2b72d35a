use std::time::Duration;

use workflow_core::models::RunContext;
use workflow_core::orchestration::{CallbackKind, JobCallback};
use workflow_core::state_machine::RunState;

use crate::common::{core_with_workflow, current_step_ids, two_step_workflow, RecordingDispatcher, WGS};

#[tokio::test]
async fn test_listener_applies_callbacks_until_closed() {
    let core = core_with_workflow(two_step_workflow(WGS));
    let run_id = core.engine.trigger(RunContext::new(WGS)).unwrap();
    core.engine.dispatch_ready(&RecordingDispatcher::new()).await;
    let prepare = current_step_ids(&core, run_id)[0];

    let (sender, handle) = core.spawn_callback_listener(16);
    let callbacks = vec![
        JobCallback::new(
            prepare,
            CallbackKind::Progress {
                process_time: Duration::from_secs(5),
            },
        ),
        JobCallback::new(
            prepare,
            CallbackKind::Succeeded {
                artefacts: Vec::new(),
                process_time: None,
            },
        ),
        JobCallback::new(
            prepare,
            CallbackKind::Succeeded {
                artefacts: Vec::new(),
                process_time: None,
            },
        ),
        JobCallback::new(999_999, CallbackKind::Checking),
    ];
    for callback in callbacks {
        sender.send(callback).await.unwrap();
    }
    drop(sender);

    let stats = handle.await.unwrap();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.details_updated, 1);
    assert_eq!(stats.transitioned, 1);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.rejected, 1);

    assert_eq!(core.engine.get_run(run_id).unwrap().state, RunState::Pending);
}
