//! Concurrent dispatch, draining and failure capture.

use stagerun_core::error::error_chain;
use stagerun_core::{ExecutorConfig, Stage, StepError, TestPlan};
use stagerun_executor::{ExecutionError, StageExecutor};

use crate::helpers::log::CapturedLog;
use crate::helpers::steps::{Journal, FakeStep};

fn executor(plan: TestPlan, log: &CapturedLog) -> StageExecutor {
    StageExecutor::with_logger(plan, log.logger(), ExecutorConfig::default())
}

/// The stage-end drain waits for every dispatched step.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stage_end_waits_for_all_concurrent_steps() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let mut plan = TestPlan::new("fan-out");
    for i in 0..8u64 {
        plan.push(
            Stage::Execute,
            FakeStep::new(&format!("c{i}"), &journal)
                .sleep_ms(10 * (8 - i))
                .instance()
                .concurrent(),
        );
    }

    let mut executor = executor(plan, &log);
    executor.run_test().await.expect("plan should pass");

    assert_eq!(executor.in_flight(), 0);
    let stage_end = log.position("Stage 'execute' ended @ ");
    for i in 0..8 {
        assert!(journal.entries().contains(&format!("end:c{i}")));
        assert!(log.position(&format!("Step 'c{i}' ended @ ")) < stage_end);
    }
}

/// A failing concurrent step with fail_on_error = true fails the run and
/// names the step; Teardown still runs.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failure_surfaces_with_step_and_source() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("concurrent-fails")
        .with_step(
            Stage::Execute,
            FakeStep::new("listener", &journal)
                .sleep_ms(20)
                .failing()
                .instance()
                .concurrent(),
        )
        .with_step(Stage::Teardown, FakeStep::new("cleanup", &journal).instance());

    let err = executor(plan, &log).run_test().await.unwrap_err();

    assert!(
        matches!(err, ExecutionError::ConcurrentStep { stage: Stage::Execute, ref step, .. } if step == "listener"),
        "got {err:?}"
    );
    assert_eq!(
        error_chain(&err),
        vec![
            "concurrent step 'listener' failed in execute",
            "listener failed",
            "listener root cause"
        ]
    );
    assert!(journal.ran("cleanup"));
    assert!(log.was_closed());
}

/// The failure is raised by the first drain after completion, aborting the
/// steps declared after that point.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failure_aborts_at_next_drain() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("abort-at-drain")
        .with_step(
            Stage::Execute,
            FakeStep::new("fast-fail", &journal)
                .sleep_ms(20)
                .failing()
                .instance()
                .concurrent(),
        )
        .with_step(Stage::Execute, FakeStep::new("wait", &journal).sleep_ms(100).instance())
        .with_step(Stage::Execute, FakeStep::new("never", &journal).instance());

    let err = executor(plan, &log).run_test().await.unwrap_err();

    assert_eq!(err.step_name(), Some("fast-fail"));
    assert!(journal.ran("wait"));
    assert!(!journal.ran("never"));
}

/// fail_on_error = false: the failure is logged and the run passes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lenient_concurrent_failure_is_logged_only() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("lenient-concurrent")
        .with_step(
            Stage::Execute,
            FakeStep::new("best-effort", &journal)
                .failing()
                .instance()
                .concurrent()
                .with_fail_on_error(false),
        )
        .with_step(Stage::Execute, FakeStep::new("main", &journal).sleep_ms(20).instance());

    executor(plan, &log).run_test().await.expect("lenient failure must not fail the test");

    assert!(log.contains_line("Error: best-effort failed"));
    assert!(log.contains_line("Warning: concurrent step 'best-effort' failed, ignored"));
    assert!(log.contains_line("Test 'lenient-concurrent' PASSED @ "));
}

/// A panicking concurrent step becomes a failure instead of crashing.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_step_is_reported_as_failure() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("panics")
        .with_step(
            Stage::Execute,
            FakeStep::new("crasher", &journal).panicking().instance().concurrent(),
        )
        .with_step(Stage::Teardown, FakeStep::new("cleanup", &journal).instance());

    let err = executor(plan, &log).run_test().await.unwrap_err();

    match &err {
        ExecutionError::ConcurrentStep {
            step,
            source: StepError::Panicked(message),
            ..
        } => {
            assert_eq!(step, "crasher");
            assert_eq!(message, "crasher panicked");
        }
        other => panic!("expected a panicked concurrent step, got {other:?}"),
    }
    assert!(journal.ran("cleanup"));
}

/// A bounded drain turns a hung step into a DrainTimeout.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_drain_times_out() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("hung").with_step(
        Stage::Execute,
        FakeStep::new("stuck", &journal).sleep_ms(5_000).instance().concurrent(),
    );
    let config = ExecutorConfig {
        drain_timeout_ms: 50,
        ..ExecutorConfig::default()
    };

    let mut executor = StageExecutor::with_logger(plan, log.logger(), config);
    let err = executor.run_test().await.unwrap_err();

    assert!(
        matches!(err, ExecutionError::DrainTimeout { stage: Stage::Execute, in_flight: 1, timeout_ms: 50 }),
        "got {err:?}"
    );
    assert_eq!(executor.in_flight(), 1);
    assert!(log.contains_line("Warning: 1 concurrent step(s) still running at test end"));
    assert!(log.was_closed());
}

/// Work left in flight by an aborted stage is drained by the next stage.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_work_carries_into_next_stage() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("carry-over")
        .with_step(
            Stage::Execute,
            FakeStep::new("background", &journal)
                .sleep_ms(100)
                .sets("background_done")
                .instance()
                .concurrent(),
        )
        .with_step(Stage::Execute, FakeStep::new("breaks", &journal).failing().instance());

    let mut executor = executor(plan, &log);
    let err = executor.run_test().await.unwrap_err();

    assert_eq!(err.step_name(), Some("breaks"));
    assert_eq!(executor.in_flight(), 0);
    assert!(executor.context().contains_key("background_done"));
    log.assert_order(&[
        "Stage 'execute' ended @ ",
        "Stage 'teardown' started @ ",
        "Step 'background' ended @ ",
        "Stage 'teardown' ended @ ",
    ]);
    assert!(!log.contains_line("Warning: 1 concurrent step(s) still running"));
}

/// A leftover step from the aborted Execute stage that fails while Teardown
/// runs is logged; Teardown still runs every step.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn carried_over_failure_does_not_cut_teardown_short() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("carry-over-fails")
        .with_step(
            Stage::Execute,
            FakeStep::new("background", &journal)
                .sleep_ms(30)
                .failing()
                .instance()
                .concurrent(),
        )
        .with_step(Stage::Execute, FakeStep::new("breaks", &journal).failing().instance())
        .with_step(Stage::Teardown, FakeStep::new("cleanup-1", &journal).sleep_ms(80).instance())
        .with_step(Stage::Teardown, FakeStep::new("cleanup-2", &journal).instance());

    let mut executor = executor(plan, &log);
    let err = executor.run_test().await.unwrap_err();

    assert!(
        matches!(err, ExecutionError::Step { stage: Stage::Execute, ref step, .. } if step == "breaks"),
        "got {err:?}"
    );
    assert!(journal.ran("cleanup-1"));
    assert!(journal.ran("cleanup-2"));
    assert_eq!(executor.in_flight(), 0);
    log.assert_order(&[
        "Stage 'teardown' started @ ",
        "Error: concurrent step 'background' failed in execute",
        "Warning: concurrent step 'background' from execute failed after its stage ended, teardown continues",
        "Step 'cleanup-2' started @ ",
        "Stage 'teardown' ended @ ",
    ]);
    assert!(!log.contains_line("Warning: teardown also failed"));
}

/// Concurrent steps write to the same context as everything else.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_steps_share_context() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let mut plan = TestPlan::new("shared");
    for i in 0..4 {
        plan.push(
            Stage::Setup,
            FakeStep::new(&format!("writer-{i}"), &journal)
                .sets(&format!("key-{i}"))
                .instance()
                .concurrent(),
        );
    }

    let mut executor = executor(plan, &log);
    executor.run_test().await.expect("plan should pass");

    assert_eq!(
        executor.context().keys(),
        vec!["key-0", "key-1", "key-2", "key-3"]
    );
}
