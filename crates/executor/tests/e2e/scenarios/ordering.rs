//! Step ordering and log layout.

use stagerun_core::{ExecutorConfig, Stage, TestPlan};
use stagerun_executor::{StageExecutor, TestState};

use crate::helpers::log::CapturedLog;
use crate::helpers::steps::{Journal, FakeStep};

fn run_plan(plan: TestPlan, log: &CapturedLog) -> StageExecutor {
    StageExecutor::with_logger(plan, log.logger(), ExecutorConfig::default())
}

/// Without concurrent steps, execution and log order equal declaration order.
#[tokio::test]
async fn sequential_steps_run_in_declaration_order() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("sequential")
        .with_step(Stage::Setup, FakeStep::new("s1", &journal).instance())
        .with_step(Stage::Setup, FakeStep::new("s2", &journal).instance())
        .with_step(Stage::Execute, FakeStep::new("e1", &journal).sleep_ms(5).instance())
        .with_step(Stage::Execute, FakeStep::new("e2", &journal).instance())
        .with_step(Stage::Teardown, FakeStep::new("t1", &journal).instance());

    let mut executor = run_plan(plan, &log);
    executor.run_test().await.expect("plan should pass");

    assert_eq!(journal.started(), vec!["s1", "s2", "e1", "e2", "t1"]);
    log.assert_order(&[
        "Test 'sequential' started @ ",
        "Stage 'setup' started @ ",
        "Step 's1' started @ ",
        "Step 's1' ended @ ",
        "Step 's2' started @ ",
        "Step 's2' ended @ ",
        "Stage 'setup' ended @ ",
        "Stage 'execute' started @ ",
        "Step 'e1' started @ ",
        "Step 'e1' ended @ ",
        "Step 'e2' started @ ",
        "Stage 'execute' ended @ ",
        "Stage 'teardown' started @ ",
        "Step 't1' started @ ",
        "Stage 'teardown' ended @ ",
        "Test 'sequential' PASSED @ ",
    ]);
    assert_eq!(executor.state(), TestState::Completed);
    assert!(log.was_closed());
}

/// A(sync 10ms), B(concurrent 200ms), C(sync 10ms) in Execute.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_block_lands_after_later_sync_steps() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("abc")
        .with_step(Stage::Execute, FakeStep::new("A", &journal).sleep_ms(10).instance())
        .with_step(
            Stage::Execute,
            FakeStep::new("B", &journal).sleep_ms(200).instance().concurrent(),
        )
        .with_step(Stage::Execute, FakeStep::new("C", &journal).sleep_ms(10).instance());

    run_plan(plan, &log).run_test().await.expect("plan should pass");

    log.assert_order(&[
        "Step 'A' started @ ",
        "Step 'A' ended @ ",
        "Step 'B' started concurrently @ ",
        "Step 'C' started @ ",
        "Step 'C' ended @ ",
        "Step 'B' started @ ",
        "Info: B working",
        "Step 'B' ended @ ",
        "Stage 'execute' ended @ ",
    ]);
}

/// The dispatch banner is the only thing a concurrent step writes until it
/// is drained, and its log then arrives as one block.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_log_is_written_as_one_block() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("one-block").with_step(
        Stage::Execute,
        FakeStep::new("poller", &journal).sleep_ms(20).instance().concurrent(),
    );

    run_plan(plan, &log).run_test().await.expect("plan should pass");

    let dispatch_banners = log
        .blocks()
        .iter()
        .filter(|b| b.starts_with("Step 'poller' started concurrently @ "))
        .count();
    assert_eq!(dispatch_banners, 1);

    let block = log
        .blocks()
        .into_iter()
        .find(|b| b.starts_with("Step 'poller' started @ "))
        .expect("drained block should be written");
    let lines: Vec<&str> = block.lines().collect();
    assert_eq!(lines.len(), 3, "block was: {block}");
    assert_eq!(lines[1], "Info: poller working");
    assert!(lines[2].starts_with("Step 'poller' ended @ "));
}

/// Blocks from several concurrent steps never interleave.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_blocks_do_not_interleave() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let mut plan = TestPlan::new("fan-out");
    for (i, millis) in [30u64, 5, 20, 10, 0, 25].into_iter().enumerate() {
        plan.push(
            Stage::Execute,
            FakeStep::new(&format!("w{i}"), &journal)
                .sleep_ms(millis)
                .instance()
                .concurrent(),
        );
    }

    run_plan(plan, &log).run_test().await.expect("plan should pass");

    for i in 0..6 {
        let name = format!("w{i}");
        let block = log
            .blocks()
            .into_iter()
            .find(|b| b.starts_with(&format!("Step '{name}' started @ ")))
            .unwrap_or_else(|| panic!("no block for {name}"));
        for line in block.lines() {
            assert!(line.contains(&name), "foreign line {line:?} in block of {name}");
        }
    }
}

/// A concurrent step does not hold up the steps declared after it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dispatch_returns_immediately() {
    let journal = Journal::new();
    let log = CapturedLog::new();
    let plan = TestPlan::new("non-blocking")
        .with_step(
            Stage::Execute,
            FakeStep::new("slow", &journal).sleep_ms(300).instance().concurrent(),
        )
        .with_step(Stage::Execute, FakeStep::new("quick", &journal).instance());

    run_plan(plan, &log).run_test().await.expect("plan should pass");

    let entries = journal.entries();
    let quick_end = entries.iter().position(|e| e == "end:quick").unwrap();
    let slow_end = entries.iter().position(|e| e == "end:slow").unwrap();
    assert!(quick_end < slow_end, "journal was {entries:?}");
}

/// Stage markers on the context follow the run.
#[tokio::test]
async fn context_tracks_current_stage() {
    let log = CapturedLog::new();
    let journal = Journal::new();
    let plan = TestPlan::new("stages").with_step(Stage::Setup, FakeStep::new("s", &journal).instance());
    let mut executor = run_plan(plan, &log);
    assert_eq!(executor.context().stage(), None);

    executor.run_test().await.expect("plan should pass");

    assert_eq!(executor.context().stage(), Some(Stage::Teardown));
}
