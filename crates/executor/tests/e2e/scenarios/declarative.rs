//! TOML test case → registry → executor.

use serde::Deserialize;
use stagerun_core::{Context, ExecutorConfig, Step, StepError, StepRegistry, TestCase};
use stagerun_executor::StageExecutor;

use crate::helpers::log::CapturedLog;

/// Appends `value` to a comma-separated trail kept in the context.
#[derive(Deserialize)]
struct Trail {
    value: String,
    #[serde(default)]
    sleep_ms: u64,
}

impl Step for Trail {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        if self.value.is_empty() {
            return Err(StepError::validation("value must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        if self.sleep_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.sleep_ms)).await;
        }
        let value = ctx.substitute_wildcards(&self.value);
        let mut trail = ctx.get_value("trail");
        if !trail.is_empty() {
            trail.push(',');
        }
        trail.push_str(&value);
        ctx.add("trail", trail, true)?;
        Ok(())
    }
}

const CASE: &str = r#"
name = "declarative"

[[setup]]
type = "trail"
params = { value = "setup" }

[[execute]]
type = "trail"
name = "late"
run_concurrently = true
params = { value = "late", sleep_ms = 50 }

[[execute]]
type = "trail"
params = { value = "early" }

[[execute.validators]]
type = "trail"
params = { value = "checked" }

[[teardown]]
type = "trail"
params = { value = "teardown" }
"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn toml_case_resolves_and_runs() {
    let mut registry = StepRegistry::new();
    registry.register_step::<Trail>("trail").expect("register");
    let test_case = TestCase::parse(CASE).expect("case should parse");
    let plan = registry.resolve(&test_case).expect("case should resolve");

    let log = CapturedLog::new();
    let mut executor = StageExecutor::with_logger(plan, log.logger(), ExecutorConfig::default());
    executor.run_test().await.expect("case should pass");

    assert_eq!(
        executor.context().get_value("trail"),
        "setup,early,checked,late,teardown"
    );
    assert!(log.contains_line("Step 'late' started concurrently @ "));
    assert!(log.contains_line("Test 'declarative' PASSED @ "));
}

#[tokio::test]
async fn empty_param_fails_validation_before_setup() {
    let mut registry = StepRegistry::new();
    registry.register_step::<Trail>("trail").expect("register");
    let test_case = TestCase::parse(
        r#"
name = "bad-param"
[[setup]]
type = "trail"
params = { value = "ok" }
[[teardown]]
type = "trail"
params = { value = "" }
"#,
    )
    .expect("case should parse");
    let plan = registry.resolve(&test_case).expect("case should resolve");

    let log = CapturedLog::new();
    let mut executor = StageExecutor::with_logger(plan, log.logger(), ExecutorConfig::default());
    let err = executor.run_test().await.unwrap_err();

    assert_eq!(err.step_name(), Some("trail"));
    assert!(executor.context().get_object("trail").is_none());
}
