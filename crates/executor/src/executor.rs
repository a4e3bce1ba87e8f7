//! 스테이지 순서 제어와 실패 정책
//!
//! [`StageExecutor`]는 하나의 [`Context`]로 [`TestPlan`]을 실행합니다:
//!
//! ```text
//! validate (전체 스테이지) → Setup → Execute → Teardown
//! ```
//!
//! # 실패 정책
//!
//! - 검증 또는 Setup 실패 시 실행 종료. 이후 아무것도 실행하지 않음
//! - Execute 실패는 Teardown 실행 동안 보류
//! - Teardown은 첫 실패 스텝에서 멈춤. Execute가 이미 실패했다면 Execute 실패를 반환
//! - 중단된 스테이지가 남긴 동시 실행 스텝은 다음 스테이지가 드레인하며,
//!   그 실패는 기록만 하고 해당 스테이지를 중단시키지 않음
//! - 모든 경로에서 로그를 닫음

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use stagerun_core::{Context, ExecutorConfig, Logger, Stage, StepInstance, TestPlan};

use crate::coordinator::CompletionCoordinator;
use crate::error::ExecutionError;
use crate::run::execute_step;
use crate::wrapper::ConcurrentStepWrapper;

/// 테스트 실행 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    NotStarted,
    Setup,
    Execute,
    Teardown,
    Completed,
    Failed,
}

impl From<Stage> for TestState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Setup => Self::Setup,
            Stage::Execute => Self::Execute,
            Stage::Teardown => Self::Teardown,
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Setup => write!(f, "setup"),
            Self::Execute => write!(f, "execute"),
            Self::Teardown => write!(f, "teardown"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 하나의 테스트 플랜을 세 스테이지로 실행
pub struct StageExecutor {
    plan: TestPlan,
    context: Context,
    config: ExecutorConfig,
    coordinator: CompletionCoordinator,
    state: TestState,
}

impl StageExecutor {
    pub fn new(plan: TestPlan, context: Context, config: ExecutorConfig) -> Self {
        Self {
            plan,
            context,
            config,
            coordinator: CompletionCoordinator::new(),
            state: TestState::NotStarted,
        }
    }

    /// 플랜 이름으로 새 컨텍스트를 만들고 `logger`로 기록합니다.
    pub fn with_logger(plan: TestPlan, logger: Logger, config: ExecutorConfig) -> Self {
        let context = Context::new(plan.name(), logger);
        Self::new(plan, context, config)
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn plan(&self) -> &TestPlan {
        &self.plan
    }

    /// 디스패치되었지만 아직 드레인되지 않은 동시 실행 스텝 수
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// 모든 스테이지의 모든 스텝과 중첩 검증 스텝을 순서대로 검증합니다.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        for stage in Stage::ALL {
            for step in self.plan.steps(stage) {
                validate_step(step, stage, &self.context)?;
            }
        }
        Ok(())
    }

    /// 전체 테스트를 실행하고 로그를 닫습니다.
    pub async fn run_test(&mut self) -> Result<(), ExecutionError> {
        let logger = self.context.logger().clone();
        let test_name = self.context.test_name().to_owned();
        logger.test_start(&test_name, self.context.start_time());

        let result = self.run_stages(&logger).await;

        self.state = if result.is_ok() {
            TestState::Completed
        } else {
            TestState::Failed
        };
        let abandoned = self.coordinator.in_flight();
        if abandoned > 0 {
            logger.warning(&format!(
                "{abandoned} concurrent step(s) still running at test end, results abandoned"
            ));
        }
        logger.test_end(&test_name, Local::now(), result.is_ok());
        logger.close();
        result
    }

    async fn run_stages(&mut self, logger: &Logger) -> Result<(), ExecutionError> {
        if self.config.validate_before_run {
            if let Err(e) = self.validate() {
                logger.error_chain(&e);
                return Err(e);
            }
        }

        self.run_stage(Stage::Setup, logger).await?;

        let execute = self.run_stage(Stage::Execute, logger).await;
        let teardown = self.run_stage(Stage::Teardown, logger).await;

        match (execute, teardown) {
            (Err(execute_err), Err(_)) => {
                logger.warning("teardown also failed; reporting the execute failure");
                Err(execute_err)
            }
            (Err(execute_err), Ok(())) => Err(execute_err),
            (Ok(()), teardown) => teardown,
        }
    }

    async fn run_stage(&mut self, stage: Stage, logger: &Logger) -> Result<(), ExecutionError> {
        self.state = stage.into();
        self.context.set_stage(stage);
        logger.stage_start(stage, Local::now());

        let result = self.run_steps(stage, logger).await;
        if let Err(e) = &result {
            logger.error_chain(e);
        }

        logger.stage_end(stage, Local::now());
        result
    }

    async fn run_steps(&mut self, stage: Stage, logger: &Logger) -> Result<(), ExecutionError> {
        let steps: Vec<Arc<StepInstance>> = self.plan.steps(stage).to_vec();

        for step in steps {
            if step.run_concurrently() {
                let wrapper = ConcurrentStepWrapper::new(Arc::clone(&step), &self.context, stage);
                self.coordinator.dispatch(wrapper);
                logger.step_start_concurrent(step.name(), Local::now());
            } else {
                self.run_sync_step(&step, stage, logger).await?;
            }
            self.coordinator.drain_completed(logger, stage)?;
        }

        self.coordinator
            .wait_for_all(logger, stage, self.config.drain_timeout())
            .await
    }

    async fn run_sync_step(
        &self,
        step: &StepInstance,
        stage: Stage,
        logger: &Logger,
    ) -> Result<(), ExecutionError> {
        logger.step_start(step.name(), Local::now());
        let started = Instant::now();
        let result = execute_step(step, &self.context).await;
        logger.step_end(step.name(), Local::now(), started.elapsed());

        let Err(source) = result else {
            return Ok(());
        };
        if step.fail_on_error() {
            return Err(ExecutionError::Step {
                stage,
                step: step.name().to_owned(),
                source,
            });
        }
        logger.error_chain(&source);
        logger.warning(&format!(
            "step '{}' failed, continuing (fail_on_error = false)",
            step.name()
        ));
        Ok(())
    }
}

fn validate_step(step: &StepInstance, stage: Stage, ctx: &Context) -> Result<(), ExecutionError> {
    step.step()
        .validate(ctx)
        .map_err(|source| ExecutionError::Validation {
            stage,
            step: step.name().to_owned(),
            source,
        })?;
    for validator in step.validators() {
        validate_step(validator, stage, ctx)?;
    }
    Ok(())
}
