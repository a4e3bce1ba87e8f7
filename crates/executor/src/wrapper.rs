//! 단일 스텝의 백그라운드 실행
//!
//! [`ConcurrentStepWrapper`]는 동시 실행 스텝이 워커에서 필요로 하는 것을 모두 소유합니다:
//! 스텝, 전용 버퍼에 기록하는 컨텍스트 복제본, 디스패치된 스테이지.
//! [`run`](ConcurrentStepWrapper::run)은 실패하지 않으며, 에러와 패닉은 래퍼에 담겨
//! [`CompletionCoordinator`](crate::coordinator::CompletionCoordinator)가
//! 완료를 드레인할 때 처리합니다.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use stagerun_core::{Context, Logger, Stage, StepError, StepInstance};

use crate::run::execute_step;

/// 워커 풀에 디스패치된 스텝과 실행 결과
pub struct ConcurrentStepWrapper {
    step: Arc<StepInstance>,
    context: Context,
    stage: Stage,
    failure: Option<StepError>,
    log: String,
    completed: bool,
    elapsed: Duration,
}

impl fmt::Debug for ConcurrentStepWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentStepWrapper")
            .field("step", &self.step.name())
            .field("stage", &self.stage)
            .field("failure", &self.failure)
            .field("completed", &self.completed)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl ConcurrentStepWrapper {
    /// 전용 버퍼에 기록하는 `parent` 복제본으로 `step`을 감쌉니다.
    pub fn new(step: Arc<StepInstance>, parent: &Context, stage: Stage) -> Self {
        Self {
            step,
            context: parent.clone_for_concurrent_use(Logger::buffered()),
            stage,
            failure: None,
            log: String::new(),
            completed: false,
            elapsed: Duration::ZERO,
        }
    }

    /// 스텝과 검증 스텝을 실행하고 결과를 저장합니다.
    ///
    /// 스텝은 별도 태스크에서 실행되므로 패닉은 워커를 되감지 않고
    /// [`StepError::Panicked`]로 드러납니다.
    pub async fn run(mut self) -> Self {
        let logger = self.context.logger().clone();
        let name = self.step.name().to_owned();
        logger.step_start(&name, Local::now());
        let started = Instant::now();

        let step = Arc::clone(&self.step);
        let ctx = self.context.clone();
        let outcome = tokio::spawn(async move { execute_step(&step, &ctx).await }).await;

        let result = match outcome {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                Err(StepError::Panicked(panic_message(join_err.into_panic())))
            }
            Err(_) => Err(StepError::failed("worker task was cancelled")),
        };

        if let Err(e) = &result {
            logger.error_chain(e);
        }
        self.elapsed = started.elapsed();
        logger.step_end(&name, Local::now(), self.elapsed);

        tracing::debug!(
            step = %name,
            stage = %self.stage,
            failed = result.is_err(),
            "concurrent step completed"
        );

        self.failure = result.err();
        self.log = logger.take_buffer();
        self.completed = true;
        self
    }

    pub fn step_name(&self) -> &str {
        self.step.name()
    }

    /// 스텝을 디스패치한 스테이지
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fail_on_error(&self) -> bool {
        self.step.fail_on_error()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn failure(&self) -> Option<&StepError> {
        self.failure.as_ref()
    }

    pub fn take_failure(&mut self) -> Option<StepError> {
        self.failure.take()
    }

    /// 스텝이 실행 중 기록한 전체 로그
    pub fn log(&self) -> &str {
        &self.log
    }

    /// 스텝이 사용한 컨텍스트 복제본
    pub fn context(&self) -> &Context {
        &self.context
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
