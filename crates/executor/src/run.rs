//! 스텝 인스턴스 하나 실행: 스텝 자신, 그 다음 검증 스텝

use std::time::Instant;

use chrono::Local;
use stagerun_core::{BoxFuture, Context, StepError, StepInstance};

/// `ctx`로 `step`을 실행한 뒤 각 검증 스텝을 순서대로 실행합니다.
///
/// 검증 스텝은 자체 시작/종료 배너를 가지며, `step` 자신의 배너는 호출자가 기록합니다.
/// 첫 실패에서 멈추고 그 에러를 반환합니다.
pub(crate) fn execute_step<'a>(
    step: &'a StepInstance,
    ctx: &'a Context,
) -> BoxFuture<'a, Result<(), StepError>> {
    Box::pin(async move {
        step.step().execute(ctx).await?;
        for validator in step.validators() {
            let logger = ctx.logger();
            logger.step_start(validator.name(), Local::now());
            let started = Instant::now();
            let result = execute_step(validator, ctx).await;
            logger.step_end(validator.name(), Local::now(), started.elapsed());
            result?;
        }
        Ok(())
    })
}
