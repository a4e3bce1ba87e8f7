//! 실행기와 워커 풀 사이의 합류 지점
//!
//! [`CompletionCoordinator`]는 완료 큐(무제한 `tokio::sync::mpsc` 채널)와
//! 실행 중 카운트를 소유합니다. 워커는 끝난 [`ConcurrentStepWrapper`]를 큐에 넣고,
//! 실행기는 이를 드레인하면서 각 스텝의 버퍼 로그를 완료 순서대로 한 블록씩 출력합니다.
//!
//! 실행 중 카운트는 디스패치 시 증가하고, 워커 종료가 아니라 드레인 시 감소합니다.
//! 따라서 "모두 끝남"은 "모두 리포트까지 끝남"을 뜻합니다.

use std::time::Duration;

use stagerun_core::{Logger, Stage};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ExecutionError;
use crate::wrapper::ConcurrentStepWrapper;

/// 완료 큐와 실행 중 카운터
#[derive(Debug)]
pub struct CompletionCoordinator {
    tx: mpsc::UnboundedSender<ConcurrentStepWrapper>,
    rx: mpsc::UnboundedReceiver<ConcurrentStepWrapper>,
    in_flight: usize,
}

impl CompletionCoordinator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// 디스패치되었지만 아직 드레인되지 않은 동시 실행 스텝 수
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `wrapper`를 실행 중으로 집계하고 워커 풀에서 실행합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn dispatch(&mut self, wrapper: ConcurrentStepWrapper) {
        self.in_flight += 1;
        tracing::debug!(
            step = %wrapper.step_name(),
            stage = %wrapper.stage(),
            in_flight = self.in_flight,
            "concurrent step dispatched"
        );
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let done = wrapper.run().await;
            if tx.send(done).is_err() {
                tracing::debug!("completion queue closed, dropping result");
            }
        });
    }

    /// 이미 큐에 있는 완료를 대기 없이 모두 처리합니다.
    ///
    /// 드레인한 개수를 반환합니다. `stage`에서 `fail_on_error`가 설정된 실패 완료를
    /// 만나면 거기서 멈추고 그 에러를 반환하며, 이후 완료는 다음 드레인까지 큐에 남습니다.
    /// 이전 스테이지에서 디스패치된 스텝의 실패는 기록만 합니다.
    pub fn drain_completed(
        &mut self,
        logger: &Logger,
        stage: Stage,
    ) -> Result<usize, ExecutionError> {
        let mut drained = 0;
        while let Ok(done) = self.rx.try_recv() {
            drained += 1;
            self.complete(done, logger, stage)?;
        }
        Ok(drained)
    }

    /// 실행 중인 스텝이 없을 때까지 완료를 처리합니다.
    ///
    /// `timeout`이 지나면 [`ExecutionError::DrainTimeout`]으로 실패하며,
    /// 남은 스텝은 계속 집계된 상태로 유지됩니다.
    pub async fn wait_for_all(
        &mut self,
        logger: &Logger,
        stage: Stage,
        timeout: Option<Duration>,
    ) -> Result<(), ExecutionError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        while self.in_flight > 0 {
            let received = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        let timeout_ms = timeout.map_or(0, |t| t.as_millis() as u64);
                        tracing::warn!(
                            stage = %stage,
                            in_flight = self.in_flight,
                            timeout_ms,
                            "stage-end drain timed out"
                        );
                        return Err(ExecutionError::DrainTimeout {
                            stage,
                            in_flight: self.in_flight,
                            timeout_ms,
                        });
                    }
                },
                None => self.rx.recv().await,
            };

            match received {
                Some(done) => self.complete(done, logger, stage)?,
                None => return Err(ExecutionError::CompletionChannelClosed { stage }),
            }
        }
        Ok(())
    }

    fn complete(
        &mut self,
        mut done: ConcurrentStepWrapper,
        logger: &Logger,
        stage: Stage,
    ) -> Result<(), ExecutionError> {
        self.in_flight = self.in_flight.saturating_sub(1);
        logger.write_block(done.log());

        let Some(source) = done.take_failure() else {
            return Ok(());
        };
        if done.fail_on_error() {
            let err = ExecutionError::ConcurrentStep {
                stage: done.stage(),
                step: done.step_name().to_owned(),
                source,
            };
            if done.stage() == stage {
                return Err(err);
            }
            // 이미 실행을 중단시킨 스테이지에서 넘어온 완료
            logger.error_chain(&err);
            logger.warning(&format!(
                "concurrent step '{}' from {} failed after its stage ended, {stage} continues",
                done.step_name(),
                done.stage()
            ));
            tracing::warn!(
                step = %done.step_name(),
                dispatched_in = %done.stage(),
                stage = %stage,
                "carried-over concurrent step failed"
            );
            return Ok(());
        }
        logger.warning(&format!(
            "concurrent step '{}' failed, ignored (fail_on_error = false): {source}",
            done.step_name()
        ));
        Ok(())
    }
}

impl Default for CompletionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
