//! 테스트 실행 실패

use stagerun_core::{Stage, StepError};

/// 테스트 실행 실패 원인
///
/// 모든 variant는 발생한 스테이지를 가지며, 스텝 단위 variant는 스텝 이름과
/// [`StepError`]를 `source()`로 보존합니다.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// 스텝의 사전 `validate`가 설정을 거부함
    #[error("validation failed for step '{step}' in {stage}")]
    Validation {
        stage: Stage,
        step: String,
        #[source]
        source: StepError,
    },

    /// 동기 스텝 실패
    #[error("step '{step}' failed in {stage}")]
    Step {
        stage: Stage,
        step: String,
        #[source]
        source: StepError,
    },

    /// 동시 실행 스텝 실패 (완료를 드레인할 때 드러남)
    #[error("concurrent step '{step}' failed in {stage}")]
    ConcurrentStep {
        stage: Stage,
        step: String,
        #[source]
        source: StepError,
    },

    /// 스테이지 종료 드레인이 동시 실행 스텝 대기를 포기함
    #[error("{in_flight} concurrent step(s) still running in {stage} after {timeout_ms} ms")]
    DrainTimeout {
        stage: Stage,
        in_flight: usize,
        timeout_ms: u64,
    },

    /// 스텝이 남아 있는데 완료 큐가 닫힘
    #[error("completion channel closed with concurrent steps outstanding in {stage}")]
    CompletionChannelClosed { stage: Stage },
}

impl ExecutionError {
    /// 실패가 발생한 스테이지
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation { stage, .. }
            | Self::Step { stage, .. }
            | Self::ConcurrentStep { stage, .. }
            | Self::DrainTimeout { stage, .. }
            | Self::CompletionChannelClosed { stage } => *stage,
        }
    }

    /// 실패한 스텝 (스텝 실패인 경우)
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::Validation { step, .. }
            | Self::Step { step, .. }
            | Self::ConcurrentStep { step, .. } => Some(step),
            Self::DrainTimeout { .. } | Self::CompletionChannelClosed { .. } => None,
        }
    }

    /// 원인 스텝 에러 (있는 경우)
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::Validation { source, .. }
            | Self::Step { source, .. }
            | Self::ConcurrentStep { source, .. } => Some(source),
            Self::DrainTimeout { .. } | Self::CompletionChannelClosed { .. } => None,
        }
    }
}
