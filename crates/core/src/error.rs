//! 에러 타입: 도메인별 에러 정의
//!
//! [`StagerunError`]는 크레이트 최상위 에러이며 각 도메인 에러는 `?`로 변환됩니다.
//! [`StepError`]는 스텝 구현이 반환하는 에러로, 실행기가 스테이지와 스텝 정보를 붙여 감쌉니다.

use std::error::Error as StdError;

/// [`StepError::Failed`]의 원인(source)으로 쓰이는 박스 에러
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// stagerun 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StagerunError {
    /// 설정 로딩/검증 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스텝 등록/해석 에러
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 공유 컨텍스트 접근 에러
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// 테스트 실행 밖에서 발생한 스텝 에러 (예: 생성 중)
    #[error("step error: {0}")]
    Step(#[from] StepError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일 또는 테스트 케이스 파일 없음
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// TOML 파싱 실패
    #[error("failed to parse: {reason}")]
    ParseFailed { reason: String },

    /// 허용되지 않은 필드 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스텝 레지스트리 에러
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// 이미 등록된 스텝 타입
    #[error("step type already registered: {step_type}")]
    AlreadyRegistered { step_type: String },

    /// 등록되지 않은 스텝 타입
    #[error("unknown step type: {step_type}")]
    UnknownStepType { step_type: String },

    /// params로 스텝을 생성할 수 없음
    #[error("invalid params for step '{step}': {reason}")]
    InvalidParams { step: String, reason: String },
}

/// 컨텍스트 에러
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// `update_if_exists` 없이 기존 키에 `add` 시도
    #[error("context key already exists: {key}")]
    KeyExists { key: String },

    /// 저장된 값을 요청한 타입으로 읽을 수 없음
    #[error("context value for '{key}' has unexpected shape: {reason}")]
    Deserialize { key: String, reason: String },
}

/// 스텝의 `validate` 또는 `execute`가 반환하는 에러
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// 사전 설정 검증 실패
    #[error("validation failed: {0}")]
    Validation(String),

    /// 스텝 동작 실패
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 스텝의 컨텍스트 접근 실패
    #[error(transparent)]
    Context(#[from] ContextError),

    /// 워커에서 실행 중 패닉 발생
    #[error("step panicked: {0}")]
    Panicked(String),

    /// 스텝 내부 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// 원인 없이 메시지만 있는 실패
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// 원인 에러를 `source()`로 보존하는 실패
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 검증 실패
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

/// 에러와 그 아래의 모든 `source()`를 바깥쪽부터 문자열로 나열합니다.
pub fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}
