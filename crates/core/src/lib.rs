//! stagerun 코어: 모든 stagerun 크레이트가 공유하는 타입
//!
//! - [`Context`]: 테스트 케이스 1회 실행 동안의 공유 키/값 상태
//! - [`Logger`] / [`LogSink`]: 사람이 읽는 테스트 리포트
//! - [`Step`] / [`DynStep`]: 테스트 스텝이 구현하는 계약
//! - [`StepRegistry`]: 선언적 [`TestCase`]를 [`TestPlan`]으로 해석
//! - [`StagerunConfig`]: 러너 설정
//! - 위 모든 항목의 에러 타입

pub mod config;
pub mod context;
pub mod error;
pub mod logger;
pub mod plan;
pub mod registry;
pub mod stage;
pub mod step;
pub mod test_case;
pub mod wildcard;

// 에러
pub use error::{
    BoxError, ConfigError, ContextError, RegistryError, StagerunError, StepError,
};

// 설정
pub use config::{ExecutorConfig, GeneralConfig, ReportConfig, StagerunConfig};

// 런타임 상태 및 로깅
pub use context::Context;
pub use logger::{ConsoleSink, FileSink, LogSink, Logger, MemorySink};
pub use stage::Stage;

// 스텝 및 플랜
pub use plan::{StepInstance, TestPlan};
pub use registry::{StepFactory, StepRegistry};
pub use step::{BoxFuture, DynStep, Step};
pub use test_case::{StepDescriptor, TestCase};
