//! stagerun 내장 스텝
//!
//! 플러그인 크레이트 없이 테스트 케이스를 작성할 수 있게 하는 범용 스텝:
//!
//! | 타입             | Params                                  |
//! |------------------|-----------------------------------------|
//! | `context-set`    | `key`, `value`, `update` (false)        |
//! | `context-assert` | `key`, `expected`                       |
//! | `context-remove` | `key`                                   |
//! | `log`            | `message`, `level` (info/warning/error) |
//! | `delay`          | `millis`                                |
//! | `fail`           | `message`                               |
//!
//! [`register_builtin_steps`]는 이 스텝들을 모두 [`StepRegistry`]에 등록합니다.

pub mod context;
pub mod control;
pub mod log;

use stagerun_core::{StagerunError, StepRegistry};

pub use context::{ContextAssert, ContextRemove, ContextSet};
pub use control::{Delay, Fail};
pub use log::{Log, LogLevel};

/// 모든 내장 스텝을 타입 이름으로 등록
pub fn register_builtin_steps(registry: &mut StepRegistry) -> Result<(), StagerunError> {
    registry.register_step::<ContextSet>("context-set")?;
    registry.register_step::<ContextAssert>("context-assert")?;
    registry.register_step::<ContextRemove>("context-remove")?;
    registry.register_step::<Log>("log")?;
    registry.register_step::<Delay>("delay")?;
    registry.register_step::<Fail>("fail")?;
    tracing::debug!(count = registry.count(), "built-in steps registered");
    Ok(())
}

/// 내장 스텝만 가진 레지스트리
pub fn builtin_registry() -> Result<StepRegistry, StagerunError> {
    let mut registry = StepRegistry::new();
    register_builtin_steps(&mut registry)?;
    Ok(registry)
}
