//! 스텝 계약: 모든 테스트 스텝이 구현하는 두 가지 동작
//!
//! [`Step`]은 스텝 작성자가 구현하는 trait입니다. `impl Future`를 반환하므로
//! dyn 호환이 아닙니다. [`DynStep`]은 실행기가 보관하는 `BoxFuture` 버전이며,
//! 모든 `Step`에 자동으로 구현됩니다.
//!
//! # 생명주기
//! ```text
//! 모든 스테이지의 모든 스텝 validate() → 스테이지 순서대로 execute()
//! ```
//!
//! # 사용 예시
//! ```
//! use stagerun_core::{Context, Step, StepError};
//!
//! struct RequireKey(&'static str);
//!
//! impl Step for RequireKey {
//!     fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
//!         Ok(())
//!     }
//!
//!     async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
//!         if ctx.contains_key(self.0) {
//!             Ok(())
//!         } else {
//!             Err(StepError::failed(format!("missing '{}'", self.0)))
//!         }
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::Context;
use crate::error::StepError;

/// [`DynStep`] 메서드가 반환하는 박스 Future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 테스트 로직의 단위
pub trait Step: Send + Sync {
    /// 사전 설정 검증
    ///
    /// 어떤 스텝도 실행되기 전에 선언된 모든 스텝에 대해 호출됩니다.
    /// 테스트 대상 시스템에 접근하면 안 됩니다.
    fn validate(&self, ctx: &Context) -> Result<(), StepError>;

    /// 스텝 동작 수행. 실패는 `Err` 반환으로 알립니다.
    fn execute(&self, ctx: &Context) -> impl Future<Output = Result<(), StepError>> + Send;
}

/// dyn 호환 스텝
///
/// 실행기가 서로 다른 스텝을 `Box<dyn DynStep>`으로 보관할 수 있게 합니다.
pub trait DynStep: Send + Sync {
    fn validate(&self, ctx: &Context) -> Result<(), StepError>;

    fn execute<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<(), StepError>>;
}

impl<T: Step> DynStep for T {
    fn validate(&self, ctx: &Context) -> Result<(), StepError> {
        Step::validate(self, ctx)
    }

    fn execute<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<(), StepError>> {
        Box::pin(Step::execute(self, ctx))
    }
}
