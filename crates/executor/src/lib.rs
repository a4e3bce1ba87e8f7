//! stagerun 실행기: 해석된 [`TestPlan`](stagerun_core::TestPlan)을
//! Setup, Execute, Teardown 순서로 실행
//!
//! `run_concurrently` 스텝은 [`ConcurrentStepWrapper`]로 감싸 tokio 런타임에 넘기고,
//! [`CompletionCoordinator`]가 매 스텝 후 결과를 드레인하며 스테이지 끝에서 모두 기다립니다.
//!
//! # 사용 예시
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//! use stagerun_core::{Context, ExecutorConfig, Logger, MemorySink, Stage, Step, StepError, StepInstance, TestPlan};
//! use stagerun_executor::StageExecutor;
//!
//! struct Hello;
//!
//! impl Step for Hello {
//!     fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
//!         Ok(())
//!     }
//!
//!     async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
//!         ctx.log_info("hello");
//!         Ok(())
//!     }
//! }
//!
//! let plan = TestPlan::new("hello").with_step(Stage::Execute, StepInstance::new("hello", Box::new(Hello)));
//! let sink = MemorySink::new();
//! let mut executor = StageExecutor::with_logger(plan, Logger::direct(Arc::new(sink.clone())), ExecutorConfig::default());
//! executor.run_test().await.unwrap();
//! assert!(sink.contents().contains("Info: hello"));
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod executor;
mod run;
pub mod wrapper;

pub use coordinator::CompletionCoordinator;
pub use error::ExecutionError;
pub use executor::{StageExecutor, TestState};
pub use wrapper::ConcurrentStepWrapper;
