//! 해석된 테스트 플랜: 스테이지별로 묶인 실행 준비된 스텝 인스턴스

use std::fmt;
use std::sync::Arc;

use crate::stage::Stage;
use crate::step::DynStep;

/// 스텝 객체와 선언 시 지정된 스케줄링 플래그
pub struct StepInstance {
    name: String,
    step: Box<dyn DynStep>,
    run_concurrently: bool,
    fail_on_error: bool,
    validators: Vec<StepInstance>,
}

impl fmt::Debug for StepInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepInstance")
            .field("name", &self.name)
            .field("run_concurrently", &self.run_concurrently)
            .field("fail_on_error", &self.fail_on_error)
            .field("validators", &self.validators)
            .finish_non_exhaustive()
    }
}

impl StepInstance {
    /// 에러 시 스테이지를 실패시키는 동기 스텝
    pub fn new(name: impl Into<String>, step: Box<dyn DynStep>) -> Self {
        Self {
            name: name.into(),
            step,
            run_concurrently: false,
            fail_on_error: true,
            validators: Vec::new(),
        }
    }

    pub fn concurrent(mut self) -> Self {
        self.run_concurrently = true;
        self
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn with_validator(mut self, validator: StepInstance) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> &dyn DynStep {
        self.step.as_ref()
    }

    pub fn run_concurrently(&self) -> bool {
        self.run_concurrently
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// 스텝 자체 실행 후 순서대로 실행되는 중첩 검증 스텝
    pub fn validators(&self) -> &[StepInstance] {
        &self.validators
    }
}

/// 순서 있는 세 개의 스텝 목록
///
/// 스텝은 `Arc`로 보관되어, 플랜을 유지한 채 동시 실행 스텝을 워커로 옮길 수 있습니다.
#[derive(Debug, Default)]
pub struct TestPlan {
    name: String,
    setup: Vec<Arc<StepInstance>>,
    execute: Vec<Arc<StepInstance>>,
    teardown: Vec<Arc<StepInstance>>,
}

impl TestPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// [`push`](Self::push)의 빌더 형태
    pub fn with_step(mut self, stage: Stage, step: StepInstance) -> Self {
        self.push(stage, step);
        self
    }

    /// `stage` 끝에 `step` 추가
    pub fn push(&mut self, stage: Stage, step: StepInstance) {
        let list = match stage {
            Stage::Setup => &mut self.setup,
            Stage::Execute => &mut self.execute,
            Stage::Teardown => &mut self.teardown,
        };
        list.push(Arc::new(step));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self, stage: Stage) -> &[Arc<StepInstance>] {
        match stage {
            Stage::Setup => &self.setup,
            Stage::Execute => &self.execute,
            Stage::Teardown => &self.teardown,
        }
    }

    /// 모든 스테이지의 최상위 스텝 수
    pub fn step_count(&self) -> usize {
        self.setup.len() + self.execute.len() + self.teardown.len()
    }
}
