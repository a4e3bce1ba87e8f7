//! 스텝 레지스트리: 스텝 타입 이름을 팩토리에 매핑
//!
//! 테스트 케이스는 타입(`type = "context-set"`)으로 스텝을 참조합니다.
//! [`StepRegistry`]는 각 [`StepDescriptor`]를 실제 스텝으로, [`TestCase`] 전체를
//! [`TestPlan`]으로 변환합니다.
//!
//! # 사용 예시
//! ```
//! use serde::Deserialize;
//! use stagerun_core::{Context, Stage, Step, StepError, StepRegistry, TestCase};
//!
//! #[derive(Deserialize)]
//! struct Remember {
//!     key: String,
//! }
//!
//! impl Step for Remember {
//!     fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
//!         Ok(())
//!     }
//!
//!     async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
//!         ctx.add(self.key.clone(), true, true)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = StepRegistry::new();
//! registry.register_step::<Remember>("remember").unwrap();
//!
//! let test_case = TestCase::parse(r#"
//! name = "smoke"
//! [[setup]]
//! type = "remember"
//! params = { key = "ready" }
//! "#).unwrap();
//!
//! let plan = registry.resolve(&test_case).unwrap();
//! assert_eq!(plan.steps(Stage::Setup)[0].name(), "remember");
//! ```

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RegistryError, StagerunError};
use crate::plan::{StepInstance, TestPlan};
use crate::stage::Stage;
use crate::step::{DynStep, Step};
use crate::test_case::{StepDescriptor, TestCase};

/// 디스크립터로부터 스텝을 생성하는 팩토리
pub type StepFactory =
    Box<dyn Fn(&StepDescriptor) -> Result<Box<dyn DynStep>, RegistryError> + Send + Sync>;

/// 스텝 타입별 팩토리 저장소
pub struct StepRegistry {
    factories: BTreeMap<String, StepFactory>,
}

impl StepRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// `step_type`으로 `factory`를 등록합니다.
    ///
    /// 이미 등록된 타입이면 에러를 반환합니다.
    pub fn register<F>(
        &mut self,
        step_type: impl Into<String>,
        factory: F,
    ) -> Result<(), StagerunError>
    where
        F: Fn(&StepDescriptor) -> Result<Box<dyn DynStep>, RegistryError> + Send + Sync + 'static,
    {
        let step_type = step_type.into();
        if self.factories.contains_key(&step_type) {
            return Err(RegistryError::AlreadyRegistered { step_type }.into());
        }
        tracing::debug!(step_type = %step_type, "step type registered");
        self.factories.insert(step_type, Box::new(factory));
        Ok(())
    }

    /// 디스크립터의 `params`를 역직렬화해 만드는 스텝을 등록합니다.
    ///
    /// `params`는 항상 테이블이므로 `S`는 맵에서 역직렬화되어야 합니다
    /// (이름 있는 필드를 가진 구조체, 필드가 없어도 됨).
    pub fn register_step<S>(&mut self, step_type: impl Into<String>) -> Result<(), StagerunError>
    where
        S: Step + DeserializeOwned + 'static,
    {
        self.register(step_type, |descriptor: &StepDescriptor| {
            let step: S = serde_json::from_value(Value::Object(descriptor.params.clone()))
                .map_err(|e| RegistryError::InvalidParams {
                    step: descriptor.display_name().to_owned(),
                    reason: e.to_string(),
                })?;
            Ok(Box::new(step) as Box<dyn DynStep>)
        })
    }

    /// `step_type`의 팩토리 제거
    pub fn unregister(&mut self, step_type: &str) -> Result<(), StagerunError> {
        match self.factories.remove(step_type) {
            Some(_) => Ok(()),
            None => Err(RegistryError::UnknownStepType {
                step_type: step_type.to_owned(),
            }
            .into()),
        }
    }

    pub fn contains(&self, step_type: &str) -> bool {
        self.factories.contains_key(step_type)
    }

    /// 등록된 스텝 타입 수
    pub fn count(&self) -> usize {
        self.factories.len()
    }

    /// 등록된 스텝 타입 목록 (정렬됨)
    pub fn list(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// 검증 스텝을 포함해 스텝 하나를 생성합니다.
    pub fn create(&self, descriptor: &StepDescriptor) -> Result<StepInstance, StagerunError> {
        let factory = self.factories.get(&descriptor.step_type).ok_or_else(|| {
            RegistryError::UnknownStepType {
                step_type: descriptor.step_type.clone(),
            }
        })?;

        let mut instance = StepInstance::new(descriptor.display_name(), factory(descriptor)?)
            .with_fail_on_error(descriptor.fail_on_error);
        if descriptor.run_concurrently {
            instance = instance.concurrent();
        }
        for validator in &descriptor.validators {
            instance = instance.with_validator(self.create(validator)?);
        }
        Ok(instance)
    }

    /// `test_case`의 모든 스텝을 생성합니다.
    ///
    /// 타입을 모르거나 params가 거부된 첫 스텝에서 실패하며,
    /// 부분적으로 생성된 플랜은 반환하지 않습니다.
    pub fn resolve(&self, test_case: &TestCase) -> Result<TestPlan, StagerunError> {
        test_case.validate()?;
        let mut plan = TestPlan::new(test_case.name.clone());
        for stage in Stage::ALL {
            for descriptor in test_case.steps(stage) {
                plan.push(stage, self.create(descriptor)?);
            }
        }
        tracing::debug!(
            test = %test_case.name,
            steps = plan.step_count(),
            "test case resolved"
        );
        Ok(plan)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
