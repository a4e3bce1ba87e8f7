//! 선언적 테스트 케이스
//!
//! [`TestCase`]는 스테이지별 [`StepDescriptor`] 목록입니다. 순수 데이터이며,
//! 스텝은 [`StepRegistry`](crate::registry::StepRegistry)가
//! [`TestPlan`](crate::plan::TestPlan)으로 해석할 때만 생성됩니다.
//!
//! # TOML 형식
//! ```toml
//! name = "order-flow"
//! description = "drops an order and waits for the confirmation"
//!
//! [[setup]]
//! type = "context-set"
//! params = { key = "order_id", value = "ORD-%Guid%" }
//!
//! [[execute]]
//! type = "delay"
//! name = "wait for broker"
//! run_concurrently = true
//! params = { millis = 200 }
//!
//! [[execute.validators]]
//! type = "context-assert"
//! params = { key = "order_id", expected = "ORD-1" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, StagerunError};
use crate::stage::Stage;

fn default_fail_on_error() -> bool {
    true
}

/// 선언된 스텝 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDescriptor {
    /// 스텝 구현의 레지스트리 키
    #[serde(rename = "type")]
    pub step_type: String,
    /// 표시 이름. 없으면 스텝 타입을 사용
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 이후 스텝이 진행되는 동안 워커 풀에서 실행
    #[serde(default)]
    pub run_concurrently: bool,
    /// 이 스텝의 실패가 스테이지를 실패시키는지 여부
    #[serde(default = "default_fail_on_error")]
    pub fail_on_error: bool,
    /// 스텝별 설정. 스텝 팩토리에 전달됨
    #[serde(default)]
    pub params: Map<String, Value>,
    /// 이 스텝 이후 같은 컨텍스트로 실행되는 하위 스텝
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<StepDescriptor>,
}

impl StepDescriptor {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            name: None,
            run_concurrently: false,
            fail_on_error: true,
            params: Map::new(),
            validators: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn concurrent(mut self) -> Self {
        self.run_concurrently = true;
        self
    }

    /// 실패를 기록만 하고 스테이지를 실패시키지 않도록 표시
    pub fn continue_on_error(mut self) -> Self {
        self.fail_on_error = false;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn validator(mut self, validator: StepDescriptor) -> Self {
        self.validators.push(validator);
        self
    }

    /// 로그와 에러에 표시되는 이름
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.step_type)
    }
}

/// 테스트 케이스: 순서 있는 세 개의 스텝 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub setup: Vec<StepDescriptor>,
    #[serde(default)]
    pub execute: Vec<StepDescriptor>,
    #[serde(default)]
    pub teardown: Vec<StepDescriptor>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// TOML 테스트 케이스를 파싱하고 검증합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StagerunError> {
        let test_case: Self = toml::from_str(toml_str).map_err(|e| {
            StagerunError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })?;
        test_case.validate()?;
        Ok(test_case)
    }

    /// TOML 테스트 케이스 파일을 읽고, 파싱하고, 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StagerunError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StagerunError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StagerunError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    pub fn with_step(mut self, stage: Stage, step: StepDescriptor) -> Self {
        self.steps_mut(stage).push(step);
        self
    }

    pub fn steps(&self, stage: Stage) -> &[StepDescriptor] {
        match stage {
            Stage::Setup => &self.setup,
            Stage::Execute => &self.execute,
            Stage::Teardown => &self.teardown,
        }
    }

    fn steps_mut(&mut self, stage: Stage) -> &mut Vec<StepDescriptor> {
        match stage {
            Stage::Setup => &mut self.setup,
            Stage::Execute => &mut self.execute,
            Stage::Teardown => &mut self.teardown,
        }
    }

    /// 모든 스테이지의 최상위 스텝 수
    pub fn step_count(&self) -> usize {
        self.setup.len() + self.execute.len() + self.teardown.len()
    }

    /// 레지스트리 없이 가능한 구조 검사
    pub fn validate(&self) -> Result<(), StagerunError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name".to_owned(),
                reason: "test case name must not be empty".to_owned(),
            }
            .into());
        }

        for stage in Stage::ALL {
            for (index, step) in self.steps(stage).iter().enumerate() {
                validate_descriptor(step, &format!("{stage}[{index}]"), false)?;
            }
        }
        Ok(())
    }
}

fn validate_descriptor(
    step: &StepDescriptor,
    path: &str,
    nested: bool,
) -> Result<(), StagerunError> {
    if step.step_type.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: format!("{path}.type"),
            reason: "step type must not be empty".to_owned(),
        }
        .into());
    }
    if nested && step.run_concurrently {
        return Err(ConfigError::InvalidValue {
            field: format!("{path}.run_concurrently"),
            reason: "validators run as part of their parent step".to_owned(),
        }
        .into());
    }
    for (index, validator) in step.validators.iter().enumerate() {
        validate_descriptor(validator, &format!("{path}.validators[{index}]"), true)?;
    }
    Ok(())
}
