//! 공유 컨텍스트를 읽고 쓰는 스텝
//!
//! params의 문자열 값은 스텝 실행 시 와일드카드 치환을 거치므로,
//! `value = "ORD-%Guid%"`는 실행마다 새 id를 저장합니다.

use serde::Deserialize;
use serde_json::Value;
use stagerun_core::{Context, Step, StepError};

fn require_key(key: &str) -> Result<(), StepError> {
    if key.trim().is_empty() {
        return Err(StepError::validation("key must not be empty"));
    }
    Ok(())
}

fn substitute(ctx: &Context, value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(ctx.substitute_wildcards(text)),
        other => other.clone(),
    }
}

/// `context-set`: `key`에 `value` 저장
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSet {
    pub key: String,
    pub value: Value,
    /// 실패 대신 기존 값 교체
    #[serde(default)]
    pub update: bool,
}

impl Step for ContextSet {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        require_key(&self.key)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        let value = substitute(ctx, &self.value);
        ctx.add(self.key.clone(), value, self.update)?;
        ctx.log_info(&format!("set '{}' = {}", self.key, ctx.get_value(&self.key)));
        Ok(())
    }
}

/// `context-assert`: `key` 값이 `expected`가 아니면 실패
///
/// 문자열 `expected`는 값의 문자열 형태와, 그 외는 저장된 JSON 값과 비교합니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextAssert {
    pub key: String,
    pub expected: Value,
}

impl Step for ContextAssert {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        require_key(&self.key)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        let Some(actual) = ctx.get_object(&self.key) else {
            return Err(StepError::failed(format!("'{}' is not set", self.key)));
        };

        let matches = match substitute(ctx, &self.expected) {
            Value::String(expected) => ctx.get_value(&self.key) == expected,
            expected => actual == expected,
        };
        if !matches {
            return Err(StepError::failed(format!(
                "'{}' is {actual}, expected {}",
                self.key, self.expected
            )));
        }
        ctx.log_info(&format!("'{}' matches", self.key));
        Ok(())
    }
}

/// `context-remove`: `key` 삭제. 키가 없으면 경고만 기록
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextRemove {
    pub key: String,
}

impl Step for ContextRemove {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        require_key(&self.key)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        if ctx.remove(&self.key).is_none() {
            ctx.log_warning(&format!("'{}' was not set", self.key));
        }
        Ok(())
    }
}
