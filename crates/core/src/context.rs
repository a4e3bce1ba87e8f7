//! 공유 테스트 상태: 모든 스텝에 전달되는 컨텍스트
//!
//! [`Context`]는 테스트 케이스 1회 실행 동안 유지되는 키/값 맵과 실행 시작 시각,
//! 테스트 이름, 현재 실행 중인 스테이지, [`Logger`]를 가집니다.
//! 맵 접근은 모두 하나의 mutex를 거칩니다.
//!
//! [`Context::clone_for_concurrent_use`]는 동시 실행 스텝에게 맵은 공유하되
//! 자체 로거로 기록하는 컨텍스트를 넘겨줍니다:
//!
//! ```
//! use stagerun_core::{Context, Logger};
//!
//! let ctx = Context::new("order-flow", Logger::buffered());
//! let child = ctx.clone_for_concurrent_use(Logger::buffered());
//! child.add("order_id", "ORD-1", false).unwrap();
//! assert_eq!(ctx.get_value("order_id"), "ORD-1");
//! ```

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ContextError;
use crate::logger::Logger;
use crate::stage::Stage;
use crate::wildcard;

struct SharedState {
    values: Mutex<HashMap<String, Value>>,
    test_name: String,
    started_at: DateTime<Local>,
}

/// 테스트 케이스 1회 실행 동안의 공유 키/값 상태
///
/// `Clone`은 공유 맵과 로거를 모두 유지합니다. 로거를 바꾸려면
/// [`clone_for_concurrent_use`](Self::clone_for_concurrent_use)를 사용하세요.
#[derive(Clone)]
pub struct Context {
    shared: Arc<SharedState>,
    logger: Logger,
    stage: Option<Stage>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("test_name", &self.shared.test_name)
            .field("started_at", &self.shared.started_at)
            .field("stage", &self.stage)
            .field("keys", &self.len())
            .field("logger", &self.logger)
            .finish()
    }
}

impl Context {
    /// 현재 시각으로 새 실행용 컨텍스트를 생성합니다.
    pub fn new(test_name: impl Into<String>, logger: Logger) -> Self {
        Self {
            shared: Arc::new(SharedState {
                values: Mutex::new(HashMap::new()),
                test_name: test_name.into(),
                started_at: Local::now(),
            }),
            logger,
            stage: None,
        }
    }

    /// 맵, 이름, 시작 시각을 공유하고 `logger`에 연결된 새 컨텍스트
    pub fn clone_for_concurrent_use(&self, logger: Logger) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            logger,
            stage: self.stage,
        }
    }

    /// 두 컨텍스트가 같은 맵을 읽고 쓰는지 여부
    pub fn shares_state_with(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn test_name(&self) -> &str {
        &self.shared.test_name
    }

    pub fn start_time(&self) -> DateTime<Local> {
        self.shared.started_at
    }

    /// 실행 중인 스테이지. 첫 스테이지 시작 전에는 `None`
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = Some(stage);
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.shared
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Map access ──────────────────────────────────────────────────

    /// `key`에 `value`를 저장합니다.
    ///
    /// `key`가 이미 있고 `update_if_exists`가 false이면
    /// [`ContextError::KeyExists`]를 반환합니다.
    pub fn add(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
        update_if_exists: bool,
    ) -> Result<(), ContextError> {
        let key = key.into();
        let mut values = self.values();
        if !update_if_exists && values.contains_key(&key) {
            return Err(ContextError::KeyExists { key });
        }
        tracing::trace!(key = %key, "context value stored");
        values.insert(key, value.into());
        Ok(())
    }

    /// `key` 값의 문자열 형태. 없으면 빈 문자열
    ///
    /// JSON 문자열은 따옴표 없이, `null`은 빈 문자열로 반환되며
    /// 그 외 값은 JSON으로 렌더링됩니다.
    pub fn get_value(&self, key: &str) -> String {
        match self.values().get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// `key`의 값. 없으면 `None`
    pub fn get_object(&self, key: &str) -> Option<Value> {
        self.values().get(key).cloned()
    }

    /// `key`의 값을 `T`로 읽어옵니다. 없으면 `Ok(None)`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        let Some(value) = self.get_object(key) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ContextError::Deserialize {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    /// `key`를 제거하고, 있었다면 그 값을 반환합니다.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// 모든 키 (정렬됨)
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values().keys().cloned().collect();
        keys.sort();
        keys
    }

    // ─── Text helpers ────────────────────────────────────────────────

    /// `text`의 와일드카드 토큰을 치환합니다. [`crate::wildcard`] 참고
    pub fn substitute_wildcards(&self, text: &str) -> String {
        wildcard::substitute(text, self.shared.started_at)
    }

    pub fn log_info(&self, message: &str) {
        self.logger.info(message);
    }

    pub fn log_warning(&self, message: &str) {
        self.logger.warning(message);
    }

    pub fn log_error(&self, message: &str) {
        self.logger.error(message);
    }

    pub fn log_data(&self, description: &str, data: &str) {
        self.logger.data(description, data);
    }

    pub fn log_error_chain(&self, err: &(dyn StdError + 'static)) {
        self.logger.error_chain(err);
    }
}
