//! 설정 관리: stagerun.toml 파싱 및 환경변수 오버라이드
//!
//! [`StagerunConfig`]는 러너와 실행기가 읽는 모든 섹션을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STAGERUN_EXECUTOR_DRAIN_TIMEOUT_MS=5000` 형식)
//! 3. 설정 파일 (`stagerun.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), stagerun_core::error::StagerunError> {
//! use stagerun_core::config::StagerunConfig;
//!
//! // 파일 + 환경변수 오버라이드
//! let config = StagerunConfig::load("stagerun.toml").await?;
//!
//! // 문자열에서 직접 파싱
//! let config = StagerunConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StagerunError};

/// stagerun 최상위 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagerunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl StagerunConfig {
    /// TOML 파일을 읽고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StagerunError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 환경변수 오버라이드 없이 TOML 파일만 로드합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StagerunError> {
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
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StagerunError> {
        toml::from_str(toml_str).map_err(|e| {
            StagerunError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// `STAGERUN_{SECTION}_{FIELD}` 환경변수로 필드를 덮어씁니다.
    pub fn apply_env_overrides(&mut self) {
        // 일반
        override_string(&mut self.general.log_level, "STAGERUN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STAGERUN_GENERAL_LOG_FORMAT");

        // 실행기
        override_u64(
            &mut self.executor.drain_timeout_ms,
            "STAGERUN_EXECUTOR_DRAIN_TIMEOUT_MS",
        );
        override_bool(
            &mut self.executor.validate_before_run,
            "STAGERUN_EXECUTOR_VALIDATE_BEFORE_RUN",
        );

        // 리포트
        override_string(&mut self.report.output, "STAGERUN_REPORT_OUTPUT");
        override_string(&mut self.report.path, "STAGERUN_REPORT_PATH");
    }

    /// 모든 필드가 허용된 값인지 검증합니다.
    pub fn validate(&self) -> Result<(), StagerunError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        let valid_outputs = ["console", "file", "none"];
        if !valid_outputs.contains(&self.report.output.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "report.output".to_owned(),
                reason: format!("must be one of: {}", valid_outputs.join(", ")),
            }
            .into());
        }

        if self.report.output == "file" && self.report.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "report.path".to_owned(),
                reason: "path must not be empty when output is 'file'".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 운영 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 운영 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 스테이지 실행기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// 스테이지 종료 시 드레인 대기 상한 (밀리초). 0이면 무기한 대기
    pub drain_timeout_ms: u64,
    /// 첫 스테이지 시작 전에 모든 스텝의 `validate` 실행
    pub validate_before_run: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 0,
            validate_before_run: true,
        }
    }
}

impl ExecutorConfig {
    /// 스테이지 종료 드레인 상한. 무제한이면 `None`
    pub fn drain_timeout(&self) -> Option<Duration> {
        (self.drain_timeout_ms > 0).then(|| Duration::from_millis(self.drain_timeout_ms))
    }
}

/// 테스트 리포트 출력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 사람이 읽는 리포트의 출력 대상 (console, file, none)
    pub output: String,
    /// 리포트 파일 경로 (`output = "file"`일 때 사용)
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: "console".to_owned(),
            path: "stagerun-report.log".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
