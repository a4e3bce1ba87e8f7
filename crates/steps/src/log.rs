//! `log`: 테스트 리포트에 한 줄 기록

use serde::Deserialize;
use stagerun_core::{Context, Step, StepError};

/// [`Log`] 스텝의 리포트 레벨
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// `log`: 와일드카드 치환된 `message`를 `level`로 기록
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Log {
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
}

impl Step for Log {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        Ok(())
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        let message = ctx.substitute_wildcards(&self.message);
        match self.level {
            LogLevel::Info => ctx.log_info(&message),
            LogLevel::Warning => ctx.log_warning(&message),
            LogLevel::Error => ctx.log_error(&message),
        }
        Ok(())
    }
}
