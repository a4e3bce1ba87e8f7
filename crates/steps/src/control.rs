//! 흐름 제어 스텝: 대기와 의도적 실패

use std::time::Duration;

use serde::Deserialize;
use stagerun_core::{Context, Step, StepError};

/// 허용되는 최대 `delay` (1시간)
const MAX_DELAY_MS: u64 = 3_600_000;

/// `delay`: `millis` 동안 대기
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delay {
    pub millis: u64,
}

impl Step for Delay {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        if self.millis > MAX_DELAY_MS {
            return Err(StepError::validation(format!(
                "millis must be at most {MAX_DELAY_MS}"
            )));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        ctx.log_info(&format!("waiting {} ms", self.millis));
        tokio::time::sleep(Duration::from_millis(self.millis)).await;
        Ok(())
    }
}

/// `fail`: 항상 `message`로 실패
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fail {
    #[serde(default = "default_fail_message")]
    pub message: String,
}

fn default_fail_message() -> String {
    "step failed on purpose".to_owned()
}

impl Step for Fail {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        Ok(())
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        Err(StepError::failed(ctx.substitute_wildcards(&self.message)))
    }
}
