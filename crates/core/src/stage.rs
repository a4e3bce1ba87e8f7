//! 테스트 스테이지

use std::fmt;

use serde::{Deserialize, Serialize};

/// 테스트 케이스의 순서 있는 세 단계 중 하나
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 테스트 대상 시스템 준비
    Setup,
    /// 테스트 본 검증 실행
    Execute,
    /// Setup/Execute 이후 정리
    Teardown,
}

impl Stage {
    /// 실행 순서대로 나열한 모든 스테이지
    pub const ALL: [Stage; 3] = [Stage::Setup, Stage::Execute, Stage::Teardown];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Execute => write!(f, "execute"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}
