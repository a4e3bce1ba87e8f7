//! 스텝 설정 문자열의 와일드카드 치환
//!
//! | 토큰                 | 치환 값                                 |
//! |----------------------|-----------------------------------------|
//! | `%DateTime%`         | 현재 로컬 시각, `ddMMyyyyHHmmss`        |
//! | `%DateTimeISO8601%`  | 현재 로컬 시각, RFC 3339                |
//! | `%Guid%`             | 새 UUID v4 (등장할 때마다 다른 값)      |
//! | `%ServerName%`       | 실행 중인 머신의 호스트 이름            |
//! | `%TestStartTime%`    | 테스트 시작 시각, RFC 3339              |

use chrono::{DateTime, Local, SecondsFormat};
use uuid::Uuid;

pub const DATE_TIME: &str = "%DateTime%";
pub const DATE_TIME_ISO8601: &str = "%DateTimeISO8601%";
pub const GUID: &str = "%Guid%";
pub const SERVER_NAME: &str = "%ServerName%";
pub const TEST_START_TIME: &str = "%TestStartTime%";

/// `text`의 알려진 토큰을 모두 치환합니다. 알 수 없는 `%...%`는 그대로 둡니다.
pub fn substitute(text: &str, test_start: DateTime<Local>) -> String {
    if !text.contains('%') {
        return text.to_owned();
    }

    let now = Local::now();
    let mut out = text
        .replace(DATE_TIME_ISO8601, &now.to_rfc3339_opts(SecondsFormat::Millis, false))
        .replace(DATE_TIME, &now.format("%d%m%Y%H%M%S").to_string())
        .replace(
            TEST_START_TIME,
            &test_start.to_rfc3339_opts(SecondsFormat::Millis, false),
        );

    if out.contains(SERVER_NAME) {
        out = out.replace(SERVER_NAME, &host_name());
    }
    while out.contains(GUID) {
        out = out.replacen(GUID, &Uuid::new_v4().to_string(), 1);
    }
    out
}

/// 이 머신의 호스트 이름. 알 수 없으면 `localhost`
pub fn host_name() -> String {
    let name = gethostname::gethostname();
    let name = name.to_string_lossy();
    let name = name.trim();
    if name.is_empty() {
        "localhost".to_owned()
    } else {
        name.to_owned()
    }
}
