//! 타임스탬프 정규화.
//!
//! 쿼리 리터럴로 삽입되는 모든 시각은 UTC로 변환된 뒤
//! `YYYY-MM-DD HH:MM:SS` 형식으로 렌더링됩니다.
//! 타임존이 없는 입력은 UTC로 간주하지 않고 거부합니다.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// 쿼리 리터럴 형식 (UTC, 초 단위).
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 저장소 값을 그대로 되돌려 비교할 때의 리터럴 형식 (초 미만 보존).
pub const SQL_EXACT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// 타임존 오프셋이 포함된 입력 형식들.
const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%#z",
    "%Y-%m-%dT%H:%M:%S%#z",
];

/// 타임존 없는 입력 형식들 (저장소 값 해석 전용).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// 타임스탬프를 SQL 리터럴 문자열로 렌더링합니다.
///
/// `DateTime<Tz>`는 항상 타임존을 가지므로 이 함수는 실패하지 않습니다.
/// 필요한 경우 UTC로 변환한 뒤 초 단위로 잘라 출력합니다.
///
/// ```
/// use chrono::TimeZone;
/// use chrono_tz::America::New_York;
/// use market_core::to_sql_datetime_string;
///
/// let ts = New_York.with_ymd_and_hms(2021, 10, 7, 11, 50, 0).unwrap();
/// assert_eq!(to_sql_datetime_string(&ts), "2021-10-07 15:50:00");
/// ```
pub fn to_sql_datetime_string<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    ts.with_timezone(&Utc).format(SQL_DATETIME_FORMAT).to_string()
}

/// 초 미만 정밀도를 보존해 SQL 리터럴로 렌더링합니다.
///
/// 범위 경계가 아니라 저장소에서 읽은 값과의 등호 비교에 사용합니다.
/// 초 미만 값이 없으면 `to_sql_datetime_string`과 같은 결과입니다.
pub fn to_sql_exact_datetime_string<Tz: TimeZone>(ts: &DateTime<Tz>) -> String {
    ts.with_timezone(&Utc)
        .format(SQL_EXACT_DATETIME_FORMAT)
        .to_string()
}

/// 타임존이 명시된 타임스탬프 문자열을 파싱합니다.
///
/// RFC 3339(`2021-10-07T11:50:00-04:00`, `...Z`)와 공백 구분 형식을 허용합니다.
///
/// # Errors
///
/// - 타임존이 없는 입력: `CoreError::InvalidTimestamp`
/// - 해석할 수 없는 입력: `CoreError::InvalidTimestamp`
pub fn parse_aware(input: &str) -> CoreResult<DateTime<FixedOffset>> {
    let trimmed = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts);
    }
    for format in AWARE_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
    }

    if parse_naive(trimmed).is_some() {
        return Err(CoreError::InvalidTimestamp(format!(
            "timestamp '{}' has no timezone",
            trimmed
        )));
    }
    Err(CoreError::InvalidTimestamp(format!(
        "cannot parse timestamp '{}'",
        trimmed
    )))
}

/// 저장소에서 읽은 문자열 시각을 UTC 시각으로 변환합니다.
///
/// 저장소는 UTC 기준으로 기록하므로 타임존이 없는 값은 UTC로 지역화하고,
/// 타임존이 있는 값은 UTC로 변환합니다.
pub fn coerce_utc(input: &str) -> CoreResult<DateTime<Utc>> {
    let trimmed = input.trim();
    match parse_aware(trimmed) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => parse_naive(trimmed)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| {
                CoreError::InvalidTimestamp(format!("cannot parse timestamp '{}'", trimmed))
            }),
    }
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}
