//! 시간 구간과 경계 연산자.

use super::timestamp::to_sql_datetime_string;
use chrono::{DateTime, FixedOffset, Offset, SubsecRound, TimeZone};

/// `(start, end, left_closed, right_closed)` 시간 구간.
///
/// 각 경계는 생략할 수 있으며(열린 끝), 닫힌 경계는 `>=`/`<=`,
/// 열린 경계는 `>`/`<` 연산자로 렌더링됩니다.
/// 경계 시각은 호출자의 타임존을 보존한 채 저장되고, 렌더링 시 UTC로 변환됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
    left_closed: bool,
    right_closed: bool,
}

impl Default for TimeInterval {
    /// 양쪽 경계가 없는 `[.., ..)` 구간.
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            left_closed: true,
            right_closed: false,
        }
    }
}

impl TimeInterval {
    pub fn new<Tz: TimeZone>(
        start: Option<DateTime<Tz>>,
        end: Option<DateTime<Tz>>,
        left_closed: bool,
        right_closed: bool,
    ) -> Self {
        Self {
            start: start.map(|ts| fix(&ts)),
            end: end.map(|ts| fix(&ts)),
            left_closed,
            right_closed,
        }
    }

    /// 경계가 없는 구간.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 시작 경계를 설정합니다.
    pub fn starting_at<Tz: TimeZone>(mut self, ts: DateTime<Tz>) -> Self {
        self.start = Some(fix(&ts));
        self
    }

    /// 종료 경계를 설정합니다.
    pub fn ending_at<Tz: TimeZone>(mut self, ts: DateTime<Tz>) -> Self {
        self.end = Some(fix(&ts));
        self
    }

    pub fn with_left_closed(mut self, closed: bool) -> Self {
        self.left_closed = closed;
        self
    }

    pub fn with_right_closed(mut self, closed: bool) -> Self {
        self.right_closed = closed;
        self
    }

    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        self.end
    }

    pub fn is_left_closed(&self) -> bool {
        self.left_closed
    }

    pub fn is_right_closed(&self) -> bool {
        self.right_closed
    }

    /// 시작 경계 비교 연산자.
    pub fn lower_operator(&self) -> &'static str {
        if self.left_closed {
            ">="
        } else {
            ">"
        }
    }

    /// 종료 경계 비교 연산자.
    pub fn upper_operator(&self) -> &'static str {
        if self.right_closed {
            "<="
        } else {
            "<"
        }
    }

    /// 주어진 시각 컬럼에 대한 경계 조건절들을 렌더링합니다.
    ///
    /// 존재하는 경계마다 하나씩, 시작 경계가 먼저 옵니다.
    pub fn predicates(&self, column: &str) -> Vec<String> {
        let mut predicates = Vec::with_capacity(2);
        if let Some(start) = &self.start {
            predicates.push(format!(
                "{} {} '{}'",
                column,
                self.lower_operator(),
                to_sql_datetime_string(start)
            ));
        }
        if let Some(end) = &self.end {
            predicates.push(format!(
                "{} {} '{}'",
                column,
                self.upper_operator(),
                to_sql_datetime_string(end)
            ));
        }
        predicates
    }

    /// 시각이 구간에 포함되는지 확인합니다.
    ///
    /// 경계는 `predicates`가 렌더링하는 것과 같이 초 단위로 잘라 비교합니다.
    pub fn contains<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> bool {
        let after_start = match self.start.map(|start| start.trunc_subsecs(0)) {
            Some(start) if self.left_closed => *ts >= start,
            Some(start) => *ts > start,
            None => true,
        };
        let before_end = match self.end.map(|end| end.trunc_subsecs(0)) {
            Some(end) if self.right_closed => *ts <= end,
            Some(end) => *ts < end,
            None => true,
        };
        after_start && before_end
    }
}

fn fix<Tz: TimeZone>(ts: &DateTime<Tz>) -> DateTime<FixedOffset> {
    ts.with_timezone(&ts.offset().fix())
}
