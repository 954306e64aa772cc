//! 결과 정규화.
//!
//! 시각 컬럼을 UTC로 지역화한 뒤 표시 타임존으로 변환하고,
//! 전체 테이블을 시간 오름차순으로 정렬해 인덱스를 0부터 다시 매깁니다.

use crate::error::{DataError, Result};
use crate::table::{ResultTable, Value};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use market_core::MarketDataConfig;
use std::cmp::Ordering;
use tracing::debug;

/// 결과 테이블 정규화기.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    display_tz: Tz,
    sort_column: String,
}

impl ResultNormalizer {
    /// `sort_column` 기준으로 오름차순 정렬하는 정규화기.
    pub fn new(display_tz: Tz, sort_column: impl Into<String>) -> Self {
        Self {
            display_tz,
            sort_column: sort_column.into(),
        }
    }

    /// 설정의 표시 타임존과 종료 시각 컬럼을 사용합니다.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        Ok(Self::new(config.display_tz()?, config.end_time_column.clone()))
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    /// 테이블을 정규화합니다.
    ///
    /// - 결과에 없는 시각 컬럼은 건너뜁니다.
    /// - 행이 없으면 변환을 생략하고 같은 컬럼의 빈 테이블을 반환합니다.
    /// - NULL 시각은 그대로 두며 정렬 시 맨 뒤로 갑니다.
    /// - 같은 시각의 행들은 기존 순서를 유지합니다.
    ///
    /// 이미 정규화된 테이블에 다시 적용해도 결과가 같습니다.
    pub fn normalize(&self, mut table: ResultTable, time_columns: &[String]) -> Result<ResultTable> {
        if !table.is_empty() {
            for name in time_columns {
                let Some(idx) = table.column_index(name) else {
                    debug!(column = %name, "time column not in result, skipping");
                    continue;
                };
                for row in table.rows_mut().iter_mut() {
                    row[idx] = self.localize(&row[idx], name)?;
                }
            }
        }
        self.sort_ascending(&mut table);
        Ok(table)
    }

    fn localize(&self, value: &Value, column: &str) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(_)
            | Value::TimestampUtc(_)
            | Value::TimestampLocal(_)
            | Value::Text(_) => value
                .as_utc()
                .map(|ts| Value::TimestampLocal(ts.with_timezone(&self.display_tz)))
                .ok_or_else(|| {
                    DataError::InvalidTimestamp(format!(
                        "column {} holds unparseable time {}",
                        column, value
                    ))
                }),
            other => Err(DataError::InvalidTimestamp(format!(
                "column {} holds non-time value {}",
                column, other
            ))),
        }
    }

    fn sort_ascending(&self, table: &mut ResultTable) {
        let keys: Vec<Option<DateTime<Utc>>> = match table.column_index(&self.sort_column) {
            Some(idx) => table.rows().iter().map(|row| row[idx].as_utc()).collect(),
            None => vec![None; table.len()],
        };
        let mut order: Vec<usize> = (0..table.len()).collect();
        order.sort_by(|&a, &b| match (keys[a], keys[b]) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        table.reorder_and_reindex(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn time_columns() -> Vec<String> {
        vec!["start_time".to_string(), "end_time".to_string()]
    }

    fn naive(h: u32, m: u32) -> Value {
        Value::Timestamp(
            Utc.with_ymd_and_hms(2021, 10, 7, h, m, 0)
                .unwrap()
                .naive_utc(),
        )
    }

    fn unsorted() -> ResultTable {
        ResultTable::with_rows(
            ["asset_id", "start_time", "end_time", "close"],
            vec![
                vec![Value::Int(17085), naive(15, 51), naive(15, 52), Value::Float(3.0)],
                vec![Value::Int(17085), naive(15, 49), naive(15, 50), Value::Float(1.0)],
                vec![Value::Int(17085), naive(15, 50), naive(15, 51), Value::Float(2.0)],
            ],
        )
        .unwrap()
    }

    fn normalizer() -> ResultNormalizer {
        ResultNormalizer::new(New_York, "end_time")
    }

    #[test]
    fn test_converts_to_display_timezone_and_sorts() {
        let table = normalizer().normalize(unsorted(), &time_columns()).unwrap();

        assert_eq!(table.index(), &[0, 1, 2]);
        assert_eq!(
            table.column("close").unwrap(),
            vec![&Value::Float(1.0), &Value::Float(2.0), &Value::Float(3.0)]
        );
        let expected = New_York.with_ymd_and_hms(2021, 10, 7, 11, 50, 0).unwrap();
        assert_eq!(table.get(0, 2), Some(&Value::TimestampLocal(expected)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalizer().normalize(unsorted(), &time_columns()).unwrap();
        let twice = normalizer().normalize(once.clone(), &time_columns()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_table_keeps_columns() {
        let empty = ResultTable::new(["asset_id", "start_time", "end_time"]);
        let once = normalizer().normalize(empty.clone(), &time_columns()).unwrap();
        assert_eq!(once.columns(), empty.columns());
        assert!(once.is_empty());

        let twice = normalizer().normalize(once.clone(), &time_columns()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_time_columns_are_skipped() {
        let table = ResultTable::with_rows(
            ["asset_id", "close"],
            vec![vec![Value::Int(2), Value::Float(2.0)], vec![Value::Int(1), Value::Float(1.0)]],
        )
        .unwrap();
        let normalized = normalizer().normalize(table, &time_columns()).unwrap();
        assert_eq!(normalized.get(0, 0), Some(&Value::Int(2)));
        assert_eq!(normalized.index(), &[0, 1]);
    }

    #[test]
    fn test_text_and_null_times() {
        let table = ResultTable::with_rows(
            ["end_time"],
            vec![
                vec![Value::Null],
                vec![Value::from("2021-10-07 15:51:00")],
                vec![Value::from("2021-10-07T11:50:00-04:00")],
            ],
        )
        .unwrap();
        let normalized = normalizer().normalize(table, &time_columns()).unwrap();
        assert_eq!(normalized.get(2, 0), Some(&Value::Null));
        assert_eq!(
            normalized.get(0, 0).and_then(Value::as_utc),
            Some(Utc.with_ymd_and_hms(2021, 10, 7, 15, 50, 0).unwrap())
        );
    }

    #[test]
    fn test_non_time_value_is_rejected() {
        let table = ResultTable::with_rows(["end_time"], vec![vec![Value::Int(5)]]).unwrap();
        let result = normalizer().normalize(table, &time_columns());
        assert!(matches!(result, Err(DataError::InvalidTimestamp(_))));
    }
}
