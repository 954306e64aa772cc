//! 조회 결과 테이블.
//!
//! 실행 협력자가 반환하는 행 집합을 저장소 스키마와 무관하게 담는 구조입니다.
//! 컬럼 이름은 저장소 스키마를 그대로 따르며, 각 행은 밀집된 0부터 시작하는
//! 인덱스를 가집니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use market_core::coerce_utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::fmt;

/// 단일 셀 값.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    /// 날짜
    Date(NaiveDate),
    /// 타임존 없는 저장소 시각 (UTC 기준)
    Timestamp(NaiveDateTime),
    /// UTC 시각
    TimestampUtc(DateTime<Utc>),
    /// 표시 타임존으로 변환된 시각
    TimestampLocal(DateTime<Tz>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 시각 값을 UTC로 해석합니다.
    ///
    /// 타임존 없는 값은 UTC로 간주합니다. 시각이 아닌 값은 `None`.
    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(naive) => Some(Utc.from_utc_datetime(naive)),
            Value::TimestampUtc(ts) => Some(*ts),
            Value::TimestampLocal(ts) => Some(ts.with_timezone(&Utc)),
            Value::Text(text) => coerce_utc(text).ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => json!(v),
            Value::Int(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Decimal(v) => json!(v.to_string()),
            Value::Text(v) => json!(v),
            Value::Date(_)
            | Value::Timestamp(_) | Value::TimestampUtc(_) | Value::TimestampLocal(_) => {
                json!(self.to_string())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::TimestampUtc(v) => write!(f, "{}", v.to_rfc3339()),
            Value::TimestampLocal(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampUtc(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

/// 컬럼 이름과 행으로 구성된 결과 테이블.
///
/// 정규화 이후 호출자가 소유권을 가지며 공유되지 않습니다.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    index: Vec<usize>,
    rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// 빈 테이블을 생성합니다.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// 행을 포함한 테이블을 생성합니다. 인덱스는 저장 순서대로 매겨집니다.
    pub fn with_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// 행을 추가합니다.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DataError::Execution(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.index.push(self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// 행 인덱스.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(행 수, 컬럼 수)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// 이름으로 컬럼 값들을 조회합니다.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    /// 행 순서를 바꾸고 인덱스를 0부터 다시 매깁니다. 이전 인덱스는 버립니다.
    pub(crate) fn reorder_and_reindex(&mut self, order: Vec<usize>) {
        let mut taken: Vec<Option<Vec<Value>>> =
            std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        self.rows = order
            .into_iter()
            .filter_map(|i| taken.get_mut(i).and_then(Option::take))
            .collect();
        self.index = (0..self.rows.len()).collect();
    }

    /// 행들을 JSON 객체 배열로 변환합니다.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t{}", self.columns.join("\t"))?;
        for (idx, row) in self.index.iter().zip(&self.rows) {
            let cells = row.iter().map(ToString::to_string).collect::<Vec<_>>();
            writeln!(f, "{}\t{}", idx, cells.join("\t"))?;
        }
        Ok(())
    }
}
