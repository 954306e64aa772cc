//! PostgreSQL(TimescaleDB) 실행 협력자.
//!
//! 요청마다 풀에서 연결 하나를 획득하고, 반환 경로(오류 포함)와 무관하게
//! 연결이 drop될 때 풀로 돌려보냅니다. 재시도와 타임아웃은 풀 설정에 맡깁니다.

use crate::error::{DataError, Result};
use crate::executor::QueryExecutor;
use crate::table::{ResultTable, Value};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use market_core::DatabaseConfig;
use rust_decimal::Decimal;
use sqlx::postgres::types::{PgInterval, PgTimeTz};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 첫 쿼리 시점까지 연결을 미루는 풀을 생성합니다.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_lazy(&config.url)
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// 기존 연결 풀에서 Database 인스턴스를 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

#[async_trait]
impl QueryExecutor for Database {
    #[instrument(skip_all)]
    async fn execute(&self, sql: &str) -> Result<ResultTable> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<PgRow> = sqlx::query(sql).fetch_all(&mut *conn).await?;

        // 결과가 비어 있으면 컬럼 정보를 얻기 위해 문장을 describe 합니다.
        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => (&mut *conn)
                .describe(sql)
                .await?
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };

        let mut table = ResultTable::new(columns);
        for row in &rows {
            table.push_row(decode_row(row)?)?;
        }

        debug!(rows = table.len(), columns = table.columns().len(), "Query returned");
        Ok(table)
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>> {
    row.columns()
        .iter()
        .map(|column| {
            let kind = CellKind::from_type_name(column.type_info().name());
            decode_cell(row, column.ordinal(), kind)
        })
        .collect()
}

/// PostgreSQL 타입 이름별 디코딩 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    Json,
    /// 그 외 타입: 원시 바이트를 텍스트로 보존
    Raw,
}

impl CellKind {
    fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Self::Text,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMETZ" => Self::TimeTz,
            "TIMESTAMP" => Self::Timestamp,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "INTERVAL" => Self::Interval,
            "UUID" => Self::Uuid,
            "JSON" | "JSONB" => Self::Json,
            _ => Self::Raw,
        }
    }
}

fn decode_cell(row: &PgRow, idx: usize, kind: CellKind) -> Result<Value> {
    let value = match kind {
        CellKind::Bool => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        CellKind::Int2 => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| Value::Int(v.into())),
        CellKind::Int4 => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| Value::Int(v.into())),
        CellKind::Int8 => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        CellKind::Float4 => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::Float(v.into())),
        CellKind::Float8 => row.try_get::<Option<f64>, _>(idx)?.map(Value::Float),
        CellKind::Numeric => row.try_get::<Option<Decimal>, _>(idx)?.map(Value::Decimal),
        CellKind::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::Text),
        CellKind::Date => row.try_get::<Option<NaiveDate>, _>(idx)?.map(Value::Date),
        CellKind::Time => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|v| Value::Text(v.to_string())),
        CellKind::TimeTz => row
            .try_get::<Option<PgTimeTz<NaiveTime, FixedOffset>>, _>(idx)?
            .map(|v| Value::Text(format!("{}{}", v.time, v.offset))),
        CellKind::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(Value::Timestamp),
        CellKind::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(Value::TimestampUtc),
        CellKind::Interval => row
            .try_get::<Option<PgInterval>, _>(idx)?
            .map(|v| Value::Text(format_interval(&v))),
        CellKind::Uuid => row
            .try_get::<Option<Uuid>, _>(idx)?
            .map(|v| Value::Text(v.to_string())),
        CellKind::Json => row
            .try_get::<Option<JsonValue>, _>(idx)?
            .map(|v| Value::Text(v.to_string())),
        CellKind::Raw => decode_raw(row, idx)?,
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decode_raw(row: &PgRow, idx: usize) -> Result<Option<Value>> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_string();
    let bytes = raw
        .as_bytes()
        .map_err(|e| DataError::Execution(format!("column {}: {}", idx, e)))?;
    debug!(column = idx, pg_type = %type_name, "Decoding unsupported column as text");
    Ok(Some(Value::Text(raw_text(bytes))))
}

/// UTF-8이면 그대로, 아니면 `\x` 접두 16진수 문자열.
fn raw_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("\\x{}", hex)
        }
    }
}

fn format_interval(interval: &PgInterval) -> String {
    format!(
        "{} mons {} days {} us",
        interval.months, interval.days, interval.microseconds
    )
}
