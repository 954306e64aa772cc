//! SQL 쿼리 빌더.
//!
//! 모든 리터럴은 SQL 문자열에 직접 삽입됩니다(플레이스홀더 없음).
//! 입력은 내부에서 검증된 값(파싱된 시각, 닫힌 집합의 자산 ID, 설정 문자열)만
//! 허용되며, 외부 사용자 텍스트를 그대로 넘겨서는 안 됩니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use market_core::{
    to_sql_exact_datetime_string, AssetId, AssetSet, MarketDataConfig, TimeInterval,
};

/// 정렬 요청 시 항상 사용되는 컬럼.
///
/// 범위 조건에 어떤 시각 컬럼을 쓰든 결과는 커밋 시각(`end_time`) 기준
/// 최신순으로 정렬됩니다. 설정된 종료 시각 컬럼 이름과도 무관합니다.
pub const RECENCY_SORT_COLUMN: &str = "end_time";

/// 바 조회 요청 하나를 나타내는 불변 값.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    table: String,
    filter: Option<String>,
    columns: Option<Vec<String>>,
    asset_column: String,
    asset_ids: Vec<AssetId>,
    ts_column: String,
    interval: TimeInterval,
    sort_descending: bool,
    limit: Option<usize>,
}

impl QueryDescriptor {
    /// 전체 컬럼, 경계 없음, 정렬/제한 없음으로 시작합니다.
    pub fn new(
        table: impl Into<String>,
        asset_column: impl Into<String>,
        asset_ids: Vec<AssetId>,
    ) -> Self {
        Self {
            table: table.into(),
            filter: None,
            columns: None,
            asset_column: asset_column.into(),
            asset_ids,
            ts_column: RECENCY_SORT_COLUMN.to_string(),
            interval: TimeInterval::unbounded(),
            sort_descending: false,
            limit: None,
        }
    }

    /// `WHERE` 뒤에 그대로 삽입될 조건절.
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// 조회 컬럼. `None`이면 전체.
    pub fn with_columns(mut self, columns: Option<Vec<String>>) -> Self {
        self.columns = columns;
        self
    }

    /// 시각 컬럼과 구간.
    pub fn with_interval(mut self, ts_column: impl Into<String>, interval: TimeInterval) -> Self {
        self.ts_column = ts_column.into();
        self.interval = interval;
        self
    }

    pub fn sort_descending(mut self, sort: bool) -> Self {
        self.sort_descending = sort;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn asset_ids(&self) -> &[AssetId] {
        &self.asset_ids
    }

    pub fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    pub fn ts_column(&self) -> &str {
        &self.ts_column
    }

    /// SQL 문을 생성합니다.
    ///
    /// ```
    /// use market_core::AssetId;
    /// use market_data::QueryDescriptor;
    ///
    /// let sql = QueryDescriptor::new("bars", "asset_id", vec![AssetId::Int(17085)])
    ///     .with_filter(Some("interval=60 AND region='AM'".to_string()))
    ///     .sort_descending(true)
    ///     .with_limit(Some(1))
    ///     .to_sql()
    ///     .unwrap();
    /// assert_eq!(
    ///     sql,
    ///     "SELECT * FROM bars WHERE interval=60 AND region='AM' AND asset_id=17085 \
    ///      ORDER BY end_time DESC LIMIT 1"
    /// );
    /// ```
    pub fn to_sql(&self) -> Result<String> {
        build_query(self)
    }
}

/// 요청 설명자로부터 SQL 문을 생성합니다.
///
/// # Errors
///
/// - 빈 자산 목록 또는 렌더링할 수 없는 자산 ID: `DataError::InvalidQuery`
/// - 빈 테이블 이름 또는 빈 컬럼 목록: `DataError::InvalidQuery`
pub fn build_query(descriptor: &QueryDescriptor) -> Result<String> {
    if descriptor.table.trim().is_empty() {
        return Err(DataError::InvalidQuery("table name is empty".to_string()));
    }
    let assets = AssetSet::new(descriptor.asset_ids.clone())?;

    let columns = match &descriptor.columns {
        None => "*".to_string(),
        Some(columns) if columns.is_empty() => {
            return Err(DataError::InvalidQuery(
                "column projection is empty".to_string(),
            ))
        }
        Some(columns) => columns.join(","),
    };

    let mut query = vec![format!("SELECT {} FROM {}", columns, descriptor.table)];

    let mut predicates = Vec::new();
    if let Some(filter) = &descriptor.filter {
        predicates.push(filter.clone());
    }
    predicates.push(assets.predicate(&descriptor.asset_column));
    predicates.extend(descriptor.interval.predicates(&descriptor.ts_column));
    query.push(format!("WHERE {}", predicates.join(" AND ")));

    if descriptor.sort_descending {
        query.push(format!("ORDER BY {} DESC", RECENCY_SORT_COLUMN));
    }
    if let Some(limit) = descriptor.limit {
        query.push(format!("LIMIT {}", limit));
    }

    Ok(query.join(" "))
}

/// 바 테이블의 고정 배치 정보 (테이블, 고정 조건절, 컬럼 이름).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarTableLayout {
    pub table: String,
    pub filter: Option<String>,
    pub asset_column: String,
    pub start_column: String,
    pub end_column: String,
}

impl BarTableLayout {
    pub fn from_config(config: &MarketDataConfig) -> Self {
        Self {
            table: config.table_name.clone(),
            filter: config.filter.clone(),
            asset_column: config.asset_id_column.clone(),
            start_column: config.start_time_column.clone(),
            end_column: config.end_time_column.clone(),
        }
    }

    /// 이 테이블에 대한 요청 설명자를 시작합니다.
    pub fn select(&self, asset_ids: Vec<AssetId>) -> QueryDescriptor {
        QueryDescriptor::new(self.table.clone(), self.asset_column.clone(), asset_ids)
            .with_filter(self.filter.clone())
            .with_interval(self.end_column.clone(), TimeInterval::unbounded())
    }

    /// 자산의 최신 시작 시각 조회.
    ///
    /// `SELECT MAX(start_time) FROM bars WHERE interval=60 AND asset_id=17085`
    pub fn latest_start_query(&self, asset: &AssetId) -> Result<String> {
        let asset_predicate = self.asset_predicate(asset)?;
        Ok(format!(
            "SELECT MAX({}) FROM {} WHERE {}",
            self.start_column,
            self.table,
            self.with_filter(asset_predicate)
        ))
    }

    /// 주어진 시작 시각과 짝을 이루는 종료 시각 조회.
    ///
    /// `SELECT end_time FROM bars WHERE interval=60 AND start_time = '...' AND asset_id=17085`
    pub fn paired_end_query(&self, asset: &AssetId, start: &DateTime<Utc>) -> Result<String> {
        let asset_predicate = self.asset_predicate(asset)?;
        let predicate = format!(
            "{} = '{}' AND {}",
            self.start_column,
            to_sql_exact_datetime_string(start),
            asset_predicate
        );
        Ok(format!(
            "SELECT {} FROM {} WHERE {}",
            self.end_column,
            self.table,
            self.with_filter(predicate)
        ))
    }

    fn asset_predicate(&self, asset: &AssetId) -> Result<String> {
        let assets = AssetSet::new(vec![asset.clone()])?;
        Ok(assets.predicate(&self.asset_column))
    }

    fn with_filter(&self, predicate: String) -> String {
        match &self.filter {
            Some(filter) => format!("{} AND {}", filter, predicate),
            None => predicate,
        }
    }
}
