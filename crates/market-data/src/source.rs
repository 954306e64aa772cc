//! 시장 데이터 소스 capability.
//!
//! 호출자는 `MarketDataSource`를 통해 시간 구간 바 데이터와 최신성 정보를 조회합니다.
//! SQL 기반 구현(`SqlMarketData`)과 인메모리 구현(`InMemoryBarStore`)이 같은
//! capability를 제공합니다.

use crate::error::{DataError, Result};
use crate::executor::QueryExecutor;
use crate::normalize::ResultNormalizer;
use crate::query::{build_query, BarTableLayout};
use crate::table::ResultTable;
use crate::watermark::WatermarkResolver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::{AssetId, MarketDataConfig, TimeInterval};
use tracing::{info, instrument};

/// 바 데이터 조회 요청.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    /// 조회 컬럼. `None`이면 소스 기본값(설정된 projection 또는 전체).
    pub columns: Option<Vec<String>>,
    /// 시간 구간
    pub interval: TimeInterval,
    /// 구간 조건을 적용할 시각 컬럼. `None`이면 종료 시각 컬럼.
    pub ts_column: Option<String>,
    /// 자산 ID 목록 (비어 있으면 안 됨)
    pub asset_ids: Vec<AssetId>,
    /// `end_time` 최신순 정렬 여부
    pub sort_descending: bool,
    /// 최대 행 수
    pub limit: Option<usize>,
    /// 결과 정규화 여부
    pub normalize: bool,
}

impl DataRequest {
    /// 전체 구간, 최신순 정렬, 정규화 적용으로 시작합니다.
    pub fn new(asset_ids: Vec<AssetId>) -> Self {
        Self {
            columns: None,
            interval: TimeInterval::unbounded(),
            ts_column: None,
            asset_ids,
            sort_descending: true,
            limit: None,
            normalize: true,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_interval(mut self, interval: TimeInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_column(mut self, ts_column: impl Into<String>) -> Self {
        self.ts_column = Some(ts_column.into());
        self
    }

    pub fn sort_descending(mut self, sort: bool) -> Self {
        self.sort_descending = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

/// 시장 데이터 소스.
///
/// 모든 호출은 독립적이며, 소스는 결과나 워터마크를 캐시하지 않습니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 요청에 맞는 바 데이터를 조회합니다.
    async fn get_data(&self, request: &DataRequest) -> Result<ResultTable>;

    /// 자산의 최신 커밋 바 종료 시각을 조회합니다.
    async fn latest_end_time(&self, asset: &AssetId) -> Result<DateTime<Utc>>;

    /// 저장소 전체 최신성 확인에 사용할 자산.
    fn reference_asset(&self) -> Option<&AssetId> {
        None
    }

    /// 저장소 전체의 최신 종료 시각.
    ///
    /// 모든 자산의 바가 한 트랜잭션으로 함께 기록된다고 가정하고,
    /// 확인용 자산 하나의 워터마크를 사용합니다.
    async fn latest_store_end_time(&self) -> Result<DateTime<Utc>> {
        let asset = self
            .reference_asset()
            .cloned()
            .ok_or_else(|| DataError::ConfigError("reference_asset_id is not configured".to_string()))?;
        self.latest_end_time(&asset).await
    }

    /// 주어진 시각에 소스가 데이터를 제공해야 하는지 여부.
    ///
    /// 실시간 소스는 항상 온라인입니다.
    fn should_be_online(&self, _wall_clock: DateTime<Utc>) -> bool {
        true
    }
}

/// SQL 저장소 기반 시장 데이터 소스.
pub struct SqlMarketData<E> {
    executor: E,
    layout: BarTableLayout,
    columns: Option<Vec<String>>,
    normalizer: ResultNormalizer,
    watermark: WatermarkResolver,
    reference_asset: Option<AssetId>,
}

impl<E: QueryExecutor> SqlMarketData<E> {
    /// 설정을 검증하고 소스를 생성합니다.
    pub fn new(executor: E, config: &MarketDataConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            executor,
            layout: BarTableLayout::from_config(config),
            columns: config.columns.clone(),
            normalizer: ResultNormalizer::from_config(config)?,
            watermark: WatermarkResolver::from_config(config),
            reference_asset: config.reference_asset_id.clone(),
        })
    }

    pub fn layout(&self) -> &BarTableLayout {
        &self.layout
    }

    /// 요청을 SQL 문으로 변환합니다. I/O는 없습니다.
    pub fn build_request_query(&self, request: &DataRequest) -> Result<String> {
        let ts_column = request
            .ts_column
            .clone()
            .unwrap_or_else(|| self.layout.end_column.clone());
        let descriptor = self
            .layout
            .select(request.asset_ids.clone())
            .with_columns(request.columns.clone().or_else(|| self.columns.clone()))
            .with_interval(ts_column, request.interval)
            .sort_descending(request.sort_descending)
            .with_limit(request.limit);
        build_query(&descriptor)
    }

    fn time_columns(&self) -> Vec<String> {
        vec![self.layout.start_column.clone(), self.layout.end_column.clone()]
    }
}

#[async_trait]
impl<E: QueryExecutor> MarketDataSource for SqlMarketData<E> {
    #[instrument(skip_all, fields(assets = request.asset_ids.len()))]
    async fn get_data(&self, request: &DataRequest) -> Result<ResultTable> {
        let sql = self.build_request_query(request)?;
        info!(query = %sql, "Executing bar query");
        let table = self.executor.execute(&sql).await?;
        if request.normalize {
            self.normalizer.normalize(table, &self.time_columns())
        } else {
            Ok(table)
        }
    }

    async fn latest_end_time(&self, asset: &AssetId) -> Result<DateTime<Utc>> {
        self.watermark.resolve(&self.executor, asset).await
    }

    fn reference_asset(&self) -> Option<&AssetId> {
        self.reference_asset.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedExecutor;
    use crate::table::Value;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn config() -> MarketDataConfig {
        MarketDataConfig {
            filter: Some("interval=60 AND region='AM'".to_string()),
            reference_asset_id: Some(AssetId::Int(17085)),
            ..Default::default()
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, 7, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_data_builds_executes_and_normalizes() {
        let rows = ResultTable::with_rows(
            ["asset_id", "start_time", "end_time"],
            vec![
                vec![Value::Int(17085), Value::from(at(15, 50).naive_utc()), Value::from(at(15, 51).naive_utc())],
                vec![Value::Int(17085), Value::from(at(15, 49).naive_utc()), Value::from(at(15, 50).naive_utc())],
            ],
        );
        let source = SqlMarketData::new(ScriptedExecutor::new(vec![rows]), &config()).unwrap();

        let request = DataRequest::new(vec![AssetId::Int(17085)])
            .with_interval(TimeInterval::unbounded().starting_at(at(15, 0)))
            .with_limit(2);
        let table = source.get_data(&request).await.unwrap();

        assert_eq!(
            source.executor.calls(),
            vec!["SELECT * FROM bars WHERE interval=60 AND region='AM' AND asset_id=17085 \
                  AND end_time >= '2021-10-07 15:00:00' ORDER BY end_time DESC LIMIT 2"
                .to_string()]
        );
        let first_end = New_York.with_ymd_and_hms(2021, 10, 7, 11, 50, 0).unwrap();
        assert_eq!(table.get(0, 2), Some(&Value::TimestampLocal(first_end)));
        assert_eq!(table.index(), &[0, 1]);
    }

    #[tokio::test]
    async fn test_empty_assets_never_executes() {
        let source = SqlMarketData::new(ScriptedExecutor::default(), &config()).unwrap();

        let err = source
            .get_data(&DataRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidQuery(_)));
        assert!(source.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_raw_result_when_normalization_disabled() {
        let rows = ResultTable::with_rows(
            ["end_time"],
            vec![vec![Value::from(at(15, 51).naive_utc())], vec![Value::from(at(15, 50).naive_utc())]],
        )
        .unwrap();
        let source =
            SqlMarketData::new(ScriptedExecutor::new(vec![Ok(rows.clone())]), &config()).unwrap();

        let request = DataRequest::new(vec![AssetId::Int(17085)]).normalize(false);
        assert_eq!(source.get_data(&request).await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_configured_projection_is_default() {
        let config = MarketDataConfig {
            columns: Some(vec!["asset_id".to_string(), "close".to_string()]),
            ..config()
        };
        let source = SqlMarketData::new(ScriptedExecutor::default(), &config).unwrap();

        let sql = source
            .build_request_query(&DataRequest::new(vec![AssetId::Int(1)]))
            .unwrap();
        assert!(sql.starts_with("SELECT asset_id,close FROM bars"));

        let sql = source
            .build_request_query(
                &DataRequest::new(vec![AssetId::Int(1)]).with_columns(vec!["open".to_string()]),
            )
            .unwrap();
        assert!(sql.starts_with("SELECT open FROM bars"));
    }

    #[tokio::test]
    async fn test_store_watermark_uses_configured_asset() {
        let executor = ScriptedExecutor::new(vec![
            ResultTable::with_rows(["max"], vec![vec![Value::TimestampUtc(at(15, 50))]]),
            ResultTable::with_rows(["end_time"], vec![vec![Value::TimestampUtc(at(15, 51))]]),
        ]);
        let source = SqlMarketData::new(executor, &config()).unwrap();

        assert_eq!(source.latest_store_end_time().await.unwrap(), at(15, 51));
        assert!(source.should_be_online(at(3, 0)));
    }

    #[tokio::test]
    async fn test_store_watermark_requires_configuration() {
        let config = MarketDataConfig {
            reference_asset_id: None,
            ..config()
        };
        let source = SqlMarketData::new(ScriptedExecutor::default(), &config).unwrap();
        assert!(matches!(
            source.latest_store_end_time().await,
            Err(DataError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = MarketDataConfig {
            display_timezone: "Nowhere/Special".to_string(),
            ..config()
        };
        assert!(matches!(
            SqlMarketData::new(ScriptedExecutor::default(), &config),
            Err(DataError::ConfigError(_))
        ));
    }
}
