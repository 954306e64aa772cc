//! 인메모리 바 저장소.
//!
//! SQL 소스와 같은 필터링, 경계 개폐, 정렬, 제한, projection, 정규화,
//! 바 길이 일관성 검사를 제공합니다. 고정 차원 조건절(`filter`)은 해석하지 않으며,
//! 저장소 하나가 하나의 차원 조합만 담는다고 가정합니다.

use crate::error::{DataError, Inconsistency, Result};
use crate::normalize::ResultNormalizer;
use crate::query::BarTableLayout;
use crate::source::{DataRequest, MarketDataSource};
use crate::table::{ResultTable, Value};
use crate::watermark::check_bar_interval;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use market_core::{AssetId, AssetSet, MarketDataConfig};
use tokio::sync::RwLock;
use tracing::debug;

/// 저장된 바 한 행.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub asset_id: AssetId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 값 컬럼들. 저장소의 `value_columns` 순서를 따릅니다.
    pub values: Vec<Value>,
}

impl Bar {
    /// `end_time = start_time + bar_interval`인 바를 생성합니다.
    pub fn new(
        asset_id: AssetId,
        start_time: DateTime<Utc>,
        bar_interval: Duration,
        values: Vec<Value>,
    ) -> Self {
        Self {
            asset_id,
            start_time,
            end_time: start_time + bar_interval,
            values,
        }
    }
}

/// 추가 전용 인메모리 바 저장소.
pub struct InMemoryBarStore {
    layout: BarTableLayout,
    value_columns: Vec<String>,
    default_columns: Option<Vec<String>>,
    bar_interval: Duration,
    normalizer: ResultNormalizer,
    reference_asset: Option<AssetId>,
    bars: RwLock<Vec<Bar>>,
}

impl InMemoryBarStore {
    pub fn new(config: &MarketDataConfig, value_columns: Vec<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout: BarTableLayout::from_config(config),
            value_columns,
            default_columns: config.columns.clone(),
            bar_interval: config.bar_interval(),
            normalizer: ResultNormalizer::from_config(config)?,
            reference_asset: config.reference_asset_id.clone(),
            bars: RwLock::new(Vec::new()),
        })
    }

    pub fn bar_interval(&self) -> Duration {
        self.bar_interval
    }

    /// 바를 추가합니다. 바 길이는 검사하지 않습니다(쓰기 측 오류를 재현할 수 있도록).
    pub async fn append(&self, bar: Bar) -> Result<()> {
        if bar.values.len() != self.value_columns.len() {
            return Err(DataError::InvalidQuery(format!(
                "bar has {} values but store has {} value columns",
                bar.values.len(),
                self.value_columns.len()
            )));
        }
        self.bars.write().await.push(bar);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.bars.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bars.read().await.is_empty()
    }

    /// 저장소의 전체 컬럼: 자산, 시작, 종료, 값 컬럼 순.
    pub fn all_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.layout.asset_column.clone(),
            self.layout.start_column.clone(),
            self.layout.end_column.clone(),
        ];
        columns.extend(self.value_columns.iter().cloned());
        columns
    }

    fn cell(&self, bar: &Bar, column_idx: usize) -> Value {
        match column_idx {
            0 => match &bar.asset_id {
                AssetId::Int(id) => Value::Int(*id),
                AssetId::Text(id) => Value::Text(id.clone()),
            },
            1 => Value::TimestampUtc(bar.start_time),
            2 => Value::TimestampUtc(bar.end_time),
            n => bar.values[n - 3].clone(),
        }
    }

    fn projection(&self, requested: Option<&Vec<String>>) -> Result<(Vec<String>, Vec<usize>)> {
        let all = self.all_columns();
        let names = match requested.or(self.default_columns.as_ref()) {
            None => all.clone(),
            Some(names) if names.is_empty() => {
                return Err(DataError::InvalidQuery(
                    "column projection is empty".to_string(),
                ))
            }
            Some(names) => names.clone(),
        };
        let positions = names
            .iter()
            .map(|name| {
                all.iter()
                    .position(|c| c == name)
                    .ok_or_else(|| DataError::InvalidQuery(format!("unknown column {}", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((names, positions))
    }
}

#[async_trait]
impl MarketDataSource for InMemoryBarStore {
    async fn get_data(&self, request: &DataRequest) -> Result<ResultTable> {
        let assets = AssetSet::new(request.asset_ids.clone())?;
        let ts_column = request
            .ts_column
            .as_deref()
            .unwrap_or(self.layout.end_column.as_str());
        let use_start = if ts_column == self.layout.start_column {
            true
        } else if ts_column == self.layout.end_column {
            false
        } else {
            return Err(DataError::InvalidQuery(format!(
                "unknown time column {}",
                ts_column
            )));
        };
        let (names, positions) = self.projection(request.columns.as_ref())?;

        let bars = self.bars.read().await;
        let mut matched: Vec<&Bar> = bars
            .iter()
            .filter(|bar| assets.contains(&bar.asset_id))
            .filter(|bar| {
                let ts = if use_start { bar.start_time } else { bar.end_time };
                request.interval.contains(&ts)
            })
            .collect();
        if request.sort_descending {
            matched.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        }
        if let Some(limit) = request.limit {
            matched.truncate(limit);
        }

        let mut table = ResultTable::new(names);
        for bar in matched {
            table.push_row(positions.iter().map(|&idx| self.cell(bar, idx)).collect())?;
        }
        drop(bars);
        debug!(rows = table.len(), "In-memory query returned");

        if request.normalize {
            let time_columns = vec![
                self.layout.start_column.clone(),
                self.layout.end_column.clone(),
            ];
            self.normalizer.normalize(table, &time_columns)
        } else {
            Ok(table)
        }
    }

    async fn latest_end_time(&self, asset: &AssetId) -> Result<DateTime<Utc>> {
        let bars = self.bars.read().await;
        let start = bars
            .iter()
            .filter(|bar| &bar.asset_id == asset)
            .map(|bar| bar.start_time)
            .max()
            .ok_or_else(|| Inconsistency::NoBars(asset.to_string()))?;
        let ends: Vec<DateTime<Utc>> = bars
            .iter()
            .filter(|bar| &bar.asset_id == asset && bar.start_time == start)
            .map(|bar| bar.end_time)
            .collect();
        match ends.as_slice() {
            [end] => check_bar_interval(start, *end, self.bar_interval),
            _ => Err(Inconsistency::PairedEndShape {
                rows: ends.len(),
                columns: 1,
            }
            .into()),
        }
    }

    fn reference_asset(&self) -> Option<&AssetId> {
        self.reference_asset.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use market_core::TimeInterval;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, 7, h, m, 0).unwrap()
    }

    async fn store() -> InMemoryBarStore {
        let store = InMemoryBarStore::new(&MarketDataConfig::default(), vec!["close".to_string()])
            .unwrap();
        for (i, asset) in [(0, 17085), (1, 17085), (2, 17085), (0, 13684)] {
            store
                .append(Bar::new(
                    AssetId::Int(asset),
                    at(15, 48 + i),
                    Duration::minutes(1),
                    vec![Value::Float(f64::from(i))],
                ))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_filters_by_asset_and_interval() {
        let store = store().await;
        let request = DataRequest::new(vec![AssetId::Int(17085)])
            .with_interval(TimeInterval::new(Some(at(15, 49)), Some(at(15, 51)), false, true))
            .normalize(false);

        let table = store.get_data(&request).await.unwrap();
        assert_eq!(
            table.column("end_time").unwrap(),
            vec![&Value::TimestampUtc(at(15, 51)), &Value::TimestampUtc(at(15, 50))]
        );
    }

    #[tokio::test]
    async fn test_limit_after_descending_sort() {
        let store = store().await;
        let request = DataRequest::new(vec![AssetId::Int(17085)])
            .with_columns(vec!["close".to_string()])
            .with_limit(1)
            .normalize(false);

        let table = store.get_data(&request).await.unwrap();
        assert_eq!(table.columns(), &["close".to_string()]);
        assert_eq!(table.rows(), &[vec![Value::Float(2.0)]]);
    }

    #[tokio::test]
    async fn test_unknown_column_is_invalid() {
        let store = store().await;
        let request =
            DataRequest::new(vec![AssetId::Int(17085)]).with_columns(vec!["volume".to_string()]);
        assert!(matches!(
            store.get_data(&request).await,
            Err(DataError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_end_time() {
        let store = store().await;
        assert_eq!(
            store.latest_end_time(&AssetId::Int(17085)).await.unwrap(),
            at(15, 51)
        );
        assert!(matches!(
            store.latest_end_time(&AssetId::Int(1)).await,
            Err(DataError::InconsistentState(Inconsistency::NoBars(_)))
        ));
    }

    #[tokio::test]
    async fn test_malformed_bar_is_detected() {
        let store = store().await;
        store
            .append(Bar {
                asset_id: AssetId::Int(13684),
                start_time: at(15, 49),
                end_time: at(15, 49),
                values: vec![Value::Null],
            })
            .await
            .unwrap();
        assert!(matches!(
            store.latest_end_time(&AssetId::Int(13684)).await,
            Err(DataError::InconsistentState(
                Inconsistency::BarIntervalMismatch { .. }
            ))
        ));
    }
}
