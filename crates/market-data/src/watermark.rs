//! 최신 커밋 바의 종료 시각(워터마크) 확인.
//!
//! 두 번의 순차 조회로 동작합니다:
//!
//! ```text
//! FindLatestStart ──► FetchPairedEnd ──► Validate
//!   MAX(start_time)     end_time 조회       end == start + bar_interval
//! ```
//!
//! 두 값을 각각 독립적으로 읽어 비교하므로, `start_time`은 진행됐지만
//! `end_time`이 따라오지 않은 손상도 잡아낼 수 있습니다.
//! 저장소는 계속 추가되므로 결과는 계산 시점에만 유효하며 캐시하지 않습니다.

use crate::error::{Inconsistency, Result};
use crate::executor::QueryExecutor;
use crate::query::BarTableLayout;
use crate::table::{ResultTable, Value};
use chrono::{DateTime, Duration, Utc};
use market_core::{AssetId, MarketDataConfig};
use tracing::{debug, info, instrument, warn};

/// 워터마크 확인 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    FindLatestStart,
    FetchPairedEnd {
        start: DateTime<Utc>,
    },
    Validate {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// 자산별 워터마크 확인기.
#[derive(Debug, Clone)]
pub struct WatermarkResolver {
    layout: BarTableLayout,
    bar_interval: Duration,
}

impl WatermarkResolver {
    pub fn new(layout: BarTableLayout, bar_interval: Duration) -> Self {
        Self {
            layout,
            bar_interval,
        }
    }

    pub fn from_config(config: &MarketDataConfig) -> Self {
        Self::new(BarTableLayout::from_config(config), config.bar_interval())
    }

    pub fn bar_interval(&self) -> Duration {
        self.bar_interval
    }

    /// 자산의 검증된 최신 `end_time`을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `Inconsistency::LatestStartShape`: 첫 조회 결과가 1행 1열이 아님
    /// - `Inconsistency::NoBars`: 자산에 바가 없음
    /// - `Inconsistency::PairedEndShape`: 두 번째 조회 결과가 1행 1열이 아님
    /// - `Inconsistency::UnreadableTimestamp`: 시각으로 읽을 수 없는 값
    /// - `Inconsistency::BarIntervalMismatch`: `end != start + bar_interval`
    /// - 실행 오류는 그대로 전달됩니다.
    #[instrument(skip_all, fields(asset = %asset))]
    pub async fn resolve(
        &self,
        executor: &dyn QueryExecutor,
        asset: &AssetId,
    ) -> Result<DateTime<Utc>> {
        let mut step = Step::FindLatestStart;
        loop {
            step = match step {
                Step::FindLatestStart => {
                    let sql = self.layout.latest_start_query(asset)?;
                    info!(query = %sql, "Resolving latest start_time");
                    let table = executor.execute(&sql).await?;
                    let value = single_cell(&table).map_err(|(rows, columns)| {
                        Inconsistency::LatestStartShape { rows, columns }
                    })?;
                    if value.is_null() {
                        return Err(Inconsistency::NoBars(asset.to_string()).into());
                    }
                    let start = read_utc(value)?;
                    debug!(start = %start, "Latest start_time");
                    Step::FetchPairedEnd { start }
                }
                Step::FetchPairedEnd { start } => {
                    let sql = self.layout.paired_end_query(asset, &start)?;
                    info!(query = %sql, "Fetching paired end_time");
                    let table = executor.execute(&sql).await?;
                    let value = single_cell(&table).map_err(|(rows, columns)| {
                        Inconsistency::PairedEndShape { rows, columns }
                    })?;
                    let end = read_utc(value)?;
                    debug!(end = %end, "Paired end_time");
                    Step::Validate { start, end }
                }
                Step::Validate { start, end } => {
                    return check_bar_interval(start, end, self.bar_interval);
                }
            };
        }
    }
}

/// `end == start + bar_interval`을 확인하고 `end`를 반환합니다.
pub fn check_bar_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bar_interval: Duration,
) -> Result<DateTime<Utc>> {
    if end != start + bar_interval {
        warn!(start = %start, end = %end, "Bar interval invariant violated");
        return Err(Inconsistency::BarIntervalMismatch {
            start,
            end,
            expected: bar_interval,
        }
        .into());
    }
    Ok(end)
}

fn single_cell(table: &ResultTable) -> std::result::Result<&Value, (usize, usize)> {
    match table.shape() {
        (1, 1) => table.get(0, 0).ok_or((1, 1)),
        shape => Err(shape),
    }
}

fn read_utc(value: &Value) -> Result<DateTime<Utc>> {
    value
        .as_utc()
        .ok_or_else(|| Inconsistency::UnreadableTimestamp(value.to_string()).into())
}
