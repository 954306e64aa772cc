//! 최신성 폴링.
//!
//! 이 계층에는 push 알림이 없으므로, 호출자는 워터마크를 반복 조회해
//! 저장소가 원하는 시각까지 따라잡았는지 확인합니다. 매 시도마다 다시 조회합니다.

use crate::error::{DataError, Result};
use crate::source::MarketDataSource;
use chrono::{DateTime, Utc};
use market_core::{AssetId, MarketDataConfig};
use std::time::Duration;
use tracing::{debug, info};

/// 워터마크 폴러.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPoller {
    poll_interval: Duration,
    max_attempts: u32,
}

impl FreshnessPoller {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &MarketDataConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.max_poll_attempts,
        )
    }

    /// 자산의 워터마크가 `target` 이상이 될 때까지 기다립니다.
    ///
    /// 조회 오류(일관성 위반 포함)는 즉시 전달합니다.
    /// 최대 시도 횟수 안에 도달하지 못하면 `DataError::Timeout`.
    pub async fn wait_for(
        &self,
        source: &dyn MarketDataSource,
        asset: &AssetId,
        target: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let mut last_seen = None;
        for attempt in 1..=self.max_attempts {
            let end = source.latest_end_time(asset).await?;
            if end >= target {
                info!(asset = %asset, end = %end, attempt, "Store caught up");
                return Ok(end);
            }
            debug!(asset = %asset, end = %end, target = %target, attempt, "Store behind target");
            last_seen = Some(end);

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(DataError::Timeout(format!(
            "asset {} did not reach {} after {} attempts (last end_time {:?})",
            asset, target, self.max_attempts, last_seen
        )))
    }
}
