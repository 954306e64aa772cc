//! 최신성 확인 명령 (`latest`, `wait`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use market_core::{parse_aware, AssetId};
use market_data::{FreshnessPoller, MarketDataSource};
use tracing::info;

/// 자산의 워터마크를 조회합니다. 자산이 없으면 설정된 확인용 자산을 사용합니다.
pub async fn latest(
    source: &dyn MarketDataSource,
    asset: Option<&str>,
) -> Result<DateTime<Utc>> {
    let end = match asset {
        Some(asset) => {
            let asset: AssetId = asset.parse().context("Invalid asset id")?;
            source
                .latest_end_time(&asset)
                .await
                .with_context(|| format!("Failed to resolve watermark for {}", asset))?
        }
        None => source
            .latest_store_end_time()
            .await
            .context("Failed to resolve store watermark")?,
    };
    info!("Latest end_time: {}", end);
    Ok(end)
}

/// 워터마크가 목표 시각에 도달할 때까지 기다립니다.
pub async fn wait(
    source: &dyn MarketDataSource,
    poller: &FreshnessPoller,
    asset: &str,
    target: &str,
) -> Result<DateTime<Utc>> {
    let asset: AssetId = asset.parse().context("Invalid asset id")?;
    let target = parse_aware(target)
        .context("Invalid --until")?
        .with_timezone(&Utc);

    info!("Waiting for {} to reach {}", asset, target);
    poller
        .wait_for(source, &asset, target)
        .await
        .with_context(|| format!("Store did not catch up for {}", asset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use market_core::MarketDataConfig;
    use market_data::{Bar, InMemoryBarStore};

    async fn store(reference: Option<AssetId>) -> InMemoryBarStore {
        let config = MarketDataConfig {
            reference_asset_id: reference,
            ..Default::default()
        };
        let store = InMemoryBarStore::new(&config, vec![]).unwrap();
        let start = Utc.with_ymd_and_hms(2021, 10, 7, 15, 50, 0).unwrap();
        store
            .append(Bar::new(AssetId::Int(17085), start, Duration::minutes(1), vec![]))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_latest_for_asset_and_reference() {
        let expected = Utc.with_ymd_and_hms(2021, 10, 7, 15, 51, 0).unwrap();

        let store = store(Some(AssetId::Int(17085))).await;
        assert_eq!(latest(&store, Some("17085")).await.unwrap(), expected);
        assert_eq!(latest(&store, None).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_latest_without_reference_fails() {
        let store = store(None).await;
        assert!(latest(&store, None).await.is_err());
    }

    #[tokio::test]
    async fn test_wait_already_fresh() {
        let store = store(None).await;
        let poller = FreshnessPoller::new(std::time::Duration::from_millis(1), 1);

        let end = wait(&store, &poller, "17085", "2021-10-07T11:51:00-04:00")
            .await
            .unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2021, 10, 7, 15, 51, 0).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let store = store(None).await;
        let poller = FreshnessPoller::new(std::time::Duration::from_secs(1), 2);

        assert!(wait(&store, &poller, "17085", "2021-10-07T16:00:00Z")
            .await
            .is_err());
    }
}
