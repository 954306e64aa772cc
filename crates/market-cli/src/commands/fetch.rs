//! 바 데이터 조회 명령 (`sql`, `fetch`).

use anyhow::{Context, Result};
use market_core::{parse_aware, AssetSet, TimeInterval};
use market_data::{DataRequest, MarketDataSource, ResultTable};
use tracing::info;

/// 조회 요청 인자.
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    /// 쉼표로 구분된 자산 ID 목록
    pub assets: String,
    /// 쉼표로 구분된 컬럼 목록 (없으면 설정값 또는 전체)
    pub columns: Option<String>,
    /// 시작 시각 (타임존 포함)
    pub from: Option<String>,
    /// 종료 시각 (타임존 포함)
    pub to: Option<String>,
    /// 구간 조건을 적용할 시각 컬럼
    pub ts_column: Option<String>,
    /// 시작 경계 제외
    pub left_open: bool,
    /// 종료 경계 포함
    pub right_closed: bool,
    /// 최신순 정렬 생략
    pub no_sort: bool,
    /// 최대 행 수
    pub limit: Option<usize>,
    /// 정규화 생략
    pub raw: bool,
}

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// 명령 인자를 조회 요청으로 변환합니다.
///
/// 타임존이 없는 시각은 거부합니다.
pub fn build_request(config: &FetchConfig) -> Result<DataRequest> {
    let assets = AssetSet::parse_list(&config.assets).context("Invalid asset list")?;

    let start = config
        .from
        .as_deref()
        .map(parse_aware)
        .transpose()
        .context("Invalid --from")?;
    let end = config
        .to
        .as_deref()
        .map(parse_aware)
        .transpose()
        .context("Invalid --to")?;
    let interval = TimeInterval::new(start, end, !config.left_open, config.right_closed);

    let mut request = DataRequest::new(assets.ids().to_vec())
        .with_interval(interval)
        .sort_descending(!config.no_sort)
        .normalize(!config.raw);
    if let Some(columns) = &config.columns {
        let columns = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| validate_identifier(c, "--columns"))
            .collect::<Result<Vec<_>>>()?;
        request = request.with_columns(columns);
    }
    if let Some(ts_column) = &config.ts_column {
        request = request.on_column(validate_identifier(ts_column.trim(), "--ts-column")?);
    }
    if let Some(limit) = config.limit {
        request = request.with_limit(limit);
    }
    Ok(request)
}

/// 컬럼 이름은 SQL에 그대로 들어가므로 `[A-Za-z_][A-Za-z0-9_]*`만 허용합니다.
fn validate_identifier(name: &str, flag: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        anyhow::bail!("Invalid {}: {:?} is not a plain column name", flag, name);
    }
    Ok(name.to_string())
}

/// 요청을 실행하고 결과 테이블을 반환합니다.
pub async fn fetch(source: &dyn MarketDataSource, request: &DataRequest) -> Result<ResultTable> {
    let table = source
        .get_data(request)
        .await
        .context("Failed to fetch bars")?;
    info!("Fetched {} rows", table.len());
    Ok(table)
}

/// 결과 테이블을 출력 형식에 맞게 렌더링합니다.
pub fn render(table: &ResultTable, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table.to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&table.to_json()).context("Failed to serialize result")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use market_core::{AssetId, MarketDataConfig};
    use market_data::{Bar, InMemoryBarStore};

    fn config(assets: &str) -> FetchConfig {
        FetchConfig {
            assets: assets.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_request_defaults() {
        let request = build_request(&config("17085, 13684")).unwrap();
        assert_eq!(request.asset_ids, vec![AssetId::Int(17085), AssetId::Int(13684)]);
        assert!(request.sort_descending);
        assert!(request.normalize);
        assert!(request.interval.is_left_closed());
        assert!(!request.interval.is_right_closed());
        assert_eq!(request.columns, None);
    }

    #[test]
    fn test_build_request_bounds_and_flags() {
        let request = build_request(&FetchConfig {
            from: Some("2021-10-07T11:50:00-04:00".to_string()),
            columns: Some("asset_id,close".to_string()),
            ts_column: Some("start_time".to_string()),
            left_open: true,
            limit: Some(5),
            raw: true,
            ..config("17085")
        })
        .unwrap();

        assert_eq!(
            request.interval.start().map(|ts| ts.with_timezone(&Utc)),
            Some(Utc.with_ymd_and_hms(2021, 10, 7, 15, 50, 0).unwrap())
        );
        assert!(!request.interval.is_left_closed());
        assert_eq!(request.ts_column.as_deref(), Some("start_time"));
        assert_eq!(
            request.columns,
            Some(vec!["asset_id".to_string(), "close".to_string()])
        );
        assert_eq!(request.limit, Some(5));
        assert!(!request.normalize);
    }

    #[test]
    fn test_naive_bound_is_rejected() {
        let result = build_request(&FetchConfig {
            from: Some("2021-10-07 15:50:00".to_string()),
            ..config("17085")
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_column_injection_is_rejected() {
        let result = build_request(&FetchConfig {
            columns: Some("close;DROP TABLE bars".to_string()),
            ..config("17085")
        });
        assert!(result.is_err());

        let result = build_request(&FetchConfig {
            ts_column: Some("end_time >= '2000-01-01' OR 1=1 --".to_string()),
            ..config("17085")
        });
        assert!(result.is_err());

        assert!(build_request(&FetchConfig {
            columns: Some("1close".to_string()),
            ..config("17085")
        })
        .is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier("start_time", "--ts-column").unwrap(), "start_time");
        assert_eq!(validate_identifier("_v2", "--columns").unwrap(), "_v2");
        assert!(validate_identifier("", "--columns").is_err());
        assert!(validate_identifier("a b", "--columns").is_err());
        assert!(validate_identifier("\"quoted\"", "--columns").is_err());
    }

    #[test]
    fn test_empty_asset_list_is_rejected() {
        assert!(build_request(&config("")).is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("csv").is_err());
    }

    #[tokio::test]
    async fn test_fetch_renders_json() {
        let store = InMemoryBarStore::new(&MarketDataConfig::default(), vec![]).unwrap();
        let start = Utc.with_ymd_and_hms(2021, 10, 7, 15, 50, 0).unwrap();
        store
            .append(Bar::new(AssetId::Int(17085), start, Duration::minutes(1), vec![]))
            .await
            .unwrap();

        let request = build_request(&config("17085")).unwrap();
        let table = fetch(&store, &request).await.unwrap();
        assert_eq!(table.len(), 1);

        let json = render(&table, OutputFormat::Json).unwrap();
        assert!(json.contains("17085"));
    }
}
