//! 시장 데이터 조회 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 최신 바 1개 조회에 사용될 SQL 확인 (DB 접속 없음)
//! market sql -a 17085 --limit 1
//!
//! # 뉴욕 시간 기준 구간 조회
//! market fetch -a 17085,13684 --from 2021-10-07T09:30:00-04:00 --format json
//!
//! # 자산 워터마크 / 저장소 워터마크
//! market latest -a 17085
//! market latest
//!
//! # 워터마크가 목표 시각에 도달할 때까지 대기
//! market wait -a 17085 --until 2021-10-07T11:51:00-04:00
//!
//! # 주기별 저장 테이블 이름
//! market table daily
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use market_cli::commands::fetch::{build_request, fetch, render, FetchConfig, OutputFormat};
use market_cli::commands::latest::{latest, wait};
use market_cli::commands::table::table_name;
use market_core::{init_logging, AppConfig, LogConfig};
use market_data::{Database, FreshnessPoller, SqlMarketData};
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "market")]
#[command(about = "Market data CLI - 실시간 바 데이터 조회", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (기본: config/default.toml, 없으면 기본값 + 환경 변수)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// 조회 요청 인자.
#[derive(Args)]
struct RequestArgs {
    /// 자산 ID 목록 (쉼표로 구분, 예: 17085,13684)
    #[arg(short, long)]
    assets: String,

    /// 조회 컬럼 (쉼표로 구분, 기본: 설정값 또는 전체)
    #[arg(long)]
    columns: Option<String>,

    /// 시작 시각 (타임존 포함, 예: 2021-10-07T11:50:00-04:00)
    #[arg(short = 'f', long)]
    from: Option<String>,

    /// 종료 시각 (타임존 포함)
    #[arg(short, long)]
    to: Option<String>,

    /// 구간 조건 시각 컬럼 (기본: end_time)
    #[arg(long)]
    ts_column: Option<String>,

    /// 시작 경계 제외
    #[arg(long, default_value = "false")]
    left_open: bool,

    /// 종료 경계 포함
    #[arg(long, default_value = "false")]
    right_closed: bool,

    /// 최신순 정렬 생략
    #[arg(long, default_value = "false")]
    no_sort: bool,

    /// 최대 행 수
    #[arg(short, long)]
    limit: Option<usize>,

    /// 정규화(타임존 변환, 오름차순 정렬) 생략
    #[arg(long, default_value = "false")]
    raw: bool,
}

impl From<RequestArgs> for FetchConfig {
    fn from(args: RequestArgs) -> Self {
        Self {
            assets: args.assets,
            columns: args.columns,
            from: args.from,
            to: args.to,
            ts_column: args.ts_column,
            left_open: args.left_open,
            right_closed: args.right_closed,
            no_sort: args.no_sort,
            limit: args.limit,
            raw: args.raw,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 조회 요청의 SQL 출력 (DB 접속 없음)
    Sql {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// 바 데이터 조회
    Fetch {
        #[command(flatten)]
        request: RequestArgs,

        /// 출력 형식 (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// 최신 커밋 바의 종료 시각 조회
    Latest {
        /// 자산 ID (생략 시 설정된 reference_asset_id)
        #[arg(short, long)]
        asset: Option<String>,
    },

    /// 워터마크가 목표 시각에 도달할 때까지 대기
    Wait {
        /// 자산 ID
        #[arg(short, long)]
        asset: String,

        /// 목표 시각 (타임존 포함)
        #[arg(short, long)]
        until: String,

        /// 폴링 간격 (밀리초, 기본: 설정값)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// 최대 시도 횟수 (기본: 설정값)
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// 데이터 주기의 저장 테이블 이름 (minutely, daily, tick)
    Table {
        frequency: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_default(),
    }
    .context("Failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Sql { request } => {
            let request = build_request(&request.into())?;
            let database = Database::connect_lazy(&config.database)?;
            let source = SqlMarketData::new(database, &config.market_data)?;
            println!("{}", source.build_request_query(&request)?);
        }

        Commands::Fetch { request, format } => {
            let format = OutputFormat::parse(&format)?;
            let request = build_request(&request.into())?;
            let database = Database::connect(&config.database).await?;
            let source = SqlMarketData::new(database, &config.market_data)?;

            match fetch(&source, &request).await {
                Ok(table) => println!("{}", render(&table, format)?),
                Err(e) => {
                    error!("Fetch failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Latest { asset } => {
            let database = Database::connect(&config.database).await?;
            let source = SqlMarketData::new(database, &config.market_data)?;

            let end = latest(&source, asset.as_deref()).await?;
            println!("{}", end.with_timezone(&config.market_data.display_tz()?));
        }

        Commands::Wait {
            asset,
            until,
            interval_ms,
            attempts,
        } => {
            let database = Database::connect(&config.database).await?;
            let source = SqlMarketData::new(database, &config.market_data)?;

            let poller = FreshnessPoller::new(
                Duration::from_millis(interval_ms.unwrap_or(config.market_data.poll_interval_ms)),
                attempts.unwrap_or(config.market_data.max_poll_attempts),
            );

            match wait(&source, &poller, &asset, &until).await {
                Ok(end) => {
                    info!("Store caught up for {}", asset);
                    println!("{}", end.with_timezone(&config.market_data.display_tz()?));
                }
                Err(e) => {
                    error!("Wait failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Table { frequency } => {
            println!("{}", table_name(&config.frequency_tables, &frequency)?);
        }
    }

    Ok(())
}
