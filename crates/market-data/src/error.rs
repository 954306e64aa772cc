//! 데이터 모듈 오류 타입.

use chrono::{DateTime, Duration, Utc};
use market_core::CoreError;
use thiserror::Error;

/// 데이터 조회 오류.
///
/// 어떤 오류도 이 계층에서 재시도하거나 삼키지 않고 호출자에게 그대로 전달합니다.
#[derive(Debug, Error)]
pub enum DataError {
    /// 타임존 정보가 없거나 해석할 수 없는 타임스탬프
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// 구조적으로 잘못된 요청. I/O 이전에 발생합니다.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// 실행 협력자 실패 (문법, 권한, 연결 중 끊김 등)
    #[error("Execution error: {0}")]
    Execution(String),

    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 저장소 일관성 위반. 항상 치명적입니다.
    #[error("Inconsistent state: {0}")]
    InconsistentState(#[from] Inconsistency),

    /// 최신성 대기 시간 초과
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// 최신 바 확인 과정의 단계별 일관성 위반.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    /// 최신 시작 시각 조회 결과가 1행 1열이 아님
    #[error("latest start_time query returned shape ({rows}, {columns}), expected (1, 1)")]
    LatestStartShape { rows: usize, columns: usize },

    /// 자산에 대한 바가 하나도 없음 (`MAX`가 NULL)
    #[error("no bars stored for asset {0}")]
    NoBars(String),

    /// 짝을 이루는 종료 시각 조회 결과가 1행 1열이 아님
    #[error("paired end_time query returned shape ({rows}, {columns}), expected (1, 1)")]
    PairedEndShape { rows: usize, columns: usize },

    /// 시각으로 해석할 수 없는 저장소 값
    #[error("unreadable timestamp value: {0}")]
    UnreadableTimestamp(String),

    /// `end_time != start_time + bar_interval`
    #[error("bar end {end} does not equal start {start} plus {expected}")]
    BarIntervalMismatch {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        expected: Duration,
    },
}

impl From<CoreError> for DataError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTimestamp(msg) => DataError::InvalidTimestamp(msg),
            CoreError::InvalidQuery(msg) => DataError::InvalidQuery(msg),
            CoreError::Config(msg) => DataError::ConfigError(msg),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::PoolClosed => DataError::ConnectionError("pool closed".to_string()),
            sqlx::Error::Io(io_err) => DataError::ConnectionError(io_err.to_string()),
            sqlx::Error::Database(db_err) => DataError::Execution(db_err.message().to_string()),
            _ => DataError::Execution(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
