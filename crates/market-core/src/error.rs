//! 도메인 타입 검증 에러.
//!
//! I/O 이전 단계(타임스탬프 파싱, 요청 구조 검증, 설정 검증)에서 발생하는
//! 에러만 다룹니다. 실행 및 저장소 일관성 에러는 `market-data`에 있습니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 타임존 정보가 없는 타임스탬프
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// 구조적으로 잘못된 요청 (빈 자산 집합 등)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 핵심 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
