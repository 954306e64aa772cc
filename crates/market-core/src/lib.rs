//! # Market Core
//!
//! 실시간 바(bar) 데이터 조회 계층의 핵심 도메인 타입을 제공합니다.
//!
//! - 자산 식별자 및 자산 집합
//! - 경계 개폐 여부를 가진 시간 구간
//! - 타임스탬프 정규화 (UTC 쿼리 리터럴)
//! - 데이터 주기와 저장 테이블 매핑
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
