//! 시장 데이터 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 조회 요청의 SQL 확인 및 실행
//! - 자산/저장소 워터마크 확인
//! - 최신성 대기
//! - 주기별 저장 테이블 확인

pub mod commands;
