//! CLI 명령어 구현 모듈.

pub mod fetch;
pub mod latest;
pub mod table;
