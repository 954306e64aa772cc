//! 저장소 구현.
//!
//! - `postgres`: sqlx 기반 실행 협력자
//! - `memory`: 인메모리 바 저장소

pub mod memory;
pub mod postgres;
