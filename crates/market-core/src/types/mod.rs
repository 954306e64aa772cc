//! 조회 계층 전반에서 사용되는 공통 타입.

mod asset;
mod frequency;
mod interval;
mod timestamp;

pub use asset::*;
pub use frequency::*;
pub use interval::*;
pub use timestamp::*;
