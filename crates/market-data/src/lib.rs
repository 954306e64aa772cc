//! 실시간 바 데이터 조회 계층.
//!
//! 이 crate는 다음을 제공합니다:
//! - 시간 구간/자산 조건을 SQL 문으로 변환하는 쿼리 빌더
//! - SQL 실행 협력자 경계와 PostgreSQL 구현
//! - 결과 시각 컬럼의 시간대 변환과 정렬
//! - 자산별 최신 커밋 바 종료 시각(워터마크) 확인
//! - 최신성 폴링
//! - 테스트와 리플레이용 인메모리 바 저장소
//!
//! # 예시
//!
//! ```
//! use market_core::{AssetId, TimeInterval};
//! use market_data::QueryDescriptor;
//!
//! let sql = QueryDescriptor::new("bars", "asset_id", vec![AssetId::Int(17085)])
//!     .with_interval("start_time", TimeInterval::unbounded())
//!     .sort_descending(true)
//!     .with_limit(Some(10))
//!     .to_sql()
//!     .unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM bars WHERE asset_id=17085 ORDER BY end_time DESC LIMIT 10"
//! );
//! ```

pub mod error;
pub mod executor;
pub mod freshness;
pub mod normalize;
pub mod query;
pub mod source;
pub mod storage;
pub mod table;
pub mod watermark;

pub use error::{DataError, Inconsistency, Result};
pub use executor::QueryExecutor;
pub use freshness::FreshnessPoller;
pub use normalize::ResultNormalizer;
pub use query::{build_query, BarTableLayout, QueryDescriptor, RECENCY_SORT_COLUMN};
pub use source::{DataRequest, MarketDataSource, SqlMarketData};
pub use table::{ResultTable, Value};
pub use watermark::{check_bar_interval, WatermarkResolver};

// 저장소 타입 재내보내기
pub use storage::memory::{Bar, InMemoryBarStore};
pub use storage::postgres::Database;
