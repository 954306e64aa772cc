//! 쿼리 생성.

mod builder;

pub use builder::{build_query, BarTableLayout, QueryDescriptor, RECENCY_SORT_COLUMN};
