//! 쿼리 실행 경계.
//!
//! 조회 계층은 SQL 문 하나를 실행 협력자에게 넘기고 결과 테이블을 받습니다.
//! 연결 풀링, 재시도, 타임아웃 정책은 모두 구현체(연결 계층)의 책임입니다.

use crate::error::Result;
use crate::table::ResultTable;
use async_trait::async_trait;
use std::sync::Arc;

/// SQL 실행 협력자.
///
/// 실패는 해석하지 않고 `DataError::Execution` 계열로 그대로 전달해야 합니다.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// SQL 문을 실행하고 저장소 스키마의 컬럼 이름을 가진 테이블을 반환합니다.
    async fn execute(&self, sql: &str) -> Result<ResultTable>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Arc<T> {
    async fn execute(&self, sql: &str) -> Result<ResultTable> {
        (**self).execute(sql).await
    }
}
