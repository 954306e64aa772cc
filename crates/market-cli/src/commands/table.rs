//! 주기별 저장 테이블 조회 명령 (`table`).

use anyhow::{Context, Result};
use market_core::{Frequency, TableNameResolver};

/// 데이터 주기에 해당하는 저장 테이블 이름을 반환합니다.
pub fn table_name(resolver: &dyn TableNameResolver, frequency: &str) -> Result<String> {
    let frequency: Frequency = frequency
        .parse()
        .with_context(|| format!("Invalid frequency: {}. Use: minutely, daily, tick", frequency))?;
    Ok(resolver.table_name(frequency).to_string())
}
