//! 자산 식별자와 자산 집합.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 저장소에서 하나의 거래 상품을 식별하는 키.
///
/// 정수 ID는 그대로, 문자열 ID는 작은따옴표로 감싸 SQL에 삽입됩니다.
/// 이스케이프는 하지 않으므로 문자열 ID에 작은따옴표가 들어가면 거부합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetId {
    /// 정수 ID (예: 17085)
    Int(i64),
    /// 문자열 ID (예: "BTC_USDT")
    Text(String),
}

impl AssetId {
    /// SQL 리터럴로 렌더링합니다.
    pub fn sql_literal(&self) -> String {
        match self {
            AssetId::Int(id) => id.to_string(),
            AssetId::Text(id) => format!("'{}'", id),
        }
    }

    fn validate(&self) -> CoreResult<()> {
        match self {
            AssetId::Int(_) => Ok(()),
            AssetId::Text(id) if id.is_empty() => {
                Err(CoreError::InvalidQuery("empty asset id".to_string()))
            }
            AssetId::Text(id) if id.contains('\'') => Err(CoreError::InvalidQuery(format!(
                "asset id {:?} contains a quote",
                id
            ))),
            AssetId::Text(_) => Ok(()),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Int(id) => write!(f, "{}", id),
            AssetId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for AssetId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let id = match s.parse::<i64>() {
            Ok(id) => AssetId::Int(id),
            Err(_) => AssetId::Text(s.to_string()),
        };
        id.validate()?;
        Ok(id)
    }
}

impl From<i64> for AssetId {
    fn from(id: i64) -> Self {
        AssetId::Int(id)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        AssetId::Text(id.to_string())
    }
}

/// 비어 있지 않은 순서 있는 자산 ID 목록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet(Vec<AssetId>);

impl AssetSet {
    /// 자산 집합을 생성합니다.
    ///
    /// # Errors
    ///
    /// 목록이 비어 있거나 렌더링할 수 없는 ID가 있으면 `CoreError::InvalidQuery`.
    pub fn new(ids: Vec<AssetId>) -> CoreResult<Self> {
        if ids.is_empty() {
            return Err(CoreError::InvalidQuery("asset set is empty".to_string()));
        }
        for id in &ids {
            id.validate()?;
        }
        Ok(Self(ids))
    }

    /// 쉼표로 구분된 목록을 파싱합니다 (예: `"17085,17086"`).
    pub fn parse_list(input: &str) -> CoreResult<Self> {
        let ids = input
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(AssetId::from_str)
            .collect::<CoreResult<Vec<_>>>()?;
        Self::new(ids)
    }

    pub fn ids(&self) -> &[AssetId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 항상 false. 빈 집합은 생성할 수 없습니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.0.contains(id)
    }

    /// 자산 조건절을 렌더링합니다.
    ///
    /// 단일 ID는 `col=id`, 여러 ID는 입력 순서를 유지한 `col IN (a,b,...)`.
    pub fn predicate(&self, column: &str) -> String {
        match self.0.as_slice() {
            [single] => format!("{}={}", column, single.sql_literal()),
            ids => {
                let joined = ids
                    .iter()
                    .map(AssetId::sql_literal)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{} IN ({})", column, joined)
            }
        }
    }
}

impl TryFrom<Vec<AssetId>> for AssetSet {
    type Error = CoreError;

    fn try_from(ids: Vec<AssetId>) -> Result<Self, Self::Error> {
        Self::new(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_set_is_rejected() {
        assert!(matches!(
            AssetSet::new(vec![]),
            Err(CoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            AssetSet::parse_list(" , "),
            Err(CoreError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_quoted_text_id_is_rejected() {
        let result = AssetSet::new(vec![AssetId::from("BTC'--")]);
        assert!(matches!(result, Err(CoreError::InvalidQuery(_))));
    }

    #[test]
    fn test_single_id_renders_equality() {
        let set = AssetSet::new(vec![AssetId::from(17085)]).unwrap();
        assert_eq!(set.predicate("asset_id"), "asset_id=17085");
    }

    #[test]
    fn test_text_ids_are_quoted() {
        let set = AssetSet::parse_list("BTC_USDT,ETH_USDT").unwrap();
        assert_eq!(
            set.predicate("full_symbol"),
            "full_symbol IN ('BTC_USDT','ETH_USDT')"
        );
    }

    #[test]
    fn test_parse_list_mixes_kinds() {
        let set = AssetSet::parse_list("17085, 13684").unwrap();
        assert_eq!(set.ids(), &[AssetId::Int(17085), AssetId::Int(13684)]);
    }

    proptest! {
        /// 여러 ID는 순서를 유지한 IN 절로 렌더링됩니다.
        #[test]
        fn multi_ids_render_in_clause(ids in prop::collection::vec(0i64..1_000_000, 2..20)) {
            let set = AssetSet::new(ids.iter().copied().map(AssetId::from).collect()).unwrap();
            let expected = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
            prop_assert_eq!(set.predicate("asset_id"), format!("asset_id IN ({})", expected));
        }
    }
}
