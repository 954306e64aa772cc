//! 데이터 주기와 저장 테이블 매핑.

use crate::error::CoreError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 저장소 데이터 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// 1분봉
    Minutely,
    /// 일봉
    Daily,
    /// 틱
    Tick,
}

impl Frequency {
    /// 바 하나의 길이. 틱 데이터는 고정 길이가 없습니다.
    pub fn bar_interval(&self) -> Option<Duration> {
        match self {
            Frequency::Minutely => Some(Duration::minutes(1)),
            Frequency::Daily => Some(Duration::days(1)),
            Frequency::Tick => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Minutely => "minutely",
            Frequency::Daily => "daily",
            Frequency::Tick => "tick",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minutely" | "minute" | "1m" | "t" => Ok(Frequency::Minutely),
            "daily" | "day" | "1d" | "d" => Ok(Frequency::Daily),
            "tick" => Ok(Frequency::Tick),
            _ => Err(CoreError::Config(format!("Unknown frequency: {}", s))),
        }
    }
}

/// 주기별 저장 테이블 이름을 결정하는 협력자.
pub trait TableNameResolver {
    fn table_name(&self, frequency: Frequency) -> &str;
}

/// 설정 기반 주기별 테이블 이름.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTables {
    #[serde(default = "default_minutely_table")]
    pub minutely: String,
    #[serde(default = "default_daily_table")]
    pub daily: String,
    #[serde(default = "default_tick_table")]
    pub tick: String,
}

fn default_minutely_table() -> String {
    "IbMinuteData".to_string()
}
fn default_daily_table() -> String {
    "IbDailyData".to_string()
}
fn default_tick_table() -> String {
    "IbTickData".to_string()
}

impl Default for FrequencyTables {
    fn default() -> Self {
        Self {
            minutely: default_minutely_table(),
            daily: default_daily_table(),
            tick: default_tick_table(),
        }
    }
}

impl TableNameResolver for FrequencyTables {
    fn table_name(&self, frequency: Frequency) -> &str {
        match frequency {
            Frequency::Minutely => &self.minutely,
            Frequency::Daily => &self.daily,
            Frequency::Tick => &self.tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_names() {
        let tables = FrequencyTables::default();
        assert_eq!(tables.table_name(Frequency::Minutely), "IbMinuteData");
        assert_eq!(tables.table_name(Frequency::Daily), "IbDailyData");
        assert_eq!(tables.table_name(Frequency::Tick), "IbTickData");
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!("1m".parse::<Frequency>().unwrap(), Frequency::Minutely);
        assert_eq!("Daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_bar_interval() {
        assert_eq!(Frequency::Minutely.bar_interval(), Some(Duration::minutes(1)));
        assert_eq!(Frequency::Tick.bar_interval(), None);
    }
}
