//! tracing을 사용한 로깅 인프라.
//!
//! 조회 계층은 실행되는 모든 SQL 문을 `info` 레벨로, 최신성 확인 단계를
//! `debug` 레벨로 남깁니다. 출력 형식은 다음 중 하나입니다:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 운영환경/로그 집계용 JSON 형식
//! - **compact**: 폴링 루프처럼 로그가 많은 경우의 한 줄 형식

use crate::config::LoggingConfig;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "market_data=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
    /// span 진입/종료 이벤트 포함 여부
    pub with_span_events: bool,
    /// 대상(모듈 경로) 포함 여부
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_span_events: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// 환경 변수에서 설정을 생성합니다 (`RUST_LOG`, `LOG_FORMAT`).
    pub fn from_env() -> Self {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let format = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            ..Default::default()
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    /// 알 수 없는 형식 문자열은 pretty로 처리합니다.
    fn from(config: &LoggingConfig) -> Self {
        Self::new(config.level.clone()).with_format(config.format.parse().unwrap_or_default())
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// `RUST_LOG`가 설정되어 있으면 설정 파일의 레벨보다 우선합니다.
///
/// ```no_run
/// use market_core::logging::{init_logging, LogConfig, LogFormat};
///
/// let config = LogConfig::new("market_data=debug").with_format(LogFormat::Compact);
/// init_logging(config).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
    }

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_from_logging_config() {
        let config = LogConfig::from(&LoggingConfig {
            level: "debug".to_string(),
            format: "unknown".to_string(),
        });
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
