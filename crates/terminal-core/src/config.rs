//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! TOML 파일을 기본으로 읽고 `TERMINAL__` 접두사 환경 변수로 오버라이드합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 거래소 연결 설정
    #[serde(default)]
    pub exchange: ExchangeSettings,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 터미널 기본값 설정
    #[serde(default)]
    pub terminal: TerminalConfig,
}

/// 거래소 연결 설정.
///
/// API 자격증명은 파일이 아니라 환경 변수에서 읽습니다
/// (`BINANCE_FUTURES_API_KEY` / `BINANCE_FUTURES_API_SECRET`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeSettings {
    /// 테스트넷 사용 여부
    #[serde(default)]
    pub testnet: bool,
    /// REST 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 서명 요청 유효 시간 (밀리초)
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_recv_window() -> u64 {
    5000
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            testnet: false,
            timeout_secs: default_timeout_secs(),
            recv_window_ms: default_recv_window(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 터미널 기본값 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TerminalConfig {
    /// 기본 거래 심볼
    pub default_symbol: String,
    /// 기본 캔들 간격
    pub default_interval: String,
    /// 기본 레버리지
    pub default_leverage: u32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_symbol: "BTCUSDT".to_string(),
            default_interval: "1m".to_string(),
            default_leverage: 1,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("TERMINAL")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 파일 없이 환경 변수와 기본값만으로 설정을 로드합니다.
    pub fn load_from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("TERMINAL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    ///
    /// `config/default.toml`이 없으면 환경 변수와 기본값으로 대체합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Self::load_from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig {
            exchange: ExchangeSettings::default(),
            logging: LoggingConfig::default(),
            terminal: TerminalConfig::default(),
        };
        assert!(!config.exchange.testnet);
        assert_eq!(config.exchange.recv_window_ms, 5000);
        assert_eq!(config.terminal.default_symbol, "BTCUSDT");
        assert_eq!(config.logging.format, "pretty");
    }
}
