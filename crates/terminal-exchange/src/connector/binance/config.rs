//! 바이낸스 선물 클라이언트 설정.

use std::fmt;

/// 바이낸스 USD-M 선물 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct BinanceFuturesConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: String,
    /// 테스트넷 사용
    pub testnet: bool,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// REST 기본 URL 오버라이드 (테스트용)
    pub rest_url_override: Option<String>,
    /// WebSocket 기본 URL 오버라이드 (테스트용)
    pub ws_url_override: Option<String>,
}

impl fmt::Debug for BinanceFuturesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("BinanceFuturesConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BinanceFuturesConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            testnet: false,
            timeout_secs: 10,
            recv_window: 5000,
            rest_url_override: None,
            ws_url_override: None,
        }
    }

    /// 테스트넷 사용.
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// REST 기본 URL을 교체합니다 (테스트용).
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url_override = Some(url.into());
        self
    }

    /// WebSocket 기본 URL을 교체합니다 (테스트용).
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url_override = Some(url.into());
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// `BINANCE_FUTURES_API_KEY` / `BINANCE_FUTURES_API_SECRET`가 없으면
    /// `None`을 반환합니다. `BINANCE_FUTURES_TESTNET=true`로 테스트넷을
    /// 선택합니다.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BINANCE_FUTURES_API_KEY").ok()?;
        let api_secret = std::env::var("BINANCE_FUTURES_API_SECRET").ok()?;
        let testnet = std::env::var("BINANCE_FUTURES_TESTNET")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        Some(Self::new(api_key, api_secret).with_testnet(testnet))
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        if let Some(url) = &self.rest_url_override {
            return url;
        }
        if self.testnet {
            "https://testnet.binancefuture.com"
        } else {
            "https://fapi.binance.com"
        }
    }

    /// WebSocket 기본 URL 반환.
    pub fn ws_base_url(&self) -> &str {
        if let Some(url) = &self.ws_url_override {
            return url;
        }
        if self.testnet {
            "wss://stream.binancefuture.com/ws"
        } else {
            "wss://fstream.binance.com/ws"
        }
    }
}
