//! 거래소 에러 타입.

use rust_decimal::Decimal;
use thiserror::Error;

/// 거래소 작업 결과 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 거래소 연결 끊김
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 유효하지 않은 요청 파라미터
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 최소 주문 수량 미달
    #[error("Order too small: quantity {quantity} below minimum {min_qty}")]
    OrderTooSmall { quantity: Decimal, min_qty: Decimal },

    /// 연결 수립 전 주문 시도
    #[error("Not connected to exchange")]
    NotConnected,

    /// 타임스탬프 동기화 에러
    #[error("Timestamp error: {0}")]
    TimestampError(String),

    /// 잔고 부족
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// 주문을 찾을 수 없음
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// 심볼을 찾을 수 없음
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// WebSocket 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::NetworkError(_)
                | ExchangeError::Disconnected(_)
                | ExchangeError::RateLimited
                | ExchangeError::Timeout(_)
                | ExchangeError::WebSocket(_)
                | ExchangeError::TimestampError(_)
        )
    }

    /// 호출자 검증 에러인지 확인 (제출 전에 거부됨).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExchangeError::InvalidParameter(_) | ExchangeError::OrderTooSmall { .. }
        )
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ExchangeError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::NetworkError(err.to_string())
        } else {
            ExchangeError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_retryable() {
        assert!(ExchangeError::NetworkError("reset".into()).is_retryable());
        assert!(ExchangeError::RateLimited.is_retryable());
        assert!(!ExchangeError::Unauthorized("bad key".into()).is_retryable());
        assert!(!ExchangeError::NotConnected.is_retryable());
    }

    #[test]
    fn test_validation() {
        let too_small = ExchangeError::OrderTooSmall {
            quantity: dec!(0.0001),
            min_qty: dec!(0.001),
        };
        assert!(too_small.is_validation());
        assert!(ExchangeError::InvalidParameter("usd must be positive".into()).is_validation());
        assert!(!ExchangeError::RateLimited.is_validation());
    }
}
