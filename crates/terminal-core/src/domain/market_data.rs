//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `Candle` - OHLCV 캔들스틱 데이터

use crate::types::{Price, Quantity, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
///
/// 스트림에서 발행되는 캔들은 항상 마감된 캔들입니다.
/// 진행 중인 캔들은 라우터에서 걸러집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 거래 심볼 (거래소 형식, 예: "BTCUSDT")
    pub symbol: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 캔들 종료 시간
    pub close_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량 (기준 자산 단위)
    pub volume: Quantity,
    /// 거래대금 (호가 자산 단위)
    pub quote_volume: Decimal,
}

impl Candle {
    /// 캔들 몸통 크기(절대값)를 반환합니다.
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_candle() -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M1,
            open_time: Utc::now(),
            close_time: Utc::now(),
            open: dec!(50000),
            high: dec!(50500),
            low: dec!(49800),
            close: dec!(50300),
            volume: dec!(12.5),
            quote_volume: dec!(627000),
        }
    }

    #[test]
    fn test_candle_shape() {
        let candle = sample_candle();
        assert_eq!(candle.body_size(), dec!(300));
        assert_eq!(candle.range(), dec!(700));
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }
}
