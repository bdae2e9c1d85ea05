//! 바이낸스 선물 API 와이어 타입.
//!
//! REST/WebSocket 응답 형식과 도메인 타입으로의 변환을 정의합니다.

use crate::error::{ExchangeError, ExchangeResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use terminal_core::{Candle, Position, PositionSide, SymbolFilters, Timeframe};

/// 문자열에서 Decimal 파싱. 비어 있거나 잘못된 값은 0으로 처리합니다.
pub(crate) fn parse_decimal(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

// ============================================================================
// REST 응답 타입
// ============================================================================

/// 리슨 키 발급 응답.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListenKeyResponse {
    pub listen_key: String,
}

/// 현재가 응답.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PriceTicker {
    #[allow(dead_code)]
    pub symbol: String,
    pub price: String,
}

/// exchangeInfo 응답 (필요한 필드만).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<RawFilter>,
}

/// 심볼 필터 원본. 필터 유형에 따라 필드가 달라집니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFilter {
    pub filter_type: String,
    #[serde(default)]
    pub min_qty: Option<String>,
    #[serde(default)]
    pub step_size: Option<String>,
    #[serde(default)]
    pub tick_size: Option<String>,
}

impl SymbolInfo {
    /// LOT_SIZE와 PRICE_FILTER에서 도메인 필터를 추출합니다.
    pub fn to_symbol_filters(&self) -> ExchangeResult<SymbolFilters> {
        let lot = self
            .filters
            .iter()
            .find(|f| f.filter_type == "LOT_SIZE")
            .ok_or_else(|| {
                ExchangeError::ParseError(format!("LOT_SIZE filter missing for {}", self.symbol))
            })?;
        let price = self
            .filters
            .iter()
            .find(|f| f.filter_type == "PRICE_FILTER")
            .ok_or_else(|| {
                ExchangeError::ParseError(format!(
                    "PRICE_FILTER filter missing for {}",
                    self.symbol
                ))
            })?;

        Ok(SymbolFilters {
            min_qty: lot.min_qty.as_deref().map(parse_decimal).unwrap_or_default(),
            step_size: lot
                .step_size
                .as_deref()
                .map(parse_decimal)
                .unwrap_or_default(),
            tick_size: price
                .tick_size
                .as_deref()
                .map(parse_decimal)
                .unwrap_or_default(),
        })
    }
}

/// 과거 캔들 응답의 배열 요소.
#[derive(Debug, Deserialize)]
pub(crate) struct RestKline(
    pub i64,    // 0: Open time
    pub String, // 1: Open
    pub String, // 2: High
    pub String, // 3: Low
    pub String, // 4: Close
    pub String, // 5: Volume
    pub i64,    // 6: Close time
    pub String, // 7: Quote asset volume
    pub i64,    // 8: Number of trades
    pub String, // 9: Taker buy base asset volume
    pub String, // 10: Taker buy quote asset volume
    pub String, // 11: Ignore
);

impl RestKline {
    /// 도메인 캔들로 변환합니다.
    pub fn to_candle(&self, symbol: &str, timeframe: Timeframe) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            timeframe,
            open_time: DateTime::from_timestamp_millis(self.0).unwrap_or_else(Utc::now),
            close_time: DateTime::from_timestamp_millis(self.6).unwrap_or_else(Utc::now),
            open: parse_decimal(&self.1),
            high: parse_decimal(&self.2),
            low: parse_decimal(&self.3),
            close: parse_decimal(&self.4),
            volume: parse_decimal(&self.5),
            quote_volume: parse_decimal(&self.7),
        }
    }
}

/// 계좌 응답 (포지션만 사용).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountResponse {
    pub positions: Vec<AccountPosition>,
}

/// 계좌 응답의 포지션 항목.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountPosition {
    pub symbol: String,
    pub position_amt: String,
    pub entry_price: String,
    pub unrealized_profit: String,
    pub leverage: String,
    pub position_side: String,
    /// 계좌 엔드포인트는 마크 가격을 포함하지 않을 수 있음
    #[serde(default)]
    pub mark_price: Option<String>,
}

impl AccountPosition {
    /// 도메인 포지션으로 변환합니다.
    pub fn to_position(&self) -> Position {
        Position {
            symbol: self.symbol.clone(),
            amount: parse_decimal(&self.position_amt),
            entry_price: parse_decimal(&self.entry_price),
            mark_price: self
                .mark_price
                .as_deref()
                .map(parse_decimal)
                .unwrap_or_default(),
            unrealized_pnl: parse_decimal(&self.unrealized_profit),
            leverage: parse_decimal(&self.leverage),
            side: PositionSide::from_str(&self.position_side).unwrap_or_default(),
        }
    }
}

/// 주문 제출 응답 (필요한 필드만).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderResponse {
    pub order_id: i64,
    #[allow(dead_code)]
    pub client_order_id: String,
    #[allow(dead_code)]
    pub status: String,
}

/// 취소 등 응답 본문을 버리는 호출용.
#[derive(Debug, Deserialize)]
pub(crate) struct IgnoredResponse {}

/// 바이낸스 에러 본문.
#[derive(Debug, Deserialize)]
pub(crate) struct BinanceErrorBody {
    pub code: i32,
    pub msg: String,
}

// ============================================================================
// WebSocket 이벤트 타입
// ============================================================================

/// 캔들(kline) 스트림 이벤트.
#[derive(Debug, Deserialize)]
pub(crate) struct WsKlineEvent {
    #[serde(rename = "e")]
    #[allow(dead_code)]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: WsKline,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WsKline {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    #[serde(rename = "q")]
    pub quote_volume: String,
    #[serde(rename = "x")]
    pub is_closed: bool,
}

impl WsKlineEvent {
    /// 도메인 캔들로 변환합니다.
    pub fn to_candle(&self) -> Candle {
        let k = &self.kline;
        Candle {
            symbol: self.symbol.clone(),
            timeframe: Timeframe::from_binance_interval(&k.interval).unwrap_or(Timeframe::M1),
            open_time: DateTime::from_timestamp_millis(k.open_time).unwrap_or_else(Utc::now),
            close_time: DateTime::from_timestamp_millis(k.close_time).unwrap_or_else(Utc::now),
            open: parse_decimal(&k.open),
            high: parse_decimal(&k.high),
            low: parse_decimal(&k.low),
            close: parse_decimal(&k.close),
            volume: parse_decimal(&k.volume),
            quote_volume: parse_decimal(&k.quote_volume),
        }
    }
}
