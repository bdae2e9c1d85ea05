//! 거래소 추상화 트레이트.
//!
//! REST 기능 전체를 `FuturesApi` 하나로 묶고, 스트림 세션 수립을
//! `SessionFactory`로 분리합니다. 두 이음새 모두 테스트에서 가짜
//! 구현으로 대체됩니다.

use crate::error::ExchangeResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use terminal_core::{Candle, OrderRequest, Position, SymbolFilters, Timeframe};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::ExchangeError;

/// 사용자 데이터 스트림에서 포지션 재동기화를 유발하는 계좌 이벤트.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEvent {
    /// 잔고/포지션 변경 (`ACCOUNT_UPDATE`)
    AccountUpdate,
    /// 주문 체결/상태 변경 (`ORDER_TRADE_UPDATE`)
    OrderTradeUpdate,
}

/// 바이낸스 USD-M 선물 REST 기능.
#[async_trait]
pub trait FuturesApi: Send + Sync {
    /// 사용자 데이터 스트림 리슨 키를 발급합니다.
    async fn start_user_stream(&self) -> ExchangeResult<String>;

    /// 리슨 키 유효 기간을 연장합니다.
    async fn keepalive_user_stream(&self) -> ExchangeResult<()>;

    /// 현재 시장 가격을 조회합니다.
    async fn ticker_price(&self, symbol: &str) -> ExchangeResult<Decimal>;

    /// 심볼의 수량/가격 단위 제약을 조회합니다.
    async fn symbol_filters(&self, symbol: &str) -> ExchangeResult<SymbolFilters>;

    /// 과거 캔들을 조회합니다.
    async fn klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: Option<u32>,
    ) -> ExchangeResult<Vec<Candle>>;

    /// 계좌의 전체 포지션을 조회합니다 (수량 0 포함).
    async fn account_positions(&self) -> ExchangeResult<Vec<Position>>;

    /// 심볼의 레버리지를 변경합니다.
    async fn change_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()>;

    /// 포지션 모드를 변경합니다 (true = 헤지 모드).
    async fn change_position_mode(&self, dual_side: bool) -> ExchangeResult<()>;

    /// 주문을 제출하고 거래소 주문 ID를 반환합니다.
    async fn submit_order(&self, request: &OrderRequest) -> ExchangeResult<String>;

    /// 주문을 취소합니다.
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<()>;
}

/// 열린 스트림 세션의 수신 핸들.
pub struct StreamHandles {
    /// 마감 캔들 수신기
    pub candles: mpsc::Receiver<Candle>,
    /// 계좌 이벤트 수신기
    pub account_events: mpsc::Receiver<AccountEvent>,
    /// 연결 수준 실패 통지. 종료 신호로 정상 종료하면 송신 없이 닫힙니다.
    pub failure: oneshot::Receiver<ExchangeError>,
}

/// 수립된 세션. 핸들과 세션에 묶인 백그라운드 태스크를 함께 전달합니다.
pub struct Session {
    /// 스트림 수신 핸들
    pub streams: StreamHandles,
    /// 리슨 키 갱신 태스크. 세션이 끝나면 중단해야 합니다.
    pub keepalive: JoinHandle<()>,
}

/// 스트림 세션 팩토리.
///
/// 리슨 키 발급부터 소켓 수립/구독까지 한 번의 연결 시도 전체를
/// 담당합니다. 슈퍼바이저는 이 트레이트 너머의 구현을 모릅니다.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// 세션을 엽니다. 어느 단계에서 실패해도 한 번의 시도 실패입니다.
    async fn open_session(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        shutdown: watch::Receiver<bool>,
    ) -> ExchangeResult<Session>;
}
