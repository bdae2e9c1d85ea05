//! 주문 게이트웨이.
//!
//! USD 명목 금액 기반 주문 제출 창구입니다. 파라미터 검증, 연결 상태
//! 확인, 사이징, 제출 순으로 진행하며 검증 실패는 제출 전에
//! 동기적으로 반환됩니다.

use crate::bus::{ConnectionState, PublicationBus};
use crate::error::{ExchangeError, ExchangeResult};
use crate::sizing::OrderSizingEngine;
use crate::traits::FuturesApi;
use rust_decimal::Decimal;
use std::sync::Arc;
use terminal_core::{DecimalExt, OrderRequest, PositionSide, Side, TimeInForce};
use tracing::info;

/// 허용 레버리지 범위.
const LEVERAGE_RANGE: std::ops::RangeInclusive<u32> = 1..=125;

/// USD 명목 금액 기반 주문 게이트웨이.
pub struct OrderGateway {
    api: Arc<dyn FuturesApi>,
    bus: Arc<PublicationBus>,
    sizing: OrderSizingEngine,
}

impl OrderGateway {
    /// 새 게이트웨이를 생성합니다.
    pub fn new(api: Arc<dyn FuturesApi>, bus: Arc<PublicationBus>) -> Self {
        let sizing = OrderSizingEngine::new(Arc::clone(&api));
        Self { api, bus, sizing }
    }

    /// USD 금액으로 시장가 주문을 제출합니다.
    ///
    /// 현재가를 조회해 수량으로 환산하고 단위 내림 후 제출합니다.
    /// 거래소 주문 ID를 반환합니다.
    pub async fn market_order_by_usd(
        &self,
        symbol: &str,
        side: Side,
        usd: Decimal,
        position_side: PositionSide,
    ) -> ExchangeResult<String> {
        Self::validate_usd(usd)?;
        self.ensure_connected()?;

        let price = self.api.ticker_price(symbol).await?;
        let sized = self.sizing.size_by_usd(symbol, usd, price).await?;

        let request = OrderRequest::market(symbol, side, sized.quantity_text, position_side)
            .with_generated_client_id();
        let order_id = self.api.submit_order(&request).await?;

        info!(
            symbol = %symbol,
            side = %side,
            quantity = %request.quantity,
            order_id = %order_id,
            "Market order submitted"
        );
        Ok(order_id)
    }

    /// USD 금액으로 지정가 주문을 제출합니다.
    pub async fn limit_order_by_usd(
        &self,
        symbol: &str,
        side: Side,
        usd: Decimal,
        price: Decimal,
        position_side: PositionSide,
        time_in_force: TimeInForce,
    ) -> ExchangeResult<String> {
        Self::validate_usd(usd)?;
        if price <= Decimal::ZERO {
            return Err(ExchangeError::InvalidParameter(format!(
                "limit price must be positive, got {}",
                price
            )));
        }
        self.ensure_connected()?;

        let sized = self.sizing.size_for_limit(symbol, usd, price).await?;
        let price_text = sized
            .price_text
            .ok_or_else(|| ExchangeError::Unknown("limit sizing missing price".to_string()))?;

        let request = OrderRequest::limit(
            symbol,
            side,
            sized.quantity_text,
            price_text,
            time_in_force,
            position_side,
        )
        .with_generated_client_id();
        let order_id = self.api.submit_order(&request).await?;

        info!(
            symbol = %symbol,
            side = %side,
            quantity = %request.quantity,
            price = %price,
            order_id = %order_id,
            "Limit order submitted"
        );
        Ok(order_id)
    }

    /// 포지션을 시장가 반대 주문으로 청산합니다.
    ///
    /// 보고된 포지션이 없거나 수량이 0이면 주문 없이 `Ok(None)`을
    /// 반환합니다. 청산 수량은 보고된 수량의 절대값을 그대로 쓰며
    /// 단위 내림을 거치지 않습니다.
    pub async fn close_position(
        &self,
        symbol: &str,
        position_side: PositionSide,
    ) -> ExchangeResult<Option<String>> {
        let positions = self.api.account_positions().await?;
        let Some(position) = positions
            .iter()
            .find(|p| p.symbol == symbol && p.side == position_side && !p.is_flat())
        else {
            info!(symbol = %symbol, "No open position to close");
            return Ok(None);
        };

        self.ensure_connected()?;

        let quantity = position.amount.abs().to_plain_string();
        let request = OrderRequest::market(symbol, position.closing_side(), quantity, position_side)
            .with_generated_client_id();
        let order_id = self.api.submit_order(&request).await?;

        info!(
            symbol = %symbol,
            side = %request.side,
            quantity = %request.quantity,
            order_id = %order_id,
            "Position close order submitted"
        );
        Ok(Some(order_id))
    }

    /// 심볼의 레버리지를 변경합니다. 허용 범위는 1..=125입니다.
    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        if !LEVERAGE_RANGE.contains(&leverage) {
            return Err(ExchangeError::InvalidParameter(format!(
                "leverage must be within {}..={}, got {}",
                LEVERAGE_RANGE.start(),
                LEVERAGE_RANGE.end(),
                leverage
            )));
        }

        self.api.change_leverage(symbol, leverage).await?;
        info!(symbol = %symbol, leverage, "Leverage changed");
        Ok(())
    }

    /// 헤지 모드를 활성화합니다.
    pub async fn enable_hedge_mode(&self) -> ExchangeResult<()> {
        self.api.change_position_mode(true).await?;
        info!("Hedge mode enabled");
        Ok(())
    }

    /// 헤지 모드를 비활성화합니다 (단방향 모드).
    pub async fn disable_hedge_mode(&self) -> ExchangeResult<()> {
        self.api.change_position_mode(false).await?;
        info!("Hedge mode disabled");
        Ok(())
    }

    /// 주문을 취소합니다.
    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> ExchangeResult<()> {
        self.api.cancel_order(symbol, order_id).await?;
        info!(symbol = %symbol, order_id = %order_id, "Order cancelled");
        Ok(())
    }

    fn validate_usd(usd: Decimal) -> ExchangeResult<()> {
        if usd <= Decimal::ZERO {
            return Err(ExchangeError::InvalidParameter(format!(
                "usd amount must be positive, got {}",
                usd
            )));
        }
        Ok(())
    }

    fn ensure_connected(&self) -> ExchangeResult<()> {
        if self.bus.status() != ConnectionState::Connected {
            return Err(ExchangeError::NotConnected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use terminal_core::{Candle, OrderType, Position, SymbolFilters, Timeframe};

    struct RecordingApi {
        positions: Vec<Position>,
        submitted: Mutex<Vec<OrderRequest>>,
    }

    impl RecordingApi {
        fn new() -> Self {
            Self {
                positions: Vec::new(),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn with_positions(positions: Vec<Position>) -> Self {
            Self {
                positions,
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn submitted(&self) -> Vec<OrderRequest> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FuturesApi for RecordingApi {
        async fn start_user_stream(&self) -> ExchangeResult<String> {
            Ok("key".to_string())
        }
        async fn keepalive_user_stream(&self) -> ExchangeResult<()> {
            Ok(())
        }
        async fn ticker_price(&self, _symbol: &str) -> ExchangeResult<Decimal> {
            Ok(dec!(50000))
        }
        async fn symbol_filters(&self, _symbol: &str) -> ExchangeResult<SymbolFilters> {
            Ok(SymbolFilters {
                min_qty: dec!(0.001),
                step_size: dec!(0.001),
                tick_size: dec!(0.10),
            })
        }
        async fn klines(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: Option<u32>,
        ) -> ExchangeResult<Vec<Candle>> {
            Ok(Vec::new())
        }
        async fn account_positions(&self) -> ExchangeResult<Vec<Position>> {
            Ok(self.positions.clone())
        }
        async fn change_leverage(&self, _symbol: &str, _leverage: u32) -> ExchangeResult<()> {
            Ok(())
        }
        async fn change_position_mode(&self, _dual_side: bool) -> ExchangeResult<()> {
            Ok(())
        }
        async fn submit_order(&self, request: &OrderRequest) -> ExchangeResult<String> {
            self.submitted.lock().unwrap().push(request.clone());
            Ok("42".to_string())
        }
        async fn cancel_order(&self, _symbol: &str, _order_id: &str) -> ExchangeResult<()> {
            Ok(())
        }
    }

    fn connected_bus() -> Arc<PublicationBus> {
        let bus = Arc::new(PublicationBus::new());
        bus.publish_status(ConnectionState::Connected);
        bus
    }

    #[tokio::test]
    async fn test_market_order_sizes_and_submits() {
        let api = Arc::new(RecordingApi::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        // 100 USD @ 50000 → 0.002
        let order_id = gateway
            .market_order_by_usd("BTCUSDT", Side::Buy, dec!(100), PositionSide::Both)
            .await
            .unwrap();

        assert_eq!(order_id, "42");
        let submitted = api.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].quantity, "0.002");
        assert_eq!(submitted[0].order_type, OrderType::Market);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_usd() {
        let api = Arc::new(RecordingApi::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        let err = gateway
            .market_order_by_usd("BTCUSDT", Side::Buy, Decimal::ZERO, PositionSide::Both)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::InvalidParameter(_)));
        assert!(api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_when_not_connected() {
        let api = Arc::new(RecordingApi::new());
        let bus = Arc::new(PublicationBus::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, bus);

        let err = gateway
            .market_order_by_usd("BTCUSDT", Side::Buy, dec!(100), PositionSide::Both)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::NotConnected));
        assert!(api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_limit_order_formats_price() {
        let api = Arc::new(RecordingApi::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        gateway
            .limit_order_by_usd(
                "BTCUSDT",
                Side::Sell,
                dec!(100),
                dec!(50000.15),
                PositionSide::Both,
                TimeInForce::Gtc,
            )
            .await
            .unwrap();

        let submitted = api.submitted();
        assert_eq!(submitted[0].order_type, OrderType::Limit);
        // tickSize 0.10 → 한 자리로 잘림
        assert_eq!(submitted[0].price.as_deref(), Some("50000.1"));
        assert_eq!(submitted[0].time_in_force, Some(TimeInForce::Gtc));
    }

    #[tokio::test]
    async fn test_close_position_without_position_is_noop() {
        let api = Arc::new(RecordingApi::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        let result = gateway
            .close_position("BTCUSDT", PositionSide::Both)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_close_short_position_buys_abs_quantity() {
        let api = Arc::new(RecordingApi::with_positions(vec![Position {
            symbol: "BTCUSDT".to_string(),
            amount: dec!(-0.0025),
            entry_price: dec!(50000),
            mark_price: dec!(50000),
            unrealized_pnl: Decimal::ZERO,
            leverage: dec!(10),
            side: PositionSide::Both,
        }]));
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        let order_id = gateway
            .close_position("BTCUSDT", PositionSide::Both)
            .await
            .unwrap();

        assert!(order_id.is_some());
        let submitted = api.submitted();
        assert_eq!(submitted[0].side, Side::Buy);
        // 단위 내림 없이 보고된 수량 그대로
        assert_eq!(submitted[0].quantity, "0.0025");
    }

    #[tokio::test]
    async fn test_leverage_bounds() {
        let api = Arc::new(RecordingApi::new());
        let gateway = OrderGateway::new(Arc::clone(&api) as Arc<dyn FuturesApi>, connected_bus());

        assert!(gateway.set_leverage("BTCUSDT", 125).await.is_ok());
        assert!(gateway.set_leverage("BTCUSDT", 1).await.is_ok());

        let err = gateway.set_leverage("BTCUSDT", 200).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidParameter(_)));

        let err = gateway.set_leverage("BTCUSDT", 0).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidParameter(_)));
    }
}
