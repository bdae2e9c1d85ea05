//! USD 명목 금액 기반 주문 사이징.
//!
//! `수량 = floor((usd / price) / stepSize) * stepSize`. 내림만 사용하므로
//! 산출 수량의 명목 가치는 요청 금액을 절대 넘지 않습니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::FuturesApi;
use rust_decimal::Decimal;
use std::sync::Arc;
use terminal_core::SymbolFilters;

/// 사이징이 끝난 주문 수량/가격.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedOrder {
    /// 단위 정렬된 수량
    pub quantity: Decimal,
    /// 제출용 수량 문자열
    pub quantity_text: String,
    /// 제출용 가격 문자열 (지정가 주문만)
    pub price_text: Option<String>,
}

/// 주문 사이징 엔진.
///
/// 심볼 필터는 주문마다 새로 조회합니다. 거래소 규칙 변경을 놓치지
/// 않는 쪽을 호출 비용보다 우선합니다.
pub struct OrderSizingEngine {
    api: Arc<dyn FuturesApi>,
}

impl OrderSizingEngine {
    /// 새 사이징 엔진을 생성합니다.
    pub fn new(api: Arc<dyn FuturesApi>) -> Self {
        Self { api }
    }

    /// 시장가 주문용 수량을 계산합니다. 현재가는 호출자가 조회해 넘깁니다.
    pub async fn size_by_usd(
        &self,
        symbol: &str,
        usd: Decimal,
        price: Decimal,
    ) -> ExchangeResult<SizedOrder> {
        let filters = self.api.symbol_filters(symbol).await?;
        let quantity = compute_quantity(&filters, usd, price)?;
        Ok(SizedOrder {
            quantity,
            quantity_text: format_quantity(&filters, quantity),
            price_text: None,
        })
    }

    /// 지정가 주문용 수량과 가격을 계산합니다.
    pub async fn size_for_limit(
        &self,
        symbol: &str,
        usd: Decimal,
        limit_price: Decimal,
    ) -> ExchangeResult<SizedOrder> {
        let filters = self.api.symbol_filters(symbol).await?;
        let quantity = compute_quantity(&filters, usd, limit_price)?;
        Ok(SizedOrder {
            quantity,
            quantity_text: format_quantity(&filters, quantity),
            price_text: Some(format_price(&filters, limit_price)),
        })
    }
}

/// 수량을 stepSize 배수로 내림합니다.
pub fn round_to_step(quantity: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return quantity;
    }
    (quantity / step).floor() * step
}

/// USD 금액과 가격으로 단위 정렬된 수량을 계산합니다.
///
/// 내림 결과가 minQty 미달이면 `OrderTooSmall`을 반환합니다.
pub fn compute_quantity(
    filters: &SymbolFilters,
    usd: Decimal,
    price: Decimal,
) -> ExchangeResult<Decimal> {
    if price <= Decimal::ZERO {
        return Err(ExchangeError::InvalidParameter(format!(
            "price must be positive, got {}",
            price
        )));
    }

    let raw = usd / price;
    let quantity = round_to_step(raw, filters.step_size);

    if !filters.meets_min_qty(quantity) {
        return Err(ExchangeError::OrderTooSmall {
            quantity,
            min_qty: filters.min_qty,
        });
    }

    Ok(quantity)
}

/// 수량을 제출용 문자열로 포맷합니다.
pub fn format_quantity(filters: &SymbolFilters, quantity: Decimal) -> String {
    quantity
        .round_dp_with_strategy(
            filters.quantity_precision(),
            rust_decimal::RoundingStrategy::ToZero,
        )
        .normalize()
        .to_string()
}

/// 가격을 tickSize 정밀도의 제출용 문자열로 포맷합니다.
pub fn format_price(filters: &SymbolFilters, price: Decimal) -> String {
    price
        .round_dp_with_strategy(
            filters.price_precision(),
            rust_decimal::RoundingStrategy::ToZero,
        )
        .normalize()
        .to_string()
}
