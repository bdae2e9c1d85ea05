//! 거래소 심볼 필터.
//!
//! 바이낸스 exchangeInfo가 보고하는 수량/가격 단위 제약을 나타냅니다.
//! 주문 사이징은 이 제약을 기준으로 수량을 내림 처리합니다.

use crate::types::{DecimalExt, Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 심볼별 주문 제약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// 최소 주문 수량 (LOT_SIZE minQty)
    pub min_qty: Quantity,
    /// 수량 단위 (LOT_SIZE stepSize)
    pub step_size: Quantity,
    /// 가격 단위 (PRICE_FILTER tickSize)
    pub tick_size: Price,
}

impl SymbolFilters {
    /// 수량의 소수점 자릿수를 반환합니다.
    ///
    /// stepSize `0.001` → 3자리.
    pub fn quantity_precision(&self) -> u32 {
        self.step_size.decimal_places()
    }

    /// 가격의 소수점 자릿수를 반환합니다.
    ///
    /// tickSize의 후행 0은 의도적으로 자릿수에 세지 않습니다:
    /// `0.10` → 1자리. 틱 단위로 내림한 가격은 1자리로 표기해도
    /// 여전히 틱의 배수이므로 거래소 제약을 그대로 만족합니다.
    pub fn price_precision(&self) -> u32 {
        self.tick_size.decimal_places()
    }

    /// 수량이 최소 주문 수량 이상인지 확인합니다.
    pub fn meets_min_qty(&self, quantity: Decimal) -> bool {
        quantity >= self.min_qty
    }
}
