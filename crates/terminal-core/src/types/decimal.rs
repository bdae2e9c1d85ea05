//! 정밀한 금융 계산을 위한 Decimal 유틸리티.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 소수점 이하 유효 자릿수를 반환합니다 (후행 0 제외).
    ///
    /// 예: `0.001` → 3, `0.010` → 2, `1` → 0.
    fn decimal_places(&self) -> u32;

    /// 후행 0을 제거한 일반 십진 문자열을 반환합니다.
    fn to_plain_string(&self) -> String;
}

impl DecimalExt for Decimal {
    fn decimal_places(&self) -> u32 {
        self.normalize().scale()
    }

    fn to_plain_string(&self) -> String {
        self.normalize().to_string()
    }
}
