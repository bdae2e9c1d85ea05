//! 포지션 추적 및 관리.
//!
//! 이 모듈은 선물 포지션 관련 타입을 정의합니다:
//! - `PositionSide` - 포지션 방향 (단방향/헤지 모드)
//! - `Position` - 거래소 계좌가 보고하는 개별 포지션

use crate::domain::Side;
use crate::types::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 포지션 방향.
///
/// 단방향 모드에서는 `Both`가 사용되며 수량 부호가 방향을 나타냅니다.
/// 헤지 모드에서는 `Long`/`Short`가 구분됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    /// 단방향 모드
    #[default]
    Both,
    /// 헤지 모드 롱
    Long,
    /// 헤지 모드 숏
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Both => write!(f, "BOTH"),
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for PositionSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BOTH" => Ok(PositionSide::Both),
            "LONG" => Ok(PositionSide::Long),
            "SHORT" => Ok(PositionSide::Short),
            _ => Err(format!("Invalid position side: {}", s)),
        }
    }
}

/// 거래소 계좌가 보고하는 선물 포지션.
///
/// 수량은 부호 있는 값입니다. 단방향 모드에서 양수는 롱, 음수는 숏입니다.
/// 수량이 0인 포지션은 발행 대상에서 제외됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼 (거래소 형식)
    pub symbol: String,
    /// 부호 있는 포지션 수량
    pub amount: Quantity,
    /// 평균 진입 가격
    pub entry_price: Price,
    /// 마크 가격
    pub mark_price: Price,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 레버리지
    pub leverage: Decimal,
    /// 포지션 방향
    pub side: PositionSide,
}

impl Position {
    /// 수량이 0인지 확인합니다.
    pub fn is_flat(&self) -> bool {
        self.amount.is_zero()
    }

    /// 이 포지션을 청산하는 주문 방향을 반환합니다.
    ///
    /// 롱(양수 수량)은 매도로, 숏(음수 수량)은 매수로 청산합니다.
    pub fn closing_side(&self) -> Side {
        if self.amount > Decimal::ZERO {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// 포지션의 명목 가치(절대값)를 반환합니다.
    pub fn notional_value(&self) -> Decimal {
        (self.mark_price * self.amount).abs()
    }
}
