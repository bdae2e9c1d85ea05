//! 주문 명령 구현.
//!
//! 주문 제출 명령은 게이트웨이가 연결 상태를 요구하므로 먼저 연결을
//! 수립한 뒤 제출하고, 끝나면 연결을 정리합니다. 레버리지/헤지 모드
//! 변경은 REST 단독 호출이라 연결 없이 수행합니다.

use crate::commands::session::TerminalSession;
use anyhow::Result;
use rust_decimal::Decimal;
use terminal_core::{PositionSide, Side, TimeInForce, Timeframe};

/// USD 금액 시장가 주문.
pub async fn market_order(
    session: &TerminalSession,
    symbol: &str,
    side: Side,
    usd: Decimal,
    position_side: PositionSide,
) -> Result<()> {
    session.connect_and_wait(symbol, Timeframe::M1).await?;

    let result = session
        .gateway
        .market_order_by_usd(symbol, side, usd, position_side)
        .await;
    session.supervisor.destroy();

    let order_id = result?;
    println!("시장가 주문 제출 완료: {} {} {}USD (주문 ID: {})", symbol, side, usd, order_id);
    Ok(())
}

/// USD 금액 지정가 주문.
#[allow(clippy::too_many_arguments)]
pub async fn limit_order(
    session: &TerminalSession,
    symbol: &str,
    side: Side,
    usd: Decimal,
    price: Decimal,
    position_side: PositionSide,
    time_in_force: TimeInForce,
) -> Result<()> {
    session.connect_and_wait(symbol, Timeframe::M1).await?;

    let result = session
        .gateway
        .limit_order_by_usd(symbol, side, usd, price, position_side, time_in_force)
        .await;
    session.supervisor.destroy();

    let order_id = result?;
    println!(
        "지정가 주문 제출 완료: {} {} {}USD @ {} (주문 ID: {})",
        symbol, side, usd, price, order_id
    );
    Ok(())
}

/// 포지션 청산.
pub async fn close_position(
    session: &TerminalSession,
    symbol: &str,
    position_side: PositionSide,
) -> Result<()> {
    session.connect_and_wait(symbol, Timeframe::M1).await?;

    let result = session.gateway.close_position(symbol, position_side).await;
    session.supervisor.destroy();

    match result? {
        Some(order_id) => println!("청산 주문 제출 완료: {} (주문 ID: {})", symbol, order_id),
        None => println!("청산할 포지션 없음: {}", symbol),
    }
    Ok(())
}

/// 주문 취소.
pub async fn cancel_order(session: &TerminalSession, symbol: &str, order_id: &str) -> Result<()> {
    session.gateway.cancel_order(symbol, order_id).await?;
    println!("주문 취소 완료: {} (주문 ID: {})", symbol, order_id);
    Ok(())
}

/// 레버리지 변경.
pub async fn set_leverage(session: &TerminalSession, symbol: &str, leverage: u32) -> Result<()> {
    session.gateway.set_leverage(symbol, leverage).await?;
    println!("레버리지 변경 완료: {} → {}x", symbol, leverage);
    Ok(())
}

/// 헤지 모드 설정.
pub async fn set_hedge_mode(session: &TerminalSession, enabled: bool) -> Result<()> {
    if enabled {
        session.gateway.enable_hedge_mode().await?;
        println!("헤지 모드 활성화 완료");
    } else {
        session.gateway.disable_hedge_mode().await?;
        println!("헤지 모드 비활성화 완료 (단방향 모드)");
    }
    Ok(())
}
