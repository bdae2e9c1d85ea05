//! 실시간 스트림 관찰 명령.
//!
//! 연결을 수립하고 마감 캔들, 포지션 스냅샷, 연결 상태 변화를
//! 표준 출력으로 내보냅니다. Ctrl+C로 종료합니다.

use crate::commands::session::TerminalSession;
use anyhow::Result;
use terminal_core::{Position, Timeframe};
use tracing::info;

/// 스트림을 구독하고 이벤트를 출력합니다.
pub async fn run_stream(session: &TerminalSession, symbol: &str, timeframe: Timeframe) -> Result<()> {
    let mut candles = session.bus.subscribe_candles();
    let mut positions = session.bus.subscribe_positions();
    let mut status = session.bus.subscribe_status();

    session.connect_and_wait(symbol, timeframe).await?;
    println!("연결 완료: {} {} (Ctrl+C로 종료)", symbol, timeframe);

    loop {
        tokio::select! {
            result = candles.changed() => {
                if result.is_err() {
                    break;
                }
                if let Some(candle) = candles.borrow_and_update().clone() {
                    println!(
                        "[캔들] {} {} O:{} H:{} L:{} C:{} V:{}",
                        candle.symbol,
                        candle.close_time.format("%Y-%m-%d %H:%M:%S"),
                        candle.open,
                        candle.high,
                        candle.low,
                        candle.close,
                        candle.volume
                    );
                }
            }
            result = positions.changed() => {
                if result.is_err() {
                    break;
                }
                let snapshot = positions.borrow_and_update().clone();
                print_positions(&snapshot);
            }
            result = status.changed() => {
                if result.is_err() {
                    break;
                }
                let state = *status.borrow_and_update();
                println!("[상태] {}", state);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    session.supervisor.destroy();
    println!("연결 종료");
    Ok(())
}

/// 포지션 스냅샷 출력.
fn print_positions(positions: &[Position]) {
    if positions.is_empty() {
        println!("[포지션] 없음");
        return;
    }
    for position in positions {
        println!(
            "[포지션] {} {} 수량:{} 진입가:{} 미실현손익:{}",
            position.symbol,
            position.side,
            position.amount,
            position.entry_price,
            position.unrealized_pnl
        );
    }
}
