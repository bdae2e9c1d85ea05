//! 발행 버스.
//!
//! 마지막 마감 캔들, 현재 포지션 집합, 연결 상태를 `tokio::sync::watch`
//! 채널로 발행합니다. watch 채널은 늦게 구독한 쪽에도 항상 최신값을
//! 전달하므로 이력 버퍼 없이 재생(replay-latest) 의미론을 얻습니다.
//!
//! 채널별 쓰기 주체는 하나입니다:
//! - 상태: 연결 슈퍼바이저
//! - 캔들: 스트림 소비 태스크
//! - 포지션: 포지션 동기화기

use std::fmt;
use terminal_core::{Candle, Position};
use tokio::sync::watch;

/// 연결 수명주기 상태.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// 연결 없음 (초기 상태 또는 종료 후)
    #[default]
    Disconnected,
    /// 연결 시도 중 (재시도 포함)
    Connecting,
    /// 스트림 수신 중
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// 최신값 재생 발행 버스.
pub struct PublicationBus {
    candle_tx: watch::Sender<Option<Candle>>,
    positions_tx: watch::Sender<Vec<Position>>,
    status_tx: watch::Sender<ConnectionState>,
}

impl PublicationBus {
    /// 새 버스를 생성합니다. 초기 상태는 `Disconnected`, 캔들 없음,
    /// 빈 포지션 집합입니다.
    pub fn new() -> Self {
        let (candle_tx, _) = watch::channel(None);
        let (positions_tx, _) = watch::channel(Vec::new());
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            candle_tx,
            positions_tx,
            status_tx,
        }
    }

    /// 마감 캔들 채널을 구독합니다.
    pub fn subscribe_candles(&self) -> watch::Receiver<Option<Candle>> {
        self.candle_tx.subscribe()
    }

    /// 포지션 집합 채널을 구독합니다.
    pub fn subscribe_positions(&self) -> watch::Receiver<Vec<Position>> {
        self.positions_tx.subscribe()
    }

    /// 연결 상태 채널을 구독합니다.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    /// 마감 캔들을 발행합니다.
    pub fn publish_candle(&self, candle: Candle) {
        // 구독자가 없어도 최신값은 유지되어야 한다
        let _ = self.candle_tx.send_replace(Some(candle));
    }

    /// 포지션 집합 전체를 교체 발행합니다.
    pub fn publish_positions(&self, positions: Vec<Position>) {
        let _ = self.positions_tx.send_replace(positions);
    }

    /// 연결 상태를 발행합니다.
    pub fn publish_status(&self, state: ConnectionState) {
        let _ = self.status_tx.send_replace(state);
    }

    /// 현재 연결 상태를 반환합니다.
    pub fn status(&self) -> ConnectionState {
        *self.status_tx.borrow()
    }

    /// 현재 포지션 집합을 반환합니다.
    pub fn positions(&self) -> Vec<Position> {
        self.positions_tx.borrow().clone()
    }

    /// 마지막 마감 캔들을 반환합니다.
    pub fn latest_candle(&self) -> Option<Candle> {
        self.candle_tx.borrow().clone()
    }
}

impl Default for PublicationBus {
    fn default() -> Self {
        Self::new()
    }
}
