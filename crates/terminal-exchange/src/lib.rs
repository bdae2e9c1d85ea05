//! # Terminal Exchange
//!
//! 바이낸스 USD-M 선물 연결 계층.
//!
//! 이 크레이트는 터미널과 거래소 사이의 모든 연결 책임을 담당합니다:
//! - 연결 수명주기 상태 머신과 지수 백오프 재연결
//! - 리슨 키 세션 관리 (획득 + 주기적 갱신)
//! - 단일 WebSocket으로 시장/계좌 스트림 다중화
//! - 포지션 스냅샷 동기화
//! - USD 명목 금액 기반 주문 사이징과 주문 게이트웨이
//! - 최신값 재생(replay-latest) 발행 버스

pub mod backoff;
pub mod bus;
pub mod connector;
pub mod error;
pub mod gateway;
pub mod positions;
pub mod sizing;
pub mod traits;

pub use backoff::ReconnectPolicy;
pub use bus::{ConnectionState, PublicationBus};
pub use connector::binance::{
    BinanceFuturesClient, BinanceFuturesConfig, BinanceSessionFactory, ConnectionSupervisor,
    ListenKeyManager, StreamRouter,
};
pub use error::{ExchangeError, ExchangeResult};
pub use gateway::OrderGateway;
pub use positions::PositionSynchronizer;
pub use sizing::OrderSizingEngine;
pub use traits::{AccountEvent, FuturesApi, Session, SessionFactory, StreamHandles};
