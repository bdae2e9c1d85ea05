//! 바이낸스 USD-M 선물 커넥터.
//!
//! REST 클라이언트, 리슨 키 세션 관리, WebSocket 스트림 라우터,
//! 연결 슈퍼바이저로 구성됩니다.

mod config;
mod models;
mod rest;
mod session;
mod stream;
mod supervisor;

pub use config::BinanceFuturesConfig;
pub use rest::BinanceFuturesClient;
pub use session::{ListenKeyManager, KEEPALIVE_INTERVAL};
pub use stream::StreamRouter;
pub use supervisor::{BinanceSessionFactory, ConnectionSupervisor};
