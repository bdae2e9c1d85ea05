//! 터미널 세션 구성.
//!
//! 환경 변수의 API 자격증명으로 REST 클라이언트, 발행 버스, 연결
//! 슈퍼바이저, 주문 게이트웨이를 조립합니다. 일회성 주문 명령은
//! `connect_and_wait`로 연결을 수립한 뒤 게이트웨이를 사용합니다.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use terminal_core::{ExchangeSettings, Timeframe};
use terminal_exchange::{
    BinanceFuturesClient, BinanceFuturesConfig, BinanceSessionFactory, ConnectionState,
    ConnectionSupervisor, FuturesApi, OrderGateway, PositionSynchronizer, PublicationBus,
};
use tracing::info;

/// 연결 수립 대기 한도.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// 조립된 터미널 세션.
pub struct TerminalSession {
    pub api: Arc<dyn FuturesApi>,
    pub bus: Arc<PublicationBus>,
    pub supervisor: ConnectionSupervisor<BinanceSessionFactory>,
    pub gateway: OrderGateway,
}

impl TerminalSession {
    /// 환경 변수와 설정 파일에서 세션을 조립합니다.
    ///
    /// 자격증명은 환경 변수에서 읽습니다 (`BINANCE_FUTURES_API_KEY` /
    /// `BINANCE_FUTURES_API_SECRET`, `BINANCE_FUTURES_TESTNET=true`).
    /// 타임아웃/수신 윈도우와 테스트넷 기본값은 설정 파일의 거래소
    /// 섹션에서 옵니다.
    pub fn from_env(settings: &ExchangeSettings) -> Result<Self> {
        let mut config = BinanceFuturesConfig::from_env().context(
            "Missing API credentials. Set BINANCE_FUTURES_API_KEY and BINANCE_FUTURES_API_SECRET",
        )?;
        config.testnet = config.testnet || settings.testnet;
        config.timeout_secs = settings.timeout_secs;
        config.recv_window = settings.recv_window_ms;
        info!(?config, "Exchange client configured");

        let client = BinanceFuturesClient::new(config.clone())?;
        let api: Arc<dyn FuturesApi> = Arc::new(client);

        let bus = Arc::new(PublicationBus::new());
        let synchronizer = Arc::new(PositionSynchronizer::new(Arc::clone(&api), Arc::clone(&bus)));
        let factory = Arc::new(BinanceSessionFactory::from_config(Arc::clone(&api), &config));
        let supervisor = ConnectionSupervisor::new(factory, Arc::clone(&bus), synchronizer);
        let gateway = OrderGateway::new(Arc::clone(&api), Arc::clone(&bus));

        Ok(Self {
            api,
            bus,
            supervisor,
            gateway,
        })
    }

    /// 연결을 시작하고 `Connected`가 될 때까지 기다립니다.
    ///
    /// 재시도가 소진되어 `Disconnected`로 돌아오면 에러를 반환합니다.
    pub async fn connect_and_wait(&self, symbol: &str, timeframe: Timeframe) -> Result<()> {
        let mut status = self.bus.subscribe_status();
        self.supervisor.connect(symbol, timeframe);

        let wait = async {
            let mut seen_connecting = false;
            loop {
                let state = *status.borrow_and_update();
                match state {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Connecting => seen_connecting = true,
                    ConnectionState::Disconnected if seen_connecting => {
                        anyhow::bail!("Connection failed, reconnect attempts exhausted")
                    }
                    ConnectionState::Disconnected => {}
                }
                status
                    .changed()
                    .await
                    .map_err(|_| anyhow::anyhow!("Status channel closed"))?;
            }
        };

        tokio::time::timeout(CONNECT_TIMEOUT, wait)
            .await
            .context("Timed out waiting for connection")?
    }
}
