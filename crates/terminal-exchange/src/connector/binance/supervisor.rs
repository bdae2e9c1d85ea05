//! 연결 슈퍼바이저.
//!
//! 연결 수명주기 상태 머신을 소유합니다. 상태 채널의 유일한 쓰기
//! 주체이며, 재연결 루프와 세션 소비 태스크를 관리합니다.
//!
//! 상태 전이:
//! - `Disconnected` → `Connecting`: `connect()` 호출
//! - `Connecting` → `Connected`: 세션 수립 성공
//! - `Connecting` → `Disconnected`: 재시도 한도 소진 또는 `destroy()`
//! - `Connected` → `Connecting`: 스트림이 연결 수준 에러를 통지
//! - `Connected` → `Disconnected`: `destroy()` 또는 정상 종료

use crate::backoff::ReconnectPolicy;
use crate::bus::{ConnectionState, PublicationBus};
use crate::connector::binance::config::BinanceFuturesConfig;
use crate::connector::binance::session::ListenKeyManager;
use crate::connector::binance::stream::StreamRouter;
use crate::error::ExchangeResult;
use crate::positions::PositionSynchronizer;
use crate::traits::{FuturesApi, Session, SessionFactory};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use terminal_core::Timeframe;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 바이낸스 세션 팩토리.
///
/// 리슨 키 발급, 갱신 태스크 시작, 소켓 수립/구독까지
/// 한 번의 연결 시도 전체를 수행합니다.
pub struct BinanceSessionFactory {
    api: Arc<dyn FuturesApi>,
    router: StreamRouter,
}

impl BinanceSessionFactory {
    /// 새 팩토리를 생성합니다.
    pub fn new(api: Arc<dyn FuturesApi>, ws_url: impl Into<String>) -> Self {
        Self {
            api,
            router: StreamRouter::new(ws_url),
        }
    }

    /// 클라이언트 설정에서 팩토리를 생성합니다.
    pub fn from_config(api: Arc<dyn FuturesApi>, config: &BinanceFuturesConfig) -> Self {
        Self::new(api, config.ws_base_url())
    }
}

#[async_trait]
impl SessionFactory for BinanceSessionFactory {
    async fn open_session(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        shutdown: watch::Receiver<bool>,
    ) -> ExchangeResult<Session> {
        let manager = ListenKeyManager::new(Arc::clone(&self.api));
        let listen_key = manager.acquire().await?;
        let keepalive = manager.spawn_keepalive(shutdown.clone());

        match self
            .router
            .open(symbol, timeframe, &listen_key, shutdown)
            .await
        {
            Ok(streams) => Ok(Session { streams, keepalive }),
            Err(e) => {
                keepalive.abort();
                Err(e)
            }
        }
    }
}

/// 연결 수명주기 슈퍼바이저.
pub struct ConnectionSupervisor<F: SessionFactory> {
    factory: Arc<F>,
    bus: Arc<PublicationBus>,
    synchronizer: Arc<PositionSynchronizer>,
    policy: ReconnectPolicy,
    /// 현재 세대의 종료 채널. `connect()`마다 새 채널로 교체된다.
    shutdown_tx: Mutex<watch::Sender<bool>>,
}

impl<F: SessionFactory> ConnectionSupervisor<F> {
    /// 새 슈퍼바이저를 생성합니다.
    pub fn new(
        factory: Arc<F>,
        bus: Arc<PublicationBus>,
        synchronizer: Arc<PositionSynchronizer>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            factory,
            bus,
            synchronizer,
            policy: ReconnectPolicy::default(),
            shutdown_tx: Mutex::new(shutdown_tx),
        }
    }

    /// 재연결 정책을 교체합니다.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 연결을 시작합니다.
    ///
    /// 이미 연결 중이거나 연결된 상태면 아무것도 하지 않습니다.
    pub fn connect(&self, symbol: &str, timeframe: Timeframe) {
        let mut shutdown_tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.bus.status() != ConnectionState::Disconnected {
            debug!(status = %self.bus.status(), "connect() ignored, already active");
            return;
        }

        // 연결마다 새 종료 채널을 쓴다. 이전 세대의 루프와 태스크는 자기
        // 채널에 이미 올라간 종료 신호만 보게 되어, destroy() 직후의
        // connect()가 이전 루프를 되살리지 못한다.
        let (tx, shutdown_rx) = watch::channel(false);
        *shutdown_tx = tx;

        self.bus.publish_status(ConnectionState::Connecting);

        let factory = Arc::clone(&self.factory);
        let bus = Arc::clone(&self.bus);
        let synchronizer = Arc::clone(&self.synchronizer);
        let policy = self.policy;
        let symbol = symbol.to_string();

        tokio::spawn(async move {
            drive(factory, bus, synchronizer, policy, shutdown_rx, symbol, timeframe).await;
        });
    }

    /// 연결을 해제합니다.
    ///
    /// 재연결 루프, 리슨 키 갱신, 스트림 태스크에 하나의 종료 신호를
    /// 보내고 `Disconnected`를 발행합니다. 종료 경로의 `Disconnected`
    /// 발행 주체는 이 메서드 하나입니다. 반복 호출해도 안전합니다.
    pub fn destroy(&self) {
        let shutdown_tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        info!("Destroying connection");
        shutdown_tx.send_replace(true);
        self.bus.publish_status(ConnectionState::Disconnected);
    }
}

/// 재연결 루프.
///
/// 즉시 첫 시도를 하고, 실패마다 `min(base * 2^n, cap)` 지연 후
/// 재시도합니다. 연속 실패가 한도에 도달하면 영구 중단합니다.
/// 세션 수립에 성공하면 연속 실패 횟수를 초기화합니다.
///
/// 종료 채널은 루프 세대마다 하나이고 쓰기는 `destroy()`의 `true`뿐이므로,
/// 채널 알림은 곧 종료입니다. 종료 경로에서는 상태를 발행하지 않습니다.
/// `destroy()`가 이미 `Disconnected`를 발행했고, 이 루프보다 새 세대의
/// 루프가 이미 돌고 있을 수 있습니다.
async fn drive<F: SessionFactory>(
    factory: Arc<F>,
    bus: Arc<PublicationBus>,
    synchronizer: Arc<PositionSynchronizer>,
    policy: ReconnectPolicy,
    mut shutdown_rx: watch::Receiver<bool>,
    symbol: String,
    timeframe: Timeframe,
) {
    let mut failures: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            return;
        }

        match factory
            .open_session(&symbol, timeframe, shutdown_rx.clone())
            .await
        {
            Ok(session) => {
                // 수립 도중 종료 신호가 왔으면 세션을 버린다
                if *shutdown_rx.borrow() {
                    session.keepalive.abort();
                    return;
                }

                failures = 0;
                info!(symbol = %symbol, "Session established");
                bus.publish_status(ConnectionState::Connected);

                let Session {
                    streams,
                    keepalive,
                } = session;

                // 연결 직후 포지션 스냅샷 동기화
                synchronizer.refresh().await;

                // 캔들 펌프: 스트림 종료 시 송신자가 닫히며 함께 끝난다
                let candle_bus = Arc::clone(&bus);
                let mut candles = streams.candles;
                tokio::spawn(async move {
                    while let Some(candle) = candles.recv().await {
                        candle_bus.publish_candle(candle);
                    }
                });

                let trigger_loop = synchronizer.spawn_trigger_loop(streams.account_events);

                let mut failure = streams.failure;
                tokio::select! {
                    result = &mut failure => {
                        keepalive.abort();
                        trigger_loop.abort();
                        match result {
                            Ok(e) => {
                                warn!(error = %e, "Session lost, reconnecting");
                                bus.publish_status(ConnectionState::Connecting);
                                continue;
                            }
                            Err(_) => {
                                // 통지 없이 닫힘 = 종료 신호에 의한 정상 종료
                                debug!("Session ended cleanly");
                                return;
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        keepalive.abort();
                        trigger_loop.abort();
                        return;
                    }
                }
            }
            Err(e) => {
                // 시도 중 종료됐으면 소진/재시도 판단 없이 끝낸다
                if *shutdown_rx.borrow() {
                    return;
                }

                failures += 1;

                if policy.is_exhausted(failures) {
                    error!(
                        error = %e,
                        attempts = failures,
                        "Reconnect attempts exhausted, giving up"
                    );
                    bus.publish_status(ConnectionState::Disconnected);
                    return;
                }

                let delay = policy.delay_for(failures - 1);
                warn!(
                    error = %e,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    "Connection attempt failed, retrying"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_rx.changed() => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchangeError;
    use crate::traits::{AccountEvent, StreamHandles};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use terminal_core::{Candle, OrderRequest, Position, SymbolFilters};
    use tokio::sync::{mpsc, oneshot};

    struct NullApi;

    #[async_trait]
    impl FuturesApi for NullApi {
        async fn start_user_stream(&self) -> ExchangeResult<String> {
            Ok("key".to_string())
        }
        async fn keepalive_user_stream(&self) -> ExchangeResult<()> {
            Ok(())
        }
        async fn ticker_price(&self, _symbol: &str) -> ExchangeResult<Decimal> {
            Ok(dec!(50000))
        }
        async fn symbol_filters(&self, _symbol: &str) -> ExchangeResult<SymbolFilters> {
            Ok(SymbolFilters {
                min_qty: dec!(0.001),
                step_size: dec!(0.001),
                tick_size: dec!(0.1),
            })
        }
        async fn klines(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: Option<u32>,
        ) -> ExchangeResult<Vec<Candle>> {
            Ok(Vec::new())
        }
        async fn account_positions(&self) -> ExchangeResult<Vec<Position>> {
            Ok(Vec::new())
        }
        async fn change_leverage(&self, _symbol: &str, _leverage: u32) -> ExchangeResult<()> {
            Ok(())
        }
        async fn change_position_mode(&self, _dual_side: bool) -> ExchangeResult<()> {
            Ok(())
        }
        async fn submit_order(&self, _request: &OrderRequest) -> ExchangeResult<String> {
            Ok("1".to_string())
        }
        async fn cancel_order(&self, _symbol: &str, _order_id: &str) -> ExchangeResult<()> {
            Ok(())
        }
    }

    /// 테스트가 세션 채널을 직접 조작할 수 있게 하는 컨트롤러.
    struct SessionControl {
        candle_tx: mpsc::Sender<Candle>,
        #[allow(dead_code)]
        account_tx: mpsc::Sender<AccountEvent>,
        failure_tx: oneshot::Sender<ExchangeError>,
    }

    /// 처음 `fail_count`번 실패한 뒤 세션을 여는 가짜 팩토리.
    struct ScriptedFactory {
        attempts: AtomicU32,
        fail_count: u32,
        controls: std::sync::Mutex<Vec<SessionControl>>,
    }

    impl ScriptedFactory {
        fn failing_first(fail_count: u32) -> Self {
            Self {
                attempts: AtomicU32::new(0),
                fail_count,
                controls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self::failing_first(u32::MAX)
        }

        fn pop_control(&self) -> SessionControl {
            self.controls.lock().unwrap().pop().expect("no session opened")
        }
    }

    #[async_trait]
    impl SessionFactory for ScriptedFactory {
        async fn open_session(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _shutdown: watch::Receiver<bool>,
        ) -> ExchangeResult<Session> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_count {
                return Err(ExchangeError::NetworkError("connection refused".to_string()));
            }

            let (candle_tx, candles) = mpsc::channel(16);
            let (account_tx, account_events) = mpsc::channel(16);
            let (failure_tx, failure) = oneshot::channel();

            self.controls.lock().unwrap().push(SessionControl {
                candle_tx,
                account_tx,
                failure_tx,
            });

            Ok(Session {
                streams: StreamHandles {
                    candles,
                    account_events,
                    failure,
                },
                keepalive: tokio::spawn(async {}),
            })
        }
    }

    fn supervisor_with(
        factory: Arc<ScriptedFactory>,
    ) -> (ConnectionSupervisor<ScriptedFactory>, Arc<PublicationBus>) {
        let bus = Arc::new(PublicationBus::new());
        let api: Arc<dyn FuturesApi> = Arc::new(NullApi);
        let synchronizer = Arc::new(PositionSynchronizer::new(api, Arc::clone(&bus)));
        let supervisor = ConnectionSupervisor::new(factory, Arc::clone(&bus), synchronizer);
        (supervisor, bus)
    }

    async fn wait_for_status(
        rx: &mut watch::Receiver<ConnectionState>,
        want: ConnectionState,
    ) {
        loop {
            if *rx.borrow() == want {
                return;
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_ten_failures() {
        let factory = Arc::new(ScriptedFactory::always_failing());
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connecting).await;
        wait_for_status(&mut status, ConnectionState::Disconnected).await;

        // 10번 시도 후 영구 중단, 추가 시도 없음
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 10);
        tokio::time::advance(std::time::Duration::from_secs(300)).await;
        tokio::task::yield_now().await;
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_publishes_connected_and_pumps_candles() {
        let factory = Arc::new(ScriptedFactory::failing_first(0));
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();
        let mut candles = bus.subscribe_candles();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connected).await;

        let control = factory.pop_control();
        let candle = Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M1,
            open_time: chrono::Utc::now(),
            close_time: chrono::Utc::now(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100.5),
            volume: dec!(1),
            quote_volume: dec!(100),
        };
        control.candle_tx.send(candle).await.unwrap();

        candles.changed().await.unwrap();
        assert_eq!(candles.borrow().as_ref().unwrap().close, dec!(100.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reenters_connecting_and_recovers() {
        let factory = Arc::new(ScriptedFactory::failing_first(0));
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connected).await;

        let control = factory.pop_control();
        control
            .failure_tx
            .send(ExchangeError::WebSocket("connection reset".to_string()))
            .unwrap();

        // 에러 통지는 재연결 루프를 다시 돌린다
        while factory.attempts.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert_eq!(bus.status(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_is_idempotent() {
        let factory = Arc::new(ScriptedFactory::failing_first(0));
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connected).await;

        supervisor.destroy();
        supervisor.destroy();
        wait_for_status(&mut status, ConnectionState::Disconnected).await;

        // 종료 후 새 시도가 없어야 한다
        let attempts = factory.attempts.load(Ordering::SeqCst);
        tokio::time::advance(std::time::Duration::from_secs(300)).await;
        tokio::task::yield_now().await;
        assert_eq!(factory.attempts.load(Ordering::SeqCst), attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_then_immediate_reconnect_runs_single_loop() {
        let factory = Arc::new(ScriptedFactory::failing_first(0));
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connected).await;

        // 이전 루프가 종료 신호를 관측하기 전에 곧바로 재연결
        supervisor.destroy();
        supervisor.connect("BTCUSDT", Timeframe::M1);

        while factory.attempts.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        // 이전 세대 루프는 정리되고 새 루프 하나만 세션을 연다
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(bus.status(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent_while_active() {
        let factory = Arc::new(ScriptedFactory::failing_first(0));
        let (supervisor, bus) = supervisor_with(Arc::clone(&factory));
        let mut status = bus.subscribe_status();

        supervisor.connect("BTCUSDT", Timeframe::M1);
        wait_for_status(&mut status, ConnectionState::Connected).await;

        // 활성 상태에서의 connect()는 무시된다
        supervisor.connect("BTCUSDT", Timeframe::M1);
        tokio::task::yield_now().await;
        assert_eq!(factory.attempts.load(Ordering::SeqCst), 1);
    }
}
